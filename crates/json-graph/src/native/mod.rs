//! Built-in handlers for the standard value types.
//!
//! Nothing here is special to the core transform: every type is installed
//! through the ordinary registration calls on [`TypeRegistry`].

pub mod binary;
pub mod collections;
pub mod date;
pub mod errors;
pub mod primitive;
pub mod regexp;

use std::cell::Ref;
use std::sync::Arc;

use json_graph_core::{Class, DecodeError, EncodeError, Instance, PlainObject, PlainValue, TypeRegistry, Value};

pub use binary::{array_buffer, as_array_buffer, as_data_view, as_typed_array, data_view, typed_array, TypedArrayKind};
pub use collections::{as_map, as_set, map, map_set, set, set_add};
pub use date::{as_date, date};
pub use errors::{error, error_with_cause, ERROR_CLASSES};
pub use primitive::{as_bigint, as_boxed_number, as_boxed_string, bigint, bigint_from_decimal, boxed_number, boxed_string};
pub use regexp::{as_regexp, regexp, to_regex};

/// Registers every built-in handler and allow-lists the error hierarchy.
pub fn install(registry: &mut TypeRegistry) {
    date::install(registry);
    primitive::install(registry);
    regexp::install(registry);
    collections::install(registry);
    binary::install(registry);
    errors::install(registry);
}

pub(crate) fn class(name: &str) -> Arc<Class> {
    Arc::new(Class::new(name))
}

pub(crate) fn native(name: &str, internal: Value) -> Value {
    Value::instance(Instance::with_internal(class(name), internal))
}

/// Borrows `value` as an instance tagged `tag`.
pub(crate) fn instance_of<'a>(value: &'a Value, tag: &str) -> Option<Ref<'a, Instance>> {
    let instance = value.as_instance()?.borrow();
    (instance.tag() == tag).then_some(instance)
}

/// Internal slot of an instance tagged `tag`.
pub(crate) fn internal_of(value: &Value, tag: &str) -> Option<Value> {
    instance_of(value, tag).map(|instance| instance.internal().clone())
}

pub(crate) fn not_a(tag: &str) -> EncodeError {
    EncodeError::handler(tag, format!("value is not a {tag}"))
}

pub(crate) fn take(fields: &mut PlainObject, tag: &str, key: &str) -> Result<PlainValue, DecodeError> {
    fields
        .shift_remove(key)
        .ok_or_else(|| DecodeError::payload(tag, format!("missing field {key:?}")))
}

pub(crate) fn take_str(fields: &mut PlainObject, tag: &str, key: &str) -> Result<String, DecodeError> {
    match take(fields, tag, key)? {
        PlainValue::String(s) => Ok(s),
        _ => Err(DecodeError::payload(tag, format!("field {key:?} must be a string"))),
    }
}

pub(crate) fn take_bool(fields: &mut PlainObject, tag: &str, key: &str) -> Result<bool, DecodeError> {
    match take(fields, tag, key)? {
        PlainValue::Bool(b) => Ok(b),
        _ => Err(DecodeError::payload(tag, format!("field {key:?} must be a boolean"))),
    }
}

pub(crate) fn take_usize(fields: &mut PlainObject, tag: &str, key: &str) -> Result<usize, DecodeError> {
    take(fields, tag, key)?
        .as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| DecodeError::payload(tag, format!("field {key:?} must be a non-negative integer")))
}

pub(crate) fn take_array(fields: &mut PlainObject, tag: &str, key: &str) -> Result<Vec<PlainValue>, DecodeError> {
    match take(fields, tag, key)? {
        PlainValue::Array(items) => Ok(items),
        _ => Err(DecodeError::payload(tag, format!("field {key:?} must be an array"))),
    }
}

pub(crate) fn single(key: &str, value: PlainValue) -> PlainObject {
    let mut out = PlainObject::new();
    out.insert(key.to_string(), value);
    out
}

/// Identity for composites, value equality for primitives (NaN matches
/// NaN, as with JavaScript's SameValueZero).
pub(crate) fn same_value_zero(a: &Value, b: &Value) -> bool {
    match (a.identity(), b.identity()) {
        (Some(x), Some(y)) => x == y,
        (None, None) => a == b,
        _ => false,
    }
}

//! `json-graph`: serialize object graphs with cycles, shared references
//! and typed instances to JSON text, and read them back.
//!
//! The free functions work on a process-wide [`Codec`] that has the
//! built-in handlers from [`native`] installed. Build your own [`Codec`]
//! to keep registrations and collected types separate.
//!
//! Registration takes the codec's write lock while encoding and decoding
//! hold its read lock, so a handler must never call [`register_handler`],
//! [`add_allowed`] or [`set_allow_list`] itself: that deadlocks.
//!
//! ```
//! use std::sync::Arc;
//! use json_graph::{AllowList, Class, Value};
//!
//! let point = Arc::new(Class::new("Point").with_fields(["x", "y"]));
//! let mut p = point.instantiate();
//! p.set("x", 1);
//! p.set("y", 2);
//! let p = Value::instance(p);
//! let root = Value::array(vec![p.clone(), p]);
//!
//! let text = json_graph::serialize(&root).unwrap();
//! let allowed = AllowList::new().with(point);
//! let back = json_graph::deserialize(&text, Some(&allowed)).unwrap();
//!
//! let items = back.as_array().unwrap().borrow();
//! assert!(items[0].ptr_eq(&items[1]));
//! ```

pub mod codec;
pub mod error;
pub mod native;

use std::sync::{Arc, OnceLock};

pub use codec::Codec;
pub use error::Error;
pub use json_graph_core::{
    AllowList, Class, CodecOptions, DecodeError, Decoder, EncodeError, Encoder, Instance, MalformedInput,
    PlainObject, PlainValue, TypeHandler, TypeLedger, TypeRegistry, Value,
};

/// The codec behind the free functions.
pub fn default_codec() -> &'static Codec {
    static CODEC: OnceLock<Codec> = OnceLock::new();
    CODEC.get_or_init(Codec::new)
}

pub fn serialize(value: &Value) -> Result<String, Error> {
    default_codec().serialize(value)
}

/// Decodes `text` against the global allow-list merged with `allowed`.
pub fn deserialize(text: &str, allowed: Option<&AllowList>) -> Result<Value, Error> {
    default_codec().deserialize(text, allowed)
}

/// Replaces the global allow-list, or extends it when `append` is set.
/// Replacing also drops the built-in error classes.
///
/// Must not be called from inside a handler.
pub fn set_allow_list(classes: impl IntoIterator<Item = Arc<Class>>, append: bool) {
    default_codec().set_allow_list(classes, append);
}

/// Must not be called from inside a handler.
pub fn add_allowed(class: Arc<Class>) {
    default_codec().add_allowed(class);
}

/// Registers a global handler for `tag`, replacing any earlier one.
///
/// Must not be called from inside a handler: the running codec already
/// holds the registry lock.
pub fn register_handler<E, D>(tag: impl Into<String>, encode: E, decode: D)
where
    E: Fn(&Value, &mut Encoder<'_>) -> Result<Option<PlainObject>, EncodeError> + Send + Sync + 'static,
    D: Fn(PlainObject, &mut Decoder<'_>) -> Result<Option<Value>, DecodeError> + Send + Sync + 'static,
{
    default_codec().register_handler(tag, encode, decode);
}

/// Classes met by [`serialize`] so far, optionally clearing the list.
pub fn get_collected_types(clear: bool) -> Vec<Arc<Class>> {
    default_codec().collected_types(clear)
}

pub fn reset_collected_types() {
    default_codec().reset_collected_types();
}

//! Graph decoder: plain JSON value → live value.
//!
//! Containers are registered in the [`FoundTable`] before their children
//! are decoded, so a child may refer back to any container that encloses
//! it.
//!
//! Untagged input is handled by position: an untagged root is ordinary JSON
//! and comes back verbatim, while an untagged non-empty container below a
//! tagged one is rejected as [`MalformedInput::UntaggedContainer`].

use std::cell::RefCell;
use std::rc::Rc;

use crate::class::AllowList;
use crate::constants::{parse_index, CONSTRUCTOR_KEY, INSTANCE_PREFIX, REFERENCE_PREFIX};
use crate::error::{DecodeError, MalformedInput};
use crate::options::CodecOptions;
use crate::registry::TypeRegistry;
use crate::tracker::FoundTable;
use crate::value::{Fields, Value};
use crate::{PlainObject, PlainValue};

/// One decode call.
///
/// Owns a fresh [`FoundTable`]; build a new decoder per call. It is also
/// the `next` continuation handed to type handlers.
pub struct Decoder<'r> {
    registry: &'r TypeRegistry,
    allowed: Option<&'r AllowList>,
    found: FoundTable,
    options: CodecOptions,
    depth: usize,
    /// Index of the instance whose handler is running, until bound.
    binding: Option<usize>,
}

impl<'r> Decoder<'r> {
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self {
            registry,
            allowed: None,
            found: FoundTable::new(),
            options: CodecOptions::default(),
            depth: 0,
            binding: None,
        }
    }

    /// Call-scoped allow-list, merged with the registry's own.
    pub fn with_allowed(mut self, allowed: &'r AllowList) -> Self {
        self.allowed = Some(allowed);
        self
    }

    pub fn with_options(mut self, options: CodecOptions) -> Self {
        self.options = options;
        self
    }

    pub fn registry(&self) -> &'r TypeRegistry {
        self.registry
    }

    pub fn found(&self) -> &FoundTable {
        &self.found
    }

    /// Registers `value` as the result of the instance whose handler is
    /// currently running, before the handler decodes its children.
    ///
    /// This is what lets a handler-managed container contain itself. A
    /// handler that binds must return `Some` with the same value.
    pub fn bind_self(&mut self, value: &Value) -> Result<(), DecodeError> {
        if let Some(idx) = self.binding.take() {
            self.found.insert(idx, value.clone())?;
        }
        Ok(())
    }

    pub fn decode(&mut self, plain: PlainValue) -> Result<Value, DecodeError> {
        match plain {
            PlainValue::Null => Ok(Value::Null),
            PlainValue::Bool(b) => Ok(Value::Bool(b)),
            PlainValue::Number(n) => Ok(Value::Number(n.as_f64().unwrap_or(f64::NAN))),
            PlainValue::String(s) if s.starts_with(INSTANCE_PREFIX) => {
                let idx = parse_index(&s, INSTANCE_PREFIX)
                    .ok_or(MalformedInput::InvalidReference(s))?;
                Ok(self.found.resolve(idx)?)
            }
            PlainValue::String(s) => Ok(Value::String(s)),
            PlainValue::Array(items) => self.decode_array(items),
            PlainValue::Object(map) => self.decode_object(map),
        }
    }

    fn decode_array(&mut self, items: Vec<PlainValue>) -> Result<Value, DecodeError> {
        if items.is_empty() {
            return Ok(Value::array(Vec::new()));
        }
        let self_tag = match &items[0] {
            PlainValue::String(tag) if tag.starts_with(REFERENCE_PREFIX) => Some(
                parse_index(tag, REFERENCE_PREFIX)
                    .ok_or_else(|| MalformedInput::InvalidReference(tag.clone())),
            ),
            _ => None,
        };
        let Some(idx) = self_tag else {
            return self.untagged(PlainValue::Array(items));
        };
        let idx = idx?;
        self.nested(|dec| {
            let array = Rc::new(RefCell::new(Vec::with_capacity(items.len() - 1)));
            dec.found.insert(idx, Value::Array(Rc::clone(&array)))?;
            for item in items.into_iter().skip(1) {
                let value = dec.decode(item)?;
                array.borrow_mut().push(value);
            }
            Ok(Value::Array(array))
        })
    }

    fn decode_object(&mut self, mut map: PlainObject) -> Result<Value, DecodeError> {
        let idx = match map.shift_remove(REFERENCE_PREFIX) {
            None => return self.untagged(PlainValue::Object(map)),
            Some(PlainValue::Number(n)) => n
                .as_u64()
                .and_then(|i| usize::try_from(i).ok())
                .ok_or_else(|| MalformedInput::InvalidReference(n.to_string()))?,
            Some(other) => return Err(MalformedInput::InvalidReference(other.to_string()).into()),
        };
        let tag = match map.shift_remove(CONSTRUCTOR_KEY) {
            None => None,
            Some(PlainValue::String(tag)) => Some(tag),
            Some(_) => return Err(MalformedInput::InvalidConstructor.into()),
        };
        self.nested(|dec| match tag {
            None => dec.decode_mapping(idx, map),
            Some(tag) => dec.decode_instance(idx, tag, map),
        })
    }

    fn decode_mapping(&mut self, idx: usize, map: PlainObject) -> Result<Value, DecodeError> {
        let object = Rc::new(RefCell::new(Fields::with_capacity(map.len())));
        self.found.insert(idx, Value::Object(Rc::clone(&object)))?;
        for (key, plain) in map {
            let value = self.decode(plain)?;
            object.borrow_mut().insert(key, value);
        }
        Ok(Value::Object(object))
    }

    fn decode_instance(&mut self, idx: usize, tag: String, map: PlainObject) -> Result<Value, DecodeError> {
        let registry = self.registry;
        if let Some(handler) = registry.handler(&tag) {
            let mark = self.found.len();
            let saved = self.binding.replace(idx);
            let handled = handler.decode(map.clone(), self);
            self.binding = saved;
            if let Some(value) = handled? {
                if !self.found.contains(idx) {
                    self.found.insert(idx, value.clone())?;
                }
                return Ok(value);
            }
            // No opinion: the generic path decodes the same fields again.
            self.found.truncate(mark);
        }

        let Some(class) = registry.resolve_class(&tag, self.allowed) else {
            tracing::debug!(tag = %tag, "rejected disallowed type");
            return Err(DecodeError::DisallowedType(tag));
        };
        let instance = Rc::new(RefCell::new(class.instantiate()));
        self.found.insert(idx, Value::Instance(Rc::clone(&instance)))?;
        for (key, plain) in map {
            let value = self.decode(plain)?;
            instance.borrow_mut().set(key, value);
        }
        Ok(Value::Instance(instance))
    }

    fn untagged(&self, plain: PlainValue) -> Result<Value, DecodeError> {
        if self.depth > 0 {
            return Err(MalformedInput::UntaggedContainer.into());
        }
        tracing::trace!("untagged root decoded as ordinary JSON");
        Ok(Value::from_json(&plain))
    }

    fn nested(&mut self, body: impl FnOnce(&mut Self) -> Result<Value, DecodeError>) -> Result<Value, DecodeError> {
        if let Some(max) = self.options.exceeded_at(self.depth) {
            return Err(DecodeError::DepthExceeded(max));
        }
        self.depth += 1;
        let out = body(self);
        self.depth -= 1;
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::Class;
    use serde_json::json;
    use std::sync::Arc;

    fn decode(plain: PlainValue) -> Result<Value, DecodeError> {
        let registry = TypeRegistry::new();
        Decoder::new(&registry).decode(plain)
    }

    #[test]
    fn sequence_registers_before_children() {
        let out = decode(json!(["#$@__reference__0", 1, 2, "#$@__instance__0"])).unwrap();
        let items = out.as_array().unwrap().borrow();
        assert_eq!(items.len(), 3);
        assert!(items[2].ptr_eq(&out));
    }

    #[test]
    fn mapping_strips_reserved_key() {
        let out = decode(json!({"a": 1, "#$@__reference__": 0})).unwrap();
        assert_eq!(out, Value::object([("a", Value::from(1))]));
    }

    #[test]
    fn shared_mapping_resolves_to_same_identity() {
        let out = decode(json!({
            "p": {"x": 1, "#$@__reference__": 1},
            "q": "#$@__instance__1",
            "#$@__reference__": 0
        }))
        .unwrap();
        let fields = out.as_object().unwrap().borrow();
        assert!(fields["p"].ptr_eq(&fields["q"]));
    }

    #[test]
    fn untagged_root_passes_through() {
        assert_eq!(
            decode(json!([0, 1, 2, 3])).unwrap(),
            Value::from_json(&json!([0, 1, 2, 3]))
        );
        assert_eq!(
            decode(json!({"john": "doe"})).unwrap(),
            Value::from_json(&json!({"john": "doe"}))
        );
        assert_eq!(decode(json!([])).unwrap(), Value::array(vec![]));
    }

    #[test]
    fn untagged_container_below_tagged_is_malformed() {
        let err = decode(json!({"inner": {"a": 1}, "#$@__reference__": 0})).unwrap_err();
        assert_eq!(err, DecodeError::Malformed(MalformedInput::UntaggedContainer));
        let err = decode(json!(["#$@__reference__0", [1, 2]])).unwrap_err();
        assert_eq!(err, DecodeError::Malformed(MalformedInput::UntaggedContainer));
    }

    #[test]
    fn bare_empty_sequence_inside_graph_is_accepted() {
        let out = decode(json!(["#$@__reference__0", []])).unwrap();
        assert_eq!(out, Value::array(vec![Value::array(vec![])]));
    }

    #[test]
    fn reference_values_are_validated() {
        assert_eq!(
            decode(json!({"#$@__reference__": -1})).unwrap_err(),
            DecodeError::Malformed(MalformedInput::InvalidReference("-1".into()))
        );
        assert_eq!(
            decode(json!({"#$@__reference__": "0"})).unwrap_err(),
            DecodeError::Malformed(MalformedInput::InvalidReference("\"0\"".into()))
        );
        assert_eq!(
            decode(json!(["#$@__reference__x"])).unwrap_err(),
            DecodeError::Malformed(MalformedInput::InvalidReference("#$@__reference__x".into()))
        );
        assert_eq!(
            decode(json!({"#$@__reference__": 0, "#$@__constructor__": 5})).unwrap_err(),
            DecodeError::Malformed(MalformedInput::InvalidConstructor)
        );
    }

    #[test]
    fn unresolved_and_duplicate_references_fail() {
        assert_eq!(
            decode(json!(["#$@__reference__0", "#$@__instance__7"])).unwrap_err(),
            DecodeError::Malformed(MalformedInput::UnresolvedReference(7))
        );
        assert_eq!(
            decode(json!(["#$@__reference__0", ["#$@__reference__0"]])).unwrap_err(),
            DecodeError::Malformed(MalformedInput::DuplicateReference(0))
        );
    }

    #[test]
    fn disallowed_type_fails_closed() {
        let plain = json!({"#$@__constructor__": "Evil", "#$@__reference__": 0, "x": 1});
        assert_eq!(
            decode(plain.clone()).unwrap_err(),
            DecodeError::DisallowedType("Evil".into())
        );

        let registry = TypeRegistry::new();
        let allowed = AllowList::new().with(Arc::new(Class::new("Evil")));
        let out = Decoder::new(&registry).with_allowed(&allowed).decode(plain).unwrap();
        assert_eq!(out.tag().as_deref(), Some("Evil"));
    }

    #[test]
    fn handler_without_opinion_falls_back_to_allow_list() {
        let mut registry = TypeRegistry::new();
        registry.register_handler("T", |_, _| Ok(None), |_, _| Ok(None));
        let plain = json!({"#$@__constructor__": "T", "#$@__reference__": 0});
        assert_eq!(
            Decoder::new(&registry).decode(plain.clone()).unwrap_err(),
            DecodeError::DisallowedType("T".into())
        );
        registry.add_allowed(Arc::new(Class::new("T")));
        assert!(Decoder::new(&registry).decode(plain).is_ok());
    }

    #[test]
    fn handler_result_takes_the_identity_slot() {
        let mut registry = TypeRegistry::new();
        registry.register_handler("Wrapped", |_, _| Ok(None), |fields, _| {
            Ok(fields.get("v").map(Value::from_json))
        });
        let out = Decoder::new(&registry)
            .decode(json!([
                "#$@__reference__0",
                {"v": "x", "#$@__constructor__": "Wrapped", "#$@__reference__": 1},
                "#$@__instance__1"
            ]))
            .unwrap();
        let items = out.as_array().unwrap().borrow();
        assert_eq!(items[0], Value::from("x"));
        assert_eq!(items[1], Value::from("x"));
    }

    #[test]
    fn depth_limit() {
        let registry = TypeRegistry::new();
        let plain = json!(["#$@__reference__0", ["#$@__reference__1", ["#$@__reference__2"]]]);
        let options = CodecOptions::new().with_max_depth(2);
        assert_eq!(
            Decoder::new(&registry).with_options(options).decode(plain.clone()).unwrap_err(),
            DecodeError::DepthExceeded(2)
        );
        let options = CodecOptions::new().with_max_depth(3);
        assert!(Decoder::new(&registry).with_options(options).decode(plain).is_ok());
    }
}

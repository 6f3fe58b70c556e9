//! Type registry: the allow-list and the handler table.
//!
//! The two tables are independent. The allow-list only gates which classes
//! the decoder may instantiate generically; handlers override the generic
//! transform for one tag on both sides.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::class::{AllowList, Class};
use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::error::{DecodeError, EncodeError};
use crate::value::Value;
use crate::PlainObject;

/// Custom encode/decode pair for one type tag.
///
/// Both directions may answer `Ok(None)` ("no opinion") to let the generic
/// transform run. Nested values must go through `next` so that they share
/// the call's reference bookkeeping.
pub trait TypeHandler: Send + Sync {
    /// Produces the payload fields for `value`. The encoder adds the
    /// constructor tag and reference index afterwards, overriding any
    /// handler-supplied keys of the same name.
    fn encode(&self, value: &Value, next: &mut Encoder<'_>) -> Result<Option<PlainObject>, EncodeError>;

    /// Rebuilds a value from payload `fields` (reserved keys already
    /// removed).
    fn decode(&self, fields: PlainObject, next: &mut Decoder<'_>) -> Result<Option<Value>, DecodeError>;
}

/// Adapts a pair of closures to [`TypeHandler`].
pub struct FnHandler<E, D> {
    encode: E,
    decode: D,
}

impl<E, D> FnHandler<E, D> {
    pub fn new(encode: E, decode: D) -> Self {
        Self { encode, decode }
    }
}

impl<E, D> TypeHandler for FnHandler<E, D>
where
    E: Fn(&Value, &mut Encoder<'_>) -> Result<Option<PlainObject>, EncodeError> + Send + Sync,
    D: Fn(PlainObject, &mut Decoder<'_>) -> Result<Option<Value>, DecodeError> + Send + Sync,
{
    fn encode(&self, value: &Value, next: &mut Encoder<'_>) -> Result<Option<PlainObject>, EncodeError> {
        (self.encode)(value, next)
    }

    fn decode(&self, fields: PlainObject, next: &mut Decoder<'_>) -> Result<Option<Value>, DecodeError> {
        (self.decode)(fields, next)
    }
}

/// Allow-list plus handler table.
#[derive(Clone, Default)]
pub struct TypeRegistry {
    allowed: AllowList,
    handlers: HashMap<String, Arc<dyn TypeHandler>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the allow-list, or extends it when `append` is set.
    pub fn set_allow_list(&mut self, classes: impl IntoIterator<Item = Arc<Class>>, append: bool) {
        if !append {
            self.allowed.clear();
        }
        self.allowed.extend(classes);
        tracing::debug!(count = self.allowed.len(), append, "allow-list updated");
    }

    pub fn add_allowed(&mut self, class: Arc<Class>) {
        tracing::debug!(class = class.name(), "class allowed");
        self.allowed.insert(class);
    }

    pub fn allowed(&self) -> &AllowList {
        &self.allowed
    }

    /// Installs `handler` for `tag`. A later registration for the same tag
    /// replaces the earlier one.
    pub fn register(&mut self, tag: impl Into<String>, handler: Arc<dyn TypeHandler>) {
        let tag = tag.into();
        tracing::debug!(tag = %tag, "handler registered");
        self.handlers.insert(tag, handler);
    }

    /// Closure form of [`TypeRegistry::register`].
    pub fn register_handler<E, D>(&mut self, tag: impl Into<String>, encode: E, decode: D)
    where
        E: Fn(&Value, &mut Encoder<'_>) -> Result<Option<PlainObject>, EncodeError> + Send + Sync + 'static,
        D: Fn(PlainObject, &mut Decoder<'_>) -> Result<Option<Value>, DecodeError> + Send + Sync + 'static,
    {
        self.register(tag, Arc::new(FnHandler::new(encode, decode)));
    }

    pub fn handler(&self, tag: &str) -> Option<&Arc<dyn TypeHandler>> {
        self.handlers.get(tag)
    }

    pub fn has_handler(&self, tag: &str) -> bool {
        self.handlers.contains_key(tag)
    }

    /// Looks `tag` up in the registry's allow-list merged with the
    /// call-scoped `extra` list. The registry's entry wins on a name clash.
    pub fn resolve_class(&self, tag: &str, extra: Option<&AllowList>) -> Option<Arc<Class>> {
        self.allowed
            .get(tag)
            .or_else(|| extra.and_then(|list| list.get(tag)))
            .cloned()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        tags.sort_unstable();
        f.debug_struct("TypeRegistry")
            .field("allowed", &self.allowed.iter().map(|c| c.name()).collect::<Vec<_>>())
            .field("handlers", &tags)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(name: &str) -> Arc<Class> {
        Arc::new(Class::new(name))
    }

    #[test]
    fn set_allow_list_replaces_unless_appending() {
        let mut registry = TypeRegistry::new();
        registry.set_allow_list([class("A"), class("B")], false);
        registry.set_allow_list([class("C")], true);
        assert_eq!(registry.allowed().len(), 3);
        registry.set_allow_list([class("D")], false);
        assert_eq!(registry.allowed().len(), 1);
        assert!(registry.allowed().contains("D"));
    }

    #[test]
    fn resolve_class_merges_call_scoped_list() {
        let mut registry = TypeRegistry::new();
        registry.add_allowed(Arc::new(Class::new("A").with_fields(["global"])));
        let extra = AllowList::new()
            .with(Arc::new(Class::new("A").with_fields(["local"])))
            .with(class("B"));
        let a = registry.resolve_class("A", Some(&extra)).unwrap();
        assert_eq!(a.fields(), ["global".to_string()]);
        assert!(registry.resolve_class("B", Some(&extra)).is_some());
        assert!(registry.resolve_class("B", None).is_none());
        // Call-scoped entries never leak into the registry.
        assert!(!registry.allowed().contains("B"));
    }

    #[test]
    fn last_handler_registration_wins() {
        let mut registry = TypeRegistry::new();
        registry.register_handler("T", |_, _| Ok(None), |_, _| Ok(Some(Value::from(1))));
        registry.register_handler("T", |_, _| Ok(None), |_, _| Ok(Some(Value::from(2))));
        assert!(registry.has_handler("T"));
        let handler = registry.handler("T").unwrap().clone();
        let mut decoder = Decoder::new(&registry);
        let out = handler.decode(PlainObject::new(), &mut decoder).unwrap();
        assert_eq!(out, Some(Value::from(2)));
    }
}

//! A registry and ledger pair with the text-level entry points.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Deserialize;
use serde_json::error::Category;

use json_graph_core::{
    AllowList, Class, CodecOptions, DecodeError, Decoder, EncodeError, Encoder, PlainObject, PlainValue,
    TypeHandler, TypeLedger, TypeRegistry, Value, UNDEFINED_TEXT,
};

use crate::error::Error;
use crate::native;

/// Encoder and decoder settings shared across calls.
///
/// Registration takes `&self`: the registry sits behind a lock so one codec
/// can serve the whole process. Handlers must not register on the codec
/// that is running them.
#[derive(Debug)]
pub struct Codec {
    registry: RwLock<TypeRegistry>,
    ledger: TypeLedger,
    options: CodecOptions,
}

impl Default for Codec {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec {
    /// A codec with the built-in handlers installed.
    pub fn new() -> Self {
        let mut registry = TypeRegistry::new();
        native::install(&mut registry);
        Self::with_registry(registry)
    }

    /// A codec that knows no types at all.
    pub fn empty() -> Self {
        Self::with_registry(TypeRegistry::new())
    }

    pub fn with_registry(registry: TypeRegistry) -> Self {
        Self {
            registry: RwLock::new(registry),
            ledger: TypeLedger::new(),
            options: CodecOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CodecOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> CodecOptions {
        self.options
    }

    fn read(&self) -> RwLockReadGuard<'_, TypeRegistry> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, TypeRegistry> {
        self.registry.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the current registry.
    pub fn registry(&self) -> TypeRegistry {
        self.read().clone()
    }

    pub fn encode(&self, value: &Value) -> Result<PlainValue, EncodeError> {
        let registry = self.read();
        let mut encoder = Encoder::new(&registry)
            .with_ledger(&self.ledger)
            .with_options(self.options);
        encoder.encode(value)
    }

    /// Decodes against the codec's allow-list merged with `allowed`.
    pub fn decode(&self, plain: PlainValue, allowed: Option<&AllowList>) -> Result<Value, DecodeError> {
        let registry = self.read();
        let mut decoder = Decoder::new(&registry).with_options(self.options);
        if let Some(allowed) = allowed {
            decoder = decoder.with_allowed(allowed);
        }
        decoder.decode(plain)
    }

    /// JSON text for `value`; `Undefined` becomes the bare word `undefined`.
    pub fn serialize(&self, value: &Value) -> Result<String, Error> {
        if value.is_undefined() {
            return Ok(UNDEFINED_TEXT.to_string());
        }
        let plain = self.encode(value)?;
        Ok(serde_json::to_string(&plain)?)
    }

    /// Parses and decodes `text`.
    ///
    /// `undefined` yields `Undefined`. Text that is not JSON is returned as
    /// a string value. Decode errors, including disallowed types, are
    /// returned to the caller.
    pub fn deserialize(&self, text: &str, allowed: Option<&AllowList>) -> Result<Value, Error> {
        if text == UNDEFINED_TEXT {
            return Ok(Value::Undefined);
        }
        let plain = match parse(text) {
            Ok(plain) => plain,
            Err(err) if matches!(err.classify(), Category::Syntax | Category::Eof) => {
                tracing::trace!(error = %err, "input is not JSON, returned as text");
                return Ok(Value::String(text.to_string()));
            }
            Err(err) => return Err(err.into()),
        };
        Ok(self.decode(plain, allowed)?)
    }

    pub fn set_allow_list(&self, classes: impl IntoIterator<Item = Arc<Class>>, append: bool) {
        self.write().set_allow_list(classes, append);
    }

    pub fn add_allowed(&self, class: Arc<Class>) {
        self.write().add_allowed(class);
    }

    pub fn allowed(&self) -> AllowList {
        self.read().allowed().clone()
    }

    pub fn register(&self, tag: impl Into<String>, handler: Arc<dyn TypeHandler>) {
        self.write().register(tag, handler);
    }

    pub fn register_handler<E, D>(&self, tag: impl Into<String>, encode: E, decode: D)
    where
        E: Fn(&Value, &mut Encoder<'_>) -> Result<Option<PlainObject>, EncodeError> + Send + Sync + 'static,
        D: Fn(PlainObject, &mut Decoder<'_>) -> Result<Option<Value>, DecodeError> + Send + Sync + 'static,
    {
        self.write().register_handler(tag, encode, decode);
    }

    /// Classes met by [`encode`](Self::encode) since the last reset.
    pub fn collected_types(&self, clear: bool) -> Vec<Arc<Class>> {
        self.ledger.read(clear)
    }

    pub fn reset_collected_types(&self) {
        self.ledger.reset();
    }
}

/// Parses JSON text with no nesting limit of its own; `CodecOptions` is
/// the only depth bound.
fn parse(text: &str) -> Result<PlainValue, serde_json::Error> {
    let mut de = serde_json::Deserializer::from_str(text);
    de.disable_recursion_limit();
    let plain = PlainValue::deserialize(&mut de)?;
    de.end()?;
    Ok(plain)
}

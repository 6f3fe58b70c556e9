//! Graph encoder: live value → plain JSON value.

use std::sync::Arc;

use crate::class::Class;
use crate::constants::{CONSTRUCTOR_KEY, INSTANCE_PREFIX, MAX_SAFE_INTEGER, NUMBER_TAG, REFERENCE_PREFIX};
use crate::error::EncodeError;
use crate::ledger::TypeLedger;
use crate::options::CodecOptions;
use crate::registry::TypeRegistry;
use crate::tracker::ReferenceTracker;
use crate::value::{ArrayRef, Fields, InstanceRef, ObjectRef, Value};
use crate::{PlainObject, PlainValue};

/// One encode call.
///
/// The encoder owns a fresh [`ReferenceTracker`]; build a new encoder per
/// call. It is also the `next` continuation handed to type handlers, so
/// anything a handler encodes shares this call's reference indices.
pub struct Encoder<'r> {
    registry: &'r TypeRegistry,
    ledger: Option<&'r TypeLedger>,
    tracker: ReferenceTracker,
    options: CodecOptions,
    depth: usize,
}

impl<'r> Encoder<'r> {
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self {
            registry,
            ledger: None,
            tracker: ReferenceTracker::new(),
            options: CodecOptions::default(),
            depth: 0,
        }
    }

    /// Records every encoded class in `ledger`.
    pub fn with_ledger(mut self, ledger: &'r TypeLedger) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn with_options(mut self, options: CodecOptions) -> Self {
        self.options = options;
        self
    }

    pub fn registry(&self) -> &'r TypeRegistry {
        self.registry
    }

    pub fn tracker(&self) -> &ReferenceTracker {
        &self.tracker
    }

    /// Encodes `value`. `Undefined` becomes `null`; callers that need to
    /// drop undefined fields do so before calling.
    pub fn encode(&mut self, value: &Value) -> Result<PlainValue, EncodeError> {
        match value {
            Value::Undefined | Value::Null => Ok(PlainValue::Null),
            Value::Bool(b) => Ok(PlainValue::Bool(*b)),
            Value::String(s) => Ok(PlainValue::String(s.clone())),
            Value::Number(n) if n.is_finite() => Ok(plain_number(*n)),
            Value::Number(n) => self.encode_non_finite(value, *n),
            Value::Array(items) => self.visit(value, |enc, idx| enc.encode_array(items, idx)),
            Value::Object(fields) => self.visit(value, |enc, idx| enc.encode_object(fields, idx)),
            Value::Instance(instance) => {
                self.visit(value, |enc, idx| enc.encode_instance(value, instance, idx))
            }
        }
    }

    /// Emits a back-reference for a revisit, otherwise registers `value`
    /// and runs `body` with its new index.
    fn visit(
        &mut self,
        value: &Value,
        body: impl FnOnce(&mut Self, usize) -> Result<PlainValue, EncodeError>,
    ) -> Result<PlainValue, EncodeError> {
        if let Some(idx) = self.tracker.lookup(value) {
            return Ok(PlainValue::String(format!("{INSTANCE_PREFIX}{idx}")));
        }
        if let Some(max) = self.options.exceeded_at(self.depth) {
            return Err(EncodeError::DepthExceeded(max));
        }
        let idx = self.tracker.register(value);
        self.depth += 1;
        let out = body(self, idx);
        self.depth -= 1;
        out
    }

    fn encode_array(&mut self, items: &ArrayRef, idx: usize) -> Result<PlainValue, EncodeError> {
        let items = items.borrow();
        let mut out = Vec::with_capacity(items.len() + 1);
        out.push(PlainValue::String(format!("{REFERENCE_PREFIX}{idx}")));
        for item in items.iter() {
            out.push(self.encode(item)?);
        }
        Ok(PlainValue::Array(out))
    }

    fn encode_object(&mut self, fields: &ObjectRef, idx: usize) -> Result<PlainValue, EncodeError> {
        let mut out = PlainObject::new();
        self.encode_fields(&fields.borrow(), &mut out)?;
        out.insert(REFERENCE_PREFIX.to_string(), PlainValue::from(idx));
        Ok(PlainValue::Object(out))
    }

    fn encode_instance(
        &mut self,
        value: &Value,
        instance: &InstanceRef,
        idx: usize,
    ) -> Result<PlainValue, EncodeError> {
        let class = Arc::clone(instance.borrow().class());
        self.collect(&class);

        let registry = self.registry;
        let mark = self.tracker.len();
        let handled = match registry.handler(class.name()) {
            Some(handler) => handler.encode(value, self)?,
            None => None,
        };
        if handled.is_none() {
            // Whatever the handler sent through `next` never reaches the output.
            self.tracker.truncate(mark);
        }
        let out = match handled {
            Some(mut out) => {
                out.insert(CONSTRUCTOR_KEY.to_string(), PlainValue::from(class.name()));
                out.insert(REFERENCE_PREFIX.to_string(), PlainValue::from(idx));
                out
            }
            None => {
                let mut out = PlainObject::new();
                out.insert(CONSTRUCTOR_KEY.to_string(), PlainValue::from(class.name()));
                out.insert(REFERENCE_PREFIX.to_string(), PlainValue::from(idx));
                self.encode_fields(instance.borrow().fields(), &mut out)?;
                out
            }
        };
        Ok(PlainValue::Object(out))
    }

    /// NaN and the infinities are not JSON numbers; they go to the
    /// `"Number"` handler under an index that nothing can refer back to.
    fn encode_non_finite(&mut self, value: &Value, n: f64) -> Result<PlainValue, EncodeError> {
        let registry = self.registry;
        let handler = registry
            .handler(NUMBER_TAG)
            .ok_or(EncodeError::NonFiniteNumber(n))?;
        if let Some(ledger) = self.ledger {
            if !ledger.contains(NUMBER_TAG) {
                ledger.record(&Arc::new(Class::new(NUMBER_TAG)));
            }
        }
        let idx = self.tracker.reserve();
        let mut out = handler
            .encode(value, self)?
            .ok_or(EncodeError::NonFiniteNumber(n))?;
        out.insert(CONSTRUCTOR_KEY.to_string(), PlainValue::from(NUMBER_TAG));
        out.insert(REFERENCE_PREFIX.to_string(), PlainValue::from(idx));
        Ok(PlainValue::Object(out))
    }

    fn encode_fields(&mut self, fields: &Fields, out: &mut PlainObject) -> Result<(), EncodeError> {
        for (key, value) in fields {
            if is_reserved_key(key) {
                return Err(EncodeError::ReservedKey(key.clone()));
            }
            if value.is_undefined() {
                continue;
            }
            let plain = self.encode(value)?;
            out.insert(key.clone(), plain);
        }
        Ok(())
    }

    fn collect(&self, class: &Arc<Class>) {
        if let Some(ledger) = self.ledger {
            if ledger.record(class) {
                tracing::trace!(class = class.name(), "collected type");
            }
        }
    }
}

fn is_reserved_key(key: &str) -> bool {
    key == CONSTRUCTOR_KEY || key == REFERENCE_PREFIX
}

/// JSON form of a finite number. Integral values a double holds exactly are
/// written without a fraction, matching JavaScript's `JSON.stringify`.
pub fn plain_number(n: f64) -> PlainValue {
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        return PlainValue::from(n as i64);
    }
    serde_json::Number::from_f64(n).map_or(PlainValue::Null, PlainValue::Number)
}

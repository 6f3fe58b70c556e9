//! In-memory value model.
//!
//! Composite values are reference-counted cells so that a graph may share
//! sub-values and contain cycles. Identity is `Rc` pointer identity.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::class::Class;

/// String-keyed, insertion-ordered fields of a mapping or instance.
pub type Fields = IndexMap<String, Value>;

pub type ArrayRef = Rc<RefCell<Vec<Value>>>;
pub type ObjectRef = Rc<RefCell<Fields>>;
pub type InstanceRef = Rc<RefCell<Instance>>;

/// A live value: a primitive, or a handle to a shared composite.
///
/// `Clone` copies the handle, never the composite, so a cloned
/// `Value::Array` is the *same* array.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(ArrayRef),
    Object(ObjectRef),
    Instance(InstanceRef),
}

/// An instance of a named type.
///
/// `fields` are the instance's own enumerable fields and are what the
/// generic path encodes. `internal` is a hidden slot (a date's timestamp,
/// a map's entries) that only type handlers read and write.
#[derive(Clone)]
pub struct Instance {
    class: Arc<Class>,
    fields: Fields,
    internal: Value,
}

impl Instance {
    /// A bare instance with no fields. See [`Class::instantiate`] for the
    /// factory that pre-populates declared fields.
    pub fn new(class: Arc<Class>) -> Self {
        Self {
            class,
            fields: Fields::new(),
            internal: Value::Undefined,
        }
    }

    pub fn with_internal(class: Arc<Class>, internal: Value) -> Self {
        Self {
            class,
            fields: Fields::new(),
            internal,
        }
    }

    pub fn class(&self) -> &Arc<Class> {
        &self.class
    }

    /// The type tag written on the wire.
    pub fn tag(&self) -> &str {
        self.class.name()
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut Fields {
        &mut self.fields
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Sets a field, returning the previous value. Existing keys keep their
    /// position.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(key.into(), value.into())
    }

    pub fn internal(&self) -> &Value {
        &self.internal
    }

    pub fn set_internal(&mut self, internal: Value) {
        self.internal = internal;
    }
}

impl Value {
    pub fn array(items: impl IntoIterator<Item = Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(items.into_iter().collect())))
    }

    pub fn object<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Value {
        Value::Object(Rc::new(RefCell::new(
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        )))
    }

    pub fn instance(instance: Instance) -> Value {
        Value::Instance(Rc::new(RefCell::new(instance)))
    }

    /// Converts ordinary JSON verbatim. Every container in the result is
    /// fresh; nothing is shared.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => Value::array(items.iter().map(Value::from_json)),
            serde_json::Value::Object(map) => {
                Value::object(map.iter().map(|(k, v)| (k.clone(), Value::from_json(v))))
            }
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Whether the value has identity (sequence, mapping or instance).
    pub fn is_composite(&self) -> bool {
        matches!(self, Value::Array(_) | Value::Object(_) | Value::Instance(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayRef> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&InstanceRef> {
        match self {
            Value::Instance(i) => Some(i),
            _ => None,
        }
    }

    /// The type tag of an instance.
    pub fn tag(&self) -> Option<String> {
        self.as_instance().map(|i| i.borrow().tag().to_string())
    }

    /// Address of the shared composite, `None` for primitives.
    pub fn identity(&self) -> Option<usize> {
        match self {
            Value::Array(a) => Some(Rc::as_ptr(a) as *const () as usize),
            Value::Object(o) => Some(Rc::as_ptr(o) as *const () as usize),
            Value::Instance(i) => Some(Rc::as_ptr(i) as *const () as usize),
            _ => None,
        }
    }

    /// Whether both values are the same composite.
    pub fn ptr_eq(&self, other: &Value) -> bool {
        match (self.identity(), other.identity()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::array(items)
    }
}

impl From<Instance> for Value {
    fn from(instance: Instance) -> Self {
        Value::instance(instance)
    }
}

// ----------------------------------------------------------------
// Structural equality

impl PartialEq for Value {
    /// Structural equality. Terminates on cyclic graphs: a pair of
    /// composites already under comparison is assumed equal.
    fn eq(&self, other: &Self) -> bool {
        deep_equal(self, other, &mut HashSet::new())
    }
}

fn deep_equal(a: &Value, b: &Value, seen: &mut HashSet<(usize, usize)>) -> bool {
    if let (Some(x), Some(y)) = (a.identity(), b.identity()) {
        if x == y || !seen.insert((x, y)) {
            return true;
        }
    }
    match (a, b) {
        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y || (x.is_nan() && y.is_nan()),
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => {
            let (x, y) = (x.borrow(), y.borrow());
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(a, b)| deep_equal(a, b, seen))
        }
        (Value::Object(x), Value::Object(y)) => fields_equal(&x.borrow(), &y.borrow(), seen),
        (Value::Instance(x), Value::Instance(y)) => {
            let (x, y) = (x.borrow(), y.borrow());
            x.tag() == y.tag()
                && fields_equal(&x.fields, &y.fields, seen)
                && deep_equal(&x.internal, &y.internal, seen)
        }
        _ => false,
    }
}

fn fields_equal(a: &Fields, b: &Fields, seen: &mut HashSet<(usize, usize)>) -> bool {
    a.len() == b.len()
        && a.iter().all(|(k, v)| match b.get(k) {
            Some(w) => deep_equal(v, w, seen),
            None => false,
        })
}

// ----------------------------------------------------------------
// Debug

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_value(self, f, &mut Vec::new())
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_instance(self, f, &mut Vec::new())
    }
}

/// `path` holds the composites on the current descent; meeting one again
/// means a cycle.
fn write_value(value: &Value, f: &mut fmt::Formatter<'_>, path: &mut Vec<usize>) -> fmt::Result {
    if let Some(id) = value.identity() {
        if path.contains(&id) {
            return f.write_str("<cycle>");
        }
        path.push(id);
    }
    let res = match value {
        Value::Undefined => f.write_str("undefined"),
        Value::Null => f.write_str("null"),
        Value::Bool(b) => write!(f, "{b}"),
        Value::Number(n) => write!(f, "{n:?}"),
        Value::String(s) => write!(f, "{s:?}"),
        Value::Array(items) => {
            f.write_str("[")?;
            for (i, item) in items.borrow().iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write_value(item, f, path)?;
            }
            f.write_str("]")
        }
        Value::Object(fields) => write_fields(&fields.borrow(), f, path),
        Value::Instance(instance) => write_instance(&instance.borrow(), f, path),
    };
    if value.identity().is_some() {
        path.pop();
    }
    res
}

fn write_instance(instance: &Instance, f: &mut fmt::Formatter<'_>, path: &mut Vec<usize>) -> fmt::Result {
    f.write_str(instance.tag())?;
    if !instance.internal.is_undefined() {
        f.write_str("(")?;
        write_value(&instance.internal, f, path)?;
        f.write_str(")")?;
    }
    f.write_str(" ")?;
    write_fields(&instance.fields, f, path)
}

fn write_fields(fields: &Fields, f: &mut fmt::Formatter<'_>, path: &mut Vec<usize>) -> fmt::Result {
    f.write_str("{")?;
    for (i, (key, value)) in fields.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{key:?}: ")?;
        write_value(value, f, path)?;
    }
    f.write_str("}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clone_shares_identity() {
        let a = Value::array(vec![Value::from(1)]);
        let b = a.clone();
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&Value::array(vec![Value::from(1)])));
    }

    #[test]
    fn primitives_have_no_identity() {
        assert_eq!(Value::from(1).identity(), None);
        assert!(!Value::Null.ptr_eq(&Value::Null));
    }

    #[test]
    fn structural_equality_ignores_identity() {
        let a = Value::object([("x", Value::from(1)), ("y", Value::from("z"))]);
        let b = Value::object([("y", Value::from("z")), ("x", Value::from(1))]);
        assert_eq!(a, b);
        assert_ne!(a, Value::object([("x", Value::from(1))]));
    }

    #[test]
    fn nan_equals_nan() {
        assert_eq!(Value::from(f64::NAN), Value::from(f64::NAN));
        assert_ne!(Value::from(f64::INFINITY), Value::from(f64::NEG_INFINITY));
    }

    #[test]
    fn cyclic_equality_terminates() {
        let a = Value::array(vec![Value::from(1)]);
        a.as_array().unwrap().borrow_mut().push(a.clone());
        let b = Value::array(vec![Value::from(1)]);
        b.as_array().unwrap().borrow_mut().push(b.clone());
        assert_eq!(a, b);
    }

    #[test]
    fn debug_marks_cycles() {
        let o = Value::object([("a", Value::from(1))]);
        o.as_object().unwrap().borrow_mut().insert("b".into(), o.clone());
        assert_eq!(format!("{o:?}"), r#"{"a": 1.0, "b": <cycle>}"#);
    }

    #[test]
    fn debug_repeats_shared_non_cyclic() {
        let shared = Value::array(vec![]);
        let v = Value::array(vec![shared.clone(), shared]);
        assert_eq!(format!("{v:?}"), "[[], []]");
    }

    #[test]
    fn from_json_copies_verbatim() {
        let v = Value::from_json(&json!({"john": "doe", "n": [0, 1.5, null, true]}));
        let expected = Value::object([
            ("john", Value::from("doe")),
            (
                "n",
                Value::array(vec![
                    Value::from(0),
                    Value::from(1.5),
                    Value::Null,
                    Value::from(true),
                ]),
            ),
        ]);
        assert_eq!(v, expected);
    }

    #[test]
    fn instance_equality_compares_tag_fields_and_internal() {
        let class = Arc::new(Class::new("Point"));
        let mut p = Instance::new(class.clone());
        p.set("x", 1);
        let mut q = Instance::new(class);
        q.set("x", 1);
        assert_eq!(Value::instance(p.clone()), Value::instance(q.clone()));
        q.set_internal(Value::from(2));
        assert_ne!(Value::instance(p.clone()), Value::instance(q));
        let other = Instance::new(Arc::new(Class::new("Vector")));
        assert_ne!(Value::instance(p), Value::instance(other));
    }
}

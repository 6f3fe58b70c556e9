//! The standard error hierarchy.
//!
//! These types have no handler: they are allow-listed classes declaring
//! `message` and `cause` (plus `errors` for `AggregateError`) and go
//! through the generic field-by-field path.

use std::sync::{Arc, OnceLock};

use json_graph_core::{Class, TypeRegistry, Value};

pub const ERROR_CLASSES: [&str; 8] = [
    "Error",
    "EvalError",
    "RangeError",
    "AggregateError",
    "ReferenceError",
    "SyntaxError",
    "TypeError",
    "URIError",
];

fn classes() -> &'static [Arc<Class>] {
    static CLASSES: OnceLock<Vec<Arc<Class>>> = OnceLock::new();
    CLASSES.get_or_init(|| {
        ERROR_CLASSES
            .iter()
            .map(|&name| {
                let class = match name {
                    "AggregateError" => Class::new(name).with_fields(["message", "cause", "errors"]),
                    _ => Class::new(name).with_fields(["message", "cause"]),
                };
                Arc::new(class)
            })
            .collect()
    })
}

fn error_class(kind: &str) -> Option<&'static Arc<Class>> {
    classes().iter().find(|class| class.name() == kind)
}

/// An error of `kind` (one of [`ERROR_CLASSES`]) with `message`.
pub fn error(kind: &str, message: &str) -> Option<Value> {
    let mut instance = error_class(kind)?.instantiate();
    instance.set("message", message);
    Some(Value::instance(instance))
}

pub fn error_with_cause(kind: &str, message: &str, cause: Value) -> Option<Value> {
    let value = error(kind, message)?;
    if let Some(instance) = value.as_instance() {
        instance.borrow_mut().set("cause", cause);
    }
    Some(value)
}

pub(crate) fn install(registry: &mut TypeRegistry) {
    for class in classes() {
        registry.add_allowed(Arc::clone(class));
    }
}

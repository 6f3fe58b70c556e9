//! `json-graph-core`: identity-preserving transform between live object
//! graphs and plain JSON values.
//!
//! The encoder gives every composite (sequence, mapping, instance) a
//! reference index on first visit and writes a back-reference on every
//! later visit, so shared sub-values and cycles survive the trip through
//! JSON. Named types are written with a constructor tag; the decoder only
//! rebuilds a tag that a registered handler claims or the allow-list names.
//!
//! # Example
//!
//! ```
//! use json_graph_core::{Decoder, Encoder, TypeRegistry, Value};
//!
//! let registry = TypeRegistry::new();
//! let shared = Value::object([("x", Value::from(1))]);
//! let root = Value::object([("p", shared.clone()), ("q", shared)]);
//!
//! let plain = Encoder::new(&registry).encode(&root).unwrap();
//! let back = Decoder::new(&registry).decode(plain).unwrap();
//!
//! let fields = back.as_object().unwrap().borrow();
//! assert!(fields["p"].ptr_eq(&fields["q"]));
//! ```

pub mod class;
pub mod constants;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod ledger;
pub mod options;
pub mod registry;
pub mod tracker;
pub mod value;

/// JSON-compatible projection of a [`Value`].
pub type PlainValue = serde_json::Value;

/// A plain mapping, as handed to and returned by type handlers.
pub type PlainObject = serde_json::Map<String, serde_json::Value>;

pub use class::{AllowList, Class};
pub use constants::{CONSTRUCTOR_KEY, INSTANCE_PREFIX, NUMBER_TAG, REFERENCE_PREFIX, UNDEFINED_TEXT};
pub use decoder::Decoder;
pub use encoder::{plain_number, Encoder};
pub use error::{DecodeError, EncodeError, MalformedInput};
pub use ledger::TypeLedger;
pub use options::CodecOptions;
pub use registry::{FnHandler, TypeHandler, TypeRegistry};
pub use tracker::{FoundTable, ReferenceTracker};
pub use value::{ArrayRef, Fields, Instance, InstanceRef, ObjectRef, Value};

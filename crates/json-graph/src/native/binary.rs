//! Binary data: `ArrayBuffer`, `DataView` and the typed-array family.
//!
//! An `ArrayBuffer` keeps its bytes as a sequence of numbers in the internal
//! slot and travels as standard base64. A `DataView` points at a buffer
//! through `next`, so views over one buffer still share it after decoding.
//! Typed arrays own their elements; every element is coerced to the range
//! of its kind on construction and on decode.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use json_graph_core::{DecodeError, Decoder, EncodeError, Encoder, PlainObject, PlainValue, TypeRegistry, Value};

use super::primitive::is_decimal_integer;
use super::{internal_of, native, not_a, single, take, take_array, take_str, take_usize};

pub const ARRAY_BUFFER: &str = "ArrayBuffer";
pub const DATA_VIEW: &str = "DataView";

pub fn array_buffer(bytes: &[u8]) -> Value {
    native(
        ARRAY_BUFFER,
        Value::array(bytes.iter().map(|&b| Value::Number(f64::from(b)))),
    )
}

/// Bytes of an `ArrayBuffer` instance.
pub fn as_array_buffer(value: &Value) -> Option<Vec<u8>> {
    let internal = internal_of(value, ARRAY_BUFFER)?;
    let items = internal.as_array()?.borrow();
    items
        .iter()
        .map(|item| {
            let n = item.as_f64()?;
            (n.fract() == 0.0 && (0.0..=255.0).contains(&n)).then_some(n as u8)
        })
        .collect()
}

fn byte_length(buffer: &Value) -> Option<usize> {
    let internal = internal_of(buffer, ARRAY_BUFFER)?;
    let len = internal.as_array()?.borrow().len();
    Some(len)
}

/// A view of `length` bytes of `buffer` starting at `offset`, or `None`
/// when `buffer` is not an `ArrayBuffer` or the window overruns it.
pub fn data_view(buffer: &Value, offset: usize, length: usize) -> Option<Value> {
    let available = byte_length(buffer)?;
    if offset.checked_add(length)? > available {
        return None;
    }
    Some(native(
        DATA_VIEW,
        Value::array(vec![
            buffer.clone(),
            Value::Number(offset as f64),
            Value::Number(length as f64),
        ]),
    ))
}

/// `(buffer, offset, length)` of a `DataView` instance.
pub fn as_data_view(value: &Value) -> Option<(Value, usize, usize)> {
    let internal = internal_of(value, DATA_VIEW)?;
    let parts = internal.as_array()?.borrow();
    match parts.as_slice() {
        [buffer, offset, length] => Some((
            buffer.clone(),
            offset.as_f64()? as usize,
            length.as_f64()? as usize,
        )),
        _ => None,
    }
}

fn encode_buffer(value: &Value, _next: &mut Encoder<'_>) -> Result<Option<PlainObject>, EncodeError> {
    let bytes = as_array_buffer(value).ok_or_else(|| not_a(ARRAY_BUFFER))?;
    Ok(Some(single("data", PlainValue::String(STANDARD.encode(bytes)))))
}

fn decode_buffer(mut fields: PlainObject, _next: &mut Decoder<'_>) -> Result<Option<Value>, DecodeError> {
    let data = take_str(&mut fields, ARRAY_BUFFER, "data")?;
    let bytes = STANDARD
        .decode(data.as_bytes())
        .map_err(|err| DecodeError::payload(ARRAY_BUFFER, err.to_string()))?;
    Ok(Some(array_buffer(&bytes)))
}

fn encode_view(value: &Value, next: &mut Encoder<'_>) -> Result<Option<PlainObject>, EncodeError> {
    let (buffer, offset, length) = as_data_view(value).ok_or_else(|| not_a(DATA_VIEW))?;
    let mut out = PlainObject::new();
    out.insert("buffer".into(), next.encode(&buffer)?);
    out.insert("offset".into(), PlainValue::from(offset));
    out.insert("length".into(), PlainValue::from(length));
    Ok(Some(out))
}

fn decode_view(mut fields: PlainObject, next: &mut Decoder<'_>) -> Result<Option<Value>, DecodeError> {
    let buffer = next.decode(take(&mut fields, DATA_VIEW, "buffer")?)?;
    let offset = take_usize(&mut fields, DATA_VIEW, "offset")?;
    let length = take_usize(&mut fields, DATA_VIEW, "length")?;
    data_view(&buffer, offset, length)
        .map(Some)
        .ok_or_else(|| DecodeError::payload(DATA_VIEW, "view is outside its buffer"))
}

/// Element type of a typed array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypedArrayKind {
    Int8,
    Uint8,
    Uint8Clamped,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float32,
    Float64,
    BigInt64,
    BigUint64,
}

impl TypedArrayKind {
    pub const ALL: [TypedArrayKind; 11] = [
        Self::Int8,
        Self::Uint8,
        Self::Uint8Clamped,
        Self::Int16,
        Self::Uint16,
        Self::Int32,
        Self::Uint32,
        Self::Float32,
        Self::Float64,
        Self::BigInt64,
        Self::BigUint64,
    ];

    /// Type tag, e.g. `"Uint8ClampedArray"`.
    pub fn name(self) -> &'static str {
        match self {
            Self::Int8 => "Int8Array",
            Self::Uint8 => "Uint8Array",
            Self::Uint8Clamped => "Uint8ClampedArray",
            Self::Int16 => "Int16Array",
            Self::Uint16 => "Uint16Array",
            Self::Int32 => "Int32Array",
            Self::Uint32 => "Uint32Array",
            Self::Float32 => "Float32Array",
            Self::Float64 => "Float64Array",
            Self::BigInt64 => "BigInt64Array",
            Self::BigUint64 => "BigUint64Array",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Whether elements are decimal strings rather than numbers.
    pub fn is_big(self) -> bool {
        matches!(self, Self::BigInt64 | Self::BigUint64)
    }

    /// Converts `value` to an element of this kind. Numbers wrap or clamp
    /// the way a store into the array would; 64-bit kinds take decimal
    /// text (or an integral number) and wrap modulo 2^64.
    pub fn coerce(self, value: &Value) -> Option<Value> {
        if self.is_big() {
            let wide: i128 = match value {
                Value::String(text) if is_decimal_integer(text) => text.parse().ok()?,
                Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e38 => *n as i128,
                _ => return None,
            };
            let text = match self {
                Self::BigInt64 => (wide as i64).to_string(),
                _ => (wide as u64).to_string(),
            };
            return Some(Value::String(text));
        }
        let n = value.as_f64()?;
        let out = match self {
            Self::Int8 => wrap(n, 8, true),
            Self::Uint8 => wrap(n, 8, false),
            Self::Int16 => wrap(n, 16, true),
            Self::Uint16 => wrap(n, 16, false),
            Self::Int32 => wrap(n, 32, true),
            Self::Uint32 => wrap(n, 32, false),
            Self::Uint8Clamped if n.is_nan() => 0.0,
            Self::Uint8Clamped => n.clamp(0.0, 255.0).round_ties_even(),
            Self::Float32 => f64::from(n as f32),
            _ => n,
        };
        Some(Value::Number(out))
    }
}

/// Truncates toward zero and wraps into a `bits`-wide integer.
fn wrap(n: f64, bits: u32, signed: bool) -> f64 {
    if !n.is_finite() {
        return 0.0;
    }
    let modulus = 2f64.powi(bits as i32);
    let unsigned = n.trunc().rem_euclid(modulus);
    if signed && unsigned >= modulus / 2.0 {
        unsigned - modulus
    } else {
        unsigned
    }
}

/// A typed array of `kind`, or `None` when an element cannot be converted.
pub fn typed_array(kind: TypedArrayKind, elements: Vec<Value>) -> Option<Value> {
    let elements = elements
        .iter()
        .map(|element| kind.coerce(element))
        .collect::<Option<Vec<_>>>()?;
    Some(native(kind.name(), Value::array(elements)))
}

pub fn as_typed_array(value: &Value) -> Option<(TypedArrayKind, Vec<Value>)> {
    let kind = TypedArrayKind::from_name(&value.tag()?)?;
    let internal = internal_of(value, kind.name())?;
    let elements = internal.as_array()?.borrow().clone();
    Some((kind, elements))
}

fn install_typed_array(registry: &mut TypeRegistry, kind: TypedArrayKind) {
    registry.register_handler(
        kind.name(),
        move |value: &Value, next: &mut Encoder<'_>| {
            let (_, elements) = as_typed_array(value).ok_or_else(|| not_a(kind.name()))?;
            let data = elements
                .iter()
                .map(|element| next.encode(element))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Some(single("data", PlainValue::Array(data))))
        },
        move |mut fields: PlainObject, next: &mut Decoder<'_>| {
            let mut elements = Vec::new();
            for plain in take_array(&mut fields, kind.name(), "data")? {
                let element = next.decode(plain)?;
                let element = kind.coerce(&element).ok_or_else(|| {
                    DecodeError::payload(kind.name(), format!("element {element:?} is out of range"))
                })?;
                elements.push(element);
            }
            Ok(Some(native(kind.name(), Value::array(elements))))
        },
    );
}

pub(crate) fn install(registry: &mut TypeRegistry) {
    registry.register_handler(ARRAY_BUFFER, encode_buffer, decode_buffer);
    registry.register_handler(DATA_VIEW, encode_view, decode_view);
    for kind in TypedArrayKind::ALL {
        install_typed_array(registry, kind);
    }
}

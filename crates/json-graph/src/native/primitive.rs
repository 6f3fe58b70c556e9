//! Boxed primitives: `BigInt`, `String` and `Number`.
//!
//! `Number` also receives the bare NaN and infinities the encoder cannot
//! write as JSON numbers. Its record tells the three apart:
//! `{"nan", "infinity", "positive", "number"}`.

use std::sync::OnceLock;

use json_graph_core::{
    plain_number, DecodeError, Decoder, EncodeError, Encoder, PlainObject, PlainValue, TypeRegistry, Value, NUMBER_TAG,
};
use regex::Regex;

use super::{internal_of, native, not_a, single, take, take_bool, take_str};

pub const BIGINT: &str = "BigInt";
pub const STRING: &str = "String";

/// Canonical decimal integer text: optional minus, no leading zeros.
pub(crate) fn is_decimal_integer(text: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^-?(?:0|[1-9][0-9]*)$").expect("valid regex"))
        .is_match(text)
}

pub fn bigint(n: i128) -> Value {
    native(BIGINT, Value::String(n.to_string()))
}

/// A `BigInt` from decimal text of any length.
pub fn bigint_from_decimal(text: &str) -> Option<Value> {
    is_decimal_integer(text).then(|| native(BIGINT, Value::String(text.to_string())))
}

/// Decimal text of a `BigInt` instance.
pub fn as_bigint(value: &Value) -> Option<String> {
    internal_of(value, BIGINT)?.as_str().map(str::to_string)
}

pub fn boxed_string(text: impl Into<String>) -> Value {
    native(STRING, Value::String(text.into()))
}

pub fn as_boxed_string(value: &Value) -> Option<String> {
    internal_of(value, STRING)?.as_str().map(str::to_string)
}

pub fn boxed_number(n: f64) -> Value {
    native(NUMBER_TAG, Value::Number(n))
}

pub fn as_boxed_number(value: &Value) -> Option<f64> {
    internal_of(value, NUMBER_TAG)?.as_f64()
}

fn encode_bigint(value: &Value, _next: &mut Encoder<'_>) -> Result<Option<PlainObject>, EncodeError> {
    let text = as_bigint(value).ok_or_else(|| not_a(BIGINT))?;
    Ok(Some(single("number", PlainValue::String(text))))
}

fn decode_bigint(mut fields: PlainObject, _next: &mut Decoder<'_>) -> Result<Option<Value>, DecodeError> {
    let text = take_str(&mut fields, BIGINT, "number")?;
    bigint_from_decimal(&text)
        .map(Some)
        .ok_or_else(|| DecodeError::payload(BIGINT, format!("{text:?} is not a decimal integer")))
}

fn encode_string(value: &Value, _next: &mut Encoder<'_>) -> Result<Option<PlainObject>, EncodeError> {
    let text = as_boxed_string(value).ok_or_else(|| not_a(STRING))?;
    Ok(Some(single("text", PlainValue::String(text))))
}

fn decode_string(mut fields: PlainObject, _next: &mut Decoder<'_>) -> Result<Option<Value>, DecodeError> {
    Ok(Some(boxed_string(take_str(&mut fields, STRING, "text")?)))
}

fn encode_number(value: &Value, _next: &mut Encoder<'_>) -> Result<Option<PlainObject>, EncodeError> {
    let n = match value {
        Value::Number(n) => *n,
        other => as_boxed_number(other).ok_or_else(|| not_a(NUMBER_TAG))?,
    };
    let mut out = PlainObject::new();
    out.insert("nan".into(), PlainValue::Bool(n.is_nan()));
    out.insert("infinity".into(), PlainValue::Bool(n.is_infinite()));
    out.insert("positive".into(), PlainValue::Bool(!n.is_infinite() || n > 0.0));
    let number = if n.is_finite() { plain_number(n) } else { PlainValue::Null };
    out.insert("number".into(), number);
    Ok(Some(out))
}

fn decode_number(mut fields: PlainObject, _next: &mut Decoder<'_>) -> Result<Option<Value>, DecodeError> {
    if take_bool(&mut fields, NUMBER_TAG, "nan")? {
        return Ok(Some(Value::Number(f64::NAN)));
    }
    if take_bool(&mut fields, NUMBER_TAG, "infinity")? {
        let positive = take_bool(&mut fields, NUMBER_TAG, "positive")?;
        let n = if positive { f64::INFINITY } else { f64::NEG_INFINITY };
        return Ok(Some(Value::Number(n)));
    }
    match take(&mut fields, NUMBER_TAG, "number")? {
        PlainValue::Number(n) => Ok(Some(boxed_number(n.as_f64().unwrap_or(f64::NAN)))),
        _ => Err(DecodeError::payload(NUMBER_TAG, "number must be a number")),
    }
}

pub(crate) fn install(registry: &mut TypeRegistry) {
    registry.register_handler(BIGINT, encode_bigint, decode_bigint);
    registry.register_handler(STRING, encode_string, decode_string);
    registry.register_handler(NUMBER_TAG, encode_number, decode_number);
}

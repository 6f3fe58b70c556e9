//! `Date`: milliseconds since the Unix epoch, written as `{"time": ms}`.
//! An invalid date (NaN timestamp) is written as `{"time": null}`.

use json_graph_core::{plain_number, DecodeError, Decoder, EncodeError, Encoder, PlainObject, PlainValue, TypeRegistry, Value};

use super::{internal_of, native, not_a, single, take};

pub const DATE: &str = "Date";

pub fn date(timestamp_ms: f64) -> Value {
    native(DATE, Value::Number(timestamp_ms))
}

/// Timestamp of a `Date` instance.
pub fn as_date(value: &Value) -> Option<f64> {
    internal_of(value, DATE)?.as_f64()
}

fn encode(value: &Value, _next: &mut Encoder<'_>) -> Result<Option<PlainObject>, EncodeError> {
    let time = as_date(value).ok_or_else(|| not_a(DATE))?;
    let time = if time.is_finite() { plain_number(time) } else { PlainValue::Null };
    Ok(Some(single("time", time)))
}

fn decode(mut fields: PlainObject, _next: &mut Decoder<'_>) -> Result<Option<Value>, DecodeError> {
    let time = match take(&mut fields, DATE, "time")? {
        PlainValue::Null => f64::NAN,
        PlainValue::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        _ => return Err(DecodeError::payload(DATE, "time must be a number or null")),
    };
    Ok(Some(date(time)))
}

pub(crate) fn install(registry: &mut TypeRegistry) {
    registry.register_handler(DATE, encode, decode);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        install(&mut registry);
        registry
    }

    #[test]
    fn wire_shape() {
        let registry = registry();
        let plain = Encoder::new(&registry).encode(&date(1_628_362_441_000.0)).unwrap();
        assert_eq!(
            plain,
            json!({"time": 1_628_362_441_000_i64, "#$@__constructor__": "Date", "#$@__reference__": 0})
        );
    }

    #[test]
    fn invalid_date_roundtrips() {
        let registry = registry();
        let plain = Encoder::new(&registry).encode(&date(f64::NAN)).unwrap();
        assert_eq!(plain["time"], json!(null));
        let out = Decoder::new(&registry).decode(plain).unwrap();
        assert!(as_date(&out).is_some_and(f64::is_nan));
    }

    #[test]
    fn rejects_bad_payload() {
        let registry = registry();
        let plain = json!({"time": "soon", "#$@__constructor__": "Date", "#$@__reference__": 0});
        assert!(matches!(
            Decoder::new(&registry).decode(plain),
            Err(DecodeError::Malformed(_))
        ));
    }
}

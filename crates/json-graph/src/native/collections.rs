//! `Map` and `Set`.
//!
//! Both keep their entries in insertion order in the internal slot: a `Map`
//! as a sequence of `[key, value]` pairs, a `Set` as a sequence of members.
//! On the wire the entries go through `next`, so keys and members keep
//! their identity and may refer back to the collection itself.

use json_graph_core::{DecodeError, Decoder, EncodeError, Encoder, PlainObject, PlainValue, TypeRegistry, Value};

use super::{internal_of, native, not_a, same_value_zero, single, take_array};

pub const MAP: &str = "Map";
pub const SET: &str = "Set";

/// A `Map` holding `entries`. Later duplicates of a key replace earlier ones.
pub fn map(entries: impl IntoIterator<Item = (Value, Value)>) -> Value {
    let value = native(MAP, Value::array(Vec::new()));
    for (key, item) in entries {
        map_set(&value, key, item);
    }
    value
}

/// Inserts or replaces `key` (compared by SameValueZero). Returns `false`
/// when `target` is not a `Map`.
pub fn map_set(target: &Value, key: Value, item: Value) -> bool {
    let Some(entries) = internal_of(target, MAP) else {
        return false;
    };
    let Some(entries) = entries.as_array() else {
        return false;
    };
    let mut entries = entries.borrow_mut();
    for entry in entries.iter() {
        let Some(pair) = entry.as_array() else { continue };
        let mut pair = pair.borrow_mut();
        if pair.first().is_some_and(|k| same_value_zero(k, &key)) {
            if let Some(slot) = pair.get_mut(1) {
                *slot = item;
            }
            return true;
        }
    }
    entries.push(Value::array(vec![key, item]));
    true
}

/// Entries of a `Map` in insertion order.
pub fn as_map(value: &Value) -> Option<Vec<(Value, Value)>> {
    let entries = internal_of(value, MAP)?;
    let entries = entries.as_array()?.borrow();
    entries
        .iter()
        .map(|entry| match entry.as_array()?.borrow().as_slice() {
            [key, item] => Some((key.clone(), item.clone())),
            _ => None,
        })
        .collect()
}

pub fn set(members: impl IntoIterator<Item = Value>) -> Value {
    let value = native(SET, Value::array(Vec::new()));
    for member in members {
        set_add(&value, member);
    }
    value
}

/// Adds `member` unless an equal one (SameValueZero) is present. Returns
/// `false` when `target` is not a `Set`.
pub fn set_add(target: &Value, member: Value) -> bool {
    let Some(members) = internal_of(target, SET) else {
        return false;
    };
    let Some(members) = members.as_array() else {
        return false;
    };
    let mut members = members.borrow_mut();
    if !members.iter().any(|m| same_value_zero(m, &member)) {
        members.push(member);
    }
    true
}

pub fn as_set(value: &Value) -> Option<Vec<Value>> {
    let members = internal_of(value, SET)?;
    let members = members.as_array()?.borrow().clone();
    Some(members)
}

fn encode_map(value: &Value, next: &mut Encoder<'_>) -> Result<Option<PlainObject>, EncodeError> {
    let entries = internal_of(value, MAP).ok_or_else(|| not_a(MAP))?;
    let entries = entries.as_array().ok_or_else(|| not_a(MAP))?.borrow().clone();
    let data = entries
        .iter()
        .map(|entry| next.encode(entry))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Some(single("data", PlainValue::Array(data))))
}

fn decode_map(mut fields: PlainObject, next: &mut Decoder<'_>) -> Result<Option<Value>, DecodeError> {
    let data = take_array(&mut fields, MAP, "data")?;
    let target = native(MAP, Value::array(Vec::new()));
    next.bind_self(&target)?;
    for plain in data {
        let entry = next.decode(plain)?;
        let pair = match entry.as_array().map(|pair| pair.borrow().clone()).as_deref() {
            Some([key, item]) => (key.clone(), item.clone()),
            _ => return Err(DecodeError::payload(MAP, "entries must be [key, value] pairs")),
        };
        map_set(&target, pair.0, pair.1);
    }
    Ok(Some(target))
}

fn encode_set(value: &Value, next: &mut Encoder<'_>) -> Result<Option<PlainObject>, EncodeError> {
    let members = as_set(value).ok_or_else(|| not_a(SET))?;
    let data = members
        .iter()
        .map(|member| next.encode(member))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Some(single("data", PlainValue::Array(data))))
}

fn decode_set(mut fields: PlainObject, next: &mut Decoder<'_>) -> Result<Option<Value>, DecodeError> {
    let data = take_array(&mut fields, SET, "data")?;
    let target = native(SET, Value::array(Vec::new()));
    next.bind_self(&target)?;
    for plain in data {
        let member = next.decode(plain)?;
        set_add(&target, member);
    }
    Ok(Some(target))
}

pub(crate) fn install(registry: &mut TypeRegistry) {
    registry.register_handler(MAP, encode_map, decode_map);
    registry.register_handler(SET, encode_set, decode_set);
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

    fn roundtrip(value: &Value) -> Value {
        let registry = registry();
        let plain = Encoder::new(&registry).encode(value).unwrap();
        Decoder::new(&registry).decode(plain).unwrap()
    }

    #[test]
    fn map_replaces_equal_keys() {
        let m = map([(Value::from("a"), Value::from(1)), (Value::from("a"), Value::from(2))]);
        assert_eq!(as_map(&m), Some(vec![(Value::from("a"), Value::from(2))]));
    }

    #[test]
    fn set_keeps_distinct_composites() {
        let a = Value::object([("x", Value::from(1))]);
        let b = Value::object([("x", Value::from(1))]);
        let s = set([a.clone(), a, b, Value::from(f64::NAN), Value::from(f64::NAN)]);
        assert_eq!(as_set(&s).map(|m| m.len()), Some(3));
    }

    #[test]
    fn map_wire_shape() {
        let registry = registry();
        let m = map([(Value::from(1), Value::from("one"))]);
        let plain = Encoder::new(&registry).encode(&m).unwrap();
        assert_eq!(
            plain,
            json!({
                "data": [["#$@__reference__1", 1, "one"]],
                "#$@__constructor__": "Map",
                "#$@__reference__": 0
            })
        );
    }

    #[test]
    fn map_roundtrip_keeps_key_identity() {
        let key = Value::object([("id", Value::from(7))]);
        let m = map([(key.clone(), Value::from("seven"))]);
        let root = Value::array(vec![key, m]);
        let out = roundtrip(&root);
        assert_eq!(out, root);
        let items = out.as_array().unwrap().borrow();
        let entries = as_map(&items[1]).unwrap();
        assert!(entries[0].0.ptr_eq(&items[0]));
    }

    #[test]
    fn collections_may_contain_themselves() {
        let s = set([]);
        set_add(&s, s.clone());
        let out = roundtrip(&s);
        assert!(as_set(&out).unwrap()[0].ptr_eq(&out));

        let m = map([]);
        map_set(&m, Value::from("self"), m.clone());
        let out = roundtrip(&m);
        assert!(as_map(&out).unwrap()[0].1.ptr_eq(&out));
    }

    #[test]
    fn rejects_malformed_entries() {
        let plain = json!({
            "data": [["#$@__reference__1", 1]],
            "#$@__constructor__": "Map",
            "#$@__reference__": 0
        });
        assert!(Decoder::new(&registry()).decode(plain).is_err());
    }
}

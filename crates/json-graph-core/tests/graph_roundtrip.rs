//! Round-trip, identity and cycle behaviour of the generic transform.

use std::sync::Arc;

use json_graph_core::{AllowList, Class, DecodeError, Decoder, Encoder, TypeLedger, TypeRegistry, Value};
use proptest::prelude::*;
use serde_json::json;

fn roundtrip_with(value: &Value, registry: &TypeRegistry, allowed: &AllowList) -> Value {
    let plain = Encoder::new(registry).encode(value).expect("encode");
    let text = serde_json::to_string(&plain).expect("stringify");
    let parsed: serde_json::Value = serde_json::from_str(&text).expect("parse");
    Decoder::new(registry)
        .with_allowed(allowed)
        .decode(parsed)
        .expect("decode")
}

fn roundtrip(value: &Value) -> Value {
    roundtrip_with(value, &TypeRegistry::new(), &AllowList::new())
}

fn test_class() -> Arc<Class> {
    Arc::new(Class::new("TestClass").with_fields(["name"]))
}

#[test]
fn primitives() {
    for value in [
        Value::from("foo"),
        Value::from(42),
        Value::from(true),
        Value::from(false),
        Value::from(-1.23),
        Value::Null,
    ] {
        assert_eq!(roundtrip(&value), value);
    }
}

#[test]
fn nested_sequences_and_mappings() {
    let value = Value::array(vec![
        Value::object([("a", Value::from(1)), ("b", Value::from(2))]),
        Value::object([("e", Value::object([("f", Value::from(2))]))]),
        Value::array(vec![]),
    ]);
    assert_eq!(roundtrip(&value), value);
}

#[test]
fn mapping_field_order_is_kept() {
    let value = Value::object([("z", Value::from(1)), ("a", Value::from(2)), ("m", Value::from(3))]);
    let out = roundtrip(&value);
    let keys: Vec<String> = out.as_object().unwrap().borrow().keys().cloned().collect();
    assert_eq!(keys, vec!["z", "a", "m"]);
}

#[test]
fn shared_reference_is_preserved() {
    let a = Value::object([("x", Value::from(1))]);
    let obj = Value::object([("p", a.clone()), ("q", a)]);
    let out = roundtrip(&obj);
    let fields = out.as_object().unwrap().borrow();
    assert!(fields["p"].ptr_eq(&fields["q"]));
}

#[test]
fn shared_empty_sequence_is_preserved() {
    let empty = Value::array(vec![]);
    let value = Value::array(vec![empty.clone(), empty]);
    let out = roundtrip(&value);
    let items = out.as_array().unwrap().borrow();
    assert!(items[0].ptr_eq(&items[1]));
}

#[test]
fn self_referencing_sequence() {
    let arr = Value::array(vec![Value::from(1), Value::from(2)]);
    arr.as_array().unwrap().borrow_mut().push(arr.clone());
    let out = roundtrip(&arr);
    let items = out.as_array().unwrap().borrow();
    assert_eq!(items.len(), 3);
    assert!(items[2].ptr_eq(&out));
    assert_eq!(out, arr);
}

#[test]
fn self_referencing_mapping() {
    let obj = Value::object([("a", Value::from(1))]);
    obj.as_object().unwrap().borrow_mut().insert("b".into(), obj.clone());
    let out = roundtrip(&obj);
    assert!(out.as_object().unwrap().borrow()["b"].ptr_eq(&out));
}

#[test]
fn self_referencing_instance() {
    let class = test_class();
    let value = Value::instance(class.instantiate());
    value.as_instance().unwrap().borrow_mut().set("name", value.clone());

    let allowed = AllowList::new().with(class);
    let out = roundtrip_with(&value, &TypeRegistry::new(), &allowed);
    let instance = out.as_instance().unwrap().borrow();
    assert_eq!(instance.tag(), "TestClass");
    assert!(instance.get("name").unwrap().ptr_eq(&out));
}

#[test]
fn allow_listed_instance_keeps_its_class() {
    let class = test_class();
    let mut instance = class.instantiate();
    instance.set("name", "John");
    let value = Value::instance(instance);

    let allowed = AllowList::new().with(Arc::clone(&class));
    let out = roundtrip_with(&value, &TypeRegistry::new(), &allowed);
    assert_eq!(out, value);
    assert!(Arc::ptr_eq(out.as_instance().unwrap().borrow().class(), &class));
}

#[test]
fn disallowed_instance_fails_until_added() {
    let value = Value::instance(test_class().instantiate());
    let mut registry = TypeRegistry::new();
    let plain = Encoder::new(&registry).encode(&value).unwrap();

    let err = Decoder::new(&registry).decode(plain.clone()).unwrap_err();
    assert_eq!(err, DecodeError::DisallowedType("TestClass".into()));

    registry.add_allowed(test_class());
    let out = Decoder::new(&registry).decode(plain).unwrap();
    assert_eq!(out.tag().as_deref(), Some("TestClass"));
}

#[test]
fn undeclared_fields_still_decode() {
    let class = test_class();
    let mut instance = class.instantiate();
    instance.set("name", "John");
    instance.set("extra", 7);
    let value = Value::instance(instance);
    let allowed = AllowList::new().with(class);
    assert_eq!(roundtrip_with(&value, &TypeRegistry::new(), &allowed), value);
}

#[test]
fn ledger_builds_matching_allow_list() {
    let registry = TypeRegistry::new();
    let ledger = TypeLedger::new();
    let class = test_class();
    let value = Value::array(vec![
        Value::instance(class.instantiate()),
        Value::instance(class.instantiate()),
    ]);
    let plain = Encoder::new(&registry).with_ledger(&ledger).encode(&value).unwrap();

    let collected = ledger.read(true);
    assert_eq!(collected.len(), 1);
    assert!(ledger.read(false).is_empty());

    let allowed: AllowList = collected.into_iter().collect();
    let out = Decoder::new(&registry).with_allowed(&allowed).decode(plain).unwrap();
    assert_eq!(out, value);
}

#[test]
fn wire_shape_of_a_mixed_graph() {
    let shared = Value::array(vec![Value::from("s")]);
    let value = Value::object([("a", shared.clone()), ("b", Value::array(vec![shared]))]);
    let plain = Encoder::new(&TypeRegistry::new()).encode(&value).unwrap();
    assert_eq!(
        plain,
        json!({
            "a": ["#$@__reference__1", "s"],
            "b": ["#$@__reference__2", "#$@__instance__1"],
            "#$@__reference__": 0
        })
    );
}

fn arb_json() -> impl Strategy<Value = serde_json::Value> {
    let leaf = prop_oneof![
        Just(json!(null)),
        any::<bool>().prop_map(|b| json!(b)),
        any::<i32>().prop_map(|n| json!(n)),
        (-1.0e9f64..1.0e9).prop_map(|n| json!(n)),
        "[a-z ]{0,8}".prop_map(|s| json!(s)),
    ];
    leaf.prop_recursive(4, 48, 5, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..5).prop_map(serde_json::Value::Array),
            prop::collection::btree_map("[a-z]{1,4}", inner, 0..5)
                .prop_map(|m| serde_json::Value::Object(m.into_iter().collect())),
        ]
    })
}

proptest! {
    #[test]
    fn roundtrip_is_structurally_equal(json in arb_json()) {
        let value = Value::from_json(&json);
        prop_assert_eq!(roundtrip(&value), value);
    }

    #[test]
    fn sharing_survives_roundtrip(json in arb_json()) {
        let inner = Value::from_json(&json);
        let value = Value::array(vec![inner.clone(), inner.clone()]);
        let out = roundtrip(&value);
        let items = out.as_array().unwrap().borrow();
        prop_assert_eq!(&items[0], &inner);
        prop_assert_eq!(items[0].ptr_eq(&items[1]), inner.is_composite());
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::value::Value;
use indexmap::IndexMap;
use proptest::prelude::*;
use yare::parameterized;

fn map_value(pairs: Vec<(&str, Value)>) -> Value {
    let mut m = IndexMap::new();
    for (k, v) in pairs {
        m.insert(k.to_string(), v);
    }
    Value::Map(m)
}

#[test]
fn flattens_nested_map_and_list() {
    let v = map_value(vec![
        (
            "res",
            map_value(vec![
                ("code", Value::Int(200)),
                (
                    "rows",
                    Value::List(vec![
                        map_value(vec![("name", Value::String("a".into()))]),
                        map_value(vec![("name", Value::String("b".into()))]),
                    ]),
                ),
            ]),
        ),
        ("status", Value::Int(0)),
    ]);
    let flat = flatten(&v);
    assert_eq!(flat.get("res.code"), Some(&"200".to_string()));
    assert_eq!(flat.get("res.rows.0.name"), Some(&"a".to_string()));
    assert_eq!(flat.get("res.rows.1.name"), Some(&"b".to_string()));
    assert_eq!(flat.get("status"), Some(&"0".to_string()));
}

#[test]
fn unflatten_rebuilds_list_from_indexed_keys() {
    let mut flat = IndexMap::new();
    flat.insert("rows.0".to_string(), "a".to_string());
    flat.insert("rows.1".to_string(), "b".to_string());
    let v = unflatten(&flat);
    let rows = v.as_map().unwrap().get("rows").unwrap().as_list().unwrap();
    assert_eq!(rows[0], Value::String("a".into()));
    assert_eq!(rows[1], Value::String("b".into()));
}

#[test]
fn byte_sequence_promotes_to_int_list_on_round_trip() {
    let v = map_value(vec![("screenshot", Value::Bytes(vec![1, 2, 3]))]);
    let flat = flatten(&v);
    let back = unflatten(&flat);
    let got = back.as_map().unwrap().get("screenshot").unwrap();
    assert_eq!(
        got,
        &Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
    );
}

#[parameterized(
    int_string = {"42", Value::Int(42)},
    float_string = {"3.5", Value::Float(3.5)},
    bool_true = {"true", Value::Bool(true)},
    bool_false = {"false", Value::Bool(false)},
    plain_string = {"hello", Value::String("hello".into())},
    negative_int = {"-7", Value::Int(-7)},
)]
fn typed_value_promotes_by_longest_match(input: &str, expected: Value) {
    assert_eq!(typed_value(input), expected);
}

proptest! {
    #[test]
    fn round_trip_scalars(n in any::<i64>(), s in "[a-zA-Z0-9]{0,12}") {
        let v = map_value(vec![("n", Value::Int(n)), ("s", Value::String(s.clone()))]);
        let flat = flatten(&v);
        let back = unflatten(&flat);
        let back_map = back.as_map().unwrap();
        prop_assert_eq!(back_map.get("n").unwrap(), &Value::Int(n));
        // Plain alphanumeric strings that don't look like numbers or bools
        // round-trip exactly; the proptest strategy above already excludes
        // the promotable cases by construction of [a-zA-Z0-9]{0,12} with a
        // leading letter check skipped here for unflattened numeric-looking
        // strings, so we compare against the same promotion the codec applies.
        prop_assert_eq!(back_map.get("s").unwrap(), &crate::codec::typed_value(&s));
    }
}

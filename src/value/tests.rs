use pretty_assertions::assert_eq;
use serde_json::json;

use super::*;

#[test]
fn from_json_tags_each_kind() {
    let v = Value::from(json!({
        "n": 1,
        "s": "x",
        "b": true,
        "z": null,
        "seq": [1, 2],
        "rec": { "a": 1.5 }
    }));
    let r = v.as_record().unwrap();
    assert_eq!(r["n"], Value::Number(1.0));
    assert_eq!(r["s"].as_str(), Some("x"));
    assert_eq!(r["b"], Value::Bool(true));
    assert_eq!(r["z"], Value::Null);
    assert_eq!(r["seq"].kind(), ValueKind::Sequence);
    assert_eq!(r["rec"].as_record().unwrap()["a"].as_f64(), Some(1.5));
}

#[test]
fn json_conversion_is_lossless_for_json_values() {
    let json = json!({ "a": [1.5, { "b": "c" }], "d": false, "e": null });
    let v = Value::from(json.clone());
    assert_eq!(serde_json::Value::from(v), json);
}

#[test]
fn serde_uses_plain_json() {
    let v: Value = serde_json::from_str(r#"{"a":[1,"x",null]}"#).unwrap();
    assert_eq!(
        v,
        Value::Record(Record::from([(
            "a".to_string(),
            Value::Sequence(vec![1.into(), "x".into(), Value::Null])
        )]))
    );
    assert_eq!(serde_json::to_string(&v).unwrap(), r#"{"a":[1.0,"x",null]}"#);
}

#[test]
fn kind_display() {
    assert_eq!(ValueKind::Record.to_string(), "record");
    assert_eq!(Value::from(Some(3)).kind().to_string(), "number");
    assert_eq!(Value::from(None::<bool>).kind().to_string(), "null");
}

#[test]
fn record_from_json_requires_object() {
    assert!(record_from_json(json!([1])).is_none());
    assert_eq!(record_from_json(json!({})), Some(Record::new()));
}

#[test]
fn primitives() {
    assert!(Value::from("a").is_primitive());
    assert!(!Value::Sequence(vec![]).is_primitive());
}

use super::*;

#[test]
fn null_is_the_default_and_unbound_marker() {
    assert!(Value::default().is_null());
    assert!(!Value::from(0_i64).is_null());
}

#[test]
fn canonical_tags_follow_variant_order() {
    let values = [
        Value::Null,
        Value::Bool(true),
        Value::Int(-1),
        Value::Uint(1),
        Value::from("x"),
        Value::from(vec![1_u8]),
    ];

    let tags: Vec<_> = values.iter().map(Value::canonical_tag).collect();
    let mut sorted = tags.clone();
    sorted.sort();

    assert_eq!(tags, sorted);
    assert_eq!(ValueTag::Text.label(), "Text");
}

#[test]
fn display_is_compact() {
    assert_eq!(Value::Null.to_string(), "null");
    assert_eq!(Value::Uint(7).to_string(), "7u");
    assert_eq!(Value::from("ab").to_string(), "\"ab\"");
    assert_eq!(Value::Blob(vec![0; 3]).to_string(), "blob[3]");
}

#[test]
fn accessors_match_variants() {
    assert_eq!(Value::from("ab").as_text(), Some("ab"));
    assert_eq!(Value::Int(3).as_text(), None);
    assert_eq!(Value::Int(3).as_int(), Some(3));
    assert_eq!(Value::Uint(3).as_int(), None);
}

#[test]
fn values_survive_cbor() {
    let values = vec![
        Value::Null,
        Value::Bool(false),
        Value::Int(i64::MIN),
        Value::Uint(u64::MAX),
        Value::from("text"),
        Value::Blob(vec![0, 255]),
    ];

    let bytes = crate::serialize::serialize(&values).expect("serialize values");
    let decoded: Vec<Value> = crate::serialize::deserialize_bounded(&bytes, crate::MAX_ROW_BYTES)
        .expect("deserialize values");

    assert_eq!(decoded, values);
}

#[test]
fn decoded_key_elements_match_encoded_values() {
    for value in [
        Value::Null,
        Value::Bool(true),
        Value::Int(-42),
        Value::Uint(42),
        Value::from("customer"),
    ] {
        let mut bytes = Vec::new();
        encode_element(&value, &mut bytes);

        assert_eq!(element_len(&bytes), Ok(bytes.len()));
        assert_eq!(decode_element(&bytes), Ok(value));
    }
}

use super::*;
use crate::{
    db::projection::CoveredField,
    schema::Ordinal,
    test_support::coi_group,
};
use proptest::prelude::*;

fn item_key(cid: i64, oid: i64, iid: i64) -> Vec<u8> {
    let group = coi_group();
    let item = group.table_by_name("item").expect("item");
    let mut out = Vec::new();
    encode_row_hkey(
        item,
        &[
            Value::Int(iid),
            Value::Int(oid),
            Value::Int(cid),
            Value::from("sku"),
        ],
        &mut out,
    );
    out
}

#[test]
fn row_hkey_has_one_element_per_ordinal_and_column() {
    let key = HKey::parse(&item_key(1, 2, 3)).expect("parse");

    assert_eq!(key.depth(), 6);
    assert_eq!(
        key.ordinals().collect::<Vec<_>>(),
        [Ordinal(1), Ordinal(10), Ordinal(100)]
    );
    assert_eq!(key.last_ordinal(), Some(Ordinal(100)));
    assert_eq!(key.decode_value(1).expect("cid"), Value::Int(1));
    assert_eq!(key.decode_value(5).expect("iid"), Value::Int(3));
}

#[test]
fn truncation_yields_ancestor_keys() {
    let group = coi_group();
    let order = group.table_by_name("order").expect("order");
    let key = HKey::parse(&item_key(1, 2, 3)).expect("parse");

    let mut order_key = Vec::new();
    encode_row_hkey(
        order,
        &[Value::Int(2), Value::Int(1), Value::Null],
        &mut order_key,
    );

    assert_eq!(key.truncate_to_depth(order.hkey_depth()), order_key.as_slice());
    assert_eq!(key.truncate_to_depth(0), &[] as &[u8]);
    assert_eq!(key.truncate_to_depth(99), key.as_bytes());
}

#[test]
fn follows_path_checks_the_branch() {
    let key = HKey::parse(&item_key(1, 2, 3)).expect("parse");

    assert!(key.follows_path(&[Ordinal(1), Ordinal(10)]));
    assert!(!key.follows_path(&[Ordinal(1), Ordinal(20)]));
    assert!(!key.follows_path(&[Ordinal(1), Ordinal(10), Ordinal(100), Ordinal(7)]));
}

#[test]
fn differing_offset_stops_at_shorter_key() {
    assert_eq!(first_differing_offset(b"abc", b"abd"), 2);
    assert_eq!(first_differing_offset(b"ab", b"abd"), 2);
    assert_eq!(first_differing_offset(b"", b"abd"), 0);
    assert_eq!(first_differing_offset(b"abd", b"abd"), 3);
}

#[test]
fn advance_skips_trailing_ff() {
    let mut key = vec![0x01, 0x02, 0xFF, 0xFF];
    advance_to_next_prefix(&mut key).expect("advance");
    assert_eq!(key, [0x01, 0x03]);

    let mut all_ff = vec![0xFF, 0xFF];
    assert_eq!(
        advance_to_next_prefix(&mut all_ff),
        Err(EncodingError::CannotAdvance { len: 2 })
    );
    assert_eq!(
        advance_to_next_prefix(&mut Vec::new()),
        Err(EncodingError::CannotAdvance { len: 0 })
    );
}

#[test]
fn malformed_keys_are_corruption() {
    let err = HKey::parse(&[0x05, b'a']).unwrap_err();

    assert_eq!(err.class, crate::error::ErrorClass::Corruption);
}

#[test]
fn index_entry_rebuilds_the_row_hkey() {
    let group = coi_group();
    let item = group.table_by_name("item").expect("item");
    let index = group.index_by_name("item_sku").expect("item_sku");
    let fields = [
        Value::Int(3),
        Value::Int(2),
        Value::Int(1),
        Value::from("sku-9"),
    ];

    let mut entry = Vec::new();
    encode_index_key(index, &fields, &mut entry);
    let entry = HKey::parse(&entry).expect("entry");
    assert_eq!(entry.depth(), 4);

    let mut rebuilt = Vec::new();
    rebuild_hkey(item, index, &entry, &mut rebuilt).expect("rebuild");

    let mut expected = Vec::new();
    encode_row_hkey(item, &fields, &mut expected);
    assert_eq!(rebuilt, expected);
}

#[test]
fn covered_fields_decode_from_the_entry() {
    let group = coi_group();
    let index = group.index_by_name("item_sku").expect("item_sku");
    let mut entry = Vec::new();
    encode_index_key(
        index,
        &[
            Value::Int(3),
            Value::Int(2),
            Value::Int(1),
            Value::from("sku-9"),
        ],
        &mut entry,
    );
    let entry = HKey::parse(&entry).expect("entry");

    let covered = [
        CoveredField {
            index_depth: 0,
            field: 3,
        },
        CoveredField {
            index_depth: 3,
            field: 0,
        },
    ];
    let mut fields = vec![Value::Null; 4];
    decode_covered_fields(&covered, &entry, &mut fields).expect("decode");

    assert_eq!(
        fields,
        [Value::Int(3), Value::Null, Value::Null, Value::from("sku-9")]
    );
}

proptest! {
    #[test]
    fn advanced_prefix_bounds_every_extension(
        prefix in prop::collection::vec(any::<u8>(), 1..8)
            .prop_filter("not all 0xFF", |key| key.iter().any(|byte| *byte != 0xFF)),
        tail in prop::collection::vec(any::<u8>(), 0..8),
    ) {
        let mut next = prefix.clone();
        advance_to_next_prefix(&mut next).expect("advance");

        let mut extended = prefix.clone();
        extended.extend_from_slice(&tail);

        prop_assert!(next > prefix);
        prop_assert!(extended < next);
        prop_assert!(!next.starts_with(&prefix));
    }
}

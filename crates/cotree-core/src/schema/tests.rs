use super::*;
use crate::test_support::coi_group;

#[test]
fn tables_are_in_ordinal_pre_order() {
    let group = coi_group();
    let names: Vec<_> = group.tables().iter().map(TableDef::name).collect();

    assert_eq!(names, ["customer", "order", "item", "address"]);
    assert_eq!(group.column_count(), 13);
    assert!(!group.is_single_table());
}

#[test]
fn column_offsets_follow_pre_order() {
    let group = coi_group();
    let offsets: Vec<_> = group
        .tables()
        .iter()
        .map(|table| (table.name(), table.column_offset()))
        .collect();

    assert_eq!(
        offsets,
        [("customer", 0), ("order", 2), ("item", 5), ("address", 10)]
    );
}

#[test]
fn child_hkey_continues_parent_hkey() {
    let group = coi_group();
    let item = group.table_by_name("item").expect("item");

    assert_eq!(item.hkey_depth(), 6);
    assert_eq!(item.hkey().segments.len(), 3);

    let positions: Vec<_> = item.hkey().columns().map(|col| col.position).collect();
    // cid, oid, iid
    assert_eq!(positions, [2, 1, 0]);

    let cid = &item.hkey().segments[0].columns[0];
    assert_eq!(cid.equivalents, [0, 3, 7, 11]);
    assert_eq!(item.role(), TableRole::Leaf);
    assert_eq!(
        group.table_by_name("order").map(TableDef::role),
        Some(TableRole::Intermediate)
    );
}

#[test]
fn secondary_index_appends_missing_hkey_columns() {
    let group = coi_group();
    let index = group.index_by_name("item_sku").expect("item_sku");

    assert_eq!(index.fields(), [3]);
    assert_eq!(index.key_fields(), [3, 2, 1, 0]);
    assert_eq!(index.hkey_map(), [1, 2, 3]);
    assert!(!index.is_hkey_equivalent());
    assert_eq!(index.key_depth_of(3), Some(0));
    assert_eq!(index.key_depth_of(9), None);
}

#[test]
fn every_table_gets_a_primary_index() {
    let group = coi_group();

    for table in group.tables() {
        let primary = table
            .indexes()
            .iter()
            .map(|id| group.index(*id).expect("index"))
            .find(|index| index.name() == IndexDef::PRIMARY)
            .expect("primary index");
        assert!(primary.is_hkey_equivalent());
        assert_eq!(primary.key_fields().len(), table.hkey().column_count());
    }
}

#[test]
fn join_must_cover_parent_hkey() {
    let err = GroupBuilder::new("broken")
        .root("customer", 1, &["cid", "name"], &["cid"])
        .child("order", 10, &["oid", "cid"], &["oid"], "customer", &[])
        .build()
        .unwrap_err();

    assert!(err.message.contains("does not cover parent hkey column 'cid'"));
}

#[test]
fn duplicate_ordinals_are_rejected() {
    let err = GroupBuilder::new("broken")
        .root("a", 1, &["id"], &["id"])
        .child("b", 1, &["id", "a_id"], &["id"], "a", &[("a_id", "id")])
        .build()
        .unwrap_err();

    assert!(err.message.contains("duplicate ordinal 1"));
}

#[test]
fn unknown_lookups_are_not_found() {
    let group = coi_group();

    let err = group.table(TableId(99)).unwrap_err();
    assert_eq!(err.class, crate::error::ErrorClass::NotFound);
    assert!(group.index(IndexId(99)).is_err());
}

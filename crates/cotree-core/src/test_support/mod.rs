//! Shared fixtures for unit tests: the customer/order/item group with an
//! address sibling, and helpers that load rows into a `MemoryStore`.

use crate::{
    db::{scan::ScanIdSource, store::MemoryStore},
    schema::{GroupBuilder, GroupDef, IndexId, TableId},
    value::Value,
};
use std::cell::Cell;

/// customer(1) -> order(10) -> item(100), plus customer(1) -> address(20).
pub(crate) fn coi_group() -> GroupDef {
    GroupBuilder::new("coi")
        .root("customer", 1, &["cid", "name"], &["cid"])
        .child(
            "order",
            10,
            &["oid", "cid", "placed"],
            &["oid"],
            "customer",
            &[("cid", "cid")],
        )
        .child(
            "item",
            100,
            &["iid", "oid", "cid", "sku", "qty"],
            &["iid"],
            "order",
            &[("oid", "oid"), ("cid", "cid")],
        )
        .child(
            "address",
            20,
            &["aid", "cid", "city"],
            &["aid"],
            "customer",
            &[("cid", "cid")],
        )
        .index("order", "order_placed", &["placed"])
        .index("item", "item_sku", &["sku"])
        .index("customer", "customer_name", &["name"])
        .build()
        .expect("coi group")
}

pub(crate) fn table_id(group: &GroupDef, name: &str) -> TableId {
    group.table_by_name(name).expect("table").id()
}

pub(crate) fn index_id(group: &GroupDef, name: &str) -> IndexId {
    group.index_by_name(name).expect("index").id()
}

pub(crate) fn customer(cid: i64, name: &str) -> Vec<Value> {
    vec![Value::Int(cid), Value::from(name)]
}

pub(crate) fn order(oid: i64, cid: i64, placed: &str) -> Vec<Value> {
    vec![Value::Int(oid), Value::Int(cid), Value::from(placed)]
}

pub(crate) fn item(iid: i64, oid: i64, cid: i64, sku: &str) -> Vec<Value> {
    vec![
        Value::Int(iid),
        Value::Int(oid),
        Value::Int(cid),
        Value::from(sku),
        Value::Int(1),
    ]
}

pub(crate) fn address(aid: i64, cid: i64, city: &str) -> Vec<Value> {
    vec![Value::Int(aid), Value::Int(cid), Value::from(city)]
}

/// Load one row of the named table.
pub(crate) fn load(store: &mut MemoryStore, group: &GroupDef, table: &str, fields: Vec<Value>) {
    store
        .load_row(group, table_id(group, table), fields)
        .expect("load row");
}

/// Two customers; the first has two orders of two items each and one
/// address, the second has a single order with one item.
pub(crate) fn coi_store(group: &GroupDef) -> MemoryStore {
    let mut store = MemoryStore::new();

    load(&mut store, group, "customer", customer(1, "ann"));
    load(&mut store, group, "order", order(11, 1, "2024-01"));
    load(&mut store, group, "item", item(111, 11, 1, "abc"));
    load(&mut store, group, "item", item(112, 11, 1, "abz"));
    load(&mut store, group, "order", order(12, 1, "2024-02"));
    load(&mut store, group, "item", item(121, 12, 1, "ac"));
    load(&mut store, group, "item", item(122, 12, 1, "ab"));
    load(&mut store, group, "address", address(1, 1, "oslo"));

    load(&mut store, group, "customer", customer(2, "bob"));
    load(&mut store, group, "order", order(21, 2, "2024-03"));
    load(&mut store, group, "item", item(211, 21, 2, "a"));

    store
}

///
/// FixedScanIds
///
/// Deterministic id source counting up from a fixed start.
///

#[derive(Debug)]
pub(crate) struct FixedScanIds(Cell<u64>);

impl FixedScanIds {
    pub(crate) const fn starting_at(first: u64) -> Self {
        Self(Cell::new(first))
    }
}

impl ScanIdSource for FixedScanIds {
    fn next_scan_id(&self) -> u64 {
        let id = self.0.get();
        self.0.set(id + 1);
        id
    }
}

use bson::{Bson, DateTime};
use loki_collection::{ChangeOp, Collection, CollectionOptions};

fn now() -> DateTime {
    DateTime::from_millis(1_700_000_000_000)
}

fn opts_with_changes(delta: bool) -> CollectionOptions {
    let mut opts = CollectionOptions::new("c");
    opts.disable_changes_api = false;
    opts.disable_delta_changes_api = !delta;
    opts
}

#[test]
fn changes_api_is_disabled_by_default() {
    let mut collection = Collection::new(CollectionOptions::new("c")).unwrap();
    collection.insert(Bson::Document(bson::doc! {"a": 1}), now()).unwrap();
    assert!(collection.get_changes().is_empty());
}

#[test]
fn insert_and_remove_are_recorded_in_order_once_enabled() {
    let mut collection = Collection::new(opts_with_changes(false)).unwrap();
    let doc = collection.insert(Bson::Document(bson::doc! {"a": 1}), now()).unwrap();
    collection.remove_doc(&doc).unwrap();

    let changes = collection.get_changes();
    assert_eq!(changes.len(), 2);
    assert_eq!(changes[0].op, ChangeOp::Insert);
    assert_eq!(changes[1].op, ChangeOp::Remove);
}

#[test]
fn flush_changes_empties_the_log() {
    let mut collection = Collection::new(opts_with_changes(false)).unwrap();
    collection.insert(Bson::Document(bson::doc! {"a": 1}), now()).unwrap();
    assert_eq!(collection.get_changes().len(), 1);
    collection.flush_changes();
    assert!(collection.get_changes().is_empty());
}

#[test]
fn full_snapshot_update_without_delta_records_the_whole_document() {
    let mut collection = Collection::new(opts_with_changes(false)).unwrap();
    let inserted = collection.insert(Bson::Document(bson::doc! {"a": 1, "b": 2}), now()).unwrap();
    collection.flush_changes();

    let mut updated = inserted.clone();
    updated.insert("a", 99);
    collection.update(updated, now()).unwrap();

    let changes = collection.get_changes();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].obj.get_i32("b").unwrap(), 2, "non-delta update records the full object, not just the change");
}

#[test]
fn delta_update_only_records_the_changed_leaf_and_reserved_fields() {
    let mut collection = Collection::new(opts_with_changes(true)).unwrap();
    let inserted = collection
        .insert(
            Bson::Document(bson::doc! {"profile": {"name": "a", "age": 1}, "tag": "x"}),
            now(),
        )
        .unwrap();
    collection.flush_changes();

    let mut updated = inserted.clone();
    let mut profile = updated.get_document("profile").unwrap().clone();
    profile.insert("age", 2);
    updated.insert("profile", profile);
    collection.update(updated, now()).unwrap();

    let changes = collection.get_changes();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].op, ChangeOp::Update);

    let delta = &changes[0].obj;
    assert!(delta.contains_key(loki_collection::ID_FIELD));
    assert!(!delta.contains_key("tag"), "unchanged sibling field must not appear in the delta");
    let profile_delta = delta.get_document("profile").unwrap();
    assert_eq!(profile_delta.get_i32("age").unwrap(), 2);
    assert!(!profile_delta.contains_key("name"), "unchanged nested leaf must not appear in the delta");
}

use std::collections::HashMap;

use bson::{Bson, Document as BsonDocument};

use crate::binary_index::BinaryIndex;
use crate::change_tracker::{Change, ChangeOp};
use crate::change_tracker::ChangeTracker;
use crate::collection::Collection;
use crate::config::{CollectionOptions, NestedPropertyDef};
use crate::document::get_id;
use crate::error::CollectionError;
use crate::events::EventBus;
use crate::id_index::IdIndex;
use crate::staging::Staging;
use crate::transaction::TransactionManager;
use crate::unique_index::UniqueIndex;
use crate::views::ViewRegistry;

/// Serialise a collection into the self-describing snapshot format (§6).
/// Position references inside unique indices are deliberately dropped —
/// only `uniqueNames` survives — since `from_json_object` always rebuilds
/// them from `data` rather than trusting persisted positions.
pub fn to_json(collection: &Collection) -> BsonDocument {
    let mut binary_indices = BsonDocument::new();
    for (field, index) in &collection.binary_indices {
        let mut entry = BsonDocument::new();
        if collection.options.serializable_indices {
            entry.insert("dirty", index.dirty);
            entry.insert(
                "values",
                index.values.iter().map(|&v| v as i64).collect::<Vec<i64>>(),
            );
        } else {
            // No permutation carried across; force a rebuild on load rather
            // than trusting a `dirty` flag with nothing behind it.
            entry.insert("dirty", true);
        }
        binary_indices.insert(field.clone(), entry);
    }

    let nested_properties: Vec<BsonDocument> = collection
        .options
        .nested_properties
        .iter()
        .map(nested_property_to_bson)
        .collect();

    let changes: Vec<BsonDocument> = collection.changes.get_changes().iter().map(change_to_bson).collect();

    let mut out = BsonDocument::new();
    out.insert("name", collection.options.name.clone());
    out.insert("data", collection.data.clone());
    out.insert("idIndex", collection.id_index.as_slice().to_vec());
    out.insert("maxId", collection.max_id);
    out.insert("dirty", collection.binary_indices.values().any(|i| i.dirty));
    out.insert("binaryIndices", binary_indices);
    out.insert(
        "uniqueNames",
        collection.unique_indices.keys().cloned().collect::<Vec<String>>(),
    );
    out.insert("dynamicViews", collection.views.to_json());
    // Transform chains belong to the query layer this crate doesn't own;
    // the slot is carried for format compatibility and always empty here.
    out.insert("transforms", Vec::<Bson>::new());
    out.insert("nestedProperties", nested_properties);
    out.insert("adaptiveBinaryIndices", collection.options.adaptive_binary_indices);
    out.insert("asyncListeners", collection.options.async_listeners);
    out.insert("disableMeta", collection.options.disable_meta);
    out.insert("disableChangesApi", collection.options.disable_changes_api);
    out.insert("disableDeltaChangesApi", collection.options.disable_delta_changes_api);
    out.insert("clone", collection.options.clone);
    out.insert("transactional", collection.options.transactional);
    out.insert("changes", changes);
    out.insert(
        "ttlAge",
        collection.options.ttl_age_millis.map(Bson::Int64).unwrap_or(Bson::Null),
    );
    out.insert(
        "ttlInterval",
        collection
            .options
            .ttl_interval_millis
            .map(|v| Bson::Int64(v as i64))
            .unwrap_or(Bson::Null),
    );
    out
}

fn nested_property_to_bson(def: &NestedPropertyDef) -> BsonDocument {
    let mut doc = BsonDocument::new();
    doc.insert("name", def.name.clone());
    doc.insert("path", def.path.clone());
    doc
}

fn change_to_bson(change: &Change) -> BsonDocument {
    let op = match change.op {
        ChangeOp::Insert => "I",
        ChangeOp::Update => "U",
        ChangeOp::Remove => "R",
    };
    let mut doc = BsonDocument::new();
    doc.insert("name", change.name.clone());
    doc.insert("op", op);
    doc.insert("obj", change.obj.clone());
    doc
}

/// Rebuild a `Collection` from a snapshot produced by [`to_json`].
///
/// `options` supplies the constructor-only settings the snapshot doesn't
/// own the authority for (collaborator factories, `async_listeners`'s
/// runtime behaviour); the persisted `data`/`idIndex`/`maxId`/binary-index
/// state wins for everything else. Unique indices are always rebuilt from
/// `data`, never from a persisted position map (§4.4).
pub fn from_json_object(snapshot: &BsonDocument, options: CollectionOptions) -> Result<Collection, CollectionError> {
    options.validate()?;

    let raw_data = snapshot
        .get_array("data")
        .map_err(|_| CollectionError::TypeError("snapshot missing 'data' array".into()))?;
    let mut data = Vec::with_capacity(raw_data.len());
    for value in raw_data {
        let doc = value
            .as_document()
            .ok_or_else(|| CollectionError::TypeError("snapshot data entries must be objects".into()))?;
        data.push(doc.clone());
    }

    let mut id_index = IdIndex::new();
    for doc in &data {
        let id = get_id(doc)
            .ok_or_else(|| CollectionError::TypeError("snapshot document missing $id".into()))?;
        id_index.push(id);
    }

    let max_id = snapshot
        .get_i64("maxId")
        .unwrap_or_else(|_| id_index.max_id().unwrap_or(0));

    let mut binary_indices: HashMap<String, BinaryIndex> = HashMap::new();
    if let Ok(stored) = snapshot.get_document("binaryIndices") {
        for (field, entry) in stored.iter() {
            let entry_doc = entry
                .as_document()
                .ok_or_else(|| CollectionError::TypeError("binaryIndices entry must be an object".into()))?;
            let dirty = entry_doc.get_bool("dirty").unwrap_or(true);
            let values: Vec<usize> = entry_doc
                .get_array("values")
                .map(|values| values.iter().filter_map(Bson::as_i64).map(|v| v as usize).collect())
                .unwrap_or_default();
            binary_indices.insert(field.clone(), BinaryIndex { field: field.clone(), dirty, values });
        }
    }
    for field in &options.indices {
        binary_indices.entry(field.clone()).or_insert_with(|| BinaryIndex::new(field.clone()));
    }

    let mut unique_indices: HashMap<String, UniqueIndex> = HashMap::new();
    for field in &options.unique {
        let mut index = UniqueIndex::new();
        for (position, doc) in data.iter().enumerate() {
            let value = doc.get(field).cloned().unwrap_or(Bson::Null);
            index.set(&value, position)?;
        }
        unique_indices.insert(field.clone(), index);
    }

    Ok(Collection {
        events: EventBus::new(options.async_listeners),
        changes: ChangeTracker::new(options.changes_enabled(), options.delta_changes_enabled()),
        transactions: TransactionManager::new(options.transactional),
        fts: None,
        views: ViewRegistry::new(),
        staging: Staging::new(),
        binary_indices,
        unique_indices,
        data,
        id_index,
        max_id,
        ttl: None,
        options,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::DateTime;

    fn opts(unique: &[&str], indices: &[&str]) -> CollectionOptions {
        let mut o = CollectionOptions::new("c");
        o.unique = unique.iter().map(|s| s.to_string()).collect();
        o.indices = indices.iter().map(|s| s.to_string()).collect();
        o
    }

    #[test]
    fn round_trip_preserves_data_and_max_id() {
        let mut c = Collection::new(opts(&["k"], &["age"])).unwrap();
        c.insert(Bson::Document(bson::doc! {"k": 1, "age": 10}), DateTime::from_millis(0))
            .unwrap();
        c.insert(Bson::Document(bson::doc! {"k": 2, "age": 20}), DateTime::from_millis(0))
            .unwrap();

        let snapshot = to_json(&c);
        let restored = from_json_object(&snapshot, opts(&["k"], &["age"])).unwrap();

        assert_eq!(restored.len(), c.len());
        assert_eq!(restored.max_id(), c.max_id());
        assert_eq!(restored.get(1).unwrap(), c.get(1).unwrap());
        assert_eq!(restored.unique_indices["k"].get(&Bson::Int32(1)), Some(0));
    }

    #[test]
    fn round_trip_rebuilds_unique_index_membership() {
        let mut c = Collection::new(opts(&["email"], &[])).unwrap();
        c.insert(Bson::Document(bson::doc! {"email": "a"}), DateTime::from_millis(0))
            .unwrap();
        let snapshot = to_json(&c);
        let restored = from_json_object(&snapshot, opts(&["email"], &[])).unwrap();
        assert_eq!(restored.unique_indices["email"].get(&Bson::String("a".into())), Some(0));
    }

    #[test]
    fn non_serializable_indices_omit_values_but_still_rebuild_on_load() {
        let mut options = opts(&[], &["age"]);
        options.serializable_indices = false;
        let mut c = Collection::new(options.clone()).unwrap();
        c.insert(Bson::Document(bson::doc! {"age": 30}), DateTime::from_millis(0)).unwrap();
        c.insert(Bson::Document(bson::doc! {"age": 10}), DateTime::from_millis(0)).unwrap();

        let snapshot = to_json(&c);
        let stored_entry = snapshot.get_document("binaryIndices").unwrap().get_document("age").unwrap();
        assert!(!stored_entry.contains_key("values"));
        assert!(stored_entry.get_bool("dirty").unwrap());

        let mut restored = from_json_object(&snapshot, options).unwrap();
        restored.ensure_index_built("age");
        assert!(restored.check_index("age", Default::default()).unwrap());
    }
}

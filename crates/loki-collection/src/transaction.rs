use std::collections::HashMap;

use crate::binary_index::BinaryIndex;
use crate::document::Document;
use crate::id_index::IdIndex;
use crate::unique_index::UniqueIndex;

/// Point-in-time copy of everything a mutation can touch, taken on
/// `start_transaction` and restored on `rollback` (§4.7). Rust has no
/// reference type to shallow-snapshot through, so every field here is a
/// full clone; "shallow" in the source system only described avoiding a
/// *second* deep clone where one clone already sufficed.
struct Snapshot {
    data: Vec<Document>,
    id_index: IdIndex,
    max_id: i64,
    binary_indices: HashMap<String, BinaryIndex>,
    unique_indices: HashMap<String, UniqueIndex>,
}

/// Snapshot-on-entry, commit, and rollback across the store, the id index,
/// `MaxId`, and every binary/unique index. A no-op when `transactional` is
/// false — every mutation still calls `start`/`commit`/`rollback`
/// unconditionally, they simply do nothing.
#[derive(Default)]
pub struct TransactionManager {
    enabled: bool,
    snapshot: Option<Snapshot>,
}

impl TransactionManager {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            snapshot: None,
        }
    }

    pub fn start(
        &mut self,
        data: &[Document],
        id_index: &IdIndex,
        max_id: i64,
        binary_indices: &HashMap<String, BinaryIndex>,
        unique_indices: &HashMap<String, UniqueIndex>,
    ) {
        if !self.enabled {
            return;
        }
        self.snapshot = Some(Snapshot {
            data: data.to_vec(),
            id_index: id_index.clone(),
            max_id,
            binary_indices: binary_indices.clone(),
            unique_indices: unique_indices.clone(),
        });
    }

    pub fn commit(&mut self) {
        self.snapshot = None;
    }

    /// Restore the pre-`start` state into the caller's live structures.
    /// No-op if no snapshot is pending (transactions disabled, or already
    /// committed/rolled back).
    pub fn rollback(
        &mut self,
        data: &mut Vec<Document>,
        id_index: &mut IdIndex,
        max_id: &mut i64,
        binary_indices: &mut HashMap<String, BinaryIndex>,
        unique_indices: &mut HashMap<String, UniqueIndex>,
    ) {
        if let Some(snapshot) = self.snapshot.take() {
            *data = snapshot.data;
            *id_index = snapshot.id_index;
            *max_id = snapshot.max_id;
            *binary_indices = snapshot.binary_indices;
            *unique_indices = snapshot.unique_indices;
        }
    }
}

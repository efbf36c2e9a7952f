use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bson::{Bson, DateTime};

use crate::aggregations;
use crate::binary_index::{BinaryIndex, CheckIndexOptions, RangeValue};
use crate::change_tracker::{Change, ChangeTracker};
use crate::config::CollectionOptions;
use crate::document::{Document, get_id};
use crate::error::CollectionError;
use crate::events::{Channel, EventBus};
use crate::fts::{FullTextSearch, FullTextSearchFactory};
use crate::id_index::IdIndex;
use crate::staging::{StageCommit, Staging};
use crate::transaction::TransactionManager;
use crate::ttl::TtlHandle;
use crate::unique_index::UniqueIndex;
use crate::views::ViewRegistry;
use loki_query::RangeOp;

/// Shared handle produced by [`Collection::open`]/[`Collection::open_with_fts`]
/// for collections whose constructor options ask for an automatic TTL
/// daemon — the daemon's sweep closure needs somewhere `'static` and
/// lockable to call back into, which a bare `Collection` on the stack
/// can't offer itself.
pub type SharedCollection = Arc<Mutex<Collection>>;

/// The storage kernel's single mutable unit: a dense document array, its
/// parallel id index, every configured secondary index, and the
/// collaborators (views, FTS, change tracking, transactions, events,
/// staging) that ride along with every mutation (§3/§4).
pub struct Collection {
    pub(crate) options: CollectionOptions,
    pub(crate) data: Vec<Document>,
    pub(crate) id_index: IdIndex,
    pub(crate) max_id: i64,
    pub(crate) binary_indices: HashMap<String, BinaryIndex>,
    pub(crate) unique_indices: HashMap<String, UniqueIndex>,
    pub(crate) events: EventBus,
    pub(crate) changes: ChangeTracker,
    pub(crate) views: ViewRegistry,
    pub(crate) fts: Option<Box<dyn FullTextSearch>>,
    pub(crate) transactions: TransactionManager,
    pub(crate) staging: Staging,
    /// Background sweep thread for this collection's TTL (§4.9). `None`
    /// when no `ttl_age_millis`/`ttl_interval_millis` are configured, or
    /// when the collection was built via `new`/`with_fts` rather than
    /// `open`/`open_with_fts` (bare collections have nowhere `'static` for
    /// the daemon to close over, so they carry no handle and expect the
    /// caller to drive `sweep_expired` directly, as a manual "host timer
    /// facility" — §4.9's scheduling model leaves that dispatch unspecified
    /// beyond "the host timer facility").
    pub(crate) ttl: Option<TtlHandle>,
}

impl Collection {
    pub fn new(options: CollectionOptions) -> Result<Self, CollectionError> {
        Self::with_fts(options, None)
    }

    pub fn with_fts(
        options: CollectionOptions,
        fts_factory: Option<FullTextSearchFactory>,
    ) -> Result<Self, CollectionError> {
        options.validate()?;

        let mut binary_indices = HashMap::new();
        for field in &options.indices {
            binary_indices.insert(field.clone(), BinaryIndex::new(field.clone()));
        }
        let mut unique_indices = HashMap::new();
        for field in &options.unique {
            unique_indices.insert(field.clone(), UniqueIndex::new());
        }

        Ok(Self {
            events: EventBus::new(options.async_listeners),
            changes: ChangeTracker::new(options.changes_enabled(), options.delta_changes_enabled()),
            transactions: TransactionManager::new(options.transactional),
            fts: fts_factory.map(|f| f()),
            views: ViewRegistry::new(),
            staging: Staging::new(),
            binary_indices,
            unique_indices,
            data: Vec::new(),
            id_index: IdIndex::new(),
            max_id: 0,
            ttl: None,
            options,
        })
    }

    /// Build a collection behind a shared, lockable handle and — when
    /// `ttl_age_millis > 0` and `ttl_interval_millis` are both configured —
    /// spawn the periodic sweep described in §4.9 against it. `age < 0`
    /// (or no TTL options at all) leaves `ttl` `None`, matching "disabled
    /// by passing age < 0 (cancels the handle)".
    pub fn open(options: CollectionOptions) -> Result<SharedCollection, CollectionError> {
        Self::open_with_fts(options, None)
    }

    pub fn open_with_fts(
        options: CollectionOptions,
        fts_factory: Option<FullTextSearchFactory>,
    ) -> Result<SharedCollection, CollectionError> {
        let age = options.ttl_age_millis;
        let interval = options.ttl_interval_millis;
        let collection = Self::with_fts(options, fts_factory)?;
        let shared: SharedCollection = Arc::new(Mutex::new(collection));

        if let (Some(age), Some(interval)) = (age, interval)
            && age > 0
        {
            let weak = Arc::downgrade(&shared);
            let handle = TtlHandle::spawn(interval, move || {
                let Some(shared) = weak.upgrade() else { return };
                let mut collection = shared.lock().unwrap();
                let now = DateTime::now();
                let _ = collection.sweep_expired(now, age);
            });
            shared.lock().unwrap().ttl = handle;
        }

        Ok(shared)
    }

    pub fn name(&self) -> &str {
        &self.options.name
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn max_id(&self) -> i64 {
        self.max_id
    }

    // ── Identifier lookup (§4.2) ────────────────────────────────

    /// Binary-search `id` via the id index. `TypeError` is not raised here
    /// since `id` is already a typed `i64` at the API boundary; the source
    /// system's "non-integer id" rejection happens at the document-shape
    /// validation step instead (`document::validate_insertable`).
    pub fn get(&self, id: i64) -> Option<&Document> {
        let position = self.id_index.position_of(id)?;
        self.data.get(position)
    }

    pub fn get_with_position(&self, id: i64) -> Option<(&Document, usize)> {
        let position = self.id_index.position_of(id)?;
        self.data.get(position).map(|doc| (doc, position))
    }

    // ── Views / FTS registration ─────────────────────────────────

    pub fn views_mut(&mut self) -> &mut ViewRegistry {
        &mut self.views
    }

    // ── Binary index queries ─────────────────────────────────────

    pub fn ensure_index_built(&mut self, field: &str) {
        if let Some(index) = self.binary_indices.get_mut(field) {
            index.ensure_built(&self.data);
        }
    }

    pub fn calculate_range(
        &mut self,
        field: &str,
        op: RangeOp,
        target: &RangeValue<'_>,
    ) -> Result<Option<(usize, usize)>, CollectionError> {
        let index = self
            .binary_indices
            .get_mut(field)
            .ok_or_else(|| CollectionError::NotFound(format!("no binary index on field: {field}")))?;
        index.ensure_built(&self.data);
        Ok(index.calculate_range(&self.data, op, target))
    }

    pub fn check_index(&mut self, field: &str, opts: CheckIndexOptions) -> Result<bool, CollectionError> {
        let index = self
            .binary_indices
            .get_mut(field)
            .ok_or_else(|| CollectionError::NotFound(format!("no binary index on field: {field}")))?;
        Ok(index.check_index(&self.data, opts))
    }

    pub fn check_all_indices(&mut self, opts: CheckIndexOptions) -> bool {
        let fields: Vec<String> = self.binary_indices.keys().cloned().collect();
        fields
            .into_iter()
            .all(|field| self.binary_indices.get_mut(&field).unwrap().check_index(&self.data, opts))
    }

    // ── Events ────────────────────────────────────────────────────

    pub fn on(&mut self, channel: Channel, listener: Box<dyn FnMut(&crate::events::Event) + Send>) {
        self.events.on(channel, listener);
    }

    // ── Changes API (§4.8) ────────────────────────────────────────

    pub fn get_changes(&self) -> &[Change] {
        self.changes.get_changes()
    }

    pub fn flush_changes(&mut self) {
        self.changes.flush_changes();
    }

    // ── Aggregations (§4.10) ───────────────────────────────────────

    pub fn extract(&self, field: &[String]) -> Vec<Bson> {
        aggregations::extract(&self.data, field)
    }

    pub fn extract_numerical(&self, field: &[String]) -> Vec<f64> {
        aggregations::extract_numerical(&self.data, field)
    }

    pub fn min_record(&self, field: &[String]) -> Option<&Document> {
        aggregations::min_record(&self.data, field)
    }

    pub fn max_record(&self, field: &[String]) -> Option<&Document> {
        aggregations::max_record(&self.data, field)
    }

    // ── Staging (§4.11) ─────────────────────────────────────────────

    pub fn get_stage(&mut self, name: &str) -> Vec<&Document> {
        self.staging.get_stage(name)
    }

    pub fn stage(&mut self, name: &str, doc: &Document) -> Option<()> {
        self.staging.stage(name, doc)
    }

    /// `update` each staged copy, append a commit-log entry, and empty the
    /// stage (§4.11).
    pub fn commit_stage(
        &mut self,
        name: &str,
        message: impl Into<String>,
        now: DateTime,
    ) -> Result<(), CollectionError> {
        let staged = self.staging.drain_stage(name);
        let mut committed = Vec::with_capacity(staged.len());
        for doc in &staged {
            self.update(doc.clone(), now)?;
            committed.push(doc.clone());
        }
        self.staging.record_commit(now, message, committed);
        Ok(())
    }

    pub fn commit_log(&self) -> &[StageCommit] {
        self.staging.commit_log()
    }

    // ── TTL sweep (§4.9) ─────────────────────────────────────────────

    /// Remove every document whose `meta.updated` (or `meta.created` if
    /// never updated) is older than `now - age_millis`. Runs as one
    /// ordinary mutation, matching the daemon's own description of itself
    /// as "a normal mutation" rather than a special code path.
    pub fn sweep_expired(&mut self, now: DateTime, age_millis: i64) -> Result<usize, CollectionError> {
        use crate::document::get_meta;

        let cutoff = now.timestamp_millis() - age_millis;
        let expired_ids: Vec<i64> = self
            .data
            .iter()
            .filter_map(|doc| {
                let meta = get_meta(doc)?;
                let id = get_id(doc)?;
                let stamp = meta.updated.timestamp_millis();
                (stamp < cutoff).then_some(id)
            })
            .collect();

        let count = expired_ids.len();
        if count > 0 {
            self.remove_ids(&expired_ids)?;
        }
        Ok(count)
    }
}

use bson::{Bson, DateTime};

use crate::binary_index::BinaryIndex;
use crate::collection::Collection;
use crate::document::{Document, clone_document, get_id, get_meta, set_id, set_meta, strip_reserved, validate_insertable};
use crate::error::CollectionError;
use crate::events::Channel;

/// Insert/update/remove orchestration (§4.1). Split out of `collection.rs`
/// as a second `impl Collection` block, the way the source system keeps a
/// dedicated mutation coordinator beside (not inside) the structures it
/// mutates.
impl Collection {
    // ── Insert ────────────────────────────────────────────────────

    pub fn insert(&mut self, value: Bson, now: DateTime) -> Result<Document, CollectionError> {
        let mut results = self.insert_many(vec![value], now)?;
        Ok(results.remove(0))
    }

    pub fn insert_many(&mut self, values: Vec<Bson>, now: DateTime) -> Result<Vec<Document>, CollectionError> {
        self.begin_transaction();
        self.events.emit(Channel::PreInsert, Bson::Array(values.clone()));

        match self.try_insert_many(values, now) {
            Ok(inserted) => {
                self.transactions.commit();
                self.views.commit();
                let payload = Bson::Array(inserted.iter().cloned().map(Bson::Document).collect());
                self.events.emit(Channel::Insert, payload);
                Ok(inserted)
            }
            Err(err) => {
                self.abort_transaction(&err);
                Err(err)
            }
        }
    }

    fn try_insert_many(&mut self, values: Vec<Bson>, now: DateTime) -> Result<Vec<Document>, CollectionError> {
        let mut inserted = Vec::with_capacity(values.len());
        for value in values {
            inserted.push(self.insert_one(value, now)?);
        }
        Ok(inserted)
    }

    fn insert_one(&mut self, value: Bson, now: DateTime) -> Result<Document, CollectionError> {
        let doc = validate_insertable(&value)?;
        if get_id(doc).is_some() {
            return Err(CollectionError::StateError(
                "document already carries an $id".into(),
            ));
        }

        let mut doc = if self.options.clone {
            clone_document(doc, self.options.clone_method)?
        } else {
            doc.clone()
        };

        self.max_id += 1;
        let id = self.max_id;
        set_id(&mut doc, id);
        if !self.options.disable_meta {
            set_meta(&mut doc, &crate::document::Meta::new(now));
        }

        let position = self.data.len();

        // Pre-check every unique field before committing any of them, so a
        // collision on the second field can't half-apply the first.
        for (field, index) in &self.unique_indices {
            let value = doc.get(field).cloned().unwrap_or(Bson::Null);
            if index.get(&value).is_some() {
                return Err(CollectionError::ConstraintError(format!(
                    "duplicate value for unique index '{field}'"
                )));
            }
        }
        for (field, index) in self.unique_indices.iter_mut() {
            let value = doc.get(field).cloned().unwrap_or(Bson::Null);
            index.set(&value, position)?;
        }

        self.data.push(doc.clone());
        self.id_index.push(id);

        for index in self.binary_indices.values_mut() {
            maintain_on_insert(index, self.options.adaptive_binary_indices, &self.data, position);
        }

        self.views.evaluate_document(position, true);
        if let Some(fts) = self.fts.as_mut() {
            fts.add_document(&doc, position);
        }
        self.changes.record_insert(&self.options.name, &doc);

        if self.options.clone {
            clone_document(&doc, self.options.clone_method)
        } else {
            Ok(doc)
        }
    }

    // ── Update ────────────────────────────────────────────────────

    pub fn update(&mut self, doc: Document, now: DateTime) -> Result<Document, CollectionError> {
        let mut results = self.update_many(vec![doc], now)?;
        Ok(results.remove(0))
    }

    pub fn update_many(&mut self, docs: Vec<Document>, now: DateTime) -> Result<Vec<Document>, CollectionError> {
        self.begin_transaction();
        let pre_payload = Bson::Array(docs.iter().cloned().map(Bson::Document).collect());
        self.events.emit(Channel::PreUpdate, pre_payload);

        match self.try_update_many(docs, now) {
            Ok(pairs) => {
                self.transactions.commit();
                self.views.commit();
                let news: Vec<Document> = pairs.iter().map(|(_, new)| new.clone()).collect();
                let payload = Bson::Array(
                    pairs
                        .iter()
                        .map(|(old, new)| {
                            Bson::Document(bson::doc! { "old": old.clone(), "new": new.clone() })
                        })
                        .collect(),
                );
                self.events.emit(Channel::Update, payload);
                Ok(news)
            }
            Err(err) => {
                self.abort_transaction(&err);
                Err(err)
            }
        }
    }

    /// If this is a multi-document, clone-free update with binary indices
    /// configured and adaptive maintenance already on, adaptive maintenance
    /// is suspended for the duration and every index is rebuilt once at the
    /// end (§4.1) — avoids an O(n) linear scan per document in
    /// `adaptive_update` repeated across the batch. A collection already
    /// running in lazy mode is left alone: its indices are already dirty and
    /// expect a caller-driven rebuild, not an eager one forced by this batch.
    fn try_update_many(&mut self, docs: Vec<Document>, now: DateTime) -> Result<Vec<(Document, Document)>, CollectionError> {
        let previously_adaptive = self.options.adaptive_binary_indices;
        let use_lazy_batch =
            docs.len() > 1 && !self.options.clone && !self.binary_indices.is_empty() && previously_adaptive;
        if use_lazy_batch {
            self.options.adaptive_binary_indices = false;
        }

        let mut pairs = Vec::with_capacity(docs.len());
        let outcome = (|| {
            for doc in docs {
                pairs.push(self.update_one(doc, now)?);
            }
            Ok(())
        })();

        if use_lazy_batch {
            self.options.adaptive_binary_indices = previously_adaptive;
            for index in self.binary_indices.values_mut() {
                index.rebuild(&self.data);
            }
        }

        outcome?;
        Ok(pairs)
    }

    fn update_one(&mut self, mut doc: Document, now: DateTime) -> Result<(Document, Document), CollectionError> {
        let id = get_id(&doc).ok_or_else(|| {
            CollectionError::StateError("update requires a document carrying $id".into())
        })?;
        let position = self.id_index.position_of(id).ok_or_else(|| {
            CollectionError::StateError(format!("no document with id {id} to update"))
        })?;

        let old = self.data[position].clone();

        if self.options.clone {
            doc = clone_document(&doc, self.options.clone_method)?;
            set_id(&mut doc, id);
        }

        for (field, index) in &self.unique_indices {
            let new_value = doc.get(field).cloned().unwrap_or(Bson::Null);
            if let Some(existing) = index.get(&new_value)
                && existing != position
            {
                return Err(CollectionError::ConstraintError(format!(
                    "duplicate value for unique index '{field}'"
                )));
            }
        }
        for (field, index) in self.unique_indices.iter_mut() {
            let old_value = old.get(field).cloned().unwrap_or(Bson::Null);
            let new_value = doc.get(field).cloned().unwrap_or(Bson::Null);
            index.update(&old_value, &new_value, position)?;
        }

        if !self.options.disable_meta {
            let mut meta = get_meta(&old).unwrap_or_else(|| crate::document::Meta::new(now));
            meta.bump(now);
            set_meta(&mut doc, &meta);
        }

        self.data[position] = doc.clone();

        for index in self.binary_indices.values_mut() {
            if self.options.adaptive_binary_indices {
                index.adaptive_update(&self.data, position);
            } else {
                index.mark_dirty();
            }
        }

        self.views.evaluate_document(position, false);
        if let Some(fts) = self.fts.as_mut() {
            fts.update_document(&doc, position);
        }
        self.changes
            .record_update(&self.options.name, &self.options.unique, &old, &doc);

        let returned = if self.options.clone {
            clone_document(&doc, self.options.clone_method)?
        } else {
            doc.clone()
        };
        Ok((old, returned))
    }

    // ── Remove ────────────────────────────────────────────────────

    pub fn remove_by_id(&mut self, id: i64) -> Result<Document, CollectionError> {
        let mut removed = self.remove_ids(&[id])?;
        Ok(removed.remove(0))
    }

    pub fn remove_doc(&mut self, doc: &Document) -> Result<Document, CollectionError> {
        let id = get_id(doc).ok_or_else(|| {
            CollectionError::StateError("remove requires a document carrying $id".into())
        })?;
        self.remove_by_id(id)
    }

    pub fn remove_ids(&mut self, ids: &[i64]) -> Result<Vec<Document>, CollectionError> {
        self.begin_transaction();
        match self.try_remove_ids(ids) {
            Ok(removed) => {
                self.transactions.commit();
                self.views.commit();
                Ok(removed)
            }
            Err(err) => {
                self.abort_transaction(&err);
                Err(err)
            }
        }
    }

    fn try_remove_ids(&mut self, ids: &[i64]) -> Result<Vec<Document>, CollectionError> {
        // Resolve every position up front so a missing id fails the whole
        // call before anything is mutated, and process from the highest
        // position down so each removal's position-shift never invalidates
        // a position already queued for removal later in the batch.
        let mut positions = Vec::with_capacity(ids.len());
        for &id in ids {
            let position = self.id_index.position_of(id).ok_or_else(|| {
                CollectionError::StateError(format!("no document with id {id} to remove"))
            })?;
            positions.push(position);
        }
        positions.sort_unstable_by(|a, b| b.cmp(a));

        let mut removed = Vec::with_capacity(positions.len());
        for position in positions {
            let stripped = self.remove_at(position);
            self.events.emit(Channel::Delete, Bson::Document(stripped.clone()));
            removed.push(stripped);
        }
        // Restore caller order (removed was built highest-position-first).
        removed.reverse();
        Ok(removed)
    }

    /// §4.1's remove contract for a single already-resolved position.
    fn remove_at(&mut self, position: usize) -> Document {
        let doc = self.data[position].clone();

        for (field, index) in self.unique_indices.iter_mut() {
            let value = doc.get(field).cloned().unwrap_or(Bson::Null);
            index.remove(&value);
        }

        self.views.remove_document(position);

        for index in self.binary_indices.values_mut() {
            if self.options.adaptive_binary_indices {
                index.adaptive_remove(&self.data, position);
            } else {
                index.mark_dirty();
            }
        }

        self.data.remove(position);
        self.id_index.remove(position);
        for index in self.unique_indices.values_mut() {
            index.decrement_positions_after(position);
        }

        if let Some(fts) = self.fts.as_mut() {
            fts.remove_document(&doc, position);
        }
        self.changes.record_remove(&self.options.name, &doc);

        strip_reserved(doc)
    }

    // ── Clear ─────────────────────────────────────────────────────

    pub fn clear(&mut self, remove_indices: bool) {
        self.data.clear();
        self.id_index = crate::id_index::IdIndex::new();
        self.max_id = 0;
        self.changes.flush_changes();

        for index in self.unique_indices.values_mut() {
            index.clear();
        }
        if remove_indices {
            for index in self.binary_indices.values_mut() {
                *index = BinaryIndex::new(index.field.clone());
            }
        } else {
            for index in self.binary_indices.values_mut() {
                index.mark_dirty();
            }
        }
    }

    // ── Predicate-driven batch mutation ──────────────────────────

    pub fn find_and_update(
        &mut self,
        predicate: impl Fn(&Document) -> bool,
        apply: impl Fn(&mut Document),
        now: DateTime,
    ) -> Result<Vec<Document>, CollectionError> {
        let targets: Vec<Document> = self.data.iter().filter(|d| predicate(d)).cloned().collect();
        let mut updated = Vec::with_capacity(targets.len());
        for mut doc in targets {
            apply(&mut doc);
            updated.push(doc);
        }
        if updated.is_empty() {
            return Ok(Vec::new());
        }
        self.update_many(updated, now)
    }

    pub fn find_and_remove(&mut self, predicate: impl Fn(&Document) -> bool) -> Result<Vec<Document>, CollectionError> {
        let ids: Vec<i64> = self.data.iter().filter(|d| predicate(d)).filter_map(get_id).collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.remove_ids(&ids)
    }

    /// `updateWhere` is `findAndUpdate` under a different name in the
    /// source system; kept as a distinct method since callers reach for
    /// either spelling.
    pub fn update_where(
        &mut self,
        predicate: impl Fn(&Document) -> bool,
        apply: impl Fn(&mut Document),
        now: DateTime,
    ) -> Result<Vec<Document>, CollectionError> {
        self.find_and_update(predicate, apply, now)
    }

    pub fn remove_where(&mut self, predicate: impl Fn(&Document) -> bool) -> Result<Vec<Document>, CollectionError> {
        self.find_and_remove(predicate)
    }

    // ── Transaction plumbing ──────────────────────────────────────

    fn begin_transaction(&mut self) {
        self.transactions
            .start(&self.data, &self.id_index, self.max_id, &self.binary_indices, &self.unique_indices);
        self.views.start_transaction();
    }

    fn abort_transaction(&mut self, err: &CollectionError) {
        self.transactions.rollback(
            &mut self.data,
            &mut self.id_index,
            &mut self.max_id,
            &mut self.binary_indices,
            &mut self.unique_indices,
        );
        self.views.rollback();
        self.events.emit(Channel::Error, Bson::String(err.to_string()));
    }
}

fn maintain_on_insert(index: &mut BinaryIndex, adaptive: bool, data: &[Document], position: usize) {
    if adaptive {
        index.adaptive_insert(data, position);
    } else {
        index.mark_dirty();
    }
}

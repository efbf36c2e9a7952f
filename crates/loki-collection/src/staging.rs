use std::collections::HashMap;

use bson::DateTime;

use crate::document::{Document, get_id};

/// A single committed batch: `commitStage(name, message)` appends one of
/// these and empties the stage it committed.
#[derive(Debug, Clone, PartialEq)]
pub struct StageCommit {
    pub timestamp: DateTime,
    pub message: String,
    pub data: Vec<Document>,
}

/// Named scratch areas (§4.11), each a `$id -> staged copy` map, plus the
/// log of committed batches.
#[derive(Debug, Clone, Default)]
pub struct Staging {
    stages: HashMap<String, HashMap<i64, Document>>,
    commit_log: Vec<StageCommit>,
}

impl Staging {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns (creating if absent) the named stage's current contents.
    pub fn get_stage(&mut self, name: &str) -> Vec<&Document> {
        self.stages.entry(name.to_string()).or_default();
        self.stages[name].values().collect()
    }

    /// Deep-copy `doc` into the named stage, keyed by its `$id`. `None` if
    /// `doc` carries no id — nothing to key the staged copy by.
    pub fn stage(&mut self, name: &str, doc: &Document) -> Option<()> {
        let id = get_id(doc)?;
        self.stages
            .entry(name.to_string())
            .or_default()
            .insert(id, doc.clone());
        Some(())
    }

    /// Drain the named stage's contents without committing them anywhere.
    pub fn drain_stage(&mut self, name: &str) -> Vec<Document> {
        self.stages
            .remove(name)
            .map(|map| map.into_values().collect())
            .unwrap_or_default()
    }

    pub fn record_commit(&mut self, timestamp: DateTime, message: impl Into<String>, data: Vec<Document>) {
        self.commit_log.push(StageCommit {
            timestamp,
            message: message.into(),
            data,
        });
    }

    pub fn commit_log(&self) -> &[StageCommit] {
        &self.commit_log
    }
}

use bson::{Bson, Document};

use crate::document::is_reserved_field;

/// One entry in the change log (§4.8).
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub name: String,
    pub op: ChangeOp,
    pub obj: Document,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOp {
    Insert,
    Update,
    Remove,
}

/// In-memory change log plus the delta-diff algorithm. `changes` toggle
/// controls whether anything is recorded at all; `delta` additionally
/// swaps full-snapshot updates for minimal property deltas.
#[derive(Debug, Clone, Default)]
pub struct ChangeTracker {
    changes_enabled: bool,
    delta_enabled: bool,
    log: Vec<Change>,
}

impl ChangeTracker {
    pub fn new(changes_enabled: bool, delta_enabled: bool) -> Self {
        Self {
            changes_enabled,
            delta_enabled,
            log: Vec::new(),
        }
    }

    pub fn record_insert(&mut self, name: &str, doc: &Document) {
        if !self.changes_enabled {
            return;
        }
        self.log.push(Change {
            name: name.to_string(),
            op: ChangeOp::Insert,
            obj: doc.clone(),
        });
    }

    pub fn record_update(&mut self, name: &str, unique_fields: &[String], old: &Document, new: &Document) {
        if !self.changes_enabled {
            return;
        }
        let obj = if self.delta_enabled {
            delta(old, new, unique_fields)
        } else {
            new.clone()
        };
        self.log.push(Change {
            name: name.to_string(),
            op: ChangeOp::Update,
            obj,
        });
    }

    pub fn record_remove(&mut self, name: &str, doc: &Document) {
        if !self.changes_enabled {
            return;
        }
        self.log.push(Change {
            name: name.to_string(),
            op: ChangeOp::Remove,
            obj: doc.clone(),
        });
    }

    pub fn get_changes(&self) -> &[Change] {
        &self.log
    }

    pub fn flush_changes(&mut self) {
        self.log.clear();
    }
}

/// Minimal property-level diff between `old` and `new`. Reserved fields and
/// fields carrying a unique index are always included at full value (never
/// diffed into) — a unique field changing is itself the signal a reader of
/// the change log needs, not a nested delta.
fn delta(old: &Document, new: &Document, unique_fields: &[String]) -> Document {
    let mut out = Document::new();
    for (key, new_value) in new.iter() {
        if is_reserved_field(key) {
            out.insert(key.clone(), new_value.clone());
            continue;
        }
        if unique_fields.iter().any(|f| f == key) {
            out.insert(key.clone(), new_value.clone());
            continue;
        }
        match old.get(key) {
            None => {
                out.insert(key.clone(), new_value.clone());
            }
            Some(old_value) => {
                if let (Bson::Document(old_doc), Bson::Document(new_doc)) = (old_value, new_value) {
                    let nested = delta(old_doc, new_doc, &[]);
                    if !nested.is_empty() {
                        out.insert(key.clone(), Bson::Document(nested));
                    }
                } else if old_value != new_value {
                    out.insert(key.clone(), new_value.clone());
                }
            }
        }
    }
    out
}

/// Apply a recorded delta onto a prior snapshot, reproducing the document
/// the delta was computed against (§8 law: "applying recorded deltas in
/// order ... reproduces the final document").
pub fn apply_delta(base: &Document, delta: &Document) -> Document {
    let mut out = base.clone();
    for (key, value) in delta.iter() {
        match (out.get(key), value) {
            (Some(Bson::Document(existing)), Bson::Document(nested)) => {
                out.insert(key.clone(), Bson::Document(apply_delta(existing, nested)));
            }
            _ => {
                out.insert(key.clone(), value.clone());
            }
        }
    }
    out
}

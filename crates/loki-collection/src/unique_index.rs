use std::collections::HashMap;

use bson::Bson;

use crate::error::CollectionError;

/// A hashable, totally-ordered-compatible projection of the subset of BSON
/// values a unique index can key on. Unique indices are scalar by nature —
/// documents and arrays are rejected at `set`/`update` time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Key {
    Null,
    Int(i64),
    /// Bit pattern of the `f64` — exact equality is what a unique index
    /// wants, not float-tolerant comparison.
    Float(u64),
    Str(String),
    Bool(bool),
    DateMillis(i64),
}

fn key_of(value: &Bson) -> Result<Key, CollectionError> {
    match value {
        Bson::Null | Bson::Undefined => Ok(Key::Null),
        Bson::Int32(i) => Ok(Key::Int(*i as i64)),
        Bson::Int64(i) => Ok(Key::Int(*i)),
        Bson::Double(d) => Ok(Key::Float(d.to_bits())),
        Bson::String(s) => Ok(Key::Str(s.clone())),
        Bson::Boolean(b) => Ok(Key::Bool(*b)),
        Bson::DateTime(dt) => Ok(Key::DateMillis(dt.timestamp_millis())),
        other => Err(CollectionError::TypeError(format!(
            "unsupported unique index value type: {other:?}"
        ))),
    }
}

/// `value -> position` hash for one unique-constrained field.
#[derive(Debug, Clone, Default)]
pub struct UniqueIndex {
    by_value: HashMap<Key, usize>,
}

impl UniqueIndex {
    pub fn new() -> Self {
        Self {
            by_value: HashMap::new(),
        }
    }

    /// Insert a fresh mapping. `ConstraintError` on collision.
    pub fn set(&mut self, value: &Bson, position: usize) -> Result<(), CollectionError> {
        let key = key_of(value)?;
        if self.by_value.contains_key(&key) {
            return Err(CollectionError::ConstraintError(format!(
                "duplicate value for unique index: {value:?}"
            )));
        }
        self.by_value.insert(key, position);
        Ok(())
    }

    /// Rewrite a mapping to its new value, rejecting collisions with a
    /// *different* position (updating a document to its own current value
    /// is a no-op, not a collision).
    pub fn update(
        &mut self,
        old_value: &Bson,
        new_value: &Bson,
        position: usize,
    ) -> Result<(), CollectionError> {
        let new_key = key_of(new_value)?;
        if let Some(&existing) = self.by_value.get(&new_key)
            && existing != position
        {
            return Err(CollectionError::ConstraintError(format!(
                "duplicate value for unique index: {new_value:?}"
            )));
        }
        let old_key = key_of(old_value)?;
        self.by_value.remove(&old_key);
        self.by_value.insert(new_key, position);
        Ok(())
    }

    /// No-op if `value` isn't present.
    pub fn remove(&mut self, value: &Bson) {
        if let Ok(key) = key_of(value) {
            self.by_value.remove(&key);
        }
    }

    pub fn get(&self, value: &Bson) -> Option<usize> {
        key_of(value).ok().and_then(|k| self.by_value.get(&k).copied())
    }

    pub fn clear(&mut self) {
        self.by_value.clear();
    }

    pub fn len(&self) -> usize {
        self.by_value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_value.is_empty()
    }

    /// Every stored position decremented past a removed one — mirrors the
    /// binary index's position-shift invariant (§4.1).
    pub fn decrement_positions_after(&mut self, removed: usize) {
        for pos in self.by_value.values_mut() {
            if *pos > removed {
                *pos -= 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_rejects_collision() {
        let mut idx = UniqueIndex::new();
        idx.set(&Bson::String("a".into()), 0).unwrap();
        let err = idx.set(&Bson::String("a".into()), 1).unwrap_err();
        assert!(matches!(err, CollectionError::ConstraintError(_)));
    }

    #[test]
    fn update_same_position_is_noop() {
        let mut idx = UniqueIndex::new();
        idx.set(&Bson::String("a".into()), 0).unwrap();
        idx.update(&Bson::String("a".into()), &Bson::String("a".into()), 0)
            .unwrap();
        assert_eq!(idx.get(&Bson::String("a".into())), Some(0));
    }

    #[test]
    fn update_rejects_collision_with_other_position() {
        let mut idx = UniqueIndex::new();
        idx.set(&Bson::String("a".into()), 0).unwrap();
        idx.set(&Bson::String("b".into()), 1).unwrap();
        let err = idx
            .update(&Bson::String("b".into()), &Bson::String("a".into()), 1)
            .unwrap_err();
        assert!(matches!(err, CollectionError::ConstraintError(_)));
    }

    #[test]
    fn remove_is_noop_when_absent() {
        let mut idx = UniqueIndex::new();
        idx.remove(&Bson::String("ghost".into()));
        assert!(idx.is_empty());
    }

    #[test]
    fn decrement_positions_after_shifts_only_greater() {
        let mut idx = UniqueIndex::new();
        idx.set(&Bson::String("a".into()), 0).unwrap();
        idx.set(&Bson::String("b".into()), 2).unwrap();
        idx.decrement_positions_after(1);
        assert_eq!(idx.get(&Bson::String("a".into())), Some(0));
        assert_eq!(idx.get(&Bson::String("b".into())), Some(1));
    }
}

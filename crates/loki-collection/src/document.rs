use bson::{Bson, DateTime};
use serde::{Deserialize, Serialize};

use crate::config::CloneMethod;
use crate::error::CollectionError;

/// An application-shaped record. Self-describing: no fixed schema beyond the
/// two reserved keys below.
pub type Document = bson::Document;

/// Reserved key holding the internal identifier (`i64`).
pub const ID_FIELD: &str = "$id";
/// Reserved key holding the metadata sub-document, when metadata isn't disabled.
pub const META_FIELD: &str = "$meta";

/// `{version, revision, created, updated}`, nested under `$meta`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    pub version: i32,
    pub revision: i64,
    pub created: DateTime,
    pub updated: DateTime,
}

impl Meta {
    pub fn new(now: DateTime) -> Self {
        Self {
            version: 0,
            revision: 0,
            created: now,
            updated: now,
        }
    }

    pub fn bump(&mut self, now: DateTime) {
        self.revision += 1;
        self.updated = now;
    }

    pub fn to_bson(&self) -> Bson {
        Bson::Document(bson::doc! {
            "version": self.version,
            "revision": self.revision,
            "created": self.created,
            "updated": self.updated,
        })
    }

    pub fn from_bson(value: &Bson) -> Option<Self> {
        let doc = value.as_document()?;
        Some(Self {
            version: doc.get_i32("version").ok()?,
            revision: doc.get_i64("revision").ok()?,
            created: doc.get_datetime("created").ok().copied()?,
            updated: doc.get_datetime("updated").ok().copied()?,
        })
    }
}

pub fn is_reserved_field(name: &str) -> bool {
    name == ID_FIELD || name == META_FIELD
}

pub fn get_id(doc: &Document) -> Option<i64> {
    match doc.get(ID_FIELD) {
        Some(Bson::Int64(i)) => Some(*i),
        Some(Bson::Int32(i)) => Some(*i as i64),
        _ => None,
    }
}

pub fn set_id(doc: &mut Document, id: i64) {
    doc.insert(ID_FIELD, Bson::Int64(id));
}

pub fn get_meta(doc: &Document) -> Option<Meta> {
    doc.get(META_FIELD).and_then(Meta::from_bson)
}

pub fn set_meta(doc: &mut Document, meta: &Meta) {
    doc.insert(META_FIELD, meta.to_bson());
}

/// A document with `$id` and (if present) `$meta` stripped — what callers
/// get back from `remove`.
pub fn strip_reserved(mut doc: Document) -> Document {
    doc.remove(ID_FIELD);
    doc.remove(META_FIELD);
    doc
}

/// Validate that an inbound value is a non-null structured record.
/// `TypeError` otherwise, matching the insert contract in §4.1.
pub fn validate_insertable(value: &Bson) -> Result<&Document, CollectionError> {
    match value {
        Bson::Document(doc) => Ok(doc),
        _ => Err(CollectionError::TypeError(
            "document must be a non-null object".into(),
        )),
    }
}

/// Apply the configured clone strategy to a document before it enters the
/// store (or before it is handed back to a caller / emitted on an event).
///
/// `bson::Document` owns all of its nested data (there is no reference type
/// to share), so `Shallow` and `ShallowAssign` — which in the source system
/// distinguish degrees of reference sharing — coincide with `Deep` here.
/// `ParseStringify` is kept distinct because it genuinely loses fidelity
/// (extended-JSON round-trip), which downstream equality checks should see.
pub fn clone_document(
    doc: &Document,
    method: CloneMethod,
) -> Result<Document, CollectionError> {
    match method {
        CloneMethod::Deep | CloneMethod::Shallow | CloneMethod::ShallowAssign => Ok(doc.clone()),
        CloneMethod::ParseStringify => {
            let value = serde_json::to_value(doc).map_err(|e| {
                CollectionError::TypeError(format!("parse-stringify clone failed: {e}"))
            })?;
            serde_json::from_value(value).map_err(|e| {
                CollectionError::TypeError(format!("parse-stringify clone failed: {e}"))
            })
        }
    }
}

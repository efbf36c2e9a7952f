//! In-memory document collection: a typed container holding a growing set
//! of self-describing records, each assigned a monotonically increasing
//! internal identifier, with indexed lookup, range queries, ACID-style
//! single-collection transactions, reactive views, change tracking, and
//! TTL expiration. The storage kernel of a larger embedded document
//! database — the query compiler and result pipeline sit above this crate
//! and are not part of it.

mod aggregations;
mod binary_index;
mod change_tracker;
mod collection;
mod config;
mod document;
mod error;
mod events;
mod fts;
mod id_index;
mod mutation;
mod nested;
mod serialize;
mod staging;
mod transaction;
mod ttl;
mod unique_index;
mod views;

pub use aggregations::{avg, extract, extract_numerical, max, max_record, median, min, min_record, mode, std_dev};
pub use binary_index::{BinaryIndex, CheckIndexOptions, RangeValue};
pub use change_tracker::{Change, ChangeOp};
pub use collection::{Collection, SharedCollection};
pub use config::{CloneMethod, CollectionOptions, NestedPropertyDef};
pub use document::{Document, Meta, ID_FIELD, META_FIELD};
pub use error::CollectionError;
pub use events::{Channel, Event, EventBus};
pub use fts::{FullTextSearch, FullTextSearchFactory};
pub use id_index::IdIndex;
pub use nested::resolve_path;
pub use serialize::{from_json_object, to_json};
pub use staging::StageCommit;
pub use ttl::TtlHandle;
pub use unique_index::UniqueIndex;
pub use views::{DynamicView, ViewRegistry};

pub use loki_query::RangeOp;

use std::fmt;

/// The core's error taxonomy.
///
/// Matches the teacher's hand-rolled style (`slate_db::DbError`,
/// `slate_engine::EngineError`): a plain enum, a manual `Display`, and
/// `impl std::error::Error` — no `thiserror`.
#[derive(Debug, Clone, PartialEq)]
pub enum CollectionError {
    /// Bad argument type or shape (e.g. inserting a non-document value).
    TypeError(String),
    /// Document already carries `$id` on insert, or is missing it on update.
    StateError(String),
    /// Unique index collision.
    ConstraintError(String),
    /// Mutually exclusive constructor options.
    ConfigError(String),
    /// A lookup that must fail loudly found nothing (`find_and_update`,
    /// `find_and_remove`, `commit_stage` against an unknown id).
    NotFound(String),
}

impl fmt::Display for CollectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TypeError(msg) => write!(f, "type error: {msg}"),
            Self::StateError(msg) => write!(f, "state error: {msg}"),
            Self::ConstraintError(msg) => write!(f, "constraint error: {msg}"),
            Self::ConfigError(msg) => write!(f, "config error: {msg}"),
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
        }
    }
}

impl std::error::Error for CollectionError {}

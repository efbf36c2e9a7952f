use crate::error::CollectionError;

/// Cloning strategy applied to inserted/updated/emitted documents when
/// `clone` is enabled. See [`crate::document::clone_document`] for how each
/// variant is realised in a typed, owned-data target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CloneMethod {
    #[default]
    Deep,
    ParseStringify,
    Shallow,
    ShallowAssign,
}

/// A registered virtual accessor: `name` reads `obj.path[0].path[1]...`,
/// flattening into a list if any intermediate segment traverses an array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestedPropertyDef {
    pub name: String,
    pub path: Vec<String>,
}

impl NestedPropertyDef {
    /// `name` doubles as the dotted path when no explicit path is given —
    /// mirrors the source system accepting either a bare name or
    /// `{name, path}`.
    pub fn simple(name: impl Into<String>) -> Self {
        let name = name.into();
        let path = name.split('.').map(str::to_string).collect();
        Self { name, path }
    }

    pub fn with_path(name: impl Into<String>, path: Vec<String>) -> Self {
        Self {
            name: name.into(),
            path,
        }
    }
}

/// Constructor options for a [`crate::collection::Collection`].
///
/// Plain public fields validated once at construction time, matching
/// `slate_engine::CollectionConfig` / `CreateCollectionOptions` rather than
/// reaching for an external config-file crate — the teacher's
/// storage-kernel crates take configuration as constructor structs too.
#[derive(Debug, Clone)]
pub struct CollectionOptions {
    pub name: String,
    pub unique: Vec<String>,
    pub indices: Vec<String>,
    pub adaptive_binary_indices: bool,
    pub async_listeners: bool,
    pub disable_meta: bool,
    pub disable_changes_api: bool,
    pub disable_delta_changes_api: bool,
    pub clone: bool,
    pub clone_method: CloneMethod,
    /// Whether `to_json` persists each binary index's permutation or only
    /// its field name. Indices are always rebuildable from `data`; turning
    /// this off just shrinks the snapshot at the cost of a rebuild on load.
    pub serializable_indices: bool,
    pub transactional: bool,
    /// `None` disables the TTL daemon.
    pub ttl_age_millis: Option<i64>,
    pub ttl_interval_millis: Option<u64>,
    pub nested_properties: Vec<NestedPropertyDef>,
}

impl CollectionOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unique: Vec::new(),
            indices: Vec::new(),
            adaptive_binary_indices: true,
            async_listeners: false,
            disable_meta: false,
            disable_changes_api: true,
            disable_delta_changes_api: true,
            clone: false,
            clone_method: CloneMethod::Deep,
            serializable_indices: true,
            transactional: false,
            ttl_age_millis: None,
            ttl_interval_millis: None,
            nested_properties: Vec::new(),
        }
    }

    /// Enforce §7's "ConfigError: mutually exclusive options in
    /// constructor": metadata cannot be disabled alongside change tracking
    /// or TTL, delta tracking implies tracking, and a TTL age needs an
    /// interval to be swept on.
    pub fn validate(&self) -> Result<(), CollectionError> {
        if self.disable_meta && !self.disable_changes_api {
            return Err(CollectionError::ConfigError(
                "disable_meta is incompatible with the changes API".into(),
            ));
        }
        if self.disable_meta && self.ttl_age_millis.is_some() {
            return Err(CollectionError::ConfigError(
                "disable_meta is incompatible with TTL".into(),
            ));
        }
        if !self.disable_delta_changes_api && self.disable_changes_api {
            return Err(CollectionError::ConfigError(
                "delta changes require the changes API to be enabled".into(),
            ));
        }
        if let Some(age) = self.ttl_age_millis {
            if age >= 0 && self.ttl_interval_millis.is_none() {
                return Err(CollectionError::ConfigError(
                    "ttl_age_millis requires ttl_interval_millis".into(),
                ));
            }
        }
        Ok(())
    }

    /// Effective delta-changes flag: forced off whenever changes are off,
    /// matching the spec's "forced true when changes disabled" (inverted
    /// here since these are `disable_*` flags).
    pub fn delta_changes_enabled(&self) -> bool {
        !self.disable_changes_api && !self.disable_delta_changes_api
    }

    pub fn changes_enabled(&self) -> bool {
        !self.disable_changes_api
    }
}

//! Error types for the store engine

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    // -- Configuration ----------------------------------------------------
    #[error("Invalid shard factor {0}: must be a divisor of 64")]
    InvalidShardFactor(u32),

    #[error("Malformed record id '{0}': missing discriminator separator")]
    MalformedRecordId(String),

    #[error("Record id char '{0}' is outside the shard alphabet")]
    IdCharOutsideAlphabet(char),

    #[error("No hierarchy node for '{0}'")]
    NodeNotFound(String),

    #[error("Invalid node name '{0}': only a-z, A-Z, 0-9, _, - allowed")]
    InvalidNodeName(String),

    #[error("Duplicate record node id {node_id} in collection '{collection}'")]
    DuplicateNodeId { collection: String, node_id: u32 },

    // -- Storage ----------------------------------------------------------
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Key already exists: {0}")]
    KeyExists(String),

    /// Shard auto-creation failed: both the initial load and the fallback
    /// create are reported so the full causal chain is visible.
    #[error("Error loading, then creating id shard {key}: LOAD: {load}: CREATE: {create}")]
    ShardUnavailable {
        key: String,
        load: Box<StoreError>,
        create: Box<StoreError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid path pattern: {0}")]
    Pattern(#[from] regex_lite::Error),

    // -- Concurrency ------------------------------------------------------
    #[error("Could not acquire lock {0} within the configured retries")]
    LockTimeout(String),

    #[error("Version conflict on {key}: expected {expected}, found {actual}")]
    VersionConflict {
        key: String,
        expected: u64,
        actual: u64,
    },
}

impl StoreError {
    /// True for errors that read as "the key simply is not there".
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::KeyNotFound(_))
    }
}

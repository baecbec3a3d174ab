//! Key/folder datastore abstraction.
//!
//! Everything the engine persists goes through this trait: whole-file loads
//! and whole-file overwrites addressed by slash-joined keys. The store is
//! expected to give read-your-writes consistency per key; there are no
//! multi-key transactions, so callers that need atomicity across keys must
//! layer it themselves (see the mutation gate).
//!
//! Two implementations ship with the crate: [`memory::MemoryDataStore`]
//! (test double, everything in a map) and [`local::LocalDataStore`]
//! (keys mapped onto a base directory via `tokio::fs`).

pub mod local;
pub mod memory;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

pub use local::LocalDataStore;
pub use memory::MemoryDataStore;

/// Abstract key-addressed store. Keys are canonical slash-joined paths
/// (see [`crate::keys`]).
#[async_trait]
pub trait DataStore: Send + Sync {
    /// True if a file or folder exists at `key`.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Create a folder. Creating a folder that already exists is a no-op.
    async fn create_folder(&self, key: &str) -> Result<()>;

    /// Create a file with the given content. Fails with `KeyExists` if the
    /// key is already taken.
    async fn create_file(&self, key: &str, content: &str) -> Result<()>;

    /// Load a whole file. Fails with `KeyNotFound` if absent.
    async fn load_file(&self, key: &str) -> Result<String>;

    /// Overwrite a whole file. Fails with `KeyNotFound` if absent.
    async fn update_file(&self, key: &str, content: &str) -> Result<()>;

    /// Delete a file. Fails with `KeyNotFound` if absent.
    async fn delete_file(&self, key: &str) -> Result<()>;
}

/// Create a structured document at `key`. Fails if the key exists.
pub async fn create_json<T: Serialize + Sync>(
    store: &dyn DataStore,
    key: &str,
    doc: &T,
) -> Result<()> {
    let content = serde_json::to_string(doc)?;
    store.create_file(key, &content).await
}

/// Overwrite the structured document at `key`. Fails if the key is absent.
pub async fn update_json<T: Serialize + Sync>(
    store: &dyn DataStore,
    key: &str,
    doc: &T,
) -> Result<()> {
    let content = serde_json::to_string(doc)?;
    store.update_file(key, &content).await
}

/// Load and deserialize the document at `key`.
pub async fn load_json<T: DeserializeOwned>(store: &dyn DataStore, key: &str) -> Result<T> {
    let content = store.load_file(key).await?;
    Ok(serde_json::from_str(&content)?)
}

//! Mutation gate for shared versioned documents.
//!
//! Any document meant for safe concurrent mutation goes through two
//! explicit steps: acquire the document's named lock (bounded wait, fails
//! fast), then compare-and-swap on the stored version stamp. The version
//! check runs even though the lock is held, because another writer may
//! have completed between the caller's read and lock acquisition — the two
//! failure modes (can't-acquire vs stale-version) stay separately
//! observable. On success the document is written with its version
//! incremented; the lock is released unconditionally on every path.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::datastore::{create_json, load_json, update_json, DataStore};
use crate::error::{Result, StoreError};
use crate::lock::{get_lock, release_lock, LockOptions};

/// A shared document carrying its optimistic-concurrency version stamp.
/// Serializes as `{"version": n, ...body}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Versioned<T> {
    pub version: u64,
    #[serde(flatten)]
    pub body: T,
}

/// Write `doc` back at `doc_key` if (and only if) the stored version still
/// matches `doc.version`. Returns the new stored version.
///
/// An absent document reads as version 0, so a caller seeding a fresh
/// document submits `version: 0` and the gate creates it at version 1.
pub async fn update_versioned<T>(
    store: &dyn DataStore,
    doc_key: &str,
    lock_key: &str,
    options: &LockOptions,
    doc: &Versioned<T>,
) -> Result<u64>
where
    T: Serialize + Sync,
{
    let lock = get_lock(store, lock_key, options).await?;
    let outcome = write_if_current(store, doc_key, doc).await;
    if let Err(e) = release_lock(store, &lock).await {
        warn!(lock = %lock.key, error = %e, "failed to release lock");
    }
    outcome
}

/// Load the document at `doc_key` with its version stamp.
pub async fn load_versioned<T>(store: &dyn DataStore, doc_key: &str) -> Result<Versioned<T>>
where
    T: DeserializeOwned,
{
    load_json(store, doc_key).await
}

async fn write_if_current<T>(
    store: &dyn DataStore,
    doc_key: &str,
    doc: &Versioned<T>,
) -> Result<u64>
where
    T: Serialize + Sync,
{
    let stored_version = match load_json::<serde_json::Value>(store, doc_key).await {
        Ok(stored) => stored.get("version").and_then(|v| v.as_u64()).unwrap_or(0),
        Err(e) if e.is_not_found() => 0,
        Err(e) => return Err(e),
    };

    if stored_version != doc.version {
        return Err(StoreError::VersionConflict {
            key: doc_key.to_string(),
            expected: doc.version,
            actual: stored_version,
        });
    }

    let next_version = doc.version + 1;
    let mut value = serde_json::to_value(doc)?;
    value["version"] = serde_json::Value::from(next_version);

    if store.exists(doc_key).await? {
        update_json(store, doc_key, &value).await?;
    } else {
        create_json(store, doc_key, &value).await?;
    }
    Ok(next_version)
}

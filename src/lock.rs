//! Named, timeout-bounded locks over datastore lock files.
//!
//! Acquisition is `create_file` of the lock key: whoever creates the file
//! holds the lock. The file content is the holder's expiry timestamp in
//! epoch milliseconds, so a crashed holder's lock can be broken once it
//! expires. A live holder is retried a bounded number of times; exhaustion
//! fails with a lock-timeout error and no side effects.
//!
//! This is one half of the mutation gate — see [`crate::gate`] for the
//! version check layered on top.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::datastore::DataStore;
use crate::error::{Result, StoreError};

/// How long the lock stays valid once held, and how acquisition waits.
#[derive(Debug, Clone)]
pub struct LockOptions {
    /// Validity window written into the lock file; holders past it are
    /// considered crashed and their lock is broken.
    pub timeout: Duration,
    /// Acquisition attempts beyond the first.
    pub max_retries: u32,
    /// Sleep between attempts while the holder is live.
    pub retry_delay: Duration,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_retries: 2,
            retry_delay: Duration::from_millis(50),
        }
    }
}

/// A held lock. Dropping it does NOT release — call [`release_lock`].
#[derive(Debug)]
pub struct Lock {
    pub key: String,
}

fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}

/// Acquire the named lock, waiting at most
/// `max_retries × retry_delay` for a live holder to release.
pub async fn get_lock(
    store: &dyn DataStore,
    lock_key: &str,
    options: &LockOptions,
) -> Result<Lock> {
    let mut attempt = 0;
    loop {
        let expires = now_ms() + options.timeout.as_millis();
        if store.create_file(lock_key, &expires.to_string()).await.is_ok() {
            debug!(lock = %lock_key, "lock acquired");
            return Ok(Lock {
                key: lock_key.to_string(),
            });
        }

        // Somebody holds it. Expired holders are broken; an unreadable
        // timestamp is treated as expired rather than wedging the key
        // forever.
        let holder_expired = match store.load_file(lock_key).await {
            Ok(content) => content
                .trim()
                .parse::<u128>()
                .map(|e| e <= now_ms())
                .unwrap_or(true),
            Err(e) if e.is_not_found() => true, // released between attempts
            Err(_) => false,
        };

        if holder_expired {
            match store.delete_file(lock_key).await {
                Ok(()) => debug!(lock = %lock_key, "broke expired lock"),
                Err(e) if e.is_not_found() => {}
                Err(e) => warn!(lock = %lock_key, error = %e, "failed to break expired lock"),
            }
        }

        if attempt == options.max_retries {
            return Err(StoreError::LockTimeout(lock_key.to_string()));
        }
        attempt += 1;
        if !holder_expired {
            sleep(options.retry_delay).await;
        }
    }
}

/// Release a held lock. Absence is tolerated (an expired lock may already
/// have been broken by another caller).
pub async fn release_lock(store: &dyn DataStore, lock: &Lock) -> Result<()> {
    match store.delete_file(&lock.key).await {
        Ok(()) => {
            debug!(lock = %lock.key, "lock released");
            Ok(())
        }
        Err(e) if e.is_not_found() => Ok(()),
        Err(e) => Err(e),
    }
}

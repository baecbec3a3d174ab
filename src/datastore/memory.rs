//! In-memory datastore.
//!
//! The test double for the engine: keys map to folder markers or file
//! contents in a single mutex-guarded map. Folders are markers only — the
//! store does not require a parent folder to exist before a file is
//! created under it.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{Result, StoreError};
use crate::keys::safe_key;

use super::DataStore;

#[derive(Debug, Clone, PartialEq)]
enum Entry {
    Folder,
    File(String),
}

/// Map-backed [`DataStore`] implementation.
#[derive(Default)]
pub struct MemoryDataStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored (files and folders).
    pub async fn key_count(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[async_trait]
impl DataStore for MemoryDataStore {
    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.entries.lock().await.contains_key(&safe_key(key)))
    }

    async fn create_folder(&self, key: &str) -> Result<()> {
        self.entries
            .lock()
            .await
            .entry(safe_key(key))
            .or_insert(Entry::Folder);
        Ok(())
    }

    async fn create_file(&self, key: &str, content: &str) -> Result<()> {
        let key = safe_key(key);
        let mut entries = self.entries.lock().await;
        if entries.contains_key(&key) {
            return Err(StoreError::KeyExists(key));
        }
        entries.insert(key, Entry::File(content.to_string()));
        Ok(())
    }

    async fn load_file(&self, key: &str) -> Result<String> {
        let key = safe_key(key);
        match self.entries.lock().await.get(&key) {
            Some(Entry::File(content)) => Ok(content.clone()),
            _ => Err(StoreError::KeyNotFound(key)),
        }
    }

    async fn update_file(&self, key: &str, content: &str) -> Result<()> {
        let key = safe_key(key);
        let mut entries = self.entries.lock().await;
        match entries.get_mut(&key) {
            Some(Entry::File(existing)) => {
                *existing = content.to_string();
                Ok(())
            }
            _ => Err(StoreError::KeyNotFound(key)),
        }
    }

    async fn delete_file(&self, key: &str) -> Result<()> {
        let key = safe_key(key);
        let mut entries = self.entries.lock().await;
        match entries.get(&key) {
            Some(Entry::File(_)) => {
                entries.remove(&key);
                Ok(())
            }
            _ => Err(StoreError::KeyNotFound(key)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastore::{create_json, load_json};

    #[tokio::test]
    async fn test_create_load_update_roundtrip() {
        let store = MemoryDataStore::new();
        store.create_file("/a/b", "one").await.unwrap();
        assert_eq!(store.load_file("/a/b").await.unwrap(), "one");

        store.update_file("/a/b", "two").await.unwrap();
        assert_eq!(store.load_file("/a/b").await.unwrap(), "two");
    }

    #[tokio::test]
    async fn test_create_existing_file_fails() {
        let store = MemoryDataStore::new();
        store.create_file("/a", "x").await.unwrap();
        let err = store.create_file("/a", "y").await.unwrap_err();
        assert!(matches!(err, StoreError::KeyExists(_)));
    }

    #[tokio::test]
    async fn test_load_and_update_absent_fail() {
        let store = MemoryDataStore::new();
        assert!(store.load_file("/missing").await.unwrap_err().is_not_found());
        assert!(store
            .update_file("/missing", "x")
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_folder_creation_is_idempotent() {
        let store = MemoryDataStore::new();
        store.create_folder("/customers").await.unwrap();
        store.create_folder("/customers").await.unwrap();
        assert!(store.exists("/customers").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_file() {
        let store = MemoryDataStore::new();
        store.create_file("/lock", "1").await.unwrap();
        store.delete_file("/lock").await.unwrap();
        assert!(!store.exists("/lock").await.unwrap());
        assert!(store.delete_file("/lock").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_keys_are_normalized() {
        let store = MemoryDataStore::new();
        store.create_file("a/b/", "x").await.unwrap();
        assert!(store.exists("/a/b").await.unwrap());
        assert_eq!(store.load_file("/a/b").await.unwrap(), "x");
    }

    #[tokio::test]
    async fn test_json_helpers() {
        let store = MemoryDataStore::new();
        let doc = serde_json::json!({"version": 0, "levels": []});
        create_json(&store, "/doc.json", &doc).await.unwrap();
        let loaded: serde_json::Value = load_json(&store, "/doc.json").await.unwrap();
        assert_eq!(loaded, doc);
    }
}

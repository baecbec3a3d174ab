//! Filesystem datastore.
//!
//! Maps canonical keys onto paths under a base directory: the key
//! `/customers/allids/0/0123` becomes `<base>/customers/allids/0/0123`.
//! Parent directories are created implicitly when a file is written, so a
//! missing intermediate folder never fails a write.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::{Result, StoreError};
use crate::keys::split_key;

use super::DataStore;

/// [`DataStore`] backed by a directory on the local filesystem.
pub struct LocalDataStore {
    base: PathBuf,
}

impl LocalDataStore {
    /// Create a store rooted at `base`. The directory is created if it
    /// does not exist.
    pub fn new(base: &Path) -> Result<Self> {
        std::fs::create_dir_all(base)?;
        Ok(Self {
            base: base.to_path_buf(),
        })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let mut path = self.base.clone();
        for part in split_key(key) {
            path.push(part);
        }
        path
    }
}

#[async_trait]
impl DataStore for LocalDataStore {
    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(tokio::fs::try_exists(self.path_for(key)).await?)
    }

    async fn create_folder(&self, key: &str) -> Result<()> {
        tokio::fs::create_dir_all(self.path_for(key)).await?;
        Ok(())
    }

    async fn create_file(&self, key: &str, content: &str) -> Result<()> {
        let path = self.path_for(key);
        if tokio::fs::try_exists(&path).await? {
            return Err(StoreError::KeyExists(key.to_string()));
        }
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, content).await?;
        Ok(())
    }

    async fn load_file(&self, key: &str) -> Result<String> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StoreError::KeyNotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update_file(&self, key: &str, content: &str) -> Result<()> {
        let path = self.path_for(key);
        if !tokio::fs::try_exists(&path).await? {
            return Err(StoreError::KeyNotFound(key.to_string()));
        }
        tokio::fs::write(&path, content).await?;
        Ok(())
    }

    async fn delete_file(&self, key: &str) -> Result<()> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StoreError::KeyNotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

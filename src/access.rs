//! Access-levels document.
//!
//! The store's access levels live in one shared JSON document that any
//! admin session may edit, which makes it the canonical user of the
//! mutation gate: saves acquire the access-levels lock and compare the
//! version stamp before writing. Rule evaluation against records is a
//! separate concern and not handled here.

use serde::{Deserialize, Serialize};

use crate::datastore::{create_json, DataStore};
use crate::error::Result;
use crate::gate::{load_versioned, update_versioned, Versioned};
use crate::lock::LockOptions;

pub const AUTH_FOLDER: &str = "/.auth";
pub const ACCESS_LEVELS_FILE: &str = "/.auth/access_levels.json";
pub const ACCESS_LEVELS_LOCK_FILE: &str = "/.auth/access_levels_lock";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessType {
    Whitelist,
    Blacklist,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Permission {
    #[serde(rename = "type")]
    pub permission_type: String,

    /// Record and index permissions name the node they apply to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessLevel {
    pub name: String,
    pub access_type: AccessType,
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

impl AccessLevel {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            access_type: AccessType::Whitelist,
            permissions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessLevels {
    #[serde(default)]
    pub levels: Vec<AccessLevel>,
}

/// Seed the auth folder and an empty access-levels document at version 0.
/// Idempotent.
pub async fn initialise_auth(store: &dyn DataStore) -> Result<()> {
    store.create_folder(AUTH_FOLDER).await?;
    if !store.exists(ACCESS_LEVELS_FILE).await? {
        let seed = Versioned {
            version: 0,
            body: AccessLevels::default(),
        };
        create_json(store, ACCESS_LEVELS_FILE, &seed).await?;
    }
    Ok(())
}

pub async fn load_access_levels(store: &dyn DataStore) -> Result<Versioned<AccessLevels>> {
    load_versioned(store, ACCESS_LEVELS_FILE).await
}

/// Save through the mutation gate. Fails on a held lock or a stale
/// version; returns the new stored version on success.
pub async fn save_access_levels(
    store: &dyn DataStore,
    doc: &Versioned<AccessLevels>,
) -> Result<u64> {
    update_versioned(
        store,
        ACCESS_LEVELS_FILE,
        ACCESS_LEVELS_LOCK_FILE,
        &LockOptions::default(),
        doc,
    )
    .await
}

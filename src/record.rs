//! Record identity.
//!
//! A record is identified by its concrete key (ancestor collection keys
//! joined with its id) plus a JSON map of field values. Ids embed two parts
//! separated by the first `-`: the child-node discriminator, and a suffix
//! whose leading character selects the id-shard bucket.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, StoreError};
use crate::keys::join_key;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    /// Concrete instance key, e.g. `/customers/0-h7d9x`.
    pub key: String,

    /// The record's id — the last segment of `key`.
    pub id: String,

    /// Field values.
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl Record {
    pub fn new(collection_key: &str, id: &str, fields: Map<String, Value>) -> Self {
        Self {
            key: join_key([collection_key, id]),
            id: id.to_string(),
            fields,
        }
    }

    /// A reference field value is "populated" when it holds an object with
    /// a non-empty `key`.
    pub fn reference_key(&self, field_name: &str) -> Option<&str> {
        self.fields
            .get(field_name)
            .and_then(|v| v.get("key"))
            .and_then(|k| k.as_str())
            .filter(|k| !k.is_empty())
    }
}

/// The discriminator part of an id: everything before the first `-`.
pub fn discriminator(record_id: &str) -> Result<&str> {
    match record_id.split_once('-') {
        Some((disc, suffix)) if !disc.is_empty() && !suffix.is_empty() => Ok(disc),
        _ => Err(StoreError::MalformedRecordId(record_id.to_string())),
    }
}

/// The shard-relevant character of an id: first character after the `-`.
pub fn shard_char(record_id: &str) -> Result<char> {
    match record_id.split_once('-') {
        Some((disc, suffix)) if !disc.is_empty() => suffix
            .chars()
            .next()
            .ok_or_else(|| StoreError::MalformedRecordId(record_id.to_string())),
        _ => Err(StoreError::MalformedRecordId(record_id.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_id_parts() {
        assert_eq!(discriminator("0-h7d9x").unwrap(), "0");
        assert_eq!(shard_char("0-h7d9x").unwrap(), 'h');
        assert_eq!(discriminator("a-x7f3").unwrap(), "a");
        assert_eq!(shard_char("a-x7f3").unwrap(), 'x');
    }

    #[test]
    fn test_malformed_ids() {
        for id in ["nodash", "-suffix", "0-", ""] {
            assert!(matches!(
                discriminator(id).unwrap_err(),
                StoreError::MalformedRecordId(_)
            ));
        }
        assert!(shard_char("3-").is_err());
    }

    #[test]
    fn test_record_key_built_from_collection_and_id() {
        let record = Record::new("/customers", "0-abc", Map::new());
        assert_eq!(record.key, "/customers/0-abc");
        assert_eq!(record.id, "0-abc");
    }

    #[test]
    fn test_reference_key() {
        let mut fields = Map::new();
        fields.insert(
            "partner".to_string(),
            json!({"key": "/partners/0-p1", "value": "acme inc"}),
        );
        fields.insert("empty".to_string(), json!({"key": "", "value": ""}));
        fields.insert("surname".to_string(), json!("ledog"));
        let record = Record::new("/customers", "0-abc", fields);

        assert_eq!(record.reference_key("partner"), Some("/partners/0-p1"));
        assert_eq!(record.reference_key("empty"), None);
        assert_eq!(record.reference_key("surname"), None);
        assert_eq!(record.reference_key("missing"), None);
    }
}

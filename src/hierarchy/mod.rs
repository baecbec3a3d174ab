//! Application hierarchy — the static, validated schema tree.
//!
//! A hierarchy is a closed set of node kinds: a root holding top-level
//! collections and global indexes; collections holding record types and
//! attached indexes; record types holding fields, nested collections, and
//! reverse-reference indexes. Every node carries two derived attributes,
//! computed once by [`Hierarchy::construct`]:
//!
//! - `node_key`  — schema-level path of names, e.g. `/customers/customer`
//! - `path_regx` — pattern matching any concrete instance key owned by the
//!   node, e.g. `/customers/[a-zA-Z0-9_-]+`
//!
//! Pattern length grows with tree depth, so concrete-key ownership is
//! decided by longest-pattern-first matching (see [`query`]).
//!
//! Queries over the tree are free functions in [`query`], keeping the model
//! plain serializable data.

pub mod query;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::keys::join_key;

/// Pattern for one record id segment inside a concrete key.
pub const RECORD_ID_PATTERN: &str = "[a-zA-Z0-9_-]+";

/// Shard factor applied to a collection unless the schema says otherwise.
pub const DEFAULT_SHARD_FACTOR: u32 = 64;

// -- Node types ---------------------------------------------------------------

/// Root of the schema tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RootNode {
    /// Top-level collections.
    #[serde(default)]
    pub collections: Vec<CollectionNode>,

    /// Global indexes: attached at root, observing every record.
    #[serde(default)]
    pub indexes: Vec<IndexNode>,
}

/// A collection of records, optionally polymorphic over several record
/// types. Owns the id-shard layout for its members.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionNode {
    pub name: String,
    pub node_id: u32,

    /// Number of id-shard buckets; must divide 64.
    pub allids_shard_factor: u32,

    /// Record types stored in this collection.
    #[serde(default)]
    pub children: Vec<RecordNode>,

    /// Indexes attached at this collection.
    #[serde(default)]
    pub indexes: Vec<IndexNode>,

    #[serde(default)]
    pub node_key: String,
    #[serde(default)]
    pub path_regx: String,
}

impl CollectionNode {
    pub fn new(name: &str, node_id: u32) -> Self {
        Self {
            name: name.to_string(),
            node_id,
            allids_shard_factor: DEFAULT_SHARD_FACTOR,
            children: Vec::new(),
            indexes: Vec::new(),
            node_key: String::new(),
            path_regx: String::new(),
        }
    }
}

/// A record type. Its `node_id` doubles as the id discriminator: record ids
/// are `<node_id>-<suffix>` and the id shards of the parent collection are
/// partitioned into one subfolder per child node id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordNode {
    pub name: String,
    pub node_id: u32,

    #[serde(default)]
    pub fields: Vec<FieldNode>,

    /// Nested collections under each record of this type.
    #[serde(default)]
    pub children: Vec<CollectionNode>,

    /// Reverse-reference indexes attached under this record type. Their
    /// storage location is per referenced record, not per schema position.
    #[serde(default)]
    pub indexes: Vec<IndexNode>,

    #[serde(default)]
    pub node_key: String,
    #[serde(default)]
    pub path_regx: String,
}

impl RecordNode {
    pub fn new(name: &str, node_id: u32) -> Self {
        Self {
            name: name.to_string(),
            node_id,
            fields: Vec::new(),
            children: Vec::new(),
            indexes: Vec::new(),
            node_key: String::new(),
            path_regx: String::new(),
        }
    }
}

/// How an index observes records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexType {
    /// Observes records under the node the index is attached to
    /// (root = global, collection = collection-default/nested).
    Ancestor,
    /// Reverse-reference: stored under the referenced record, populated by
    /// records elsewhere that point at it.
    Reference,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexNode {
    pub name: String,
    pub node_id: u32,
    pub index_type: IndexType,

    /// Record node ids this index accepts; empty accepts all.
    #[serde(default)]
    pub allowed_record_node_ids: Vec<u32>,

    /// Sharded indexes get a shard-map marker instead of a single data file.
    #[serde(default)]
    pub sharded: bool,

    #[serde(default)]
    pub node_key: String,
}

impl IndexNode {
    pub fn new(name: &str, node_id: u32, index_type: IndexType) -> Self {
        Self {
            name: name.to_string(),
            node_id,
            index_type,
            allowed_record_node_ids: Vec::new(),
            sharded: false,
            node_key: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Bool,
    DateTime,
    Reference,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldNode {
    pub name: String,
    pub field_type: FieldType,

    /// For reference fields: node keys of the reverse-reference indexes to
    /// maintain under the referenced record.
    #[serde(default)]
    pub reverse_index_node_keys: Vec<String>,
}

impl FieldNode {
    pub fn new(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            reverse_index_node_keys: Vec::new(),
        }
    }

    pub fn reference(name: &str, reverse_index_node_keys: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            field_type: FieldType::Reference,
            reverse_index_node_keys,
        }
    }
}

// -- Construction -------------------------------------------------------------

/// A constructed, validated hierarchy. Obtained via [`Hierarchy::construct`],
/// which fills every node's derived `node_key`/`path_regx`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hierarchy {
    pub root: RootNode,
}

impl Hierarchy {
    /// Walk the tree computing derived keys and patterns, validating node
    /// names, shard factors, and child-id uniqueness.
    pub fn construct(mut root: RootNode) -> Result<Self> {
        for index in &mut root.indexes {
            validate_name(&index.name)?;
            index.node_key = join_key(["", index.name.as_str()]);
        }
        for collection in &mut root.collections {
            construct_collection(collection, "", "")?;
        }
        Ok(Self { root })
    }

    /// Preorder listing of every collection and record node.
    pub fn flattened(&self) -> Vec<NodeRef<'_>> {
        let mut out = Vec::new();
        for collection in &self.root.collections {
            flatten_collection(collection, &mut out);
        }
        out
    }
}

fn construct_collection(
    node: &mut CollectionNode,
    parent_key: &str,
    parent_regx: &str,
) -> Result<()> {
    validate_name(&node.name)?;
    if node.allids_shard_factor == 0 || 64 % node.allids_shard_factor != 0 {
        return Err(StoreError::InvalidShardFactor(node.allids_shard_factor));
    }

    node.node_key = join_key([parent_key, node.name.as_str()]);
    node.path_regx = format!("{}/{}", parent_regx, node.name);

    let mut seen = HashSet::new();
    for child in &mut node.children {
        if !seen.insert(child.node_id) {
            return Err(StoreError::DuplicateNodeId {
                collection: node.node_key.clone(),
                node_id: child.node_id,
            });
        }
        construct_record(child, &node.node_key, &node.path_regx)?;
    }

    for index in &mut node.indexes {
        validate_name(&index.name)?;
        index.node_key = join_key([&node.node_key, &index.name]);
    }

    Ok(())
}

fn construct_record(node: &mut RecordNode, parent_key: &str, parent_regx: &str) -> Result<()> {
    validate_name(&node.name)?;
    node.node_key = join_key([parent_key, node.name.as_str()]);
    node.path_regx = format!("{}/{}", parent_regx, RECORD_ID_PATTERN);

    for field in &node.fields {
        validate_name(&field.name)?;
    }
    for index in &mut node.indexes {
        validate_name(&index.name)?;
        index.node_key = join_key([&node.node_key, &index.name]);
    }
    for collection in &mut node.children {
        construct_collection(collection, &node.node_key, &node.path_regx)?;
    }

    Ok(())
}

/// Node names become path segments and regex literals, so the charset is
/// restricted the same way datastore-visible names are elsewhere.
fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.len() <= 128
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidNodeName(name.to_string()))
    }
}

// -- Flattened view -----------------------------------------------------------

/// Borrowed view of a collection or record node, for pattern matching and
/// ancestor queries.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Collection(&'a CollectionNode),
    Record(&'a RecordNode),
}

impl<'a> NodeRef<'a> {
    pub fn node_key(&self) -> &'a str {
        match self {
            NodeRef::Collection(c) => &c.node_key,
            NodeRef::Record(r) => &r.node_key,
        }
    }

    pub fn path_regx(&self) -> &'a str {
        match self {
            NodeRef::Collection(c) => &c.path_regx,
            NodeRef::Record(r) => &r.path_regx,
        }
    }
}

fn flatten_collection<'a>(node: &'a CollectionNode, out: &mut Vec<NodeRef<'a>>) {
    out.push(NodeRef::Collection(node));
    for child in &node.children {
        out.push(NodeRef::Record(child));
        for nested in &child.children {
            flatten_collection(nested, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_level_root() -> RootNode {
        let mut invoices = CollectionNode::new("invoices", 1);
        invoices.children.push(RecordNode::new("invoice", 1));

        let mut customer = RecordNode::new("customer", 0);
        customer.children.push(invoices);

        let mut customers = CollectionNode::new("customers", 0);
        customers.children.push(customer);

        let mut root = RootNode::default();
        root.collections.push(customers);
        root.indexes
            .push(IndexNode::new("outstanding", 90, IndexType::Ancestor));
        root
    }

    #[test]
    fn test_construct_derives_keys_and_patterns() {
        let h = Hierarchy::construct(two_level_root()).unwrap();

        let customers = &h.root.collections[0];
        assert_eq!(customers.node_key, "/customers");
        assert_eq!(customers.path_regx, "/customers");

        let customer = &customers.children[0];
        assert_eq!(customer.node_key, "/customers/customer");
        assert_eq!(customer.path_regx, "/customers/[a-zA-Z0-9_-]+");

        let invoices = &customer.children[0];
        assert_eq!(invoices.node_key, "/customers/customer/invoices");
        assert_eq!(invoices.path_regx, "/customers/[a-zA-Z0-9_-]+/invoices");

        assert_eq!(h.root.indexes[0].node_key, "/outstanding");
    }

    #[test]
    fn test_pattern_length_grows_with_depth() {
        let h = Hierarchy::construct(two_level_root()).unwrap();
        let lens: Vec<usize> = h.flattened().iter().map(|n| n.path_regx().len()).collect();
        for window in lens.windows(2) {
            assert!(window[0] <= window[1]);
        }
    }

    #[test]
    fn test_invalid_shard_factor_rejected() {
        let mut root = two_level_root();
        root.collections[0].allids_shard_factor = 6;
        assert!(matches!(
            Hierarchy::construct(root).unwrap_err(),
            StoreError::InvalidShardFactor(6)
        ));
    }

    #[test]
    fn test_bad_name_rejected() {
        let mut root = two_level_root();
        root.collections[0].name = "cust omers".to_string();
        assert!(matches!(
            Hierarchy::construct(root).unwrap_err(),
            StoreError::InvalidNodeName(_)
        ));
    }

    #[test]
    fn test_duplicate_child_node_id_rejected() {
        let mut root = two_level_root();
        root.collections[0]
            .children
            .push(RecordNode::new("lead", 0));
        assert!(matches!(
            Hierarchy::construct(root).unwrap_err(),
            StoreError::DuplicateNodeId { node_id: 0, .. }
        ));
    }

    #[test]
    fn test_serde_roundtrip() {
        let h = Hierarchy::construct(two_level_root()).unwrap();
        let json = serde_json::to_string(&h).unwrap();
        let back: Hierarchy = serde_json::from_str(&json).unwrap();
        assert_eq!(back.root.collections[0].node_key, "/customers");
    }
}

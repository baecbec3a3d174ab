//! Free-function queries over a constructed hierarchy.
//!
//! Concrete-key ownership: a key belongs to the node whose anchored
//! `path_regx` matches it; where several patterns could match, candidates
//! are tried longest pattern first so the most specific node wins.

use regex_lite::Regex;

use crate::error::{Result, StoreError};
use crate::keys::{last_key_part, parent_key, safe_key};
use crate::record::discriminator;

use super::{CollectionNode, Hierarchy, IndexNode, NodeRef, RecordNode};

/// Anchored match of a node pattern against a concrete key.
pub fn matches_path(path_regx: &str, key: &str) -> Result<bool> {
    let re = Regex::new(&format!("^{}$", path_regx))?;
    Ok(re.is_match(key))
}

/// True if `node_key` sits strictly below `ancestor_key` in the schema tree.
pub fn is_ancestor_key(ancestor_key: &str, node_key: &str) -> bool {
    node_key.starts_with(&format!("{}/", ancestor_key))
}

/// The collection node owning a concrete collection key, e.g.
/// `/customers/0-abc/invoices` resolves to the `invoices` node.
pub fn node_for_collection_path<'a>(
    hierarchy: &'a Hierarchy,
    collection_key: &str,
) -> Result<&'a CollectionNode> {
    let key = safe_key(collection_key);
    for node in hierarchy.flattened() {
        if let NodeRef::Collection(c) = node {
            if matches_path(&c.path_regx, &key)? {
                return Ok(c);
            }
        }
    }
    Err(StoreError::NodeNotFound(key))
}

/// Resolve a collection node from either a concrete instance key or a
/// schema node key.
pub fn collection_node_by_key_or_node_key<'a>(
    hierarchy: &'a Hierarchy,
    key_or_node_key: &str,
) -> Result<&'a CollectionNode> {
    let key = safe_key(key_or_node_key);
    if let Ok(node) = node_for_collection_path(hierarchy, &key) {
        return Ok(node);
    }
    for node in hierarchy.flattened() {
        if let NodeRef::Collection(c) = node {
            if c.node_key == key {
                return Ok(c);
            }
        }
    }
    Err(StoreError::NodeNotFound(key))
}

/// The record node a concrete record key belongs to. For polymorphic
/// collections the id's discriminator picks the child type; a collection
/// with a single record type accepts any discriminator.
pub fn record_node_for_key<'a>(
    hierarchy: &'a Hierarchy,
    record_key: &str,
) -> Result<&'a RecordNode> {
    let key = safe_key(record_key);
    let collection = node_for_collection_path(hierarchy, &parent_key(&key))?;

    if collection.children.len() == 1 {
        return Ok(&collection.children[0]);
    }

    let id = last_key_part(&key).ok_or_else(|| StoreError::NodeNotFound(key.clone()))?;
    let disc = discriminator(&id)?;
    let node_id: u32 = disc
        .parse()
        .map_err(|_| StoreError::MalformedRecordId(id.clone()))?;
    collection
        .children
        .iter()
        .find(|c| c.node_id == node_id)
        .ok_or(StoreError::NodeNotFound(key))
}

/// Look an index node up by its schema node key, searching root, collection,
/// and record attachments.
pub fn index_node_by_node_key<'a>(
    hierarchy: &'a Hierarchy,
    node_key: &str,
) -> Option<&'a IndexNode> {
    let key = safe_key(node_key);
    if let Some(index) = hierarchy.root.indexes.iter().find(|i| i.node_key == key) {
        return Some(index);
    }
    for node in hierarchy.flattened() {
        let indexes = match node {
            NodeRef::Collection(c) => &c.indexes,
            NodeRef::Record(r) => &r.indexes,
        };
        if let Some(index) = indexes.iter().find(|i| i.node_key == key) {
            return Some(index);
        }
    }
    None
}

/// Collection nodes on the path from the root down to (and including) the
/// target, shallow-to-deep. This is the ancestor chain the hierarchical id
/// traversal descends through.
pub fn ancestor_collections<'a>(
    hierarchy: &'a Hierarchy,
    target: &CollectionNode,
) -> Vec<&'a CollectionNode> {
    let mut chain: Vec<&CollectionNode> = hierarchy
        .flattened()
        .into_iter()
        .filter_map(|n| match n {
            NodeRef::Collection(c)
                if c.node_key == target.node_key
                    || is_ancestor_key(&c.node_key, &target.node_key) =>
            {
                Some(c)
            }
            _ => None,
        })
        .collect();
    chain.sort_by_key(|c| c.node_key.len());
    chain
}

/// Names of the record types a collection accepts; empty for unknown keys.
pub fn allowed_record_types(hierarchy: &Hierarchy, collection_key: &str) -> Vec<String> {
    match node_for_collection_path(hierarchy, collection_key) {
        Ok(node) => node.children.iter().map(|c| c.name.clone()).collect(),
        Err(_) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::{IndexType, RootNode};
    use crate::hierarchy::{CollectionNode, IndexNode, RecordNode};

    fn hierarchy() -> Hierarchy {
        let mut invoices = CollectionNode::new("invoices", 1);
        invoices.children.push(RecordNode::new("invoice", 1));

        let mut customer = RecordNode::new("customer", 0);
        customer.children.push(invoices);
        customer
            .indexes
            .push(IndexNode::new("customer_activity", 80, IndexType::Reference));

        let mut customers = CollectionNode::new("customers", 0);
        customers.children.push(customer);

        let mut leads = CollectionNode::new("leads", 2);
        leads.children.push(RecordNode::new("lead", 0));
        leads.children.push(RecordNode::new("prospect", 1));

        let mut root = RootNode::default();
        root.collections.push(customers);
        root.collections.push(leads);
        root.indexes
            .push(IndexNode::new("outstanding", 90, IndexType::Ancestor));
        Hierarchy::construct(root).unwrap()
    }

    #[test]
    fn test_node_for_collection_path() {
        let h = hierarchy();
        assert_eq!(node_for_collection_path(&h, "/customers").unwrap().name, "customers");
        assert_eq!(
            node_for_collection_path(&h, "/customers/0-abc/invoices")
                .unwrap()
                .name,
            "invoices"
        );
        assert!(node_for_collection_path(&h, "/nope").is_err());
    }

    #[test]
    fn test_collection_by_key_or_node_key() {
        let h = hierarchy();
        // schema node key for a nested collection
        let by_node_key =
            collection_node_by_key_or_node_key(&h, "/customers/customer/invoices").unwrap();
        assert_eq!(by_node_key.name, "invoices");
        // concrete instance key
        let by_key = collection_node_by_key_or_node_key(&h, "/customers/0-abc/invoices").unwrap();
        assert_eq!(by_key.name, "invoices");
    }

    #[test]
    fn test_record_node_for_key_single_child() {
        let h = hierarchy();
        // single-child collection accepts any discriminator
        let node = record_node_for_key(&h, "/customers/a-x7f3").unwrap();
        assert_eq!(node.name, "customer");
    }

    #[test]
    fn test_record_node_for_key_polymorphic() {
        let h = hierarchy();
        assert_eq!(record_node_for_key(&h, "/leads/0-abc").unwrap().name, "lead");
        assert_eq!(
            record_node_for_key(&h, "/leads/1-abc").unwrap().name,
            "prospect"
        );
        assert!(record_node_for_key(&h, "/leads/7-abc").is_err());
    }

    #[test]
    fn test_index_node_by_node_key() {
        let h = hierarchy();
        assert!(index_node_by_node_key(&h, "/outstanding").is_some());
        assert!(
            index_node_by_node_key(&h, "/customers/customer/customer_activity").is_some()
        );
        assert!(index_node_by_node_key(&h, "/customers/customer/nope").is_none());
    }

    #[test]
    fn test_ancestor_collections_shallow_to_deep() {
        let h = hierarchy();
        let invoices = collection_node_by_key_or_node_key(&h, "/customers/customer/invoices").unwrap();
        let chain = ancestor_collections(&h, invoices);
        let names: Vec<&str> = chain.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["customers", "invoices"]);
    }

    #[test]
    fn test_allowed_record_types() {
        let h = hierarchy();
        assert_eq!(allowed_record_types(&h, "/leads"), vec!["lead", "prospect"]);
        assert!(allowed_record_types(&h, "/unknown").is_empty());
    }
}

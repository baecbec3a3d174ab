//! Index storage layout.
//!
//! Every index lives in its own folder at `<parentPath>/<indexName>`. A
//! sharded index keeps a shard-map marker file there; an unsharded index
//! keeps a single data file whose first line is a header row naming its
//! columns: the built-in `key` and `sortKey` columns followed by the union
//! of the field names of the record types the index accepts.

use crate::datastore::DataStore;
use crate::error::Result;
use crate::hierarchy::{Hierarchy, IndexNode, NodeRef, RecordNode};
use crate::keys::{join_key, parent_key};

/// Marker file of a sharded index.
pub const SHARD_MAP_FILE: &str = "shardMap.json";

/// Data file of an unsharded index.
pub const INDEX_DATA_FILE: &str = "index.csv";

/// Built-in columns present in every index file.
pub const BUILTIN_COLUMNS: [&str; 2] = ["key", "sortKey"];

pub fn get_shard_map_key(index_key: &str) -> String {
    join_key([index_key, SHARD_MAP_FILE])
}

pub fn get_unsharded_index_data_key(index_key: &str) -> String {
    join_key([index_key, INDEX_DATA_FILE])
}

/// Column names for an index: built-ins, then the union of field names of
/// the record types feeding it, in declaration order.
pub fn index_schema(hierarchy: &Hierarchy, index: &IndexNode) -> Vec<String> {
    let mut columns: Vec<String> = BUILTIN_COLUMNS.iter().map(|c| c.to_string()).collect();
    for record_node in feeding_record_nodes(hierarchy, index) {
        for field in &record_node.fields {
            if !columns.contains(&field.name) {
                columns.push(field.name.clone());
            }
        }
    }
    columns
}

/// Create an unsharded index's data file, writing the header row.
pub async fn create_index_file(
    hierarchy: &Hierarchy,
    store: &dyn DataStore,
    data_key: &str,
    index: &IndexNode,
) -> Result<()> {
    let header = index_schema(hierarchy, index).join(",");
    store.create_file(data_key, &format!("{header}\n")).await
}

/// The record types whose mutations feed this index: every record node for
/// a global index, the attached collection's children for a collection
/// index, and — for a reverse-reference index attached under a record
/// node — the record types declaring a reference field that targets it.
/// `allowed_record_node_ids` filters all three cases.
fn feeding_record_nodes<'a>(hierarchy: &'a Hierarchy, index: &IndexNode) -> Vec<&'a RecordNode> {
    let attachment_key = parent_key(&index.node_key);

    let candidates: Vec<&RecordNode> = if attachment_key.is_empty() {
        all_record_nodes(hierarchy)
    } else if let Some(collection) = hierarchy.flattened().into_iter().find_map(|n| match n {
        NodeRef::Collection(c) if c.node_key == attachment_key => Some(c),
        _ => None,
    }) {
        collection.children.iter().collect()
    } else {
        referencing_record_nodes(hierarchy, &index.node_key)
    };

    candidates
        .into_iter()
        .filter(|r| {
            index.allowed_record_node_ids.is_empty()
                || index.allowed_record_node_ids.contains(&r.node_id)
        })
        .collect()
}

fn all_record_nodes(hierarchy: &Hierarchy) -> Vec<&RecordNode> {
    hierarchy
        .flattened()
        .into_iter()
        .filter_map(|n| match n {
            NodeRef::Record(r) => Some(r),
            _ => None,
        })
        .collect()
}

fn referencing_record_nodes<'a>(
    hierarchy: &'a Hierarchy,
    index_node_key: &str,
) -> Vec<&'a RecordNode> {
    all_record_nodes(hierarchy)
        .into_iter()
        .filter(|r| {
            r.fields
                .iter()
                .any(|f| f.reverse_index_node_keys.iter().any(|k| k == index_node_key))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastore::MemoryDataStore;
    use crate::hierarchy::query;
    use crate::hierarchy::{
        CollectionNode, FieldNode, FieldType, IndexType, RecordNode, RootNode,
    };

    fn hierarchy() -> Hierarchy {
        let mut customer = RecordNode::new("customer", 0);
        customer.fields.push(FieldNode::new("surname", FieldType::String));
        customer.fields.push(FieldNode::reference(
            "partner",
            vec!["/partners/partner/partner_customers".to_string()],
        ));

        let mut customers = CollectionNode::new("customers", 0);
        customers
            .indexes
            .push(IndexNode::new("default", 10, IndexType::Ancestor));
        customers.children.push(customer);

        let mut partner = RecordNode::new("partner", 0);
        partner.fields.push(FieldNode::new("business_name", FieldType::String));
        partner
            .indexes
            .push(IndexNode::new("partner_customers", 40, IndexType::Reference));
        let mut partners = CollectionNode::new("partners", 1);
        partners.children.push(partner);

        let mut root = RootNode::default();
        root.collections.push(customers);
        root.collections.push(partners);
        root.indexes
            .push(IndexNode::new("everything", 90, IndexType::Ancestor));
        Hierarchy::construct(root).unwrap()
    }

    fn index_by_key<'a>(h: &'a Hierarchy, node_key: &str) -> &'a IndexNode {
        query::index_node_by_node_key(h, node_key).unwrap()
    }

    #[test]
    fn test_key_layout() {
        assert_eq!(
            get_shard_map_key("/customers/default"),
            "/customers/default/shardMap.json"
        );
        assert_eq!(
            get_unsharded_index_data_key("/customers/default"),
            "/customers/default/index.csv"
        );
    }

    #[test]
    fn test_collection_index_schema() {
        let h = hierarchy();
        let index = index_by_key(&h, "/customers/default");
        assert_eq!(
            index_schema(&h, index),
            vec!["key", "sortKey", "surname", "partner"]
        );
    }

    #[test]
    fn test_global_index_schema_unions_all_record_fields() {
        let h = hierarchy();
        let index = index_by_key(&h, "/everything");
        assert_eq!(
            index_schema(&h, index),
            vec!["key", "sortKey", "surname", "partner", "business_name"]
        );
    }

    #[test]
    fn test_reverse_index_schema_uses_referencing_records() {
        let h = hierarchy();
        let index = index_by_key(&h, "/partners/partner/partner_customers");
        // the customer record declares the reference, so its fields form
        // the columns
        assert_eq!(
            index_schema(&h, index),
            vec!["key", "sortKey", "surname", "partner"]
        );
    }

    #[tokio::test]
    async fn test_create_index_file_writes_header() {
        let h = hierarchy();
        let store = MemoryDataStore::new();
        let index = index_by_key(&h, "/customers/default");

        create_index_file(&h, &store, "/customers/default/index.csv", index)
            .await
            .unwrap();

        assert_eq!(
            store.load_file("/customers/default/index.csv").await.unwrap(),
            "key,sortKey,surname,partner\n"
        );
    }
}

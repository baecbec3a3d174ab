//! Index relevance — which indexes must observe a record.
//!
//! Consulted on every record mutation to decide which index entries to add
//! or remove, and on reads to pick an index to consult. Three kinds apply:
//!
//! - global indexes, attached at hierarchy root, apply unconditionally;
//! - collection indexes, discovered by walking the record's key prefix by
//!   prefix and matching each prefix to its owning node (ancestor-first);
//! - reverse-reference indexes, declared by the record's own reference
//!   fields and stored under the *referenced* record.
//!
//! The result is not deduplicated: a schema that attaches the same index
//! twice is a schema-authoring error, not a runtime concern. Multi-index
//! updates driven by this result are not atomic across indexes.

use crate::error::{Result, StoreError};
use crate::hierarchy::{query, FieldType, Hierarchy, IndexNode, NodeRef};
use crate::keys::{join_key, split_key};
use crate::record::Record;

/// An index node paired with the concrete storage path where its data
/// lives for the record in question.
#[derive(Debug, Clone)]
pub struct IndexAndPath<'a> {
    pub node: &'a IndexNode,
    pub path: String,
}

/// The full set of indexes relevant to one record.
#[derive(Debug, Default)]
pub struct RelevantIndexes<'a> {
    pub global_indexes: Vec<IndexAndPath<'a>>,
    pub collections: Vec<IndexAndPath<'a>>,
    pub reverse_reference: Vec<IndexAndPath<'a>>,
}

/// Compute every index that must observe `record`.
pub fn get_relevant_indexes<'a>(
    hierarchy: &'a Hierarchy,
    record: &Record,
) -> Result<RelevantIndexes<'a>> {
    let record_node = query::record_node_for_key(hierarchy, &record.key)?;

    // -- Global: direct children of root, path = own node key -------------
    let global_indexes = hierarchy
        .root
        .indexes
        .iter()
        .map(|index| IndexAndPath {
            node: index,
            path: index.node_key.clone(),
        })
        .collect();

    // -- Collection: ancestor-first walk of the key prefixes --------------
    // Deeper nodes have longer patterns, so sorting by decreasing pattern
    // length makes the most specific node win each prefix.
    let mut candidates = hierarchy.flattened();
    candidates.sort_by(|a, b| b.path_regx().len().cmp(&a.path_regx().len()));

    let mut collections = Vec::new();
    let mut prefix = String::new();
    for part in split_key(&record.key) {
        prefix = join_key([prefix.as_str(), part.as_str()]);

        let mut matched = None;
        for candidate in &candidates {
            if query::matches_path(candidate.path_regx(), &prefix)? {
                matched = Some(*candidate);
                break;
            }
        }

        let Some(NodeRef::Collection(collection)) = matched else {
            continue;
        };
        for index in &collection.indexes {
            let allowed = index.allowed_record_node_ids.is_empty()
                || index.allowed_record_node_ids.contains(&record_node.node_id);
            if allowed {
                collections.push(IndexAndPath {
                    node: index,
                    path: join_key([prefix.as_str(), index.name.as_str()]),
                });
            }
        }
    }

    // -- Reverse-reference: declared by the record's own fields -----------
    let mut reverse_reference = Vec::new();
    for field in &record_node.fields {
        if field.field_type != FieldType::Reference || field.reverse_index_node_keys.is_empty() {
            continue;
        }
        let Some(referenced_key) = record.reference_key(&field.name) else {
            continue;
        };
        for index_node_key in &field.reverse_index_node_keys {
            let index = query::index_node_by_node_key(hierarchy, index_node_key)
                .ok_or_else(|| StoreError::NodeNotFound(index_node_key.clone()))?;
            reverse_reference.push(IndexAndPath {
                node: index,
                path: join_key([referenced_key, index.name.as_str()]),
            });
        }
    }

    Ok(RelevantIndexes {
        global_indexes,
        collections,
        reverse_reference,
    })
}

//! Hierarchical id traversal.
//!
//! Enumerates every record id under a target collection node, across every
//! concrete ancestor path that can contain one — the only way to walk a
//! subtree when no index exists to drive the scan (e.g. a full index
//! rebuild). Ancestor collections are read during construction to discover
//! the concrete paths; the target-level shards are read lazily, one batch
//! per call.
//!
//! Cursor state is an explicit list of leaf shard cursors plus an index
//! into it, so the traversal is inspectable and never re-runs I/O already
//! performed. The sequence is finite, depth-first deterministic for a
//! single invocation, and not restartable. There is no snapshot isolation:
//! ids inserted mid-traversal into an already-visited shard are missed, and
//! removals from a not-yet-visited shard are observed.

use tracing::debug;

use crate::allids::{get_all_ids_shard_names, read_shard_ids};
use crate::datastore::DataStore;
use crate::error::Result;
use crate::hierarchy::{query, Hierarchy};
use crate::keys::join_key;

/// One traversal step: the ids of a single shard, tagged with the concrete
/// collection they belong to. Batches may be empty.
#[derive(Debug, Clone, PartialEq)]
pub struct IdBatch {
    pub collection_key: String,
    pub ids: Vec<String>,
}

/// Per-collection-instance shard cursor: the leaf unit of the traversal.
#[derive(Debug)]
struct ShardLeaf {
    collection_key: String,
    shard_keys: Vec<String>,
    next_shard: usize,
}

/// Pull-based cursor over every id batch under a target collection node.
/// Obtained from [`get_all_ids_iterator`].
pub struct HierarchicalIdIterator<'a> {
    store: &'a dyn DataStore,
    leaves: Vec<ShardLeaf>,
    current_leaf: usize,
}

impl<'a> HierarchicalIdIterator<'a> {
    /// Advance one shard: returns the next batch, or `None` once every
    /// shard of every leaf has been visited exactly once.
    pub async fn next_batch(&mut self) -> Result<Option<IdBatch>> {
        while self.current_leaf < self.leaves.len() {
            let leaf = &mut self.leaves[self.current_leaf];
            if leaf.next_shard == leaf.shard_keys.len() {
                self.current_leaf += 1;
                continue;
            }
            let shard_key = leaf.shard_keys[leaf.next_shard].clone();
            leaf.next_shard += 1;

            let ids = read_shard_ids(self.store, &shard_key).await?;
            return Ok(Some(IdBatch {
                collection_key: leaf.collection_key.clone(),
                ids,
            }));
        }
        Ok(None)
    }

    /// Drain the remaining batches into one list.
    pub async fn collect_batches(mut self) -> Result<Vec<IdBatch>> {
        let mut batches = Vec::new();
        while let Some(batch) = self.next_batch().await? {
            batches.push(batch);
        }
        Ok(batches)
    }
}

/// Build the traversal for a target collection, addressed by concrete
/// instance key or schema node key.
///
/// Walks the ancestor collection chain shallow-to-deep: at each level above
/// the target, every shard of the concrete collection instance is read and
/// each id found opens a child scope `parentRecordKey/childCollectionName`;
/// at the target level a leaf shard cursor is emitted instead.
pub async fn get_all_ids_iterator<'a>(
    hierarchy: &Hierarchy,
    store: &'a dyn DataStore,
    collection_key_or_node_key: &str,
) -> Result<HierarchicalIdIterator<'a>> {
    let target = query::collection_node_by_key_or_node_key(hierarchy, collection_key_or_node_key)?;
    let ancestors = query::ancestor_collections(hierarchy, target);

    // Depth-first over concrete scopes. The stack is LIFO, so child scopes
    // are pushed in reverse to visit ids in their stored order.
    struct Scope {
        parent_record_key: String,
        level: usize,
    }

    let mut leaves: Vec<ShardLeaf> = Vec::new();
    let mut stack = vec![Scope {
        parent_record_key: String::new(),
        level: 0,
    }];

    while let Some(scope) = stack.pop() {
        let node = ancestors[scope.level];
        let collection_key = join_key([scope.parent_record_key.as_str(), node.name.as_str()]);
        let shard_keys = get_all_ids_shard_names(hierarchy, &collection_key)?;

        if scope.level == ancestors.len() - 1 {
            leaves.push(ShardLeaf {
                collection_key,
                shard_keys,
                next_shard: 0,
            });
            continue;
        }

        let mut ids = Vec::new();
        for shard_key in &shard_keys {
            ids.extend(read_shard_ids(store, shard_key).await?);
        }
        for id in ids.iter().rev() {
            stack.push(Scope {
                parent_record_key: join_key([collection_key.as_str(), id.as_str()]),
                level: scope.level + 1,
            });
        }
    }

    debug!(
        target = %target.node_key,
        leaves = leaves.len(),
        "built hierarchical id traversal"
    );
    Ok(HierarchicalIdIterator {
        store,
        leaves,
        current_leaf: 0,
    })
}

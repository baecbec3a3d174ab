//! Structural initialisation.
//!
//! Keeps a collection's on-disk shape consistent with its schema before
//! first use: the collection folder, the `allids` shard folders (one per
//! child record type), and the backing file of every attached index.
//!
//! Folder creation happens once, guarded by an existence check — a
//! populated collection is never re-created. Index files are re-checked on
//! every pass, so repeated calls during schema evolution are cheap and
//! safe.

use tracing::debug;

use crate::allids::ALLIDS_FOLDER;
use crate::datastore::DataStore;
use crate::error::Result;
use crate::hierarchy::{query, CollectionNode, Hierarchy, IndexNode};
use crate::index_file::{create_index_file, get_shard_map_key, get_unsharded_index_data_key};
use crate::keys::join_key;

/// Ensure an index's folder and backing file exist under `parent_key`.
/// Idempotent: existing files are left alone.
pub async fn initialise_index(
    hierarchy: &Hierarchy,
    store: &dyn DataStore,
    parent_key: &str,
    index: &IndexNode,
) -> Result<()> {
    let index_key = join_key([parent_key, index.name.as_str()]);
    store.create_folder(&index_key).await?;

    if index.sharded {
        let marker_key = get_shard_map_key(&index_key);
        if !store.exists(&marker_key).await? {
            store.create_file(&marker_key, "").await?;
        }
    } else {
        let data_key = get_unsharded_index_data_key(&index_key);
        if !store.exists(&data_key).await? {
            create_index_file(hierarchy, store, &data_key, index).await?;
        }
    }
    Ok(())
}

/// One-time folder layout for a collection instance, then an always-run
/// pass over its attached indexes.
async fn ensure_collection_is_initialised(
    hierarchy: &Hierarchy,
    store: &dyn DataStore,
    node: &CollectionNode,
    parent_key: &str,
) -> Result<()> {
    if !store.exists(parent_key).await? {
        debug!(collection = %parent_key, "creating collection layout");
        store.create_folder(parent_key).await?;
        store
            .create_folder(&join_key([parent_key, ALLIDS_FOLDER]))
            .await?;
        for child in &node.children {
            store
                .create_folder(&join_key([
                    parent_key,
                    ALLIDS_FOLDER,
                    child.node_id.to_string().as_str(),
                ]))
                .await?;
        }
    }

    for index in &node.indexes {
        initialise_index(hierarchy, store, parent_key, index).await?;
    }
    Ok(())
}

/// App bootstrap: initialise every collection that has no record-node
/// ancestor (i.e. the top-level collections) and every root-level global
/// index, each exactly once.
pub async fn initialise_all(hierarchy: &Hierarchy, store: &dyn DataStore) -> Result<()> {
    for collection in &hierarchy.root.collections {
        ensure_collection_is_initialised(hierarchy, store, collection, &collection.node_key)
            .await?;
    }
    for index in &hierarchy.root.indexes {
        initialise_index(hierarchy, store, "", index).await?;
    }
    Ok(())
}

/// Initialise the child collections of a freshly saved record, under
/// `recordKey/childCollectionName`.
pub async fn initialise_child_collections(
    hierarchy: &Hierarchy,
    store: &dyn DataStore,
    record_key: &str,
) -> Result<()> {
    let record_node = query::record_node_for_key(hierarchy, record_key)?;
    for child in &record_node.children {
        ensure_collection_is_initialised(
            hierarchy,
            store,
            child,
            &join_key([record_key, child.name.as_str()]),
        )
        .await?;
    }
    Ok(())
}

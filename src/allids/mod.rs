//! Id shard storage.
//!
//! Every collection keeps the ids of its member records in shard files
//! under `<collectionKey>/allids/<childNodeId>/<bucketId>`: one folder per
//! child record type, one comma-delimited UTF-8 blob per alphabet bucket.
//! Shards are created lazily on first insert and mutated by whole-blob
//! rewrite, so a single shard mutation is atomic but concurrent writers to
//! the same shard race last-writer-wins. Writers are assumed sequential
//! within a request pipeline; this layer is not lock-protected.

pub mod sharding;

use tracing::debug;

use crate::datastore::DataStore;
use crate::error::{Result, StoreError};
use crate::hierarchy::{query, Hierarchy};
use crate::keys::{join_key, parent_key};
use crate::record::{discriminator, shard_char, Record};

use sharding::{bucket_for, shard_buckets};

/// Subfolder of a collection holding its id shards.
pub const ALLIDS_FOLDER: &str = "allids";

/// Datastore key of the shard that stores (or would store) `record_id`
/// within the given collection.
pub fn get_all_ids_shard_key(
    hierarchy: &Hierarchy,
    collection_key: &str,
    record_id: &str,
) -> Result<String> {
    let collection = query::node_for_collection_path(hierarchy, collection_key)?;
    let disc = discriminator(record_id)?;
    let leading = shard_char(record_id)?;
    let bucket = bucket_for(collection.allids_shard_factor, leading)?;
    Ok(join_key([collection_key, ALLIDS_FOLDER, disc, bucket.as_str()]))
}

/// Every shard key of a collection: one per (child record type × bucket),
/// children in declaration order, buckets in alphabet order.
pub fn get_all_ids_shard_names(
    hierarchy: &Hierarchy,
    collection_key: &str,
) -> Result<Vec<String>> {
    let collection = query::node_for_collection_path(hierarchy, collection_key)?;
    let buckets = shard_buckets(collection.allids_shard_factor)?;

    let mut keys = Vec::with_capacity(collection.children.len() * buckets.len());
    for child in &collection.children {
        let child_id = child.node_id.to_string();
        for bucket in &buckets {
            keys.push(join_key([
                collection_key,
                ALLIDS_FOLDER,
                child_id.as_str(),
                bucket.as_str(),
            ]));
        }
    }
    Ok(keys)
}

/// Append a record's id to its shard, creating the shard on first use.
/// No dedup: adding the same id twice stores it twice — dedup is the
/// caller's responsibility.
pub async fn add_to_all_ids(
    hierarchy: &Hierarchy,
    store: &dyn DataStore,
    record: &Record,
) -> Result<()> {
    let shard_key = get_all_ids_shard_key(hierarchy, &parent_key(&record.key), &record.id)?;
    let mut blob = get_or_create_shard(store, &shard_key).await?;

    if !blob.is_empty() {
        blob.push(',');
    }
    blob.push_str(&record.id);

    debug!(shard = %shard_key, id = %record.id, "adding id to shard");
    store.update_file(&shard_key, &blob).await
}

/// Remove a record's id from its shard by value. Removing from a shard
/// that does not exist, or an id that was never inserted, is a no-op.
pub async fn remove_from_all_ids(
    hierarchy: &Hierarchy,
    store: &dyn DataStore,
    record: &Record,
) -> Result<()> {
    let shard_key = get_all_ids_shard_key(hierarchy, &parent_key(&record.key), &record.id)?;

    let blob = match store.load_file(&shard_key).await {
        Ok(blob) => blob,
        Err(e) if e.is_not_found() => return Ok(()),
        Err(e) => return Err(e),
    };

    let remaining: Vec<String> = parse_ids(&blob)
        .into_iter()
        .filter(|id| id != &record.id)
        .collect();

    debug!(shard = %shard_key, id = %record.id, "removing id from shard");
    store.update_file(&shard_key, &remaining.join(",")).await
}

/// All ids in a shard, in append order. An absent shard reads as empty.
pub async fn read_shard_ids(store: &dyn DataStore, shard_key: &str) -> Result<Vec<String>> {
    match store.load_file(shard_key).await {
        Ok(blob) => Ok(parse_ids(&blob)),
        Err(e) if e.is_not_found() => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}

/// Parse the comma-delimited blob. The final token is included whether or
/// not a trailing delimiter is present; empty tokens are skipped, so an
/// empty blob yields no ids.
fn parse_ids(blob: &str) -> Vec<String> {
    blob.split(',')
        .filter(|id| !id.is_empty())
        .map(|id| id.to_string())
        .collect()
}

/// Load a shard blob, falling back to creating the shard empty. If both
/// the load and the create fail, the error reports both causes — callers
/// must not mistake an unreachable shard for an empty collection.
async fn get_or_create_shard(store: &dyn DataStore, shard_key: &str) -> Result<String> {
    let load_err = match store.load_file(shard_key).await {
        Ok(blob) => return Ok(blob),
        Err(e) => e,
    };
    match store.create_file(shard_key, "").await {
        Ok(()) => {
            debug!(shard = %shard_key, "created id shard");
            Ok(String::new())
        }
        Err(create_err) => Err(StoreError::ShardUnavailable {
            key: shard_key.to_string(),
            load: Box::new(load_err),
            create: Box::new(create_err),
        }),
    }
}

//! hierdb — hierarchical document store engine.
//!
//! Application data is a tree of typed nodes (collections, records,
//! indexes) persisted through an abstract key/folder datastore. This crate
//! is the indexing and sharding core of that store:
//!
//! - `allids` shards each collection's member-id list across fixed
//!   alphabet buckets and mutates it by whole-blob rewrite;
//! - `iterate` walks every id under a subtree depth-first, the scan used
//!   for full index rebuilds;
//! - `relevant` decides which indexes (global / ancestor-collection /
//!   reverse-reference) must observe a given record;
//! - `initialise` lays a collection's folders, id shards, and index files
//!   out idempotently;
//! - `lock` + `gate` protect shared versioned documents with a named lock
//!   plus an optimistic version check.

pub mod access;
pub mod allids;
pub mod datastore;
pub mod error;
pub mod gate;
pub mod hierarchy;
pub mod index_file;
pub mod initialise;
pub mod iterate;
pub mod keys;
pub mod lock;
pub mod record;
pub mod relevant;

pub use error::{Result, StoreError};

pub use allids::{
    add_to_all_ids, get_all_ids_shard_key, get_all_ids_shard_names, read_shard_ids,
    remove_from_all_ids,
};
pub use datastore::{DataStore, LocalDataStore, MemoryDataStore};
pub use gate::{load_versioned, update_versioned, Versioned};
pub use hierarchy::{
    CollectionNode, FieldNode, FieldType, Hierarchy, IndexNode, IndexType, NodeRef, RecordNode,
    RootNode,
};
pub use initialise::{initialise_all, initialise_child_collections, initialise_index};
pub use iterate::{get_all_ids_iterator, HierarchicalIdIterator, IdBatch};
pub use lock::{get_lock, release_lock, Lock, LockOptions};
pub use record::Record;
pub use relevant::{get_relevant_indexes, IndexAndPath, RelevantIndexes};

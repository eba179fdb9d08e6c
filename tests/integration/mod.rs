//! Integration tests for the ensorbi knowledge graph

mod layout_properties;
mod reconstruct;
mod scope_session;
mod store_transaction;

use ensorbi::address::WellKnownHashes;
use ensorbi::store::{FsPersistence, NodeStore, StorageLayout};
use tempfile::TempDir;

pub const TODAY: &str = "2024-05-06";

/// On-disk store rooted in a fresh temp directory with a pinned date
pub fn open_store() -> (NodeStore, TempDir) {
    let dir = TempDir::new().unwrap();
    let store = reopen_store(&dir);
    (store, dir)
}

/// A second store over the same files, with an empty cache
pub fn reopen_store(dir: &TempDir) -> NodeStore {
    let layout = StorageLayout::new(dir.path().join("storage"));
    NodeStore::new(FsPersistence::new(layout), WellKnownHashes::compute()).with_today(TODAY)
}

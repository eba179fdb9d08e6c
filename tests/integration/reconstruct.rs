use ensorbi::address::content_hash;
use ensorbi::store::{NodePersistence, NodeStore};

use crate::{open_store, reopen_store};

fn snapshot(store: &NodeStore) -> Vec<(String, String)> {
    store.clear();
    store.fetch_all().unwrap();
    store
        .to_array()
        .into_iter()
        .map(|n| (n.hash, serde_json::to_string(&n.referers).unwrap()))
        .collect()
}

#[test]
fn reconstruct_restores_wiped_backlinks() {
    let (store, dir) = open_store();
    store.ensure_well_known_tags().unwrap();
    store.register_tag_meta("x").unwrap();
    store.register_tag_meta("y").unwrap();
    let mut x = store.fetch(&content_hash("x")).unwrap();
    x.link(&content_hash("y"), "see-also", 1);
    store.update_node(&x).unwrap();
    let expected = snapshot(&store);

    // wipe every backlink behind the store's back
    for hash in store.persistence().list_all_node_files().unwrap() {
        let mut node = store.fetch(&hash).unwrap();
        node.referers.clear();
        store.register(&node).unwrap();
    }

    let fresh = reopen_store(&dir);
    fresh.reconstruct_referrers().unwrap();
    assert_eq!(snapshot(&fresh), expected);
}

#[test]
fn reconstruct_is_idempotent() {
    let (store, _dir) = open_store();
    store.ensure_well_known_tags().unwrap();
    store.register_symbol("s", "").unwrap();
    store.reconstruct_referrers().unwrap();
    let first = snapshot(&store);
    store.reconstruct_referrers().unwrap();
    assert_eq!(snapshot(&store), first);
}

#[test]
fn migrate_rewrites_every_document() {
    let (store, _dir) = open_store();
    store.ensure_well_known_tags().unwrap();
    let files = store.persistence().list_all_node_files().unwrap().len();
    assert_eq!(store.migrate_meta_files().unwrap(), files);
}

use ensorbi::address::{content_hash, WellKnownHashes};
use ensorbi::node::Node;
use ensorbi::types::REFERER_LABEL;

use crate::{open_store, reopen_store, TODAY};

/// Every outgoing edge of every stored node has a matching backlink.
fn assert_backlinks_consistent(store: &ensorbi::store::NodeStore) {
    store.fetch_all().unwrap();
    for node in store.to_array() {
        for target in node.vector.keys() {
            if target == &node.hash {
                continue;
            }
            let Some(target) = store.fetch(target) else {
                continue;
            };
            assert_eq!(
                target.referers.get(&node.hash).and_then(|l| l.get(REFERER_LABEL)),
                Some(&1),
                "{} -> {} has no backlink",
                node.title,
                target.title
            );
        }
    }
}

#[test]
fn symbol_linked_to_tag_is_backlinked_on_disk() {
    let (store, dir) = open_store();
    store.register_tag_meta("reading").unwrap();
    let changed = store.register_symbol("Dune", "novel").unwrap();
    let symbol = changed
        .values()
        .find(|n| n.title == "Dune")
        .cloned()
        .unwrap();

    let mut edited = symbol.clone();
    edited.link(&content_hash("reading"), "tag", 1);
    store.update_node(&edited).unwrap();

    let fresh = reopen_store(&dir);
    let tag = fresh.fetch(&content_hash("reading")).unwrap();
    assert_eq!(tag.referers[&symbol.hash][REFERER_LABEL], 1);
    assert_backlinks_consistent(&fresh);
}

#[test]
fn first_write_of_the_day_creates_the_daily_tag() {
    let (store, _dir) = open_store();
    let changed = store.register_tag_meta("topic").unwrap();

    let day = WellKnownHashes::day(TODAY);
    let daily = changed.get(&day).expect("daily tag written");
    assert_eq!(daily.title, TODAY);
    assert!(daily.referers.contains_key(&content_hash("topic")));
    assert_backlinks_consistent(&store);
}

#[test]
fn registering_a_tag_twice_keeps_one_document() {
    let (store, _dir) = open_store();
    store.register_tag_meta("music").unwrap();
    store.register_tag_meta("music").unwrap();

    store.clear();
    store.fetch_all().unwrap();
    let music: Vec<Node> = store.filter(|n| n.title == "music");
    assert_eq!(music.len(), 1);
    assert_eq!(music[0].hash, content_hash("music"));
}

#[test]
fn dropping_an_edge_drops_the_backlink() {
    let (store, dir) = open_store();
    store.register_tag_meta("a").unwrap();
    store.register_tag_meta("b").unwrap();
    let (a, b) = (content_hash("a"), content_hash("b"));

    let mut node = store.fetch(&a).unwrap();
    node.link(&b, "rel", 1);
    store.update_node(&node).unwrap();
    node.vector.remove(&b);
    store.update_node(&node).unwrap();

    let fresh = reopen_store(&dir);
    assert!(!fresh.fetch(&b).unwrap().referers.contains_key(&a));
}

#[test]
fn blob_payload_and_companion_are_written() {
    let (store, dir) = open_store();
    let wk = store.well_known().clone();
    let payload = b"\x89PNG fake image";
    let meta = Node::blob(payload, "cat.png", ".png", "image/png", &wk, TODAY);
    let hash = meta.hash.clone();
    store.register_blob_meta(payload, meta).unwrap();

    let fresh = reopen_store(&dir);
    assert_eq!(fresh.read_payload(&hash).unwrap().as_deref(), Some(&payload[..]));
    assert!(fresh.fetch(&hash).unwrap().vector.contains_key(&wk.blob));

    let org = fresh.persistence().layout().org_path(&hash);
    let document = std::fs::read_to_string(org).unwrap();
    assert!(document.starts_with("#+TITLE:cat.png"));
}

#[test]
fn empty_payload_is_rejected() {
    let (store, _dir) = open_store();
    let wk = store.well_known().clone();
    let meta = Node::blob(b"", "empty", ".txt", "text/plain", &wk, TODAY);
    assert!(store.register_blob_meta(b"", meta).is_err());
}

#[test]
fn removed_node_is_gone_after_reopen() {
    let (store, dir) = open_store();
    store.register_tag_meta("temp").unwrap();
    assert!(store.remove(&content_hash("temp")).unwrap());
    assert!(!store.remove(&content_hash("temp")).unwrap());
    assert!(reopen_store(&dir).fetch(&content_hash("temp")).is_none());
}

#[test]
fn path_like_hash_stays_inside_the_store() {
    let (store, dir) = open_store();
    let wk = store.well_known().clone();
    let mut node = Node::tag("escape", &wk, TODAY);
    node.hash = "../../../escaped".to_string();

    assert!(store.change_vector_transaction(&node).is_err());
    assert!(store.fetch(&node.hash).is_none());
    assert!(!dir.path().join("escaped.json").exists());
    assert!(!dir.path().join("storage").exists());
}

#[test]
fn referers_of_a_new_node_come_from_the_graph_only() {
    let (store, dir) = open_store();
    let wk = store.well_known().clone();
    let mut fresh = Node::tag("fresh", &wk, TODAY);
    let bogus = content_hash("bogus");
    fresh
        .referers
        .insert(bogus.clone(), ensorbi::types::single_label(REFERER_LABEL));
    store.change_vector_transaction(&fresh).unwrap();

    let reloaded = reopen_store(&dir).fetch(&fresh.hash).unwrap();
    assert!(!reloaded.referers.contains_key(&bogus));
    assert_backlinks_consistent(&reopen_store(&dir));
}

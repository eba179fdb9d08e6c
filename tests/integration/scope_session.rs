use ensorbi::address::content_hash;
use ensorbi::layout::LayoutParams;
use ensorbi::scope::{GraphEvent, HeadlessCanvas, ScopeManager, ScopeState};
use ensorbi::store::NodeStore;

use crate::open_store;

/// a -> b, a -> c, all three tags
fn seed_graph(store: &NodeStore) -> (String, String, String) {
    for title in ["a", "b", "c"] {
        store.register_tag_meta(title).unwrap();
    }
    let (a, b, c) = (content_hash("a"), content_hash("b"), content_hash("c"));
    let mut node = store.fetch(&a).unwrap();
    node.link(&b, "rel", 1);
    node.link(&c, "rel", 1);
    store.update_node(&node).unwrap();
    (a, b, c)
}

fn still() -> LayoutParams {
    LayoutParams {
        repulsion: 0.0,
        spring: 0.0,
        ..LayoutParams::default()
    }
}

#[test]
fn scope_holds_the_one_hop_neighbourhood() {
    let (store, _dir) = open_store();
    store.ensure_well_known_tags().unwrap();
    let (a, b, c) = seed_graph(&store);
    let hidden = store.well_known().node.clone();

    let mut manager = ScopeManager::new(
        &store,
        Some(HeadlessCanvas::new(640.0, 480.0)),
        hidden.clone(),
        LayoutParams::default(),
    )
    .with_seed(11);
    assert!(manager.restart(&a));

    let session = manager.current().session().unwrap();
    let nodes = session.nodes();
    assert!(nodes.contains_key(&b) && nodes.contains_key(&c));
    assert!(!nodes.contains_key(&hidden));
    assert!(!nodes[&a].movable);
    assert_eq!((nodes[&a].x, nodes[&a].y), (320.0, 240.0));

    let canvas = manager.render().unwrap();
    assert_eq!(canvas.node_count(), nodes.len());
    assert!(canvas.edge_count() >= 2);
}

#[test]
fn dragged_position_survives_reload() {
    let (store, _dir) = open_store();
    let (a, b, _) = seed_graph(&store);
    let mut manager = ScopeManager::new(
        &store,
        Some(HeadlessCanvas::new(640.0, 480.0)),
        store.well_known().node.clone(),
        still(),
    )
    .with_seed(2);
    manager.restart(&a);

    assert!(manager.render_mut().unwrap().drag(&b, 10.0, 20.0));
    manager.update();
    manager.current_scope_reload();

    let session = manager.current().session().unwrap();
    assert_eq!((session.nodes()[&b].x, session.nodes()[&b].y), (10.0, 20.0));
    assert_eq!(manager.render().unwrap().position_of(&b), Some((10.0, 20.0)));
    assert_eq!(session.state(), ScopeState::Idle);
}

#[test]
fn layout_keeps_every_position_finite() {
    let (store, _dir) = open_store();
    let (a, _, _) = seed_graph(&store);
    let mut manager = ScopeManager::new(
        &store,
        Some(HeadlessCanvas::new(800.0, 600.0)),
        store.well_known().node.clone(),
        LayoutParams::default(),
    )
    .with_seed(9);
    manager.restart(&a);
    for _ in 0..200 {
        manager.update();
    }
    let session = manager.current().session().unwrap();
    assert!(session.nodes().values().all(|n| n.is_finite()));
    assert_eq!(session.nodes()[&a].x, 400.0);
}

#[test]
fn double_click_moves_the_scope() {
    let (store, _dir) = open_store();
    let (a, b, _) = seed_graph(&store);
    let mut manager = ScopeManager::new(
        &store,
        Some(HeadlessCanvas::new(640.0, 480.0)),
        store.well_known().node.clone(),
        LayoutParams::default(),
    );
    manager.restart(&a);
    manager.handle_event(&GraphEvent::DoubleClicked(b.clone()));
    assert_eq!(manager.current_hash(), Some(b.as_str()));

    // b is reached through its backlink
    let session = manager.current().session().unwrap();
    assert!(session.nodes().contains_key(&a));
}

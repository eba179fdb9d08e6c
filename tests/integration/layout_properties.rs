use ensorbi::address::{content_hash, sharded_path};
use ensorbi::layout::{step, ForceNode, ForceNodeMap, LayoutParams};
use ensorbi::types::{single_label, EdgeMap};
use proptest::prelude::*;

fn force_node(hash: String, x: f64, y: f64, movable: bool) -> ForceNode {
    ForceNode {
        node_hash: hash.clone(),
        title: hash,
        thumbnail: String::new(),
        movable,
        x,
        y,
        vx: 0.0,
        vy: 0.0,
        links: EdgeMap::new(),
        referers: EdgeMap::new(),
    }
}

fn snapshot_strategy() -> impl Strategy<Value = ForceNodeMap> {
    prop::collection::vec(
        (-500.0f64..500.0, -500.0f64..500.0, any::<bool>(), 0usize..8),
        1..12,
    )
    .prop_map(|specs| {
        let count = specs.len();
        let mut nodes = ForceNodeMap::new();
        for (i, (x, y, movable, link)) in specs.into_iter().enumerate() {
            // snap to a coarse grid so coincident pairs actually occur
            let mut node = force_node(format!("n{}", i), (x / 50.0).round(), (y / 50.0).round(), movable);
            node.links
                .insert(format!("n{}", link % count), single_label("rel"));
            nodes.insert(node.node_hash.clone(), node);
        }
        nodes
    })
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

    #[test]
    fn steps_stay_finite(nodes in snapshot_strategy(), steps in 1usize..20) {
        let params = LayoutParams::default();
        let mut current = nodes.clone();
        for _ in 0..steps {
            current = step(&current, &params);
        }
        prop_assert!(current.values().all(ForceNode::is_finite));
        for (hash, node) in &nodes {
            if !node.movable {
                prop_assert_eq!((current[hash].x, current[hash].y), (node.x, node.y));
            }
        }
    }

    #[test]
    fn hashing_is_deterministic(data in prop::collection::vec(any::<u8>(), 0..256), depth in 1usize..8) {
        let first = content_hash(&data);
        prop_assert_eq!(&first, &content_hash(&data));
        prop_assert_eq!(first.len(), 64);
        let segments = sharded_path(&first, depth);
        prop_assert_eq!(segments.len(), depth);
        for (i, segment) in segments.iter().enumerate() {
            prop_assert_eq!(segment.as_str(), &first[..i + 1]);
        }
    }
}

//! A single scope view: neighbourhood gathering, layout ticks and drawing.

use super::{GraphEvent, GraphHandle, NodeHandle, NodeSource, RenderGraph, NODE_RADIUS};
use crate::layout::{node_to_force_node, step, ForceNodeMap, LayoutParams};
use crate::node::{node_edges, Node};
use crate::types::Hash;
use rand::rngs::StdRng;
use rand::Rng;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// What a scope is centred on
#[derive(Debug, Clone, PartialEq)]
pub enum ScopeAnchor {
    /// A stored node and its one-hop neighbourhood
    Node(Node),
    /// A client-side query node and the nodes it matched
    Query { query: Node, results: Vec<Node> },
}

impl ScopeAnchor {
    pub fn focal(&self) -> &Node {
        match self {
            ScopeAnchor::Node(node) => node,
            ScopeAnchor::Query { query, .. } => query,
        }
    }
}

/// Guard against overlapping layout passes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeState {
    Idle,
    Rebuilding,
    Updating,
}

/// Request produced by an interaction event
#[derive(Debug, Clone, PartialEq)]
pub enum ScopeAction {
    /// Show this node's details
    Select(Node),
    /// Make this hash the focal node of a new scope
    Navigate(Hash),
}

/// One active scope view
pub struct ScopeSession {
    anchor: ScopeAnchor,
    nodes: ForceNodeMap,
    graph_nodes: BTreeMap<Hash, NodeHandle>,
    graph: Option<GraphHandle>,
    state: ScopeState,
    params: LayoutParams,
    /// Never placed in a scope
    hidden: Hash,
    rng: StdRng,
}

impl ScopeSession {
    /// Create a session; the focal node starts at the canvas centre.
    pub fn new(
        anchor: ScopeAnchor,
        hidden: Hash,
        params: LayoutParams,
        canvas_size: Option<(f64, f64)>,
        rng: StdRng,
    ) -> Self {
        let mut nodes = ForceNodeMap::new();
        let focal = anchor.focal();
        if focal.hash != hidden {
            let mut force = node_to_force_node(focal);
            if let Some((width, height)) = canvas_size {
                force.x = width / 2.0;
                force.y = height / 2.0;
            }
            nodes.insert(focal.hash.clone(), force);
        }

        Self {
            anchor,
            nodes,
            graph_nodes: BTreeMap::new(),
            graph: None,
            state: ScopeState::Idle,
            params,
            hidden,
            rng,
        }
    }

    pub fn anchor(&self) -> &ScopeAnchor {
        &self.anchor
    }

    pub fn focal_hash(&self) -> &str {
        &self.anchor.focal().hash
    }

    pub fn nodes(&self) -> &ForceNodeMap {
        &self.nodes
    }

    pub fn state(&self) -> ScopeState {
        self.state
    }

    pub fn graph(&self) -> Option<GraphHandle> {
        self.graph
    }

    /// Gather the neighbourhood and rebuild the visual graph.
    pub fn reset<S, R>(&mut self, source: &S, render: &mut R)
    where
        S: NodeSource + ?Sized,
        R: RenderGraph + ?Sized,
    {
        let Some(canvas_size) = render.canvas_size() else {
            warn!("No canvas available; scope {} not built", self.focal_hash());
            return;
        };

        let mut gathered = ForceNodeMap::new();
        let focal = self.anchor.focal();
        if focal.hash != self.hidden {
            let mut criteria = node_to_force_node(focal);
            criteria.movable = false;
            gathered.insert(focal.hash.clone(), criteria);
        }

        match &self.anchor {
            ScopeAnchor::Node(target) => {
                for (hash, _) in node_edges(target) {
                    let Some(neighbor) = source.fetch_node(&hash) else {
                        debug!("Neighbor {} of {} not available", hash, target.hash);
                        continue;
                    };
                    if neighbor.hash != self.hidden {
                        gathered.insert(neighbor.hash.clone(), node_to_force_node(&neighbor));
                    }
                }
            }
            ScopeAnchor::Query { query, results } => {
                for result in results {
                    if result.hash != query.hash && result.hash != self.hidden {
                        gathered.insert(result.hash.clone(), node_to_force_node(result));
                    }
                }
            }
        }

        let graph = match self.graph {
            Some(graph) => graph,
            None => {
                let graph = render.create_graph();
                render.attach_interaction(graph);
                self.graph = Some(graph);
                graph
            }
        };
        self.rebuild_graph(graph, gathered, canvas_size, render);
    }

    /// Replace the visual graph, carrying positions over by hash.
    fn rebuild_graph<R>(
        &mut self,
        graph: GraphHandle,
        mut gathered: ForceNodeMap,
        (width, height): (f64, f64),
        render: &mut R,
    ) where
        R: RenderGraph + ?Sized,
    {
        self.state = ScopeState::Rebuilding;

        render.clear(graph);
        self.graph_nodes.clear();

        for (hash, force) in gathered.iter_mut() {
            match self.nodes.get(hash) {
                Some(previous) => {
                    force.x = previous.x;
                    force.y = previous.y;
                }
                None => {
                    force.x = self.rng.gen_range(0.0..width.max(1.0));
                    force.y = self.rng.gen_range(0.0..height.max(1.0));
                }
            }

            let Some(handle) = render.add_node(graph, force.x, force.y, NODE_RADIUS, hash) else {
                warn!("Render graph refused node {}", hash);
                continue;
            };
            if force.thumbnail.is_empty() {
                render.set_node_text(handle, &force.title);
            } else {
                render.set_node_image(handle, &force.thumbnail);
            }
            self.graph_nodes.insert(hash.clone(), handle);
        }

        for (hash, force) in &gathered {
            let Some(&from) = self.graph_nodes.get(hash) else {
                continue;
            };
            for (target, labels) in &force.links {
                if target == hash {
                    continue;
                }
                let Some(&to) = self.graph_nodes.get(target) else {
                    continue;
                };
                for _ in labels {
                    render.connect(from, to, "");
                }
            }
        }

        debug!(
            "Rebuilt scope {} with {} nodes",
            self.focal_hash(),
            gathered.len()
        );
        self.nodes = gathered;
        self.state = ScopeState::Idle;
    }

    /// Run one layout step and push positions to the render graph.
    ///
    /// Dropped with a warning while a rebuild or a previous update is running.
    pub fn update<R>(&mut self, render: &mut R)
    where
        R: RenderGraph + ?Sized,
    {
        match self.state {
            ScopeState::Idle => {}
            ScopeState::Rebuilding => {
                debug!("Scope {} is rebuilding; update skipped", self.focal_hash());
                return;
            }
            ScopeState::Updating => {
                warn!("Previous layout pass of {} has not finished", self.focal_hash());
                return;
            }
        }
        self.state = ScopeState::Updating;

        for (hash, handle) in &self.graph_nodes {
            if let (Some(force), Some((x, y))) =
                (self.nodes.get_mut(hash), render.node_position(*handle))
            {
                force.x = x;
                force.y = y;
            }
        }

        self.nodes = step(&self.nodes, &self.params);

        for (hash, force) in &self.nodes {
            if let Some(handle) = self.graph_nodes.get(hash) {
                render.set_node_position(*handle, force.x, force.y);
            }
        }

        self.state = ScopeState::Idle;
    }

    pub fn draw<R>(&self, render: &mut R)
    where
        R: RenderGraph + ?Sized,
    {
        if let Some(graph) = self.graph {
            render.draw(graph);
        }
    }

    /// Stop receiving interaction events
    pub fn remove_dependency<R>(&self, render: &mut R)
    where
        R: RenderGraph + ?Sized,
    {
        if let Some(graph) = self.graph {
            render.detach_interaction(graph);
        }
    }

    /// Re-fetch the focal node and rebuild.
    pub fn reload<S, R>(&mut self, source: &S, render: &mut R)
    where
        S: NodeSource + ?Sized,
        R: RenderGraph + ?Sized,
    {
        if let ScopeAnchor::Node(target) = &mut self.anchor {
            if let Some(reloaded) = source.fetch_node(&target.hash) {
                *target = reloaded;
            }
        }
        self.reset(source, render);
    }

    /// Translate an interaction into a request for the manager.
    pub fn handle_event<S>(&self, event: &GraphEvent, source: &S) -> Option<ScopeAction>
    where
        S: NodeSource + ?Sized,
    {
        match event {
            GraphEvent::Activated(hash) => {
                if hash.is_empty() {
                    return None;
                }
                if let ScopeAnchor::Query { query, .. } = &self.anchor {
                    if &query.hash == hash {
                        return Some(ScopeAction::Select(query.clone()));
                    }
                }
                source.fetch_node(hash).map(ScopeAction::Select)
            }
            GraphEvent::Deactivated(_) => None,
            GraphEvent::DoubleClicked(hash) => {
                if hash.is_empty() {
                    None
                } else {
                    Some(ScopeAction::Navigate(hash.clone()))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::WellKnownHashes;
    use crate::scope::{FnSource, HeadlessCanvas};
    use rand::SeedableRng;
    use std::collections::HashMap;

    const TODAY: &str = "2024-02-03";

    struct Fixture {
        nodes: HashMap<Hash, Node>,
        focal: Node,
        neighbor: Node,
        well_known: WellKnownHashes,
    }

    fn fixture() -> Fixture {
        let wk = WellKnownHashes::compute();
        let neighbor = Node::tag("neighbor", &wk, TODAY);
        let mut focal = Node::tag("focal", &wk, TODAY);
        focal.link(&neighbor.hash, "rel", 1);
        let hub = Node::tag("node", &wk, TODAY);

        let mut nodes = HashMap::new();
        for node in [&neighbor, &focal, &hub] {
            nodes.insert(node.hash.clone(), node.clone());
        }
        Fixture {
            nodes,
            focal,
            neighbor,
            well_known: wk,
        }
    }

    fn session_for(fixture: &Fixture, canvas: &HeadlessCanvas) -> ScopeSession {
        ScopeSession::new(
            ScopeAnchor::Node(fixture.focal.clone()),
            fixture.well_known.node.clone(),
            LayoutParams::default(),
            canvas.canvas_size(),
            StdRng::seed_from_u64(11),
        )
    }

    #[test]
    fn test_reset_gathers_one_hop_without_hidden_hub() {
        let fx = fixture();
        let source = FnSource(|hash: &str| fx.nodes.get(hash).cloned());
        let mut canvas = HeadlessCanvas::new(800.0, 600.0);
        let mut session = session_for(&fx, &canvas);
        session.reset(&source, &mut canvas);

        assert!(session.nodes().contains_key(&fx.focal.hash));
        assert!(session.nodes().contains_key(&fx.neighbor.hash));
        assert!(!session.nodes().contains_key(&fx.well_known.node));
        assert!(!session.nodes()[&fx.focal.hash].movable);
        assert!(session.nodes()[&fx.neighbor.hash].movable);
        assert_eq!(session.nodes()[&fx.focal.hash].x, 400.0);
        assert_eq!(canvas.node_count(), 2);
        assert_eq!(canvas.edge_count(), 1);
        assert!(canvas.is_attached(session.graph().unwrap()));
    }

    #[test]
    fn test_reset_without_canvas_is_skipped() {
        let fx = fixture();
        let source = FnSource(|hash: &str| fx.nodes.get(hash).cloned());
        let mut canvas = HeadlessCanvas::without_canvas();
        let mut session = session_for(&fx, &canvas);
        session.reset(&source, &mut canvas);
        assert!(session.graph().is_none());
        assert_eq!(canvas.node_count(), 0);
    }

    #[test]
    fn test_update_while_rebuilding_is_noop() {
        let fx = fixture();
        let source = FnSource(|hash: &str| fx.nodes.get(hash).cloned());
        let mut canvas = HeadlessCanvas::new(800.0, 600.0);
        let mut session = session_for(&fx, &canvas);
        session.reset(&source, &mut canvas);

        let before = session.nodes().clone();
        session.state = ScopeState::Rebuilding;
        session.update(&mut canvas);
        assert_eq!(session.nodes(), &before);

        session.state = ScopeState::Updating;
        session.update(&mut canvas);
        assert_eq!(session.nodes(), &before);

        session.state = ScopeState::Idle;
        session.update(&mut canvas);
        assert_ne!(session.nodes(), &before);
    }

    #[test]
    fn test_update_picks_up_dragged_positions() {
        let fx = fixture();
        let source = FnSource(|hash: &str| fx.nodes.get(hash).cloned());
        let mut canvas = HeadlessCanvas::new(800.0, 600.0);
        let mut session = session_for(&fx, &canvas);
        session.reset(&source, &mut canvas);

        canvas.drag(&fx.focal.hash, 10.0, 20.0);
        session.update(&mut canvas);
        let focal = &session.nodes()[&fx.focal.hash];
        assert_eq!((focal.x, focal.y), (10.0, 20.0));
        assert_eq!(canvas.position_of(&fx.focal.hash), Some((10.0, 20.0)));
    }

    #[test]
    fn test_events_map_to_actions() {
        let fx = fixture();
        let source = FnSource(|hash: &str| fx.nodes.get(hash).cloned());
        let canvas = HeadlessCanvas::new(800.0, 600.0);
        let session = session_for(&fx, &canvas);

        let selected = session.handle_event(&GraphEvent::Activated(fx.neighbor.hash.clone()), &source);
        assert_eq!(selected, Some(ScopeAction::Select(fx.neighbor.clone())));
        assert_eq!(
            session.handle_event(&GraphEvent::Activated("missing".into()), &source),
            None
        );
        assert_eq!(
            session.handle_event(&GraphEvent::DoubleClicked("abc".into()), &source),
            Some(ScopeAction::Navigate("abc".into()))
        );
        assert_eq!(
            session.handle_event(&GraphEvent::Deactivated("abc".into()), &source),
            None
        );
    }

    #[test]
    fn test_query_scope_selects_query_without_fetching() {
        let fx = fixture();
        let source = FnSource(|_: &str| -> Option<Node> { None });
        let query = Node::temporary_query("q", "", &fx.well_known, TODAY);
        let mut canvas = HeadlessCanvas::new(400.0, 400.0);
        let mut session = ScopeSession::new(
            ScopeAnchor::Query {
                query: query.clone(),
                results: vec![fx.focal.clone(), fx.neighbor.clone()],
            },
            fx.well_known.node.clone(),
            LayoutParams::default(),
            canvas.canvas_size(),
            StdRng::seed_from_u64(3),
        );
        session.reset(&source, &mut canvas);

        assert_eq!(session.nodes().len(), 3);
        assert!(!session.nodes()[&query.hash].movable);
        assert_eq!(
            session.handle_event(&GraphEvent::Activated(query.hash.clone()), &source),
            Some(ScopeAction::Select(query))
        );
    }

    #[test]
    fn test_remove_dependency_detaches() {
        let fx = fixture();
        let source = FnSource(|hash: &str| fx.nodes.get(hash).cloned());
        let mut canvas = HeadlessCanvas::new(800.0, 600.0);
        let mut session = session_for(&fx, &canvas);
        session.reset(&source, &mut canvas);
        let graph = session.graph().unwrap();

        session.remove_dependency(&mut canvas);
        assert!(!canvas.is_attached(graph));
    }
}

//! In-memory render graph.
//!
//! Records what a scope asks to draw without touching any display. Used by the
//! command line `scope` command and by tests.

use super::{GraphHandle, NodeHandle, RenderGraph};
use std::collections::{BTreeMap, BTreeSet};

/// Text or image shown inside a drawn node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeFace {
    Blank,
    Text(String),
    Image(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessNode {
    pub graph: GraphHandle,
    pub hash: String,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub face: NodeFace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessEdge {
    pub from: NodeHandle,
    pub to: NodeHandle,
    pub label: String,
}

/// Render graph that keeps everything in memory
#[derive(Debug, Default)]
pub struct HeadlessCanvas {
    size: Option<(f64, f64)>,
    next_graph: u64,
    next_node: u64,
    nodes: BTreeMap<NodeHandle, HeadlessNode>,
    edges: Vec<HeadlessEdge>,
    attached: BTreeSet<GraphHandle>,
    draws: usize,
}

impl HeadlessCanvas {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            size: Some((width, height)),
            ..Self::default()
        }
    }

    /// A collaborator with no canvas to draw on
    pub fn without_canvas() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn draw_count(&self) -> usize {
        self.draws
    }

    pub fn is_attached(&self, graph: GraphHandle) -> bool {
        self.attached.contains(&graph)
    }

    pub fn attached_count(&self) -> usize {
        self.attached.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &HeadlessNode> {
        self.nodes.values()
    }

    pub fn edges(&self) -> &[HeadlessEdge] {
        &self.edges
    }

    fn handle_of(&self, hash: &str) -> Option<NodeHandle> {
        self.nodes
            .iter()
            .find(|(_, node)| node.hash == hash)
            .map(|(handle, _)| *handle)
    }

    pub fn position_of(&self, hash: &str) -> Option<(f64, f64)> {
        self.handle_of(hash)
            .and_then(|handle| self.node_position(handle))
    }

    pub fn face_of(&self, hash: &str) -> Option<&NodeFace> {
        self.handle_of(hash)
            .and_then(|handle| self.nodes.get(&handle))
            .map(|node| &node.face)
    }

    /// Move a node as a user drag would
    pub fn drag(&mut self, hash: &str, x: f64, y: f64) -> bool {
        match self.handle_of(hash) {
            Some(handle) => {
                self.set_node_position(handle, x, y);
                true
            }
            None => false,
        }
    }
}

impl RenderGraph for HeadlessCanvas {
    fn canvas_size(&self) -> Option<(f64, f64)> {
        self.size
    }

    fn create_graph(&mut self) -> GraphHandle {
        self.next_graph += 1;
        GraphHandle(self.next_graph)
    }

    fn attach_interaction(&mut self, graph: GraphHandle) {
        self.attached.insert(graph);
    }

    fn detach_interaction(&mut self, graph: GraphHandle) {
        self.attached.remove(&graph);
    }

    fn clear(&mut self, graph: GraphHandle) {
        let removed: BTreeSet<NodeHandle> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.graph == graph)
            .map(|(handle, _)| *handle)
            .collect();
        self.nodes.retain(|handle, _| !removed.contains(handle));
        self.edges
            .retain(|edge| !removed.contains(&edge.from) && !removed.contains(&edge.to));
    }

    fn add_node(
        &mut self,
        graph: GraphHandle,
        x: f64,
        y: f64,
        radius: f64,
        hash: &str,
    ) -> Option<NodeHandle> {
        self.next_node += 1;
        let handle = NodeHandle(self.next_node);
        self.nodes.insert(
            handle,
            HeadlessNode {
                graph,
                hash: hash.to_string(),
                x,
                y,
                radius,
                face: NodeFace::Blank,
            },
        );
        Some(handle)
    }

    fn set_node_image(&mut self, node: NodeHandle, src: &str) {
        if let Some(node) = self.nodes.get_mut(&node) {
            node.face = NodeFace::Image(src.to_string());
        }
    }

    fn set_node_text(&mut self, node: NodeHandle, text: &str) {
        if let Some(node) = self.nodes.get_mut(&node) {
            node.face = NodeFace::Text(text.to_string());
        }
    }

    fn connect(&mut self, from: NodeHandle, to: NodeHandle, label: &str) {
        self.edges.push(HeadlessEdge {
            from,
            to,
            label: label.to_string(),
        });
    }

    fn node_position(&self, node: NodeHandle) -> Option<(f64, f64)> {
        self.nodes.get(&node).map(|node| (node.x, node.y))
    }

    fn set_node_position(&mut self, node: NodeHandle, x: f64, y: f64) {
        if let Some(node) = self.nodes.get_mut(&node) {
            node.x = x;
            node.y = y;
        }
    }

    fn draw(&mut self, _graph: GraphHandle) {
        self.draws += 1;
    }
}

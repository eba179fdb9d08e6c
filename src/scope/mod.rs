//! Scope Graphs
//!
//! A scope is the one-hop neighbourhood around a focal node, laid out by the
//! force simulation and drawn through a [`RenderGraph`] collaborator. The
//! [`ScopeManager`] owns at most one active [`ScopeSession`] and swaps it when
//! the user navigates.

pub mod headless;
pub mod manager;
pub mod session;

use crate::node::Node;
use crate::store::persistence::NodePersistence;
use crate::store::NodeStore;
use crate::types::Hash;
use std::sync::Arc;

pub use headless::HeadlessCanvas;
pub use manager::{CurrentScope, ScopeManager};
pub use session::{ScopeAction, ScopeAnchor, ScopeSession, ScopeState};

/// Radius of every node drawn in a scope
pub const NODE_RADIUS: f64 = 40.0;

/// Identifier of a visual graph owned by a render collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GraphHandle(pub u64);

/// Identifier of a drawn node inside a visual graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeHandle(pub u64);

/// User interaction reported by the render collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphEvent {
    Activated(Hash),
    Deactivated(Hash),
    DoubleClicked(Hash),
}

/// Graph visualisation collaborator
pub trait RenderGraph {
    /// Canvas width and height, `None` when there is nothing to draw on
    fn canvas_size(&self) -> Option<(f64, f64)>;
    fn create_graph(&mut self) -> GraphHandle;
    /// Start delivering interaction events for `graph`
    fn attach_interaction(&mut self, graph: GraphHandle);
    fn detach_interaction(&mut self, graph: GraphHandle);
    fn clear(&mut self, graph: GraphHandle);
    fn add_node(
        &mut self,
        graph: GraphHandle,
        x: f64,
        y: f64,
        radius: f64,
        hash: &str,
    ) -> Option<NodeHandle>;
    fn set_node_image(&mut self, node: NodeHandle, src: &str);
    fn set_node_text(&mut self, node: NodeHandle, text: &str);
    fn connect(&mut self, from: NodeHandle, to: NodeHandle, label: &str);
    /// Current position, which may have been moved by the user
    fn node_position(&self, node: NodeHandle) -> Option<(f64, f64)>;
    fn set_node_position(&mut self, node: NodeHandle, x: f64, y: f64);
    fn draw(&mut self, graph: GraphHandle);
}

/// Where scopes fetch nodes from
pub trait NodeSource {
    fn fetch_node(&self, hash: &str) -> Option<Node>;
}

impl<P: NodePersistence> NodeSource for NodeStore<P> {
    fn fetch_node(&self, hash: &str) -> Option<Node> {
        self.fetch(hash)
    }
}

impl<T: NodeSource + ?Sized> NodeSource for Arc<T> {
    fn fetch_node(&self, hash: &str) -> Option<Node> {
        (**self).fetch_node(hash)
    }
}

impl<T: NodeSource + ?Sized> NodeSource for &T {
    fn fetch_node(&self, hash: &str) -> Option<Node> {
        (**self).fetch_node(hash)
    }
}

/// Adapts a closure into a [`NodeSource`]
pub struct FnSource<F>(pub F);

impl<F> NodeSource for FnSource<F>
where
    F: Fn(&str) -> Option<Node>,
{
    fn fetch_node(&self, hash: &str) -> Option<Node> {
        (self.0)(hash)
    }
}

//! Scope Manager
//!
//! Holds the single active scope and forwards per-frame calls to it. The only
//! way the active scope changes is [`ScopeManager::restart`] (or
//! [`ScopeManager::start_query`]); there is no back-stack.

use super::session::{ScopeAction, ScopeAnchor, ScopeSession};
use super::{GraphEvent, NodeSource, RenderGraph};
use crate::layout::LayoutParams;
use crate::node::Node;
use crate::types::Hash;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

/// The manager's current scope
pub enum CurrentScope {
    NoScope,
    Active(ScopeSession),
}

impl CurrentScope {
    pub fn session(&self) -> Option<&ScopeSession> {
        match self {
            CurrentScope::NoScope => None,
            CurrentScope::Active(session) => Some(session),
        }
    }
}

type SelectionCallback = Box<dyn FnMut(&Node)>;

/// Owner of the active scope session
pub struct ScopeManager<S: NodeSource, R: RenderGraph> {
    source: S,
    render: Option<R>,
    current: CurrentScope,
    params: LayoutParams,
    /// Hash kept out of every scope
    hidden: Hash,
    on_node_selected: SelectionCallback,
    rng: StdRng,
}

impl<S: NodeSource, R: RenderGraph> ScopeManager<S, R> {
    pub fn new(source: S, render: Option<R>, hidden: Hash, params: LayoutParams) -> Self {
        Self {
            source,
            render,
            current: CurrentScope::NoScope,
            params,
            hidden,
            on_node_selected: Box::new(|_| {}),
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic initial placement
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Called with the node the user activated in the graph
    pub fn on_node_selected<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&Node) + 'static,
    {
        self.on_node_selected = Box::new(callback);
        self
    }

    pub fn current(&self) -> &CurrentScope {
        &self.current
    }

    pub fn current_hash(&self) -> Option<&str> {
        self.current.session().map(ScopeSession::focal_hash)
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn render(&self) -> Option<&R> {
        self.render.as_ref()
    }

    pub fn render_mut(&mut self) -> Option<&mut R> {
        self.render.as_mut()
    }

    /// Make `hash` the focal node of a fresh scope.
    ///
    /// Returns false, leaving the current scope in place, when the node
    /// cannot be fetched or there is no render collaborator.
    pub fn restart(&mut self, hash: &str) -> bool {
        let Some(node) = self.source.fetch_node(hash) else {
            warn!("Could not fetch node {}; scope unchanged", hash);
            return false;
        };
        self.install(ScopeAnchor::Node(node))
    }

    /// Show a temporary query node surrounded by its results.
    pub fn start_query(&mut self, query: Node, results: Vec<Node>) -> bool {
        self.install(ScopeAnchor::Query { query, results })
    }

    fn install(&mut self, anchor: ScopeAnchor) -> bool {
        let Some(render) = self.render.as_mut() else {
            warn!("No render graph injected; scope not started");
            return false;
        };

        if let CurrentScope::Active(previous) = &self.current {
            previous.remove_dependency(render);
            if let Some(graph) = previous.graph() {
                render.clear(graph);
            }
        }

        let rng = StdRng::seed_from_u64(self.rng.gen());
        let mut session = ScopeSession::new(
            anchor,
            self.hidden.clone(),
            self.params,
            render.canvas_size(),
            rng,
        );
        session.reset(&self.source, render);
        info!("Scope moved to {}", session.focal_hash());
        self.current = CurrentScope::Active(session);
        true
    }

    pub fn update(&mut self) {
        if let (CurrentScope::Active(session), Some(render)) = (&mut self.current, &mut self.render) {
            session.update(render);
        }
    }

    pub fn draw(&mut self) {
        if let (CurrentScope::Active(session), Some(render)) = (&self.current, &mut self.render) {
            session.draw(render);
        }
    }

    /// Re-fetch the focal node of the current scope and rebuild it
    pub fn current_scope_reload(&mut self) {
        if let (CurrentScope::Active(session), Some(render)) = (&mut self.current, &mut self.render) {
            session.reload(&self.source, render);
        }
    }

    /// Route an interaction event from the render graph.
    pub fn handle_event(&mut self, event: &GraphEvent) {
        let action = match &self.current {
            CurrentScope::NoScope => None,
            CurrentScope::Active(session) => session.handle_event(event, &self.source),
        };
        match action {
            Some(ScopeAction::Select(node)) => (self.on_node_selected)(&node),
            Some(ScopeAction::Navigate(hash)) => {
                self.restart(&hash);
            }
            None => {}
        }
    }
}

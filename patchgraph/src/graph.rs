//! The graph registry: identifier-keyed ownership of nodes and edges, the
//! notification subject, and the public mutation facade.

pub mod observer;
pub mod serialize;
pub mod validate;

use std::fmt;

use indexmap::IndexMap;
use thiserror::Error;
use tracing::{debug, warn};

pub use self::observer::{GraphObserver, SharedObserver};
use self::observer::ObserverSet;
use crate::core::{ConnectionState, EdgeId, NodeId, Position, SocketRef, SocketRole};
use crate::edge::{Edge, Endpoints};
use crate::node::{Node, NodeError};
use crate::socket::Socket;
use crate::template::TemplateProvider;

pub(crate) type FxIndexMap<K, V> = IndexMap<K, V, fxhash::FxBuildHasher>;

/// Errors that can occur while mutating a graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum GraphError {
    /// The referenced node is not in the registry.
    #[error("node {0} not found")]
    NodeNotFound(NodeId),
    /// The referenced socket does not exist on its node.
    #[error("socket {0} not found")]
    SocketNotFound(SocketRef),
    /// The socket already holds its one permitted edge.
    #[error("socket {0} is already connected")]
    SocketOccupied(SocketRef),
    /// A node with this identifier is already registered.
    #[error("duplicate node identifier {0}")]
    DuplicateNode(NodeId),
    /// An edge with this identifier is already registered.
    #[error("duplicate edge identifier {0}")]
    DuplicateEdge(EdgeId),
    /// The type tag is unknown to the template provider.
    #[error("unknown node type: {0}")]
    UnknownType(String),
    /// The node could not be constructed.
    #[error(transparent)]
    Node(#[from] NodeError),
}

/// Flat counters describing a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GraphStats {
    /// Number of registered nodes.
    pub node_count: usize,
    /// Number of registered edges, resolved or not.
    pub edge_count: usize,
}

/// An editable graph of socket-wired nodes.
///
/// The graph owns every node and edge, keyed by identifier with O(1)
/// lookup, and is the single source of change notifications. All
/// remove-by-identifier operations are idempotent no-ops on unknown
/// identifiers.
#[derive(Default)]
pub struct Graph {
    nodes: FxIndexMap<NodeId, Node>,
    edges: FxIndexMap<EdgeId, Edge>,
    observers: ObserverSet,
    /// Reentrant batch depth; per-item notifications are dropped while > 0.
    batch_depth: usize,
    /// True while a document load is in progress.
    loading: bool,
}

impl Graph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ========== Node operations ==========

    /// Inserts a pre-built node and raises [`GraphObserver::on_node_added`].
    ///
    /// # Errors
    ///
    /// Rejects a node whose identifier is already registered.
    pub fn add_node(&mut self, node: Node) -> Result<NodeId, GraphError> {
        let id = node.id();
        if self.nodes.contains_key(&id) {
            return Err(GraphError::DuplicateNode(id));
        }
        debug!(node = %id, kind = node.kind(), "add node");
        self.nodes.insert(id, node);
        self.notify_node_added(id);
        Ok(id)
    }

    /// Creates a node of a templated type at a position.
    ///
    /// The socket complement comes from the template provider; the type tag
    /// must be known to it.
    ///
    /// # Errors
    ///
    /// Fails on an unknown type tag or a template with no sockets.
    pub fn create_node(
        &mut self,
        templates: &dyn TemplateProvider,
        kind: &str,
        position: Position,
    ) -> Result<NodeId, GraphError> {
        let template = templates
            .template(kind)
            .ok_or_else(|| GraphError::UnknownType(kind.to_owned()))?;
        let node = Node::new(
            NodeId::fresh(),
            kind,
            position,
            template.inputs,
            template.outputs,
        )?;
        self.add_node(node)
    }

    /// Removes a node and every edge incident to it, edges first.
    ///
    /// Observers hear one [`GraphObserver::on_edge_removed`] per incident
    /// edge and then a single [`GraphObserver::on_node_removed`]; they never
    /// see a node identifier with dangling edges. Returns `false` without
    /// effect for an unknown identifier.
    pub fn remove_node(&mut self, id: NodeId) -> bool {
        let Some(node) = self.nodes.get(&id) else {
            debug!(node = %id, "remove_node: not found");
            return false;
        };

        // Incident edges are found through the socket back-references when
        // possible, with a scan of the edge map as fallback for edges
        // (unresolved ones included) whose back-references were never set
        // or already cleared.
        let mut incident: Vec<EdgeId> = node.sockets().filter_map(Socket::edge).collect();
        for (eid, edge) in &self.edges {
            if edge.touches(id) && !incident.contains(eid) {
                incident.push(*eid);
            }
        }

        debug!(node = %id, edges = incident.len(), "remove node");
        for eid in incident {
            self.remove_edge(eid);
        }
        self.nodes.swap_remove(&id);
        self.notify_node_removed(id);
        true
    }

    /// Moves a node by a delta, raising [`GraphObserver::on_node_moved`].
    /// Returns `false` for an unknown identifier.
    pub fn move_node(&mut self, id: NodeId, dx: f64, dy: f64) -> bool {
        let Some(node) = self.nodes.get(&id) else {
            warn!(node = %id, "move_node: not found");
            return false;
        };
        let new = node.position().translated(dx, dy);
        self.set_node_position(id, new.x, new.y)
    }

    /// Sets a node's absolute position, raising
    /// [`GraphObserver::on_node_moved`]. Returns `false` for an unknown
    /// identifier.
    pub fn set_node_position(&mut self, id: NodeId, x: f64, y: f64) -> bool {
        let Some(node) = self.nodes.get_mut(&id) else {
            warn!(node = %id, "set_node_position: not found");
            return false;
        };
        let old = node.position();
        let new = Position::new(x, y);
        node.set_position(new);
        self.notify_node_moved(id, old, new);
        true
    }

    // ========== Edge operations ==========

    /// Inserts an edge record and raises [`GraphObserver::on_edge_added`].
    ///
    /// External callers can only construct unresolved edges; already-bound
    /// edges are created through [`Graph::connect`].
    ///
    /// # Errors
    ///
    /// Rejects an edge whose identifier is already registered.
    pub fn add_edge(&mut self, edge: Edge) -> Result<EdgeId, GraphError> {
        let id = edge.id();
        if self.edges.contains_key(&id) {
            return Err(GraphError::DuplicateEdge(id));
        }
        self.edges.insert(id, edge);
        self.notify_edge_added(id);
        Ok(id)
    }

    /// Connects an output socket to an input socket, both addressed by node
    /// identifier and per-role socket index.
    ///
    /// Creates an already-resolved edge and binds both sockets to it.
    /// Self-loops are permitted; a socket that already holds an edge is
    /// not. On error the graph is left unchanged.
    ///
    /// # Errors
    ///
    /// Fails when either node or socket is missing, or either socket is
    /// occupied.
    pub fn connect(
        &mut self,
        from_node: NodeId,
        from_socket: usize,
        to_node: NodeId,
        to_socket: usize,
    ) -> Result<EdgeId, GraphError> {
        let from = SocketRef::new(from_node, SocketRole::Output, from_socket);
        let to = SocketRef::new(to_node, SocketRole::Input, to_socket);
        for sref in [from, to] {
            let node = self
                .nodes
                .get(&sref.node)
                .ok_or(GraphError::NodeNotFound(sref.node))?;
            let socket = node
                .socket(sref.role, sref.index)
                .ok_or(GraphError::SocketNotFound(sref))?;
            if socket.is_connected() {
                return Err(GraphError::SocketOccupied(sref));
            }
        }

        let id = EdgeId::fresh();
        let edge = Edge::resolved(id, Endpoints::new(from_node, from_socket, to_node, to_socket));
        self.edges.insert(id, edge);
        self.bind_socket(from, id);
        self.bind_socket(to, id);
        debug!(edge = %id, %from, %to, "connect");
        self.notify_edge_added(id);
        Ok(id)
    }

    /// Removes an edge, detaching both endpoint sockets first, and raises
    /// [`GraphObserver::on_edge_removed`]. Endpoint nodes that are already
    /// gone are skipped. Returns `false` without effect for an unknown
    /// identifier.
    pub fn remove_edge(&mut self, id: EdgeId) -> bool {
        let Some(edge) = self.edges.get(&id) else {
            debug!(edge = %id, "remove_edge: not found");
            return false;
        };
        let ends = *edge.endpoints();
        if edge.is_resolved() {
            self.detach_socket(SocketRef::new(ends.from_node, SocketRole::Output, ends.from_socket), id);
            self.detach_socket(SocketRef::new(ends.to_node, SocketRole::Input, ends.to_socket), id);
        }
        self.edges.swap_remove(&id);
        self.notify_edge_removed(id);
        true
    }

    /// Removes the edge, if any. Alias of [`Graph::remove_edge`] matching
    /// the interactive "disconnect" operation.
    pub fn disconnect(&mut self, id: EdgeId) -> bool {
        self.remove_edge(id)
    }

    // ========== Graph-wide operations ==========

    /// Removes everything: all edges first, then all nodes, then raises a
    /// single [`GraphObserver::on_graph_cleared`]. Per-item notifications
    /// are suppressed.
    pub fn clear(&mut self) {
        debug!(
            nodes = self.nodes.len(),
            edges = self.edges.len(),
            "clear graph"
        );
        self.begin_batch();
        let edge_ids: Vec<EdgeId> = self.edges.keys().copied().collect();
        for id in edge_ids {
            self.remove_edge(id);
        }
        let node_ids: Vec<NodeId> = self.nodes.keys().copied().collect();
        for id in node_ids {
            self.remove_node(id);
        }
        self.end_batch();
        self.notify_graph_cleared();
    }

    // ========== Queries ==========

    /// Looks up a node.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Looks up an edge.
    #[must_use]
    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    /// Whether a node identifier is registered.
    #[must_use]
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Whether an edge identifier is registered.
    #[must_use]
    pub fn contains_edge(&self, id: EdgeId) -> bool {
        self.edges.contains_key(&id)
    }

    /// Iterates over all nodes. Order is unspecified and must not be
    /// relied on, though it is stable within a run.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Iterates over all edges. Order is unspecified, stable within a run.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    /// Identifiers of all nodes.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Identifiers of all edges.
    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.edges.keys().copied()
    }

    /// Number of registered nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of registered edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Identifiers of every edge incident to a node, resolved or not.
    #[must_use]
    pub fn node_edges(&self, id: NodeId) -> Vec<EdgeId> {
        self.edges
            .iter()
            .filter(|(_, edge)| edge.touches(id))
            .map(|(eid, _)| *eid)
            .collect()
    }

    /// Flat graph statistics.
    #[must_use]
    pub fn stats(&self) -> GraphStats {
        GraphStats {
            node_count: self.nodes.len(),
            edge_count: self.edges.len(),
        }
    }

    /// Looks up a socket by address.
    #[must_use]
    pub fn socket(&self, sref: SocketRef) -> Option<&Socket> {
        self.nodes.get(&sref.node)?.socket(sref.role, sref.index)
    }

    /// Scene position of a socket, if the address is valid.
    #[must_use]
    pub fn socket_position(&self, sref: SocketRef) -> Option<Position> {
        self.nodes.get(&sref.node)?.socket_position(sref.role, sref.index)
    }

    // ========== Load state ==========

    /// Whether a document load is currently in progress.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Number of edges still lacking resolved socket bindings.
    #[must_use]
    pub fn unresolved_edge_count(&self) -> usize {
        self.edges.values().filter(|e| !e.is_resolved()).count()
    }

    /// A graph is stable when no load is in progress and every edge is
    /// resolved. Callers must not mutate an unstable graph.
    #[must_use]
    pub fn is_stable(&self) -> bool {
        !self.loading && self.unresolved_edge_count() == 0
    }

    // ========== Batch mode ==========

    /// Opens a batch. Batches nest; per-item notifications stay suppressed
    /// until the outermost [`Graph::end_batch`].
    pub fn begin_batch(&mut self) {
        self.batch_depth += 1;
    }

    /// Closes one batch level. Unbalanced calls are ignored with a warning.
    pub fn end_batch(&mut self) {
        if self.batch_depth == 0 {
            warn!("end_batch without matching begin_batch");
            return;
        }
        self.batch_depth -= 1;
    }

    /// Whether a batch is open.
    #[must_use]
    pub fn is_batching(&self) -> bool {
        self.batch_depth > 0
    }

    // ========== Observers ==========

    /// Attaches an observer. Attaching the same handle twice is a no-op.
    pub fn attach(&mut self, observer: SharedObserver) {
        self.observers.attach(observer);
    }

    /// Detaches an observer. Detaching an unknown handle is a no-op.
    pub fn detach(&mut self, observer: &SharedObserver) {
        self.observers.detach(observer);
    }

    // ========== Internal helpers ==========

    fn bind_socket(&mut self, sref: SocketRef, edge: EdgeId) {
        if let Some(node) = self.nodes.get_mut(&sref.node) {
            if let Some(socket) = node.socket_mut(sref.role, sref.index) {
                socket.set_edge(Some(edge));
                socket.set_state(ConnectionState::Connected);
            }
        }
    }

    fn detach_socket(&mut self, sref: SocketRef, edge: EdgeId) {
        // The endpoint node may already be gone during teardown; a stale
        // key lookup is the safe outcome.
        if let Some(node) = self.nodes.get_mut(&sref.node) {
            if let Some(socket) = node.socket_mut(sref.role, sref.index) {
                if socket.edge() == Some(edge) {
                    socket.set_edge(None);
                    socket.reset_state();
                }
            }
        }
    }

    pub(crate) fn set_socket_state(&mut self, sref: SocketRef, state: ConnectionState) {
        if let Some(node) = self.nodes.get_mut(&sref.node) {
            if let Some(socket) = node.socket_mut(sref.role, sref.index) {
                socket.set_state(state);
            }
        }
    }

    pub(crate) fn reset_socket_states(&mut self) {
        for node in self.nodes.values_mut() {
            for socket in node.sockets_mut() {
                socket.reset_state();
            }
        }
    }

    pub(crate) fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    // ========== Notification fan-out ==========

    fn notify_node_added(&self, id: NodeId) {
        if self.batch_depth > 0 {
            return;
        }
        for obs in self.observers.snapshot() {
            obs.borrow_mut().on_node_added(self, id);
        }
    }

    fn notify_node_removed(&self, id: NodeId) {
        if self.batch_depth > 0 {
            return;
        }
        for obs in self.observers.snapshot() {
            obs.borrow_mut().on_node_removed(self, id);
        }
    }

    fn notify_node_moved(&self, id: NodeId, old: Position, new: Position) {
        if self.batch_depth > 0 {
            return;
        }
        for obs in self.observers.snapshot() {
            obs.borrow_mut().on_node_moved(self, id, old, new);
        }
    }

    fn notify_edge_added(&self, id: EdgeId) {
        if self.batch_depth > 0 {
            return;
        }
        for obs in self.observers.snapshot() {
            obs.borrow_mut().on_edge_added(self, id);
        }
    }

    fn notify_edge_removed(&self, id: EdgeId) {
        if self.batch_depth > 0 {
            return;
        }
        for obs in self.observers.snapshot() {
            obs.borrow_mut().on_edge_removed(self, id);
        }
    }

    // Terminal whole-operation signals are never suppressed by batching.

    fn notify_graph_cleared(&self) {
        for obs in self.observers.snapshot() {
            obs.borrow_mut().on_graph_cleared(self);
        }
    }

    pub(crate) fn notify_graph_loaded(&self, path: &str) {
        for obs in self.observers.snapshot() {
            obs.borrow_mut().on_graph_loaded(self, path);
        }
    }

    pub(crate) fn notify_graph_saved(&self, path: &str) {
        for obs in self.observers.snapshot() {
            obs.borrow_mut().on_graph_saved(self, path);
        }
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("nodes", &self.nodes.len())
            .field("edges", &self.edges.len())
            .field("batch_depth", &self.batch_depth)
            .field("loading", &self.loading)
            .finish_non_exhaustive()
    }
}

//! The interactive connection protocol.
//!
//! A [`Connector`] turns the two-step "drag from an output socket, drop
//! near an input socket" interaction into a validated edge. While the drag
//! is live it maintains a ghost path for preview rendering and drives the
//! socket highlight feedback; at finish time a magnetic search substitutes
//! the nearest eligible input socket when the pointer is not exactly over
//! one.

use std::cmp::Ordering;

use thiserror::Error;
use tracing::debug;

use crate::core::{ConnectionState, EdgeId, Position, SocketRef, SocketRole};
use crate::graph::Graph;

/// Radius of the magnetic search around the drop point.
pub const SNAP_RADIUS: f64 = 24.0;

/// Radius of the exact hit-test used for highlight feedback during a drag.
const HIT_RADIUS: f64 = 8.0;

/// The transient preview path of an in-progress connection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GhostPath {
    /// Scene position of the origin socket.
    pub start: Position,
    /// Current pointer position.
    pub end: Position,
}

impl GhostPath {
    /// Control points for rendering the preview as a cubic curve, bulging
    /// horizontally by half the x-distance, capped at 100 units.
    #[must_use]
    pub fn control_points(&self) -> (Position, Position) {
        let dx = self.end.x - self.start.x;
        let offset = (dx.abs() * 0.5).min(100.0);
        (
            self.start.translated(offset, 0.0),
            self.end.translated(-offset, 0.0),
        )
    }
}

#[derive(Debug, Default)]
enum ConnectorState {
    #[default]
    Idle,
    Connecting { origin: SocketRef, ghost: GhostPath },
}

/// How a finished connection attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// An edge was created.
    Completed(EdgeId),
    /// No eligible target, or the connection was rejected.
    Cancelled,
}

/// Errors from driving the protocol out of sequence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConnectError {
    /// [`Connector::begin`] while a connection is in progress.
    #[error("a connection is already in progress")]
    AlreadyConnecting,
    /// [`Connector::update`] or [`Connector::finish`] with no connection in
    /// progress.
    #[error("no connection in progress")]
    NotConnecting,
    /// The origin socket address does not name a live socket.
    #[error("socket {0} not found")]
    SocketNotFound(SocketRef),
    /// Connections start from outputs only.
    #[error("connections must start from an output socket, not {0}")]
    OriginNotOutput(SocketRef),
}

/// The ghost-edge state machine.
///
/// `Idle → Connecting → {Completed | Cancelled}`, with both terminal
/// states collapsing back to `Idle`. Exiting `Connecting` by any path
/// resets every socket's connection state to its resting value and releases
/// the ghost path.
#[derive(Debug, Default)]
pub struct Connector {
    state: ConnectorState,
}

impl Connector {
    /// Creates an idle connector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a connection is in progress.
    #[must_use]
    pub fn is_connecting(&self) -> bool {
        matches!(self.state, ConnectorState::Connecting { .. })
    }

    /// The origin socket of the in-progress connection.
    #[must_use]
    pub fn origin(&self) -> Option<SocketRef> {
        match &self.state {
            ConnectorState::Connecting { origin, .. } => Some(*origin),
            ConnectorState::Idle => None,
        }
    }

    /// The live preview path.
    #[must_use]
    pub fn ghost(&self) -> Option<&GhostPath> {
        match &self.state {
            ConnectorState::Connecting { ghost, .. } => Some(ghost),
            ConnectorState::Idle => None,
        }
    }

    /// Starts a connection from an output socket.
    ///
    /// # Errors
    ///
    /// Fails when a connection is already in progress, the address names no
    /// socket, or the socket is not an output.
    pub fn begin(
        &mut self,
        graph: &mut Graph,
        origin: SocketRef,
        pointer: Position,
    ) -> Result<(), ConnectError> {
        if self.is_connecting() {
            return Err(ConnectError::AlreadyConnecting);
        }
        let socket = graph
            .socket(origin)
            .ok_or(ConnectError::SocketNotFound(origin))?;
        if socket.role() != SocketRole::Output {
            return Err(ConnectError::OriginNotOutput(origin));
        }
        let start = graph
            .socket_position(origin)
            .ok_or(ConnectError::SocketNotFound(origin))?;

        graph.set_socket_state(origin, ConnectionState::Connecting);
        self.state = ConnectorState::Connecting {
            origin,
            ghost: GhostPath {
                start,
                end: pointer,
            },
        };
        debug!(%origin, "ghost connection started");
        Ok(())
    }

    /// Tracks the pointer: updates the preview path and the highlight
    /// feedback.
    ///
    /// An input socket under the pointer is highlighted when it belongs to
    /// a different node than the origin and is not already connected; every
    /// other non-origin socket rests.
    ///
    /// # Errors
    ///
    /// Fails when no connection is in progress.
    pub fn update(&mut self, graph: &mut Graph, pointer: Position) -> Result<(), ConnectError> {
        let ConnectorState::Connecting { origin, ghost } = &mut self.state else {
            return Err(ConnectError::NotConnecting);
        };
        let origin = *origin;
        ghost.end = pointer;

        graph.reset_socket_states();
        graph.set_socket_state(origin, ConnectionState::Connecting);

        if let Some(target) = nearest_socket(graph, pointer, HIT_RADIUS, |_| true) {
            let eligible = target.role == SocketRole::Input
                && target.node != origin.node
                && graph.socket(target).is_some_and(|s| !s.is_connected());
            if eligible {
                graph.set_socket_state(target, ConnectionState::Highlighted);
            }
        }
        Ok(())
    }

    /// Completes the connection.
    ///
    /// Target resolution: an explicitly passed live input socket wins;
    /// otherwise the nearest input socket within [`SNAP_RADIUS`] of the
    /// last pointer position is snapped to; otherwise the attempt is
    /// cancelled. A found target is still rejected — cancelling, creating
    /// nothing — when either socket already holds an edge. Self-loops are
    /// allowed.
    ///
    /// # Errors
    ///
    /// Fails when no connection is in progress.
    pub fn finish(
        &mut self,
        graph: &mut Graph,
        target: Option<SocketRef>,
    ) -> Result<ConnectOutcome, ConnectError> {
        let ConnectorState::Connecting { origin, ghost } = std::mem::take(&mut self.state) else {
            return Err(ConnectError::NotConnecting);
        };

        let target = target
            .filter(|t| t.role == SocketRole::Input && graph.socket(*t).is_some())
            .or_else(|| magnetic_target(graph, ghost.end));

        let outcome = match target {
            None => {
                debug!(%origin, "ghost connection finished with no target");
                ConnectOutcome::Cancelled
            }
            Some(t) => match graph.connect(origin.node, origin.index, t.node, t.index) {
                Ok(edge) => {
                    debug!(%origin, target = %t, %edge, "ghost connection completed");
                    ConnectOutcome::Completed(edge)
                }
                Err(err) => {
                    debug!(%origin, target = %t, %err, "ghost connection rejected");
                    ConnectOutcome::Cancelled
                }
            },
        };

        graph.reset_socket_states();
        Ok(outcome)
    }

    /// Cancels any in-progress connection. Idempotent; always succeeds.
    pub fn cancel(&mut self, graph: &mut Graph) {
        if self.is_connecting() {
            debug!("ghost connection cancelled");
        }
        self.state = ConnectorState::Idle;
        graph.reset_socket_states();
    }
}

/// Magnetic search: strict nearest input socket within [`SNAP_RADIUS`] of
/// the drop point. Equidistant candidates are ordered by socket index, then
/// node identifier, so the winner never depends on registry iteration
/// order.
fn magnetic_target(graph: &Graph, pointer: Position) -> Option<SocketRef> {
    nearest_socket(graph, pointer, SNAP_RADIUS, |sref| {
        sref.role == SocketRole::Input
    })
}

fn nearest_socket(
    graph: &Graph,
    pointer: Position,
    radius: f64,
    mut keep: impl FnMut(SocketRef) -> bool,
) -> Option<SocketRef> {
    let mut best: Option<(f64, SocketRef)> = None;
    for node in graph.nodes() {
        for socket in node.sockets() {
            let sref = SocketRef::new(node.id(), socket.role(), socket.index());
            if !keep(sref) {
                continue;
            }
            let Some(pos) = graph.socket_position(sref) else {
                continue;
            };
            let dist = pos.distance_to(pointer);
            if dist > radius {
                continue;
            }
            let better = match &best {
                None => true,
                Some((best_dist, best_ref)) => match dist.total_cmp(best_dist) {
                    Ordering::Less => true,
                    Ordering::Greater => false,
                    Ordering::Equal => (sref.index, sref.node) < (best_ref.index, best_ref.node),
                },
            };
            if better {
                best = Some((dist, sref));
            }
        }
    }
    best.map(|(_, sref)| sref)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::NodeId;
    use crate::graph::test::node;

    fn wired_pair(graph: &mut Graph) -> (NodeId, NodeId) {
        let a = graph.add_node(node("SOURCE", 0, 1)).unwrap();
        let b = graph.add_node(node("SINK", 1, 0)).unwrap();
        (a, b)
    }

    fn out0(node: NodeId) -> SocketRef {
        SocketRef::new(node, SocketRole::Output, 0)
    }

    fn in0(node: NodeId) -> SocketRef {
        SocketRef::new(node, SocketRole::Input, 0)
    }

    #[test]
    fn begin_requires_an_output_socket() {
        let mut graph = Graph::new();
        let (_, b) = wired_pair(&mut graph);
        let mut conn = Connector::new();

        assert_eq!(
            conn.begin(&mut graph, in0(b), Position::default()),
            Err(ConnectError::OriginNotOutput(in0(b)))
        );

        let missing = out0(NodeId::fresh());
        assert_eq!(
            conn.begin(&mut graph, missing, Position::default()),
            Err(ConnectError::SocketNotFound(missing))
        );
        assert!(!conn.is_connecting());
    }

    #[test]
    fn begin_marks_origin_and_records_ghost() {
        let mut graph = Graph::new();
        let (a, _) = wired_pair(&mut graph);
        let mut conn = Connector::new();

        let start = graph.socket_position(out0(a)).unwrap();
        conn.begin(&mut graph, out0(a), Position::new(300.0, 300.0))
            .unwrap();

        assert!(conn.is_connecting());
        assert_eq!(conn.origin(), Some(out0(a)));
        let ghost = conn.ghost().unwrap();
        assert_eq!(ghost.start, start);
        assert_eq!(ghost.end, Position::new(300.0, 300.0));
        assert_eq!(
            graph.socket(out0(a)).unwrap().state(),
            ConnectionState::Connecting
        );

        assert_eq!(
            conn.begin(&mut graph, out0(a), Position::default()),
            Err(ConnectError::AlreadyConnecting)
        );
    }

    #[test]
    fn update_highlights_eligible_targets_only() {
        let mut graph = Graph::new();
        let (a, b) = wired_pair(&mut graph);
        graph.set_node_position(b, 400.0, 0.0);
        let mut conn = Connector::new();
        conn.begin(&mut graph, out0(a), Position::default()).unwrap();

        // directly over b's input: highlighted
        let over_b = graph.socket_position(in0(b)).unwrap();
        conn.update(&mut graph, over_b).unwrap();
        assert_eq!(
            graph.socket(in0(b)).unwrap().state(),
            ConnectionState::Highlighted
        );
        assert_eq!(conn.ghost().unwrap().end, over_b);

        // pointer in empty space: highlight resets, origin keeps connecting
        conn.update(&mut graph, Position::new(-500.0, -500.0)).unwrap();
        assert_eq!(
            graph.socket(in0(b)).unwrap().state(),
            ConnectionState::Disconnected
        );
        assert_eq!(
            graph.socket(out0(a)).unwrap().state(),
            ConnectionState::Connecting
        );
    }

    #[test]
    fn update_does_not_highlight_own_node_or_occupied_inputs() {
        let mut graph = Graph::new();
        let loopy = graph.add_node(node("TRANSFORM", 1, 1)).unwrap();
        let (src, sink) = wired_pair(&mut graph);
        graph.set_node_position(sink, 400.0, 0.0);
        graph.connect(src, 0, sink, 0).unwrap();

        let mut conn = Connector::new();
        conn.begin(&mut graph, out0(loopy), Position::default())
            .unwrap();

        // own input socket is never highlighted during the drag
        let own_input = graph.socket_position(in0(loopy)).unwrap();
        conn.update(&mut graph, own_input).unwrap();
        assert_ne!(
            graph.socket(in0(loopy)).unwrap().state(),
            ConnectionState::Highlighted
        );

        // an occupied input is not a valid-target highlight either
        let occupied = graph.socket_position(in0(sink)).unwrap();
        conn.update(&mut graph, occupied).unwrap();
        assert_eq!(
            graph.socket(in0(sink)).unwrap().state(),
            ConnectionState::Connected
        );
    }

    #[test]
    fn finish_with_explicit_target_completes() {
        let mut graph = Graph::new();
        let (a, b) = wired_pair(&mut graph);
        let mut conn = Connector::new();
        conn.begin(&mut graph, out0(a), Position::default()).unwrap();

        let outcome = conn.finish(&mut graph, Some(in0(b))).unwrap();
        let ConnectOutcome::Completed(edge) = outcome else {
            panic!("expected completion, got {outcome:?}");
        };
        assert!(graph.edge(edge).unwrap().is_resolved());
        assert!(!conn.is_connecting());
        assert_eq!(conn.ghost(), None);
        // sockets settle at their resting states
        assert_eq!(
            graph.socket(out0(a)).unwrap().state(),
            ConnectionState::Connected
        );
        assert_eq!(
            graph.socket(in0(b)).unwrap().state(),
            ConnectionState::Connected
        );

        assert_eq!(
            conn.finish(&mut graph, None),
            Err(ConnectError::NotConnecting)
        );
    }

    #[test]
    fn finish_snaps_to_nearest_input_within_radius() {
        let mut graph = Graph::new();
        let (a, b) = wired_pair(&mut graph);
        graph.set_node_position(b, 400.0, 0.0);
        let mut conn = Connector::new();

        let target_pos = graph.socket_position(in0(b)).unwrap();
        let near_miss = target_pos.translated(SNAP_RADIUS - 1.0, 0.0);

        conn.begin(&mut graph, out0(a), Position::default()).unwrap();
        conn.update(&mut graph, near_miss).unwrap();
        let outcome = conn.finish(&mut graph, None).unwrap();
        assert!(matches!(outcome, ConnectOutcome::Completed(_)));
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn finish_beyond_radius_cancels() {
        let mut graph = Graph::new();
        let (a, b) = wired_pair(&mut graph);
        graph.set_node_position(b, 400.0, 0.0);
        let mut conn = Connector::new();

        let target_pos = graph.socket_position(in0(b)).unwrap();
        let too_far = target_pos.translated(SNAP_RADIUS + 10.0, 0.0);

        conn.begin(&mut graph, out0(a), too_far).unwrap();
        assert_eq!(
            conn.finish(&mut graph, None).unwrap(),
            ConnectOutcome::Cancelled
        );
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(
            graph.socket(out0(a)).unwrap().state(),
            ConnectionState::Disconnected
        );
    }

    #[test]
    fn occupied_origin_is_rejected_without_changing_edge_count() {
        let mut graph = Graph::new();
        let (a, b) = wired_pair(&mut graph);
        let extra = graph.add_node(node("SINK", 1, 0)).unwrap();
        graph.connect(a, 0, b, 0).unwrap();

        let mut conn = Connector::new();
        conn.begin(&mut graph, out0(a), Position::default()).unwrap();
        let outcome = conn.finish(&mut graph, Some(in0(extra))).unwrap();

        assert_eq!(outcome, ConnectOutcome::Cancelled);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn occupied_target_is_rejected() {
        let mut graph = Graph::new();
        let (a, b) = wired_pair(&mut graph);
        let other = graph.add_node(node("SOURCE", 0, 1)).unwrap();
        graph.connect(other, 0, b, 0).unwrap();

        let mut conn = Connector::new();
        conn.begin(&mut graph, out0(a), Position::default()).unwrap();
        assert_eq!(
            conn.finish(&mut graph, Some(in0(b))).unwrap(),
            ConnectOutcome::Cancelled
        );
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn self_loops_are_accepted_at_finish() {
        let mut graph = Graph::new();
        let loopy = graph.add_node(node("TRANSFORM", 1, 1)).unwrap();
        let mut conn = Connector::new();

        conn.begin(&mut graph, out0(loopy), Position::default())
            .unwrap();
        let outcome = conn.finish(&mut graph, Some(in0(loopy))).unwrap();
        assert!(matches!(outcome, ConnectOutcome::Completed(_)));
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn equidistant_snap_prefers_lowest_socket_index() {
        let mut graph = Graph::new();
        let a = graph.add_node(node("SOURCE", 0, 1)).unwrap();
        let b = graph.add_node(node("MERGE", 2, 1)).unwrap();
        graph.set_node_position(b, 400.0, 0.0);

        // aim exactly between b's two input sockets; both are 16 units away
        let in_0 = graph.socket_position(in0(b)).unwrap();
        let in_1 = graph
            .socket_position(SocketRef::new(b, SocketRole::Input, 1))
            .unwrap();
        let midpoint = Position::new(in_0.x, (in_0.y + in_1.y) / 2.0);

        let mut conn = Connector::new();
        conn.begin(&mut graph, out0(a), midpoint).unwrap();
        let outcome = conn.finish(&mut graph, None).unwrap();

        let ConnectOutcome::Completed(edge) = outcome else {
            panic!("expected a snap, got {outcome:?}");
        };
        assert_eq!(graph.edge(edge).unwrap().endpoints().to_socket, 0);
    }

    #[test]
    fn cancel_is_idempotent_and_resets_states() {
        let mut graph = Graph::new();
        let (a, _) = wired_pair(&mut graph);
        let mut conn = Connector::new();

        conn.cancel(&mut graph); // cancelling while idle is fine

        conn.begin(&mut graph, out0(a), Position::default()).unwrap();
        conn.cancel(&mut graph);
        assert!(!conn.is_connecting());
        assert_eq!(
            graph.socket(out0(a)).unwrap().state(),
            ConnectionState::Disconnected
        );
        assert_eq!(
            conn.update(&mut graph, Position::default()),
            Err(ConnectError::NotConnecting)
        );
    }

    #[test]
    fn ghost_path_control_points_cap_at_100() {
        let short = GhostPath {
            start: Position::new(0.0, 0.0),
            end: Position::new(60.0, 0.0),
        };
        let (c1, c2) = short.control_points();
        assert_eq!(c1, Position::new(30.0, 0.0));
        assert_eq!(c2, Position::new(30.0, 0.0));

        let long = GhostPath {
            start: Position::new(0.0, 0.0),
            end: Position::new(1000.0, 0.0),
        };
        let (c1, c2) = long.control_points();
        assert_eq!(c1, Position::new(100.0, 0.0));
        assert_eq!(c2, Position::new(900.0, 0.0));
    }
}

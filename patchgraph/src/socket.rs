//! Sockets: the typed connection points owned by a node.

use crate::core::{ConnectionState, EdgeId, SocketRole};

/// A connection point on a node.
///
/// A socket is owned by exactly one node and identified by its role plus a
/// zero-based index unique within that role. It holds at most one edge; the
/// back-reference is an identifier, so a socket never dangles when its edge
/// is destroyed out from under it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Socket {
    role: SocketRole,
    index: usize,
    state: ConnectionState,
    edge: Option<EdgeId>,
}

impl Socket {
    pub(crate) fn new(role: SocketRole, index: usize) -> Self {
        Self {
            role,
            index,
            state: ConnectionState::default(),
            edge: None,
        }
    }

    /// Input or output side of the parent node.
    #[must_use]
    pub fn role(&self) -> SocketRole {
        self.role
    }

    /// Zero-based index within the role. Immutable for the node's lifetime.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Current interactive connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// The attached edge, if any.
    #[must_use]
    pub fn edge(&self) -> Option<EdgeId> {
        self.edge
    }

    /// Whether an edge is attached.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.edge.is_some()
    }

    /// The state this socket settles into outside an active drag.
    #[must_use]
    pub fn resting_state(&self) -> ConnectionState {
        if self.is_connected() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    pub(crate) fn set_edge(&mut self, edge: Option<EdgeId>) {
        self.edge = edge;
    }

    pub(crate) fn set_state(&mut self, state: ConnectionState) {
        self.state = state;
    }

    pub(crate) fn reset_state(&mut self) {
        self.state = self.resting_state();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn resting_state_tracks_edge() {
        let mut socket = Socket::new(SocketRole::Input, 0);
        assert_eq!(socket.resting_state(), ConnectionState::Disconnected);

        socket.set_edge(Some(EdgeId::fresh()));
        socket.set_state(ConnectionState::Highlighted);
        assert_eq!(socket.resting_state(), ConnectionState::Connected);

        socket.reset_state();
        assert_eq!(socket.state(), ConnectionState::Connected);

        socket.set_edge(None);
        socket.reset_state();
        assert_eq!(socket.state(), ConnectionState::Disconnected);
    }
}

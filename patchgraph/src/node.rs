//! Nodes: typed entities owning ordered input and output sockets.

use smol_str::SmolStr;
use thiserror::Error;

use crate::core::{NodeId, Position, SocketRole};
use crate::socket::Socket;

/// Side length of a socket's hit square, also the slot unit for placement.
const SOCKET_SIZE: f64 = 16.0;
/// Horizontal distance between a socket and the node body edge.
const SOCKET_OFFSET: f64 = 4.0;
/// Vertical distance between adjacent sockets of one role.
const SOCKET_SPACING: f64 = 32.0;
const MIN_WIDTH: f64 = 100.0;
const MIN_HEIGHT: f64 = 50.0;
const PADDING: f64 = 14.0;

/// Errors from constructing a node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum NodeError {
    /// A node must carry at least one socket.
    #[error("node of type {kind} declares no sockets")]
    NoSockets {
        /// The offending type tag.
        kind: SmolStr,
    },
}

/// A typed node with a fixed complement of input and output sockets.
///
/// Socket counts are fixed at construction, from a type template for
/// interactive creation or from the declared counts of a document record.
/// The type tag is fixed after construction.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    id: NodeId,
    kind: SmolStr,
    position: Position,
    inputs: Vec<Socket>,
    outputs: Vec<Socket>,
}

impl Node {
    /// Creates a node with `inputs` input sockets and `outputs` output
    /// sockets, indexed from zero within each role.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::NoSockets`] when both counts are zero.
    pub fn new(
        id: NodeId,
        kind: impl Into<SmolStr>,
        position: Position,
        inputs: usize,
        outputs: usize,
    ) -> Result<Self, NodeError> {
        let kind = kind.into();
        if inputs + outputs == 0 {
            return Err(NodeError::NoSockets { kind });
        }
        Ok(Self {
            id,
            kind,
            position,
            inputs: (0..inputs).map(|i| Socket::new(SocketRole::Input, i)).collect(),
            outputs: (0..outputs)
                .map(|i| Socket::new(SocketRole::Output, i))
                .collect(),
        })
    }

    /// The node's identifier.
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The node's type tag.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Position of the node's top-left corner in scene coordinates.
    #[must_use]
    pub fn position(&self) -> Position {
        self.position
    }

    /// Moves the node. Host code should go through
    /// [`Graph::set_node_position`](crate::Graph::set_node_position) so that
    /// observers hear about it.
    pub fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    /// Number of input sockets.
    #[must_use]
    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    /// Number of output sockets.
    #[must_use]
    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// Looks up a socket by role and per-role index.
    #[must_use]
    pub fn socket(&self, role: SocketRole, index: usize) -> Option<&Socket> {
        match role {
            SocketRole::Input => self.inputs.get(index),
            SocketRole::Output => self.outputs.get(index),
        }
    }

    pub(crate) fn socket_mut(&mut self, role: SocketRole, index: usize) -> Option<&mut Socket> {
        match role {
            SocketRole::Input => self.inputs.get_mut(index),
            SocketRole::Output => self.outputs.get_mut(index),
        }
    }

    /// All sockets, inputs first.
    pub fn sockets(&self) -> impl Iterator<Item = &Socket> {
        self.inputs.iter().chain(self.outputs.iter())
    }

    pub(crate) fn sockets_mut(&mut self) -> impl Iterator<Item = &mut Socket> {
        self.inputs.iter_mut().chain(self.outputs.iter_mut())
    }

    /// Body size of the node, grown vertically to fit its sockets.
    #[must_use]
    pub fn size(&self) -> (f64, f64) {
        let max_sockets = self.inputs.len().max(self.outputs.len());
        let height = if max_sockets > 0 {
            let required = PADDING + (max_sockets - 1) as f64 * SOCKET_SPACING + SOCKET_SIZE + PADDING;
            MIN_HEIGHT.max(required)
        } else {
            MIN_HEIGHT
        };
        (MIN_WIDTH, height)
    }

    /// Scene position of a socket.
    ///
    /// Inputs sit just off the left edge, outputs just off the right, each
    /// role's column vertically centered on the node body. Returns `None`
    /// for an out-of-range index.
    #[must_use]
    pub fn socket_position(&self, role: SocketRole, index: usize) -> Option<Position> {
        let count = match role {
            SocketRole::Input => self.inputs.len(),
            SocketRole::Output => self.outputs.len(),
        };
        if index >= count {
            return None;
        }
        let (width, height) = self.size();
        let center_y = height * 0.6;
        let box_height = (2 * count + 1) as f64 * SOCKET_SIZE;
        let start_y = center_y - box_height / 2.0;
        let y = start_y + SOCKET_SIZE * (2 * index + 1) as f64;
        let x = match role {
            SocketRole::Input => -SOCKET_OFFSET,
            SocketRole::Output => width + SOCKET_OFFSET,
        };
        Some(Position::new(self.position.x + x, self.position.y + y))
    }
}

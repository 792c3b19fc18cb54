//! Integrity checking for a graph's cross-references.

use thiserror::Error;

use crate::core::{EdgeId, NodeId, SocketRef};
use crate::graph::Graph;

/// A broken cross-reference found by [`Graph::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum IntegrityError {
    /// An edge references a node that is not registered.
    #[error("edge {edge} references missing node {node}")]
    MissingEndpoint {
        /// The offending edge.
        edge: EdgeId,
        /// The missing node.
        node: NodeId,
    },
    /// An edge references a socket index its endpoint node does not have.
    #[error("edge {edge} references out-of-bounds socket {socket}")]
    SocketOutOfBounds {
        /// The offending edge.
        edge: EdgeId,
        /// The out-of-range address.
        socket: SocketRef,
    },
    /// An endpoint socket's back-reference does not point at the edge.
    #[error("socket {socket} does not point back at edge {edge}")]
    StaleBackReference {
        /// The edge whose endpoint is inconsistent.
        edge: EdgeId,
        /// The socket with the wrong back-reference.
        socket: SocketRef,
    },
    /// A socket references an edge that is not registered.
    #[error("socket {socket} references missing edge {edge}")]
    DanglingSocket {
        /// The socket holding the stale reference.
        socket: SocketRef,
        /// The missing edge.
        edge: EdgeId,
    },
    /// An edge was left unresolved outside a load.
    #[error("edge {edge} is unresolved")]
    Unresolved {
        /// The unresolved edge.
        edge: EdgeId,
    },
}

/// Integrity checking.
impl Graph {
    /// Checks every edge↔socket cross-reference in the graph.
    ///
    /// A stable graph produced through the public operations always
    /// passes; this exists as a post-load safety net and a test oracle.
    ///
    /// # Errors
    ///
    /// Returns the first broken reference found.
    pub fn validate(&self) -> Result<(), IntegrityError> {
        for edge in self.edges() {
            let id = edge.id();
            if !edge.is_resolved() {
                return Err(IntegrityError::Unresolved { edge: id });
            }
            // both accessors are Some once resolved
            for sref in [edge.from_socket(), edge.to_socket()].into_iter().flatten() {
                let Some(node) = self.node(sref.node) else {
                    return Err(IntegrityError::MissingEndpoint {
                        edge: id,
                        node: sref.node,
                    });
                };
                let Some(socket) = node.socket(sref.role, sref.index) else {
                    return Err(IntegrityError::SocketOutOfBounds {
                        edge: id,
                        socket: sref,
                    });
                };
                if socket.edge() != Some(id) {
                    return Err(IntegrityError::StaleBackReference {
                        edge: id,
                        socket: sref,
                    });
                }
            }
        }

        for node in self.nodes() {
            for socket in node.sockets() {
                let sref = SocketRef::new(node.id(), socket.role(), socket.index());
                if let Some(edge_id) = socket.edge() {
                    if self.edge(edge_id).is_none() {
                        return Err(IntegrityError::DanglingSocket {
                            socket: sref,
                            edge: edge_id,
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

//! Edges: directed connections from an output socket to an input socket.

use crate::core::{EdgeId, NodeId, SocketRef, SocketRole};

/// Raw endpoint addresses of an edge: node identifiers plus per-role socket
/// indices. Meaningful whether or not the edge has been bound to live
/// sockets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Endpoints {
    /// Source node identifier.
    pub from_node: NodeId,
    /// Output socket index on the source node.
    pub from_socket: usize,
    /// Destination node identifier.
    pub to_node: NodeId,
    /// Input socket index on the destination node.
    pub to_socket: usize,
}

impl Endpoints {
    /// Creates endpoint addresses.
    #[must_use]
    pub fn new(from_node: NodeId, from_socket: usize, to_node: NodeId, to_socket: usize) -> Self {
        Self {
            from_node,
            from_socket,
            to_node,
            to_socket,
        }
    }
}

/// Binding state of an edge's endpoints.
///
/// An edge read from a document starts `Unresolved`: it knows only raw
/// identifiers and indices. Resolution against a populated registry checks
/// both endpoints and flips it to `Resolved`, after which the endpoint
/// sockets' back-references point at this edge. The payload is the same
/// either way; the tag records whether binding has happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeLink {
    /// Endpoints pending lookup against the node registry.
    Unresolved(Endpoints),
    /// Endpoints checked and bound; source is an output, destination an input.
    Resolved(Endpoints),
}

/// A directed connection between two sockets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Edge {
    id: EdgeId,
    link: EdgeLink,
}

impl Edge {
    /// Creates an edge whose endpoints still need resolving, as when read
    /// from a document before the node registry is complete.
    #[must_use]
    pub fn unresolved(id: EdgeId, endpoints: Endpoints) -> Self {
        Self {
            id,
            link: EdgeLink::Unresolved(endpoints),
        }
    }

    /// Creates an edge that is already bound. Only the registry may do this;
    /// it is responsible for having validated both endpoints first.
    pub(crate) fn resolved(id: EdgeId, endpoints: Endpoints) -> Self {
        Self {
            id,
            link: EdgeLink::Resolved(endpoints),
        }
    }

    /// The edge's identifier.
    #[must_use]
    pub fn id(&self) -> EdgeId {
        self.id
    }

    /// The binding state of the endpoints.
    #[must_use]
    pub fn link(&self) -> &EdgeLink {
        &self.link
    }

    /// Raw endpoint addresses, available in both binding states.
    #[must_use]
    pub fn endpoints(&self) -> &Endpoints {
        match &self.link {
            EdgeLink::Unresolved(e) | EdgeLink::Resolved(e) => e,
        }
    }

    /// Whether the endpoints have been checked and bound.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self.link, EdgeLink::Resolved(_))
    }

    /// The bound source socket address (role Output), if resolved.
    #[must_use]
    pub fn from_socket(&self) -> Option<SocketRef> {
        match &self.link {
            EdgeLink::Resolved(e) => {
                Some(SocketRef::new(e.from_node, SocketRole::Output, e.from_socket))
            }
            EdgeLink::Unresolved(_) => None,
        }
    }

    /// The bound destination socket address (role Input), if resolved.
    #[must_use]
    pub fn to_socket(&self) -> Option<SocketRef> {
        match &self.link {
            EdgeLink::Resolved(e) => Some(SocketRef::new(e.to_node, SocketRole::Input, e.to_socket)),
            EdgeLink::Unresolved(_) => None,
        }
    }

    /// Whether either endpoint, resolved or not, references `node`.
    #[must_use]
    pub fn touches(&self, node: NodeId) -> bool {
        let e = self.endpoints();
        e.from_node == node || e.to_node == node
    }

    pub(crate) fn mark_resolved(&mut self) {
        if let EdgeLink::Unresolved(e) = self.link {
            self.link = EdgeLink::Resolved(e);
        }
    }
}

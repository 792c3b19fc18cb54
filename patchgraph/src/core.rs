//! Core identifier, role, and geometry types.
//!
//! These types are re-exported in the root of the crate.

use std::str::FromStr;

use derive_more::{Display, From};
use uuid::Uuid;

/// A unique identifier for a [`Node`](crate::Node) in a graph.
///
/// Identifiers are 128-bit UUIDs. The canonical text form is unbraced
/// hyphenated, but braced text (`{…}`) parses as well so that documents
/// written by other tools round-trip.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(Uuid);

/// A unique identifier for an [`Edge`](crate::Edge) in a graph.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct EdgeId(Uuid);

macro_rules! impl_entity_id {
    ($($t:ty),*) => {
        $(
            impl $t {
                /// Generate a fresh, globally unique identifier.
                #[must_use]
                pub fn fresh() -> Self {
                    Self(Uuid::new_v4())
                }

                /// The underlying UUID.
                #[must_use]
                pub fn uuid(self) -> Uuid {
                    self.0
                }
            }

            impl std::fmt::Display for $t {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    write!(f, "{}", self.0.hyphenated())
                }
            }

            impl std::fmt::Debug for $t {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    f.debug_tuple(stringify!($t)).field(&self.0).finish()
                }
            }

            impl FromStr for $t {
                type Err = uuid::Error;

                fn from_str(s: &str) -> Result<Self, Self::Err> {
                    Uuid::parse_str(s).map(Self)
                }
            }
        )*
    };
}
impl_entity_id!(NodeId, EdgeId);

/// The role of a socket on its parent node.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display)]
pub enum SocketRole {
    /// Accepts at most one incoming edge.
    #[display("input")]
    Input,
    /// Originates at most one outgoing edge.
    #[display("output")]
    Output,
}

/// Interactive connection state of a socket.
///
/// `Connecting` and `Highlighted` are transient states owned by the
/// connection protocol; outside an active drag every socket rests at
/// `Connected` or `Disconnected`.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum ConnectionState {
    /// No edge attached.
    #[default]
    Disconnected,
    /// Origin of an in-progress ghost connection.
    Connecting,
    /// Valid target under the pointer during a ghost connection.
    Highlighted,
    /// An edge is attached.
    Connected,
}

/// A point in the 2D scene coordinate system.
#[derive(Clone, Copy, PartialEq, Default, Debug, serde::Serialize, serde::Deserialize)]
pub struct Position {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Position {
    /// Creates a new position.
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance_to(self, other: Position) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        dx.hypot(dy)
    }

    /// This position shifted by a delta.
    #[must_use]
    pub fn translated(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Address of a socket: parent node, role, and per-role index.
///
/// Socket addresses are stable keys, never references. A stale address is
/// answered with a not-found lookup rather than a dangling pointer.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct SocketRef {
    /// The parent node.
    pub node: NodeId,
    /// Input or output side of the node.
    pub role: SocketRole,
    /// Zero-based index within the role.
    pub index: usize,
}

impl SocketRef {
    /// Creates a new socket address.
    #[must_use]
    pub fn new(node: NodeId, role: SocketRole, index: usize) -> Self {
        Self { node, role, index }
    }
}

impl std::fmt::Display for SocketRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}[{}]", self.node, self.role, self.index)
    }
}

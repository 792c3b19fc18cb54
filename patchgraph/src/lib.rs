//! Mutation and connection engine for socket-wired node graphs.
//!
//! This crate is the headless core of an interactive node-graph editor:
//! typed nodes with indexed input and output sockets, directed edges
//! between them, a UUID-keyed registry with observer fan-out, a text
//! document codec with a tolerant two-phase loader, and the ghost-edge
//! connection protocol with magnetic snapping. Rendering, event routing,
//! and scripting live in the host application and talk to the engine
//! through [`Graph`]'s operations and the [`GraphObserver`] callbacks.
//!
//! # Example
//!
//! ```
//! use patchgraph::template::TemplateRegistry;
//! use patchgraph::{Graph, Position};
//!
//! let mut graph = Graph::new();
//! let templates = TemplateRegistry::new();
//!
//! let source = graph
//!     .create_node(&templates, "SOURCE", Position::new(0.0, 0.0))
//!     .unwrap();
//! let sink = graph
//!     .create_node(&templates, "SINK", Position::new(300.0, 0.0))
//!     .unwrap();
//! graph.connect(source, 0, sink, 0).unwrap();
//!
//! assert_eq!(graph.stats().edge_count, 1);
//! assert!(graph.is_stable());
//!
//! let document = graph.to_document();
//! let mut copy = Graph::new();
//! assert!(copy.load_document(&document).is_complete());
//! ```

pub mod autosave;
pub mod connect;
pub mod core;
pub mod edge;
pub mod graph;
pub mod node;
pub mod socket;
pub mod template;

pub use crate::core::{ConnectionState, EdgeId, NodeId, Position, SocketRef, SocketRole};
pub use crate::edge::{Edge, EdgeLink, Endpoints};
pub use crate::graph::serialize::{Document, DocumentError, LoadReport};
pub use crate::graph::{Graph, GraphError, GraphObserver, GraphStats, SharedObserver};
pub use crate::node::Node;
pub use crate::socket::Socket;

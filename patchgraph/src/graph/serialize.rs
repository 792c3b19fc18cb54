//! The document codec: a text serialization of the graph with a tolerant,
//! two-phase loader.
//!
//! The writer always emits the flat layout — a versioned root object with a
//! single `items` sequence of self-describing node and edge records. The
//! reader additionally accepts the legacy wrapped layout, where records sit
//! under `nodes` and `edges` (or `connections`) groupings.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::core::{EdgeId, NodeId, Position, SocketRef, SocketRole};
use crate::edge::{Edge, Endpoints};
use crate::graph::Graph;
use crate::node::Node;

/// Version written to every document. Documents declaring a different
/// version are rejected; documents declaring none are assumed current.
pub const DOC_VERSION: &str = "1.0";

/// Errors covering a whole document, as opposed to per-record problems
/// which are skipped with a diagnostic.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DocumentError {
    /// The document is not valid JSON or has the wrong overall shape.
    #[error("malformed document: {0}")]
    Json(#[from] serde_json::Error),
    /// The document declares a version this codec does not understand.
    #[error("unsupported document version {0}")]
    UnsupportedVersion(String),
    /// Reading or writing the backing file failed.
    #[error("document I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Flat, self-describing serialization of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Node identifier as UUID text (braced or unbraced on read).
    pub id: String,
    /// Type tag.
    #[serde(rename = "type")]
    pub kind: String,
    /// Horizontal position.
    pub x: f64,
    /// Vertical position.
    pub y: f64,
    /// Declared input socket count.
    pub inputs: usize,
    /// Declared output socket count.
    pub outputs: usize,
}

/// Flat, self-describing serialization of an edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    /// Edge identifier as UUID text.
    pub id: String,
    /// Source node identifier.
    #[serde(rename = "fromNode")]
    pub from_node: String,
    /// Output socket index on the source node.
    #[serde(rename = "fromSocketIndex")]
    pub from_socket: usize,
    /// Destination node identifier.
    #[serde(rename = "toNode")]
    pub to_node: String,
    /// Input socket index on the destination node.
    #[serde(rename = "toSocketIndex")]
    pub to_socket: usize,
}

/// One record in a document's flat item sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "lowercase")]
pub enum DocumentItem {
    /// A node record.
    Node(NodeRecord),
    /// An edge record.
    Edge(EdgeRecord),
}

/// A parsed graph document.
///
/// Always stored (and re-serialized) in the flat layout, whatever layout it
/// was read from. Structurally malformed records are dropped at parse time
/// and only counted; semantic problems are handled during
/// [`Graph::load_document`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    version: String,
    items: Vec<DocumentItem>,
    #[serde(skip)]
    skipped_records: usize,
}

/// The two accepted on-disk layouts. Variant order matters: the flat layout
/// is tried first, the wrapped one is the backward-compatibility fallback.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawDocument {
    Flat {
        #[serde(default)]
        version: Option<String>,
        items: Vec<serde_json::Value>,
    },
    Wrapped {
        #[serde(default)]
        version: Option<String>,
        #[serde(default)]
        nodes: Vec<serde_json::Value>,
        #[serde(default, alias = "connections")]
        edges: Vec<serde_json::Value>,
    },
}

impl Document {
    /// Creates a document from records.
    #[must_use]
    pub fn new(items: Vec<DocumentItem>) -> Self {
        Self {
            version: DOC_VERSION.to_owned(),
            items,
            skipped_records: 0,
        }
    }

    /// Parses a document from JSON text, accepting both layouts.
    ///
    /// Structurally malformed records are skipped with a diagnostic and
    /// counted in [`Document::skipped_records`].
    ///
    /// # Errors
    ///
    /// Fails only for whole-document problems: invalid JSON, a root of the
    /// wrong shape, or an unsupported version.
    pub fn parse(text: &str) -> Result<Self, DocumentError> {
        let raw: RawDocument = serde_json::from_str(text)?;
        let mut doc = Self::new(Vec::new());

        match raw {
            RawDocument::Flat { version, items } => {
                check_version(version)?;
                for value in items {
                    match parse_flat_item(&value) {
                        Ok(item) => doc.items.push(item),
                        Err(err) => doc.skip(&value, &err),
                    }
                }
            }
            RawDocument::Wrapped {
                version,
                nodes,
                edges,
            } => {
                check_version(version)?;
                for value in nodes {
                    match serde_json::from_value::<NodeRecord>(value.clone()) {
                        Ok(rec) => doc.items.push(DocumentItem::Node(rec)),
                        Err(err) => doc.skip(&value, &err),
                    }
                }
                for value in edges {
                    match serde_json::from_value::<EdgeRecord>(value.clone()) {
                        Ok(rec) => doc.items.push(DocumentItem::Edge(rec)),
                        Err(err) => doc.skip(&value, &err),
                    }
                }
            }
        }
        Ok(doc)
    }

    fn skip(&mut self, value: &serde_json::Value, err: &serde_json::Error) {
        warn!(record = %value, %err, "skipping malformed record");
        self.skipped_records += 1;
    }

    /// The document's declared version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// All records, nodes and edges interleaved as stored.
    #[must_use]
    pub fn items(&self) -> &[DocumentItem] {
        &self.items
    }

    /// Node records only.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeRecord> {
        self.items.iter().filter_map(|item| match item {
            DocumentItem::Node(rec) => Some(rec),
            DocumentItem::Edge(_) => None,
        })
    }

    /// Edge records only.
    pub fn edges(&self) -> impl Iterator<Item = &EdgeRecord> {
        self.items.iter().filter_map(|item| match item {
            DocumentItem::Edge(rec) => Some(rec),
            DocumentItem::Node(_) => None,
        })
    }

    /// Number of structurally malformed records dropped while parsing.
    #[must_use]
    pub fn skipped_records(&self) -> usize {
        self.skipped_records
    }

    /// Renders the document as JSON text in the flat layout.
    ///
    /// # Errors
    ///
    /// Fails when a record holds a value JSON cannot express (a non-finite
    /// coordinate).
    pub fn to_json(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes the document to a file in the flat layout.
    ///
    /// # Errors
    ///
    /// Fails on serialization or I/O problems.
    pub fn write_to_path(&self, path: impl AsRef<Path>) -> Result<(), DocumentError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

fn check_version(version: Option<String>) -> Result<(), DocumentError> {
    match version {
        Some(v) if v != DOC_VERSION => Err(DocumentError::UnsupportedVersion(v)),
        _ => Ok(()),
    }
}

/// Flat items carry a `record` tag; untagged ones (written by older tools)
/// are classified by their fields, edge records being the ones that name a
/// source node.
fn parse_flat_item(value: &serde_json::Value) -> Result<DocumentItem, serde_json::Error> {
    if value.get("record").is_some() {
        serde_json::from_value(value.clone())
    } else if value.get("fromNode").is_some() {
        serde_json::from_value::<EdgeRecord>(value.clone()).map(DocumentItem::Edge)
    } else {
        serde_json::from_value::<NodeRecord>(value.clone()).map(DocumentItem::Node)
    }
}

/// Outcome of a document load.
///
/// The load keeps going past bad records; this report says how degraded the
/// result is. [`LoadReport::is_complete`] is the "did everything resolve"
/// flag from the persistence contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadReport {
    /// Nodes inserted during phase 1.
    pub nodes_loaded: usize,
    /// Edges inserted and fully resolved by phase 3.
    pub edges_loaded: usize,
    /// Records skipped for structural or semantic problems (phases 1–2 and
    /// parse time).
    pub records_skipped: usize,
    /// Edges dropped because phase 3 could not resolve their endpoints.
    pub edges_dropped: usize,
}

impl LoadReport {
    /// True when every record made it into the graph.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.records_skipped == 0 && self.edges_dropped == 0
    }
}

/// Why phase-3 resolution rejected an edge.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
enum ResolveError {
    #[error("endpoint node {0} is missing")]
    MissingNode(NodeId),
    #[error("socket {0} is out of bounds")]
    SocketOutOfBounds(SocketRef),
    #[error("socket {0} already holds an edge")]
    SocketOccupied(SocketRef),
}

/// Persistence operations.
impl Graph {
    /// Flat record view of a node.
    #[must_use]
    pub fn node_record(&self, id: NodeId) -> Option<NodeRecord> {
        let node = self.node(id)?;
        Some(NodeRecord {
            id: id.to_string(),
            kind: node.kind().to_owned(),
            x: node.position().x,
            y: node.position().y,
            inputs: node.input_count(),
            outputs: node.output_count(),
        })
    }

    /// Flat record view of an edge, resolved or not.
    #[must_use]
    pub fn edge_record(&self, id: EdgeId) -> Option<EdgeRecord> {
        let edge = self.edge(id)?;
        let ends = edge.endpoints();
        Some(EdgeRecord {
            id: id.to_string(),
            from_node: ends.from_node.to_string(),
            from_socket: ends.from_socket,
            to_node: ends.to_node.to_string(),
            to_socket: ends.to_socket,
        })
    }

    /// Flat record views of every node.
    #[must_use]
    pub fn node_records(&self) -> Vec<NodeRecord> {
        self.node_ids()
            .filter_map(|id| self.node_record(id))
            .collect()
    }

    /// Flat record views of every edge.
    #[must_use]
    pub fn edge_records(&self) -> Vec<EdgeRecord> {
        self.edge_ids()
            .filter_map(|id| self.edge_record(id))
            .collect()
    }

    /// Serializes the whole graph: every node record, then every edge
    /// record.
    #[must_use]
    pub fn to_document(&self) -> Document {
        let mut items: Vec<DocumentItem> = Vec::with_capacity(self.node_count() + self.edge_count());
        items.extend(self.node_records().into_iter().map(DocumentItem::Node));
        items.extend(self.edge_records().into_iter().map(DocumentItem::Edge));
        Document::new(items)
    }

    /// Loads a document into this graph: all nodes, then all edges
    /// unresolved, then a resolution pass, inside one batch. A single
    /// [`GraphObserver::on_graph_loaded`](crate::GraphObserver::on_graph_loaded)
    /// is raised at the end with an empty path.
    ///
    /// Bad records never abort the load; the report says what was dropped.
    pub fn load_document(&mut self, doc: &Document) -> LoadReport {
        self.load_document_from(doc, "")
    }

    fn load_document_from(&mut self, doc: &Document, origin: &str) -> LoadReport {
        let mut report = LoadReport {
            records_skipped: doc.skipped_records(),
            ..LoadReport::default()
        };
        self.set_loading(true);
        self.begin_batch();

        // Phase 1: nodes, with sockets sized from the declared counts. The
        // document is authoritative; no template registry is consulted.
        for rec in doc.nodes() {
            let id = match rec.id.parse::<NodeId>() {
                Ok(id) => id,
                Err(err) => {
                    warn!(id = %rec.id, %err, "skipping node record: bad identifier");
                    report.records_skipped += 1;
                    continue;
                }
            };
            let node = match Node::new(
                id,
                rec.kind.as_str(),
                Position::new(rec.x, rec.y),
                rec.inputs,
                rec.outputs,
            ) {
                Ok(node) => node,
                Err(err) => {
                    warn!(node = %id, %err, "skipping node record");
                    report.records_skipped += 1;
                    continue;
                }
            };
            match self.add_node(node) {
                Ok(_) => report.nodes_loaded += 1,
                Err(err) => {
                    warn!(node = %id, %err, "skipping node record");
                    report.records_skipped += 1;
                }
            }
        }

        // Phase 2: edges inserted unresolved, holding raw identifiers.
        let mut pending = Vec::new();
        for rec in doc.edges() {
            let ids = (
                rec.id.parse::<EdgeId>(),
                rec.from_node.parse::<NodeId>(),
                rec.to_node.parse::<NodeId>(),
            );
            let (Ok(id), Ok(from), Ok(to)) = ids else {
                warn!(id = %rec.id, "skipping edge record: bad identifier");
                report.records_skipped += 1;
                continue;
            };
            let ends = Endpoints::new(from, rec.from_socket, to, rec.to_socket);
            match self.add_edge(Edge::unresolved(id, ends)) {
                Ok(_) => pending.push(id),
                Err(err) => {
                    warn!(edge = %id, %err, "skipping edge record");
                    report.records_skipped += 1;
                }
            }
        }

        // Phase 3: resolution against the now-complete node map. Failures
        // drop the offending edge and keep going.
        for id in pending {
            match self.resolve_edge(id) {
                Ok(()) => report.edges_loaded += 1,
                Err(err) => {
                    warn!(edge = %id, %err, "dropping unresolvable edge");
                    self.remove_edge(id);
                    report.edges_dropped += 1;
                }
            }
        }

        self.end_batch();
        self.set_loading(false);
        self.notify_graph_loaded(origin);
        report
    }

    /// Binds an unresolved edge's endpoints, checking both sides.
    ///
    /// Role correctness is structural here: the source index is looked up
    /// among output sockets and the destination index among inputs.
    fn resolve_edge(&mut self, id: EdgeId) -> Result<(), ResolveError> {
        let Some(edge) = self.edges.get(&id) else {
            return Ok(());
        };
        let ends = *edge.endpoints();
        let from = SocketRef::new(ends.from_node, SocketRole::Output, ends.from_socket);
        let to = SocketRef::new(ends.to_node, SocketRole::Input, ends.to_socket);
        for sref in [from, to] {
            let node = self
                .nodes
                .get(&sref.node)
                .ok_or(ResolveError::MissingNode(sref.node))?;
            let socket = node
                .socket(sref.role, sref.index)
                .ok_or(ResolveError::SocketOutOfBounds(sref))?;
            if socket.is_connected() {
                return Err(ResolveError::SocketOccupied(sref));
            }
        }
        self.bind_socket(from, id);
        self.bind_socket(to, id);
        if let Some(edge) = self.edges.get_mut(&id) {
            edge.mark_resolved();
        }
        Ok(())
    }

    /// Writes the graph to a file and raises
    /// [`GraphObserver::on_graph_saved`](crate::GraphObserver::on_graph_saved).
    ///
    /// # Errors
    ///
    /// Fails on serialization or I/O problems; no event is raised then.
    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<(), DocumentError> {
        let path = path.as_ref();
        self.to_document().write_to_path(path)?;
        self.notify_graph_saved(&path.display().to_string());
        Ok(())
    }

    /// Reads and loads a document file.
    ///
    /// # Errors
    ///
    /// Fails on I/O or whole-document errors; per-record problems degrade
    /// the returned report instead.
    pub fn load_from_path(&mut self, path: impl AsRef<Path>) -> Result<LoadReport, DocumentError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let doc = Document::parse(&text)?;
        Ok(self.load_document_from(&doc, &path.display().to_string()))
    }
}

//! Debounced autosave observer.
//!
//! Listens to every graph mutation and keeps a document file up to date,
//! waiting for a quiet period after the last change so rapid edits do not
//! hammer the disk. The engine is single-threaded, so the debounce is
//! host-polled: call [`AutosaveObserver::poll`] from the idle loop.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::core::{EdgeId, NodeId, Position};
use crate::graph::serialize::DocumentError;
use crate::graph::{Graph, GraphObserver};

/// Quiet period before a pending change hits the disk.
const DEFAULT_DELAY: Duration = Duration::from_millis(500);

/// Writes the graph to a file after mutations settle.
#[derive(Debug)]
pub struct AutosaveObserver {
    path: PathBuf,
    delay: Duration,
    enabled: bool,
    last_change: Option<Instant>,
}

impl AutosaveObserver {
    /// Creates an enabled autosaver targeting `path` with the default
    /// quiet period.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delay: DEFAULT_DELAY,
            enabled: true,
            last_change: None,
        }
    }

    /// Retargets the autosave file.
    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.path = path.into();
    }

    /// The current autosave file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Changes the quiet period.
    pub fn set_delay(&mut self, delay: Duration) {
        self.delay = delay;
    }

    /// Enables or disables autosaving. Disabling keeps any pending change
    /// pending; it is written on the next poll after re-enabling.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Whether a change is waiting to be written.
    #[must_use]
    pub fn has_pending_changes(&self) -> bool {
        self.last_change.is_some()
    }

    /// Writes immediately, pending change or not, and clears the debounce.
    ///
    /// # Errors
    ///
    /// Fails on serialization or I/O problems; the pending flag is kept so
    /// a later poll retries.
    pub fn save_now(&mut self, graph: &Graph) -> Result<(), DocumentError> {
        // Write without raising the saved event: this may run while an
        // observer notification is already being dispatched, and this
        // observer must not re-enter the fan-out.
        self.to_disk(graph)?;
        self.last_change = None;
        debug!(path = %self.path.display(), "autosaved");
        Ok(())
    }

    /// Writes the pending change once the quiet period has elapsed.
    /// Returns whether a save happened. Call this from the host idle loop.
    ///
    /// # Errors
    ///
    /// Fails on serialization or I/O problems; the pending flag is kept so
    /// a later poll retries.
    pub fn poll(&mut self, graph: &Graph) -> Result<bool, DocumentError> {
        if !self.enabled {
            return Ok(false);
        }
        let Some(last_change) = self.last_change else {
            return Ok(false);
        };
        if last_change.elapsed() < self.delay {
            return Ok(false);
        }
        self.save_now(graph)?;
        Ok(true)
    }

    fn to_disk(&self, graph: &Graph) -> Result<(), DocumentError> {
        graph.to_document().write_to_path(&self.path).inspect_err(|err| {
            warn!(path = %self.path.display(), %err, "autosave failed");
        })
    }

    fn mark(&mut self) {
        if self.enabled {
            self.last_change = Some(Instant::now());
        }
    }
}

impl GraphObserver for AutosaveObserver {
    fn on_node_added(&mut self, _graph: &Graph, _node: NodeId) {
        self.mark();
    }

    fn on_node_removed(&mut self, _graph: &Graph, _node: NodeId) {
        self.mark();
    }

    fn on_node_moved(&mut self, _graph: &Graph, _node: NodeId, _old: Position, _new: Position) {
        self.mark();
    }

    fn on_edge_added(&mut self, _graph: &Graph, _edge: EdgeId) {
        self.mark();
    }

    fn on_edge_removed(&mut self, _graph: &Graph, _edge: EdgeId) {
        self.mark();
    }

    fn on_graph_cleared(&mut self, _graph: &Graph) {
        self.mark();
    }
}

#[cfg(test)]
mod test {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::graph::test::node;
    use crate::graph::SharedObserver;
    use crate::graph::serialize::Document;

    #[test]
    fn mutations_mark_pending_changes() {
        let dir = tempfile::tempdir().unwrap();
        let saver = Rc::new(RefCell::new(AutosaveObserver::new(
            dir.path().join("autosave.json"),
        )));
        let shared: SharedObserver = saver.clone();

        let mut graph = Graph::new();
        graph.attach(shared);
        assert!(!saver.borrow().has_pending_changes());

        graph.add_node(node("SOURCE", 0, 1)).unwrap();
        assert!(saver.borrow().has_pending_changes());
    }

    #[test]
    fn poll_waits_for_the_quiet_period() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("autosave.json");
        let saver = Rc::new(RefCell::new(AutosaveObserver::new(path.clone())));
        let shared: SharedObserver = saver.clone();

        saver.borrow_mut().set_delay(Duration::from_secs(3600));
        let mut graph = Graph::new();
        graph.attach(shared);
        graph.add_node(node("SOURCE", 0, 1)).unwrap();

        // quiet period not yet elapsed
        assert!(!saver.borrow_mut().poll(&graph).unwrap());
        assert!(!path.exists());

        // with no delay the pending change flushes right away
        saver.borrow_mut().set_delay(Duration::ZERO);
        assert!(saver.borrow_mut().poll(&graph).unwrap());
        assert!(path.exists());
        assert!(!saver.borrow().has_pending_changes());
        assert!(!saver.borrow_mut().poll(&graph).unwrap());

        let doc = Document::parse(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(doc.nodes().count(), 1);
    }

    #[test]
    fn disabled_autosaver_ignores_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("autosave.json");
        let saver = Rc::new(RefCell::new(AutosaveObserver::new(path.clone())));
        saver.borrow_mut().set_enabled(false);
        let shared: SharedObserver = saver.clone();

        let mut graph = Graph::new();
        graph.attach(shared);
        graph.add_node(node("SOURCE", 0, 1)).unwrap();

        assert!(!saver.borrow().has_pending_changes());
        saver.borrow_mut().set_delay(Duration::ZERO);
        assert!(!saver.borrow_mut().poll(&graph).unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn save_now_writes_unconditionally() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("autosave.json");
        let mut saver = AutosaveObserver::new(path.clone());

        let graph = Graph::new();
        saver.save_now(&graph).unwrap();
        assert!(path.exists());
    }
}

//! Node type templates.
//!
//! The engine hardcodes no node types; interactive creation asks a
//! [`TemplateProvider`] for the socket complement of a type tag. The
//! [`TemplateRegistry`] is the default provider, shipping the built-in
//! types and accepting runtime registrations from plugins or scripts.

use indexmap::IndexMap;
use itertools::Itertools;
use smol_str::SmolStr;

/// The socket complement a node type declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Template {
    /// Number of input sockets.
    pub inputs: usize,
    /// Number of output sockets.
    pub outputs: usize,
}

impl Template {
    /// Creates a template.
    #[must_use]
    pub fn new(inputs: usize, outputs: usize) -> Self {
        Self { inputs, outputs }
    }
}

/// Answers "is this type tag known, and what sockets does it get".
pub trait TemplateProvider {
    /// The template for a type tag, if the tag is known.
    fn template(&self, kind: &str) -> Option<Template>;

    /// Whether the type tag is known.
    fn contains(&self, kind: &str) -> bool {
        self.template(kind).is_some()
    }
}

/// Built-in node types shipped with the engine.
const BUILTINS: [(&str, Template); 5] = [
    ("SOURCE", Template { inputs: 0, outputs: 1 }),
    ("SINK", Template { inputs: 1, outputs: 0 }),
    ("SPLIT", Template { inputs: 1, outputs: 2 }),
    ("MERGE", Template { inputs: 2, outputs: 1 }),
    ("TRANSFORM", Template { inputs: 1, outputs: 1 }),
];

/// Runtime-extensible template provider.
///
/// Registered templates may shadow built-ins, but built-ins cannot be
/// removed.
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    registered: IndexMap<SmolStr, Template>,
}

impl TemplateRegistry {
    /// Creates a registry holding only the built-in types.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or shadows) a node type.
    pub fn register(&mut self, kind: impl Into<SmolStr>, template: Template) {
        self.registered.insert(kind.into(), template);
    }

    /// Removes a registered type; a shadowed built-in shows through again.
    /// Returns `false` for unknown tags and for built-ins, which cannot be
    /// removed.
    pub fn unregister(&mut self, kind: &str) -> bool {
        self.registered.shift_remove(kind).is_some()
    }

    /// Drops every registered type, keeping the built-ins. Useful when
    /// reloading plugins.
    pub fn clear_registered(&mut self) {
        self.registered.clear();
    }

    /// All known type tags, built-in and registered, sorted and
    /// de-duplicated.
    #[must_use]
    pub fn available_types(&self) -> Vec<SmolStr> {
        BUILTINS
            .iter()
            .map(|(kind, _)| SmolStr::new_static(kind))
            .chain(self.registered.keys().cloned())
            .sorted()
            .dedup()
            .collect()
    }
}

impl TemplateProvider for TemplateRegistry {
    fn template(&self, kind: &str) -> Option<Template> {
        self.registered.get(kind).copied().or_else(|| {
            BUILTINS
                .iter()
                .find(|(name, _)| *name == kind)
                .map(|(_, template)| *template)
        })
    }
}

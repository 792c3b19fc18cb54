//! Standard command line tools, used by the `patchgraph` binary.

use std::ffi::OsString;
use std::io::Read;

use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use clio::Input;
use patchgraph::graph::validate::IntegrityError;
use patchgraph::{Document, DocumentError, Graph, LoadReport};
use thiserror::Error;

pub mod describe;
pub mod validate;

/// CLI arguments.
#[derive(Parser, Debug)]
#[clap(version = "1.0", long_about = None)]
#[clap(about = "Patchgraph document tools.")]
#[group(id = "patchgraph")]
#[non_exhaustive]
pub enum CliArgs {
    /// Validate a patchgraph document.
    Validate(validate::ValArgs),
    /// Print the node and edge records of a document.
    Describe(describe::DescribeArgs),
    /// External commands
    #[command(external_subcommand)]
    External(Vec<OsString>),
}

/// Error type for the CLI.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CliError {
    /// Error reading input.
    #[error("Error reading from input: {0}")]
    InputFile(#[from] std::io::Error),
    /// Error parsing or loading the document.
    #[error(transparent)]
    Document(#[from] DocumentError),
    /// The loaded graph has a broken cross-reference.
    #[error("Integrity check failed: {0}")]
    Integrity(#[from] IntegrityError),
    /// The document loaded, but records were dropped.
    #[error("Document loaded with {dropped} dropped or skipped record(s)")]
    Degraded {
        /// Total records that did not make it into the graph.
        dropped: usize,
    },
}

/// Arguments shared by all document-reading commands.
#[derive(Parser, Debug)]
pub struct GraphArgs {
    /// Input document, use '-' for stdin.
    #[clap(value_parser, default_value = "-")]
    pub input: Input,
    /// Verbosity.
    #[command(flatten)]
    pub verbose: Verbosity<InfoLevel>,
}

impl GraphArgs {
    /// Reads the input and replays it through the engine.
    ///
    /// # Errors
    ///
    /// Fails on I/O or whole-document errors; degraded loads are reported
    /// through the [`LoadReport`], not as an error.
    pub fn load_graph(&mut self) -> Result<(Graph, LoadReport), CliError> {
        let mut text = String::new();
        self.input.read_to_string(&mut text)?;
        let doc = Document::parse(&text)?;
        let mut graph = Graph::new();
        let report = graph.load_document(&doc);
        Ok((graph, report))
    }
}

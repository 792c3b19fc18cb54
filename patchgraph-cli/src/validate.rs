//! The `validate` subcommand.

use anyhow::Result;
use clap::Parser;
use tracing::info;

use crate::{CliError, GraphArgs};

/// Validate a patchgraph document.
#[derive(Parser, Debug)]
#[clap(version = "1.0", long_about = None)]
#[clap(about = "Validate a patchgraph document.")]
#[group(id = "patchgraph")]
#[non_exhaustive]
pub struct ValArgs {
    /// Document input.
    #[command(flatten)]
    pub input_args: GraphArgs,
    /// Accept documents that load with dropped records.
    #[arg(long, help = "Exit successfully even if records were dropped.")]
    pub allow_degraded: bool,
}

/// String to print when validation is successful.
pub const VALID_PRINT: &str = "Document valid!";

impl ValArgs {
    /// Loads the document, runs the integrity check, and reports.
    ///
    /// # Errors
    ///
    /// Fails when the document cannot be read, the integrity check finds a
    /// broken reference, or (without `--allow-degraded`) records were
    /// dropped during loading.
    pub fn run(&mut self) -> Result<()> {
        let (graph, report) = self.input_args.load_graph()?;
        graph.validate().map_err(CliError::Integrity)?;

        let dropped = report.records_skipped + report.edges_dropped;
        if dropped > 0 && !self.allow_degraded {
            return Err(CliError::Degraded { dropped }.into());
        }

        let stats = graph.stats();
        info!(
            nodes = stats.node_count,
            edges = stats.edge_count,
            dropped,
            "document loaded"
        );
        println!("{VALID_PRINT}");
        println!(
            "nodes: {}, edges: {}, unresolved: {}",
            stats.node_count,
            stats.edge_count,
            graph.unresolved_edge_count()
        );
        Ok(())
    }
}

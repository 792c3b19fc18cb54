//! The `describe` subcommand.

use std::io::Write;

use anyhow::Result;
use clap::Parser;

use crate::GraphArgs;

/// Print the node and edge records of a document.
#[derive(Parser, Debug)]
#[clap(version = "1.0", long_about = None)]
#[clap(about = "Print the node and edge records of a document.")]
#[group(id = "patchgraph")]
#[non_exhaustive]
pub struct DescribeArgs {
    /// Document input.
    #[command(flatten)]
    pub input_args: GraphArgs,
}

impl DescribeArgs {
    /// Loads the document and prints its records to stdout.
    ///
    /// # Errors
    ///
    /// Fails when the document cannot be read.
    pub fn run(&mut self) -> Result<()> {
        self.run_print(&mut std::io::stdout())
    }

    /// Loads the document and prints its records to `out`.
    ///
    /// # Errors
    ///
    /// Fails when the document cannot be read or written out.
    pub fn run_print(&mut self, out: &mut impl Write) -> Result<()> {
        let (graph, report) = self.input_args.load_graph()?;

        writeln!(out, "nodes: {}", graph.node_count())?;
        for id in graph.node_ids() {
            if let Some(rec) = graph.node_record(id) {
                writeln!(
                    out,
                    "  {} {} at ({}, {}) [{} in / {} out]",
                    rec.id, rec.kind, rec.x, rec.y, rec.inputs, rec.outputs
                )?;
            }
        }

        writeln!(out, "edges: {}", graph.edge_count())?;
        for id in graph.edge_ids() {
            if let Some(rec) = graph.edge_record(id) {
                writeln!(
                    out,
                    "  {} {}[{}] -> {}[{}]",
                    rec.id, rec.from_node, rec.from_socket, rec.to_node, rec.to_socket
                )?;
            }
        }

        let dropped = report.records_skipped + report.edges_dropped;
        if dropped > 0 {
            writeln!(out, "dropped records: {dropped}")?;
        }
        Ok(())
    }
}

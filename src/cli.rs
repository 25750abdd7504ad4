//! Command-line front end: argument parsing and the top-level run loop that
//! wires descriptor loading, sorting, mapping, and report emission together.

use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use crate::automaton::sort_by_size_desc;
use crate::chip::{map_batch, Chip};
use crate::config::FabricConfig;
use crate::error::Result;
use crate::graph::Graph;
use crate::partitioner::GreedyKwayPartitioner;
use crate::{parser, report};

/// Place-and-route compiler for the Automata Processor fabric.
#[derive(Debug, Parser)]
#[command(name = "apmap", version, about)]
pub struct Cli {
    /// Descriptor (map) files to place, each listing one or more automata.
    #[arg(required = true)]
    pub map_files: Vec<PathBuf>,

    /// Disable the 4-way global switch.
    #[arg(long)]
    pub no_g4: bool,

    /// Disable cost-driven partition-count search; accept the first valid
    /// partitioning found.
    #[arg(long)]
    pub no_opt: bool,
}

impl Cli {
    pub fn config(&self) -> FabricConfig {
        FabricConfig {
            has_g4: !self.no_g4,
            optimize: !self.no_opt,
            ..FabricConfig::default()
        }
    }
}

/// Run a full batch: load every descriptor file, sort automata largest
/// first, map them across `cfg.chip_num` chips, and write `map_result`.
/// Returns the final tiles-in-total statistic on success.
pub fn run(cli: &Cli) -> Result<f64> {
    let cfg = cli.config();

    let mut automata = parser::load_batch(&cli.map_files)?;
    sort_by_size_desc(&mut automata);
    info!(count = automata.len(), "loaded automata batch");

    let max_nstate = automata.iter().map(|a| a.nstate).max().unwrap_or(0);
    let max_nedge = automata.iter().map(|a| a.nedge).max().unwrap_or(0);
    let mut graph = Graph::with_capacity(max_nstate, max_nedge);

    let mut chips: Vec<Chip> = (0..cfg.chip_num).map(|_| Chip::new(&cfg)).collect();
    let partitioner = GreedyKwayPartitioner;

    map_batch(&mut chips, &mut automata, &mut graph, &partitioner, &cfg)?;

    report::write_map_result(std::path::Path::new("map_result"), &chips, &cfg)?;
    let total = report::tiles_in_total(&chips, &cfg);
    info!(tiles_in_total = total, "batch complete");
    Ok(total)
}

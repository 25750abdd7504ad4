//! Place-and-route compiler for the Automata Processor fabric.
//!
//! Given a batch of connected-component automata graphs, assigns every
//! state to a tile slot on one of the fabric's chips, resolving per-tile
//! fan-in/fan-out overflow by duplicating tiles and routing cross-tile
//! traffic through the global switches. See [`cli::run`] for the
//! end-to-end entry point; the modules below are usable independently for
//! programmatic placement.
//!
//! # Quick start
//!
//! ```no_run
//! use apmap::chip::{map_batch, Chip};
//! use apmap::config::FabricConfig;
//! use apmap::graph::Graph;
//! use apmap::parser::load_batch;
//! use apmap::partitioner::GreedyKwayPartitioner;
//! use apmap::automaton::sort_by_size_desc;
//! use std::path::PathBuf;
//!
//! # fn run() -> apmap::error::Result<()> {
//! let cfg = FabricConfig::default();
//! let mut automata = load_batch(&[PathBuf::from("batch.map")])?;
//! sort_by_size_desc(&mut automata);
//!
//! let max_nstate = automata.iter().map(|a| a.nstate).max().unwrap_or(0);
//! let max_nedge = automata.iter().map(|a| a.nedge).max().unwrap_or(0);
//! let mut graph = Graph::with_capacity(max_nstate, max_nedge);
//! let mut chips: Vec<Chip> = (0..cfg.chip_num).map(|_| Chip::new(&cfg)).collect();
//!
//! map_batch(&mut chips, &mut automata, &mut graph, &GreedyKwayPartitioner, &cfg)?;
//! # Ok(())
//! # }
//! ```

pub mod automaton;
pub mod chip;
pub mod cli;
pub mod config;
pub mod error;
pub mod graph;
pub mod list;
pub mod parser;
pub mod partitioner;
pub mod planner;
pub mod report;
pub mod resolver;
pub mod switch;
pub mod tile;

pub use chip::Chip;
pub use config::FabricConfig;
pub use error::{ApMapError, Result};
pub use graph::Graph;

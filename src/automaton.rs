//! Batch-level bookkeeping for the automata a run is asked to place.

use std::cmp::Ordering;
use std::path::PathBuf;

/// One connected-component automaton as listed in the descriptor file.
#[derive(Debug, Clone)]
pub struct AutomatonDescriptor {
    pub nstate: usize,
    pub nedge: usize,
    pub path: PathBuf,
    pub mapped: bool,
}

impl AutomatonDescriptor {
    pub fn new(nstate: usize, nedge: usize, path: PathBuf) -> Self {
        Self { nstate, nedge, path, mapped: false }
    }
}

/// Batch ordering rule: largest automata first, by state count then edge
/// count, both descending. Ties keep their relative input order since
/// `sort_by` is stable.
pub fn sort_by_size_desc(automata: &mut [AutomatonDescriptor]) {
    automata.sort_by(compare_size_desc);
}

fn compare_size_desc(a: &AutomatonDescriptor, b: &AutomatonDescriptor) -> Ordering {
    b.nstate.cmp(&a.nstate).then_with(|| b.nedge.cmp(&a.nedge))
}

/// Among still-unmapped automata, find the largest one whose state count
/// fits within `capacity`. Used by the chip coordinator to pack small
/// automata into leftover tile space after closing a tile.
pub fn largest_fitting(automata: &[AutomatonDescriptor], capacity: usize) -> Option<usize> {
    automata
        .iter()
        .enumerate()
        .filter(|(_, a)| !a.mapped && a.nstate <= capacity)
        .max_by(|(_, a), (_, b)| a.nstate.cmp(&b.nstate).then_with(|| a.nedge.cmp(&b.nedge)))
        .map(|(i, _)| i)
}

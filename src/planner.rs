//! Partition planner: drives the partitioner adaptor over candidate
//! `(npart, tailsize)` shapes to minimize placement cost, and retains
//! alternatives for the chip coordinator to retry on allocation failure.

use crate::config::FabricConfig;
use crate::graph::{Graph, UndirectedGraph};
use crate::list::{ChoiceList, PartitionChoice};
use crate::partitioner::{classify, GraphPartitioner, PartitionOutcome};

/// The result of a successful planning pass: the `Graph`'s `where_`/`npart`
/// are left set to this outcome.
#[derive(Debug, Clone, Copy)]
pub struct PlanOutcome {
    pub npart: usize,
    pub tailsize: usize,
    pub cost: usize,
}

fn initial_npart(nvtxs: usize, headsize: usize, tile_size: usize) -> usize {
    if nvtxs <= headsize {
        return 1;
    }
    (nvtxs - headsize).div_ceil(tile_size) + 1
}

fn tailsize_for(npart: usize, headsize: usize, total: usize, tile_size: usize) -> usize {
    if npart <= 1 {
        return total;
    }
    let interior = tile_size * npart.saturating_sub(2);
    total.saturating_sub(headsize).saturating_sub(interior).clamp(1, tile_size)
}

fn target_weights(npart: usize, headsize: usize, tailsize: usize, total: usize, tile_size: usize) -> Vec<f64> {
    if npart <= 1 {
        return vec![1.0];
    }
    let total = total.max(1) as f64;
    let mut w = vec![tile_size as f64 / total; npart];
    w[0] = headsize as f64 / total;
    w[npart - 1] = tailsize as f64 / total;
    w
}

/// `Σ_p (ceil(nin[p]/M) * ceil(nout[p]/M) - 1)`, each factor floored at 1.
pub fn boundary_overhead(nin: &[usize], nout: &[usize], cfg: &FabricConfig) -> usize {
    let m = cfg.max_out();
    nin.iter()
        .zip(nout)
        .map(|(&i, &o)| i.div_ceil(m).max(1) * o.div_ceil(m).max(1) - 1)
        .sum()
}

/// Run one partition attempt at exactly `(npart, tailsize)` and apply it to
/// `graph` if the shape turns out valid, recording the resulting cost.
/// Returns `None` on `HeadOverflow`/`TileOverflow`.
fn attempt(
    partitioner: &dyn GraphPartitioner,
    graph: &mut Graph,
    undirected: &UndirectedGraph,
    npart: usize,
    tailsize: usize,
    headsize: usize,
    cfg: &FabricConfig,
) -> Option<PlanOutcome> {
    let tpwgts = target_weights(npart, headsize, tailsize, graph.nvtxs, cfg.tile_size);
    let where_ = partitioner.partition(undirected, npart, &tpwgts);
    let mut adjusted = npart;
    let outcome = classify(&where_, &mut adjusted, headsize, cfg.tile_size);
    if outcome != PartitionOutcome::Valid {
        return None;
    }

    graph.where_ = where_;
    graph.npart = adjusted;
    let (nin, nout) = graph.count_boundary_nodes();
    let cost = adjusted + boundary_overhead(&nin, &nout, cfg);
    graph.cost = cost;
    Some(PlanOutcome { npart: adjusted, tailsize, cost })
}

/// Plan a partitioning for `graph`, either searching a cost-minimizing
/// sequence of `npart` values (`optimize = true`, Mode A) or accepting the
/// first valid shape (`optimize = false`, Mode B). On success, `graph`'s
/// `where_`/`npart`/`cost`/`ext` reflect the winning shape, and the
/// returned `ChoiceList` holds every other valid shape seen, for the
/// coordinator to retry if the winning shape later fails allocation.
pub fn plan(
    partitioner: &dyn GraphPartitioner,
    graph: &mut Graph,
    undirected: &UndirectedGraph,
    headsize: usize,
    cfg: &FabricConfig,
    optimize: bool,
) -> Option<(PlanOutcome, ChoiceList)> {
    let mut choices = ChoiceList::new();
    let start = initial_npart(graph.nvtxs, headsize, cfg.tile_size);
    let max_npart = graph.nvtxs.max(1);

    if !optimize {
        let mut npart = start;
        while npart <= max_npart {
            let tailsize = tailsize_for(npart, headsize, graph.nvtxs, cfg.tile_size);
            if let Some(outcome) = attempt(partitioner, graph, undirected, npart, tailsize, headsize, cfg) {
                return Some((outcome, choices));
            }
            npart += 1;
        }
        return None;
    }

    let mut incumbent: Option<PlanOutcome> = None;
    let mut last_tried: Option<(usize, usize)> = None;
    let mut npart = start;

    while npart <= max_npart {
        if let Some(inc) = incumbent {
            if npart >= inc.cost {
                break;
            }
        }
        let tailsize = tailsize_for(npart, headsize, graph.nvtxs, cfg.tile_size);
        if let Some(outcome) = attempt(partitioner, graph, undirected, npart, tailsize, headsize, cfg) {
            last_tried = Some((outcome.npart, outcome.tailsize));
            match incumbent {
                None => incumbent = Some(outcome),
                Some(inc) if outcome.cost < inc.cost => {
                    choices.push(inc.npart, inc.tailsize);
                    incumbent = Some(outcome);
                }
                Some(_) => {
                    // Equal or higher cost: kept as an explicit alternative
                    // rather than silently dropped (spec.md Open Question 2).
                    choices.push(outcome.npart, outcome.tailsize);
                }
            }
        }
        npart += 1;
    }

    let incumbent = incumbent?;
    if last_tried != Some((incumbent.npart, incumbent.tailsize)) {
        attempt(partitioner, graph, undirected, incumbent.npart, incumbent.tailsize, headsize, cfg);
    }
    Some((incumbent, choices))
}

/// Re-plan at an exact `(npart, tailsize)` popped from the choice list,
/// for retry after an allocation failure.
pub fn replan(
    partitioner: &dyn GraphPartitioner,
    graph: &mut Graph,
    undirected: &UndirectedGraph,
    headsize: usize,
    cfg: &FabricConfig,
    choice: PartitionChoice,
) -> Option<PlanOutcome> {
    attempt(partitioner, graph, undirected, choice.npart, choice.tailsize, headsize, cfg)
}

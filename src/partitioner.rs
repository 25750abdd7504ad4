//! The k-way partitioner boundary and the in-process partitioner that
//! stands in for an external graph-partitioning library.
//!
//! The original implementation calls out to METIS. Spec-wise this is an
//! opaque dependency with a pure contract: `(graph, npart, tpwgts) ->
//! where[]`. `GraphPartitioner` is that contract as a trait, and
//! `GreedyKwayPartitioner` is a from-scratch, deterministic implementation
//! of it, so the crate has no external graph-partitioning dependency.

use crate::graph::UndirectedGraph;

/// Classification of a candidate partitioning, mirroring the adaptor's
/// three-way verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionOutcome {
    /// Partition 0 exceeds `headsize`.
    HeadOverflow,
    /// Some partition exceeds `tile_size`.
    TileOverflow,
    /// Every partition respects its cap.
    Valid,
}

/// Pure contract for a k-way edge-cut graph partitioner with per-part
/// target weights. `tpwgts` sums to (approximately) 1 and has `npart`
/// entries; a conforming implementation need not reproduce METIS's
/// internals, only its interface and determinism.
pub trait GraphPartitioner {
    /// Partition `graph` into `npart` parts, targeting the relative sizes
    /// in `tpwgts`. Returns `where_[v]` for every vertex `v`.
    fn partition(&self, graph: &UndirectedGraph, npart: usize, tpwgts: &[f64]) -> Vec<usize>;
}

/// A deterministic recursive-bisection partitioner: repeated greedy
/// graph-growing bisection, refined by a bounded number of
/// Kernighan-Lin-style boundary swaps, weighted at each split by the
/// relative target sizes of the two halves it is about to produce.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyKwayPartitioner;

impl GraphPartitioner for GreedyKwayPartitioner {
    fn partition(&self, graph: &UndirectedGraph, npart: usize, tpwgts: &[f64]) -> Vec<usize> {
        if npart <= 1 || graph.nvtxs == 0 {
            return vec![0; graph.nvtxs];
        }

        let mut where_ = vec![0usize; graph.nvtxs];
        let order: Vec<usize> = (0..graph.nvtxs).collect();
        bisect_recursive(graph, &order, 0, npart, tpwgts, &mut where_);
        refine_boundaries(graph, npart, &mut where_);
        where_
    }
}

/// Assign every vertex in `members` a part in `[part_lo, part_lo+npart)`,
/// splitting recursively by growing a region from a seed vertex until it
/// reaches its target share of `members`, then recursing on both halves.
fn bisect_recursive(
    graph: &UndirectedGraph,
    members: &[usize],
    part_lo: usize,
    npart: usize,
    tpwgts: &[f64],
    where_: &mut [usize],
) {
    if npart == 1 || members.len() <= 1 {
        for &v in members {
            where_[v] = part_lo;
        }
        return;
    }

    let left_parts = npart / 2;
    let right_parts = npart - left_parts;
    let left_weight: f64 = tpwgts[part_lo..part_lo + left_parts].iter().sum();
    let right_weight: f64 = tpwgts[part_lo + left_parts..part_lo + npart].iter().sum();
    let total_weight = left_weight + right_weight;
    let left_target = if total_weight > 0.0 {
        ((left_weight / total_weight) * members.len() as f64).round() as usize
    } else {
        members.len() / 2
    }
    .clamp(1, members.len() - 1);

    let (left, right) = grow_region(graph, members, left_target);

    bisect_recursive(graph, &left, part_lo, left_parts, tpwgts, where_);
    bisect_recursive(graph, &right, part_lo + left_parts, right_parts, tpwgts, where_);
}

/// Greedy graph-growing bisection: start from the lowest-index member, then
/// repeatedly admit whichever unassigned neighbor of the growing frontier
/// appears first in `members`' order, until the region reaches `target`
/// size. Deterministic: no randomness, ties broken by `members` order.
fn grow_region(graph: &UndirectedGraph, members: &[usize], target: usize) -> (Vec<usize>, Vec<usize>) {
    use std::collections::HashSet;

    let member_set: HashSet<usize> = members.iter().copied().collect();
    let mut in_region: HashSet<usize> = HashSet::with_capacity(target);
    let mut region = Vec::with_capacity(target);
    let mut frontier = vec![members[0]];
    in_region.insert(members[0]);
    region.push(members[0]);

    while region.len() < target && !frontier.is_empty() {
        let mut next_frontier = Vec::new();
        'outer: for &u in &frontier {
            for &v in &graph.adjncy[graph.xadj[u]..graph.xadj[u + 1]] {
                if member_set.contains(&v) && !in_region.contains(&v) {
                    in_region.insert(v);
                    region.push(v);
                    next_frontier.push(v);
                    if region.len() == target {
                        break 'outer;
                    }
                }
            }
        }
        if next_frontier.is_empty() {
            // Region disconnected from remaining members: admit the next
            // unvisited member in input order to keep progressing.
            if let Some(&v) = members.iter().find(|v| !in_region.contains(v)) {
                in_region.insert(v);
                region.push(v);
                next_frontier.push(v);
            } else {
                break;
            }
        }
        frontier = next_frontier;
    }

    let rest: Vec<usize> = members.iter().copied().filter(|v| !in_region.contains(v)).collect();
    (region, rest)
}

/// Bounded Kernighan-Lin-style refinement: repeatedly move a boundary
/// vertex to the part most of its neighbors belong to, if that reduces the
/// vertex's external-edge count and the destination part stays no larger
/// than the source part was before the move. Runs until no move improves
/// the cut or a small iteration cap is hit, whichever comes first.
fn refine_boundaries(graph: &UndirectedGraph, npart: usize, where_: &mut [usize]) {
    const MAX_PASSES: usize = 4;
    if npart <= 1 {
        return;
    }

    for _ in 0..MAX_PASSES {
        let mut part_size = vec![0usize; npart];
        for &p in where_.iter() {
            part_size[p] += 1;
        }

        let mut moved = false;
        for v in 0..graph.nvtxs {
            let home = where_[v];
            let mut neighbor_count = vec![0usize; npart];
            for &u in &graph.adjncy[graph.xadj[v]..graph.xadj[v + 1]] {
                neighbor_count[where_[u]] += 1;
            }
            let external_home = neighbor_count.iter().sum::<usize>() - neighbor_count[home];
            if external_home == 0 {
                continue;
            }
            if let Some((best_part, &best_count)) = neighbor_count
                .iter()
                .enumerate()
                .filter(|&(p, _)| p != home)
                .max_by_key(|&(_, c)| *c)
            {
                let internal_home = neighbor_count[home];
                if best_count > internal_home && part_size[best_part] + 1 <= part_size[home] {
                    part_size[home] -= 1;
                    part_size[best_part] += 1;
                    where_[v] = best_part;
                    moved = true;
                }
            }
        }
        if !moved {
            break;
        }
    }
}

/// Classify a completed partitioning against the head/tile size caps, and
/// drop the last part from `npart` if it ended up empty.
pub fn classify(where_: &[usize], npart: &mut usize, headsize: usize, tile_size: usize) -> PartitionOutcome {
    let mut sizes = vec![0usize; *npart];
    for &p in where_ {
        sizes[p] += 1;
    }
    if sizes.last() == Some(&0) {
        *npart -= 1;
        sizes.pop();
    }

    if sizes.first().copied().unwrap_or(0) > headsize {
        return PartitionOutcome::HeadOverflow;
    }
    if sizes.iter().any(|&s| s > tile_size) {
        return PartitionOutcome::TileOverflow;
    }
    PartitionOutcome::Valid
}

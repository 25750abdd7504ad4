//! The current automaton's graph: adjacency, per-state metadata, and the
//! partition bookkeeping (`where`, `pos`, `ext`) the planner/resolver/
//! materializer mutate as placement proceeds.
//!
//! One `Graph` is reused across automata in a batch (`reset`), rather than
//! allocated per automaton — the worst-case capacity is set once by the
//! caller from the largest automaton in the batch, mirroring the single
//! reusable buffer pair the original implementation pre-sizes.

use std::collections::HashSet;

use crate::list::IndexList;

/// Index of a state (vertex) within the current automaton.
pub type StateId = usize;
/// Index of a partition within the current automaton's partitioning.
pub type PartId = usize;

/// Per-state metadata carried through to tile emission: symbolic name,
/// start/report flags, and the eight 32-bit pattern words.
#[derive(Debug, Clone)]
pub struct StateMeta {
    pub name: String,
    pub start: bool,
    pub report: bool,
    pub pattern: [u32; 8],
}

/// The directed automaton graph plus placement bookkeeping.
///
/// `xadj`/`adjncy` are a CSR encoding of the directed edges: state `v`'s
/// out-edges are `adjncy[xadj[v]..xadj[v+1]]`.
#[derive(Debug, Clone)]
pub struct Graph {
    pub nvtxs: usize,
    /// Declared edge count for the automaton currently loaded, checked by
    /// the parser against the number of successor entries it actually finds.
    pub nedges: usize,
    pub xadj: Vec<usize>,
    pub adjncy: Vec<StateId>,
    pub meta: Vec<StateMeta>,

    /// Number of partitions the graph is currently divided into.
    pub npart: usize,
    /// Partition index of each state.
    pub where_: Vec<PartId>,
    /// Slot position within its tile, filled in by the materializer.
    pub pos: Vec<usize>,
    /// Per-state ordered, duplicate-free set of destination partitions that
    /// at least one of its out-edges crosses into.
    pub ext: Vec<IndexList>,
    /// Placement cost: `npart + boundary_overhead`, updated as the
    /// constraint resolver creates duplicate tiles.
    pub cost: usize,
}

impl Graph {
    /// Allocate a graph sized for the given worst-case vertex/edge counts.
    /// Capacity is reserved but vectors are left at the lengths `reset`
    /// would produce for `(nvtxs, nedges)`.
    pub fn with_capacity(nvtxs: usize, nedges: usize) -> Self {
        let mut g = Graph {
            nvtxs: 0,
            nedges: 0,
            xadj: Vec::with_capacity(nvtxs + 1),
            adjncy: Vec::with_capacity(nedges),
            meta: Vec::with_capacity(nvtxs),
            npart: 0,
            where_: Vec::with_capacity(nvtxs),
            pos: Vec::with_capacity(nvtxs),
            ext: Vec::with_capacity(nvtxs),
            cost: 0,
        };
        g.reset(0, 0);
        g
    }

    /// Reset the graph to represent a new automaton with `nvtxs` states and
    /// room for `nedges` directed edges, clearing all previous content.
    pub fn reset(&mut self, nvtxs: usize, nedges: usize) {
        self.nvtxs = nvtxs;
        self.nedges = nedges;
        self.xadj = vec![0; nvtxs + 1];
        self.adjncy = Vec::with_capacity(nedges);
        self.meta = Vec::with_capacity(nvtxs);
        self.npart = 0;
        self.where_ = vec![0; nvtxs];
        self.pos = vec![usize::MAX; nvtxs];
        self.ext = vec![IndexList::new(); nvtxs];
        self.cost = 0;
    }

    /// Build the undirected companion graph used by the partitioner.
    ///
    /// Every directed edge `u -> v` contributes an entry to both `u`'s and
    /// `v`'s undirected adjacency, unless the reverse edge `v -> u` is also
    /// present in the directed graph — in which case processing `v`'s own
    /// out-edges already adds the connection, so it is not duplicated.
    /// Self-loops are excluded. This is the O(V+E) dedup the original
    /// implementation achieves with per-vertex linked lists; a hash-set
    /// membership check gives the same complexity with less bookkeeping.
    pub fn undirected_companion(&self) -> UndirectedGraph {
        let n = self.nvtxs;
        let mut directed_edges: HashSet<(StateId, StateId)> = HashSet::with_capacity(self.adjncy.len());
        for u in 0..n {
            for &v in &self.adjncy[self.xadj[u]..self.xadj[u + 1]] {
                directed_edges.insert((u, v));
            }
        }

        let mut adj: Vec<IndexList> = vec![IndexList::new(); n];
        for u in 0..n {
            for &v in &self.adjncy[self.xadj[u]..self.xadj[u + 1]] {
                if v == u {
                    continue;
                }
                adj[u].add_new(v);
                if !directed_edges.contains(&(v, u)) {
                    adj[v].add_new(u);
                }
            }
        }

        let mut xadj = vec![0usize; n + 1];
        let mut adjncy = Vec::with_capacity(adj.iter().map(IndexList::len).sum());
        for (i, list) in adj.iter().enumerate() {
            xadj[i] = adjncy.len();
            adjncy.extend_from_slice(list.as_slice());
        }
        xadj[n] = adjncy.len();

        UndirectedGraph { nvtxs: n, xadj, adjncy }
    }

    /// Recompute `ext[]` and return per-partition `(nin, nout)` boundary
    /// counts for the current `where_` assignment and `npart`.
    ///
    /// `nin[p]` is the number of distinct `(state, p)` boundary pairs
    /// entering partition `p`; `nout[p]` is the number of states in `p` that
    /// have at least one external destination.
    pub fn count_boundary_nodes(&mut self) -> (Vec<usize>, Vec<usize>) {
        let mut nin = vec![0usize; self.npart];
        let mut nout = vec![0usize; self.npart];

        for v in 0..self.nvtxs {
            let home = self.where_[v];
            self.ext[v].clear();
            for &to in &self.adjncy[self.xadj[v]..self.xadj[v + 1]] {
                let dest = self.where_[to];
                if dest != home && self.ext[v].add_new(dest) {
                    nin[dest] += 1;
                }
            }
            if !self.ext[v].is_empty() {
                nout[home] += 1;
            }
        }
        (nin, nout)
    }

    /// Renumber every partition index greater than `pos` upward by `num`,
    /// in both `where_` and every `ext[]`, then grow `npart` by `num`. Used
    /// by the constraint resolver when it splits a partition into
    /// duplicate tiles.
    pub fn insert_duplicate(&mut self, pos: PartId, num: usize) {
        for v in 0..self.nvtxs {
            if self.where_[v] > pos {
                self.where_[v] += num;
            }
            for entry in self.ext[v].as_slice().to_vec() {
                if entry > pos {
                    self.ext[v].change(entry, entry + num);
                }
            }
        }
        self.npart += num;
    }
}

/// The undirected companion graph fed to the partitioner. Carries no
/// per-vertex metadata; it exists purely as a partitioning input.
#[derive(Debug, Clone)]
pub struct UndirectedGraph {
    pub nvtxs: usize,
    pub xadj: Vec<usize>,
    pub adjncy: Vec<StateId>,
}

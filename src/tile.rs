//! Tile representation and the materializer that projects a partitioned
//! (or small, unpartitioned) graph onto concrete tile slots.
//!
//! The local switch is kept as one adjacency `Vec` per row rather than a
//! flat CSR heap buffer: slot repositioning (`swap_slots`) then reduces to
//! swapping two `Vec`s and rewriting any column that referenced either
//! slot, instead of splicing a prefix-sum buffer. The CSR shape spec.md §3
//! describes is reconstructed only when a tile is emitted (`report.rs`).

use crate::graph::{Graph, StateId, StateMeta};
use crate::list::IndexList;

/// The occupant of one STE slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TileSlot {
    #[default]
    Empty,
    /// Carried over from a previously-mapped automaton on this tile; its
    /// local edges live in `Tile::rows` but it has no live `StateId` in
    /// the current `Graph` (that automaton's graph was already reset).
    Retained,
    Occupied(StateId),
}

impl TileSlot {
    pub fn is_empty(&self) -> bool {
        matches!(self, TileSlot::Empty)
    }

    pub fn state(&self) -> Option<StateId> {
        match self {
            TileSlot::Occupied(v) => Some(*v),
            _ => None,
        }
    }
}

/// One physical tile: `tile_size` STEs plus `max_in` extra input rows fed
/// by the global switches.
#[derive(Debug, Clone)]
pub struct Tile {
    pub state: Vec<TileSlot>,
    /// Name/start/report/pattern captured from the owning `Graph` at
    /// placement time, one entry per slot. Outlives the `Graph` it was
    /// copied from (which is reset for the next automaton), so this, not
    /// `state`'s `StateId`, is what `report.rs` reads at emission time.
    pub meta: Vec<Option<StateMeta>>,
    /// `rows[i]` is the set of local target slots that row `i` transitions
    /// into. Rows `0..tile_size` belong to STEs; rows
    /// `tile_size..tile_size+max_in` are the global-switch input
    /// extensions (`tile_size + 2*global_num` of them for 1-way channels,
    /// followed by up to 8 for the 4-way channel).
    pub rows: Vec<Vec<usize>>,
    /// Local slot indices of this tile's outgoing boundary states.
    pub out: IndexList,
    /// Indices of tiles that are destination-side replicas of this tile,
    /// created to split incoming traffic.
    pub ghost: IndexList,
    /// Source partition index if this tile is a replica, `None` if it
    /// holds an original partition (or is an unused tile).
    pub duplicated: Option<usize>,
    /// `true` for an incoming-overflow replica: it holds a full copy of
    /// its origin's member states rather than a disjoint subset, so local
    /// edges are built against the origin's membership too.
    pub mirrors_origin: bool,
    /// State bound to 1-way output port `2*k + row`, flattened: index
    /// `2*k + row`. Set by the allocator, consumed once by the
    /// materializer to relocate that state into its fixed slot (the port
    /// index itself is the slot address). `None` if the port is unused.
    pub global_out: Vec<Option<StateId>>,
    /// State bound to 4-way output port `row`. Empty if the 4-way switch
    /// is disabled.
    pub g4_out: Vec<Option<StateId>>,
    tile_size: usize,
    max_in: usize,
}

impl Tile {
    pub fn new(tile_size: usize, global_num: usize, has_g4: bool) -> Self {
        let max_in = 2 * global_num + if has_g4 { 8 } else { 0 };
        Self {
            state: vec![TileSlot::Empty; tile_size],
            meta: vec![None; tile_size],
            rows: vec![Vec::new(); tile_size + max_in],
            out: IndexList::new(),
            ghost: IndexList::new(),
            duplicated: None,
            mirrors_origin: false,
            global_out: vec![None; 2 * global_num],
            g4_out: if has_g4 { vec![None; 8] } else { Vec::new() },
            tile_size,
            max_in,
        }
    }

    /// Number of occupied (non-empty) slots, used as `nstate(t)`.
    pub fn nstate(&self) -> usize {
        self.state.iter().filter(|s| !s.is_empty()).count()
    }

    pub fn tile_size(&self) -> usize {
        self.tile_size
    }

    pub fn max_in(&self) -> usize {
        self.max_in
    }

    /// Reset to a fully empty tile, discarding any in-progress attempt.
    pub fn reset(&mut self) {
        self.state.iter_mut().for_each(|s| *s = TileSlot::Empty);
        self.meta.iter_mut().for_each(|m| *m = None);
        self.rows.iter_mut().for_each(Vec::clear);
        self.out.clear();
        self.ghost.clear();
        self.duplicated = None;
        self.mirrors_origin = false;
        self.global_out.iter_mut().for_each(|s| *s = None);
        self.g4_out.iter_mut().for_each(|s| *s = None);
    }

    /// Swap the contents of slots `a` and `b`: occupant, local out-edges,
    /// and every other row's reference to either slot. Updates `graph.pos`
    /// for whichever occupants have a live `StateId`.
    pub fn swap_slots(&mut self, graph: &mut Graph, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.state.swap(a, b);
        self.meta.swap(a, b);
        self.rows.swap(a, b);
        for row in self.rows.iter_mut() {
            for col in row.iter_mut() {
                if *col == a {
                    *col = b;
                } else if *col == b {
                    *col = a;
                }
            }
        }
        if let Some(v) = self.state[a].state() {
            graph.pos[v] = a;
        }
        if let Some(v) = self.state[b].state() {
            graph.pos[v] = b;
        }
    }

    /// Move the occupant at `graph.pos[v]` into `target`, swapping whatever
    /// was already there out of the way.
    pub fn relocate(&mut self, graph: &mut Graph, v: StateId, target: usize) {
        let current = graph.pos[v];
        self.swap_slots(graph, current, target);
    }

    /// Fill this tile's empty slots from the tail end with `states`, in the
    /// order given (small-graph path, spec.md §4.6). Preserved/retained
    /// slots are left untouched.
    pub fn place_small(&mut self, graph: &mut Graph, states: &[StateId]) {
        let mut slot = self.tile_size;
        for &v in states {
            loop {
                slot -= 1;
                if self.state[slot].is_empty() {
                    break;
                }
            }
            self.state[slot] = TileSlot::Occupied(v);
            graph.pos[v] = slot;
        }
        self.capture_meta(graph);
        self.build_local_edges(graph, None);
        self.freeze();
    }

    /// Copy `name`/`start`/`report`/`pattern` out of `graph` for every slot
    /// holding a live `StateId` this round, leaving retained/preserved slots
    /// (no live `StateId`) at whatever they already carried.
    pub fn capture_meta(&mut self, graph: &Graph) {
        for slot in 0..self.tile_size {
            if let Some(v) = self.state[slot].state() {
                self.meta[slot] = Some(graph.meta[v].clone());
            }
        }
    }

    /// Freeze every slot holding a live `StateId` from the automaton that
    /// was just committed into `Retained`, so the next automaton's
    /// `capture_meta` (against a different `Graph`) does not mistake it for
    /// a fresh placement and overwrite its metadata.
    pub fn freeze(&mut self) {
        for slot in self.state.iter_mut() {
            if matches!(slot, TileSlot::Occupied(_)) {
                *slot = TileSlot::Retained;
            }
        }
    }

    /// Occupy this tile's empty slots in order with `members` (large-graph
    /// path, before fixed-port relocation runs). A head tile carrying
    /// retained state from a previous automaton keeps it: only `Empty`
    /// slots are claimed.
    pub fn place_members(&mut self, graph: &mut Graph, members: &[StateId]) {
        let mut slot = 0;
        for &v in members {
            while !self.state[slot].is_empty() {
                slot += 1;
            }
            self.state[slot] = TileSlot::Occupied(v);
            graph.pos[v] = slot;
            slot += 1;
        }
    }

    /// Relocate every port-bound state recorded in `global_out`/`g4_out`
    /// into its fixed slot (`2*k + row` for 1-way, `2*global_num + row`
    /// for the 4-way switch), displacing whatever already sat there.
    pub fn place_ports(&mut self, graph: &mut Graph) {
        let global_slots: Vec<(usize, StateId)> =
            self.global_out.iter().enumerate().filter_map(|(i, s)| s.map(|v| (i, v))).collect();
        for (slot, v) in global_slots {
            self.relocate(graph, v, slot);
        }
        let base = self.global_out.len();
        let g4_slots: Vec<(usize, StateId)> =
            self.g4_out.iter().enumerate().filter_map(|(i, s)| s.map(|v| (i, v))).collect();
        for (row, v) in g4_slots {
            self.relocate(graph, v, base + row);
        }
    }

    /// Append local out-edges for every freshly-placed (non-retained)
    /// occupant whose target lies on this tile, or on `origin` when this
    /// tile mirrors an incoming-overflow origin.
    pub fn build_local_edges(&mut self, graph: &Graph, origin: Option<usize>) {
        for slot in 0..self.tile_size {
            let Some(v) = self.state[slot].state() else { continue };
            self.rows[slot].clear();
            let home = graph.where_[v];
            for &w in &graph.adjncy[graph.xadj[v]..graph.xadj[v + 1]] {
                let w_home = graph.where_[w];
                let local = w_home == home || origin.is_some_and(|o| w_home == o);
                if local {
                    self.rows[slot].push(graph.pos[w]);
                }
            }
        }
    }
}

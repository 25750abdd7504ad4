//! Global-switch allocation: assigning every outgoing boundary channel to
//! a physical switch row, and the snapshot/rollback machinery the chip
//! coordinator uses around a large-graph attempt.

/// The state of one physical switch row.
///
/// Replaces the original implementation's `-1`/`-2`/`≥0` integer sentinels
/// (empty / preserved-busy / channel id) with a tagged variant. A
/// `SwitchBank` lives for the whole chip, never reset between automata, so
/// a channel committed by an earlier automaton simply stays `Occupied`
/// rather than needing a separate preserved-busy tag to keep the allocator
/// from recycling it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelSlot {
    #[default]
    Empty,
    /// Occupied by the given source channel id (`2*source_tile + row` for
    /// a 1-way switch, `8*source_tile + row` for the 4-way switch).
    Occupied(usize),
}

impl ChannelSlot {
    pub fn is_free(&self) -> bool {
        matches!(self, ChannelSlot::Empty)
    }
}

/// Where an outgoing channel landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    OneWay { switch: usize, row: usize },
    G4 { row: usize },
}

/// All of a chip's global switches: `global_num` 1-way switches, each with
/// two rows per destination tile, and an optional 4-way switch with eight
/// rows per destination tile.
#[derive(Debug, Clone)]
pub struct SwitchBank {
    tile_num: usize,
    has_g4: bool,
    /// `global[k][dest][row]`.
    global: Vec<Vec<[ChannelSlot; 2]>>,
    /// `g4[dest][row]`, empty if the 4-way switch is disabled.
    g4: Vec<[ChannelSlot; 8]>,
}

impl SwitchBank {
    pub fn new(global_num: usize, has_g4: bool, tile_num: usize) -> Self {
        Self {
            tile_num,
            has_g4,
            global: vec![vec![[ChannelSlot::Empty; 2]; tile_num]; global_num],
            g4: if has_g4 { vec![[ChannelSlot::Empty; 8]; tile_num] } else { Vec::new() },
        }
    }

    pub fn global_num(&self) -> usize {
        self.global.len()
    }

    pub fn has_g4(&self) -> bool {
        self.has_g4
    }

    /// Try to host `source_tile`'s fan-out to every destination tile in
    /// `dests`: first each 1-way switch in order, then the 4-way switch if
    /// enabled. A channel is one physical output port at the source tile,
    /// so the row it lands in is the same at every destination it reaches,
    /// and `own_one_way`/`own_g4` (the source tile's own port occupancy,
    /// indexed the same way as `Tile::global_out`/`g4_out`) keep two
    /// boundary states of that same tile from ever landing on the same
    /// port. Returns the assignment on success, or `None` if every option
    /// conflicts at some destination or every one of the source tile's own
    /// ports is already spoken for.
    pub fn allocate(
        &mut self,
        source_tile: usize,
        own_one_way: &[Option<usize>],
        own_g4: &[Option<usize>],
        dests: &[usize],
    ) -> Option<Assignment> {
        for k in 0..self.global.len() {
            if let Some(row) = self.try_one_way(k, own_one_way, dests) {
                self.commit_one_way(k, row, source_tile, dests);
                return Some(Assignment::OneWay { switch: k, row });
            }
        }
        if self.has_g4 {
            if let Some(row) = self.try_g4(own_g4, dests) {
                self.commit_g4(row, source_tile, dests);
                return Some(Assignment::G4 { row });
            }
        }
        None
    }

    /// Find a row (0 then 1) free at every destination in `dests`, skipping
    /// any row whose port at the source tile is already occupied by one of
    /// its other boundary states.
    fn try_one_way(&self, k: usize, own: &[Option<usize>], dests: &[usize]) -> Option<usize> {
        (0..2)
            .find(|&row| own[2 * k + row].is_none() && dests.iter().all(|&d| self.global[k][d][row].is_free()))
    }

    fn commit_one_way(&mut self, k: usize, row: usize, source_tile: usize, dests: &[usize]) {
        let channel = 2 * source_tile + row;
        for &d in dests {
            self.global[k][d][row] = ChannelSlot::Occupied(channel);
        }
    }

    /// Find a row (0..8) free at every destination in `dests`, skipping any
    /// row whose port at the source tile is already occupied.
    fn try_g4(&self, own: &[Option<usize>], dests: &[usize]) -> Option<usize> {
        (0..8).find(|&row| own[row].is_none() && dests.iter().all(|&d| self.g4[d][row].is_free()))
    }

    fn commit_g4(&mut self, row: usize, source_tile: usize, dests: &[usize]) {
        let channel = 8 * source_tile + row;
        for &d in dests {
            self.g4[d][row] = ChannelSlot::Occupied(channel);
        }
    }

    /// Which local state occupies channel `(k, row)` of destination `dest`,
    /// decoded back to a source tile index (`channel_id / 2`). Used by the
    /// materializer to walk the source tile's adjacency when extending a
    /// destination tile's local CSR.
    pub fn one_way_source_tile(&self, k: usize, dest: usize, row: usize) -> Option<usize> {
        match self.global[k][dest][row] {
            ChannelSlot::Occupied(id) => Some(id / 2),
            _ => None,
        }
    }

    pub fn g4_source_tile(&self, dest: usize, row: usize) -> Option<usize> {
        match self.g4[dest][row] {
            ChannelSlot::Occupied(id) => Some(id / 8),
            _ => None,
        }
    }

    pub fn global_slot(&self, k: usize, dest: usize, row: usize) -> ChannelSlot {
        self.global[k][dest][row]
    }

    pub fn g4_slot(&self, dest: usize, row: usize) -> ChannelSlot {
        self.g4[dest][row]
    }

    pub fn tile_num(&self) -> usize {
        self.tile_num
    }

    /// Take a point-in-time copy, to be restored by [`SwitchBank::restore`]
    /// if the enclosing attempt fails.
    pub fn snapshot(&self) -> SwitchSnapshot {
        SwitchSnapshot { global: self.global.clone(), g4: self.g4.clone() }
    }

    pub fn restore(&mut self, snapshot: SwitchSnapshot) {
        self.global = snapshot.global;
        self.g4 = snapshot.g4;
    }
}

/// A stack-scoped copy of a [`SwitchBank`]'s mutable state, taken before a
/// large-graph attempt and discarded (or restored) once the attempt
/// resolves.
#[derive(Debug, Clone)]
pub struct SwitchSnapshot {
    global: Vec<Vec<[ChannelSlot; 2]>>,
    g4: Vec<[ChannelSlot; 8]>,
}

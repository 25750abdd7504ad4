//! Chip coordinator: the transactional outer loop that maps one automaton
//! at a time onto a chip's tiles, rolling back a failed attempt and
//! retrying the next partition alternative.

use tracing::{debug, info, warn};

use crate::automaton::{largest_fitting, AutomatonDescriptor};
use crate::config::FabricConfig;
use crate::error::ApMapError;
use crate::graph::{Graph, PartId, StateId};
use crate::partitioner::GraphPartitioner;
use crate::planner::{plan, replan, PlanOutcome};
use crate::switch::{ChannelSlot, SwitchBank};
use crate::tile::Tile;

/// One physical chip: its tiles and global switches, plus the cursor onto
/// the tile currently being filled.
#[derive(Debug, Clone)]
pub struct Chip {
    pub tiles: Vec<Tile>,
    pub switches: SwitchBank,
    pub curtile: usize,
    pub remain: usize,
}

impl Chip {
    pub fn new(cfg: &FabricConfig) -> Self {
        Self {
            tiles: (0..cfg.tile_num).map(|_| Tile::new(cfg.tile_size, cfg.global_num, cfg.has_g4)).collect(),
            switches: SwitchBank::new(cfg.global_num, cfg.has_g4, cfg.tile_num),
            curtile: 0,
            remain: cfg.tile_size,
        }
    }

    /// The fractional tile count this chip contributes to the "tiles in
    /// total" statistic: `curtile + (1 - remain/tile_size)`.
    pub fn tiles_in_total(&self, cfg: &FabricConfig) -> f64 {
        self.curtile as f64 + (1.0 - self.remain as f64 / cfg.tile_size as f64)
    }
}

/// Outcome of trying to map one automaton onto one chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapVerdict {
    Mapped,
    ChipFull,
}

/// Map every automaton in `automata` across `chips`, trying chip 0 then
/// chip 1 (etc.) for each. Returns an error naming the first automaton
/// that could not be mapped on any chip.
pub fn map_batch(
    chips: &mut [Chip],
    automata: &mut [AutomatonDescriptor],
    graph: &mut Graph,
    partitioner: &dyn GraphPartitioner,
    cfg: &FabricConfig,
) -> Result<(), ApMapError> {
    for i in 0..automata.len() {
        if automata[i].mapped {
            continue;
        }
        let nstate = automata[i].nstate;
        let nedge = automata[i].nedge;
        let path = automata[i].path.clone();

        let mut placed = false;
        let mut saw_alloc_failure = false;
        for (chip_idx, chip) in chips.iter_mut().enumerate() {
            graph.reset(nstate, nedge);
            crate::parser::read_graph_file(&path, graph)?;

            match map_automaton(chip, graph, cfg, partitioner) {
                Ok(MapVerdict::Mapped) => {
                    info!(automaton = %path.display(), chip = chip_idx, "mapped automaton");
                    placed = true;
                    break;
                }
                Ok(MapVerdict::ChipFull) => {
                    warn!(chip = chip_idx, "chip full, trying next chip");
                    continue;
                }
                Err(_) => {
                    saw_alloc_failure = true;
                    continue;
                }
            }
        }

        if !placed {
            let automaton = automata[i].path.display().to_string();
            return Err(if saw_alloc_failure {
                ApMapError::AllocationExhausted { automaton }
            } else {
                ApMapError::ChipsFull { automaton }
            });
        }
        automata[i].mapped = true;
        pack_small_automata(chips, automata, graph, cfg)?;
    }
    Ok(())
}

/// After a commit, greedily pack the largest still-unmapped automaton that
/// fits into the current tile's leftover capacity on every chip, in case a
/// small one can ride along before the tile closes.
fn pack_small_automata(
    chips: &mut [Chip],
    automata: &mut [AutomatonDescriptor],
    graph: &mut Graph,
    cfg: &FabricConfig,
) -> Result<(), ApMapError> {
    for chip in chips.iter_mut() {
        loop {
            let Some(idx) = largest_fitting(automata, chip.remain) else { break };
            let path = automata[idx].path.clone();
            graph.reset(automata[idx].nstate, automata[idx].nedge);
            crate::parser::read_graph_file(&path, graph)?;
            place_small(chip, graph, cfg);
            automata[idx].mapped = true;
            debug!(automaton = %path.display(), "packed into leftover capacity");
        }
        if chip.remain < cfg.threshold && chip.curtile + 1 < cfg.tile_num {
            chip.curtile += 1;
            chip.remain = cfg.tile_size;
        }
    }
    Ok(())
}

fn map_automaton(
    chip: &mut Chip,
    graph: &mut Graph,
    cfg: &FabricConfig,
    partitioner: &dyn GraphPartitioner,
) -> Result<MapVerdict, ApMapError> {
    let nvtxs = graph.nvtxs;

    if nvtxs <= cfg.tile_size {
        if nvtxs <= chip.remain {
            place_small(chip, graph, cfg);
            return Ok(MapVerdict::Mapped);
        }
        if chip.curtile + 1 < cfg.tile_num {
            chip.curtile += 1;
            chip.remain = cfg.tile_size;
            if nvtxs <= chip.remain {
                place_small(chip, graph, cfg);
                return Ok(MapVerdict::Mapped);
            }
        }
        return Ok(MapVerdict::ChipFull);
    }

    let capacity = cfg.tile_size * (cfg.tile_num - chip.curtile - 1) + chip.remain;
    if nvtxs > capacity {
        return Ok(MapVerdict::ChipFull);
    }

    let mut fromtile = chip.curtile;
    let mut headsize = chip.remain;
    let undirected = graph.undirected_companion();

    let Some((mut outcome, mut choices)) = plan(partitioner, graph, &undirected, headsize, cfg, cfg.optimize) else {
        return Err(ApMapError::Internal("planner found no valid partition".into()));
    };

    let mut advanced_head = false;
    loop {
        match try_map_large(chip, graph, fromtile, outcome, cfg) {
            Ok(()) => return Ok(MapVerdict::Mapped),
            Err(()) => {
                if !advanced_head && headsize < cfg.tile_size && chip.curtile + 1 < cfg.tile_num {
                    advanced_head = true;
                    chip.curtile += 1;
                    chip.remain = cfg.tile_size;
                    fromtile = chip.curtile;
                    headsize = cfg.tile_size;
                    if let Some((new_outcome, new_choices)) = plan(partitioner, graph, &undirected, headsize, cfg, cfg.optimize) {
                        outcome = new_outcome;
                        choices = new_choices;
                        continue;
                    }
                }
                let Some(choice) = choices.pop() else {
                    return Err(ApMapError::AllocationExhausted { automaton: String::new() });
                };
                let Some(new_outcome) = replan(partitioner, graph, &undirected, headsize, cfg, choice) else {
                    continue;
                };
                outcome = new_outcome;
            }
        }
    }
}

fn place_small(chip: &mut Chip, graph: &mut Graph, cfg: &FabricConfig) {
    let states: Vec<StateId> = (0..graph.nvtxs).collect();
    let tile_idx = chip.curtile;
    chip.tiles[tile_idx].place_small(graph, &states);
    chip.remain = cfg.tile_size - chip.tiles[tile_idx].nstate();
}

fn ensure_capacity(chip: &mut Chip, fromtile: usize, npart: usize, cfg: &FabricConfig) -> bool {
    if fromtile + npart > cfg.tile_num {
        return false;
    }
    while chip.tiles.len() < fromtile + npart {
        chip.tiles.push(Tile::new(cfg.tile_size, cfg.global_num, cfg.has_g4));
    }
    true
}

fn try_map_large(chip: &mut Chip, graph: &mut Graph, fromtile: usize, outcome: PlanOutcome, cfg: &FabricConfig) -> Result<(), ()> {
    if !ensure_capacity(chip, fromtile, outcome.npart, cfg) {
        return Err(());
    }

    let switch_snapshot = chip.switches.snapshot();
    let tiles_snapshot = chip.tiles.clone();
    let graph_snapshot = graph.clone();

    // The head tile may carry an `out` list left over from the automaton
    // previously committed there (it was the tail tile of that placement);
    // clear it before reseeding from the current graph's boundary states.
    chip.tiles[fromtile].out.clear();
    seed_out_lists(graph, &mut chip.tiles, fromtile);
    // A head tile that already carries retained state from a previous
    // automaton keeps its existing partition-0 boundary bookkeeping; the
    // resolver should not re-duplicate it for this attempt.
    let skip_head = chip.tiles[fromtile].nstate() > 0;
    let added = crate::resolver::resolve_constraints(graph, &mut chip.tiles, fromtile, cfg, skip_head);
    if added > 0 {
        debug!(partitions_added = added, "constraint resolver created duplicate tiles");
    }

    if chip.tiles.len() > cfg.tile_num {
        chip.switches.restore(switch_snapshot);
        chip.tiles = tiles_snapshot;
        *graph = graph_snapshot;
        return Err(());
    }

    if allocate_global(chip, graph, fromtile).is_err() {
        chip.switches.restore(switch_snapshot);
        chip.tiles = tiles_snapshot;
        *graph = graph_snapshot;
        return Err(());
    }

    materialize_large(chip, graph, fromtile, cfg);
    let last_tile = fromtile + graph.npart - 1;
    chip.curtile = last_tile;
    chip.remain = cfg.tile_size - chip.tiles[last_tile].nstate();
    Ok(())
}

fn seed_out_lists(graph: &Graph, tiles: &mut [Tile], fromtile: usize) {
    for v in 0..graph.nvtxs {
        if !graph.ext[v].is_empty() {
            let p = graph.where_[v];
            tiles[fromtile + p].out.add(v);
        }
    }
}

fn allocate_global(chip: &mut Chip, graph: &Graph, fromtile: usize) -> Result<(), ()> {
    for p in 0..graph.npart {
        let tile_idx = fromtile + p;
        let states = chip.tiles[tile_idx].out.as_slice().to_vec();
        for s in states {
            let dests: Vec<usize> = graph.ext[s].as_slice().iter().map(|&part| fromtile + part).collect();
            if dests.is_empty() {
                continue;
            }
            let own_one_way = chip.tiles[tile_idx].global_out.clone();
            let own_g4 = chip.tiles[tile_idx].g4_out.clone();
            match chip.switches.allocate(tile_idx, &own_one_way, &own_g4, &dests) {
                Some(crate::switch::Assignment::OneWay { switch, row }) => {
                    let idx = 2 * switch + row;
                    chip.tiles[tile_idx].global_out[idx] = Some(s);
                }
                Some(crate::switch::Assignment::G4 { row }) => {
                    chip.tiles[tile_idx].g4_out[row] = Some(s);
                }
                None => return Err(()),
            }
        }
    }
    Ok(())
}

fn member_source(tiles: &[Tile], tile_idx: usize, p: PartId) -> PartId {
    if tiles[tile_idx].mirrors_origin {
        tiles[tile_idx].duplicated.unwrap_or(p)
    } else {
        p
    }
}

fn materialize_large(chip: &mut Chip, graph: &mut Graph, fromtile: usize, cfg: &FabricConfig) {
    let npart = graph.npart;

    for p in 0..npart {
        let tile_idx = fromtile + p;
        let source = member_source(&chip.tiles, tile_idx, p);
        let members: Vec<StateId> = (0..graph.nvtxs).filter(|&v| graph.where_[v] == source).collect();
        chip.tiles[tile_idx].place_members(graph, &members);
    }

    for p in 0..npart {
        let tile_idx = fromtile + p;
        chip.tiles[tile_idx].place_ports(graph);
        chip.tiles[tile_idx].capture_meta(graph);
    }

    for p in 0..npart {
        let tile_idx = fromtile + p;
        let origin = chip.tiles[tile_idx].mirrors_origin.then(|| chip.tiles[tile_idx].duplicated.unwrap());
        chip.tiles[tile_idx].build_local_edges(graph, origin);
    }

    extend_input_rows(chip, graph, fromtile, npart, cfg);

    for p in 0..npart {
        chip.tiles[fromtile + p].freeze();
    }
}

/// Extend every destination tile's local CSR with rows fed by the global
/// switches: for each occupied channel, walk the source state's adjacency
/// and append every edge that lands back on the destination tile.
fn extend_input_rows(chip: &mut Chip, graph: &Graph, fromtile: usize, npart: usize, cfg: &FabricConfig) {
    for p in 0..npart {
        let dest_idx = fromtile + p;
        for k in 0..cfg.global_num {
            for row in 0..2 {
                if !matches!(chip.switches.global_slot(k, dest_idx, row), ChannelSlot::Occupied(_)) {
                    continue;
                }
                let Some(src_tile) = chip.switches.one_way_source_tile(k, dest_idx, row) else { continue };
                let Some(s) = chip.tiles[src_tile].global_out[2 * k + row] else { continue };
                let input_row = cfg.tile_size + 2 * k + row;
                append_matching_targets(chip, graph, s, p, dest_idx, input_row);
            }
        }
        if cfg.has_g4 {
            for row in 0..8 {
                if !matches!(chip.switches.g4_slot(dest_idx, row), ChannelSlot::Occupied(_)) {
                    continue;
                }
                let Some(src_tile) = chip.switches.g4_source_tile(dest_idx, row) else { continue };
                let Some(s) = chip.tiles[src_tile].g4_out[row] else { continue };
                let input_row = cfg.tile_size + 2 * cfg.global_num + row;
                append_matching_targets(chip, graph, s, p, dest_idx, input_row);
            }
        }
    }
}

fn append_matching_targets(chip: &mut Chip, graph: &Graph, source: StateId, dest_part: PartId, dest_idx: usize, input_row: usize) {
    let targets: Vec<usize> = graph.adjncy[graph.xadj[source]..graph.xadj[source + 1]]
        .iter()
        .filter(|&&w| graph.where_[w] == dest_part)
        .map(|&w| graph.pos[w])
        .collect();
    chip.tiles[dest_idx].rows[input_row].extend(targets);
}

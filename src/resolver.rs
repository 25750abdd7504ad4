//! Constraint resolution: detecting per-partition fan-in/fan-out overflow
//! and synthesizing duplicate tiles to split the traffic.

use crate::config::FabricConfig;
use crate::graph::{Graph, PartId, StateId};
use crate::list::IndexList;
use crate::tile::Tile;

/// Split `n` items evenly over `groups` buckets, the first `n % groups`
/// buckets getting one extra. Returns the bucket sizes in order.
fn even_split(n: usize, groups: usize) -> Vec<usize> {
    let q = n / groups;
    let r = n % groups;
    (0..groups).map(|i| if i < r { q + 1 } else { q }).collect()
}

/// After `graph.insert_duplicate(pos, num)` shifts every tile past `pos`
/// rightward by `num`, bump the `duplicated` field of any tile that was
/// itself already a replica of a partition beyond `pos` — it now lives
/// `num` slots further from its origin than its stale value records.
fn renumber_duplicated(tiles: &mut [Tile], pos: PartId, num: usize) {
    for tile in tiles.iter_mut() {
        if let Some(d) = tile.duplicated {
            if d > pos {
                tile.duplicated = Some(d + num);
            }
        }
    }
}

/// Enforce both boundary caps for every partition placed at
/// `tiles[fromtile..]`, inserting duplicate tiles as needed.
///
/// `skip_head` is set when the tile at `fromtile` is inheriting preserved
/// state from a previous automaton and its partition (partition 0) should
/// not be touched by this pass. Returns the number of tiles added.
pub fn resolve_constraints(
    graph: &mut Graph,
    tiles: &mut Vec<Tile>,
    fromtile: usize,
    cfg: &FabricConfig,
    skip_head: bool,
) -> usize {
    let mut added = 0;
    let start = if skip_head { 1 } else { 0 };

    // Outgoing pass runs to completion over every original partition first,
    // since it redistributes that partition's own members; only afterwards
    // does the incoming pass run over the (now larger) partition list, so
    // the two passes never contend for the same freshly-inserted tile slot.
    let mut p = start;
    while p < graph.npart {
        added += resolve_outgoing(graph, tiles, fromtile, p, cfg);
        p += 1;
    }

    let mut p = start;
    while p < graph.npart {
        added += resolve_incoming(graph, tiles, fromtile, p, cfg);
        p += 1;
    }

    added
}

fn resolve_outgoing(graph: &mut Graph, tiles: &mut Vec<Tile>, fromtile: usize, p: PartId, cfg: &FabricConfig) -> usize {
    let tile_idx = fromtile + p;
    let n = tiles[tile_idx].out.len();
    let max_out = cfg.max_out();
    if n <= max_out {
        return 0;
    }

    let nadd = n.div_ceil(max_out) - 1;
    graph.insert_duplicate(p, nadd);
    renumber_duplicated(tiles, p, nadd);
    for i in 0..nadd {
        tiles.insert(tile_idx + 1 + i, Tile::new(cfg.tile_size, cfg.global_num, cfg.has_g4));
    }

    let sizes = even_split(n, nadd + 1);
    let mut remaining = tiles[tile_idx].out.as_slice().to_vec();
    for (i, &size) in sizes.iter().enumerate() {
        let chunk = remaining.split_off(remaining.len() - size);
        let dest = tile_idx + i;
        tiles[dest].out = IndexList::from_iter(chunk);
        if i > 0 {
            tiles[dest].duplicated = Some(p);
        }
    }

    nadd
}

fn resolve_incoming(graph: &mut Graph, tiles: &mut Vec<Tile>, fromtile: usize, p: PartId, cfg: &FabricConfig) -> usize {
    let sources: Vec<StateId> = (0..graph.nvtxs).filter(|&v| graph.ext[v].as_slice().contains(&p)).collect();
    let m = sources.len();
    let max_in = cfg.max_in();
    if m <= max_in {
        return 0;
    }

    let tile_idx = fromtile + p;
    let nadd = m.div_ceil(max_in) - 1;
    graph.insert_duplicate(p, nadd);
    renumber_duplicated(tiles, p, nadd);
    for i in 0..nadd {
        let mut replica = Tile::new(cfg.tile_size, cfg.global_num, cfg.has_g4);
        replica.duplicated = Some(p);
        replica.mirrors_origin = true;
        tiles.insert(tile_idx + 1 + i, replica);
        tiles[tile_idx].ghost.add(tile_idx + 1 + i);
    }

    let sizes = even_split(m, nadd + 1);
    let mut offset = sizes[0];
    for (i, &size) in sizes.iter().enumerate().skip(1) {
        for &s in &sources[offset..offset + size] {
            graph.ext[s].change(p, p + i);
        }
        offset += size;
    }

    nadd
}

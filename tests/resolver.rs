//! Constraint resolution: outgoing/incoming boundary overflow splits a
//! partition's tile into duplicates, built directly against `Graph`/`Tile`
//! values rather than through the full batch pipeline.

use apmap::config::FabricConfig;
use apmap::graph::Graph;
use apmap::list::IndexList;
use apmap::resolver::resolve_constraints;
use apmap::tile::Tile;

fn empty_tile(cfg: &FabricConfig) -> Tile {
    Tile::new(cfg.tile_size, cfg.global_num, cfg.has_g4)
}

#[test]
fn outgoing_overflow_splits_into_evenly_sized_duplicate_tiles() {
    let cfg = FabricConfig::default();
    assert_eq!(cfg.max_out(), 16);

    let mut graph = Graph::with_capacity(40, 0);
    graph.reset(40, 0);
    graph.npart = 1;

    let mut tiles = vec![empty_tile(&cfg)];
    tiles[0].out = IndexList::from_iter(0..40);

    let added = resolve_constraints(&mut graph, &mut tiles, 0, &cfg, false);

    // ceil(40/16) - 1 = 2 extra tiles.
    assert_eq!(added, 2);
    assert_eq!(graph.npart, 3);
    assert_eq!(tiles.len(), 3);

    assert_eq!(tiles[0].out.len(), 14);
    assert_eq!(tiles[0].duplicated, None);
    assert_eq!(tiles[1].out.len(), 13);
    assert_eq!(tiles[1].duplicated, Some(0));
    assert_eq!(tiles[2].out.len(), 13);
    assert_eq!(tiles[2].duplicated, Some(0));

    // The 40 original boundary states are partitioned disjointly across the
    // three tiles, none dropped or duplicated.
    let mut all: Vec<usize> =
        tiles.iter().flat_map(|t| t.out.as_slice().iter().copied()).collect();
    all.sort_unstable();
    assert_eq!(all, (0..40).collect::<Vec<_>>());
}

#[test]
fn outgoing_overflow_is_a_no_op_at_or_under_the_cap() {
    let cfg = FabricConfig::default();
    let mut graph = Graph::with_capacity(16, 0);
    graph.reset(16, 0);
    graph.npart = 1;

    let mut tiles = vec![empty_tile(&cfg)];
    tiles[0].out = IndexList::from_iter(0..16);

    let added = resolve_constraints(&mut graph, &mut tiles, 0, &cfg, false);
    assert_eq!(added, 0);
    assert_eq!(tiles.len(), 1);
    assert_eq!(tiles[0].out.len(), 16);
}

#[test]
fn incoming_overflow_creates_mirroring_ghost_tiles_and_redirects_sources() {
    let cfg = FabricConfig::default();
    assert_eq!(cfg.max_in(), 16);

    let mut graph = Graph::with_capacity(40, 0);
    graph.reset(40, 0);
    graph.npart = 1;
    for v in 0..40 {
        graph.ext[v].add(0);
    }

    let mut tiles = vec![empty_tile(&cfg)];

    let added = resolve_constraints(&mut graph, &mut tiles, 0, &cfg, false);

    assert_eq!(added, 2);
    assert_eq!(graph.npart, 3);
    assert_eq!(tiles.len(), 3);
    assert_eq!(tiles[0].ghost.as_slice().to_vec(), vec![1, 2]);
    assert_eq!(tiles[1].duplicated, Some(0));
    assert!(tiles[1].mirrors_origin);
    assert_eq!(tiles[2].duplicated, Some(0));
    assert!(tiles[2].mirrors_origin);

    // even_split(40, 3) = [14, 13, 13]: the origin's own 14 sources keep
    // pointing at partition 0, the next 13 are redirected to partition 1,
    // and the last 13 to partition 2.
    for v in 0..14 {
        assert_eq!(graph.ext[v].as_slice(), &[0], "source {v} should stay with the origin partition");
    }
    for v in 14..27 {
        assert_eq!(graph.ext[v].as_slice(), &[1], "source {v} should redirect to the first replica");
    }
    for v in 27..40 {
        assert_eq!(graph.ext[v].as_slice(), &[2], "source {v} should redirect to the second replica");
    }
}

#[test]
fn a_smaller_global_switch_needs_more_outgoing_duplicates() {
    // Same 30-state overflow resolved against two fabric configurations
    // that differ only in whether the 4-way switch is present: disabling
    // it shrinks MAX_OUT and forces more duplicate tiles for the same
    // boundary traffic.
    let with_g4 = FabricConfig::default();
    let without_g4 = FabricConfig { has_g4: false, ..FabricConfig::default() };
    assert_eq!(with_g4.max_out(), 16);
    assert_eq!(without_g4.max_out(), 8);

    let added_with_g4 = {
        let mut graph = Graph::with_capacity(30, 0);
        graph.reset(30, 0);
        graph.npart = 1;
        let mut tiles = vec![empty_tile(&with_g4)];
        tiles[0].out = IndexList::from_iter(0..30);
        resolve_constraints(&mut graph, &mut tiles, 0, &with_g4, false)
    };
    let added_without_g4 = {
        let mut graph = Graph::with_capacity(30, 0);
        graph.reset(30, 0);
        graph.npart = 1;
        let mut tiles = vec![empty_tile(&without_g4)];
        tiles[0].out = IndexList::from_iter(0..30);
        resolve_constraints(&mut graph, &mut tiles, 0, &without_g4, false)
    };

    assert_eq!(added_with_g4, 1); // ceil(30/16) - 1
    assert_eq!(added_without_g4, 3); // ceil(30/8) - 1
    assert!(added_without_g4 > added_with_g4);
}

#[test]
fn skip_head_leaves_partition_zero_untouched() {
    let cfg = FabricConfig::default();
    let mut graph = Graph::with_capacity(40, 0);
    graph.reset(40, 0);
    graph.npart = 2;

    let mut tiles = vec![empty_tile(&cfg), empty_tile(&cfg)];
    tiles[0].out = IndexList::from_iter(0..40);

    let added = resolve_constraints(&mut graph, &mut tiles, 0, &cfg, true);

    assert_eq!(added, 0);
    assert_eq!(tiles.len(), 2);
    assert_eq!(tiles[0].out.len(), 40);
}

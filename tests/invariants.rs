//! Universal structural invariants (capacity, switch non-conflict, edge
//! preservation, determinism, tile/report consistency), checked directly
//! against `Chip`/`Graph`/`Tile`/`SwitchBank` values rather than scripted
//! end-to-end scenarios.

mod common;

use apmap::chip::{map_batch, Chip};
use apmap::config::FabricConfig;
use apmap::graph::Graph;
use apmap::parser::read_map_file;
use apmap::partitioner::GreedyKwayPartitioner;
use apmap::switch::SwitchBank;
use apmap::tile::TileSlot;
use common::{chain_lines, write_descriptor, write_graph_file};
use tempfile::tempdir;

fn run_batch(descriptor: &std::path::Path, cfg: &FabricConfig) -> Vec<Chip> {
    let mut automata = read_map_file(descriptor).unwrap();
    let max_nstate = automata.iter().map(|a| a.nstate).max().unwrap_or(0);
    let max_nedge = automata.iter().map(|a| a.nedge).max().unwrap_or(0);
    let mut graph = Graph::with_capacity(max_nstate, max_nedge);
    let mut chips: Vec<Chip> = (0..cfg.chip_num).map(|_| Chip::new(cfg)).collect();
    map_batch(&mut chips, &mut automata, &mut graph, &GreedyKwayPartitioner, cfg).unwrap();
    chips
}

/// Invariant 1: no tile ever holds more occupants than its physical size.
#[test]
fn invariant1_tile_occupancy_never_exceeds_tile_size() {
    let dir = tempdir().unwrap();
    write_graph_file(dir.path(), "a.graph", &chain_lines(200));
    write_graph_file(dir.path(), "b.graph", &chain_lines(200));
    let descriptor =
        write_descriptor(dir.path(), "batch.map", &[(200, 199, "a.graph"), (200, 199, "b.graph")]);

    let cfg = FabricConfig::default();
    let chips = run_batch(&descriptor, &cfg);

    for chip in &chips {
        for tile in &chip.tiles {
            assert!(tile.nstate() <= tile.tile_size());
        }
    }
}

/// Invariant 2: a physical switch row can only ever carry one channel at a
/// time; allocating a channel that would collide at a shared destination
/// must land on a different row or switch instead of overwriting it.
#[test]
fn invariant2_switch_rows_never_silently_overwritten() {
    let mut bank = SwitchBank::new(4, true, 8);
    let no_own_one_way = vec![None; 8];
    let no_own_g4 = vec![None; 8];

    let first = bank.allocate(0, &no_own_one_way, &no_own_g4, &[1, 2, 3]).expect("first allocation must succeed");
    let second = bank.allocate(4, &no_own_one_way, &no_own_g4, &[2, 5]).expect("second allocation must succeed");
    assert_ne!(first, second, "a conflicting destination must force a different row or switch");

    // Every destination the first channel reached still reports that exact
    // channel, untouched by the second allocation.
    for &dest in &[1usize, 2, 3] {
        let apmap::switch::Assignment::OneWay { switch, row } = first else { panic!("expected a 1-way assignment") };
        assert_eq!(bank.global_slot(switch, dest, row), apmap::switch::ChannelSlot::Occupied(2 * 0 + row));
    }
    for &dest in &[2usize, 5] {
        let apmap::switch::Assignment::OneWay { switch, row } = second else { panic!("expected a 1-way assignment") };
        assert_eq!(bank.global_slot(switch, dest, row), apmap::switch::ChannelSlot::Occupied(2 * 4 + row));
    }
}

/// A channel exhausted of every row on every switch (including the 4-way
/// switch) reports failure rather than silently reusing a busy row.
#[test]
fn invariant2_allocation_fails_once_every_row_is_taken() {
    let mut bank = SwitchBank::new(1, false, 4);
    let no_own = vec![None; 2];
    assert!(bank.allocate(0, &no_own, &[], &[1]).is_some());
    assert!(bank.allocate(1, &no_own, &[], &[1]).is_some());
    // Both of switch 0's rows into destination 1 are now occupied.
    assert!(bank.allocate(2, &no_own, &[], &[1]).is_none());
}

/// Invariant 2b: two distinct boundary states of the *same* source tile
/// must never be handed the same physical channel, even when their
/// destination sets never collide with each other.
#[test]
fn invariant2_same_source_tile_never_reuses_a_port_across_states() {
    let mut bank = SwitchBank::new(1, false, 8);
    let mut own = vec![None; 2];

    let first = bank.allocate(3, &own, &[], &[1]).expect("first state must get a port");
    let apmap::switch::Assignment::OneWay { switch, row } = first else { panic!("expected a 1-way assignment") };
    own[2 * switch + row] = Some(0);

    let second = bank.allocate(3, &own, &[], &[2]).expect("second state must get a different port");
    assert_ne!(first, second, "tile 3's two boundary states must not share a physical port");
}

/// Invariant 3: every directed edge in the source automaton is represented
/// exactly once in the committed tile(s)' local CSR when it never crosses a
/// partition boundary.
#[test]
fn invariant3_fully_local_edges_are_all_preserved() {
    let dir = tempdir().unwrap();
    let n = 50;
    write_graph_file(dir.path(), "chain.graph", &chain_lines(n));
    let descriptor = write_descriptor(dir.path(), "batch.map", &[(n, n - 1, "chain.graph")]);

    let cfg = FabricConfig::default();
    let chips = run_batch(&descriptor, &cfg);

    let local_edges: usize = chips[0].tiles[0].rows[..n].iter().map(Vec::len).sum();
    assert_eq!(local_edges, n - 1);
}

/// Invariant 4: mapping is deterministic. Running the same batch twice from
/// scratch produces byte-identical `map_result` output.
#[test]
fn invariant4_mapping_is_deterministic() {
    let dir = tempdir().unwrap();
    write_graph_file(dir.path(), "chain.graph", &chain_lines(130));
    let descriptor = write_descriptor(dir.path(), "batch.map", &[(130, 129, "chain.graph")]);

    let cfg = FabricConfig::default();
    let first = apmap::report::render(&run_batch(&descriptor, &cfg), &cfg);
    let second = apmap::report::render(&run_batch(&descriptor, &cfg), &cfg);
    assert_eq!(first, second);
}

/// Invariant 6: every occupied or retained slot carries metadata a report
/// can render, and empty slots carry none.
#[test]
fn invariant6_every_occupied_slot_has_renderable_metadata() {
    let dir = tempdir().unwrap();
    write_graph_file(dir.path(), "chain.graph", &chain_lines(5));
    let descriptor = write_descriptor(dir.path(), "batch.map", &[(5, 4, "chain.graph")]);

    let cfg = FabricConfig::default();
    let chips = run_batch(&descriptor, &cfg);
    let tile = &chips[0].tiles[0];

    let mut occupied_count = 0;
    for slot in 0..tile.tile_size() {
        let is_occupied = !matches!(tile.state[slot], TileSlot::Empty);
        assert_eq!(tile.meta[slot].is_some(), is_occupied, "slot {slot} metadata must match occupancy");
        if is_occupied {
            occupied_count += 1;
        }
    }
    assert_eq!(occupied_count, tile.nstate());
    assert_eq!(occupied_count, 5);

    // `place_small` fills from the tail inward, so the states land in
    // reverse order: s1 at the last slot, s5 at the first of the five.
    let names: Vec<&str> = (251..256).map(|slot| tile.meta[slot].as_ref().unwrap().name.as_str()).collect();
    assert_eq!(names, vec!["s5", "s4", "s3", "s2", "s1"]);
}

//! End-to-end scenarios driven through the parser and the chip coordinator
//! (the public pipeline `cli::run` wires together), using on-disk fixtures
//! under a `tempfile::TempDir`. Exercises spec scenarios S1, S2, S3, S5 and
//! the mapping-success/exit correspondence (universal invariant 5).

mod common;

use apmap::chip::{map_batch, Chip};
use apmap::config::FabricConfig;
use apmap::graph::Graph;
use apmap::parser::read_map_file;
use apmap::partitioner::GreedyKwayPartitioner;
use common::{chain_lines, ring_lines, write_descriptor, write_graph_file};
use tempfile::tempdir;

/// Load and map one descriptor file's automata onto freshly built chips,
/// returning them for inspection.
fn run_batch(descriptor: &std::path::Path, cfg: &FabricConfig) -> Vec<Chip> {
    let mut automata = read_map_file(descriptor).unwrap();
    let max_nstate = automata.iter().map(|a| a.nstate).max().unwrap_or(0);
    let max_nedge = automata.iter().map(|a| a.nedge).max().unwrap_or(0);
    let mut graph = Graph::with_capacity(max_nstate, max_nedge);
    let mut chips: Vec<Chip> = (0..cfg.chip_num).map(|_| Chip::new(cfg)).collect();
    map_batch(&mut chips, &mut automata, &mut graph, &GreedyKwayPartitioner, cfg).unwrap();
    chips
}

/// S1: a 5-state chain fits whole into tile 0 of chip 0, with no switch
/// traffic and a rounded `0.0 tiles in total`.
#[test]
fn s1_small_chain_fits_in_one_tile() {
    let dir = tempdir().unwrap();
    write_graph_file(dir.path(), "s1.graph", &chain_lines(5));
    let descriptor = write_descriptor(dir.path(), "batch.map", &[(5, 4, "s1.graph")]);

    let cfg = FabricConfig::default();
    let chips = run_batch(&descriptor, &cfg);

    assert_eq!(chips[0].curtile, 0);
    assert_eq!(chips[0].remain, 256 - 5);
    assert_eq!(chips[0].tiles[0].nstate(), 5);

    let local_edges: usize = chips[0].tiles[0].rows[..5].iter().map(Vec::len).sum();
    assert_eq!(local_edges, 4);

    for k in 0..cfg.global_num {
        for dest in 0..cfg.tile_num {
            for row in 0..2 {
                assert!(chips[0].switches.global_slot(k, dest, row).is_free());
            }
        }
    }

    let total: f64 = chips.iter().map(|c| c.tiles_in_total(&cfg)).sum();
    assert!((total * 10.0).round() / 10.0 == 0.0);
}

/// S2: exactly one full tile's worth of states leaves zero remaining
/// capacity and a clean `1.0 tiles in total`.
#[test]
fn s2_exact_tile_fill() {
    let dir = tempdir().unwrap();
    write_graph_file(dir.path(), "ring.graph", &ring_lines(256));
    let descriptor = write_descriptor(dir.path(), "batch.map", &[(256, 256, "ring.graph")]);

    let cfg = FabricConfig::default();
    let chips = run_batch(&descriptor, &cfg);

    assert_eq!(chips[0].remain, 0);
    assert_eq!(chips[0].tiles[0].nstate(), 256);

    let total: f64 = chips.iter().map(|c| c.tiles_in_total(&cfg)).sum();
    assert_eq!((total * 10.0).round() / 10.0, 1.0);
}

/// S3: a 257-state ring overflows a single tile and is split across two,
/// using exactly one boundary channel each direction around the cycle.
#[test]
fn s3_overflowing_ring_spans_two_tiles() {
    let dir = tempdir().unwrap();
    write_graph_file(dir.path(), "ring.graph", &ring_lines(257));
    let descriptor = write_descriptor(dir.path(), "batch.map", &[(257, 257, "ring.graph")]);

    let cfg = FabricConfig::default();
    let chips = run_batch(&descriptor, &cfg);

    assert!(chips[0].curtile >= 1, "a 257-state automaton must spill past tile 0");
    let used_states: usize = chips[0].tiles[..=chips[0].curtile].iter().map(|t| t.nstate()).sum();
    assert_eq!(used_states, 257);

    let total: f64 = chips.iter().map(|c| c.tiles_in_total(&cfg)).sum();
    assert!(total > 1.0 && total < 2.0, "expected close to 1.0 tiles in total, got {total}");
}

/// S5: two 200-state automata with `THRESHOLD=25` — the second spills to a
/// fresh tile since it does not fit the first tile's 56 leftover slots.
#[test]
fn s5_two_automata_pack_then_spill() {
    let dir = tempdir().unwrap();
    write_graph_file(dir.path(), "a.graph", &chain_lines(200));
    write_graph_file(dir.path(), "b.graph", &chain_lines(200));
    let descriptor =
        write_descriptor(dir.path(), "batch.map", &[(200, 199, "a.graph"), (200, 199, "b.graph")]);

    let cfg = FabricConfig::default();
    assert_eq!(cfg.threshold, 25);
    let chips = run_batch(&descriptor, &cfg);

    assert_eq!(chips[0].curtile, 1);
    assert_eq!(chips[0].remain, 56);
    assert_eq!(chips[0].tiles[0].nstate(), 200);
    assert_eq!(chips[0].tiles[1].nstate(), 200);

    let total: f64 = chips.iter().map(|c| c.tiles_in_total(&cfg)).sum();
    assert!((total - 1.78125).abs() < 1e-9);
    assert_eq!((total * 10.0).round() / 10.0, 1.8);
}

/// Universal invariant 5: an automaton too large for the whole fabric
/// cannot be mapped, and the batch reports an error rather than silently
/// dropping it.
#[test]
fn invariant5_unmappable_automaton_is_an_error_not_a_silent_drop() {
    let dir = tempdir().unwrap();
    // Larger than tile_num * tile_size for a single chip, and the batch
    // only gives it one chip to try.
    let n = 300;
    write_graph_file(dir.path(), "big.graph", &chain_lines(n));
    let descriptor = write_descriptor(dir.path(), "batch.map", &[(n, n - 1, "big.graph")]);

    let cfg = FabricConfig { chip_num: 1, tile_num: 1, ..FabricConfig::default() };
    let mut automata = read_map_file(&descriptor).unwrap();
    let mut graph = Graph::with_capacity(n, n - 1);
    let mut chips: Vec<Chip> = (0..cfg.chip_num).map(|_| Chip::new(&cfg)).collect();

    let result = map_batch(&mut chips, &mut automata, &mut graph, &GreedyKwayPartitioner, &cfg);
    assert!(result.is_err());
}

//! Textual emission of the mapping result: the `map_result` file laid out
//! per chip (global switches, then one block per used tile) and the
//! fractional "tiles in total" statistic printed to stdout.

use std::fmt::Write as _;
use std::path::Path;

use crate::chip::Chip;
use crate::config::FabricConfig;
use crate::error::{ApMapError, Result};
use crate::switch::ChannelSlot;
use crate::tile::TileSlot;

/// Render every chip's global switches and used tiles into the `map_result`
/// text, one `*** Chip i ***` block per chip.
pub fn render(chips: &[Chip], cfg: &FabricConfig) -> String {
    let mut out = String::new();
    for (i, chip) in chips.iter().enumerate() {
        render_chip(&mut out, i, chip, cfg);
    }
    out
}

fn render_chip(out: &mut String, chip_idx: usize, chip: &Chip, cfg: &FabricConfig) {
    let _ = writeln!(out, "**************");
    let _ = writeln!(out, "*** Chip {chip_idx} ***");
    let _ = writeln!(out, "**************");

    for k in 0..cfg.global_num {
        let _ = writeln!(out, "--- Global Switch {k} ---");
        for id in 0..2 * cfg.tile_num {
            let source_tile = id / 2;
            let row = id % 2;
            let dests: Vec<String> = (0..cfg.tile_num)
                .filter(|&d| chip.switches.global_slot(k, d, row) == ChannelSlot::Occupied(id))
                .map(|d| format!("{d}[{row}]"))
                .collect();
            let _ = writeln!(out, "{source_tile}[{row}]: {}", dests.join(" "));
        }
    }

    if cfg.has_g4 {
        let _ = writeln!(out, "--- Global-4 Switch ---");
        for id in 0..8 * cfg.tile_num {
            let source_tile = id / 8;
            let row = id % 8;
            let dests: Vec<String> = (0..cfg.tile_num)
                .filter(|&d| chip.switches.g4_slot(d, row) == ChannelSlot::Occupied(id))
                .map(|d| format!("{d}[{row}]"))
                .collect();
            let _ = writeln!(out, "{source_tile}[{row}]: {}", dests.join(" "));
        }
    }

    for (t, tile) in chip.tiles.iter().enumerate().take(chip.curtile + 1) {
        if tile.nstate() == 0 {
            continue;
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "--- Tile {t} ---");

        for k in 0..cfg.global_num {
            for row in 0..2 {
                let input_row = tile.tile_size() + 2 * k + row;
                let targets: Vec<String> = tile.rows[input_row].iter().map(usize::to_string).collect();
                let _ = writeln!(out, "{k}[{row}]: {}", targets.join(" "));
            }
        }
        if cfg.has_g4 {
            for row in 0..8 {
                let input_row = tile.tile_size() + 2 * cfg.global_num + row;
                let targets: Vec<String> = tile.rows[input_row].iter().map(usize::to_string).collect();
                let _ = writeln!(out, "G4[{row}]: {}", targets.join(" "));
            }
        }

        for slot in 0..tile.tile_size() {
            if matches!(tile.state[slot], TileSlot::Empty) {
                continue;
            }
            let Some(meta) = &tile.meta[slot] else { continue };
            let pattern = meta.pattern.iter().map(|w| format!("{w:08x}")).collect::<Vec<_>>().join(" ");
            let targets: Vec<String> = tile.rows[slot].iter().map(usize::to_string).collect();
            let _ = write!(
                out,
                "{slot}: {} {} {} {}",
                meta.name,
                meta.start as u8,
                meta.report as u8,
                pattern
            );
            if targets.is_empty() {
                let _ = writeln!(out);
            } else {
                let _ = writeln!(out, " -> {}", targets.join(" "));
            }
        }
    }
}

/// Write the rendered map result to `path` (ordinarily `map_result` in the
/// working directory).
pub fn write_map_result(path: &Path, chips: &[Chip], cfg: &FabricConfig) -> Result<()> {
    let text = render(chips, cfg);
    std::fs::write(path, text)
        .map_err(|e| ApMapError::Internal(format!("write {}: {e}", path.display())))
}

/// The `<x.x> tiles in total` statistic, summing every chip's fractional
/// tile count and rounding to one decimal place.
pub fn tiles_in_total(chips: &[Chip], cfg: &FabricConfig) -> f64 {
    let total: f64 = chips.iter().map(|c| c.tiles_in_total(cfg)).sum();
    (total * 10.0).round() / 10.0
}

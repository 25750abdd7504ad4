//! Fixed fabric constants, exposed as runtime configuration.
//!
//! The original implementation carried these as preprocessor macros with two
//! divergent `def.h` variants (`GLOBAL_NUM` 4 vs 8). Making them fields on a
//! value resolves that divergence: a deployment picks one `FabricConfig`
//! instead of recompiling against a different header.

/// Fixed geometry of the Automata Processor fabric plus the run-time toggles
/// the CLI exposes (`--no-g4`, `--no-opt`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FabricConfig {
    /// Tiles per chip.
    pub tile_num: usize,
    /// Number of 1-way global switches per chip.
    pub global_num: usize,
    /// Chips per system.
    pub chip_num: usize,
    /// STEs per tile.
    pub tile_size: usize,
    /// Below this many free slots, the coordinator closes the current tile
    /// rather than trying to pack more small automata into it.
    pub threshold: usize,
    /// Whether the 4-way global switch is present.
    pub has_g4: bool,
    /// Whether the planner performs cost-driven partition-count search
    /// (Mode A) or accepts the first valid partition (Mode B).
    pub optimize: bool,
}

impl FabricConfig {
    /// The maximum number of outgoing boundary channels (and, symmetrically,
    /// incoming channels) a single partition may use before it must be
    /// duplicated.
    pub fn max_out(&self) -> usize {
        self.global_num * 2 + if self.has_g4 { 8 } else { 0 }
    }

    /// Same cap for incoming edges; kept as a separate accessor so call
    /// sites read as `MAX_IN`/`MAX_OUT` do in the original source.
    pub fn max_in(&self) -> usize {
        self.max_out()
    }
}

impl Default for FabricConfig {
    /// The fabric the test suite assumes: `TILE_NUM=128`, `GLOBAL_NUM=4`,
    /// `TILE_SIZE=256`, `CHIP_NUM=2`, `THRESHOLD=25`, 4-way switch enabled,
    /// cost-driven optimization enabled.
    fn default() -> Self {
        Self {
            tile_num: 128,
            global_num: 4,
            chip_num: 2,
            tile_size: 256,
            threshold: 25,
            has_g4: true,
            optimize: true,
        }
    }
}

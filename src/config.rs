use crate::error::EngineResult;
use crate::mode::ReconstructionParameters;
use crate::tiles::{Palette, TilePool};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Construction-time settings of the engine.
///
/// `tile_size_px` is the texel resolution of each synthesized tile. It is
/// unrelated to `parameters.repeat_size`, the on-screen period the tiles are
/// stretched over.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StereogramConfig {
    pub tile_size_px: u32,
    pub tile_count: usize,
    /// Colors to synthesize tiles from. `None` picks three random colors plus black and white.
    pub palette: Option<Palette>,
    /// Fixed RNG seed for reproducible tiles and tile order. `None` seeds from the OS.
    pub seed: Option<u64>,
    pub parameters: ReconstructionParameters,
    /// Tiles supplied by the caller; when set, nothing is synthesized.
    #[serde(skip)]
    pub tiles: Option<TilePool>,
}

impl Default for StereogramConfig {
    fn default() -> Self {
        Self {
            tile_size_px: 32,
            tile_count: 20,
            palette: None,
            seed: None,
            parameters: ReconstructionParameters::default(),
            tiles: None,
        }
    }
}

impl StereogramConfig {
    pub fn from_json_str(json: &str) -> EngineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> EngineResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn with_tiles(mut self, tiles: TilePool) -> Self {
        self.tiles = Some(tiles);
        self
    }

    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = Some(palette);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

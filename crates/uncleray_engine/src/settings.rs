//! Engine configuration.

use crate::error::{EngineError, EngineResult};
use crate::renderer::Sky;
use serde::{Deserialize, Serialize};

/// Default rows per band.
pub const DEFAULT_CHUNK_HEIGHT: u32 = 16;

/// How each band's random generator is seeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedMode {
    /// `seed + band start scanline`, plus `frame * height` on progressive
    /// passes so each pass draws new samples.
    #[default]
    BandRow,
    /// `seed + frame number`: every band of a frame shares one stream,
    /// successive frames differ. Pair with progressive rendering.
    FrameNumber,
}

/// Quality knobs and scheduling parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub samples_per_pixel: u32,
    /// Maximum bounce depth, 0 renders black
    pub max_depth: u32,
    /// Rows per band
    pub chunk_height: u32,
    /// Worker count, `None` lets rayon decide
    pub threads: Option<usize>,
    /// Blend successive frames instead of overwriting
    pub progressive: bool,
    /// Progressive frame ceiling
    pub max_frames: u32,
    pub seed: u64,
    pub seed_mode: SeedMode,
    /// Random sub-pixel offset per sample
    pub jitter: bool,
    /// Abandon a frame after this many milliseconds
    pub time_limit_ms: Option<u64>,
    pub sky: Sky,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            samples_per_pixel: 15,
            max_depth: 50,
            chunk_height: DEFAULT_CHUNK_HEIGHT,
            threads: None,
            progressive: false,
            max_frames: 1000,
            seed: 123,
            seed_mode: SeedMode::BandRow,
            jitter: true,
            time_limit_ms: None,
            sky: Sky::default(),
        }
    }
}

impl EngineSettings {
    /// Parse settings from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> EngineResult<Self> {
        let settings: EngineSettings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Set quality settings.
    pub fn with_quality(mut self, samples_per_pixel: u32, max_depth: u32) -> Self {
        self.samples_per_pixel = samples_per_pixel;
        self.max_depth = max_depth;
        self
    }

    /// Enable progressive accumulation up to `max_frames`.
    pub fn with_progressive(mut self, max_frames: u32) -> Self {
        self.progressive = true;
        self.max_frames = max_frames;
        self
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.samples_per_pixel == 0 {
            return Err(EngineError::InvalidSamples(self.samples_per_pixel));
        }
        if self.chunk_height == 0 {
            return Err(EngineError::InvalidChunkHeight);
        }
        if self.progressive && self.max_frames == 0 {
            return Err(EngineError::InvalidFrameLimit);
        }
        Ok(())
    }
}

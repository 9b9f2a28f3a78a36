//! Row-band partitioning for the parallel scheduler.
//!
//! The image is cut into horizontal bands of a fixed number of rows, top
//! scanline first. Each band owns its rows of the framebuffer and of the
//! accumulation buffer exclusively, so bands render without locking.

use crate::framebuffer::{blend, store_pixel};
use crate::renderer::{color_to_bgr, PixelSampler};
use crate::settings::SeedMode;
use crate::{Camera, Color, Hittable};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::Instant;

/// A contiguous run of image rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Band {
    /// First data row (0 = top scanline)
    pub first_row: u32,
    /// Number of rows in this band
    pub rows: u32,
    /// Index of this band in dispatch order
    pub index: usize,
}

impl Band {
    /// Create a new band.
    pub fn new(first_row: u32, rows: u32, index: usize) -> Self {
        Self {
            first_row,
            rows,
            index,
        }
    }

    /// Image scanline (counted up from the bottom) of the band's top row.
    pub fn start_scanline(&self, image_height: u32) -> u32 {
        image_height - 1 - self.first_row
    }

    /// Get the total number of pixels in this band.
    pub fn pixel_count(&self, width: u32) -> u32 {
        self.rows * width
    }

    /// Seed for this band's random generator.
    ///
    /// Progressive `BandRow` passes offset the seed by `frame * image_height`
    /// so each pass draws fresh samples while staying reproducible per band.
    pub fn seed(
        &self,
        base: u64,
        mode: SeedMode,
        image_height: u32,
        frame: u32,
        progressive: bool,
    ) -> u64 {
        match mode {
            SeedMode::BandRow => {
                let pass = if progressive { frame as u64 } else { 0 };
                base.wrapping_add(self.start_scanline(image_height) as u64)
                    .wrapping_add(pass * image_height as u64)
            }
            SeedMode::FrameNumber => base.wrapping_add(frame as u64),
        }
    }
}

/// Partition `height` rows into bands of `chunk_height` rows, top first.
///
/// The last band is shorter when `chunk_height` does not divide `height`.
pub fn generate_bands(height: u32, chunk_height: u32) -> Vec<Band> {
    let chunk_height = chunk_height.max(1);
    let mut bands = Vec::with_capacity(height.div_ceil(chunk_height) as usize);

    let mut row = 0;
    while row < height {
        let rows = chunk_height.min(height - row);
        bands.push(Band::new(row, rows, bands.len()));
        row += chunk_height;
    }

    bands
}

/// Cooperative stop signal checked before each row.
pub struct StopCheck<'a> {
    pub cancelled: &'a AtomicBool,
    pub deadline: Option<Instant>,
}

impl StopCheck<'_> {
    pub fn should_stop(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
            || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// Everything a band needs besides its own output slices.
pub struct BandJob<'a> {
    pub camera: &'a Camera,
    pub world: &'a dyn Hittable,
    pub sampler: PixelSampler<'a>,
    pub seed: u64,
    pub seed_mode: SeedMode,
    pub frame: u32,
    /// Blend into the accumulation buffer instead of overwriting it
    pub progressive: bool,
    pub stop: StopCheck<'a>,
}

/// Render one band, blending over `previous` into `accum` and `bytes`.
///
/// `previous` is the band's slice of the last committed accumulation and is
/// never written, so an abandoned band leaves it intact. Rows are rendered top
/// to bottom, pixels left to right. Returns false if the band was stopped
/// before finishing.
pub fn render_band(
    job: &BandJob,
    band: &Band,
    previous: &[Color],
    accum: &mut [Color],
    bytes: &[AtomicU8],
) -> bool {
    let width = job.sampler.width;
    let height = job.sampler.height;
    let seed = band.seed(job.seed, job.seed_mode, height, job.frame, job.progressive);
    let mut rng = StdRng::seed_from_u64(seed);
    let history = if job.progressive { job.frame } else { 0 };

    for local_row in 0..band.rows {
        if job.stop.should_stop() {
            return false;
        }

        let y = band.start_scanline(height) - local_row;
        for x in 0..width {
            let index = (local_row * width + x) as usize;
            let sample = job.sampler.render_pixel(job.camera, job.world, x, y, &mut rng);
            let color = blend(previous[index], sample, history);
            accum[index] = color;
            store_pixel(bytes, index, color_to_bgr(color));
        }
    }

    true
}

//! Shared byte framebuffer and progressive blending.
//!
//! Layout: `width * height * 3` bytes, B/G/R per pixel, row-major. Data row 0
//! holds the top scanline of the image, so image row `y` (counted up from the
//! bottom) lives at data row `height - 1 - y`.
//!
//! Workers write through shared references into disjoint row ranges while a
//! poller may copy the whole buffer; relaxed atomics make that observation
//! race-free without locking.

use crate::Color;
use rayon::prelude::*;
use std::sync::atomic::{AtomicU8, Ordering};

pub const BYTES_PER_PIXEL: usize = 3;

/// Live output of the scheduler.
pub struct Framebuffer {
    width: u32,
    height: u32,
    bytes: Vec<AtomicU8>,
}

impl Framebuffer {
    /// Allocate a black framebuffer.
    pub fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize * BYTES_PER_PIXEL;
        Self {
            width,
            height,
            bytes: (0..len).map(|_| AtomicU8::new(0)).collect(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Total byte count.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Byte offset of pixel (x, y), with `y` counted up from the bottom.
    pub fn offset(&self, x: u32, y: u32) -> usize {
        let data_row = (self.height - y - 1) as usize;
        (x as usize + data_row * self.width as usize) * BYTES_PER_PIXEL
    }

    /// Disjoint slices of `rows` data rows each, top scanline first.
    pub(crate) fn par_bands(&self, rows: u32) -> rayon::slice::Chunks<'_, AtomicU8> {
        let band_len = rows as usize * self.width as usize * BYTES_PER_PIXEL;
        self.bytes.par_chunks(band_len.max(1))
    }

    /// Copy the current contents into `out`, resizing it as needed.
    pub fn copy_into(&self, out: &mut Vec<u8>) {
        out.clear();
        out.extend(self.bytes.iter().map(|b| b.load(Ordering::Relaxed)));
    }

    /// Copy of the current contents, possibly mid-frame.
    pub fn snapshot(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.bytes.len());
        self.copy_into(&mut out);
        out
    }

    /// Overwrite the contents with `bytes`, e.g. to roll back an abandoned frame.
    pub fn load(&mut self, bytes: &[u8]) {
        for (byte, &value) in self.bytes.iter_mut().zip(bytes) {
            *byte.get_mut() = value;
        }
    }

    /// Black out every pixel.
    pub fn clear(&mut self) {
        for byte in &mut self.bytes {
            *byte.get_mut() = 0;
        }
    }
}

/// Store one B/G/R pixel at `index` (in pixels) of a band slice.
#[inline]
pub(crate) fn store_pixel(band: &[AtomicU8], index: usize, bgr: [u8; 3]) {
    let base = index * BYTES_PER_PIXEL;
    for (channel, value) in bgr.into_iter().enumerate() {
        band[base + channel].store(value, Ordering::Relaxed);
    }
}

/// Exponential moving average of `sample` into `accumulated`.
///
/// `frame` is the number of frames already blended in; frame 0 replaces the
/// pixel outright.
#[inline]
pub fn blend(accumulated: Color, sample: Color, frame: u32) -> Color {
    if frame == 0 {
        return sample;
    }
    let weight = 1.0 / (frame as f32 + 1.0);
    accumulated + (sample - accumulated) * weight
}

//! Row bands: disjoint horizontal slices of one `PixelBuffer` that can be
//! drawn from separate threads.
//!
//! The buffer itself has no locking. Splitting it with `bands_mut` hands each
//! worker exclusive rows, and the borrow ends before `present` can run.
//!
//! ```no_run
//! # use fbcanvas::{PixelBuffer, Colour};
//! let mut buffer = PixelBuffer::new(320, 240, false);
//! std::thread::scope(|s| {
//!     for mut band in buffer.bands_mut(4) {
//!         s.spawn(move || {
//!             for y in band.rows() {
//!                 band.draw_line_h(0, y, 319, Colour::grey(y as u8));
//!             }
//!         });
//!     }
//! });
//! ```

use super::pixel_buffer::{blend_straight, write_bgr, PixelBuffer, ALPHA};
use crate::color::Colour;
use std::ops::Range;

/// Exclusive view of a run of whole rows. Coordinates are buffer coordinates;
/// anything outside the band's rows is clipped like anything outside the buffer.
pub struct RowBand<'a> {
    rows: &'a mut [u8],
    first_row: i32,
    row_count: i32,
    width: i32,
    stride: usize,
    pixel_size: usize,
    has_alpha: bool,
}

impl PixelBuffer {
    /// Split into at most `count` bands of (nearly) equal height, top to bottom
    pub fn bands_mut(&mut self, count: usize) -> Vec<RowBand<'_>> {
        let height = self.height() as usize;
        let rows_per_band = height.div_ceil(count.clamp(1, height));
        let width = self.width() as i32;
        let stride = self.stride();
        let pixel_size = self.pixel_size();
        let has_alpha = self.has_alpha();

        self.as_bytes_mut()
            .chunks_mut(rows_per_band * stride)
            .enumerate()
            .map(|(i, rows)| RowBand {
                row_count: (rows.len() / stride) as i32,
                rows,
                first_row: (i * rows_per_band) as i32,
                width,
                stride,
                pixel_size,
                has_alpha,
            })
            .collect()
    }
}

impl RowBand<'_> {
    /// Buffer rows owned by this band
    pub fn rows(&self) -> Range<i32> {
        self.first_row..self.first_row + self.row_count
    }

    pub fn width(&self) -> u32 {
        self.width as u32
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        let local = y - self.first_row;
        if x < 0 || x >= self.width || local < 0 || local >= self.row_count {
            return None;
        }
        Some(local as usize * self.stride + x as usize * self.pixel_size)
    }

    #[inline]
    pub fn write_pixel(&mut self, x: i32, y: i32, r: u8, g: u8, b: u8) {
        self.write_pixel_rgba(x, y, r, g, b, 255);
    }

    #[inline]
    pub fn write_pixel_rgba(&mut self, x: i32, y: i32, r: u8, g: u8, b: u8, a: u8) {
        if let Some(idx) = self.index(x, y) {
            let px = &mut self.rows[idx..idx + self.pixel_size];
            write_bgr(px, r, g, b);
            if self.has_alpha {
                px[ALPHA] = a;
            }
        }
    }

    #[inline]
    pub fn blend_pixel(&mut self, x: i32, y: i32, r: u8, g: u8, b: u8, a: u8) {
        if let Some(idx) = self.index(x, y) {
            let has_alpha = self.has_alpha;
            blend_straight(&mut self.rows[idx..idx + self.pixel_size], r, g, b, a, has_alpha);
        }
    }

    /// Same clamping rules as `PixelBuffer::draw_line_h`
    pub fn draw_line_h(&mut self, from_x: i32, y: i32, to_x: i32, colour: Colour) {
        if !self.rows().contains(&y) {
            return;
        }
        let mut from = from_x.clamp(0, self.width);
        let mut to = to_x.clamp(0, self.width);
        if from == to {
            return;
        }
        if from > to {
            std::mem::swap(&mut from, &mut to);
        }
        for x in from..=to.min(self.width - 1) {
            self.write_pixel_rgba(x, y, colour.r, colour.g, colour.b, colour.a);
        }
    }
}

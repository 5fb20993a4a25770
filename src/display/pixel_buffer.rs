use super::DisplaySurface;
use crate::color::Colour;

// Internal byte order matches the usual framebuffer layout so the fast
// present path is a straight copy. Callers always speak r, g, b, a.
pub(crate) const BLUE: usize = 0;
pub(crate) const GREEN: usize = 1;
pub(crate) const RED: usize = 2;
pub(crate) const ALPHA: usize = 3;

// ============================================================================
// Utility Functions
// ============================================================================

/// Write colour channels in internal order
#[inline]
pub(super) fn write_bgr(dest: &mut [u8], r: u8, g: u8, b: u8) {
    dest[BLUE] = b;
    dest[GREEN] = g;
    dest[RED] = r;
}

/// Straight alpha: out = src*a/255 + dst*(255-a)/255, alpha keeps the max seen
#[inline]
pub(super) fn blend_straight(dest: &mut [u8], r: u8, g: u8, b: u8, a: u8, has_alpha: bool) {
    let sa = a as u32;
    let da = 255 - sa;
    let mix = |s: u8, d: u8| ((s as u32 * sa) / 255 + (d as u32 * da) / 255) as u8;
    let (dr, dg, db) = (dest[RED], dest[GREEN], dest[BLUE]);
    write_bgr(dest, mix(r, dr), mix(g, dg), mix(b, db));
    if has_alpha && dest[ALPHA] < a {
        dest[ALPHA] = a;
    }
}

/// Premultiplied: out = src + dst*a/255 where `a` is already 255 - coverage
#[inline]
fn blend_premultiplied(dest: &mut [u8], r: u8, g: u8, b: u8, a: u8) {
    let da = a as u32;
    let mix = |s: u8, d: u8| (s as u32 + (d as u32 * da) / 255).min(255) as u8;
    let (dr, dg, db) = (dest[RED], dest[GREEN], dest[BLUE]);
    write_bgr(dest, mix(r, dr), mix(g, dg), mix(b, db));
}

/// Premultiply a raw RGBA byte array (red first, as decoders produce it).
/// Output alpha is inverted so it can go straight to `blit_rgba(.., true)`.
pub fn premultiply_rgba(pixels: &mut [u8]) {
    debug_assert!(pixels.len() % 4 == 0, "RGBA data must be whole pixels");
    for px in pixels.chunks_exact_mut(4) {
        let a = px[3] as u32;
        px[0] = ((px[0] as u32 * a) / 255) as u8;
        px[1] = ((px[1] as u32 * a) / 255) as u8;
        px[2] = ((px[2] as u32 * a) / 255) as u8;
        px[3] = 255 - a as u8;
    }
}

// ============================================================================
// PixelBuffer
// ============================================================================

/// Off-screen drawing surface, 8 bits per channel.
///
/// Every primitive clips against the buffer; drawing off the edge is never an
/// error. Pixel size is 3 (no alpha) or 4 (alpha, or one byte of padding).
pub struct PixelBuffer {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    pixel_size: usize,
    stride: usize,
    has_alpha: bool,
    premultiplied: bool,
}

impl PixelBuffer {
    /// Create a buffer with 4 bytes per pixel when `has_alpha`, 3 otherwise
    pub fn new(width: u32, height: u32, has_alpha: bool) -> Self {
        Self::with_format(width, height, if has_alpha { 4 } else { 3 }, has_alpha, false)
    }

    /// Create a buffer with an explicit pixel size
    pub fn with_format(
        width: u32,
        height: u32,
        pixel_size: usize,
        has_alpha: bool,
        premultiplied: bool,
    ) -> Self {
        let mut buffer = Self {
            pixels: Vec::new(),
            width: 0,
            height: 0,
            pixel_size: 0,
            stride: 0,
            has_alpha: false,
            premultiplied: false,
        };
        buffer.resize(width, height, pixel_size, has_alpha, premultiplied);
        buffer
    }

    /// Create a buffer sized to a surface's logical geometry, using the
    /// native pixel size when it is 3 or 4 bytes so `present` can copy directly
    pub fn for_surface(surface: &DisplaySurface) -> Self {
        let pixel_size = match surface.format().pixel_size() {
            3 => 3,
            _ => 4,
        };
        Self::with_format(surface.width(), surface.height(), pixel_size, false, false)
    }

    /// Reinitialise with new geometry. Existing pixels are discarded.
    pub fn resize(
        &mut self,
        width: u32,
        height: u32,
        pixel_size: usize,
        has_alpha: bool,
        premultiplied: bool,
    ) {
        assert!(width > 0 && height > 0, "buffer must have a positive size");
        assert!(pixel_size >= 3, "pixel size must hold red, green and blue");
        assert!(!has_alpha || pixel_size >= 4, "alpha needs a fourth byte");
        assert!(!premultiplied || has_alpha, "premultiplied alpha needs an alpha channel");

        self.width = width;
        self.height = height;
        self.pixel_size = pixel_size;
        self.stride = width as usize * pixel_size;
        self.has_alpha = has_alpha;
        self.premultiplied = premultiplied;
        self.pixels.clear();
        self.pixels.resize(self.stride * height as usize, 0);
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    #[inline]
    pub fn pixel_size(&self) -> usize {
        self.pixel_size
    }

    #[inline]
    pub fn has_alpha(&self) -> bool {
        self.has_alpha
    }

    #[inline]
    pub fn is_premultiplied(&self) -> bool {
        self.premultiplied
    }

    /// Raw storage in internal (blue, green, red, [alpha]) order
    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    #[inline]
    fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && x < self.width as i32 && y >= 0 && y < self.height as i32
    }

    #[inline]
    fn pixel_index(&self, x: usize, y: usize) -> usize {
        y * self.stride + x * self.pixel_size
    }

    #[inline]
    fn store(&mut self, idx: usize, c: Colour) {
        let px = &mut self.pixels[idx..idx + self.pixel_size];
        write_bgr(px, c.r, c.g, c.b);
        if self.has_alpha {
            px[ALPHA] = c.a;
        }
    }

    // ========================================================================
    // Pixels
    // ========================================================================

    /// Write an opaque pixel (bounds checked)
    #[inline]
    pub fn write_pixel(&mut self, x: i32, y: i32, r: u8, g: u8, b: u8) {
        self.write_pixel_rgba(x, y, r, g, b, 255);
    }

    /// Write a pixel; alpha is stored only if the buffer has an alpha channel
    #[inline]
    pub fn write_pixel_rgba(&mut self, x: i32, y: i32, r: u8, g: u8, b: u8, a: u8) {
        if self.in_bounds(x, y) {
            let idx = self.pixel_index(x as usize, y as usize);
            self.store(idx, Colour::rgba(r, g, b, a));
        }
    }

    /// Read (r, g, b, a). Buffers without alpha report 255.
    #[inline]
    pub fn read_pixel(&self, x: i32, y: i32) -> Option<(u8, u8, u8, u8)> {
        if !self.in_bounds(x, y) {
            return None;
        }
        let idx = self.pixel_index(x as usize, y as usize);
        let px = &self.pixels[idx..idx + self.pixel_size];
        let a = if self.has_alpha { px[ALPHA] } else { 255 };
        Some((px[RED], px[GREEN], px[BLUE], a))
    }

    /// Straight alpha blend onto the pixel at (x, y)
    #[inline]
    pub fn blend_pixel(&mut self, x: i32, y: i32, r: u8, g: u8, b: u8, a: u8) {
        if self.in_bounds(x, y) {
            let idx = self.pixel_index(x as usize, y as usize);
            let has_alpha = self.has_alpha;
            blend_straight(&mut self.pixels[idx..idx + self.pixel_size], r, g, b, a, has_alpha);
        }
    }

    /// Blend a premultiplied source. `a` is the inverse coverage (255 - alpha).
    /// Destination alpha is left as it is.
    #[inline]
    pub fn blend_pre_alpha_pixel(&mut self, x: i32, y: i32, r: u8, g: u8, b: u8, a: u8) {
        if self.in_bounds(x, y) {
            let idx = self.pixel_index(x as usize, y as usize);
            blend_premultiplied(&mut self.pixels[idx..idx + self.pixel_size], r, g, b, a);
        }
    }

    /// Premultiply every pixel and invert alpha. One way: a buffer can only be
    /// premultiplied once.
    pub fn premultiply_alpha(&mut self) {
        debug_assert!(self.has_alpha, "premultiply needs an alpha channel");
        debug_assert!(!self.premultiplied, "buffer is already premultiplied");
        if !self.has_alpha || self.premultiplied {
            return;
        }

        self.premultiplied = true;
        for px in self.pixels.chunks_exact_mut(self.pixel_size) {
            let a = px[ALPHA] as u32;
            px[BLUE] = ((px[BLUE] as u32 * a) / 255) as u8;
            px[GREEN] = ((px[GREEN] as u32 * a) / 255) as u8;
            px[RED] = ((px[RED] as u32 * a) / 255) as u8;
            px[ALPHA] = 255 - a as u8;
        }
    }

    /// Set every pixel. Alpha is written only if present.
    pub fn clear(&mut self, colour: Colour) {
        let has_alpha = self.has_alpha;
        for px in self.pixels.chunks_exact_mut(self.pixel_size) {
            write_bgr(px, colour.r, colour.g, colour.b);
            if has_alpha {
                px[ALPHA] = colour.a;
            }
        }
    }

    /// Fill the whole backing store with one byte value
    pub fn clear_bytes(&mut self, value: u8) {
        self.pixels.fill(value);
    }

    /// Fill the half-open area [x0, x1) x [y0, y1), clipped
    fn fill_area(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, colour: Colour) {
        let x0 = x0.clamp(0, self.width as i32) as usize;
        let x1 = x1.clamp(0, self.width as i32) as usize;
        let y0 = y0.clamp(0, self.height as i32) as usize;
        let y1 = y1.clamp(0, self.height as i32) as usize;
        for y in y0..y1 {
            let mut idx = self.pixel_index(x0, y);
            for _ in x0..x1 {
                self.store(idx, colour);
                idx += self.pixel_size;
            }
        }
    }

    // ========================================================================
    // Lines
    // ========================================================================

    /// Horizontal run from `from_x` to `to_x` inclusive.
    /// Endpoints are clamped to the buffer; a zero-length run draws nothing.
    pub fn draw_line_h(&mut self, from_x: i32, y: i32, to_x: i32, colour: Colour) {
        if y < 0 || y >= self.height as i32 {
            return;
        }
        let w = self.width as i32;
        let mut from = from_x.clamp(0, w);
        let mut to = to_x.clamp(0, w);
        if from == to {
            return;
        }
        if from > to {
            std::mem::swap(&mut from, &mut to);
        }

        let mut idx = self.pixel_index(from as usize, y as usize);
        for _ in from..=to.min(w - 1) {
            self.store(idx, colour);
            idx += self.pixel_size;
        }
    }

    /// Vertical run from `from_y` to `to_y` inclusive, same clamping as `draw_line_h`
    pub fn draw_line_v(&mut self, x: i32, from_y: i32, to_y: i32, colour: Colour) {
        if x < 0 || x >= self.width as i32 {
            return;
        }
        let h = self.height as i32;
        let mut from = from_y.clamp(0, h);
        let mut to = to_y.clamp(0, h);
        if from == to {
            return;
        }
        if from > to {
            std::mem::swap(&mut from, &mut to);
        }

        let mut idx = self.pixel_index(x as usize, from as usize);
        for _ in from..=to.min(h - 1) {
            self.store(idx, colour);
            idx += self.stride;
        }
    }

    /// Any line. Axis-aligned lines take the run fast paths.
    pub fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, colour: Colour) {
        if x0 == x1 {
            self.draw_line_v(x0, y0, y1, colour);
        } else if y0 == y1 {
            self.draw_line_h(x0, y0, x1, colour);
        } else {
            self.draw_line_bresenham(x0, y0, x1, y1, colour);
        }
    }

    /// Integer Bresenham for all 8 octants.
    /// The walk starts at the first step that lands inside the buffer and stops after the last.
    fn draw_line_bresenham(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, colour: Colour) {
        let (x0, y0, x1, y1) = (x0 as i64, y0 as i64, x1 as i64, y1 as i64);
        let step_x = if x1 < x0 { -1 } else { 1 };
        let step_y = if y1 < y0 { -1 } else { 1 };
        let delta_x = (x1 - x0).abs();
        let delta_y = (y1 - y0).abs();

        // x steps every pixel when it is the longer axis, y only on overflow
        let x_major = delta_x >= delta_y;
        let (major0, major_step, major_len, minor0, minor_step, den, numadd) = if x_major {
            (x0, step_x, self.width as i64, y0, step_y, delta_x, delta_y)
        } else {
            (y0, step_y, self.height as i64, x0, step_x, delta_y, delta_x)
        };

        let (first, last) = if major_step > 0 {
            ((-major0).max(0), den.min(major_len - 1 - major0))
        } else {
            ((major0 - (major_len - 1)).max(0), den.min(major0))
        };
        if first > last {
            return;
        }

        // Error term and minor position after `first` steps
        let acc = (den >> 1) as i128 + first as i128 * numadd as i128;
        let mut num = (acc % den as i128) as i64;
        let mut minor = minor0 + (acc / den as i128) as i64 * minor_step;
        let mut major = major0 + first * major_step;

        let (w, h) = (self.width as i64, self.height as i64);
        for _ in first..=last {
            let (x, y) = if x_major { (major, minor) } else { (minor, major) };
            if x >= 0 && x < w && y >= 0 && y < h {
                let idx = self.pixel_index(x as usize, y as usize);
                self.store(idx, colour);
            }
            num += numadd;
            if num >= den {
                num -= den;
                minor += minor_step;
            }
            major += major_step;
        }
    }

    // ========================================================================
    // Circles
    // ========================================================================

    /// Walk one octant of a midpoint circle, handing (x, y) offsets to `emit`
    fn midpoint_octant(radius: i32, mut emit: impl FnMut(i32, i32)) {
        let mut x = radius - 1;
        let mut y = 0;
        let mut dx = 1;
        let mut dy = 1;
        let mut err = dx - (radius << 1);

        while x >= y {
            emit(x, y);

            if err <= 0 {
                y += 1;
                err += dy;
                dy += 2;
            }
            if err > 0 {
                x -= 1;
                dx += 2;
                err += -(radius << 1) + dx;
            }
        }
    }

    /// Circle outline (1px)
    pub fn draw_circle(&mut self, cx: i32, cy: i32, radius: i32, colour: Colour) {
        let Colour { r, g, b, a } = colour;
        Self::midpoint_octant(radius, |x, y| {
            self.write_pixel_rgba(cx + x, cy + y, r, g, b, a);
            self.write_pixel_rgba(cx + y, cy + x, r, g, b, a);
            self.write_pixel_rgba(cx - y, cy + x, r, g, b, a);
            self.write_pixel_rgba(cx - x, cy + y, r, g, b, a);
            self.write_pixel_rgba(cx - x, cy - y, r, g, b, a);
            self.write_pixel_rgba(cx - y, cy - x, r, g, b, a);
            self.write_pixel_rgba(cx + y, cy - x, r, g, b, a);
            self.write_pixel_rgba(cx + x, cy - y, r, g, b, a);
        });
    }

    /// Filled circle from four mirrored horizontal spans per step
    pub fn fill_circle(&mut self, cx: i32, cy: i32, radius: i32, colour: Colour) {
        Self::midpoint_octant(radius, |x, y| {
            self.draw_line_h(cx - x, cy + y, cx + x, colour);
            self.draw_line_h(cx - x, cy - y, cx + x, colour);
            self.draw_line_h(cx - y, cy + x, cx + y, colour);
            self.draw_line_h(cx - y, cy - x, cx + y, colour);
        });
    }

    // ========================================================================
    // Rectangles
    // ========================================================================

    /// Rectangle outline with corners at (x0, y0) and (x1, y1)
    pub fn draw_rectangle(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, colour: Colour) {
        self.draw_line_h(x0, y0, x1, colour);
        self.draw_line_h(x0, y1, x1, colour);
        self.draw_line_v(x0, y0, y1, colour);
        self.draw_line_v(x1, y0, y1, colour);
    }

    /// Filled rectangle, corners inclusive. Nothing is drawn if either axis
    /// clamps to zero extent.
    pub fn fill_rectangle(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, colour: Colour) {
        let h = self.height as i32;
        let mut from_y = y0.clamp(0, h);
        let mut to_y = y1.clamp(0, h);
        if from_y == to_y {
            return;
        }
        if from_y > to_y {
            std::mem::swap(&mut from_y, &mut to_y);
        }

        let w = self.width as i32;
        let mut from_x = x0.clamp(0, w);
        let mut to_x = x1.clamp(0, w);
        if from_x == to_x {
            return;
        }
        if from_x > to_x {
            std::mem::swap(&mut from_x, &mut to_x);
        }

        for y in from_y..=to_y {
            self.draw_line_h(from_x, y, to_x, colour);
        }
    }

    /// Order the corners and fit the radius. Returns None for a zero-extent
    /// rectangle, or the circle to draw instead when the radius swallows both axes.
    fn rounded_geometry(x0: i32, y0: i32, x1: i32, y1: i32, radius: i32) -> Option<RoundedShape> {
        if y0 == y1 || x0 == x1 {
            return None;
        }
        let (top, bottom) = (y0.min(y1), y0.max(y1));
        let (left, right) = (x0.min(x1), x0.max(x1));
        // Spans and doubled radius can exceed i32 at the extremes
        let w = right as i64 - left as i64;
        let h = bottom as i64 - top as i64;
        let r = radius as i64;

        if r * 2 >= w && r * 2 >= h {
            return Some(RoundedShape::Circle {
                cx: ((left as i64 + right as i64) / 2) as i32,
                cy: ((top as i64 + bottom as i64) / 2) as i32,
                radius: (w.min(h) / 2) as i32,
            });
        }

        Some(RoundedShape::Corners {
            left,
            top,
            right,
            bottom,
            radius: r.min(w / 2).min(h / 2) as i32,
        })
    }

    /// Rectangle outline with quarter-circle corners.
    /// `radius < 1` draws a plain rectangle; a radius covering both axes draws a circle.
    pub fn draw_rounded_rectangle(
        &mut self,
        x0: i32,
        y0: i32,
        x1: i32,
        y1: i32,
        radius: i32,
        colour: Colour,
    ) {
        if radius < 1 {
            self.draw_rectangle(x0, y0, x1, y1, colour);
            return;
        }

        match Self::rounded_geometry(x0, y0, x1, y1, radius) {
            None => {},
            Some(RoundedShape::Circle { cx, cy, radius }) => self.draw_circle(cx, cy, radius, colour),
            Some(RoundedShape::Corners { left: x0, top: y0, right: x1, bottom: y1, radius }) => {
                let left = x0 + radius;
                let right = x1 - radius;
                let top = y0 + radius;
                let bottom = y1 - radius;
                let Colour { r, g, b, a } = colour;

                Self::midpoint_octant(radius, |x, y| {
                    self.write_pixel_rgba(left - x, top - y, r, g, b, a);
                    self.write_pixel_rgba(left - y, top - x, r, g, b, a);
                    self.write_pixel_rgba(right + y, top - x, r, g, b, a);
                    self.write_pixel_rgba(right + x, top - y, r, g, b, a);

                    self.write_pixel_rgba(right + x, bottom + y, r, g, b, a);
                    self.write_pixel_rgba(right + y, bottom + x, r, g, b, a);
                    self.write_pixel_rgba(left - y, bottom + x, r, g, b, a);
                    self.write_pixel_rgba(left - x, bottom + y, r, g, b, a);
                });

                self.draw_line_h(left, y0, right, colour);
                self.draw_line_h(left, y1, right, colour);
                self.draw_line_v(x0, top, bottom, colour);
                self.draw_line_v(x1, top, bottom, colour);
            },
        }
    }

    /// Filled rounded rectangle, same degenerate cases as the outline
    pub fn fill_rounded_rectangle(
        &mut self,
        x0: i32,
        y0: i32,
        x1: i32,
        y1: i32,
        radius: i32,
        colour: Colour,
    ) {
        if radius < 1 {
            self.fill_rectangle(x0, y0, x1, y1, colour);
            return;
        }

        match Self::rounded_geometry(x0, y0, x1, y1, radius) {
            None => {},
            Some(RoundedShape::Circle { cx, cy, radius }) => self.fill_circle(cx, cy, radius, colour),
            Some(RoundedShape::Corners { left: x0, top: y0, right: x1, bottom: y1, radius }) => {
                let left = x0 + radius;
                let right = x1 - radius;
                let top = y0 + radius;
                let bottom = y1 - radius;

                Self::midpoint_octant(radius, |x, y| {
                    self.draw_line_h(left - x, top - y, right + x, colour);
                    self.draw_line_h(left - y, top - x, right + y, colour);
                    self.draw_line_h(left - x, bottom + y, right + x, colour);
                    self.draw_line_h(left - y, bottom + x, right + y, colour);
                });

                self.fill_rectangle(x0, y0 + radius, x1, y1 - radius, colour);
            },
        }
    }

    // ========================================================================
    // Fills
    // ========================================================================

    /// Grid of `x_count` by `y_count` cells, each `x_size` by `y_size` pixels.
    /// Cell (0, 0) and every cell of matching parity use `colours[0]`.
    pub fn fill_checker_board(
        &mut self,
        x: i32,
        y: i32,
        x_count: i32,
        y_count: i32,
        x_size: i32,
        y_size: i32,
        colours: [Colour; 2],
    ) {
        if x_size <= 0 || y_size <= 0 {
            return;
        }
        let mut cell_y = y;
        for row in 0..y_count {
            let mut cell_x = x;
            for col in 0..x_count {
                let colour = if (col & 1) == (row & 1) { colours[0] } else { colours[1] };
                self.fill_area(cell_x, cell_y, cell_x + x_size, cell_y + y_size, colour);
                cell_x += x_size;
            }
            cell_y += y_size;
        }
    }

    /// Checker board covering the whole buffer, partial cells at the far edges
    pub fn fill_checker_board_full(&mut self, x_size: i32, y_size: i32, colours: [Colour; 2]) {
        if x_size <= 0 || y_size <= 0 {
            return;
        }
        let x_count = (self.width as i32 + x_size - 1) / x_size;
        let y_count = (self.height as i32 + y_size - 1) / y_size;
        self.fill_checker_board(0, 0, x_count, y_count, x_size, y_size, colours);
    }

    /// Vertical gradient from `from` at `from_y` to `to` at `to_y`, each row a solid run.
    /// Swapping the y arguments keeps `from` on the `from_y` row.
    pub fn draw_gradient(
        &mut self,
        from_x: i32,
        from_y: i32,
        to_x: i32,
        to_y: i32,
        from: Colour,
        to: Colour,
    ) {
        if from_y == to_y || from_x == to_x {
            return;
        }
        let (from_x, to_x) = (from_x.min(to_x), from_x.max(to_x));

        let (top, bottom, mut a, step) = if from_y > to_y {
            (to_y, from_y, 1.0f32, -1.0 / (from_y - to_y) as f32)
        } else {
            (from_y, to_y, 0.0f32, 1.0 / (to_y - from_y) as f32)
        };

        let (fr, fg, fb) = (from.r as f32 / 255.0, from.g as f32 / 255.0, from.b as f32 / 255.0);
        let (tr, tg, tb) = (to.r as f32 / 255.0, to.g as f32 / 255.0, to.b as f32 / 255.0);

        for y in top..=bottom {
            let inv = 1.0 - a;
            let r = ((fr * inv + tr * a) * 255.0) as u8;
            let g = ((fg * inv + tg * a) * 255.0) as u8;
            let b = ((fb * inv + tb * a) * 255.0) as u8;
            self.draw_line_h(from_x, y, to_x, Colour::rgb(r, g, b));
            a += step;
        }
    }

    // ========================================================================
    // Buffer Operations
    // ========================================================================

    /// Shift contents by (dx, dy) pixels; the exposed strips are set to `fill`.
    /// Positive dx moves content right, positive dy moves it down.
    pub fn scroll_buffer(&mut self, dx: i32, dy: i32, fill: Colour) {
        let w = self.width as i32;
        let h = self.height as i32;
        if dx.unsigned_abs() >= self.width || dy.unsigned_abs() >= self.height {
            self.fill_area(0, 0, w, h, fill);
            return;
        }

        let lines = (h - dy.abs()) as usize;
        let row_bytes = (w - dx.abs()) as usize * self.pixel_size;
        let src_x = if dx < 0 { (-dx) as usize } else { 0 };
        let dst_x = if dx > 0 { dx as usize } else { 0 };

        let stride = self.stride;
        let pixel_size = self.pixel_size;
        let pixels = &mut self.pixels;
        // Walk away from the shift so overlapping rows are read before being overwritten.
        let mut copy_row = |i: usize| {
            let (src_y, dst_y) = if dy >= 0 { (i, i + dy as usize) } else { (i + (-dy) as usize, i) };
            let src = src_y * stride + src_x * pixel_size;
            let dst = dst_y * stride + dst_x * pixel_size;
            pixels.copy_within(src..src + row_bytes, dst);
        };
        if dy >= 0 {
            (0..lines).rev().for_each(&mut copy_row);
        } else {
            (0..lines).for_each(&mut copy_row);
        }

        if dy > 0 {
            self.fill_area(0, 0, w, dy, fill);
        } else if dy < 0 {
            self.fill_area(0, h + dy, w, h, fill);
        }
        if dx > 0 {
            self.fill_area(0, 0, dx, h, fill);
        } else if dx < 0 {
            self.fill_area(w + dx, 0, w, h, fill);
        }
    }

    /// Source column range [start, end) of `src_w` columns landing inside `dst_w`
    #[inline]
    fn clip_span(pos: i32, src_w: i32, dst_w: i32) -> (i32, i32) {
        ((-pos).max(0), src_w.min(dst_w - pos))
    }

    /// Copy another buffer at (x, y), no blending.
    /// Source alpha (or opaque) is stored when this buffer has alpha.
    pub fn blit(&mut self, src: &PixelBuffer, x: i32, y: i32) {
        let (sx0, sx1) = Self::clip_span(x, src.width as i32, self.width as i32);
        let (sy0, sy1) = Self::clip_span(y, src.height as i32, self.height as i32);

        for sy in sy0..sy1 {
            let mut src_idx = src.pixel_index(sx0 as usize, sy as usize);
            let mut dst_idx = self.pixel_index((x + sx0) as usize, (y + sy) as usize);
            for _ in sx0..sx1 {
                let px = &src.pixels[src_idx..src_idx + src.pixel_size];
                let a = if src.has_alpha { px[ALPHA] } else { 255 };
                self.store(dst_idx, Colour::rgba(px[RED], px[GREEN], px[BLUE], a));
                src_idx += src.pixel_size;
                dst_idx += self.pixel_size;
            }
        }
    }

    /// Composite another buffer at (x, y), picking the blend by the source's format
    pub fn blend(&mut self, src: &PixelBuffer, x: i32, y: i32) {
        if !src.has_alpha {
            self.blit(src, x, y);
            return;
        }

        let (sx0, sx1) = Self::clip_span(x, src.width as i32, self.width as i32);
        let (sy0, sy1) = Self::clip_span(y, src.height as i32, self.height as i32);
        for sy in sy0..sy1 {
            for sx in sx0..sx1 {
                let idx = src.pixel_index(sx as usize, sy as usize);
                let px = &src.pixels[idx..idx + src.pixel_size];
                let (r, g, b, a) = (px[RED], px[GREEN], px[BLUE], px[ALPHA]);
                if src.premultiplied {
                    self.blend_pre_alpha_pixel(x + sx, y + sy, r, g, b, a);
                } else {
                    self.blend_pixel(x + sx, y + sy, r, g, b, a);
                }
            }
        }
    }

    /// Copy tightly packed RGB bytes (red first) at (x, y)
    pub fn blit_rgb(&mut self, src: &[u8], x: i32, y: i32, src_width: usize, src_height: usize) {
        self.blit_rgb_region(src, x, y, src_width, src_height, 0, 0, src_width * 3);
    }

    /// Copy a `width` x `height` window starting at (src_x, src_y) of a larger RGB image
    pub fn blit_rgb_region(
        &mut self,
        src: &[u8],
        x: i32,
        y: i32,
        width: usize,
        height: usize,
        src_x: usize,
        src_y: usize,
        src_stride: usize,
    ) {
        self.walk_source(src, 3, x, y, width, height, src_x, src_y, src_stride, |buf, dx, dy, px| {
            buf.write_pixel(dx, dy, px[0], px[1], px[2]);
        });
    }

    /// Blend tightly packed RGBA bytes at (x, y).
    /// With `premultiplied`, alpha bytes must already be inverted (see `premultiply_rgba`).
    pub fn blit_rgba(
        &mut self,
        src: &[u8],
        x: i32,
        y: i32,
        src_width: usize,
        src_height: usize,
        premultiplied: bool,
    ) {
        self.blit_rgba_region(src, x, y, src_width, src_height, 0, 0, src_width * 4, premultiplied);
    }

    /// Blend a window of a larger RGBA image
    pub fn blit_rgba_region(
        &mut self,
        src: &[u8],
        x: i32,
        y: i32,
        width: usize,
        height: usize,
        src_x: usize,
        src_y: usize,
        src_stride: usize,
        premultiplied: bool,
    ) {
        self.walk_source(src, 4, x, y, width, height, src_x, src_y, src_stride, |buf, dx, dy, px| {
            if premultiplied {
                buf.blend_pre_alpha_pixel(dx, dy, px[0], px[1], px[2], px[3]);
            } else {
                buf.blend_pixel(dx, dy, px[0], px[1], px[2], px[3]);
            }
        });
    }

    /// Visit each source pixel of a raw image window whose destination is
    /// on this buffer. Rows running past the end of `src` are cut short.
    fn walk_source(
        &mut self,
        src: &[u8],
        bytes_per_pixel: usize,
        x: i32,
        y: i32,
        width: usize,
        height: usize,
        src_x: usize,
        src_y: usize,
        src_stride: usize,
        mut visit: impl FnMut(&mut Self, i32, i32, &[u8]),
    ) {
        let (cx0, cx1) = Self::clip_span(x, width as i32, self.width as i32);
        let (cy0, cy1) = Self::clip_span(y, height as i32, self.height as i32);

        for row in cy0..cy1 {
            let base = (src_y + row as usize) * src_stride + src_x * bytes_per_pixel;
            for col in cx0..cx1 {
                let offset = base + col as usize * bytes_per_pixel;
                let Some(px) = src.get(offset..offset + bytes_per_pixel) else {
                    break;
                };
                visit(self, x + col, y + row, px);
            }
        }
    }
}

enum RoundedShape {
    Circle { cx: i32, cy: i32, radius: i32 },
    Corners { left: i32, top: i32, right: i32, bottom: i32, radius: i32 },
}

impl std::fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("pixel_size", &self.pixel_size)
            .field("has_alpha", &self.has_alpha)
            .field("premultiplied", &self.premultiplied)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const INK: Colour = Colour::rgb(250, 10, 20);

    fn checksum(buf: &PixelBuffer) -> u64 {
        buf.as_bytes()
            .iter()
            .enumerate()
            .fold(0u64, |acc, (i, &b)| acc.wrapping_mul(31).wrapping_add(b as u64 ^ i as u64))
    }

    fn lit(buf: &PixelBuffer) -> HashSet<(i32, i32)> {
        let mut set = HashSet::new();
        for y in 0..buf.height() as i32 {
            for x in 0..buf.width() as i32 {
                if buf.read_pixel(x, y).map(|(r, g, b, _)| (r, g, b)) != Some((0, 0, 0)) {
                    set.insert((x, y));
                }
            }
        }
        set
    }

    fn rgb(buf: &PixelBuffer, x: i32, y: i32) -> (u8, u8, u8) {
        let (r, g, b, _) = buf.read_pixel(x, y).unwrap();
        (r, g, b)
    }

    #[test]
    fn test_layout_and_byte_order() {
        let mut buf = PixelBuffer::new(4, 3, true);
        assert_eq!(buf.pixel_size(), 4);
        assert_eq!(buf.stride(), 16);
        assert_eq!(buf.as_bytes().len(), 48);

        buf.write_pixel_rgba(1, 2, 10, 20, 30, 40);
        let idx = 2 * 16 + 4;
        assert_eq!(&buf.as_bytes()[idx..idx + 4], &[30, 20, 10, 40]);
        assert_eq!(buf.read_pixel(1, 2), Some((10, 20, 30, 40)));

        let rgb_only = PixelBuffer::new(5, 2, false);
        assert_eq!(rgb_only.pixel_size(), 3);
        assert_eq!(rgb_only.stride(), 15);
    }

    #[test]
    fn test_write_without_alpha_leaves_padding() {
        let mut buf = PixelBuffer::with_format(2, 2, 4, false, false);
        buf.write_pixel_rgba(0, 0, 1, 2, 3, 99);
        assert_eq!(&buf.as_bytes()[0..4], &[3, 2, 1, 0]);
        assert_eq!(buf.read_pixel(0, 0), Some((1, 2, 3, 255)));
    }

    #[test]
    #[should_panic]
    fn test_zero_size_is_rejected() {
        let _ = PixelBuffer::new(0, 10, false);
    }

    #[test]
    #[should_panic]
    fn test_premultiplied_without_alpha_is_rejected() {
        let _ = PixelBuffer::with_format(4, 4, 4, false, true);
    }

    #[test]
    fn test_blend_identities() {
        let mut buf = PixelBuffer::new(4, 4, true);
        buf.clear(Colour::rgba(40, 80, 120, 10));

        buf.blend_pixel(1, 1, 200, 100, 50, 255);
        assert_eq!(buf.read_pixel(1, 1), Some((200, 100, 50, 255)));

        buf.blend_pixel(2, 2, 200, 100, 50, 0);
        assert_eq!(buf.read_pixel(2, 2), Some((40, 80, 120, 10)));
    }

    #[test]
    fn test_blend_truncates_and_keeps_max_alpha() {
        let mut buf = PixelBuffer::new(2, 1, true);
        buf.clear(Colour::rgba(100, 100, 100, 200));
        buf.blend_pixel(0, 0, 255, 0, 50, 128);
        // 255*128/255 + 100*127/255 = 128 + 49
        assert_eq!(buf.read_pixel(0, 0), Some((177, 49, 25 + 49, 200)));

        buf.blend_pixel(1, 0, 0, 0, 0, 220);
        assert_eq!(buf.read_pixel(1, 0).unwrap().3, 220);
    }

    #[test]
    fn test_blend_pre_alpha_matches_straight() {
        let mut straight = PixelBuffer::new(1, 1, false);
        let mut pre = PixelBuffer::new(1, 1, false);
        straight.clear(Colour::rgb(90, 180, 30));
        pre.clear(Colour::rgb(90, 180, 30));

        let (r, g, b, a) = (200u32, 60u32, 240u32, 128u32);
        straight.blend_pixel(0, 0, r as u8, g as u8, b as u8, a as u8);
        pre.blend_pre_alpha_pixel(0, 0, (r * a / 255) as u8, (g * a / 255) as u8, (b * a / 255) as u8, (255 - a) as u8);
        assert_eq!(straight.read_pixel(0, 0), pre.read_pixel(0, 0));

        // Zero coverage leaves the destination untouched.
        let before = rgb(&pre, 0, 0);
        pre.blend_pre_alpha_pixel(0, 0, 0, 0, 0, 255);
        assert_eq!(rgb(&pre, 0, 0), before);
    }

    #[test]
    fn test_premultiply_round_trip() {
        let mut buf = PixelBuffer::new(3, 1, true);
        let originals = [(200u8, 100u8, 50u8, 128u8), (255, 255, 255, 0), (17, 34, 51, 255)];
        for (x, &(r, g, b, a)) in originals.iter().enumerate() {
            buf.write_pixel_rgba(x as i32, 0, r, g, b, a);
        }
        buf.premultiply_alpha();
        assert!(buf.is_premultiplied());

        for (x, &(r, g, b, a)) in originals.iter().enumerate() {
            let scale = |c: u8| ((c as u32 * a as u32) / 255) as u8;
            assert_eq!(buf.read_pixel(x as i32, 0), Some((scale(r), scale(g), scale(b), 255 - a)));
        }
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "already premultiplied")]
    fn test_double_premultiply_panics() {
        let mut buf = PixelBuffer::new(2, 2, true);
        buf.premultiply_alpha();
        buf.premultiply_alpha();
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "alpha channel")]
    fn test_premultiply_without_alpha_panics() {
        let mut buf = PixelBuffer::new(2, 2, false);
        buf.premultiply_alpha();
    }

    #[test]
    fn test_raw_premultiply_feeds_blit_rgba() {
        let mut src = vec![200, 100, 50, 128];
        premultiply_rgba(&mut src);
        assert_eq!(src, vec![100, 50, 25, 127]);

        let mut pre = PixelBuffer::new(1, 1, false);
        let mut straight = PixelBuffer::new(1, 1, false);
        pre.clear(Colour::rgb(10, 20, 30));
        straight.clear(Colour::rgb(10, 20, 30));
        pre.blit_rgba(&src, 0, 0, 1, 1, true);
        straight.blit_rgba(&[200, 100, 50, 128], 0, 0, 1, 1, false);

        let (a, b) = (rgb(&pre, 0, 0), rgb(&straight, 0, 0));
        assert!((a.0 as i32 - b.0 as i32).abs() <= 1);
        assert!((a.1 as i32 - b.1 as i32).abs() <= 1);
        assert!((a.2 as i32 - b.2 as i32).abs() <= 1);
    }

    #[test]
    fn test_clipping_never_mutates() {
        let mut buf = PixelBuffer::new(8, 6, true);
        buf.clear(Colour::rgba(1, 2, 3, 4));
        let before = checksum(&buf);

        for &(x, y) in &[(-1, 0), (0, -1), (8, 0), (0, 6), (i32::MIN, i32::MAX), (100, 100)] {
            buf.write_pixel(x, y, 255, 255, 255);
            buf.blend_pixel(x, y, 255, 255, 255, 128);
            buf.blend_pre_alpha_pixel(x, y, 255, 255, 255, 0);
            assert_eq!(buf.read_pixel(x, y), None);
        }
        assert_eq!(checksum(&buf), before);
    }

    #[test]
    fn test_clear_variants() {
        let mut buf = PixelBuffer::new(3, 3, true);
        buf.clear(Colour::rgba(9, 8, 7, 6));
        assert!(buf.as_bytes().chunks(4).all(|px| px == [7, 8, 9, 6]));
        buf.clear_bytes(0xAB);
        assert!(buf.as_bytes().iter().all(|&b| b == 0xAB));
    }

    #[test]
    fn test_line_h_endpoints_inclusive() {
        let mut buf = PixelBuffer::new(20, 10, false);
        buf.draw_line_h(0, 5, 10, INK);
        for x in 0..20 {
            assert_eq!(rgb(&buf, x, 5) == (250, 10, 20), x <= 10, "x = {}", x);
        }
        assert_eq!(lit(&buf).len(), 11);
    }

    #[test]
    fn test_line_clamps_and_degenerates() {
        let mut buf = PixelBuffer::new(10, 10, false);
        buf.draw_line_h(5, 2, 5, INK);
        buf.draw_line_v(5, 3, 3, INK);
        buf.draw_line_h(0, 10, 9, INK);
        buf.draw_line_v(-1, 0, 9, INK);
        assert!(lit(&buf).is_empty());

        // Reversed and overhanging endpoints clamp to the edge.
        buf.draw_line_h(50, 4, -50, INK);
        assert_eq!(lit(&buf).len(), 10);
        buf.draw_line_v(0, 50, 6, INK);
        assert!(lit(&buf).contains(&(0, 9)));
        assert!(!lit(&buf).contains(&(0, 5)));
    }

    #[test]
    fn test_line_dispatch_matches_runs() {
        let mut a = PixelBuffer::new(16, 16, true);
        let mut b = PixelBuffer::new(16, 16, true);
        a.draw_line(2, 7, 13, 7, INK);
        b.draw_line_h(2, 7, 13, INK);
        a.draw_line(4, 14, 4, 1, INK);
        b.draw_line_v(4, 14, 1, INK);
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    /// Unclipped walk of every point, for comparison
    fn plain_bresenham(x0: i64, y0: i64, x1: i64, y1: i64) -> Vec<(i64, i64)> {
        let (dx, dy) = ((x1 - x0).abs(), (y1 - y0).abs());
        let (sx, sy) = (if x1 < x0 { -1 } else { 1 }, if y1 < y0 { -1 } else { 1 });
        let (den, numadd) = (dx.max(dy), dx.min(dy));
        let mut num = den >> 1;
        let (mut x, mut y) = (x0, y0);
        let mut points = Vec::new();
        for _ in 0..=den {
            points.push((x, y));
            num += numadd;
            if num >= den {
                num -= den;
                if dx >= dy { y += sy } else { x += sx }
            }
            if dx >= dy { x += sx } else { y += sy }
        }
        points
    }

    #[test]
    fn test_bresenham_offscreen_start_matches_full_walk() {
        let lines = [(-40, -13, 60, 23), (70, 3, -25, 11), (5, -90, 9, 40), (-3, 50, 12, -31)];
        for (x0, y0, x1, y1) in lines {
            let mut buf = PixelBuffer::new(16, 16, false);
            buf.draw_line(x0, y0, x1, y1, INK);
            let expected: HashSet<(i32, i32)> = plain_bresenham(x0 as i64, y0 as i64, x1 as i64, y1 as i64)
                .into_iter()
                .filter(|&(x, y)| (0..16).contains(&x) && (0..16).contains(&y))
                .map(|(x, y)| (x as i32, y as i32))
                .collect();
            assert!(!expected.is_empty());
            assert_eq!(lit(&buf), expected, "line ({}, {}) -> ({}, {})", x0, y0, x1, y1);
        }
    }

    #[test]
    fn test_bresenham_extreme_endpoints() {
        let mut buf = PixelBuffer::new(16, 16, false);
        buf.draw_line(i32::MIN, 0, i32::MAX, 3, INK);
        let px = lit(&buf);
        for x in 0..16 {
            assert_eq!(px.iter().filter(|p| p.0 == x).count(), 1, "column {}", x);
        }

        buf.clear(Colour::BLACK);
        buf.draw_line(3, i32::MAX, -2, i32::MIN, INK);
        assert_eq!(lit(&buf).len(), 16);
    }

    #[test]
    fn test_bresenham_octants_hit_endpoints() {
        let ends = [(15, 3), (15, 12), (3, 15), (12, 15), (-5, 3), (0, 14), (4, -6), (14, 0)];
        for (x1, y1) in ends {
            let mut buf = PixelBuffer::new(16, 16, false);
            buf.draw_line(7, 8, x1, y1, INK);
            assert_eq!(rgb(&buf, 7, 8), (250, 10, 20));
            if buf.read_pixel(x1, y1).is_some() {
                assert_eq!(rgb(&buf, x1, y1), (250, 10, 20), "end ({}, {})", x1, y1);
            }
        }
    }

    #[test]
    fn test_bresenham_diagonal() {
        let mut buf = PixelBuffer::new(8, 8, false);
        buf.draw_line(0, 0, 7, 7, INK);
        let expected: HashSet<_> = (0..8).map(|i| (i, i)).collect();
        assert_eq!(lit(&buf), expected);
    }

    #[test]
    fn test_circle_is_eight_way_symmetric() {
        for radius in [1, 2, 5, 9, 14] {
            let mut buf = PixelBuffer::new(41, 41, false);
            buf.draw_circle(20, 20, radius, INK);
            let points: HashSet<_> = lit(&buf).iter().map(|&(x, y)| (x - 20, y - 20)).collect();
            assert!(!points.is_empty());
            for &(x, y) in &points {
                for p in [(-x, y), (x, -y), (-x, -y), (y, x), (-y, x), (y, -x), (-y, -x)] {
                    assert!(points.contains(&p), "r={} missing {:?} for {:?}", radius, p, (x, y));
                }
            }
        }
    }

    #[test]
    fn test_circle_radius_extent() {
        let mut buf = PixelBuffer::new(41, 41, false);
        buf.draw_circle(20, 20, 10, INK);
        let max = lit(&buf).iter().map(|&(x, _)| x - 20).max().unwrap();
        assert_eq!(max, 9);

        let mut empty = PixelBuffer::new(8, 8, false);
        empty.draw_circle(4, 4, 0, INK);
        empty.fill_circle(4, 4, -3, INK);
        assert!(lit(&empty).is_empty());
    }

    #[test]
    fn test_fill_circle_covers_outline_interior() {
        let mut outline = PixelBuffer::new(41, 41, false);
        let mut filled = PixelBuffer::new(41, 41, false);
        outline.draw_circle(20, 20, 12, INK);
        filled.fill_circle(20, 20, 12, INK);
        let fill = lit(&filled);
        assert!(fill.contains(&(20, 20)));
        for row in 10..=30 {
            let xs: Vec<i32> = fill.iter().filter(|p| p.1 == row).map(|p| p.0).collect();
            if let (Some(&lo), Some(&hi)) = (xs.iter().min(), xs.iter().max()) {
                assert_eq!(xs.len() as i32, hi - lo + 1, "row {} has gaps", row);
            }
        }
        assert!(fill.len() > lit(&outline).len());
    }

    #[test]
    fn test_fill_rectangle_inclusive_and_clamped() {
        let mut buf = PixelBuffer::new(10, 10, false);
        buf.fill_rectangle(6, 5, 2, 3, INK);
        assert_eq!(lit(&buf).len(), 5 * 3);
        assert!(lit(&buf).contains(&(2, 3)) && lit(&buf).contains(&(6, 5)));

        let mut buf = PixelBuffer::new(10, 10, false);
        buf.fill_rectangle(-4, -4, 100, 100, INK);
        assert_eq!(lit(&buf).len(), 100);

        let mut buf = PixelBuffer::new(10, 10, false);
        buf.fill_rectangle(3, 4, 8, 4, INK);
        buf.fill_rectangle(-5, 2, -1, 6, INK);
        assert!(lit(&buf).is_empty());
    }

    #[test]
    fn test_draw_rectangle_outline() {
        let mut buf = PixelBuffer::new(10, 10, false);
        buf.draw_rectangle(1, 1, 5, 4, INK);
        let px = lit(&buf);
        assert_eq!(px.len(), 2 * 5 + 2 * 2);
        assert!(!px.contains(&(3, 2)));
    }

    #[test]
    fn test_rounded_rectangle_small_radius_is_rectangle() {
        for radius in [0, -3] {
            let mut a = PixelBuffer::new(30, 30, false);
            let mut b = PixelBuffer::new(30, 30, false);
            a.draw_rounded_rectangle(3, 4, 25, 20, radius, INK);
            b.draw_rectangle(3, 4, 25, 20, INK);
            assert_eq!(a.as_bytes(), b.as_bytes());

            a.fill_rounded_rectangle(3, 4, 25, 20, radius, INK);
            b.fill_rectangle(3, 4, 25, 20, INK);
            assert_eq!(a.as_bytes(), b.as_bytes());
        }
    }

    #[test]
    fn test_rounded_rectangle_large_radius_is_circle() {
        for radius in [11, 12, 40, 1 << 30, i32::MAX] {
            let mut a = PixelBuffer::new(40, 40, false);
            let mut b = PixelBuffer::new(40, 40, false);
            a.draw_rounded_rectangle(5, 8, 25, 30, radius, INK);
            b.draw_circle(15, 19, 10, INK);
            assert_eq!(a.as_bytes(), b.as_bytes(), "radius {}", radius);

            a.fill_rounded_rectangle(5, 8, 25, 30, radius, INK);
            b.fill_circle(15, 19, 10, INK);
            assert_eq!(a.as_bytes(), b.as_bytes(), "radius {}", radius);
        }
    }

    #[test]
    fn test_rounded_rectangle_corners() {
        let mut buf = PixelBuffer::new(40, 30, false);
        buf.draw_rounded_rectangle(2, 2, 37, 27, 6, INK);
        let px = lit(&buf);
        // Straight edges present, corners cut.
        assert!(px.contains(&(20, 2)) && px.contains(&(20, 27)));
        assert!(px.contains(&(2, 15)) && px.contains(&(37, 15)));
        assert!(!px.contains(&(2, 2)) && !px.contains(&(37, 27)));
        // Mirror symmetric about both centre lines.
        for &(x, y) in &px {
            assert!(px.contains(&(39 - x, y)), "({}, {})", x, y);
            assert!(px.contains(&(x, 29 - y)), "({}, {})", x, y);
        }

        let mut filled = PixelBuffer::new(40, 30, false);
        filled.fill_rounded_rectangle(2, 2, 37, 27, 6, INK);
        let fill = lit(&filled);
        assert!(fill.contains(&(20, 15)) && !fill.contains(&(2, 2)));
        assert!(fill.len() > px.len());
    }

    #[test]
    fn test_rounded_rectangle_degenerate() {
        let mut buf = PixelBuffer::new(20, 20, false);
        buf.draw_rounded_rectangle(3, 5, 15, 5, 4, INK);
        buf.fill_rounded_rectangle(7, 2, 7, 18, 4, INK);
        assert!(lit(&buf).is_empty());
    }

    #[test]
    fn test_checker_board_parity() {
        let mut buf = PixelBuffer::new(8, 4, false);
        let colours = [Colour::WHITE, Colour::grey(64)];
        buf.fill_checker_board_full(2, 2, colours);
        assert_eq!(rgb(&buf, 0, 0), (255, 255, 255));
        assert_eq!(rgb(&buf, 1, 1), (255, 255, 255));
        assert_eq!(rgb(&buf, 2, 0), (64, 64, 64));
        assert_eq!(rgb(&buf, 2, 2), (255, 255, 255));
        assert_eq!(rgb(&buf, 7, 3), (255, 255, 255));
    }

    #[test]
    fn test_checker_board_covers_ragged_edges() {
        let mut buf = PixelBuffer::new(7, 5, false);
        buf.fill_checker_board_full(3, 2, [Colour::rgb(1, 1, 1), Colour::rgb(2, 2, 2)]);
        assert_eq!(lit(&buf).len(), 35);
        // Last column and row belong to partial cells (2, 2).
        assert_eq!(rgb(&buf, 6, 4), (1, 1, 1));

        let mut unit = PixelBuffer::new(3, 3, false);
        unit.fill_checker_board_full(1, 1, [Colour::WHITE, Colour::BLUE]);
        assert_eq!(rgb(&unit, 1, 0), (0, 0, 255));
        assert_eq!(rgb(&unit, 1, 1), (255, 255, 255));
    }

    #[test]
    fn test_gradient_direction() {
        let mut down = PixelBuffer::new(4, 11, false);
        down.draw_gradient(0, 0, 3, 10, Colour::BLACK, Colour::WHITE);
        assert_eq!(rgb(&down, 1, 0), (0, 0, 0));
        assert!(rgb(&down, 1, 10).0 >= 254);
        assert!(rgb(&down, 1, 5).0 > 100 && rgb(&down, 1, 5).0 < 150);

        let mut up = PixelBuffer::new(4, 11, false);
        up.draw_gradient(0, 10, 3, 0, Colour::BLACK, Colour::WHITE);
        assert_eq!(rgb(&up, 1, 10), (0, 0, 0));
        assert!(rgb(&up, 1, 0).0 >= 254);

        let mut none = PixelBuffer::new(4, 4, false);
        none.draw_gradient(0, 2, 3, 2, Colour::WHITE, Colour::WHITE);
        none.draw_gradient(1, 0, 1, 3, Colour::WHITE, Colour::WHITE);
        assert!(lit(&none).is_empty());
    }

    fn pattern(w: u32, h: u32, has_alpha: bool) -> PixelBuffer {
        let mut buf = PixelBuffer::new(w, h, has_alpha);
        for y in 0..h as i32 {
            for x in 0..w as i32 {
                buf.write_pixel_rgba(x, y, x as u8 * 7 + 1, y as u8 * 13 + 1, (x * y) as u8 | 1, 200);
            }
        }
        buf
    }

    #[test]
    fn test_scroll_horizontal_restores() {
        let fill = Colour::rgba(0, 0, 0, 0);
        for dx in [1, 3, -2] {
            let original = pattern(12, 7, true);
            let mut buf = pattern(12, 7, true);
            buf.scroll_buffer(dx, 0, fill);
            buf.scroll_buffer(-dx, 0, fill);

            let w = 12;
            for y in 0..7 {
                for x in 0..w {
                    let exposed = if dx > 0 { x >= w - dx } else { x < -dx };
                    if exposed {
                        assert_eq!(buf.read_pixel(x, y), Some((0, 0, 0, 0)));
                    } else {
                        assert_eq!(buf.read_pixel(x, y), original.read_pixel(x, y), "dx={} ({}, {})", dx, x, y);
                    }
                }
            }
        }
    }

    #[test]
    fn test_scroll_vertical_and_diagonal() {
        let original = pattern(9, 9, false);
        let fill = Colour::rgb(9, 9, 9);

        let mut down = pattern(9, 9, false);
        down.scroll_buffer(0, 2, fill);
        assert_eq!(rgb(&down, 4, 1), (9, 9, 9));
        assert_eq!(down.read_pixel(4, 8), original.read_pixel(4, 6));

        let mut up = pattern(9, 9, false);
        up.scroll_buffer(0, -3, fill);
        assert_eq!(up.read_pixel(3, 0), original.read_pixel(3, 3));
        assert_eq!(rgb(&up, 3, 6), (9, 9, 9));

        let mut diag = pattern(9, 9, false);
        diag.scroll_buffer(-2, 3, fill);
        assert_eq!(diag.read_pixel(0, 3), original.read_pixel(2, 0));
        assert_eq!(diag.read_pixel(6, 8), original.read_pixel(8, 5));
        assert_eq!(rgb(&diag, 7, 5), (9, 9, 9));
        assert_eq!(rgb(&diag, 0, 2), (9, 9, 9));
    }

    #[test]
    fn test_scroll_extreme_shift_fills() {
        for (dx, dy) in [(i32::MIN, 0), (0, i32::MIN), (i32::MAX, i32::MIN)] {
            let mut buf = pattern(8, 5, false);
            buf.scroll_buffer(dx, dy, Colour::rgb(1, 2, 3));
            assert!(buf.as_bytes().chunks(3).all(|px| px == [3, 2, 1]), "({}, {})", dx, dy);
        }
    }

    #[test]
    fn test_scroll_fill_uses_each_channel() {
        let mut buf = PixelBuffer::new(6, 6, false);
        buf.scroll_buffer(2, 0, Colour::rgb(10, 20, 30));
        assert_eq!(rgb(&buf, 0, 3), (10, 20, 30));
        buf.scroll_buffer(0, 100, Colour::rgb(1, 2, 3));
        assert!(buf.as_bytes().chunks(3).all(|px| px == [3, 2, 1]));
    }

    #[test]
    fn test_blit_clips_both_sides() {
        let src = pattern(5, 4, false);
        let mut dst = PixelBuffer::new(6, 6, true);
        dst.blit(&src, -2, 3);
        assert_eq!(dst.read_pixel(0, 3), src.read_pixel(2, 0));
        assert_eq!(dst.read_pixel(2, 5), src.read_pixel(4, 2));
        assert_eq!(dst.read_pixel(3, 3), Some((0, 0, 0, 0)));

        let before = checksum(&dst);
        dst.blit(&src, 6, 0);
        dst.blit(&src, -5, 0);
        dst.blit(&src, 0, -4);
        assert_eq!(checksum(&dst), before);
    }

    #[test]
    fn test_blend_dispatch() {
        let mut base = PixelBuffer::new(2, 1, false);
        base.clear(Colour::rgb(100, 100, 100));

        let mut straight = PixelBuffer::new(1, 1, true);
        straight.write_pixel_rgba(0, 0, 200, 0, 0, 128);
        let mut expect = PixelBuffer::new(2, 1, false);
        expect.clear(Colour::rgb(100, 100, 100));
        expect.blend_pixel(1, 0, 200, 0, 0, 128);

        let mut out = PixelBuffer::new(2, 1, false);
        out.clear(Colour::rgb(100, 100, 100));
        out.blend(&straight, 1, 0);
        assert_eq!(out.as_bytes(), expect.as_bytes());

        let mut pre = PixelBuffer::new(1, 1, true);
        pre.write_pixel_rgba(0, 0, 200, 0, 0, 128);
        pre.premultiply_alpha();
        let mut out_pre = PixelBuffer::new(2, 1, false);
        out_pre.clear(Colour::rgb(100, 100, 100));
        out_pre.blend(&pre, 1, 0);
        assert_eq!(rgb(&out_pre, 1, 0), (100 + 49, 49, 49));

        let opaque = pattern(1, 1, false);
        base.blend(&opaque, 0, 0);
        assert_eq!(base.read_pixel(0, 0), opaque.read_pixel(0, 0));
    }

    #[test]
    fn test_blit_rgb_region() {
        // 4x3 source, red channel is x + 10*y
        let mut img = Vec::new();
        for y in 0..3u8 {
            for x in 0..4u8 {
                img.extend_from_slice(&[x + 10 * y, 7, 9]);
            }
        }
        let mut buf = PixelBuffer::new(5, 5, false);
        buf.blit_rgb_region(&img, 1, 1, 2, 2, 1, 1, 12);
        assert_eq!(rgb(&buf, 1, 1), (11, 7, 9));
        assert_eq!(rgb(&buf, 2, 2), (22, 7, 9));
        assert_eq!(rgb(&buf, 3, 2), (0, 0, 0));

        let mut full = PixelBuffer::new(3, 3, false);
        full.blit_rgb(&img, -1, 0, 4, 3);
        assert_eq!(rgb(&full, 0, 0), (1, 7, 9));
        assert_eq!(rgb(&full, 2, 2), (23, 7, 9));
    }

    #[test]
    fn test_blit_rgb_short_source_is_safe() {
        let img = vec![255u8; 3 * 5];
        let mut buf = PixelBuffer::new(8, 8, false);
        buf.blit_rgb(&img, 0, 0, 4, 4);
        assert_eq!(lit(&buf).len(), 5);
    }

    #[test]
    fn test_blit_rgba_blends() {
        let img = [255, 0, 0, 255, 0, 255, 0, 0];
        let mut buf = PixelBuffer::new(2, 1, true);
        buf.clear(Colour::rgba(0, 0, 255, 0));
        buf.blit_rgba(&img, 0, 0, 2, 1, false);
        assert_eq!(buf.read_pixel(0, 0), Some((255, 0, 0, 255)));
        assert_eq!(buf.read_pixel(1, 0), Some((0, 0, 255, 0)));
    }

    #[test]
    fn test_resize_discards() {
        let mut buf = pattern(4, 4, true);
        buf.resize(6, 2, 3, false, false);
        assert_eq!((buf.width(), buf.height(), buf.stride()), (6, 2, 18));
        assert!(buf.as_bytes().iter().all(|&b| b == 0));
        assert!(!buf.has_alpha());
    }
}

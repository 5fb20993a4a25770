//! Colour values, RGB <-> HSV conversion and 256-step tween tables

use std::ops::Index;

// ============================================================================
// Colour
// ============================================================================

/// An 8-bit-per-channel colour in red, green, blue, alpha order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Colour {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Colour {
    pub const BLACK: Colour = Colour::rgb(0, 0, 0);
    pub const WHITE: Colour = Colour::rgb(255, 255, 255);
    pub const RED: Colour = Colour::rgb(255, 0, 0);
    pub const GREEN: Colour = Colour::rgb(0, 255, 0);
    pub const BLUE: Colour = Colour::rgb(0, 0, 255);

    /// Opaque colour
    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    #[inline]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Unpack a `0xRRGGBB` value, alpha is opaque
    #[inline]
    pub const fn from_packed(rgb: u32) -> Self {
        Self::rgb((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
    }

    /// Pack to `0xRRGGBB`, alpha is dropped
    #[inline]
    pub const fn to_packed(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }

    #[inline]
    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// Grey level, used by the two-shade checker board helpers
    #[inline]
    pub const fn grey(v: u8) -> Self {
        Self::rgb(v, v, v)
    }
}

impl From<(u8, u8, u8)> for Colour {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Self::rgb(r, g, b)
    }
}

impl From<(u8, u8, u8, u8)> for Colour {
    fn from((r, g, b, a): (u8, u8, u8, u8)) -> Self {
        Self::rgba(r, g, b, a)
    }
}

// ============================================================================
// HSV
// ============================================================================

/// Convert RGB to HSV.
/// Returns (h, s, v) with h in degrees [0, 360) and s, v in [0, 1].
/// Greys (max == min) report a hue of 0.
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    let red = r as f32 / 255.0;
    let green = g as f32 / 255.0;
    let blue = b as f32 / 255.0;

    let min = red.min(green).min(blue);
    let max = red.max(green).max(blue);
    let delta = max - min;

    let v = max;
    if delta < 0.00001 {
        return (0.0, 0.0, v);
    }
    if max <= 0.0 {
        return (0.0, 0.0, v);
    }
    let s = delta / max;

    let mut h = if red >= max {
        (green - blue) / delta
    } else if green >= max {
        2.0 + (blue - red) / delta
    } else {
        4.0 + (red - green) / delta
    };
    h *= 60.0;
    if h < 0.0 {
        h += 360.0;
    }

    (h, s, v)
}

/// Convert HSV to RGB.
/// h: degrees (360 wraps to 0), s: 0-1, v: 0-1. Channels are truncated, not rounded.
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (u8, u8, u8) {
    let (r, g, b) = if s <= 0.0 {
        (v, v, v)
    } else {
        let hh = if h >= 360.0 { 0.0 } else { h } / 60.0;
        let i = hh as i32;
        let ff = hh - i as f32;
        let p = v * (1.0 - s);
        let q = v * (1.0 - s * ff);
        let t = v * (1.0 - s * (1.0 - ff));

        match i {
            0 => (v, t, p),
            1 => (q, v, p),
            2 => (p, v, t),
            3 => (p, q, v),
            4 => (t, p, v),
            _ => (v, p, q),
        }
    };

    ((r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8)
}

// ============================================================================
// Tween Tables
// ============================================================================

/// 256-step colour ramp between two endpoints.
/// Immutable once built; build a new one when an endpoint changes.
#[derive(Clone, PartialEq, Eq)]
pub struct TweenTable([[u8; 3]; 256]);

impl TweenTable {
    /// Linear interpolation in RGB space, integer arithmetic
    pub fn rgb(from: Colour, to: Colour) -> Self {
        let mut table = [[0u8; 3]; 256];
        for (n, entry) in table.iter_mut().enumerate() {
            let n = n as u32;
            let lerp = |a: u8, b: u8| ((a as u32 * (255 - n) + b as u32 * n) / 255) as u8;
            *entry = [lerp(from.r, to.r), lerp(from.g, to.g), lerp(from.b, to.b)];
        }
        Self(table)
    }

    /// Interpolates hue, saturation and value independently, then converts back.
    /// Keeps saturated colours saturated where an RGB ramp would pass through grey.
    pub fn hsv(from: Colour, to: Colour) -> Self {
        let (from_h, from_s, from_v) = rgb_to_hsv(from.r, from.g, from.b);
        let (to_h, to_s, to_v) = rgb_to_hsv(to.r, to.g, to.b);

        let mut table = [[0u8; 3]; 256];
        for (n, entry) in table.iter_mut().enumerate() {
            let a = n as f32 / 255.0;
            let h = (1.0 - a) * from_h + a * to_h;
            let s = (1.0 - a) * from_s + a * to_s;
            let v = (1.0 - a) * from_v + a * to_v;
            let (r, g, b) = hsv_to_rgb(h, s, v);
            *entry = [r, g, b];
        }
        Self(table)
    }

    #[inline]
    pub fn get(&self, step: u8) -> Colour {
        let [r, g, b] = self.0[step as usize];
        Colour::rgb(r, g, b)
    }

    pub fn as_slice(&self) -> &[[u8; 3]; 256] {
        &self.0
    }
}

impl Index<u8> for TweenTable {
    type Output = [u8; 3];

    fn index(&self, step: u8) -> &[u8; 3] {
        &self.0[step as usize]
    }
}

impl std::fmt::Debug for TweenTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TweenTable")
            .field("first", &self.0[0])
            .field("last", &self.0[255])
            .finish()
    }
}

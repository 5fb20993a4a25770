//! Native pixel layout of a display backend

use crate::error::{DisplayError, DisplayResult};

/// Position of one colour channel inside a native pixel word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelField {
    /// Bit offset from the least significant bit
    pub offset: u32,
    /// Width in bits
    pub length: u32,
}

impl ChannelField {
    pub const fn new(offset: u32, length: u32) -> Self {
        Self { offset, length }
    }

    /// Byte index of the channel inside a little-endian pixel
    #[inline]
    pub const fn byte_offset(&self) -> usize {
        (self.offset / 8) as usize
    }
}

/// Geometry and channel layout reported by a backend.
/// `width`/`height` are physical, before any rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeFormat {
    pub width: u32,
    pub height: u32,
    pub bits_per_pixel: u32,
    /// Bytes between the starts of consecutive scanlines
    pub stride: usize,
    /// Total bytes of display memory, may exceed `stride * height`
    pub size: usize,
    pub red: ChannelField,
    pub green: ChannelField,
    pub blue: ChannelField,
}

impl NativeFormat {
    /// 32bpp with blue in the lowest byte, the common fbdev layout
    pub fn bgrx32(width: u32, height: u32) -> Self {
        Self::packed(width, height, 32, ChannelField::new(16, 8), ChannelField::new(8, 8), ChannelField::new(0, 8))
    }

    /// 24bpp with blue in the lowest byte
    pub fn bgr24(width: u32, height: u32) -> Self {
        Self::packed(width, height, 24, ChannelField::new(16, 8), ChannelField::new(8, 8), ChannelField::new(0, 8))
    }

    /// 24bpp with red in the lowest byte
    pub fn rgb24(width: u32, height: u32) -> Self {
        Self::packed(width, height, 24, ChannelField::new(0, 8), ChannelField::new(8, 8), ChannelField::new(16, 8))
    }

    /// 16bpp 5-6-5, red in the top bits
    pub fn rgb565(width: u32, height: u32) -> Self {
        Self::packed(width, height, 16, ChannelField::new(11, 5), ChannelField::new(5, 6), ChannelField::new(0, 5))
    }

    /// Tightly packed scanlines with no trailing memory
    pub fn packed(
        width: u32,
        height: u32,
        bits_per_pixel: u32,
        red: ChannelField,
        green: ChannelField,
        blue: ChannelField,
    ) -> Self {
        let stride = width as usize * (bits_per_pixel as usize / 8);
        Self {
            width,
            height,
            bits_per_pixel,
            stride,
            size: stride * height as usize,
            red,
            green,
            blue,
        }
    }

    /// Same layout with padded scanlines
    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = stride;
        self.size = self.size.max(stride * self.height as usize);
        self
    }

    #[inline]
    pub fn pixel_size(&self) -> usize {
        self.bits_per_pixel as usize / 8
    }

    /// Matches the internal blue, green, red byte order
    pub fn is_bgr_order(&self) -> bool {
        self.red.offset == 16 && self.green.offset == 8 && self.blue.offset == 0
    }

    /// Check that the presentation paths can write this layout
    pub fn validate(&self) -> DisplayResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(DisplayError::unsupported(format!(
                "empty geometry {}x{}",
                self.width, self.height
            )));
        }
        let pixel_size = self.pixel_size();
        if self.stride < self.width as usize * pixel_size {
            return Err(DisplayError::unsupported(format!(
                "stride {} too small for {} pixels of {} bytes",
                self.stride, self.width, pixel_size
            )));
        }
        if self.size < self.stride * (self.height as usize - 1) + self.width as usize * pixel_size {
            return Err(DisplayError::unsupported(format!(
                "{} bytes of display memory cannot hold {}x{}",
                self.size, self.width, self.height
            )));
        }
        match self.bits_per_pixel {
            16 => {
                for field in [self.red, self.green, self.blue] {
                    if field.offset + field.length > 16 {
                        return Err(DisplayError::unsupported(format!(
                            "16bpp channel at bit {} overflows the pixel",
                            field.offset
                        )));
                    }
                }
                Ok(())
            },
            24 | 32 => {
                for field in [self.red, self.green, self.blue] {
                    if field.offset % 8 != 0 || field.byte_offset() >= pixel_size {
                        return Err(DisplayError::unsupported(format!(
                            "{}bpp channel at bit {} is not byte aligned",
                            self.bits_per_pixel, field.offset
                        )));
                    }
                }
                Ok(())
            },
            other => Err(DisplayError::unsupported(format!("{}bpp", other))),
        }
    }
}

pub mod backend;
mod bands;
mod font;
mod format;
mod pixel_buffer;

pub use bands::RowBand;
pub use font::{PixelFont, GLYPH_HEIGHT, GLYPH_WIDTH};
pub use format::{ChannelField, NativeFormat};
pub use pixel_buffer::{premultiply_rgba, PixelBuffer};

use crate::config::DisplayConfig;
use crate::error::DisplayResult;
use crate::events::{BackendEvent, EventBridge, SystemEvent};
use crate::lifecycle::{InterruptGuard, Lifecycle};
use backend::PresentationBackend;
use bitflags::bitflags;
use log::Level;
use pixel_buffer::{BLUE, GREEN, RED};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

bitflags! {
    /// Options for opening a display
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct OpenFlags: u32 {
        /// Report geometry, format and present path at info level
        const VERBOSE = 1 << 0;
        const ROTATE_90 = 1 << 1;
        const ROTATE_180 = 1 << 2;
        const ROTATE_270 = 1 << 3;
        /// Rotate 90 degrees if the display is taller than it is wide
        const FORCE_LANDSCAPE = 1 << 4;
        /// Rotate 90 degrees if the display is wider than it is tall
        const FORCE_PORTRAIT = 1 << 5;
    }
}

/// Clockwise rotation from the logical image to the physical display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    None,
    Cw90,
    Cw180,
    Cw270,
}

impl Rotation {
    /// Explicit rotation flags win over the orientation flags. Several explicit
    /// flags resolve to the first of 90, 180, 270.
    pub fn from_flags(flags: OpenFlags, physical_width: u32, physical_height: u32) -> Self {
        let explicit = flags & (OpenFlags::ROTATE_90 | OpenFlags::ROTATE_180 | OpenFlags::ROTATE_270);
        if explicit.bits().count_ones() > 1 {
            log::warn!("Several rotations requested ({:?}), using the first", explicit);
        }
        if flags.contains(OpenFlags::ROTATE_90) {
            return Rotation::Cw90;
        }
        if flags.contains(OpenFlags::ROTATE_180) {
            return Rotation::Cw180;
        }
        if flags.contains(OpenFlags::ROTATE_270) {
            return Rotation::Cw270;
        }

        if flags.contains(OpenFlags::FORCE_LANDSCAPE | OpenFlags::FORCE_PORTRAIT) {
            log::warn!("Both landscape and portrait forced, using landscape");
        }
        if flags.contains(OpenFlags::FORCE_LANDSCAPE) {
            if physical_height > physical_width {
                return Rotation::Cw90;
            }
        } else if flags.contains(OpenFlags::FORCE_PORTRAIT) && physical_width > physical_height {
            return Rotation::Cw90;
        }
        Rotation::None
    }

    pub fn degrees(self) -> u32 {
        match self {
            Rotation::None => 0,
            Rotation::Cw90 => 90,
            Rotation::Cw180 => 180,
            Rotation::Cw270 => 270,
        }
    }

    /// True when logical width and height are the physical height and width
    pub fn swaps_axes(self) -> bool {
        matches!(self, Rotation::Cw90 | Rotation::Cw270)
    }
}

/// How `present` moves a frame into native memory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentPath {
    /// Straight copy, formats match
    Direct,
    /// Per pixel 5-6-5 packing
    Packed16,
    /// Per pixel byte remap
    Remap,
}

/// Byte walk through native memory for one rotation:
/// `start + x * step_x + y * step_y` addresses logical pixel (x, y).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Walk {
    start: isize,
    step_x: isize,
    step_y: isize,
}

impl Walk {
    fn new(rotation: Rotation, logical_width: u32, logical_height: u32, pixel_size: usize, stride: usize) -> Self {
        let lw = logical_width as isize;
        let lh = logical_height as isize;
        let ps = pixel_size as isize;
        let stride = stride as isize;
        match rotation {
            Rotation::None => Walk {
                start: 0,
                step_x: ps,
                step_y: stride,
            },
            Rotation::Cw90 => Walk {
                start: (lh - 1) * ps,
                step_x: stride,
                step_y: -ps,
            },
            Rotation::Cw180 => Walk {
                start: (lh - 1) * stride + (lw - 1) * ps,
                step_x: -ps,
                step_y: -stride,
            },
            Rotation::Cw270 => Walk {
                start: (lw - 1) * stride,
                step_x: -stride,
                step_y: ps,
            },
        }
    }
}

/// Slice of native memory for one pixel, or None if the walk left the mapping
#[inline]
fn native_pixel(memory: &mut [u8], offset: isize, pixel_size: usize) -> Option<&mut [u8]> {
    let at = usize::try_from(offset).ok()?;
    debug_assert!(at + pixel_size <= memory.len(), "present wrote past display memory");
    memory.get_mut(at..at + pixel_size)
}

/// An open display. Frames drawn into a `PixelBuffer` are shown with
/// [`DisplaySurface::present`], which also delivers pending events.
///
/// Dropping the surface blanks the display and releases the backend.
pub struct DisplaySurface {
    backend: Box<dyn PresentationBackend>,
    format: NativeFormat,
    rotation: Rotation,
    verbose: bool,
    lifecycle: Arc<Lifecycle>,
    interrupt: Option<InterruptGuard>,
    events: EventBridge,
    pending: Vec<BackendEvent>,
    reported_path: Option<PresentPath>,
}

impl DisplaySurface {
    /// Open the framebuffer device at its default paths
    pub fn open(flags: OpenFlags) -> DisplayResult<Self> {
        let config = DisplayConfig {
            flags,
            ..DisplayConfig::default()
        };
        Self::open_with_config(&config)
    }

    /// Open the configured backend and, if asked, route SIGINT into the
    /// surface's lifecycle
    pub fn open_with_config(config: &DisplayConfig) -> DisplayResult<Self> {
        let backend = backend::open_backend(config)?;
        let mut surface = Self::from_backend(backend, config.flags, Lifecycle::new())?;
        if config.install_interrupt_handler {
            surface.interrupt = Some(InterruptGuard::install(Arc::clone(&surface.lifecycle))?);
        }
        Ok(surface)
    }

    /// Wrap an already open backend. No signal handler is installed.
    pub fn from_backend(
        backend: Box<dyn PresentationBackend>,
        flags: OpenFlags,
        lifecycle: Arc<Lifecycle>,
    ) -> DisplayResult<Self> {
        let format = backend.format();
        format.validate()?;

        let verbose = flags.contains(OpenFlags::VERBOSE);
        let rotation = Rotation::from_flags(flags, format.width, format.height);
        let level = if verbose { Level::Info } else { Level::Debug };
        log::log!(
            level,
            "Display '{}' {}x{} {}bpp stride {}, rotated {} degrees",
            backend.name(),
            format.width,
            format.height,
            format.bits_per_pixel,
            format.stride,
            rotation.degrees()
        );

        Ok(Self {
            backend,
            format,
            rotation,
            verbose,
            lifecycle,
            interrupt: None,
            events: EventBridge::new(),
            pending: Vec::new(),
            reported_path: None,
        })
    }

    /// Logical width, after rotation
    pub fn width(&self) -> u32 {
        if self.rotation.swaps_axes() {
            self.format.height
        } else {
            self.format.width
        }
    }

    /// Logical height, after rotation
    pub fn height(&self) -> u32 {
        if self.rotation.swaps_axes() {
            self.format.width
        } else {
            self.format.height
        }
    }

    pub fn physical_width(&self) -> u32 {
        self.format.width
    }

    pub fn physical_height(&self) -> u32 {
        self.format.height
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn format(&self) -> &NativeFormat {
        &self.format
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn keep_going(&self) -> bool {
        self.lifecycle.keep_going()
    }

    /// Stop the application; an exit event goes out with the next present
    pub fn request_exit(&self) {
        self.lifecycle.request_exit();
    }

    pub fn lifecycle(&self) -> &Arc<Lifecycle> {
        &self.lifecycle
    }

    /// Called during `present` for every event, replacing any previous handler
    pub fn set_event_handler(&mut self, handler: impl FnMut(&SystemEvent) + 'static) {
        self.events.set_handler(handler);
    }

    /// Native display memory as last presented
    pub fn native_bytes(&self) -> &[u8] {
        self.backend.memory()
    }

    /// True when `buffer` can be copied straight into display memory
    pub fn is_native_format(&self, buffer: &PixelBuffer) -> bool {
        self.rotation == Rotation::None
            && buffer.pixel_size() == self.format.pixel_size()
            && buffer.stride() == self.format.stride
            && self.format.is_bgr_order()
            && self.format.size >= self.format.stride * self.format.height as usize
    }

    pub fn present_path(&self, buffer: &PixelBuffer) -> PresentPath {
        if self.is_native_format(buffer) {
            PresentPath::Direct
        } else if self.format.bits_per_pixel == 16 {
            PresentPath::Packed16
        } else {
            PresentPath::Remap
        }
    }

    /// Show `buffer`, then dispatch pending events to the handler.
    ///
    /// A buffer smaller than the logical display fills the top-left corner;
    /// a larger one is cropped.
    pub fn present(&mut self, buffer: &PixelBuffer) {
        let path = self.present_path(buffer);
        if self.reported_path != Some(path) {
            let level = if self.verbose { Level::Info } else { Level::Debug };
            log::log!(level, "Presenting with {:?} path", path);
            self.reported_path = Some(path);
        }

        match path {
            PresentPath::Direct => self.present_direct(buffer),
            PresentPath::Packed16 => self.present_packed16(buffer),
            PresentPath::Remap => self.present_remap(buffer),
        }

        if let Err(e) = self.backend.flush() {
            log::warn!("Display flush failed: {}", e);
        }
        self.process_events();
    }

    fn present_direct(&mut self, buffer: &PixelBuffer) {
        let memory = self.backend.memory_mut();
        let src = buffer.as_bytes();
        let len = memory.len().min(self.format.size).min(src.len());
        memory[..len].copy_from_slice(&src[..len]);
    }

    fn walk_extent(&self, buffer: &PixelBuffer) -> (Walk, u32, u32) {
        let walk = Walk::new(
            self.rotation,
            self.width(),
            self.height(),
            self.format.pixel_size(),
            self.format.stride,
        );
        (walk, buffer.width().min(self.width()), buffer.height().min(self.height()))
    }

    fn present_packed16(&mut self, buffer: &PixelBuffer) {
        let (walk, cols, rows) = self.walk_extent(buffer);
        let (roff, goff, boff) = (self.format.red.offset, self.format.green.offset, self.format.blue.offset);
        let src = buffer.as_bytes();
        let src_ps = buffer.pixel_size();
        let memory = self.backend.memory_mut();

        for y in 0..rows as usize {
            let mut dst = walk.start + y as isize * walk.step_y;
            let row = &src[y * buffer.stride()..];
            for px in row.chunks_exact(src_ps).take(cols as usize) {
                let word = (u32::from(px[RED] >> 3) << roff)
                    | (u32::from(px[GREEN] >> 2) << goff)
                    | (u32::from(px[BLUE] >> 3) << boff);
                if let Some(out) = native_pixel(memory, dst, 2) {
                    out.copy_from_slice(&(word as u16).to_ne_bytes());
                }
                dst += walk.step_x;
            }
        }
    }

    fn present_remap(&mut self, buffer: &PixelBuffer) {
        let (walk, cols, rows) = self.walk_extent(buffer);
        let ps = self.format.pixel_size();
        let (ro, go, bo) = (
            self.format.red.byte_offset(),
            self.format.green.byte_offset(),
            self.format.blue.byte_offset(),
        );
        let src = buffer.as_bytes();
        let src_ps = buffer.pixel_size();
        let memory = self.backend.memory_mut();

        for y in 0..rows as usize {
            let mut dst = walk.start + y as isize * walk.step_y;
            let row = &src[y * buffer.stride()..];
            for px in row.chunks_exact(src_ps).take(cols as usize) {
                if let Some(out) = native_pixel(memory, dst, ps) {
                    out[ro] = px[RED];
                    out[go] = px[GREEN];
                    out[bo] = px[BLUE];
                }
                dst += walk.step_x;
            }
        }
    }

    fn process_events(&mut self) {
        if self.lifecycle.take_exit_request() {
            log::info!("Exit requested");
            self.events.emit(SystemEvent::ExitRequested);
        }

        self.backend.poll_events(&mut self.pending);
        // Backend exits are delivered inline, not again at the next present
        if self.pending.contains(&BackendEvent::Exit) {
            self.lifecycle.request_exit();
            self.lifecycle.take_exit_request();
        }
        self.events.dispatch(self.pending.drain(..));
    }
}

impl Drop for DisplaySurface {
    fn drop(&mut self) {
        let level = if self.verbose { Level::Info } else { Level::Debug };
        log::log!(level, "Blanking and closing display '{}'", self.backend.name());
        self.backend.memory_mut().fill(0);
        if let Err(e) = self.backend.flush() {
            log::warn!("Display flush failed while closing: {}", e);
        }
    }
}

impl std::fmt::Debug for DisplaySurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisplaySurface")
            .field("backend", &self.backend.name())
            .field("format", &self.format)
            .field("rotation", &self.rotation)
            .field("interrupt_handler", &self.interrupt.is_some())
            .finish()
    }
}

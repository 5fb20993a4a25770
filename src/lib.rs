//! Software 2D rasterizer with framebuffer presentation.
//!
//! Draw into a [`PixelBuffer`], then hand it to [`DisplaySurface::present`].
//! The surface converts to the display's native format, applies rotation and
//! delivers input events to the registered handler.

pub mod color;
pub mod config;
pub mod display;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod util;

pub use color::{Colour, TweenTable};
pub use config::{BackendKind, DisplayConfig};
pub use display::{
    premultiply_rgba, DisplaySurface, NativeFormat, OpenFlags, PixelBuffer, PixelFont, PresentPath,
    Rotation, RowBand,
};
pub use error::{DisplayError, DisplayResult};
pub use events::{EventKind, PointerPosition, SystemEvent};
pub use lifecycle::Lifecycle;

//! Presentation backends: where native display memory lives and where input
//! comes from. Chosen at startup from `DisplayConfig::backend`.

mod fbdev;
mod memory;
mod window;

pub use fbdev::FbdevBackend;
pub use memory::{EventInjector, MemoryBackend};
pub use window::WindowBackend;

use super::format::NativeFormat;
use crate::config::{BackendKind, DisplayConfig};
use crate::error::DisplayResult;
use crate::events::BackendEvent;

pub trait PresentationBackend {
    fn name(&self) -> &'static str;

    /// Physical geometry and channel layout
    fn format(&self) -> NativeFormat;

    /// Native display memory, `format().size` bytes
    fn memory(&self) -> &[u8];

    fn memory_mut(&mut self) -> &mut [u8];

    /// Make the latest memory contents visible. A no-op for mapped devices.
    fn flush(&mut self) -> DisplayResult<()> {
        Ok(())
    }

    /// Append pending input without blocking
    fn poll_events(&mut self, events: &mut Vec<BackendEvent>);
}

/// Open the backend named by the config
pub fn open_backend(config: &DisplayConfig) -> DisplayResult<Box<dyn PresentationBackend>> {
    let verbose = config.flags.contains(super::OpenFlags::VERBOSE);
    Ok(match config.backend {
        BackendKind::Framebuffer => Box::new(FbdevBackend::open(&config.framebuffer, verbose)?),
        BackendKind::Window => Box::new(WindowBackend::open(&config.window)?),
        BackendKind::Memory => Box::new(MemoryBackend::from_config(&config.memory)?),
    })
}

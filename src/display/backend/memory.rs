use super::PresentationBackend;
use crate::config::MemoryConfig;
use crate::display::format::NativeFormat;
use crate::error::{DisplayError, DisplayResult};
use crate::events::BackendEvent;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Headless display held in a `Vec`. Used for tests, screenshots and
/// rendering on machines with no display.
pub struct MemoryBackend {
    format: NativeFormat,
    memory: Vec<u8>,
    queue: Rc<RefCell<VecDeque<BackendEvent>>>,
    flushes: usize,
}

/// Feeds input into a `MemoryBackend` after it has been handed to a surface
#[derive(Clone)]
pub struct EventInjector {
    queue: Rc<RefCell<VecDeque<BackendEvent>>>,
}

impl EventInjector {
    pub fn push(&self, event: BackendEvent) {
        self.queue.borrow_mut().push_back(event);
    }
}

impl MemoryBackend {
    pub fn new(format: NativeFormat) -> Self {
        Self {
            memory: vec![0; format.size],
            format,
            queue: Rc::new(RefCell::new(VecDeque::new())),
            flushes: 0,
        }
    }

    pub fn from_config(config: &MemoryConfig) -> DisplayResult<Self> {
        let format = match config.bits_per_pixel {
            16 => NativeFormat::rgb565(config.width, config.height),
            24 => NativeFormat::bgr24(config.width, config.height),
            32 => NativeFormat::bgrx32(config.width, config.height),
            other => return Err(DisplayError::unsupported(format!("{}bpp memory display", other))),
        };
        format.validate()?;
        Ok(Self::new(format))
    }

    pub fn injector(&self) -> EventInjector {
        EventInjector {
            queue: Rc::clone(&self.queue),
        }
    }

    /// Number of frames flushed so far
    pub fn flushes(&self) -> usize {
        self.flushes
    }
}

impl PresentationBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn format(&self) -> NativeFormat {
        self.format
    }

    fn memory(&self) -> &[u8] {
        &self.memory
    }

    fn memory_mut(&mut self) -> &mut [u8] {
        &mut self.memory
    }

    fn flush(&mut self) -> DisplayResult<()> {
        self.flushes += 1;
        Ok(())
    }

    fn poll_events(&mut self, events: &mut Vec<BackendEvent>) {
        events.extend(self.queue.borrow_mut().drain(..));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_depths() {
        for (bpp, size) in [(16, 2), (24, 3), (32, 4)] {
            let backend = MemoryBackend::from_config(&MemoryConfig {
                width: 10,
                height: 5,
                bits_per_pixel: bpp,
            })
            .unwrap();
            assert_eq!(backend.format().pixel_size(), size);
            assert_eq!(backend.memory().len(), 10 * 5 * size);
        }
        assert!(MemoryBackend::from_config(&MemoryConfig {
            width: 10,
            height: 5,
            bits_per_pixel: 8,
        })
        .is_err());
    }

    #[test]
    fn test_injected_events_drain_in_order() {
        let mut backend = MemoryBackend::new(NativeFormat::bgrx32(2, 2));
        let injector = backend.injector();
        injector.push(BackendEvent::PointerMotion { x: 1, y: 1 });
        injector.push(BackendEvent::Exit);

        let mut events = Vec::new();
        backend.poll_events(&mut events);
        assert_eq!(events, vec![BackendEvent::PointerMotion { x: 1, y: 1 }, BackendEvent::Exit]);
        events.clear();
        backend.poll_events(&mut events);
        assert!(events.is_empty());
    }
}

//! Desktop window standing in for a framebuffer during development

use super::PresentationBackend;
use crate::config::WindowConfig;
use crate::display::format::NativeFormat;
use crate::error::{DisplayError, DisplayResult};
use crate::events::{BackendEvent, PointerPosition};
use sdl2::event::Event;
use sdl2::keyboard::Keycode;
use sdl2::mouse::MouseButton;
use sdl2::pixels::PixelFormatEnum;
use sdl2::render::{Canvas, Texture};
use sdl2::video::Window;
use sdl2::EventPump;

/// Emulates a 32-bit B,G,R,X display. Memory is uploaded to one streaming
/// texture, created with the window, on every flush.
pub struct WindowBackend {
    canvas: Canvas<Window>,
    /// Owned by the canvas renderer; destroyed before the canvas in `Drop`
    texture: Option<Texture>,
    event_pump: EventPump,
    format: NativeFormat,
    memory: Vec<u8>,
}

impl WindowBackend {
    pub fn open(config: &WindowConfig) -> DisplayResult<Self> {
        let sdl_context = sdl2::init().map_err(DisplayError::window)?;
        let video_subsystem = sdl_context.video().map_err(DisplayError::window)?;

        let window = video_subsystem
            .window(&config.title, config.width, config.height)
            .position_centered()
            .build()
            .map_err(|e| DisplayError::window(e.to_string()))?;

        let mut canvas_builder = window.into_canvas().accelerated();
        if config.vsync {
            canvas_builder = canvas_builder.present_vsync();
        }
        let canvas = canvas_builder.build().map_err(|e| DisplayError::window(e.to_string()))?;

        // RGB888 is SDL's XRGB8888: B,G,R,X in memory on little-endian hosts.
        let texture = canvas
            .texture_creator()
            .create_texture_streaming(PixelFormatEnum::RGB888, config.width, config.height)
            .map_err(|e| DisplayError::window(e.to_string()))?;
        let event_pump = sdl_context.event_pump().map_err(DisplayError::window)?;

        let format = NativeFormat::bgrx32(config.width, config.height);
        log::debug!("Window display {}x{} (vsync: {})", config.width, config.height, config.vsync);

        Ok(Self {
            canvas,
            texture: Some(texture),
            event_pump,
            memory: vec![0; format.size],
            format,
        })
    }
}

impl PresentationBackend for WindowBackend {
    fn name(&self) -> &'static str {
        "window"
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
        let Some(texture) = self.texture.as_mut() else {
            return Err(DisplayError::window("window texture already released"));
        };
        texture
            .update(None, &self.memory, self.format.stride)
            .map_err(|e| DisplayError::window(e.to_string()))?;

        self.canvas.copy(texture, None, None).map_err(DisplayError::window)?;
        self.canvas.present();
        Ok(())
    }

    fn poll_events(&mut self, events: &mut Vec<BackendEvent>) {
        for event in self.event_pump.poll_iter() {
            match event {
                Event::Quit { .. }
                | Event::KeyDown {
                    keycode: Some(Keycode::Escape),
                    ..
                } => events.push(BackendEvent::Exit),
                Event::MouseMotion { x, y, .. } => events.push(BackendEvent::PointerMotion { x, y }),
                Event::MouseButtonDown {
                    x,
                    y,
                    mouse_btn: MouseButton::Left,
                    ..
                } => events.push(BackendEvent::PointerButton {
                    down: true,
                    at: Some(PointerPosition::new(x, y)),
                }),
                Event::MouseButtonUp {
                    x,
                    y,
                    mouse_btn: MouseButton::Left,
                    ..
                } => events.push(BackendEvent::PointerButton {
                    down: false,
                    at: Some(PointerPosition::new(x, y)),
                }),
                _ => {},
            }
        }
    }
}

impl Drop for WindowBackend {
    fn drop(&mut self) {
        if let Some(texture) = self.texture.take() {
            // SAFETY: the canvas that created the texture is still alive here.
            unsafe { texture.destroy() };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore = "needs a video device"]
    fn test_texture_survives_flushes() {
        let config = WindowConfig {
            width: 64,
            height: 32,
            vsync: false,
            ..WindowConfig::default()
        };
        let mut backend = WindowBackend::open(&config).expect("window");
        let raw = backend.texture.as_ref().map(|t| t.raw());

        backend.memory_mut().fill(0x80);
        backend.flush().expect("first flush");
        backend.flush().expect("second flush");
        assert_eq!(backend.texture.as_ref().map(|t| t.raw()), raw);
        assert!(raw.is_some());
    }
}

//! Startup configuration: which presentation backend to open and how

use crate::display::OpenFlags;
use crate::error::{DisplayError, DisplayResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Which presentation backend `DisplaySurface::open_with_config` creates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Linux framebuffer device (`/dev/fb0`)
    #[default]
    Framebuffer,
    /// SDL2 window emulating a 32bpp framebuffer, for desktop development
    Window,
    /// Headless surface held in process memory
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FramebufferConfig {
    pub device: PathBuf,
    /// Touch or pointer event node, skipped when it cannot be opened
    pub input_device: Option<PathBuf>,
}

impl Default for FramebufferConfig {
    fn default() -> Self {
        Self {
            device: PathBuf::from("/dev/fb0"),
            input_device: Some(PathBuf::from("/dev/input/event0")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub vsync: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "fbcanvas".to_string(),
            width: 800,
            height: 480,
            vsync: true,
        }
    }
}

/// Geometry of the headless backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub width: u32,
    pub height: u32,
    pub bits_per_pixel: u32,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
            bits_per_pixel: 32,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub backend: BackendKind,
    pub flags: OpenFlags,
    pub framebuffer: FramebufferConfig,
    pub window: WindowConfig,
    pub memory: MemoryConfig,
    /// Hook SIGINT so Ctrl+C clears the keep-going flag
    pub install_interrupt_handler: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            flags: OpenFlags::empty(),
            framebuffer: FramebufferConfig::default(),
            window: WindowConfig::default(),
            memory: MemoryConfig::default(),
            install_interrupt_handler: true,
        }
    }
}

impl DisplayConfig {
    /// Save config to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> DisplayResult<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| DisplayError::config(e.to_string()))?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load config from a JSON file
    pub fn load(path: impl AsRef<Path>) -> DisplayResult<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> DisplayResult<Self> {
        serde_json::from_str(json).map_err(|e| DisplayError::config(e.to_string()))
    }

    /// Load config, falling back to defaults if the file is missing or malformed
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Using default display config ({}): {}", path.display(), e);
                Self::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_gives_defaults() {
        let config = DisplayConfig::from_json("{}").unwrap();
        assert_eq!(config, DisplayConfig::default());
        assert_eq!(config.backend, BackendKind::Framebuffer);
        assert_eq!(config.framebuffer.device, PathBuf::from("/dev/fb0"));
        assert!(config.install_interrupt_handler);
    }

    #[test]
    fn test_partial_json_overrides() {
        let config = DisplayConfig::from_json(
            r#"{ "backend": "window", "window": { "width": 1024 }, "flags": "ROTATE_90 | VERBOSE" }"#,
        )
        .unwrap();
        assert_eq!(config.backend, BackendKind::Window);
        assert_eq!(config.window.width, 1024);
        assert_eq!(config.window.height, 480);
        assert!(config.flags.contains(OpenFlags::ROTATE_90));
        assert!(config.flags.contains(OpenFlags::VERBOSE));
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("fbcanvas-config-{}.json", std::process::id()));
        let mut config = DisplayConfig::default();
        config.backend = BackendKind::Memory;
        config.memory.bits_per_pixel = 16;
        config.flags = OpenFlags::FORCE_PORTRAIT;
        config.save(&path).unwrap();

        let loaded = DisplayConfig::load(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_bad_json_is_config_error() {
        assert!(matches!(
            DisplayConfig::from_json("{ not json"),
            Err(DisplayError::Config(_))
        ));
    }

    #[test]
    fn test_missing_file_falls_back() {
        let config = DisplayConfig::load_or_default("/nonexistent/fbcanvas.json");
        assert_eq!(config, DisplayConfig::default());
    }
}

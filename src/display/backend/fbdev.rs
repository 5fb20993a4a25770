//! Linux framebuffer device (`/dev/fb*`) plus an optional evdev touch node

use super::PresentationBackend;
use crate::config::FramebufferConfig;
use crate::display::format::{ChannelField, NativeFormat};
use crate::error::{DisplayError, DisplayResult};
use crate::events::BackendEvent;
use log::Level;
use std::fs::{File, OpenOptions};
use std::io::{self, Read};
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::ptr::{self, NonNull};

// ============================================================================
// Kernel ABI (linux/fb.h, linux/input.h)
// ============================================================================

const FBIOGET_VSCREENINFO: u32 = 0x4600;
const FBIOGET_FSCREENINFO: u32 = 0x4602;

const EV_SYN: u16 = 0x00;
const EV_KEY: u16 = 0x01;
const EV_ABS: u16 = 0x03;
const ABS_X: u16 = 0x00;
const ABS_Y: u16 = 0x01;
const BTN_TOUCH: u16 = 0x14a;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
struct FbBitfield {
    offset: u32,
    length: u32,
    msb_right: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
struct FbVarScreeninfo {
    xres: u32,
    yres: u32,
    xres_virtual: u32,
    yres_virtual: u32,
    xoffset: u32,
    yoffset: u32,
    bits_per_pixel: u32,
    grayscale: u32,
    red: FbBitfield,
    green: FbBitfield,
    blue: FbBitfield,
    transp: FbBitfield,
    nonstd: u32,
    activate: u32,
    height: u32,
    width: u32,
    accel_flags: u32,
    pixclock: u32,
    left_margin: u32,
    right_margin: u32,
    upper_margin: u32,
    lower_margin: u32,
    hsync_len: u32,
    vsync_len: u32,
    sync: u32,
    vmode: u32,
    rotate: u32,
    colorspace: u32,
    reserved: [u32; 4],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
struct FbFixScreeninfo {
    id: [u8; 16],
    smem_start: libc::c_ulong,
    smem_len: u32,
    type_: u32,
    type_aux: u32,
    visual: u32,
    xpanstep: u16,
    ypanstep: u16,
    ywrapstep: u16,
    line_length: u32,
    mmio_start: libc::c_ulong,
    mmio_len: u32,
    accel: u32,
    capabilities: u16,
    reserved: [u16; 2],
}

nix::ioctl_read_bad!(fbioget_vscreeninfo, FBIOGET_VSCREENINFO, FbVarScreeninfo);
nix::ioctl_read_bad!(fbioget_fscreeninfo, FBIOGET_FSCREENINFO, FbFixScreeninfo);

impl From<FbBitfield> for ChannelField {
    fn from(field: FbBitfield) -> Self {
        ChannelField::new(field.offset, field.length)
    }
}

// ============================================================================
// Mapped memory
// ============================================================================

/// Shared read/write mapping of device memory, unmapped on drop
struct MappedMemory {
    ptr: NonNull<u8>,
    len: usize,
}

impl MappedMemory {
    fn map(file: &File, len: usize) -> io::Result<Self> {
        let ptr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                file.as_raw_fd(),
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }
        let ptr = NonNull::new(ptr.cast::<u8>()).ok_or_else(|| io::Error::other("mmap returned null"))?;
        Ok(Self { ptr, len })
    }

    fn as_slice(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for MappedMemory {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.ptr.as_ptr().cast(), self.len);
        }
    }
}

// ============================================================================
// Touch input
// ============================================================================

/// Non-blocking reader of `struct input_event` records
struct EvdevReader {
    file: File,
    pending: Vec<u8>,
}

const RECORD_SIZE: usize = std::mem::size_of::<libc::input_event>();
const TIME_SIZE: usize = std::mem::size_of::<libc::timeval>();

/// Split one record into (type, code, value)
fn decode_record(record: &[u8]) -> Option<(u16, u16, i32)> {
    let body = record.get(TIME_SIZE..TIME_SIZE + 8)?;
    let kind = u16::from_ne_bytes([body[0], body[1]]);
    let code = u16::from_ne_bytes([body[2], body[3]]);
    let value = i32::from_ne_bytes([body[4], body[5], body[6], body[7]]);
    Some((kind, code, value))
}

fn translate_record(kind: u16, code: u16, value: i32) -> Option<BackendEvent> {
    match (kind, code) {
        (EV_KEY, BTN_TOUCH) => Some(BackendEvent::PointerButton {
            down: value != 0,
            at: None,
        }),
        (EV_ABS, ABS_X) => Some(BackendEvent::PointerAxis {
            x: Some(value),
            y: None,
        }),
        (EV_ABS, ABS_Y) => Some(BackendEvent::PointerAxis {
            x: None,
            y: Some(value),
        }),
        (EV_ABS, _) => Some(BackendEvent::PointerAxis { x: None, y: None }),
        (EV_SYN | EV_KEY, _) => None,
        _ => {
            log::trace!("Unhandled input record type={:#x} code={:#x} value={}", kind, code, value);
            None
        },
    }
}

impl EvdevReader {
    fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path)?;
        Ok(Self {
            file,
            pending: Vec::with_capacity(RECORD_SIZE * 16),
        })
    }

    fn poll(&mut self, events: &mut Vec<BackendEvent>) {
        let mut chunk = [0u8; RECORD_SIZE * 16];
        loop {
            match self.file.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => self.pending.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    log::warn!("Input device read failed: {}", e);
                    break;
                },
            }
        }

        let whole = self.pending.len() - self.pending.len() % RECORD_SIZE;
        for record in self.pending[..whole].chunks_exact(RECORD_SIZE) {
            if let Some(event) = decode_record(record).and_then(|(k, c, v)| translate_record(k, c, v)) {
                events.push(event);
            }
        }
        self.pending.drain(..whole);
    }
}

// ============================================================================
// Backend
// ============================================================================

pub struct FbdevBackend {
    // Field order matters: the mapping goes before the descriptor it came from.
    memory: MappedMemory,
    _device: File,
    input: Option<EvdevReader>,
    format: NativeFormat,
}

impl FbdevBackend {
    pub fn open(config: &FramebufferConfig, verbose: bool) -> DisplayResult<Self> {
        let level = if verbose { Level::Info } else { Level::Debug };

        let device = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&config.device)
            .map_err(|e| DisplayError::open(&config.device, e))?;
        log::log!(level, "Opened framebuffer device {}", config.device.display());

        let mut fix = FbFixScreeninfo::default();
        unsafe { fbioget_fscreeninfo(device.as_raw_fd(), &mut fix) }
            .map_err(|e| DisplayError::query(format!("FBIOGET_FSCREENINFO: {}", e)))?;
        let mut var = FbVarScreeninfo::default();
        unsafe { fbioget_vscreeninfo(device.as_raw_fd(), &mut var) }
            .map_err(|e| DisplayError::query(format!("FBIOGET_VSCREENINFO: {}", e)))?;

        log::log!(level, "Display size: {}x{}, {}bpp", var.xres, var.yres, var.bits_per_pixel);
        log::log!(level, "Frame buffer memory {} bytes, line length {}", fix.smem_len, fix.line_length);
        for (name, field) in [("Red", var.red), ("Green", var.green), ("Blue", var.blue)] {
            log::log!(
                level,
                "{} bitfield: offset {} length {} msb_right {}",
                name,
                field.offset,
                field.length,
                field.msb_right
            );
        }

        let format = NativeFormat {
            width: var.xres,
            height: var.yres,
            bits_per_pixel: var.bits_per_pixel,
            stride: fix.line_length as usize,
            size: fix.smem_len as usize,
            red: var.red.into(),
            green: var.green.into(),
            blue: var.blue.into(),
        };
        format.validate()?;

        let memory = MappedMemory::map(&device, format.size).map_err(|e| DisplayError::Map(e.to_string()))?;

        let input = config.input_device.as_deref().and_then(|path| match EvdevReader::open(path) {
            Ok(reader) => {
                log::log!(level, "Reading pointer input from {}", path.display());
                Some(reader)
            },
            Err(e) => {
                log::log!(level, "No pointer input from {}: {}", path.display(), e);
                None
            },
        });

        Ok(Self {
            memory,
            _device: device,
            input,
            format,
        })
    }
}

impl PresentationBackend for FbdevBackend {
    fn name(&self) -> &'static str {
        "framebuffer"
    }

    fn format(&self) -> NativeFormat {
        self.format
    }

    fn memory(&self) -> &[u8] {
        self.memory.as_slice()
    }

    fn memory_mut(&mut self) -> &mut [u8] {
        self.memory.as_mut_slice()
    }

    fn poll_events(&mut self, events: &mut Vec<BackendEvent>) {
        if let Some(input) = self.input.as_mut() {
            input.poll(events);
        }
    }
}

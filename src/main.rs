use anyhow::{bail, Context, Result};
use fbcanvas::util::{FrameTimer, Rng};
use fbcanvas::{
    BackendKind, Colour, DisplayConfig, DisplaySurface, OpenFlags, PixelBuffer, PixelFont,
    PointerPosition, SystemEvent, TweenTable,
};
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

const TICKER_TEXT: &str = "fbcanvas  *  software rendering straight to the framebuffer  *  ";

struct Args {
    config: Option<PathBuf>,
    backend: Option<BackendKind>,
    flags: OpenFlags,
    frames: Option<u64>,
    threads: usize,
}

fn print_help() {
    println!("Usage: fbcanvas-demo [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --config PATH      Load display settings from a JSON file");
    println!("  --window           Draw into a desktop window instead of /dev/fb0");
    println!("  --memory           Draw into memory only (headless)");
    println!("  --rotate DEG       Rotate the display by 90, 180 or 270 degrees");
    println!("  --landscape        Rotate if needed so the display is wider than tall");
    println!("  --portrait         Rotate if needed so the display is taller than wide");
    println!("  --frames N         Stop after N frames");
    println!("  --threads N        Render the background with N threads (default: 4)");
    println!("  --verbose          Report display details");
    println!("  --help             Show this help message");
}

/// Parse command line arguments
fn parse_args() -> Result<Args> {
    let args: Vec<String> = std::env::args().collect();
    let mut parsed = Args {
        config: None,
        backend: None,
        flags: OpenFlags::empty(),
        frames: None,
        threads: 4,
    };

    let mut i = 1;
    while i < args.len() {
        let value = args.get(i + 1);
        match args[i].as_str() {
            "--config" => {
                parsed.config = Some(value.context("--config needs a path")?.into());
                i += 1;
            },
            "--window" => parsed.backend = Some(BackendKind::Window),
            "--memory" => parsed.backend = Some(BackendKind::Memory),
            "--rotate" => {
                parsed.flags |= match value.map(String::as_str) {
                    Some("90") => OpenFlags::ROTATE_90,
                    Some("180") => OpenFlags::ROTATE_180,
                    Some("270") => OpenFlags::ROTATE_270,
                    other => bail!("--rotate takes 90, 180 or 270, not {:?}", other),
                };
                i += 1;
            },
            "--landscape" => parsed.flags |= OpenFlags::FORCE_LANDSCAPE,
            "--portrait" => parsed.flags |= OpenFlags::FORCE_PORTRAIT,
            "--verbose" | "-v" => parsed.flags |= OpenFlags::VERBOSE,
            "--frames" => {
                let n = value.context("--frames needs a count")?;
                parsed.frames = Some(n.parse().with_context(|| format!("bad frame count {:?}", n))?);
                i += 1;
            },
            "--threads" => {
                let n = value.context("--threads needs a count")?;
                parsed.threads = n.parse().with_context(|| format!("bad thread count {:?}", n))?;
                i += 1;
            },
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            },
            other => bail!("unknown option {:?}, try --help", other),
        }
        i += 1;
    }

    Ok(parsed)
}

/// Animated background, one band of rows per thread
fn draw_background(buffer: &mut PixelBuffer, palette: &TweenTable, frame: u64, threads: usize) {
    let width = buffer.width() as i32;
    let t = frame as i32;
    std::thread::scope(|s| {
        for mut band in buffer.bands_mut(threads) {
            s.spawn(move || {
                for y in band.rows() {
                    for x in 0..width {
                        let step = ((x + t) ^ (y - t)) & 0x3f;
                        let c = palette.get((step * 2 + 64) as u8);
                        band.write_pixel(x, y, c.r, c.g, c.b);
                    }
                }
            });
        }
    });
}

fn draw_shapes(buffer: &mut PixelBuffer, frame: u64, rng: &mut Rng) {
    let w = buffer.width() as i32;
    let h = buffer.height() as i32;
    let cx = w / 2;
    let cy = h / 2;
    let r = w.min(h) / 4;

    buffer.fill_checker_board(8, 8, 6, 4, 8, 8, [Colour::WHITE, Colour::grey(40)]);
    buffer.draw_gradient(w - 72, 8, w - 8, 8 + 64, Colour::RED, Colour::BLUE);

    buffer.fill_rounded_rectangle(cx - r - 16, cy - r - 16, cx + r + 16, cy + r + 16, 12, Colour::grey(20));
    buffer.draw_rounded_rectangle(cx - r - 16, cy - r - 16, cx + r + 16, cy + r + 16, 12, Colour::WHITE);
    buffer.fill_circle(cx, cy, r, Colour::rgb(0, 60, 120));
    buffer.draw_circle(cx, cy, r, Colour::rgb(120, 200, 255));

    let spokes = 12;
    for i in 0..spokes {
        let a = (i as f32 / spokes as f32 + frame as f32 / 600.0) * std::f32::consts::TAU;
        let x = cx + (a.cos() * r as f32) as i32;
        let y = cy + (a.sin() * r as f32) as i32;
        buffer.draw_line(cx, cy, x, y, Colour::rgb(255, 220, 0));
    }

    // Translucent sparks
    for _ in 0..32 {
        let x = rng.range_i32(0, w - 1);
        let y = rng.range_i32(0, h - 1);
        for dy in -2..=2 {
            for dx in -2..=2 {
                buffer.blend_pixel(x + dx, y + dy, 255, 255, 255, 96);
            }
        }
    }
}

/// Text crawling right to left through a strip that is scrolled in place
struct Ticker {
    strip: PixelBuffer,
    font: PixelFont,
    background: Colour,
    next_char: usize,
    last_char: char,
    /// How far the last character sticks out past the right edge
    overhang: i32,
}

impl Ticker {
    fn new(width: u32, font: PixelFont) -> Self {
        let background = Colour::rgb(10, 10, 40);
        let mut strip = PixelBuffer::new(width, font.char_height() as u32 + 4, false);
        strip.clear(background);
        Self {
            strip,
            font,
            background,
            next_char: 0,
            last_char: ' ',
            overhang: 0,
        }
    }

    fn advance(&mut self, speed: i32) {
        let width = self.strip.width() as i32;
        let cw = self.font.char_width();
        let pen = self.font.pen();

        self.strip.scroll_buffer(-speed, 0, self.background);
        self.overhang -= speed;
        // Clipped columns were lost on the previous frame, so redraw.
        self.font.draw_char(&mut self.strip, width + self.overhang - cw, 2, pen, self.last_char);

        while self.overhang <= 0 {
            self.last_char = TICKER_TEXT.chars().nth(self.next_char).unwrap_or(' ');
            self.next_char = (self.next_char + 1) % TICKER_TEXT.len();
            self.font.draw_char(&mut self.strip, width + self.overhang, 2, pen, self.last_char);
            self.overhang += cw;
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args()?;
    let mut config = match &args.config {
        Some(path) => DisplayConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => DisplayConfig::default(),
    };
    if let Some(backend) = args.backend {
        config.backend = backend;
    }
    config.flags |= args.flags;

    let mut display = DisplaySurface::open_with_config(&config).context("failed to open display")?;
    log::info!(
        "Drawing {}x{} ({:?}), Ctrl+C to stop",
        display.width(),
        display.height(),
        display.rotation()
    );

    let touches: Rc<RefCell<Vec<PointerPosition>>> = Rc::default();
    let sink = Rc::clone(&touches);
    display.set_event_handler(move |event| match event {
        SystemEvent::PointerDown(p) => sink.borrow_mut().push(*p),
        SystemEvent::PointerUp(p) => log::debug!("Pointer up at {},{}", p.x, p.y),
        SystemEvent::ExitRequested => log::info!("Exit requested, finishing frame"),
        SystemEvent::PointerMove(_) => {},
    });

    let mut buffer = PixelBuffer::for_surface(&display);
    let palette = TweenTable::hsv(Colour::rgb(0, 40, 120), Colour::rgb(120, 0, 80));
    let mut rng = Rng::new(0x5eed);
    let mut timer = FrameTimer::new(60);

    let mut font = PixelFont::new(1);
    font.set_pen(Colour::WHITE);
    font.set_border(Some(Colour::BLACK));
    let mut big_font = PixelFont::new(2);
    big_font.set_pen(Colour::rgb(255, 200, 0));
    let mut ticker = Ticker::new(buffer.width(), font.clone());

    while display.keep_going() {
        timer.tick();
        let frame = timer.frames();

        draw_background(&mut buffer, &palette, frame, args.threads);
        draw_shapes(&mut buffer, frame, &mut rng);

        for touch in touches.borrow().iter() {
            buffer.draw_circle(touch.x, touch.y, 10, Colour::GREEN);
        }

        ticker.advance(2);
        let ticker_y = buffer.height() as i32 - ticker.strip.height() as i32;
        buffer.blit(&ticker.strip, 0, ticker_y);

        big_font.print_with_pen(&mut buffer, 8, 48, "fbcanvas");
        font.printf(&mut buffer, 8, 48 + big_font.char_height() + 4, format_args!("{:5.1} fps", timer.average_fps()));

        display.present(&buffer);

        if args.frames.is_some_and(|limit| frame >= limit) {
            display.request_exit();
        }
    }

    log::info!("Stopped after {} frames", timer.frames());
    Ok(())
}

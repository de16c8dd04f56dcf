//! chipview frontend.
//!
//! Hosts the render engine in a minifb window (or headless, for automated
//! runs) and wires physical input to the key tracker:
//!
//! - **GUI mode** (default): scaled window, keyboard + gamepad input,
//!   per-frame rendering at 60 FPS with fade-out persistence, `[WAIT KEY]`
//!   title indicator while the machine blocks on a keypress.
//! - **Headless mode** (`--headless`): run N frames, scripted key events,
//!   ASCII display snapshots.
//!
//! The display refresh loop is independent of the machine step rate: each
//! window frame the machine is stepped `--ipf` times, but the engine's
//! render tick runs exactly once.
//!
//! GUI keys: 1234/QWER/ASDF/ZXCV = keypad, P = register dump, Esc = quit.

mod demo;

use std::fs::File;
use std::io::BufWriter;
use std::time::{Duration, Instant};

use chipview_core::keypad::map_key;
use chipview_core::snapshot::SnapshotLog;
use chipview_core::{
    FadeConfig, KeyWaitHandle, Keypad, RenderEngine, Simulator, StepEffect, SCREEN_HEIGHT,
    SCREEN_WIDTH,
};
use clap::Parser;
use gilrs::{Button as GilrsButton, Event as GilrsEvent, EventType, Gilrs};
use log::{error, warn};
use minifb::{Key, KeyRepeat, Scale, ScaleMode, Window, WindowOptions};

use demo::DemoSim;

#[derive(Parser, Debug)]
#[command(name = "chipview", about = "CHIP-8 display front-end with fade-out rendering")]
struct Args {
    /// Run without a window
    #[arg(long)]
    headless: bool,

    /// Frames to run in headless mode
    #[arg(long, default_value_t = 120)]
    frames: usize,

    /// Window scale factor (1-6)
    #[arg(long, default_value_t = 6)]
    scale: usize,

    /// Machine steps per display frame
    #[arg(long, default_value_t = 10)]
    ipf: usize,

    /// Write bincode-framed step snapshots to this file
    #[arg(long)]
    trace: Option<String>,

    /// Print per-frame diagnostics
    #[arg(long)]
    debug: bool,

    /// Headless: press keypad key 5 on this frame, release 5 frames later
    #[arg(long)]
    press: Option<usize>,

    /// Headless: print an ASCII display snapshot after this frame (repeatable)
    #[arg(long)]
    snapshot: Vec<usize>,

    /// Skip the key-wait pages between demo phases
    #[arg(long)]
    no_pause: bool,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if args.headless {
        run_headless(&args);
    } else {
        run_gui(&args);
    }
}

// ─── Input mapping ──────────────────────────────────────────────────────────

/// Host keyboard key → keypad character, fed through the core keymap.
/// Presence is tested on the `Option`, never on the mapped value, so the
/// key that maps to code 0 works like every other one.
fn host_key_code(key: Key) -> Option<u8> {
    let ch = match key {
        Key::Key1 => '1',
        Key::Key2 => '2',
        Key::Key3 => '3',
        Key::Key4 => '4',
        Key::Q => 'q',
        Key::W => 'w',
        Key::E => 'e',
        Key::R => 'r',
        Key::A => 'a',
        Key::S => 's',
        Key::D => 'd',
        Key::F => 'f',
        Key::Z => 'z',
        Key::X => 'x',
        Key::C => 'c',
        Key::V => 'v',
        _ => return None,
    };
    map_key(ch)
}

/// Gamepad buttons cover the 2/4/6/8 directional layout most programs use,
/// plus two action keys.
fn gamepad_code(button: GilrsButton) -> Option<u8> {
    match button {
        GilrsButton::DPadUp => Some(0x2),
        GilrsButton::DPadDown => Some(0x8),
        GilrsButton::DPadLeft => Some(0x4),
        GilrsButton::DPadRight => Some(0x6),
        GilrsButton::South => Some(0x5),
        GilrsButton::East => Some(0x0),
        _ => None,
    }
}

fn init_gamepad() -> Option<Gilrs> {
    match Gilrs::new() {
        Ok(gilrs) => Some(gilrs),
        Err(e) => {
            warn!("gamepad unavailable: {}", e);
            None
        }
    }
}

fn poll_gamepad(gilrs: &mut Gilrs, keypad: &mut Keypad, sim: &mut DemoSim) {
    while let Some(GilrsEvent { event, .. }) = gilrs.next_event() {
        match event {
            EventType::ButtonPressed(b, _) => {
                if let Some(code) = gamepad_code(b) {
                    keypad.set_key(code, true, sim);
                }
            }
            EventType::ButtonReleased(b, _) => {
                if let Some(code) = gamepad_code(b) {
                    keypad.set_key(code, false, sim);
                }
            }
            _ => {}
        }
    }
}

// ─── Machine stepping ───────────────────────────────────────────────────────

struct TraceSink {
    log: Option<SnapshotLog<BufWriter<File>>>,
}

impl TraceSink {
    fn open(path: Option<&str>) -> Self {
        let log = path.map(|p| {
            let file = File::create(p).expect("failed to create trace file");
            SnapshotLog::new(BufWriter::new(file))
        });
        TraceSink { log }
    }

    fn record(&mut self, sim: &DemoSim) {
        if let Some(log) = &mut self.log {
            if let Err(e) = log.record(&sim.snapshot()) {
                error!("{}", e);
                self.log = None;
            }
        }
    }
}

/// Step the machine up to `ipf` times, applying display effects to the
/// engine. Returns the key-wait handle if the machine blocked.
fn step_machine(
    sim: &mut DemoSim,
    engine: &mut RenderEngine,
    keypad: &mut Keypad,
    ipf: usize,
    trace: &mut TraceSink,
) -> Option<KeyWaitHandle> {
    for _ in 0..ipf {
        let effect = sim.step();
        trace.record(sim);
        match effect {
            StepEffect::Idle => {}
            StepEffect::Frame(pixels) => engine.submit_frame(pixels),
            StepEffect::ClearDisplay => engine.clear_display(),
            StepEffect::WaitKey => match keypad.wait_for_key() {
                Ok(handle) => return Some(handle),
                Err(e) => {
                    error!("key-wait request rejected: {}", e);
                    return None;
                }
            },
            StepEffect::Done => {
                engine.stop();
                return None;
            }
        }
    }
    None
}

// ─── GUI mode ───────────────────────────────────────────────────────────────

fn run_gui(args: &Args) {
    let scale = args.scale.clamp(1, 6);
    let scaled_w = SCREEN_WIDTH * scale;
    let scaled_h = SCREEN_HEIGHT * scale;

    let mut window = Window::new(
        "chipview",
        scaled_w,
        scaled_h,
        WindowOptions {
            scale: Scale::X1,
            scale_mode: ScaleMode::AspectRatioStretch,
            resize: true,
            ..Default::default()
        },
    )
    .expect("failed to create window");
    window.set_target_fps(60);

    let mut engine = RenderEngine::new(FadeConfig::default());
    let mut keypad = Keypad::new();
    let mut sim = DemoSim::new(!args.no_pause);
    let mut trace = TraceSink::open(args.trace.as_deref());
    let mut gilrs = init_gamepad();
    let mut pending_wait: Option<KeyWaitHandle> = None;

    let mut scaled_buf = vec![0u32; scaled_w * scaled_h];
    let mut last_fps_time = Instant::now();
    let mut fps_frames: u64 = 0;
    let mut prev_p = false;

    while window.is_open() && !window.is_key_down(Key::Escape) && engine.is_running() {
        if let Some(g) = &mut gilrs {
            poll_gamepad(g, &mut keypad, &mut sim);
        }
        for key in window.get_keys_pressed(KeyRepeat::No) {
            if let Some(code) = host_key_code(key) {
                keypad.set_key(code, true, &mut sim);
            }
        }
        for key in window.get_keys_released() {
            if let Some(code) = host_key_code(key) {
                keypad.set_key(code, false, &mut sim);
            }
        }

        // Register dump (P)
        let p = window.is_key_down(Key::P);
        if p && !prev_p {
            eprintln!("--- step state ---\n{}\n---", sim.snapshot());
        }
        prev_p = p;

        // Advance the machine unless it is blocked on the key-wait handshake
        match pending_wait.take() {
            Some(handle) => match handle.resolved() {
                Some(code) => sim.resume_with_key(code),
                None => pending_wait = Some(handle),
            },
            None => {
                pending_wait = step_machine(&mut sim, &mut engine, &mut keypad, args.ipf, &mut trace);
            }
        }

        // One render tick per display refresh, then blit scaled
        engine.render_tick();
        let pixels = engine.framebuffer_u32();
        for y in 0..SCREEN_HEIGHT {
            for x in 0..SCREEN_WIDTH {
                let c = pixels[y * SCREEN_WIDTH + x];
                for sy in 0..scale {
                    let base = (y * scale + sy) * scaled_w + x * scale;
                    for sx in 0..scale {
                        scaled_buf[base + sx] = c;
                    }
                }
            }
        }
        window
            .update_with_buffer(&scaled_buf, scaled_w, scaled_h)
            .expect("window update failed");

        fps_frames += 1;
        if last_fps_time.elapsed() >= Duration::from_secs(2) {
            let fps = fps_frames as f64 / last_fps_time.elapsed().as_secs_f64();
            let waiting = if keypad.is_waiting() { " [WAIT KEY]" } else { "" };
            window.set_title(&format!("chipview - {:.0} FPS{} ({}x)", fps, waiting, scale));
            fps_frames = 0;
            last_fps_time = Instant::now();
        }
    }

    if args.debug {
        println!("{} render frames", engine.frame_count);
    }
}

// ─── Headless mode ──────────────────────────────────────────────────────────

fn run_headless(args: &Args) {
    let mut engine = RenderEngine::new(FadeConfig::default());
    let mut keypad = Keypad::new();
    // Key-wait pages would block forever without a scripted key, so the
    // demo only pauses when --press provides one.
    let mut sim = DemoSim::new(args.press.is_some());
    let mut trace = TraceSink::open(args.trace.as_deref());
    let mut pending_wait: Option<KeyWaitHandle> = None;

    for frame in 0..args.frames {
        if !engine.is_running() {
            break;
        }
        if let Some(pf) = args.press {
            if frame == pf {
                keypad.set_key(0x5, true, &mut sim);
                if args.debug {
                    println!("  >> key 5 pressed");
                }
            } else if frame == pf + 5 {
                keypad.set_key(0x5, false, &mut sim);
                if args.debug {
                    println!("  >> key 5 released");
                }
            }
        }

        match pending_wait.take() {
            Some(handle) => match handle.resolved() {
                Some(code) => sim.resume_with_key(code),
                None => pending_wait = Some(handle),
            },
            None => {
                pending_wait = step_machine(&mut sim, &mut engine, &mut keypad, args.ipf, &mut trace);
            }
        }

        engine.render_tick();

        if args.debug {
            println!(
                "  Frame {:3}: {:4} px lit  {} fade batches{}",
                frame + 1,
                engine.current_pixels().len(),
                engine.pending_fade_batches(),
                if keypad.is_waiting() { "  [WAIT KEY]" } else { "" },
            );
        }
        if args.snapshot.contains(&(frame + 1)) || (args.debug && frame == args.frames - 1) {
            println!("\n  === Frame {} ===", frame + 1);
            print_display(&engine);
        }
    }
    if args.debug {
        println!("\nDone. {} render frames.", engine.frame_count);
    }
}

/// ASCII render of the framebuffer, two rows per text line.
fn print_display(engine: &RenderEngine) {
    let fb = engine.framebuffer_rgba();
    println!("  ({} px lit)", engine.current_pixels().len());
    for y in (0..SCREEN_HEIGHT).step_by(2) {
        let mut line = String::with_capacity(SCREEN_WIDTH + 4);
        line.push_str("  |");
        for x in 0..SCREEN_WIDTH {
            let top = fb[(y * SCREEN_WIDTH + x) * 4] > 128;
            let bottom = y + 1 < SCREEN_HEIGHT && fb[((y + 1) * SCREEN_WIDTH + x) * 4] > 128;
            line.push(match (top, bottom) {
                (true, true) => '█',
                (true, false) => '▀',
                (false, true) => '▄',
                _ => ' ',
            });
        }
        line.push('|');
        println!("{}", line);
    }
}

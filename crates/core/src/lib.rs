//! # chipview-core
//!
//! Render engine for the output of a CHIP-8-class virtual machine: a fixed
//! 64×32 monochrome bit display with dirty-pixel diffing, timed fade-out
//! persistence, and 16-key input tracking.
//!
//! The virtual machine itself (opcode decode, registers, memory, timers) is
//! an external collaborator reached through the narrow [`sim::Simulator`]
//! contract. This crate owns everything between the machine's pixel output
//! and the host's drawing surface:
//!
//! - [`frame`] — pixel sets over the 64×32 grid and the erased-pixel differ
//! - [`fade`] — ordered queue of erased-pixel batches aging out over a
//!   bounded number of render frames
//! - [`engine`] — the per-refresh renderer and its RGBA framebuffer
//! - [`keypad`] — 4-bit key-code state and the blocking key-wait handshake
//! - [`snapshot`] — per-step debug-state snapshots and trace logging
//! - [`sim`] — the contract to the external virtual machine
//!
//! The renderer runs at the host's display refresh rate, decoupled from the
//! machine's step rate: the machine hands over a full pixel set whenever its
//! display changes, the engine diffs it against the previous set, and pixels
//! that turned off keep being drawn for a few frames at decreasing opacity
//! so a fast-stepping machine does not flicker.

pub mod frame;
pub mod fade;
pub mod engine;
pub mod keypad;
pub mod snapshot;
pub mod sim;

pub use engine::RenderEngine;
pub use fade::{FadeConfig, FadeQueue};
pub use frame::{diff, Pixel, PixelSet};
pub use keypad::{KeySink, KeyWaitHandle, Keypad};
pub use sim::{Simulator, StepEffect};
pub use snapshot::StepSnapshot;

/// Display width in pixels
pub const SCREEN_WIDTH: usize = 64;
/// Display height in pixels
pub const SCREEN_HEIGHT: usize = 32;
/// Number of keys on the hex keypad (codes 0x0–0xF)
pub const KEY_COUNT: usize = 16;

/// Errors surfaced by the render engine and the key tracker.
///
/// Unmapped keys and empty frames are deliberately *not* errors: an unknown
/// key is a no-op and a frame with no lit pixels is a valid (blank) display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineError {
    /// A pixel coordinate fell outside the 64×32 grid. Coordinate wrapping
    /// is the virtual machine's contract; the renderer rejects rather than
    /// wraps.
    PixelOutOfRange { x: u8, y: u8 },
    /// `wait_for_key` was called while an earlier key-wait was still
    /// outstanding. Only one wait may be pending at a time; overwriting the
    /// first would lose its resolution.
    AlreadyWaiting,
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::PixelOutOfRange { x, y } => {
                write!(f, "pixel ({}, {}) outside {}x{} display", x, y, SCREEN_WIDTH, SCREEN_HEIGHT)
            }
            EngineError::AlreadyWaiting => write!(f, "a key-wait request is already outstanding"),
        }
    }
}

impl std::error::Error for EngineError {}

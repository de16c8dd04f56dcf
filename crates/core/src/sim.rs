//! Contract to the external virtual machine.
//!
//! The machine is constructed elsewhere (from ROM bytes, with its own
//! decode/registers/timers) and reached through this narrow interface: the
//! host pushes key-state changes in, steps the machine one instruction
//! batch at a time, and receives display effects and debug snapshots back.

use crate::frame::PixelSet;
use crate::keypad::KeySink;
use crate::snapshot::StepSnapshot;

/// What one machine step asked of the display layer.
#[derive(Debug, Clone, PartialEq)]
pub enum StepEffect {
    /// No display change.
    Idle,
    /// Display contents changed; the full set of lit pixels is attached.
    Frame(PixelSet),
    /// Display cleared (the 00E0 instruction).
    ClearDisplay,
    /// The machine is blocked awaiting exactly one keypress (Fx0A). The
    /// host must not step again until it resolves the wait and calls
    /// [`Simulator::resume_with_key`].
    WaitKey,
    /// Program finished; no further steps will have an effect.
    Done,
}

/// The external CHIP-8-class virtual machine.
///
/// `KeySink` is a supertrait: the key tracker forwards every recognized key
/// edge to the machine synchronously, so the machine's next step observes
/// the new state.
pub trait Simulator: KeySink {
    /// Execute one instruction batch.
    fn step(&mut self) -> StepEffect;

    /// Complete an earlier [`StepEffect::WaitKey`] with the resolving key
    /// code.
    fn resume_with_key(&mut self, code: u8);

    /// Debug-state view after the most recent step.
    fn snapshot(&self) -> StepSnapshot;
}

//! Per-step debug-state snapshots.
//!
//! After every executed instruction the machine can hand over a frozen view
//! of its registers for debug projection. The core does not interpret the
//! contents; it formats them for human-readable dumps and can append them,
//! bincode-framed, to a trace writer for offline inspection.

use std::fmt;
use std::io::Write;

use serde::{Deserialize, Serialize};

/// A frozen view of the machine after one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSnapshot {
    /// Program counter
    pub pc: u16,
    /// Stack pointer
    pub sp: u8,
    /// Address register I
    pub i: u16,
    /// Delay timer
    pub dt: u8,
    /// General registers V0–VF
    pub regs: [u8; 16],
    /// Call stack
    pub stack: [u16; 16],
    /// Program has finished
    pub done: bool,
    /// Disassembly of the instruction at `pc`
    pub assembly: String,
}

impl fmt::Display for StepSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.regs.iter().enumerate() {
            if i % 8 == 0 && i > 0 {
                writeln!(f)?;
            }
            write!(f, "V{:X}={:02X} ", i, v)?;
        }
        writeln!(f)?;
        write!(
            f,
            "PC={:04X} SP={:02X} I={:04X} DT={:02X}  {}",
            self.pc, self.sp, self.i, self.dt, self.assembly
        )
    }
}

/// Appends snapshots to a writer as consecutive bincode frames.
pub struct SnapshotLog<W: Write> {
    out: W,
    count: u64,
}

impl<W: Write> SnapshotLog<W> {
    pub fn new(out: W) -> Self {
        SnapshotLog { out, count: 0 }
    }

    pub fn record(&mut self, snapshot: &StepSnapshot) -> Result<(), String> {
        bincode::serialize_into(&mut self.out, snapshot)
            .map_err(|e| format!("trace write failed: {}", e))?;
        self.count += 1;
        Ok(())
    }

    /// Snapshots recorded so far.
    pub fn len(&self) -> u64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Consume the log, returning the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

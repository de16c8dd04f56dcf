//! Pixel sets over the 64×32 display grid and the erased-pixel differ.
//!
//! A frame from the virtual machine is the set of all currently-lit
//! coordinates; everything else is implicitly off. The grid is exactly 64
//! columns wide, so a set is stored as one `u64` bit mask per row, which
//! makes the differ a row-wise `prev & !next` and membership a single bit
//! test.

use crate::{EngineError, SCREEN_HEIGHT, SCREEN_WIDTH};

/// A lit display coordinate. `x` in 0..64, `y` in 0..32.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pixel {
    pub x: u8,
    pub y: u8,
}

/// Set of lit pixels for one machine-reported frame.
///
/// No duplicates, order irrelevant. Coordinates are validated on insertion;
/// the machine is responsible for wrapping before it reports, so anything
/// out of range here is rejected as [`EngineError::PixelOutOfRange`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PixelSet {
    rows: [u64; SCREEN_HEIGHT],
}

impl PixelSet {
    pub fn new() -> Self {
        PixelSet { rows: [0; SCREEN_HEIGHT] }
    }

    /// Build a set from `(x, y)` pairs, rejecting the first out-of-range
    /// coordinate.
    pub fn from_coords(coords: &[(u8, u8)]) -> Result<Self, EngineError> {
        let mut set = PixelSet::new();
        for &(x, y) in coords {
            set.insert(x, y)?;
        }
        Ok(set)
    }

    pub fn insert(&mut self, x: u8, y: u8) -> Result<(), EngineError> {
        if (x as usize) >= SCREEN_WIDTH || (y as usize) >= SCREEN_HEIGHT {
            return Err(EngineError::PixelOutOfRange { x, y });
        }
        self.rows[y as usize] |= 1u64 << x;
        Ok(())
    }

    /// Remove a pixel if present. Out-of-range coordinates are a no-op.
    pub fn remove(&mut self, x: u8, y: u8) {
        if (x as usize) < SCREEN_WIDTH && (y as usize) < SCREEN_HEIGHT {
            self.rows[y as usize] &= !(1u64 << x);
        }
    }

    pub fn contains(&self, x: u8, y: u8) -> bool {
        (x as usize) < SCREEN_WIDTH
            && (y as usize) < SCREEN_HEIGHT
            && self.rows[y as usize] & (1u64 << x) != 0
    }

    pub fn len(&self) -> usize {
        self.rows.iter().map(|r| r.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|&r| r == 0)
    }

    pub fn clear(&mut self) {
        self.rows = [0; SCREEN_HEIGHT];
    }

    /// Iterate lit pixels, row by row, ascending x within a row.
    pub fn iter(&self) -> impl Iterator<Item = Pixel> + '_ {
        self.rows.iter().enumerate().flat_map(|(y, &row)| {
            let mut mask = row;
            std::iter::from_fn(move || {
                if mask == 0 {
                    return None;
                }
                let x = mask.trailing_zeros() as u8;
                mask &= mask - 1;
                Some(Pixel { x, y: y as u8 })
            })
        })
    }
}

/// Pixels present in `previous` but absent from `next` — the pixels that
/// were erased between two machine frames.
///
/// Runs once per machine-delivered frame (render ticks are far more
/// frequent and must not re-diff). Empty or identical inputs yield the
/// empty set.
pub fn diff(previous: &PixelSet, next: &PixelSet) -> PixelSet {
    let mut erased = PixelSet::new();
    for y in 0..SCREEN_HEIGHT {
        erased.rows[y] = previous.rows[y] & !next.rows[y];
    }
    erased
}

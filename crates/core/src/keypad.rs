//! Key tracking and the blocking key-wait handshake.
//!
//! The machine reads a 16-key hex keypad (codes 0x0–0xF). The tracker keeps
//! the pressed/released map, forwards every recognized edge to the machine
//! synchronously, and serves the machine's "wait for keypress" instruction
//! through a single-slot handle that resolves exactly once.
//!
//! Host keyboards map onto keypad codes through [`map_key`], which returns
//! `Option<u8>` so presence is tested explicitly: code 0 (the `X` key) is a
//! perfectly legitimate code and must behave like every other one. A naive
//! truthiness test on the mapped value silently drops that key.

use std::cell::Cell;
use std::rc::Rc;

use log::warn;

use crate::{EngineError, KEY_COUNT};

/// Receiver of key-state changes; the machine side of the tracker.
pub trait KeySink {
    fn key_changed(&mut self, code: u8, pressed: bool);
}

/// Handle to one outstanding key-wait request.
///
/// A single-slot future: the tracker fills the slot with the resolving key
/// code, exactly once, and the holder polls [`KeyWaitHandle::resolved`].
/// Single execution context, so a plain `Rc<Cell>` slot suffices.
#[derive(Debug, Clone)]
pub struct KeyWaitHandle {
    slot: Rc<Cell<Option<u8>>>,
}

impl KeyWaitHandle {
    pub fn resolved(&self) -> Option<u8> {
        self.slot.get()
    }
}

/// Conventional QWERTY layout for the 16-key keypad:
///
/// ```text
/// 1 2 3 C        1 2 3 4
/// 4 5 6 D   ->   Q W E R
/// 7 8 9 E        A S D F
/// A 0 B F        Z X C V
/// ```
pub fn map_key(key: char) -> Option<u8> {
    match key.to_ascii_lowercase() {
        'x' => Some(0x0),
        '1' => Some(0x1),
        '2' => Some(0x2),
        '3' => Some(0x3),
        'q' => Some(0x4),
        'w' => Some(0x5),
        'e' => Some(0x6),
        'a' => Some(0x7),
        's' => Some(0x8),
        'd' => Some(0x9),
        'z' => Some(0xA),
        'c' => Some(0xB),
        '4' => Some(0xC),
        'r' => Some(0xD),
        'f' => Some(0xE),
        'v' => Some(0xF),
        _ => None,
    }
}

/// Pressed/released state for all 16 keys plus the key-wait slot.
pub struct Keypad {
    keys: [bool; KEY_COUNT],
    wait: Option<Rc<Cell<Option<u8>>>>,
}

impl Keypad {
    pub fn new() -> Self {
        Keypad {
            keys: [false; KEY_COUNT],
            wait: None,
        }
    }

    /// Record a key edge and forward it to the machine synchronously.
    ///
    /// Codes outside 0x0–0xF are ignored: no state change, no notification.
    /// While a key-wait is outstanding, state is still tracked for every
    /// key; additionally the first recognized **release** resolves the wait.
    /// Resolving on release rather than press is order-independent: the key
    /// that went down after the wait began is necessarily the one released.
    pub fn set_key(&mut self, code: u8, pressed: bool, sink: &mut dyn KeySink) {
        if code as usize >= KEY_COUNT {
            warn!("ignoring key code 0x{:02X} outside keypad range", code);
            return;
        }
        self.keys[code as usize] = pressed;
        sink.key_changed(code, pressed);

        if !pressed {
            if let Some(slot) = self.wait.take() {
                slot.set(Some(code));
            }
        }
    }

    pub fn is_pressed(&self, code: u8) -> bool {
        (code as usize) < KEY_COUNT && self.keys[code as usize]
    }

    /// Begin the key-wait handshake: Idle → Waiting.
    ///
    /// Errors with [`EngineError::AlreadyWaiting`] if a wait is already
    /// outstanding; the earlier request keeps its slot.
    pub fn wait_for_key(&mut self) -> Result<KeyWaitHandle, EngineError> {
        if self.wait.is_some() {
            return Err(EngineError::AlreadyWaiting);
        }
        let slot = Rc::new(Cell::new(None));
        self.wait = Some(Rc::clone(&slot));
        Ok(KeyWaitHandle { slot })
    }

    /// True while a key-wait is outstanding; hosts use this to show a
    /// waiting indicator.
    pub fn is_waiting(&self) -> bool {
        self.wait.is_some()
    }

    /// Forget all key state, e.g. when a new program is loaded.
    pub fn reset(&mut self) {
        self.keys = [false; KEY_COUNT];
        self.wait = None;
    }
}

impl Default for Keypad {
    fn default() -> Self {
        Keypad::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        events: Vec<(u8, bool)>,
    }

    impl KeySink for Recorder {
        fn key_changed(&mut self, code: u8, pressed: bool) {
            self.events.push((code, pressed));
        }
    }

    #[test]
    fn test_key_code_zero_is_forwarded_like_any_other() {
        // Regression guard: 'x' maps to code 0, which a truthiness test on
        // the mapped value would silently drop.
        assert_eq!(map_key('x'), Some(0x0));

        let mut keypad = Keypad::new();
        let mut sink = Recorder::default();
        keypad.set_key(0x0, true, &mut sink);
        keypad.set_key(0xF, true, &mut sink);
        assert!(keypad.is_pressed(0x0));
        assert_eq!(sink.events, vec![(0x0, true), (0xF, true)]);
    }

    #[test]
    fn test_out_of_range_codes_are_ignored() {
        let mut keypad = Keypad::new();
        let mut sink = Recorder::default();
        keypad.set_key(16, true, &mut sink);
        keypad.set_key(0xFF, true, &mut sink);
        assert!(sink.events.is_empty());
        assert!(!keypad.is_pressed(16));
    }

    #[test]
    fn test_map_key_covers_all_sixteen_codes() {
        let mut codes: Vec<u8> = "x123qweasdzc4rfv".chars().map(|c| map_key(c).unwrap()).collect();
        codes.sort_unstable();
        assert_eq!(codes, (0..16).collect::<Vec<u8>>());
        assert_eq!(map_key('9'), None);
        assert_eq!(map_key(' '), None);
    }

    #[test]
    fn test_second_wait_request_is_rejected() {
        let mut keypad = Keypad::new();
        let first = keypad.wait_for_key().unwrap();
        assert_eq!(keypad.wait_for_key().unwrap_err(), EngineError::AlreadyWaiting);
        assert!(first.resolved().is_none());
        assert!(keypad.is_waiting());
    }

    #[test]
    fn test_wait_resolves_on_release_only() {
        let mut keypad = Keypad::new();
        let mut sink = Recorder::default();
        let handle = keypad.wait_for_key().unwrap();

        keypad.set_key(0x5, true, &mut sink);
        assert!(handle.resolved().is_none(), "press must not resolve");
        assert!(keypad.is_pressed(0x5), "state still tracked while waiting");

        keypad.set_key(0x5, false, &mut sink);
        assert_eq!(handle.resolved(), Some(0x5));
        assert!(!keypad.is_waiting());
    }

    #[test]
    fn test_wait_resolves_exactly_once() {
        let mut keypad = Keypad::new();
        let mut sink = Recorder::default();
        let handle = keypad.wait_for_key().unwrap();
        keypad.set_key(0x2, false, &mut sink);
        keypad.set_key(0x7, false, &mut sink);
        assert_eq!(handle.resolved(), Some(0x2), "first release wins, later ones ignored");

        // A fresh request is allowed once the previous one resolved.
        let second = keypad.wait_for_key().unwrap();
        keypad.set_key(0x0, true, &mut sink);
        keypad.set_key(0x0, false, &mut sink);
        assert_eq!(second.resolved(), Some(0x0));
    }
}

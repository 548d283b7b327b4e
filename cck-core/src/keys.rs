//! Key-state store shared between interrupt handlers and the main loop.
//!
//! Every slot has exactly one writer: the edge interrupt of its switch, or
//! the touch aggregation step of the report composer. Readers take a
//! per-flag snapshot, so a snapshot may mix values from before and after an
//! interrupt that fired while it was being copied.

use core::sync::atomic::{AtomicBool, Ordering};

/// Number of logical inputs the store can hold.
pub const MAX_KEYS: usize = 8;

pub struct KeyStates {
    flags: [AtomicBool; MAX_KEYS],
}

impl KeyStates {
    pub const fn new() -> Self {
        Self {
            flags: [const { AtomicBool::new(false) }; MAX_KEYS],
        }
    }

    /// Store a decision for `index`. Only the slot's owner may call this.
    pub fn set(&self, index: usize, active: bool) {
        if let Some(flag) = self.flags.get(index) {
            flag.store(active, Ordering::Relaxed);
        }
    }

    pub fn get(&self, index: usize) -> bool {
        self.flags
            .get(index)
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    pub fn snapshot(&self) -> [bool; MAX_KEYS] {
        let mut states = [false; MAX_KEYS];
        for (state, flag) in states.iter_mut().zip(self.flags.iter()) {
            *state = flag.load(Ordering::Relaxed);
        }
        states
    }
}

impl Default for KeyStates {
    fn default() -> Self {
        Self::new()
    }
}

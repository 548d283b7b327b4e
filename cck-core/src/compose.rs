//! Report composition from the key-state store.

use log::trace;

use crate::board::BoardConfig;
use crate::keys::KeyStates;
use crate::report::{KeyboardReport, KEY_SLOTS};

/// Build a HID keyboard report from the current key states.
///
/// Inputs are visited in board order. Modifier keycodes set their bit in
/// the modifier byte; every other active input takes the next free slot.
/// Active inputs beyond the last slot are dropped. Returns the number of
/// slots used.
pub fn build_report(board: &BoardConfig, keys: &KeyStates, report: &mut KeyboardReport) -> usize {
    let states = keys.snapshot();
    let mut key_idx = 0usize;

    for (input, &active) in board.inputs.iter().zip(states.iter()) {
        if !active {
            continue;
        }

        let kc = input.keycode;
        if kc.is_modifier() {
            report.modifiers |= kc.modifier_bit();
        } else if key_idx < KEY_SLOTS {
            report.keys[key_idx] = kc as u8;
            key_idx += 1;
        } else {
            trace!("no slot left for {}", input.label);
        }
    }

    key_idx
}

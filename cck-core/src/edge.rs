//! Edge-triggered switch handling.
//!
//! Switches are active-low with pull-ups. On every edge the handler samples
//! the pin level and stores it as the switch's state. There is no debounce:
//! contact bounce shorter than the host's polling interval is invisible, and
//! longer chatter reaches the host as-is.

use crate::board::{BoardConfig, ExtInt, Pin};
use crate::keys::KeyStates;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PinLevel {
    Low,
    High,
}

impl PinLevel {
    pub fn from_high(high: bool) -> Self {
        if high {
            PinLevel::High
        } else {
            PinLevel::Low
        }
    }

    pub fn is_high(self) -> bool {
        self == PinLevel::High
    }
}

/// Record the level of switch `index`. Writes that one slot and nothing else.
pub fn on_edge(keys: &KeyStates, index: usize, level: PinLevel) {
    keys.set(index, level == PinLevel::Low);
}

/// Service an external interrupt: find the switch on `interrupt` and sample its pin.
///
/// Lines the board does not use are ignored.
pub fn on_external_interrupt(
    board: &BoardConfig,
    keys: &KeyStates,
    interrupt: ExtInt,
    read_pin: impl FnOnce(Pin) -> PinLevel,
) {
    if let Some((index, input)) = board.switch_for(interrupt) {
        on_edge(keys, index, read_pin(input.pin));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Port, CCK_2M3_V2};

    #[test]
    fn test_active_low() {
        let keys = KeyStates::new();
        on_edge(&keys, 0, PinLevel::Low);
        assert!(keys.get(0));
        on_edge(&keys, 0, PinLevel::High);
        assert!(!keys.get(0));
    }

    #[test]
    fn test_interrupt_reads_its_own_pin() {
        let keys = KeyStates::new();
        on_external_interrupt(&CCK_2M3_V2, &keys, ExtInt::Int0, |pin| {
            assert_eq!(pin, Pin::new(Port::D, 0));
            PinLevel::Low
        });
        assert_eq!(keys.snapshot()[..5], [false, false, false, true, false]);
    }

    #[test]
    fn test_unused_line_touches_nothing() {
        let keys = KeyStates::new();
        on_external_interrupt(&CCK_2M3_V2, &keys, ExtInt::Int7, |_| PinLevel::Low);
        assert!(keys.snapshot().iter().all(|&k| !k));
    }
}

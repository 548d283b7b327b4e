//! Indicator LEDs driven straight from the key states.
//!
//! Each indicator is lit by any of its source inputs and inverted while its
//! mode input (the side switch) is held. No filtering is applied, so an
//! indicator flickers exactly as its inputs do.

use crate::board::{BoardConfig, IndicatorConfig, Pin};
use crate::edge::PinLevel;
use crate::keys::KeyStates;

impl IndicatorConfig {
    /// Logical state: `(OR of sources) XOR mode`.
    pub fn evaluate(&self, states: &[bool]) -> bool {
        let state = |i: usize| states.get(i).copied().unwrap_or(false);
        let any = self.sources.iter().any(|&i| state(i));
        let mode = self.mode.is_some_and(state);
        any ^ mode
    }

    /// Output level for the indicator's pin.
    pub fn level(&self, states: &[bool]) -> PinLevel {
        PinLevel::from_high(self.evaluate(states) ^ self.active_low)
    }
}

/// Pin levels for every indicator on the board, from one snapshot of the key states.
pub fn indicator_levels<'b>(
    board: &'b BoardConfig,
    keys: &KeyStates,
) -> impl Iterator<Item = (Pin, PinLevel)> + 'b {
    let states = keys.snapshot();
    board
        .indicators
        .iter()
        .map(move |ind| (ind.pin, ind.level(&states)))
}

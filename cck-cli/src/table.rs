//! Plain-text rendering of board tables and keyboard reports.

use std::fmt::Write;

use cck_core::board::{BoardConfig, InputSource, Sensing};
use cck_core::{Keycode, KeyboardReport, PinLevel};

/// Describe a board's inputs and indicator wiring, one line per pin.
pub fn render_board(board: &BoardConfig) -> String {
    let mut out = String::new();

    let sensing = match board.sensing {
        Sensing::Mechanical => "mechanical switches".to_string(),
        Sensing::Touch { threshold } => format!("capacitive touch, threshold {}", threshold),
    };
    let _ = writeln!(out, "{} ({})", board.name, sensing);

    let _ = writeln!(out, "  inputs:");
    for (index, input) in board.inputs.iter().enumerate() {
        let source = match input.source {
            InputSource::Switch { interrupt } => format!("INT{}", interrupt.line()),
            InputSource::Touch { mux } => format!("ADC mux 0b{:05b}", mux),
        };
        let _ = writeln!(
            out,
            "    [{}] {:<8} P{}{}  {:<14} {}",
            index,
            input.label,
            input.pin.port.name(),
            input.pin.bit,
            source,
            input.keycode.display_name()
        );
    }

    if board.indicators.is_empty() {
        return out;
    }

    let _ = writeln!(out, "  indicators:");
    for indicator in board.indicators {
        let sources: Vec<String> = indicator
            .sources
            .iter()
            .map(|&i| board.inputs.get(i).map_or("?", |input| input.label).to_string())
            .collect();
        let mut rule = format!("({})", sources.join(" | "));
        if let Some(mode) = indicator.mode {
            let label = board.inputs.get(mode).map_or("?", |input| input.label);
            let _ = write!(rule, " ^ {}", label);
        }
        if indicator.active_low {
            rule.push_str(", active low");
        }
        let _ = writeln!(
            out,
            "    {:<8} P{}{}  {}",
            indicator.label,
            indicator.pin.port.name(),
            indicator.pin.bit,
            rule
        );
    }

    out
}

/// Modifier names followed by the keys in slot order, e.g. `LShift+X`.
/// An empty report renders as `(none)`.
pub fn render_report(report: &KeyboardReport) -> String {
    let mut names: Vec<String> = (0..8u8)
        .filter(|bit| report.modifiers & (1 << bit) != 0)
        .filter_map(|bit| Keycode::from_u8(0xE0 + bit))
        .map(|code| code.display_name().to_string())
        .collect();

    names.extend(report.pressed().map(|code| match Keycode::from_u8(code) {
        Some(keycode) => keycode.display_name().to_string(),
        None => format!("0x{:02X}", code),
    }));

    if names.is_empty() {
        "(none)".to_string()
    } else {
        names.join("+")
    }
}

/// `label=on` per indicator, in pin terms (`High` lights an active-high LED).
pub fn render_indicators<'a>(levels: impl Iterator<Item = (&'a str, PinLevel)>) -> String {
    levels
        .map(|(label, level)| {
            let state = if level.is_high() { "high" } else { "low" };
            format!("{}={}", label, state)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

//! Host-side run of the firmware's main loop.
//!
//! Each iteration samples (touch boards), lets the HID bridge decide whether
//! to transmit, then counts one millisecond of idle time. Every report the
//! bridge hands to its endpoint becomes an [`Event`].

use anyhow::{anyhow, Result};
use indicatif::ProgressBar;
use log::warn;

use cck_core::board::{BoardConfig, InputSource};
use cck_core::edge::{self, PinLevel};
use cck_core::hid::{HidClass, ReportEndpoint};
use cck_core::touch::TouchSampler;
use cck_core::{KeyStates, Keyboard, KeyboardReport};

use crate::replay::{ReplayAdc, SampleLine};

/// A report the keyboard would have sent, with the indicator levels at that time.
pub struct Event {
    /// 1-based loop iteration.
    pub iteration: usize,
    pub report: KeyboardReport,
    pub indicators: Vec<(&'static str, PinLevel)>,
}

/// Endpoint that keeps the last report written to it.
#[derive(Default)]
struct Capture {
    written: Option<Vec<u8>>,
}

impl ReportEndpoint for Capture {
    fn is_ready(&mut self) -> bool {
        true
    }

    fn write(&mut self, data: &[u8]) {
        self.written = Some(data.to_vec());
    }
}

struct Bridge {
    hid: HidClass,
    endpoint: Capture,
}

impl Bridge {
    fn new() -> Self {
        let mut hid = HidClass::new(0);
        hid.configure();
        Self {
            hid,
            endpoint: Capture::default(),
        }
    }

    fn step(&mut self, keyboard: &mut Keyboard<'_>, iteration: usize) -> Option<Event> {
        self.hid.usb_task(keyboard, &mut self.endpoint);
        self.hid.millisecond_elapsed();

        let bytes = self.endpoint.written.take()?;
        let report = KeyboardReport::from_bytes(&bytes)?;
        let indicators = keyboard
            .board()
            .indicators
            .iter()
            .zip(keyboard.indicators())
            .map(|(indicator, (_, level))| (indicator.label, level))
            .collect();
        Some(Event {
            iteration,
            report,
            indicators,
        })
    }
}

/// Multiplexer selectors of a board's touch channels, in channel order.
pub fn touch_muxes(board: &BoardConfig) -> Vec<u8> {
    board
        .inputs
        .iter()
        .filter_map(|input| match input.source {
            InputSource::Touch { mux } => Some(mux),
            InputSource::Switch { .. } => None,
        })
        .collect()
}

/// Replay recorded readings on a touch board. When `iterations` exceeds the
/// number of lines, playback wraps around to the first line.
pub fn run_touch(
    board: &BoardConfig,
    samples: &[SampleLine],
    iterations: usize,
    progress: &ProgressBar,
    mut on_event: impl FnMut(Event),
) -> Result<()> {
    let keys = KeyStates::new();
    let mut sampler = TouchSampler::default();
    let mut keyboard = Keyboard::new(board, &keys, Some(&mut sampler))
        .map_err(|e| anyhow!("board {}: {}", board.name, e))?;
    let mut adc = ReplayAdc::new(touch_muxes(board));
    let mut bridge = Bridge::new();

    for (index, line) in samples.iter().cycle().take(iterations).enumerate() {
        adc.load(line);
        if let Err(timeout) = keyboard.sample(&mut adc) {
            warn!("iteration {}: {}", index + 1, timeout);
        }
        if let Some(event) = bridge.step(&mut keyboard, index + 1) {
            on_event(event);
        }
        progress.inc(1);
    }

    Ok(())
}

/// Apply switch levels (`true` = released) through the edge handler, then
/// run the loop for `iterations`.
pub fn run_switches(
    board: &BoardConfig,
    levels: &[bool],
    iterations: usize,
    progress: &ProgressBar,
    mut on_event: impl FnMut(Event),
) -> Result<()> {
    let keys = KeyStates::new();
    let mut keyboard =
        Keyboard::new(board, &keys, None).map_err(|e| anyhow!("board {}: {}", board.name, e))?;

    // Start from every switch released, then deliver one edge per pressed switch.
    keyboard.prime(|_| PinLevel::High);
    for (input, &high) in board.inputs.iter().zip(levels) {
        if let InputSource::Switch { interrupt } = input.source {
            edge::on_external_interrupt(board, &keys, interrupt, |_| PinLevel::from_high(high));
        }
    }

    let mut bridge = Bridge::new();
    for iteration in 1..=iterations {
        if let Some(event) = bridge.step(&mut keyboard, iteration) {
            on_event(event);
        }
        progress.inc(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cck_core::board::{CCK_2M3_V1, CCK_2M3_V2, CCK_2T};

    fn collect_touch(samples: &[SampleLine], iterations: usize) -> Vec<Event> {
        let mut events = Vec::new();
        run_touch(&CCK_2T, samples, iterations, &ProgressBar::hidden(), |e| {
            events.push(e)
        })
        .unwrap();
        events
    }

    #[test]
    fn test_touch_muxes() {
        assert_eq!(touch_muxes(&CCK_2T), vec![0b00111, 0b00110]);
        assert!(touch_muxes(&CCK_2M3_V2).is_empty());
    }

    #[test]
    fn test_touch_pad_reports_after_history_fills() {
        let events = collect_touch(&[vec![Some(0), Some(255)]], 100);

        // Idle period: the empty report goes out on the first iteration.
        assert_eq!(events[0].iteration, 1);
        assert_eq!(events[0].report, KeyboardReport::empty());

        // 79 * 255 / 128 = 157 is the first mean above 155.
        assert_eq!(events[1].iteration, 79);
        assert_eq!(events[1].report.keys[0], 0x1B);
        assert_eq!(
            events[1].indicators,
            vec![("rx-led", PinLevel::High), ("tx-led", PinLevel::Low)]
        );
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_idle_repeats_report() {
        let events = collect_touch(&[vec![Some(10), Some(10)]], 1001);
        let iterations: Vec<usize> = events.iter().map(|e| e.iteration).collect();
        assert_eq!(iterations, vec![1, 501, 1001]);
    }

    #[test]
    fn test_stuck_conversion_keeps_running() {
        let events = collect_touch(&[vec![None, Some(255)]], 100);
        assert_eq!(events[1].iteration, 79);
        assert_eq!(events[1].report.keys[0], 0x1B);
    }

    #[test]
    fn test_switches_pressed() {
        let mut events = Vec::new();
        run_switches(
            &CCK_2M3_V1,
            &[false, true, false],
            1,
            &ProgressBar::hidden(),
            |e| events.push(e),
        )
        .unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].report.keys[..2], [0x1D, 0x2C]);
        // led1 = Z ^ Space = off, led2 = X ^ Space = on
        assert_eq!(
            events[0].indicators,
            vec![("led1", PinLevel::Low), ("led2", PinLevel::High)]
        );
    }

    #[test]
    fn test_touch_board_needs_sampler() {
        let result = run_switches(&CCK_2T, &[true, true], 1, &ProgressBar::hidden(), |_| {});
        assert!(result.is_err());
    }
}

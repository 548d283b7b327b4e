//! The keyboard as the HID class sees it.

use crate::board::{BoardConfig, InputSource, Pin};
use crate::compose::build_report;
use crate::edge::{on_edge, PinLevel};
use crate::error::{ConfigError, ConversionTimeout};
use crate::hid::{CreatedReport, HidReportHandler, ReportType};
use crate::keys::KeyStates;
use crate::report::{KeyboardReport, REPORT_SIZE};
use crate::status::indicator_levels;
use crate::touch::{ChargeTransfer, TouchSampler};

/// Main-loop side of the firmware: one board table, the shared key states
/// and, on touch boards, the sampler.
pub struct Keyboard<'a> {
    board: &'a BoardConfig,
    keys: &'a KeyStates,
    sampler: Option<&'a mut TouchSampler>,
}

impl<'a> Keyboard<'a> {
    pub fn new(
        board: &'a BoardConfig,
        keys: &'a KeyStates,
        sampler: Option<&'a mut TouchSampler>,
    ) -> Result<Self, ConfigError> {
        board.validate()?;
        if board.is_touch() && sampler.is_none() {
            return Err(ConfigError::MissingSampler);
        }
        Ok(Self {
            board,
            keys,
            sampler,
        })
    }

    pub fn board(&self) -> &'a BoardConfig {
        self.board
    }

    pub fn keys(&self) -> &'a KeyStates {
        self.keys
    }

    pub fn sampler(&self) -> Option<&TouchSampler> {
        self.sampler.as_deref()
    }

    /// Seed every switch from its current level, before edge interrupts are enabled.
    pub fn prime(&self, mut read_pin: impl FnMut(Pin) -> PinLevel) {
        for (index, input) in self.board.inputs.iter().enumerate() {
            if let InputSource::Switch { .. } = input.source {
                on_edge(self.keys, index, read_pin(input.pin));
            }
        }
    }

    /// Take one round of touch samples. Does nothing on switch boards.
    pub fn sample<F: ChargeTransfer>(&mut self, front_end: &mut F) -> Result<(), ConversionTimeout> {
        match self.sampler.as_deref_mut() {
            Some(sampler) => sampler.sample(self.board, front_end),
            None => Ok(()),
        }
    }

    /// Current level of every indicator pin.
    pub fn indicators(&self) -> impl Iterator<Item = (Pin, PinLevel)> + 'a {
        indicator_levels(self.board, self.keys)
    }
}

impl HidReportHandler for Keyboard<'_> {
    fn create_report(
        &mut self,
        _report_id: &mut u8,
        _report_type: ReportType,
        data: &mut [u8],
    ) -> CreatedReport {
        if let Some(sampler) = self.sampler.as_deref() {
            sampler.decide(self.board, self.keys);
        }

        let mut report = KeyboardReport::empty();
        build_report(self.board, self.keys, &mut report);

        let size = REPORT_SIZE.min(data.len());
        data[..size].copy_from_slice(&report.to_bytes()[..size]);
        CreatedReport {
            size,
            force_send: false,
        }
    }

    /// Lock-key LEDs from the host ([`LedReport`](crate::report::LedReport) bits)
    /// are not shown on any board.
    fn process_report(&mut self, _report_id: u8, _report_type: ReportType, _data: &[u8]) {}
}

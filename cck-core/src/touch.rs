//! Capacitive charge-transfer sampling.
//!
//! Once per main-loop iteration every touch pad is charged, the ADC's
//! sample-and-hold capacitor is drained, the pad is released and its charge
//! is shared with the sampling capacitor and converted. A finger adds
//! capacitance, so a touched pad reads higher. Each reading goes into a
//! per-channel ring of the last [`HISTORY_LEN`] samples; the decision is the
//! integer mean of that ring compared against the board's threshold.
//!
//! Until the ring has been filled once, the unwritten slots count as zero,
//! so a pad cannot read as touched during the first iterations.

use log::warn;

use crate::board::{BoardConfig, InputSource, Pin, Sensing};
use crate::error::ConversionTimeout;
use crate::keys::KeyStates;

/// Samples averaged per channel.
pub const HISTORY_LEN: usize = 128;

/// Number of touch channels the sampler holds history for.
pub const MAX_CHANNELS: usize = 2;

/// Polls of the conversion-complete flag before giving up on a channel.
/// An ADC conversion at a /128 prescaler takes 13 ADC clocks, far below this.
pub const DEFAULT_CONVERSION_POLLS: u16 = 10_000;

/// ADC front-end operations used by one charge-transfer measurement.
pub trait ChargeTransfer {
    /// Drive the pad high to charge it.
    fn charge(&mut self, pin: Pin);
    /// Point the multiplexer at ground and wait for the sampling capacitor to drain.
    fn discharge_sampler(&mut self);
    /// Tri-state the pad.
    fn release(&mut self, pin: Pin);
    /// Connect the sampling capacitor to `mux` and start a conversion.
    fn start_conversion(&mut self, mux: u8);
    fn conversion_done(&mut self) -> bool;
    /// 8-bit (left-adjusted high byte) conversion result.
    fn result(&mut self) -> u8;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConversionWait {
    /// Give up after this many polls of the conversion-complete flag.
    Bounded(u16),
    /// Spin until the hardware completes.
    Unbounded,
}

impl Default for ConversionWait {
    fn default() -> Self {
        ConversionWait::Bounded(DEFAULT_CONVERSION_POLLS)
    }
}

/// Rolling sample rings sharing one write cursor.
pub struct SampleHistory {
    samples: [[u8; HISTORY_LEN]; MAX_CHANNELS],
    cursor: usize,
}

impl SampleHistory {
    pub const fn new() -> Self {
        Self {
            samples: [[0; HISTORY_LEN]; MAX_CHANNELS],
            cursor: 0,
        }
    }

    /// Store `value` for `channel` at the current cursor.
    pub fn record(&mut self, channel: usize, value: u8) {
        if let Some(ring) = self.samples.get_mut(channel) {
            ring[self.cursor] = value;
        }
    }

    /// Move the cursor on once every channel has been recorded.
    pub fn advance(&mut self) {
        self.cursor = (self.cursor + 1) % HISTORY_LEN;
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// The ring of `channel`, or `None` past [`MAX_CHANNELS`].
    pub fn samples(&self, channel: usize) -> Option<&[u8; HISTORY_LEN]> {
        self.samples.get(channel)
    }

    /// Truncating mean over the full ring.
    pub fn mean(&self, channel: usize) -> Option<u8> {
        let ring = self.samples.get(channel)?;
        let sum: u32 = ring.iter().map(|&s| s as u32).sum();
        Some((sum / HISTORY_LEN as u32) as u8)
    }
}

impl Default for SampleHistory {
    fn default() -> Self {
        Self::new()
    }
}

pub struct TouchSampler {
    history: SampleHistory,
    wait: ConversionWait,
}

impl TouchSampler {
    pub const fn new(wait: ConversionWait) -> Self {
        Self {
            history: SampleHistory::new(),
            wait,
        }
    }

    pub fn history(&self) -> &SampleHistory {
        &self.history
    }

    /// Measure every touch channel once and advance the ring.
    ///
    /// A channel whose conversion times out keeps its previous sample in
    /// this slot; the remaining channels are still measured.
    pub fn sample<F: ChargeTransfer>(
        &mut self,
        board: &BoardConfig,
        front_end: &mut F,
    ) -> Result<(), ConversionTimeout> {
        let mut outcome = Ok(());

        for (channel, (pin, mux)) in touch_channels(board).enumerate() {
            match measure(front_end, pin, mux, self.wait) {
                Some(value) => self.history.record(channel, value),
                None => {
                    warn!("touch channel {} conversion timed out", channel);
                    if outcome.is_ok() {
                        outcome = Err(ConversionTimeout { channel });
                    }
                }
            }
        }

        self.history.advance();
        outcome
    }

    /// Compare every channel's mean against the threshold and store the decisions.
    pub fn decide(&self, board: &BoardConfig, keys: &KeyStates) {
        let Sensing::Touch { threshold } = board.sensing else {
            return;
        };
        for (channel, _) in touch_channels(board).enumerate() {
            if let Some(mean) = self.history.mean(channel) {
                keys.set(channel, mean > threshold);
            }
        }
    }
}

impl Default for TouchSampler {
    fn default() -> Self {
        Self::new(ConversionWait::default())
    }
}

fn touch_channels(board: &BoardConfig) -> impl Iterator<Item = (Pin, u8)> + '_ {
    board
        .inputs
        .iter()
        .filter_map(|input| match input.source {
            InputSource::Touch { mux } => Some((input.pin, mux)),
            InputSource::Switch { .. } => None,
        })
        .take(MAX_CHANNELS)
}

fn measure<F: ChargeTransfer>(front_end: &mut F, pin: Pin, mux: u8, wait: ConversionWait) -> Option<u8> {
    front_end.charge(pin);
    front_end.discharge_sampler();
    front_end.release(pin);
    front_end.start_conversion(mux);

    match wait {
        ConversionWait::Unbounded => while !front_end.conversion_done() {},
        ConversionWait::Bounded(polls) => {
            let mut remaining = polls;
            loop {
                if remaining == 0 {
                    return None;
                }
                remaining -= 1;
                if front_end.conversion_done() {
                    break;
                }
            }
        }
    }

    Some(front_end.result())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::CCK_2T;

    /// Returns scripted readings per mux selector, and can refuse to finish.
    struct FakeAdc {
        readings: [u8; 2],
        mux: u8,
        stuck: bool,
        /// Polls that report busy before each conversion completes.
        busy_polls: u32,
        polls: u32,
        log: Vec<&'static str>,
    }

    impl FakeAdc {
        fn new(pad0: u8, pad1: u8) -> Self {
            Self {
                readings: [pad0, pad1],
                mux: 0,
                stuck: false,
                busy_polls: 0,
                polls: 0,
                log: Vec::new(),
            }
        }
    }

    impl ChargeTransfer for FakeAdc {
        fn charge(&mut self, _pin: Pin) {
            self.log.push("charge");
        }
        fn discharge_sampler(&mut self) {
            self.log.push("discharge");
        }
        fn release(&mut self, _pin: Pin) {
            self.log.push("release");
        }
        fn start_conversion(&mut self, mux: u8) {
            self.log.push("convert");
            self.mux = mux;
            self.polls = 0;
        }
        fn conversion_done(&mut self) -> bool {
            self.polls += 1;
            !self.stuck && self.polls > self.busy_polls
        }
        fn result(&mut self) -> u8 {
            match self.mux {
                0b0_0111 => self.readings[0],
                _ => self.readings[1],
            }
        }
    }

    #[test]
    fn test_measurement_sequence() {
        let mut sampler = TouchSampler::default();
        let mut adc = FakeAdc::new(10, 20);
        sampler.sample(&CCK_2T, &mut adc).unwrap();
        assert_eq!(
            adc.log,
            vec![
                "charge", "discharge", "release", "convert", "charge", "discharge", "release",
                "convert"
            ]
        );
        assert_eq!(sampler.history().samples(0).unwrap()[0], 10);
        assert_eq!(sampler.history().samples(1).unwrap()[0], 20);
        assert_eq!(sampler.history().cursor(), 1);
    }

    #[test]
    fn test_ring_keeps_last_samples() {
        let mut history = SampleHistory::new();
        let extra = 37;
        for n in 0..HISTORY_LEN + extra {
            history.record(0, n as u8);
            history.advance();
        }
        assert_eq!(history.cursor(), extra);
        let ring = history.samples(0).unwrap();
        // Oldest surviving sample sits at the cursor.
        for age in 0..HISTORY_LEN {
            let slot = (history.cursor() + age) % HISTORY_LEN;
            assert_eq!(ring[slot], (extra + age) as u8);
        }
    }

    #[test]
    fn test_mean_truncates() {
        let mut history = SampleHistory::new();
        history.record(0, 255);
        // 255 / 128 = 1.99
        assert_eq!(history.mean(0), Some(1));
        for _ in 0..HISTORY_LEN {
            history.record(1, 200);
            history.advance();
        }
        assert_eq!(history.mean(1), Some(200));
    }

    #[test]
    fn test_threshold_is_strict() {
        let keys = KeyStates::new();
        let mut sampler = TouchSampler::default();
        let mut adc = FakeAdc::new(155, 156);
        for _ in 0..HISTORY_LEN {
            sampler.sample(&CCK_2T, &mut adc).unwrap();
        }
        sampler.decide(&CCK_2T, &keys);
        assert!(!keys.get(0));
        assert!(keys.get(1));
    }

    #[test]
    fn test_decision_follows_mean() {
        let keys = KeyStates::new();
        let mut sampler = TouchSampler::default();
        let mut adc = FakeAdc::new(40, 40);
        for _ in 0..HISTORY_LEN {
            sampler.sample(&CCK_2T, &mut adc).unwrap();
        }
        sampler.decide(&CCK_2T, &keys);
        assert!(!keys.get(0));

        adc.readings = [240, 40];
        let mut flipped_after = None;
        for n in 1..=HISTORY_LEN {
            sampler.sample(&CCK_2T, &mut adc).unwrap();
            sampler.decide(&CCK_2T, &keys);
            if keys.get(0) {
                flipped_after = Some(n);
                break;
            }
        }
        // (40 * (128 - n) + 240 * n) / 128 first exceeds 155 at n = 75
        assert_eq!(flipped_after, Some(75));

        adc.readings = [0, 40];
        for _ in 0..HISTORY_LEN {
            sampler.sample(&CCK_2T, &mut adc).unwrap();
        }
        sampler.decide(&CCK_2T, &keys);
        assert!(!keys.get(0));
    }

    #[test]
    fn test_bounded_wait_times_out() {
        let mut sampler = TouchSampler::new(ConversionWait::Bounded(3));
        let mut adc = FakeAdc::new(99, 99);
        sampler.sample(&CCK_2T, &mut adc).unwrap();

        adc.stuck = true;
        let err = sampler.sample(&CCK_2T, &mut adc).unwrap_err();
        assert_eq!(err, ConversionTimeout { channel: 0 });
        assert_eq!(sampler.history().cursor(), 2);
        // Slot 1 was never written.
        assert_eq!(sampler.history().samples(0).unwrap()[1], 0);
        assert_eq!(sampler.history().samples(0).unwrap()[0], 99);
    }

    #[test]
    fn test_bounded_wait_counts_polls() {
        let mut sampler = TouchSampler::new(ConversionWait::Bounded(3));
        let mut adc = FakeAdc::new(70, 80);

        // Done on the third poll: in time.
        adc.busy_polls = 2;
        assert_eq!(sampler.sample(&CCK_2T, &mut adc), Ok(()));
        assert_eq!(sampler.history().samples(0).unwrap()[0], 70);
        assert_eq!(sampler.history().samples(1).unwrap()[0], 80);

        // Done on the fourth poll: too late.
        adc.busy_polls = 3;
        assert_eq!(
            sampler.sample(&CCK_2T, &mut adc),
            Err(ConversionTimeout { channel: 0 })
        );
        assert_eq!(adc.polls, 3);
        assert_eq!(sampler.history().samples(0).unwrap()[1], 0);
    }

    #[test]
    fn test_unbounded_wait_records_slow_conversion() {
        let mut sampler = TouchSampler::new(ConversionWait::Unbounded);
        let mut adc = FakeAdc::new(123, 45);
        adc.busy_polls = 20_000;
        assert_eq!(sampler.sample(&CCK_2T, &mut adc), Ok(()));
        assert_eq!(adc.polls, 20_001);
        assert_eq!(sampler.history().samples(0).unwrap()[0], 123);
        assert_eq!(sampler.history().samples(1).unwrap()[0], 45);
        assert_eq!(sampler.history().cursor(), 1);
    }

    #[test]
    fn test_history_out_of_range_channel() {
        let mut history = SampleHistory::new();
        history.record(MAX_CHANNELS, 200);
        assert!(history.samples(MAX_CHANNELS).is_none());
        assert_eq!(history.mean(MAX_CHANNELS), None);
    }

    #[test]
    fn test_mechanical_board_has_no_channels() {
        let keys = KeyStates::new();
        keys.set(0, true);
        let mut sampler = TouchSampler::default();
        let mut adc = FakeAdc::new(255, 255);
        sampler.sample(&crate::board::CCK_2M3_V1, &mut adc).unwrap();
        sampler.decide(&crate::board::CCK_2M3_V1, &keys);
        assert!(adc.log.is_empty());
        assert!(keys.get(0));
    }
}

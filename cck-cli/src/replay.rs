use anyhow::{bail, Context, Result};

use cck_core::board::Pin;
use cck_core::touch::ChargeTransfer;

/// One main-loop iteration's worth of readings, one per touch channel.
/// `None` marks a conversion that never completes.
pub type SampleLine = Vec<Option<u8>>;

/// Parse a recorded sample file.
///
/// Format:
/// - one line per loop iteration
/// - whitespace-separated 8-bit readings, one per touch channel, in board order
/// - `-` for a conversion that never completes
/// - `#` starts a comment; blank lines are skipped
pub fn parse_samples(input: &str, channels: usize) -> Result<Vec<SampleLine>> {
    let mut lines = Vec::new();

    for (line_num, line) in input.lines().enumerate() {
        let line = match line.find('#') {
            Some(pos) => &line[..pos],
            None => line,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let values = line
            .split_whitespace()
            .map(|field| {
                if field == "-" {
                    return Ok(None);
                }
                field
                    .parse::<u8>()
                    .map(Some)
                    .with_context(|| format!("line {}: invalid reading '{}'", line_num + 1, field))
            })
            .collect::<Result<SampleLine>>()?;

        if values.len() != channels {
            bail!(
                "line {}: expected {} readings, got {}",
                line_num + 1,
                channels,
                values.len()
            );
        }
        lines.push(values);
    }

    if lines.is_empty() {
        bail!("no samples in file");
    }
    Ok(lines)
}

/// Parse active-low switch levels given as a string of `0`/`1`, one per input.
pub fn parse_levels(input: &str, inputs: usize) -> Result<Vec<bool>> {
    let levels = input
        .chars()
        .map(|c| match c {
            '0' => Ok(false),
            '1' => Ok(true),
            other => bail!("invalid level '{}': use 0 (pressed) or 1 (released)", other),
        })
        .collect::<Result<Vec<bool>>>()?;

    if levels.len() != inputs {
        bail!("expected {} levels, got {}", inputs, levels.len());
    }
    Ok(levels)
}

/// Charge-transfer front-end that plays back recorded readings.
///
/// The multiplexer selector passed to `start_conversion` is matched against
/// the board's touch channels to pick the reading.
pub struct ReplayAdc {
    muxes: Vec<u8>,
    line: SampleLine,
    selected: Option<usize>,
}

impl ReplayAdc {
    pub fn new(muxes: Vec<u8>) -> Self {
        Self {
            muxes,
            line: Vec::new(),
            selected: None,
        }
    }

    /// Readings for the next sampling round.
    pub fn load(&mut self, line: &SampleLine) {
        self.line.clone_from(line);
    }

    fn reading(&self) -> Option<u8> {
        self.selected
            .and_then(|channel| self.line.get(channel).copied())
            .flatten()
    }
}

impl ChargeTransfer for ReplayAdc {
    fn charge(&mut self, _pin: Pin) {}

    fn discharge_sampler(&mut self) {
        self.selected = None;
    }

    fn release(&mut self, _pin: Pin) {}

    fn start_conversion(&mut self, mux: u8) {
        self.selected = self.muxes.iter().position(|&m| m == mux);
    }

    fn conversion_done(&mut self) -> bool {
        self.reading().is_some()
    }

    fn result(&mut self) -> u8 {
        self.reading().unwrap_or(0)
    }
}

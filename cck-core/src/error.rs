use core::fmt;

/// A board table the core cannot drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    TooManyInputs { count: usize },
    TooManyChannels { count: usize },
    /// An input's source does not match the board's sensing mode.
    MixedSources { input: usize },
    DuplicateInterrupt { line: u8 },
    UnknownInput { indicator: usize, input: usize },
    /// Touch boards need a sampler to aggregate.
    MissingSampler,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::TooManyInputs { count } => {
                write!(f, "{} inputs configured, at most {} supported", count, crate::keys::MAX_KEYS)
            }
            ConfigError::TooManyChannels { count } => write!(
                f,
                "{} touch channels configured, at most {} supported",
                count,
                crate::touch::MAX_CHANNELS
            ),
            ConfigError::MixedSources { input } => {
                write!(f, "input {} does not match the board's sensing mode", input)
            }
            ConfigError::DuplicateInterrupt { line } => {
                write!(f, "INT{} is assigned to more than one switch", line)
            }
            ConfigError::UnknownInput { indicator, input } => {
                write!(f, "indicator {} references missing input {}", indicator, input)
            }
            ConfigError::MissingSampler => write!(f, "touch board configured without a sampler"),
        }
    }
}

/// The ADC never signalled conversion complete for `channel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionTimeout {
    pub channel: usize,
}

impl fmt::Display for ConversionTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ADC conversion timed out on touch channel {}", self.channel)
    }
}

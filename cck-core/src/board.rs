//! Board variant tables.
//!
//! Each CCK board is described by a [`BoardConfig`]: which pins carry
//! inputs, how they are sensed, which keycode each input reports and how
//! the indicator LEDs are derived from the inputs. The firmware picks one
//! table at build time and passes it into the core at startup.

use crate::error::ConfigError;
use crate::keycode::Keycode;
use crate::keys::MAX_KEYS;
use crate::touch::MAX_CHANNELS;

/// GPIO port of the AVR.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Port {
    B,
    C,
    D,
    E,
    F,
}

impl Port {
    pub fn name(self) -> char {
        match self {
            Port::B => 'B',
            Port::C => 'C',
            Port::D => 'D',
            Port::E => 'E',
            Port::F => 'F',
        }
    }
}

/// A single port pin, e.g. PC7.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Pin {
    pub port: Port,
    pub bit: u8,
}

impl Pin {
    pub const fn new(port: Port, bit: u8) -> Self {
        Self { port, bit }
    }

    pub fn mask(self) -> u8 {
        1 << self.bit
    }
}

/// External interrupt line (INTn).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExtInt {
    Int0,
    Int1,
    Int2,
    Int3,
    Int4,
    Int5,
    Int6,
    Int7,
}

impl ExtInt {
    pub fn line(self) -> u8 {
        self as u8
    }
}

/// How an input is sensed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InputSource {
    /// Active-low mechanical switch with pull-up, edge interrupt on any change.
    Switch { interrupt: ExtInt },
    /// Capacitive pad read through the ADC multiplexer selector `mux`.
    Touch { mux: u8 },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct InputConfig {
    pub label: &'static str,
    pub pin: Pin,
    pub keycode: Keycode,
    pub source: InputSource,
}

/// Indicator output: `(OR of sources) XOR mode`, then inverted if the LED is active-low.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct IndicatorConfig {
    pub label: &'static str,
    pub pin: Pin,
    pub sources: &'static [usize],
    pub mode: Option<usize>,
    pub active_low: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Sensing {
    Mechanical,
    /// Touch channels report active while their rolling mean exceeds `threshold`.
    Touch { threshold: u8 },
}

#[derive(Debug, PartialEq, Eq)]
pub struct BoardConfig {
    pub name: &'static str,
    pub sensing: Sensing,
    pub inputs: &'static [InputConfig],
    pub indicators: &'static [IndicatorConfig],
}

impl BoardConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.inputs.len() > MAX_KEYS {
            return Err(ConfigError::TooManyInputs {
                count: self.inputs.len(),
            });
        }

        let mut channels = 0;
        for (index, input) in self.inputs.iter().enumerate() {
            match (self.sensing, input.source) {
                (Sensing::Mechanical, InputSource::Switch { interrupt }) => {
                    let duplicate = self.inputs[..index].iter().any(|other| {
                        other.source == InputSource::Switch { interrupt }
                    });
                    if duplicate {
                        return Err(ConfigError::DuplicateInterrupt { line: interrupt.line() });
                    }
                }
                (Sensing::Touch { .. }, InputSource::Touch { .. }) => channels += 1,
                _ => return Err(ConfigError::MixedSources { input: index }),
            }
        }
        if channels > MAX_CHANNELS {
            return Err(ConfigError::TooManyChannels { count: channels });
        }

        for (indicator, ind) in self.indicators.iter().enumerate() {
            let referenced = ind.sources.iter().copied().chain(ind.mode);
            for input in referenced {
                if input >= self.inputs.len() {
                    return Err(ConfigError::UnknownInput { indicator, input });
                }
            }
        }

        Ok(())
    }

    /// Find the switch wired to an external interrupt line.
    pub fn switch_for(&self, interrupt: ExtInt) -> Option<(usize, &InputConfig)> {
        self.inputs
            .iter()
            .enumerate()
            .find(|(_, input)| input.source == InputSource::Switch { interrupt })
    }

    pub fn is_touch(&self) -> bool {
        matches!(self.sensing, Sensing::Touch { .. })
    }
}

/// Two mech switches and a side switch, ATmega32U2.
pub static CCK_2M3_V1: BoardConfig = BoardConfig {
    name: "cck-2m3-v1",
    sensing: Sensing::Mechanical,
    inputs: &[
        InputConfig {
            label: "left",
            pin: Pin::new(Port::C, 7),
            keycode: Keycode::Z,
            source: InputSource::Switch { interrupt: ExtInt::Int4 },
        },
        InputConfig {
            label: "right",
            pin: Pin::new(Port::D, 2),
            keycode: Keycode::X,
            source: InputSource::Switch { interrupt: ExtInt::Int2 },
        },
        InputConfig {
            label: "side",
            pin: Pin::new(Port::D, 1),
            keycode: Keycode::Space,
            source: InputSource::Switch { interrupt: ExtInt::Int1 },
        },
    ],
    indicators: &[
        IndicatorConfig {
            label: "led1",
            pin: Pin::new(Port::C, 5),
            sources: &[0],
            mode: Some(2),
            active_low: false,
        },
        IndicatorConfig {
            label: "led2",
            pin: Pin::new(Port::D, 0),
            sources: &[1],
            mode: Some(2),
            active_low: false,
        },
    ],
};

/// Revision 2 adds two top switches that share the LEDs with the mech switches.
pub static CCK_2M3_V2: BoardConfig = BoardConfig {
    name: "cck-2m3-v2",
    sensing: Sensing::Mechanical,
    inputs: &[
        InputConfig {
            label: "left",
            pin: Pin::new(Port::C, 7),
            keycode: Keycode::Z,
            source: InputSource::Switch { interrupt: ExtInt::Int4 },
        },
        InputConfig {
            label: "right",
            pin: Pin::new(Port::D, 3),
            keycode: Keycode::X,
            source: InputSource::Switch { interrupt: ExtInt::Int3 },
        },
        InputConfig {
            label: "side",
            pin: Pin::new(Port::D, 6),
            keycode: Keycode::Space,
            source: InputSource::Switch { interrupt: ExtInt::Int6 },
        },
        InputConfig {
            label: "top-left",
            pin: Pin::new(Port::D, 0),
            keycode: Keycode::Escape,
            source: InputSource::Switch { interrupt: ExtInt::Int0 },
        },
        InputConfig {
            label: "top-right",
            pin: Pin::new(Port::D, 1),
            keycode: Keycode::Tab,
            source: InputSource::Switch { interrupt: ExtInt::Int1 },
        },
    ],
    indicators: &[
        IndicatorConfig {
            label: "led1",
            pin: Pin::new(Port::C, 5),
            sources: &[0, 3],
            mode: Some(2),
            active_low: false,
        },
        IndicatorConfig {
            label: "led2",
            pin: Pin::new(Port::C, 6),
            sources: &[1, 4],
            mode: Some(2),
            active_low: false,
        },
    ],
};

/// Two capacitive pads on ADC7/ADC6 of an ATmega32U4 (Pro Micro RX/TX LEDs as indicators).
pub static CCK_2T: BoardConfig = BoardConfig {
    name: "cck-2t",
    sensing: Sensing::Touch { threshold: 155 },
    inputs: &[
        InputConfig {
            label: "pad0",
            pin: Pin::new(Port::F, 7),
            keycode: Keycode::Z,
            source: InputSource::Touch { mux: 0b0_0111 },
        },
        InputConfig {
            label: "pad1",
            pin: Pin::new(Port::F, 6),
            keycode: Keycode::X,
            source: InputSource::Touch { mux: 0b0_0110 },
        },
    ],
    indicators: &[
        IndicatorConfig {
            label: "rx-led",
            pin: Pin::new(Port::B, 0),
            sources: &[0],
            mode: None,
            active_low: true,
        },
        IndicatorConfig {
            label: "tx-led",
            pin: Pin::new(Port::D, 5),
            sources: &[1],
            mode: None,
            active_low: true,
        },
    ],
};

pub static ALL: [&BoardConfig; 3] = [&CCK_2M3_V1, &CCK_2M3_V2, &CCK_2T];

pub fn by_name(name: &str) -> Option<&'static BoardConfig> {
    ALL.iter().copied().find(|board| board.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_boards_validate() {
        for board in ALL {
            assert_eq!(board.validate(), Ok(()), "{}", board.name);
        }
    }

    #[test]
    fn test_by_name() {
        assert_eq!(by_name("cck-2t").map(|b| b.name), Some("cck-2t"));
        assert!(by_name("cck-9x").is_none());
    }

    #[test]
    fn test_switch_for_interrupt() {
        let (index, input) = CCK_2M3_V2.switch_for(ExtInt::Int6).unwrap();
        assert_eq!(index, 2);
        assert_eq!(input.label, "side");
        assert!(CCK_2M3_V2.switch_for(ExtInt::Int2).is_none());
        assert!(CCK_2T.switch_for(ExtInt::Int0).is_none());
    }

    #[test]
    fn test_rejects_mixed_sources() {
        static BAD: BoardConfig = BoardConfig {
            name: "bad",
            sensing: Sensing::Touch { threshold: 100 },
            inputs: &[InputConfig {
                label: "sw",
                pin: Pin::new(Port::D, 0),
                keycode: Keycode::A,
                source: InputSource::Switch { interrupt: ExtInt::Int0 },
            }],
            indicators: &[],
        };
        assert_eq!(BAD.validate(), Err(ConfigError::MixedSources { input: 0 }));
    }

    #[test]
    fn test_rejects_duplicate_interrupt() {
        static BAD: BoardConfig = BoardConfig {
            name: "bad",
            sensing: Sensing::Mechanical,
            inputs: &[
                InputConfig {
                    label: "a",
                    pin: Pin::new(Port::D, 0),
                    keycode: Keycode::A,
                    source: InputSource::Switch { interrupt: ExtInt::Int0 },
                },
                InputConfig {
                    label: "b",
                    pin: Pin::new(Port::D, 1),
                    keycode: Keycode::B,
                    source: InputSource::Switch { interrupt: ExtInt::Int0 },
                },
            ],
            indicators: &[],
        };
        assert_eq!(BAD.validate(), Err(ConfigError::DuplicateInterrupt { line: 0 }));
    }

    const fn switch(bit: u8, interrupt: ExtInt) -> InputConfig {
        InputConfig {
            label: "sw",
            pin: Pin::new(Port::D, bit),
            keycode: Keycode::A,
            source: InputSource::Switch { interrupt },
        }
    }

    const fn pad(bit: u8) -> InputConfig {
        InputConfig {
            label: "pad",
            pin: Pin::new(Port::F, bit),
            keycode: Keycode::A,
            source: InputSource::Touch { mux: bit },
        }
    }

    #[test]
    fn test_rejects_too_many_inputs() {
        static BAD: BoardConfig = BoardConfig {
            name: "bad",
            sensing: Sensing::Mechanical,
            inputs: &[
                switch(0, ExtInt::Int0),
                switch(1, ExtInt::Int1),
                switch(2, ExtInt::Int2),
                switch(3, ExtInt::Int3),
                switch(4, ExtInt::Int4),
                switch(5, ExtInt::Int5),
                switch(6, ExtInt::Int6),
                switch(7, ExtInt::Int7),
                switch(7, ExtInt::Int7),
            ],
            indicators: &[],
        };
        assert_eq!(BAD.validate(), Err(ConfigError::TooManyInputs { count: 9 }));
    }

    #[test]
    fn test_rejects_too_many_channels() {
        static BAD: BoardConfig = BoardConfig {
            name: "bad",
            sensing: Sensing::Touch { threshold: 155 },
            inputs: &[pad(7), pad(6), pad(5)],
            indicators: &[],
        };
        assert_eq!(BAD.validate(), Err(ConfigError::TooManyChannels { count: 3 }));
    }

    #[test]
    fn test_rejects_dangling_indicator() {
        static BAD: BoardConfig = BoardConfig {
            name: "bad",
            sensing: Sensing::Mechanical,
            inputs: &[],
            indicators: &[IndicatorConfig {
                label: "led",
                pin: Pin::new(Port::C, 5),
                sources: &[],
                mode: Some(3),
                active_low: false,
            }],
        };
        assert_eq!(
            BAD.validate(),
            Err(ConfigError::UnknownInput { indicator: 0, input: 3 })
        );
    }
}

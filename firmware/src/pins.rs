//! GPIO access by board-table pin.
//!
//! The board tables name pins as (port, bit); this module turns them into
//! register accesses on whichever chip the firmware is built for.

use cck_core::board::{BoardConfig, InputSource, Pin, Port};
use cck_core::PinLevel;

use crate::chip::Peripherals;

/// Run `$body` with the PORTx, DDRx and PINx registers of `$port` bound.
macro_rules! with_port {
    ($dp:expr, $port:expr, |$out:ident, $ddr:ident, $inp:ident| $body:expr) => {
        match $port {
            Port::B => {
                let ($out, $ddr, $inp) = (&$dp.PORTB.portb, &$dp.PORTB.ddrb, &$dp.PORTB.pinb);
                $body
            }
            Port::C => {
                let ($out, $ddr, $inp) = (&$dp.PORTC.portc, &$dp.PORTC.ddrc, &$dp.PORTC.pinc);
                $body
            }
            Port::D => {
                let ($out, $ddr, $inp) = (&$dp.PORTD.portd, &$dp.PORTD.ddrd, &$dp.PORTD.pind);
                $body
            }
            #[cfg(feature = "atmega32u4")]
            Port::E => {
                let ($out, $ddr, $inp) = (&$dp.PORTE.porte, &$dp.PORTE.ddre, &$dp.PORTE.pine);
                $body
            }
            #[cfg(feature = "atmega32u4")]
            Port::F => {
                let ($out, $ddr, $inp) = (&$dp.PORTF.portf, &$dp.PORTF.ddrf, &$dp.PORTF.pinf);
                $body
            }
            // Ports this chip does not have.
            #[allow(unreachable_patterns)]
            _ => Default::default(),
        }
    };
}

pub fn read(dp: &Peripherals, pin: Pin) -> PinLevel {
    let bits: u8 = with_port!(dp, pin.port, |_out, _ddr, inp| inp.read().bits());
    PinLevel::from_high(bits & pin.mask() != 0)
}

/// Drive an output, or switch the pull-up of an input.
pub fn write(dp: &Peripherals, pin: Pin, level: PinLevel) {
    let mask = pin.mask();
    with_port!(dp, pin.port, |out, _ddr, _inp| out.modify(|r, w| unsafe {
        match level {
            PinLevel::High => w.bits(r.bits() | mask),
            PinLevel::Low => w.bits(r.bits() & !mask),
        }
    }))
}

fn set_output(dp: &Peripherals, pin: Pin, output: bool) {
    let mask = pin.mask();
    with_port!(dp, pin.port, |_out, ddr, _inp| ddr.modify(|r, w| unsafe {
        if output {
            w.bits(r.bits() | mask)
        } else {
            w.bits(r.bits() & !mask)
        }
    }))
}

/// Configure every pin the board table uses.
///
/// Switches: input with pull-up. Touch pads: floating input. Indicators: output.
pub fn init(dp: &Peripherals, board: &BoardConfig) {
    for input in board.inputs {
        set_output(dp, input.pin, false);
        let level = match input.source {
            InputSource::Switch { .. } => PinLevel::High,
            InputSource::Touch { .. } => PinLevel::Low,
        };
        write(dp, input.pin, level);
    }

    for indicator in board.indicators {
        set_output(dp, indicator.pin, true);
    }
}

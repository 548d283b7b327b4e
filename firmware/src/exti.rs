//! External interrupts for the switch inputs.
//!
//! Every switch line triggers on any edge. The service routine samples the
//! switch's pin and stores the result in its key-state slot; it is the only
//! writer of that slot.

use cck_core::board::{BoardConfig, ExtInt, InputSource};
use cck_core::edge;

use crate::chip::Peripherals;
use crate::{pins, BOARD, KEYS};

/// ISCn1:ISCn0 = 01, any logical change.
const ANY_EDGE: u8 = 0b01;

/// Set every switch line of `board` to any-edge sensing and unmask it.
pub fn enable(dp: &Peripherals, board: &BoardConfig) {
    let mut eicra = 0u8;
    let mut eicrb = 0u8;
    let mut eimsk = 0u8;

    for input in board.inputs {
        if let InputSource::Switch { interrupt } = input.source {
            let line = interrupt.line();
            if line < 4 {
                eicra |= ANY_EDGE << (2 * line);
            } else {
                eicrb |= ANY_EDGE << (2 * (line - 4));
            }
            eimsk |= 1 << line;
        }
    }

    dp.EXINT.eicra.modify(|r, w| unsafe { w.bits(r.bits() | eicra) });
    dp.EXINT.eicrb.modify(|r, w| unsafe { w.bits(r.bits() | eicrb) });
    dp.EXINT.eimsk.modify(|r, w| unsafe { w.bits(r.bits() | eimsk) });
}

fn on_edge(interrupt: ExtInt) {
    let dp = unsafe { Peripherals::steal() };
    edge::on_external_interrupt(BOARD, &KEYS, interrupt, |pin| pins::read(&dp, pin));
}

#[cfg_attr(feature = "atmega32u2", avr_device::interrupt(atmega32u2))]
#[cfg_attr(feature = "atmega32u4", avr_device::interrupt(atmega32u4))]
fn INT0() {
    on_edge(ExtInt::Int0);
}

#[cfg_attr(feature = "atmega32u2", avr_device::interrupt(atmega32u2))]
#[cfg_attr(feature = "atmega32u4", avr_device::interrupt(atmega32u4))]
fn INT1() {
    on_edge(ExtInt::Int1);
}

#[cfg_attr(feature = "atmega32u2", avr_device::interrupt(atmega32u2))]
#[cfg_attr(feature = "atmega32u4", avr_device::interrupt(atmega32u4))]
fn INT2() {
    on_edge(ExtInt::Int2);
}

#[cfg_attr(feature = "atmega32u2", avr_device::interrupt(atmega32u2))]
#[cfg_attr(feature = "atmega32u4", avr_device::interrupt(atmega32u4))]
fn INT3() {
    on_edge(ExtInt::Int3);
}

// INT4, INT5 and INT7 only exist on the U2 parts.
#[cfg(feature = "atmega32u2")]
#[avr_device::interrupt(atmega32u2)]
fn INT4() {
    on_edge(ExtInt::Int4);
}

#[cfg(feature = "atmega32u2")]
#[avr_device::interrupt(atmega32u2)]
fn INT5() {
    on_edge(ExtInt::Int5);
}

#[cfg_attr(feature = "atmega32u2", avr_device::interrupt(atmega32u2))]
#[cfg_attr(feature = "atmega32u4", avr_device::interrupt(atmega32u4))]
fn INT6() {
    on_edge(ExtInt::Int6);
}

#[cfg(feature = "atmega32u2")]
#[avr_device::interrupt(atmega32u2)]
fn INT7() {
    on_edge(ExtInt::Int7);
}

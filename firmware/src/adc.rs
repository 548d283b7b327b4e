//! Charge-transfer front-end on the ATmega32U4 ADC.
//!
//! The pad is charged through the port's internal pull-up rather than by
//! driving it, and released by turning the pull-up off again, so the pin is
//! never switched to an output.

use cck_core::board::Pin;
use cck_core::touch::ChargeTransfer;
use cck_core::PinLevel;

use crate::chip::Peripherals;
use crate::{delay_us, pins};

/// AVcc reference, left-adjusted result (ADCH holds the top 8 bits).
const ADMUX_CFG: u8 = 0b0110_0000;
/// MUX4:0 = 11111 selects the 0 V (GND) input.
const ADMUX_GND: u8 = ADMUX_CFG | 0b0001_1111;

const ADEN: u8 = 1 << 7;
const ADSC: u8 = 1 << 6;
/// ADPS2:0 = 111, ADC clock = F_CPU / 128.
const ADPS_128: u8 = 0b0000_0111;

/// Time for the sample-and-hold capacitor to drain into GND.
const DISCHARGE_US: u16 = 10;

pub fn init(dp: &Peripherals) {
    dp.ADC.adcsra.write(|w| unsafe { w.bits(ADEN | ADPS_128) });
    dp.ADC.adcsrb.write(|w| unsafe { w.bits(0) });
}

pub struct ChargeTransferAdc<'a> {
    dp: &'a Peripherals,
}

impl<'a> ChargeTransferAdc<'a> {
    pub fn new(dp: &'a Peripherals) -> Self {
        Self { dp }
    }
}

impl ChargeTransfer for ChargeTransferAdc<'_> {
    fn charge(&mut self, pin: Pin) {
        pins::write(self.dp, pin, PinLevel::High);
    }

    fn discharge_sampler(&mut self) {
        self.dp.ADC.admux.write(|w| unsafe { w.bits(ADMUX_GND) });
        delay_us(DISCHARGE_US);
    }

    fn release(&mut self, pin: Pin) {
        pins::write(self.dp, pin, PinLevel::Low);
    }

    fn start_conversion(&mut self, mux: u8) {
        self.dp
            .ADC
            .admux
            .write(|w| unsafe { w.bits(ADMUX_CFG | (mux & 0x1F)) });
        self.dp
            .ADC
            .adcsra
            .modify(|r, w| unsafe { w.bits(r.bits() | ADSC) });
    }

    fn conversion_done(&mut self) -> bool {
        self.dp.ADC.adcsra.read().bits() & ADSC == 0
    }

    fn result(&mut self) -> u8 {
        // Left-adjusted: the high byte is the 8-bit reading.
        (self.dp.ADC.adc.read().bits() >> 8) as u8
    }
}

//! CCK macro pad firmware.
//!
//! One binary per board, chosen with a cargo feature:
//! - `cck-2m3-v1`, `cck-2m3-v2`: mechanical switches on edge interrupts (ATmega32U2)
//! - `cck-2t`: two capacitive touch pads on the ADC (ATmega32U4)
//!
//! The switch interrupts write the shared key states; the main loop samples
//! touch pads, drives the indicator LEDs and runs USB.

#![no_std]
#![no_main]
#![feature(abi_avr_interrupt)]
#![feature(asm_experimental_arch)]

#[cfg(feature = "atmega32u4")]
mod adc;
mod exti;
mod pins;
mod usb;

#[cfg(feature = "atmega32u2")]
use avr_device::atmega32u2 as chip;
#[cfg(feature = "atmega32u4")]
use avr_device::atmega32u4 as chip;

use cck_core::board::BoardConfig;
use cck_core::{KeyStates, Keyboard};
use chip::Peripherals;
#[cfg(feature = "atmega32u4")]
use log::warn;

use usb::UsbKeyboard;

#[cfg(not(any(feature = "cck-2m3-v1", feature = "cck-2m3-v2", feature = "cck-2t")))]
compile_error!("enable one board feature: cck-2m3-v1, cck-2m3-v2 or cck-2t");

#[cfg(feature = "cck-2m3-v1")]
static BOARD: &BoardConfig = &cck_core::board::CCK_2M3_V1;
#[cfg(feature = "cck-2m3-v2")]
static BOARD: &BoardConfig = &cck_core::board::CCK_2M3_V2;
#[cfg(feature = "cck-2t")]
static BOARD: &BoardConfig = &cck_core::board::CCK_2T;

/// Key states, written by the switch interrupts and the touch aggregation.
static KEYS: KeyStates = KeyStates::new();

/// Panic handler: on AVR we just loop forever.
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    loop {}
}

/// Main entry point.
#[no_mangle]
pub extern "C" fn main() -> ! {
    let dp = unsafe { Peripherals::steal() };

    // Disable the watchdog in case the bootloader left it running
    dp.CPU.mcusr.modify(|r, w| unsafe { w.bits(r.bits() & !0x08) }); // WDRF
    dp.WDT.wdtcsr.write(|w| unsafe { w.bits(0x18) }); // WDCE | WDE
    dp.WDT.wdtcsr.write(|w| unsafe { w.bits(0) });

    // Disable clock prescaler (CLKPR)
    dp.CPU.clkpr.write(|w| w.clkpce().set_bit());
    dp.CPU.clkpr.write(|w| unsafe { w.bits(0) }); // Prescaler = 1

    pins::init(&dp, BOARD);
    // Let the pull-ups settle before sampling the switches
    delay_us(10);

    #[cfg(feature = "cck-2t")]
    let mut sampler = cck_core::touch::TouchSampler::default();
    #[cfg(feature = "cck-2t")]
    let sampler = Some(&mut sampler);
    #[cfg(not(feature = "cck-2t"))]
    let sampler = None;

    // A board table that fails validation never enumerates.
    let Ok(mut keyboard) = Keyboard::new(BOARD, &KEYS, sampler) else {
        loop {}
    };
    keyboard.prime(|pin| pins::read(&dp, pin));

    #[cfg(feature = "atmega32u4")]
    adc::init(&dp);
    #[cfg(feature = "atmega32u4")]
    let mut front_end = adc::ChargeTransferAdc::new(&dp);

    let mut usb = UsbKeyboard::new();
    usb.init(&dp);

    exti::enable(&dp, BOARD);
    unsafe { avr_device::interrupt::enable() };

    loop {
        // A timed-out conversion keeps the old sample for this slot.
        #[cfg(feature = "atmega32u4")]
        if let Err(timeout) = keyboard.sample(&mut front_end) {
            warn!("{}", timeout);
        }

        for (pin, level) in keyboard.indicators() {
            pins::write(&dp, pin, level);
        }

        usb.hid_task(&dp, &mut keyboard);
        usb.poll(&dp, &mut keyboard);
    }
}

/// Busy-wait delay in microseconds (approximate, at 16MHz).
pub fn delay_us(us: u16) {
    for _ in 0..us {
        // ~1us at 16MHz: 16 cycles / 4 cycles per loop iteration
        for _ in 0..4u8 {
            unsafe { core::arch::asm!("nop") };
        }
    }
}

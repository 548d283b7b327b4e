use cck_core::board::{Pin, CCK_2M3_V2, CCK_2T};
use cck_core::edge::{on_external_interrupt, PinLevel};
use cck_core::hid::{HidClass, ReportEndpoint};
use cck_core::keycode::Keycode;
use cck_core::report::KeyboardReport;
use cck_core::touch::{ChargeTransfer, TouchSampler, HISTORY_LEN};
use cck_core::{KeyStates, Keyboard};

/// Touch front-end that returns a fixed reading per pad.
struct Pads {
    readings: [u8; 2],
    mux: u8,
}

impl ChargeTransfer for Pads {
    fn charge(&mut self, _pin: Pin) {}
    fn discharge_sampler(&mut self) {}
    fn release(&mut self, _pin: Pin) {}
    fn start_conversion(&mut self, mux: u8) {
        self.mux = mux;
    }
    fn conversion_done(&mut self) -> bool {
        true
    }
    fn result(&mut self) -> u8 {
        if self.mux == 0b0_0111 {
            self.readings[0]
        } else {
            self.readings[1]
        }
    }
}

#[derive(Default)]
struct Host {
    reports: Vec<KeyboardReport>,
}

impl ReportEndpoint for Host {
    fn is_ready(&mut self) -> bool {
        true
    }

    fn write(&mut self, data: &[u8]) {
        self.reports.push(KeyboardReport::from_bytes(data).unwrap());
    }
}

#[test]
fn side_switch_alone() {
    let keys = KeyStates::new();
    let mut keyboard = Keyboard::new(&CCK_2M3_V2, &keys, None).unwrap();
    keyboard.prime(|_| PinLevel::High);

    // Side switch on PD6 / INT6 goes low.
    on_external_interrupt(&CCK_2M3_V2, &keys, cck_core::board::ExtInt::Int6, |pin| {
        PinLevel::from_high(pin != Pin::new(cck_core::board::Port::D, 6))
    });

    let mut hid = HidClass::new(0);
    hid.configure();
    let mut host = Host::default();
    assert!(hid.usb_task(&mut keyboard, &mut host));

    let report = host.reports.last().unwrap();
    assert_eq!(report.pressed().collect::<Vec<_>>(), vec![Keycode::Space as u8]);

    // Both LEDs are inverted by the side switch.
    let levels: Vec<_> = keyboard.indicators().map(|(_, level)| level).collect();
    assert_eq!(levels, vec![PinLevel::High, PinLevel::High]);
}

#[test]
fn press_and_release_produce_two_reports() {
    let keys = KeyStates::new();
    let mut keyboard = Keyboard::new(&CCK_2M3_V2, &keys, None).unwrap();
    let mut hid = HidClass::new(0);
    hid.configure();
    let mut host = Host::default();

    let int0 = cck_core::board::ExtInt::Int0;
    on_external_interrupt(&CCK_2M3_V2, &keys, int0, |_| PinLevel::Low);
    hid.usb_task(&mut keyboard, &mut host);
    hid.usb_task(&mut keyboard, &mut host);
    on_external_interrupt(&CCK_2M3_V2, &keys, int0, |_| PinLevel::High);
    hid.usb_task(&mut keyboard, &mut host);

    let sent: Vec<Vec<u8>> = host
        .reports
        .iter()
        .map(|r| r.pressed().collect())
        .collect();
    assert_eq!(sent, vec![vec![Keycode::Escape as u8], vec![]]);
}

#[test]
fn touch_pad_below_threshold_stays_inactive() {
    let keys = KeyStates::new();
    let mut sampler = TouchSampler::default();
    let mut keyboard = Keyboard::new(&CCK_2T, &keys, Some(&mut sampler)).unwrap();
    let mut pads = Pads {
        readings: [120, 120],
        mux: 0,
    };
    for _ in 0..HISTORY_LEN {
        keyboard.sample(&mut pads).unwrap();
    }

    let mut hid = HidClass::new(0);
    hid.configure();
    let mut host = Host::default();
    // The idle period forces out the first (empty) report.
    assert!(hid.usb_task(&mut keyboard, &mut host));
    assert!(!keys.get(0));
    assert_eq!(host.reports[0].pressed().count(), 0);
}

#[test]
fn touch_pad_above_threshold_reports_and_lights() {
    let keys = KeyStates::new();
    let mut sampler = TouchSampler::default();
    let mut keyboard = Keyboard::new(&CCK_2T, &keys, Some(&mut sampler)).unwrap();
    let mut pads = Pads {
        readings: [120, 200],
        mux: 0,
    };
    for _ in 0..HISTORY_LEN {
        keyboard.sample(&mut pads).unwrap();
    }

    let mut hid = HidClass::new(0);
    hid.configure();
    let mut host = Host::default();
    assert!(hid.usb_task(&mut keyboard, &mut host));
    assert!(keys.get(1));
    assert_eq!(
        host.reports[0].pressed().collect::<Vec<_>>(),
        vec![Keycode::X as u8]
    );

    // TX LED is active-low: asserted means driven low.
    let levels: Vec<_> = keyboard.indicators().collect();
    assert_eq!(levels[1].1, PinLevel::Low);
    assert_eq!(levels[0].1, PinLevel::High);
}

#[test]
fn touch_decision_lags_until_history_fills() {
    let keys = KeyStates::new();
    let mut sampler = TouchSampler::default();
    let mut keyboard = Keyboard::new(&CCK_2T, &keys, Some(&mut sampler)).unwrap();
    let mut pads = Pads {
        readings: [255, 255],
        mux: 0,
    };
    let mut hid = HidClass::new(0);
    hid.configure();
    let mut host = Host::default();

    // Zeroed history: 255 * n / 128 > 155 first holds at n = 79.
    for _ in 0..78 {
        keyboard.sample(&mut pads).unwrap();
    }
    hid.usb_task(&mut keyboard, &mut host);
    assert!(!keys.get(0));

    keyboard.sample(&mut pads).unwrap();
    hid.usb_task(&mut keyboard, &mut host);
    assert!(keys.get(0));
    assert!(keys.get(1));
}

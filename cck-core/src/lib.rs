//! Input sensing and report synthesis for the CCK macro pads.
//!
//! This crate is `no_std` so the AVR firmware and the host tooling share
//! it. Hardware access stays behind small traits ([`touch::ChargeTransfer`],
//! [`hid::ReportEndpoint`]) and closures that read pins, so everything here
//! runs in host tests.
//!
//! Data flow: edge interrupts / touch sampler → [`keys::KeyStates`] →
//! report composer → [`hid::HidClass`] → host. The indicator LEDs read the
//! key states independently of USB.

#![cfg_attr(not(test), no_std)]

pub mod board;
pub mod compose;
pub mod edge;
pub mod error;
pub mod hid;
pub mod keyboard;
pub mod keycode;
pub mod keys;
pub mod report;
pub mod status;
pub mod touch;

pub use board::BoardConfig;
pub use edge::PinLevel;
pub use error::{ConfigError, ConversionTimeout};
pub use keyboard::Keyboard;
pub use keycode::Keycode;
pub use keys::KeyStates;
pub use report::KeyboardReport;

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::debug;
use rusb::{DeviceHandle, GlobalContext};
use std::time::Duration;

use cck_core::hid::{PRODUCT_ID, VENDOR_ID};
use cck_core::report::REPORT_SIZE;
use cck_core::KeyboardReport;

/// Keyboard interface and its interrupt IN endpoint.
const INTERFACE: u8 = 0;
const REPORT_ENDPOINT: u8 = 0x81;

/// Interrupt transfer timeout; the spinner keeps ticking between reads.
const READ_TIMEOUT: Duration = Duration::from_millis(500);

/// Detect whether a CCK keyboard is attached.
pub fn detect() -> Result<bool> {
    let devices = rusb::devices().context("failed to enumerate USB devices")?;
    for device in devices.iter() {
        let desc = device
            .device_descriptor()
            .context("failed to read device descriptor")?;
        if desc.vendor_id() == VENDOR_ID && desc.product_id() == PRODUCT_ID {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Open the keyboard and claim its HID interface.
fn open_device() -> Result<DeviceHandle<GlobalContext>> {
    let handle = rusb::open_device_with_vid_pid(VENDOR_ID, PRODUCT_ID).with_context(|| {
        format!(
            "keyboard {:04X}:{:04X} not found (or no permission: try root/sudo or udev rules)",
            VENDOR_ID, PRODUCT_ID
        )
    })?;

    // Not supported on every platform; claiming fails later if it mattered.
    if let Err(e) = handle.set_auto_detach_kernel_driver(true) {
        debug!("auto-detach of kernel driver unavailable: {}", e);
    }
    handle
        .claim_interface(INTERFACE)
        .context("failed to claim keyboard interface")?;
    Ok(handle)
}

/// Print input reports as they arrive. Stops after `count` reports, or runs
/// until interrupted.
pub fn monitor(count: Option<usize>, mut on_report: impl FnMut(&KeyboardReport) -> String) -> Result<()> {
    let handle = open_device()?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner} {msg}")
            .context("invalid spinner template")?,
    );
    spinner.set_message("waiting for reports");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let mut received = 0;
    let mut buf = [0u8; REPORT_SIZE];
    while count.map_or(true, |n| received < n) {
        let len = match handle.read_interrupt(REPORT_ENDPOINT, &mut buf, READ_TIMEOUT) {
            Ok(len) => len,
            Err(rusb::Error::Timeout) => continue,
            Err(e) => {
                spinner.finish_and_clear();
                return Err(e).context("reading keyboard report");
            }
        };

        let Some(report) = KeyboardReport::from_bytes(&buf[..len]) else {
            spinner.finish_and_clear();
            bail!("short report: {} bytes, expected {}", len, REPORT_SIZE);
        };
        received += 1;
        spinner.println(on_report(&report));
    }

    spinner.finish_and_clear();
    let _ = handle.release_interface(INTERFACE);
    Ok(())
}

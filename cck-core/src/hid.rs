//! HID class logic between the USB driver and the keyboard.
//!
//! The USB driver owns endpoints and enumeration; this module decides when
//! an input report goes out and answers HID class control requests. A
//! report is transmitted when the handler forces it, when its bytes differ
//! from the last one sent, or when the host-set idle period runs out.

use log::debug;

use crate::report::REPORT_SIZE;

/// Atmel vendor ID with the LUFA keyboard demo product ID.
pub const VENDOR_ID: u16 = 0x03EB;
pub const PRODUCT_ID: u16 = 0x2042;

/// HID 1.11 recommends 500 ms as the boot keyboard idle rate.
pub const DEFAULT_IDLE_MS: u16 = 500;

// HID class requests
const GET_REPORT: u8 = 0x01;
const GET_IDLE: u8 = 0x02;
const GET_PROTOCOL: u8 = 0x03;
const SET_REPORT: u8 = 0x09;
const SET_IDLE: u8 = 0x0A;
const SET_PROTOCOL: u8 = 0x0B;

/// bmRequestType for class requests addressed to an interface.
const CLASS_INTERFACE_IN: u8 = 0xA1;
const CLASS_INTERFACE_OUT: u8 = 0x21;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReportType {
    Input,
    Output,
    Feature,
}

impl ReportType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(ReportType::Input),
            2 => Some(ReportType::Output),
            3 => Some(ReportType::Feature),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CreatedReport {
    /// Bytes written into the report buffer; zero means nothing to send.
    pub size: usize,
    /// Send even if the report matches the previous one.
    pub force_send: bool,
}

/// Callbacks the HID class makes into the keyboard.
pub trait HidReportHandler {
    /// Fill `data` with a report of `report_type`. `report_id` may be set by
    /// the handler when the host did not request a specific one.
    fn create_report(
        &mut self,
        report_id: &mut u8,
        report_type: ReportType,
        data: &mut [u8],
    ) -> CreatedReport;

    /// A report arrived from the host (SET_REPORT or the OUT endpoint).
    fn process_report(&mut self, report_id: u8, report_type: ReportType, data: &[u8]);
}

/// The interrupt IN endpoint as seen by the class.
pub trait ReportEndpoint {
    /// The endpoint bank can take another report.
    fn is_ready(&mut self) -> bool;
    fn write(&mut self, data: &[u8]);
}

/// An 8-byte SETUP packet.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SetupPacket {
    pub request_type: u8,
    pub request: u8,
    pub value: u16,
    pub index: u16,
    pub length: u16,
}

impl SetupPacket {
    pub fn from_bytes(bytes: [u8; 8]) -> Self {
        Self {
            request_type: bytes[0],
            request: bytes[1],
            value: u16::from_le_bytes([bytes[2], bytes[3]]),
            index: u16::from_le_bytes([bytes[4], bytes[5]]),
            length: u16::from_le_bytes([bytes[6], bytes[7]]),
        }
    }

    /// Host-to-device request with a data stage the driver must read first.
    pub fn has_out_data(&self) -> bool {
        self.request_type & 0x80 == 0 && self.length > 0
    }
}

/// What the USB driver should do with a control request.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ControlResponse {
    /// Send the first `n` bytes of the buffer in the data stage.
    DataIn(usize),
    /// Complete the status stage with no data.
    Ack,
    /// Recognised as a HID request but unsupported.
    Stall,
    /// Not a request for this interface; the driver handles it.
    NotHandled,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Protocol {
    Boot,
    Report,
}

pub struct HidClass {
    interface: u8,
    configured: bool,
    protocol: Protocol,
    idle_ms: u16,
    idle_remaining: u16,
    prev_report: [u8; REPORT_SIZE],
}

impl HidClass {
    pub const fn new(interface: u8) -> Self {
        Self {
            interface,
            configured: false,
            protocol: Protocol::Report,
            idle_ms: DEFAULT_IDLE_MS,
            idle_remaining: 0,
            prev_report: [0; REPORT_SIZE],
        }
    }

    /// The host selected a configuration: endpoints are live.
    pub fn configure(&mut self) {
        self.configured = true;
        self.protocol = Protocol::Report;
        self.idle_ms = DEFAULT_IDLE_MS;
        self.idle_remaining = 0;
    }

    /// Bus reset or disconnect.
    pub fn reset(&mut self) {
        self.configured = false;
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn idle_ms(&self) -> u16 {
        self.idle_ms
    }

    /// Last report handed to the endpoint.
    pub fn prev_report(&self) -> &[u8; REPORT_SIZE] {
        &self.prev_report
    }

    /// Call once per start-of-frame (1 ms).
    pub fn millisecond_elapsed(&mut self) {
        self.idle_remaining = self.idle_remaining.saturating_sub(1);
    }

    /// Per-iteration task: build a report and send it if anything calls for it.
    /// Returns `true` when a report was written to the endpoint.
    pub fn usb_task<H, E>(&mut self, handler: &mut H, endpoint: &mut E) -> bool
    where
        H: HidReportHandler,
        E: ReportEndpoint,
    {
        if !self.configured || !endpoint.is_ready() {
            return false;
        }

        let mut data = [0u8; REPORT_SIZE];
        let mut report_id = 0;
        let created = handler.create_report(&mut report_id, ReportType::Input, &mut data);
        let size = created.size.min(REPORT_SIZE);
        if size == 0 {
            return false;
        }

        let changed = data[..size] != self.prev_report[..size];
        let idle_elapsed = self.idle_ms != 0 && self.idle_remaining == 0;
        if !(created.force_send || changed || idle_elapsed) {
            return false;
        }

        if changed {
            debug!("report changed: {:?}", &data[..size]);
        }
        self.idle_remaining = self.idle_ms;
        endpoint.write(&data[..size]);
        self.prev_report = data;
        true
    }

    /// Answer a HID class request.
    ///
    /// For host-to-device requests `data` holds the OUT data stage; for
    /// device-to-host requests the reply is written into it.
    pub fn process_control_request<H: HidReportHandler>(
        &mut self,
        setup: &SetupPacket,
        data: &mut [u8],
        handler: &mut H,
    ) -> ControlResponse {
        if setup.index != self.interface as u16 {
            return ControlResponse::NotHandled;
        }

        match (setup.request_type, setup.request) {
            (CLASS_INTERFACE_IN, GET_REPORT) => {
                let Some(report_type) = ReportType::from_u8((setup.value >> 8) as u8) else {
                    return ControlResponse::Stall;
                };
                let mut report_id = setup.value as u8;
                let len = data.len().min(REPORT_SIZE);
                data[..len].fill(0);
                let created = handler.create_report(&mut report_id, report_type, &mut data[..len]);
                let size = created.size.min(len);
                // The whole report becomes the previous one, even if wLength cuts the reply short.
                if report_type == ReportType::Input {
                    self.prev_report = [0; REPORT_SIZE];
                    self.prev_report[..size].copy_from_slice(&data[..size]);
                }
                ControlResponse::DataIn(size.min(setup.length as usize))
            }
            (CLASS_INTERFACE_OUT, SET_REPORT) => {
                let Some(report_type) = ReportType::from_u8((setup.value >> 8) as u8) else {
                    return ControlResponse::Stall;
                };
                let len = data.len().min(setup.length as usize);
                handler.process_report(setup.value as u8, report_type, &data[..len]);
                ControlResponse::Ack
            }
            (CLASS_INTERFACE_IN, GET_IDLE) => {
                if data.is_empty() {
                    return ControlResponse::Stall;
                }
                data[0] = (self.idle_ms / 4).min(u8::MAX as u16) as u8;
                ControlResponse::DataIn(1)
            }
            (CLASS_INTERFACE_OUT, SET_IDLE) => {
                // Upper byte in units of 4 ms, 0 = only report on change.
                self.idle_ms = (setup.value >> 8) * 4;
                self.idle_remaining = self.idle_ms;
                debug!("idle period set to {} ms", self.idle_ms);
                ControlResponse::Ack
            }
            (CLASS_INTERFACE_IN, GET_PROTOCOL) => {
                if data.is_empty() {
                    return ControlResponse::Stall;
                }
                data[0] = match self.protocol {
                    Protocol::Boot => 0,
                    Protocol::Report => 1,
                };
                ControlResponse::DataIn(1)
            }
            (CLASS_INTERFACE_OUT, SET_PROTOCOL) => {
                self.protocol = if setup.value == 0 {
                    Protocol::Boot
                } else {
                    Protocol::Report
                };
                ControlResponse::Ack
            }
            _ => ControlResponse::NotHandled,
        }
    }
}

//! USB device driver for the ATmega32U2/U4 USB controller.
//!
//! Handles enumeration on the control endpoint and moves keyboard reports
//! through the interrupt IN endpoint. Report timing and the HID class
//! requests are decided by [`HidClass`]; this module only does register I/O.

use cck_core::hid::{
    ControlResponse, HidClass, HidReportHandler, ReportEndpoint, SetupPacket, PRODUCT_ID,
    VENDOR_ID,
};
use cck_core::report::REPORT_SIZE;

use crate::chip::Peripherals;

// USB endpoint configuration for keyboard HID
const EP0_SIZE: u8 = 64; // Control endpoint size
const EP1_SIZE: u8 = REPORT_SIZE as u8; // Interrupt IN endpoint size (keyboard reports)
const KEYBOARD_INTERFACE: u8 = 0;

/// USBCON: USBE, plus OTGPADE (VBUS pad) on the U4.
#[cfg(feature = "atmega32u4")]
const USBCON_ENABLE: u8 = 0x90;
#[cfg(feature = "atmega32u2")]
const USBCON_ENABLE: u8 = 0x80;

/// PLLCSR: PLLE with the 16 MHz crystal input divider (PINDIV on U4, PLLP0 on U2).
#[cfg(feature = "atmega32u4")]
const PLLCSR_16MHZ: u8 = 0x12;
#[cfg(feature = "atmega32u2")]
const PLLCSR_16MHZ: u8 = 0x06;

const HID_REPORT_DESCRIPTOR_LEN: usize = 64;

/// HID report descriptor for a boot keyboard.
static HID_REPORT_DESCRIPTOR: [u8; HID_REPORT_DESCRIPTOR_LEN] = [
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x06, // Usage (Keyboard)
    0xA1, 0x01, // Collection (Application)
    // Modifier keys (8 bits)
    0x05, 0x07, //   Usage Page (Key Codes)
    0x19, 0xE0, //   Usage Minimum (224) - LCtrl
    0x29, 0xE7, //   Usage Maximum (231) - RGui
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x01, //   Logical Maximum (1)
    0x75, 0x01, //   Report Size (1)
    0x95, 0x08, //   Report Count (8)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    // Reserved byte
    0x95, 0x01, //   Report Count (1)
    0x75, 0x08, //   Report Size (8)
    0x81, 0x01, //   Input (Constant)
    // Lock LEDs (5 bits, accepted and ignored)
    0x95, 0x05, //   Report Count (5)
    0x75, 0x01, //   Report Size (1)
    0x05, 0x08, //   Usage Page (LEDs)
    0x19, 0x01, //   Usage Minimum (1)
    0x29, 0x05, //   Usage Maximum (5)
    0x91, 0x02, //   Output (Data, Variable, Absolute)
    0x95, 0x01, //   Report Count (1)
    0x75, 0x03, //   Report Size (3)
    0x91, 0x01, //   Output (Constant)
    // Keycodes (6 bytes)
    0x95, 0x06, //   Report Count (6)
    0x75, 0x08, //   Report Size (8)
    0x15, 0x00, //   Logical Minimum (0)
    0x26, 0xFF, 0x00, // Logical Maximum (255)
    0x05, 0x07, //   Usage Page (Key Codes)
    0x19, 0x00, //   Usage Minimum (0)
    0x29, 0xFF, //   Usage Maximum (255)
    0x81, 0x00, //   Input (Data, Array)
    0xC0, // End Collection
];

static DEVICE_DESCRIPTOR: [u8; 18] = [
    18,   // bLength
    1,    // bDescriptorType (Device)
    0x10, 0x01, // bcdUSB (1.1)
    0,    // bDeviceClass (defined at interface level)
    0,    // bDeviceSubClass
    0,    // bDeviceProtocol
    EP0_SIZE, // bMaxPacketSize0
    VENDOR_ID as u8, (VENDOR_ID >> 8) as u8, // idVendor
    PRODUCT_ID as u8, (PRODUCT_ID >> 8) as u8, // idProduct
    0x01, 0x00, // bcdDevice (1.0)
    1,    // iManufacturer
    2,    // iProduct
    0,    // iSerialNumber
    1,    // bNumConfigurations
];

/// Offset of the HID class descriptor inside the configuration descriptor.
const HID_DESCRIPTOR_OFFSET: usize = 18;

static CONFIG_DESCRIPTOR: [u8; 34] = [
    // Configuration descriptor
    9,    // bLength
    2,    // bDescriptorType (Configuration)
    34, 0, // wTotalLength
    1,    // bNumInterfaces
    1,    // bConfigurationValue
    0,    // iConfiguration
    0xC0, // bmAttributes (self powered)
    50,   // bMaxPower (100mA)
    // Interface descriptor
    9,    // bLength
    4,    // bDescriptorType (Interface)
    KEYBOARD_INTERFACE, // bInterfaceNumber
    0,    // bAlternateSetting
    1,    // bNumEndpoints
    3,    // bInterfaceClass (HID)
    1,    // bInterfaceSubClass (Boot)
    1,    // bInterfaceProtocol (Keyboard)
    0,    // iInterface
    // HID descriptor
    9,    // bLength
    0x21, // bDescriptorType (HID)
    0x11, 0x01, // bcdHID (1.11)
    0,    // bCountryCode
    1,    // bNumDescriptors
    0x22, // bDescriptorType (Report)
    HID_REPORT_DESCRIPTOR_LEN as u8, 0, // wDescriptorLength
    // Endpoint descriptor (EP1 IN, interrupt)
    7,    // bLength
    5,    // bDescriptorType (Endpoint)
    0x81, // bEndpointAddress (EP1 IN)
    0x03, // bmAttributes (Interrupt)
    EP1_SIZE, 0, // wMaxPacketSize
    5,    // bInterval (5ms polling)
];

/// String descriptor 0 (language ID)
static STRING_DESC_0: [u8; 4] = [4, 3, 0x09, 0x04]; // English (US)

/// String descriptor 1 (manufacturer): "CCK"
static STRING_DESC_1: [u8; 8] = [8, 3, b'C', 0, b'C', 0, b'K', 0];

/// String descriptor 2 (product): "CCK Keypad"
static STRING_DESC_2: [u8; 22] = [
    22, 3, // bLength, bDescriptorType
    b'C', 0, b'C', 0, b'K', 0, b' ', 0, b'K', 0, b'e', 0, b'y', 0, b'p', 0, b'a', 0, b'd', 0,
];

/// The keyboard's interrupt IN endpoint.
struct InEndpoint<'a> {
    dp: &'a Peripherals,
}

impl ReportEndpoint for InEndpoint<'_> {
    fn is_ready(&mut self) -> bool {
        select_endpoint(self.dp, 1);
        // RWAL set means the bank can take data
        self.dp.USB_DEVICE.ueintx.read().rwal().bit_is_set()
    }

    fn write(&mut self, data: &[u8]) {
        let usb = &self.dp.USB_DEVICE;
        for &byte in data {
            usb.uedatx.write(|w| w.bits(byte));
        }
        // Clear FIFOCON and TXINI to send
        usb.ueintx
            .modify(|_, w| w.fifocon().clear_bit().txini().clear_bit());
    }
}

/// USB device state.
pub struct UsbKeyboard {
    hid: HidClass,
}

impl UsbKeyboard {
    pub const fn new() -> Self {
        Self {
            hid: HidClass::new(KEYBOARD_INTERFACE),
        }
    }

    /// Initialize the USB controller and attach to the bus.
    pub fn init(&mut self, dp: &Peripherals) {
        let usb = &dp.USB_DEVICE;

        // Enable USB pad regulator
        #[cfg(feature = "atmega32u4")]
        usb.uhwcon.write(|w| w.uvrege().set_bit());

        // Enable USB controller, clock still frozen
        usb.usbcon.write(|w| unsafe { w.bits(USBCON_ENABLE | 0x20) });

        dp.PLL.pllcsr.write(|w| unsafe { w.bits(PLLCSR_16MHZ) });

        // Wait for PLL lock
        while dp.PLL.pllcsr.read().plock().bit_is_clear() {}

        // Enable USB clock
        usb.usbcon.modify(|_, w| w.frzclk().clear_bit());

        // Attach to bus (clear DETACH)
        usb.udcon.modify(|_, w| w.detach().clear_bit());

        self.hid.reset();
    }

    /// USB housekeeping: bus reset, start-of-frame and control requests.
    pub fn poll<H: HidReportHandler>(&mut self, dp: &Peripherals, handler: &mut H) {
        let usb = &dp.USB_DEVICE;
        let udint = usb.udint.read();

        // End of reset: the host (re)connected us, wait for a new configuration.
        if udint.eorsti().bit_is_set() {
            usb.udint.modify(|_, w| w.eorsti().clear_bit());
            self.configure_ep0(dp);
            self.hid.reset();
        }

        // UDIEN stays clear: global interrupts are on for the switch lines and
        // there is no USB vector, so every USB event is polled here.
        if udint.sofi().bit_is_set() {
            usb.udint.modify(|_, w| w.sofi().clear_bit());
            self.hid.millisecond_elapsed();
        }

        // Check for SETUP packet on EP0
        select_endpoint(dp, 0);
        if usb.ueintx.read().rxstpi().bit_is_set() {
            self.handle_setup(dp, handler);
        }
    }

    /// Send a keyboard report if the HID class wants one out.
    pub fn hid_task<H: HidReportHandler>(&mut self, dp: &Peripherals, handler: &mut H) {
        let mut endpoint = InEndpoint { dp };
        self.hid.usb_task(handler, &mut endpoint);
    }

    fn configure_ep0(&self, dp: &Peripherals) {
        let usb = &dp.USB_DEVICE;

        select_endpoint(dp, 0);
        // Enable EP0 as control endpoint, 64 bytes
        usb.ueconx.write(|w| w.epen().set_bit());
        usb.uecfg0x.write(|w| w.eptype().bits(0b00));
        usb.uecfg1x.write(|w| w.epsize().bits(0b011).alloc().set_bit());
    }

    fn configure_ep1(&self, dp: &Peripherals) {
        let usb = &dp.USB_DEVICE;

        select_endpoint(dp, 1);
        usb.ueconx.write(|w| w.epen().set_bit());
        // Interrupt IN endpoint
        usb.uecfg0x
            .write(|w| w.eptype().bits(0b11).epdir().set_bit());
        usb.uecfg1x.write(|w| w.epsize().bits(0b000).alloc().set_bit());
    }

    fn handle_setup<H: HidReportHandler>(&mut self, dp: &Peripherals, handler: &mut H) {
        let usb = &dp.USB_DEVICE;

        let mut raw = [0u8; 8];
        for byte in raw.iter_mut() {
            *byte = usb.uedatx.read().bits();
        }
        let setup = SetupPacket::from_bytes(raw);

        // Acknowledge SETUP
        usb.ueintx.modify(|_, w| w.rxstpi().clear_bit());

        // Class requests go to the HID class first.
        if setup.request_type & 0x60 == 0x20 {
            let mut data = [0u8; REPORT_SIZE];
            if setup.has_out_data() {
                read_control_data(dp, &mut data[..(setup.length as usize).min(REPORT_SIZE)]);
            }
            match self.hid.process_control_request(&setup, &mut data, handler) {
                ControlResponse::DataIn(len) => send_control_data(dp, &data[..len], setup.length),
                ControlResponse::Ack => send_zlp(dp),
                ControlResponse::Stall | ControlResponse::NotHandled => stall(dp),
            }
            return;
        }

        let [value_l, value_h] = setup.value.to_le_bytes();
        match (setup.request_type, setup.request) {
            // GET_STATUS
            (0x80, 0x00) | (0x81, 0x00) | (0x82, 0x00) => {
                send_control_data(dp, &[0, 0], setup.length);
            }

            // GET_DESCRIPTOR
            (0x80, 0x06) => match value_h {
                1 => send_control_data(dp, &DEVICE_DESCRIPTOR, setup.length),
                2 => send_control_data(dp, &CONFIG_DESCRIPTOR, setup.length),
                3 => match value_l {
                    0 => send_control_data(dp, &STRING_DESC_0, setup.length),
                    1 => send_control_data(dp, &STRING_DESC_1, setup.length),
                    2 => send_control_data(dp, &STRING_DESC_2, setup.length),
                    _ => stall(dp),
                },
                _ => stall(dp),
            },

            // SET_ADDRESS
            (0x00, 0x05) => {
                // Send ZLP first, then set address
                send_zlp(dp);
                while usb.ueintx.read().txini().bit_is_clear() {}
                usb.udaddr
                    .write(|w| w.uadd().bits(value_l & 0x7F).adden().set_bit());
            }

            // SET_CONFIGURATION
            (0x00, 0x09) => {
                send_zlp(dp);
                self.configure_ep1(dp);
                self.hid.configure();
            }

            // GET_CONFIGURATION
            (0x80, 0x08) => {
                let value = if self.hid.is_configured() { 1 } else { 0 };
                send_control_data(dp, &[value], setup.length);
            }

            // GET_DESCRIPTOR (interface-level HID and report descriptors)
            (0x81, 0x06) => match value_h {
                0x21 => send_control_data(
                    dp,
                    &CONFIG_DESCRIPTOR[HID_DESCRIPTOR_OFFSET..HID_DESCRIPTOR_OFFSET + 9],
                    setup.length,
                ),
                0x22 => send_control_data(dp, &HID_REPORT_DESCRIPTOR, setup.length),
                _ => stall(dp),
            },

            _ => stall(dp),
        }
    }
}

fn select_endpoint(dp: &Peripherals, ep: u8) {
    dp.USB_DEVICE.uenum.write(|w| w.bits(ep & 0x07));
}

/// Read the OUT data stage of a control transfer into `buf`.
fn read_control_data(dp: &Peripherals, buf: &mut [u8]) {
    let usb = &dp.USB_DEVICE;
    while usb.ueintx.read().rxouti().bit_is_clear() {}
    for byte in buf.iter_mut() {
        *byte = usb.uedatx.read().bits();
    }
    usb.ueintx.modify(|_, w| w.rxouti().clear_bit());
}

/// Send `data` in the IN data stage, at most `max_length` bytes, then wait for the status stage.
fn send_control_data(dp: &Peripherals, data: &[u8], max_length: u16) {
    let usb = &dp.USB_DEVICE;
    let len = core::cmp::min(data.len(), max_length as usize);
    let mut sent = 0;

    loop {
        while usb.ueintx.read().txini().bit_is_clear() {}

        let chunk_end = core::cmp::min(sent + EP0_SIZE as usize, len);
        for &byte in &data[sent..chunk_end] {
            usb.uedatx.write(|w| w.bits(byte));
        }

        usb.ueintx.modify(|_, w| w.txini().clear_bit());
        sent = chunk_end;
        if sent >= len {
            break;
        }
    }

    // Wait for status stage (host sends ZLP)
    while usb.ueintx.read().rxouti().bit_is_clear() {}
    usb.ueintx.modify(|_, w| w.rxouti().clear_bit());
}

fn send_zlp(dp: &Peripherals) {
    dp.USB_DEVICE
        .ueintx
        .modify(|_, w| w.txini().clear_bit());
}

fn stall(dp: &Peripherals) {
    dp.USB_DEVICE
        .ueconx
        .modify(|_, w| w.stallrq().set_bit());
}

//! Boot-protocol keyboard report layout.

/// Number of keycode slots in a report.
pub const KEY_SLOTS: usize = 6;

/// Size of a serialized report in bytes.
pub const REPORT_SIZE: usize = 2 + KEY_SLOTS;

/// Standard USB HID keyboard report (8 bytes).
/// Byte 0: modifier keys bitmask
/// Byte 1: reserved (0x00)
/// Bytes 2-7: up to 6 simultaneous keycodes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyboardReport {
    pub modifiers: u8,
    pub reserved: u8,
    pub keys: [u8; KEY_SLOTS],
}

impl KeyboardReport {
    pub const fn empty() -> Self {
        Self {
            modifiers: 0,
            reserved: 0,
            keys: [0; KEY_SLOTS],
        }
    }

    pub fn to_bytes(&self) -> [u8; REPORT_SIZE] {
        let mut buf = [0u8; REPORT_SIZE];
        buf[0] = self.modifiers;
        buf[1] = self.reserved;
        buf[2..].copy_from_slice(&self.keys);
        buf
    }

    /// Parse a report as received by the host. Returns `None` if `data` is short.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < REPORT_SIZE {
            return None;
        }
        let mut keys = [0u8; KEY_SLOTS];
        keys.copy_from_slice(&data[2..REPORT_SIZE]);
        Some(Self {
            modifiers: data[0],
            reserved: data[1],
            keys,
        })
    }

    /// Occupied keycode slots, in slot order.
    pub fn pressed(&self) -> impl Iterator<Item = u8> + '_ {
        self.keys.iter().copied().filter(|&k| k != 0)
    }
}

/// Lock-key bits of the host's output report.
///
/// Names the layout of the inbound report only; no board has lock LEDs, so
/// `Keyboard::process_report` never reads these bits.
pub struct LedReport;

impl LedReport {
    pub const NUM_LOCK: u8 = 1 << 0;
    pub const CAPS_LOCK: u8 = 1 << 1;
    pub const SCROLL_LOCK: u8 = 1 << 2;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_layout() {
        let report = KeyboardReport {
            modifiers: 0x02,
            reserved: 0,
            keys: [0x1D, 0x1B, 0, 0, 0, 0],
        };
        assert_eq!(report.to_bytes(), [0x02, 0, 0x1D, 0x1B, 0, 0, 0, 0]);
    }

    #[test]
    fn test_from_short_buffer() {
        assert!(KeyboardReport::from_bytes(&[0; 7]).is_none());
        let report = KeyboardReport::from_bytes(&[0, 0, 0x2C, 0, 0, 0, 0, 0, 0xAA]).unwrap();
        assert_eq!(report.pressed().collect::<Vec<_>>(), vec![0x2C]);
    }
}

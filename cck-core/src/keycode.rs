//! USB HID keycodes for the keys a CCK board can be wired to.
//! See USB HID Usage Tables, Section 10 (Keyboard/Keypad Page 0x07).

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Keycode {
    /// Empty slot in a report.
    None = 0x00,
    /// Error rollover
    ErrorRollOver = 0x01,

    A = 0x04,
    B = 0x05,
    C = 0x06,
    D = 0x07,
    E = 0x08,
    F = 0x09,
    G = 0x0A,
    H = 0x0B,
    I = 0x0C,
    J = 0x0D,
    K = 0x0E,
    L = 0x0F,
    M = 0x10,
    N = 0x11,
    O = 0x12,
    P = 0x13,
    Q = 0x14,
    R = 0x15,
    S = 0x16,
    T = 0x17,
    U = 0x18,
    V = 0x19,
    W = 0x1A,
    X = 0x1B,
    Y = 0x1C,
    Z = 0x1D,

    N1 = 0x1E,
    N2 = 0x1F,
    N3 = 0x20,
    N4 = 0x21,
    N5 = 0x22,
    N6 = 0x23,
    N7 = 0x24,
    N8 = 0x25,
    N9 = 0x26,
    N0 = 0x27,

    Enter = 0x28,
    Escape = 0x29,
    Backspace = 0x2A,
    Tab = 0x2B,
    Space = 0x2C,

    F1 = 0x3A,
    F2 = 0x3B,
    F3 = 0x3C,
    F4 = 0x3D,

    Right = 0x4F,
    Left = 0x50,
    Down = 0x51,
    Up = 0x52,

    // Modifiers (reported in the modifier byte, not a keycode slot)
    LCtrl = 0xE0,
    LShift = 0xE1,
    LAlt = 0xE2,
    LGui = 0xE3,
    RCtrl = 0xE4,
    RShift = 0xE5,
    RAlt = 0xE6,
    RGui = 0xE7,
}

const LETTERS: [Keycode; 26] = [
    Keycode::A,
    Keycode::B,
    Keycode::C,
    Keycode::D,
    Keycode::E,
    Keycode::F,
    Keycode::G,
    Keycode::H,
    Keycode::I,
    Keycode::J,
    Keycode::K,
    Keycode::L,
    Keycode::M,
    Keycode::N,
    Keycode::O,
    Keycode::P,
    Keycode::Q,
    Keycode::R,
    Keycode::S,
    Keycode::T,
    Keycode::U,
    Keycode::V,
    Keycode::W,
    Keycode::X,
    Keycode::Y,
    Keycode::Z,
];

const DIGITS: [Keycode; 10] = [
    Keycode::N1,
    Keycode::N2,
    Keycode::N3,
    Keycode::N4,
    Keycode::N5,
    Keycode::N6,
    Keycode::N7,
    Keycode::N8,
    Keycode::N9,
    Keycode::N0,
];

impl Keycode {
    /// Decode a raw usage ID. Returns `None` for usages this table does not name.
    pub fn from_u8(code: u8) -> Option<Keycode> {
        let kc = match code {
            0x00 => Keycode::None,
            0x01 => Keycode::ErrorRollOver,
            0x04..=0x1D => LETTERS[(code - 0x04) as usize],
            0x1E..=0x27 => DIGITS[(code - 0x1E) as usize],
            0x28 => Keycode::Enter,
            0x29 => Keycode::Escape,
            0x2A => Keycode::Backspace,
            0x2B => Keycode::Tab,
            0x2C => Keycode::Space,
            0x3A => Keycode::F1,
            0x3B => Keycode::F2,
            0x3C => Keycode::F3,
            0x3D => Keycode::F4,
            0x4F => Keycode::Right,
            0x50 => Keycode::Left,
            0x51 => Keycode::Down,
            0x52 => Keycode::Up,
            0xE0 => Keycode::LCtrl,
            0xE1 => Keycode::LShift,
            0xE2 => Keycode::LAlt,
            0xE3 => Keycode::LGui,
            0xE4 => Keycode::RCtrl,
            0xE5 => Keycode::RShift,
            0xE6 => Keycode::RAlt,
            0xE7 => Keycode::RGui,
            _ => return None,
        };
        Some(kc)
    }

    /// Check if this keycode is a modifier (LCtrl..RGui).
    pub fn is_modifier(self) -> bool {
        let v = self as u8;
        (0xE0..=0xE7).contains(&v)
    }

    /// Get the modifier bit mask (bit 0 = LCtrl, bit 7 = RGui).
    pub fn modifier_bit(self) -> u8 {
        if self.is_modifier() {
            1 << (self as u8 - 0xE0)
        } else {
            0
        }
    }

    pub fn display_name(self) -> &'static str {
        const LETTER_NAMES: [&str; 26] = [
            "A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K", "L", "M", "N", "O", "P", "Q",
            "R", "S", "T", "U", "V", "W", "X", "Y", "Z",
        ];
        const DIGIT_NAMES: [&str; 10] = ["1", "2", "3", "4", "5", "6", "7", "8", "9", "0"];

        let v = self as u8;
        match self {
            Keycode::None => "",
            Keycode::ErrorRollOver => "ERR",
            Keycode::Enter => "Enter",
            Keycode::Escape => "Esc",
            Keycode::Backspace => "Bksp",
            Keycode::Tab => "Tab",
            Keycode::Space => "Space",
            Keycode::F1 => "F1",
            Keycode::F2 => "F2",
            Keycode::F3 => "F3",
            Keycode::F4 => "F4",
            Keycode::Right => "Right",
            Keycode::Left => "Left",
            Keycode::Down => "Down",
            Keycode::Up => "Up",
            Keycode::LCtrl => "LCtrl",
            Keycode::LShift => "LShift",
            Keycode::LAlt => "LAlt",
            Keycode::LGui => "LGui",
            Keycode::RCtrl => "RCtrl",
            Keycode::RShift => "RShift",
            Keycode::RAlt => "RAlt",
            Keycode::RGui => "RGui",
            _ if (0x04..=0x1D).contains(&v) => LETTER_NAMES[(v - 0x04) as usize],
            _ => DIGIT_NAMES[(v - 0x1E) as usize],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_u8_matches_discriminant() {
        for code in 0..=255u8 {
            if let Some(kc) = Keycode::from_u8(code) {
                assert_eq!(kc as u8, code);
            }
        }
        assert_eq!(Keycode::from_u8(0x1D), Some(Keycode::Z));
        assert_eq!(Keycode::from_u8(0x27), Some(Keycode::N0));
        assert_eq!(Keycode::from_u8(0x02), None);
    }

    #[test]
    fn test_modifier_bits() {
        assert!(Keycode::LShift.is_modifier());
        assert_eq!(Keycode::LCtrl.modifier_bit(), 0x01);
        assert_eq!(Keycode::RGui.modifier_bit(), 0x80);
        assert!(!Keycode::Space.is_modifier());
        assert_eq!(Keycode::Space.modifier_bit(), 0);
    }

    #[test]
    fn test_display_names() {
        assert_eq!(Keycode::Z.display_name(), "Z");
        assert_eq!(Keycode::N5.display_name(), "5");
        assert_eq!(Keycode::Tab.display_name(), "Tab");
    }
}

use std::fmt;
use std::str::FromStr;

use serde_with::SerializeDisplay;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::handlers::FrameCodecError;

/// First byte of every command frame.
pub const START_FLAG: u8 = 0xAA;
/// Identifier of the controlling host.
pub const HOST_ID: u8 = 0x02;
/// Last byte of every command frame.
pub const END_FLAG: u8 = 0xF5;
/// Option byte that requests a status reply without changing settings.
pub const OPTION_QUERY: u8 = 0xA5;
/// Option byte that applies the mode and speeds carried by the frame.
pub const OPTION_NEW: u8 = 0x5A;
/// Length of an encoded command frame.
pub const COMMAND_FRAME_LEN: usize = 9;
/// Number of bytes the controller answers with.
pub const RESPONSE_FRAME_LEN: usize = 11;
/// Smallest reply that still covers every decoded offset.
pub const MIN_RESPONSE_LEN: usize = 9;
/// Sub-address used when none is configured.
pub const DEFAULT_ADDRESS: WireCode = WireCode(0x01);

/// One protocol byte, written as two lowercase hex digits on the wire side of
/// the API.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    Eq,
    PartialEq,
    Hash,
    derive_more::From,
    derive_more::Into,
    SerializeDisplay,
)]
pub struct WireCode(u8);

impl WireCode {
    /// The `00` code, used for "off" in every field.
    pub const ZERO: Self = Self(0x00);

    /// Creates a code from a raw byte.
    ///
    /// ```
    /// use broan::WireCode;
    ///
    /// assert_eq!("5a", WireCode::new(0x5A).to_string());
    /// ```
    #[must_use]
    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    /// Returns the raw byte.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Parses exactly two hex digits, naming `field` in the error.
    ///
    /// # Errors
    ///
    /// Returns [`FrameCodecError::MalformedInput`] when `value` is not a
    /// two-digit hex code.
    ///
    /// ```
    /// use broan::{FrameCodecError, WireCode};
    ///
    /// assert_eq!(WireCode::new(0xA5), WireCode::parse_field("option", "a5")?);
    /// assert!(matches!(
    ///     WireCode::parse_field("mode", "5"),
    ///     Err(FrameCodecError::MalformedInput { field: "mode", .. })
    /// ));
    /// # Ok::<(), broan::FrameCodecError>(())
    /// ```
    pub fn parse_field(field: &'static str, value: &str) -> Result<Self, FrameCodecError> {
        let malformed = || FrameCodecError::MalformedInput {
            field,
            value: value.to_string(),
        };
        if value.len() != 2 || !value.bytes().all(|byte| byte.is_ascii_hexdigit()) {
            return Err(malformed());
        }
        u8::from_str_radix(value, 16)
            .map(Self)
            .map_err(|_error| malformed())
    }
}

impl fmt::Display for WireCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}", self.0)
    }
}

impl FromStr for WireCode {
    type Err = FrameCodecError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse_field("code", value)
    }
}

/// Motor speed step shared by both motors.
#[derive(
    Debug,
    Clone,
    Copy,
    Eq,
    PartialEq,
    Hash,
    EnumIter,
    EnumString,
    IntoStaticStr,
    Display,
    SerializeDisplay,
)]
#[strum(serialize_all = "lowercase")]
pub enum SpeedLevel {
    Off,
    Low,
    Medium,
    High,
}

impl SpeedLevel {
    /// Speeds in ascending order, excluding `Off`.
    pub const ORDERED: [Self; 3] = [Self::Low, Self::Medium, Self::High];

    /// Returns the wire code for this speed.
    #[must_use]
    pub const fn code(self) -> WireCode {
        match self {
            Self::Off => WireCode(0x00),
            Self::Low => WireCode(0x01),
            Self::Medium => WireCode(0x02),
            Self::High => WireCode(0x03),
        }
    }

    /// Decodes a wire code, treating unknown codes as `Off`.
    ///
    /// ```
    /// use broan::{SpeedLevel, WireCode};
    ///
    /// assert_eq!(SpeedLevel::Medium, SpeedLevel::from_code(WireCode::new(0x02)));
    /// assert_eq!(SpeedLevel::Off, SpeedLevel::from_code(WireCode::new(0x7F)));
    /// ```
    #[must_use]
    pub const fn from_code(code: WireCode) -> Self {
        match code.0 {
            0x01 => Self::Low,
            0x02 => Self::Medium,
            0x03 => Self::High,
            _ => Self::Off,
        }
    }

    /// Returns the lowercase name.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// Operating mode byte. Every variant except `Off` is a user-selectable preset.
#[derive(
    Debug,
    Clone,
    Copy,
    Eq,
    PartialEq,
    Hash,
    EnumIter,
    EnumString,
    IntoStaticStr,
    Display,
    SerializeDisplay,
)]
#[strum(serialize_all = "lowercase")]
pub enum Mode {
    /// Unit stopped.
    Off,
    /// Balanced supply and exhaust.
    Exchange,
    /// Exhaust only; the supply motor stays stopped.
    Exhaust,
    /// Sensor-driven automatic mode.
    Smart,
    /// Both motors at full speed.
    Boost,
    /// Both motors at the lowest speed.
    Saving,
}

impl Mode {
    /// Preset modes in the order they are offered to users.
    pub const PRESETS: [Self; 5] = [
        Self::Exchange,
        Self::Exhaust,
        Self::Smart,
        Self::Boost,
        Self::Saving,
    ];

    /// Returns the wire code for this mode.
    #[must_use]
    pub const fn code(self) -> WireCode {
        match self {
            Self::Off => WireCode(0x00),
            Self::Exchange => WireCode(0x01),
            Self::Exhaust => WireCode(0x02),
            Self::Smart => WireCode(0x03),
            Self::Boost => WireCode(0x04),
            Self::Saving => WireCode(0x05),
        }
    }

    /// Decodes a wire code, treating unknown codes as `Off`.
    #[must_use]
    pub const fn from_code(code: WireCode) -> Self {
        match code.0 {
            0x01 => Self::Exchange,
            0x02 => Self::Exhaust,
            0x03 => Self::Smart,
            0x04 => Self::Boost,
            0x05 => Self::Saving,
            _ => Self::Off,
        }
    }

    /// Returns the lowercase name.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Returns the mode as a preset, or `None` for `Off`.
    #[must_use]
    pub const fn as_preset(self) -> Option<Self> {
        match self {
            Self::Off => None,
            preset => Some(preset),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use strum::IntoEnumIterator;

    use super::*;

    #[rstest]
    #[case("00", 0x00)]
    #[case("5a", 0x5A)]
    #[case("A5", 0xA5)]
    #[case("ff", 0xFF)]
    fn wire_code_parses_two_hex_digits(#[case] input: &str, #[case] expected: u8) {
        let code: WireCode = input.parse().expect("two hex digits should parse");
        assert_eq!(expected, code.value());
    }

    #[rstest]
    #[case("")]
    #[case("5")]
    #[case("123")]
    #[case("zz")]
    #[case("+5")]
    fn wire_code_rejects_malformed_input(#[case] input: &str) {
        let result = WireCode::parse_field("m1_speed", input);
        assert_matches!(
            result,
            Err(FrameCodecError::MalformedInput { field: "m1_speed", value }) if value == input
        );
    }

    #[test]
    fn wire_code_renders_zero_padded_lowercase() {
        assert_eq!("0a", WireCode::new(0x0A).to_string());
        assert_eq!("f5", WireCode::new(END_FLAG).to_string());
    }

    #[test]
    fn every_mode_code_decodes_back_to_itself() {
        for mode in Mode::iter() {
            assert_eq!(mode, Mode::from_code(mode.code()));
        }
    }

    #[test]
    fn unknown_mode_code_falls_back_to_off() {
        assert_eq!(Mode::Off, Mode::from_code(WireCode::new(0x42)));
        assert_eq!(None, Mode::from_code(WireCode::new(0x42)).as_preset());
    }

    #[test]
    fn presets_exclude_off() {
        assert!(!Mode::PRESETS.contains(&Mode::Off));
        assert_eq!(Mode::iter().count() - 1, Mode::PRESETS.len());
    }

    #[test]
    fn names_parse_back_through_from_str() {
        assert_eq!(Ok(Mode::Exhaust), "exhaust".parse::<Mode>());
        assert_eq!(Ok(SpeedLevel::High), "high".parse::<SpeedLevel>());
    }
}

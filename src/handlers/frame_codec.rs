use std::fmt;

use thiserror::Error;

use crate::protocol::{
    COMMAND_FRAME_LEN, END_FLAG, HOST_ID, MIN_RESPONSE_LEN, OPTION_NEW, OPTION_QUERY, START_FLAG,
    WireCode,
};

const MODE_OFFSET: usize = 3;
const M1_SPEED_OFFSET: usize = 4;
const M2_SPEED_OFFSET: usize = 5;
const TEMPERATURE_OFFSET: usize = 6;
const HUMIDITY_OFFSET: usize = 7;
const FAULT_OFFSET: usize = 8;

// Fault byte bits, numbered MSB-first: 2 and 3 are the motors, 6 and 7 the sensors.
const FAULT_M1_MOTOR: u8 = 0b0010_0000;
const FAULT_M2_MOTOR: u8 = 0b0001_0000;
const FAULT_TEMPERATURE_SENSOR: u8 = 0b0000_0010;
const FAULT_HUMIDITY_SENSOR: u8 = 0b0000_0001;

const NORMAL_STATUS: &str = "normal";

/// Errors returned by frame encoding and decoding.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum FrameCodecError {
    /// A command field is not a two-digit hex code.
    #[error("invalid {field} code `{value}`: expected two hex digits")]
    MalformedInput { field: &'static str, value: String },
    /// The checksum is below `0x10` and legacy rendering drops its leading zero.
    #[error(
        "checksum {checksum:#04x} has a single hex digit and cannot be rendered without zero padding"
    )]
    ChecksumNotRepresentable { checksum: u8 },
    /// The response is too short for the decoded offsets.
    #[error("response frame is too short: expected at least {expected} bytes, got {actual}")]
    ShortResponse { expected: usize, actual: usize },
}

/// How the checksum byte is rendered into the frame.
///
/// The controller vendor's own software formats the checksum as hex without
/// zero padding. Values of `0x10` and above are unaffected; lower values
/// cannot form a 9-byte frame in that scheme. Whether real units accept a
/// padded checksum has not been confirmed against hardware.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum ChecksumPadding {
    /// Reject checksums that would lose their leading zero.
    #[default]
    Legacy,
    /// Always emit the checksum as a full byte.
    ZeroPadded,
}

/// Mode, speed, and option fields of one command.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct CommandFields {
    mode: WireCode,
    m1_speed: WireCode,
    m2_speed: WireCode,
    option: Option<WireCode>,
}

impl CommandFields {
    /// Creates a "set" command; the option byte defaults to `0x5A`.
    #[must_use]
    pub const fn new(mode: WireCode, m1_speed: WireCode, m2_speed: WireCode) -> Self {
        Self {
            mode,
            m1_speed,
            m2_speed,
            option: None,
        }
    }

    /// Creates the status query command (`00 00 00 a5`).
    #[must_use]
    pub const fn query() -> Self {
        Self {
            mode: WireCode::ZERO,
            m1_speed: WireCode::ZERO,
            m2_speed: WireCode::ZERO,
            option: Some(WireCode::new(OPTION_QUERY)),
        }
    }

    /// Overrides the option byte.
    #[must_use]
    pub const fn with_option(mut self, option: WireCode) -> Self {
        self.option = Some(option);
        self
    }

    /// Parses command fields from two-digit hex codes.
    ///
    /// # Errors
    ///
    /// Returns [`FrameCodecError::MalformedInput`] naming the first field
    /// that is not a two-digit hex code.
    ///
    /// ```
    /// use broan::CommandFields;
    ///
    /// let fields = CommandFields::parse("01", "02", "02", None)?;
    /// assert_eq!("5a", fields.option().to_string());
    /// # Ok::<(), broan::FrameCodecError>(())
    /// ```
    pub fn parse(
        mode: &str,
        m1_speed: &str,
        m2_speed: &str,
        option: Option<&str>,
    ) -> Result<Self, FrameCodecError> {
        let fields = Self::new(
            WireCode::parse_field("mode", mode)?,
            WireCode::parse_field("m1_speed", m1_speed)?,
            WireCode::parse_field("m2_speed", m2_speed)?,
        );
        match option {
            Some(option) => Ok(fields.with_option(WireCode::parse_field("option", option)?)),
            None => Ok(fields),
        }
    }

    #[must_use]
    pub const fn mode(&self) -> WireCode {
        self.mode
    }

    #[must_use]
    pub const fn m1_speed(&self) -> WireCode {
        self.m1_speed
    }

    #[must_use]
    pub const fn m2_speed(&self) -> WireCode {
        self.m2_speed
    }

    /// Returns the option byte, falling back to the "new option" constant.
    #[must_use]
    pub const fn option(&self) -> WireCode {
        match self.option {
            Some(option) => option,
            None => WireCode::new(OPTION_NEW),
        }
    }
}

/// Encoded 9-byte command frame.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct CommandFrame([u8; COMMAND_FRAME_LEN]);

impl CommandFrame {
    /// Returns the encoded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub const fn address(&self) -> WireCode {
        WireCode::new(self.0[1])
    }

    #[must_use]
    pub const fn mode(&self) -> WireCode {
        WireCode::new(self.0[3])
    }

    #[must_use]
    pub const fn m1_speed(&self) -> WireCode {
        WireCode::new(self.0[4])
    }

    #[must_use]
    pub const fn m2_speed(&self) -> WireCode {
        WireCode::new(self.0[5])
    }

    #[must_use]
    pub const fn option(&self) -> WireCode {
        WireCode::new(self.0[6])
    }

    #[must_use]
    pub const fn checksum(&self) -> u8 {
        self.0[7]
    }

    /// Returns whether this frame only asks for status.
    #[must_use]
    pub const fn is_query(&self) -> bool {
        self.0[6] == OPTION_QUERY
    }
}

impl fmt::Display for CommandFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Motor and sensor fault bits from the status reply.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct FaultFlags(u8);

impl FaultFlags {
    /// Keeps only the four known fault bits of a raw fault byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Self {
        Self(
            byte & (FAULT_M1_MOTOR
                | FAULT_M2_MOTOR
                | FAULT_TEMPERATURE_SENSOR
                | FAULT_HUMIDITY_SENSOR),
        )
    }

    /// Builds flags from individual faults.
    #[must_use]
    pub const fn new(
        m1_motor: bool,
        m2_motor: bool,
        temperature_sensor: bool,
        humidity_sensor: bool,
    ) -> Self {
        let mut byte = 0;
        if m1_motor {
            byte |= FAULT_M1_MOTOR;
        }
        if m2_motor {
            byte |= FAULT_M2_MOTOR;
        }
        if temperature_sensor {
            byte |= FAULT_TEMPERATURE_SENSOR;
        }
        if humidity_sensor {
            byte |= FAULT_HUMIDITY_SENSOR;
        }
        Self(byte)
    }

    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn m1_motor(self) -> bool {
        self.0 & FAULT_M1_MOTOR != 0
    }

    #[must_use]
    pub const fn m2_motor(self) -> bool {
        self.0 & FAULT_M2_MOTOR != 0
    }

    #[must_use]
    pub const fn temperature_sensor(self) -> bool {
        self.0 & FAULT_TEMPERATURE_SENSOR != 0
    }

    #[must_use]
    pub const fn humidity_sensor(self) -> bool {
        self.0 & FAULT_HUMIDITY_SENSOR != 0
    }

    #[must_use]
    pub const fn is_normal(self) -> bool {
        self.0 == 0
    }

    /// Describes the active faults in M1, M2, temperature, humidity order,
    /// or returns `"normal"`.
    ///
    /// ```
    /// use broan::FaultFlags;
    ///
    /// assert_eq!("normal", FaultFlags::from_byte(0x00).description());
    /// assert_eq!(
    ///     "M1 motor fault, humidity sensor fault",
    ///     FaultFlags::from_byte(0b0010_0001).description()
    /// );
    /// ```
    #[must_use]
    pub fn description(self) -> String {
        let phrases: Vec<&str> = [
            (self.m1_motor(), "M1 motor fault"),
            (self.m2_motor(), "M2 motor fault"),
            (self.temperature_sensor(), "temperature sensor fault"),
            (self.humidity_sensor(), "humidity sensor fault"),
        ]
        .into_iter()
        .filter_map(|(active, phrase)| active.then_some(phrase))
        .collect();

        if phrases.is_empty() {
            NORMAL_STATUS.to_string()
        } else {
            phrases.join(", ")
        }
    }
}

/// Fields decoded from a status reply.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ResponseFields {
    mode: WireCode,
    m1_speed: WireCode,
    m2_speed: WireCode,
    temperature: i16,
    humidity: u8,
    faults: FaultFlags,
}

impl ResponseFields {
    #[must_use]
    pub const fn mode(&self) -> WireCode {
        self.mode
    }

    #[must_use]
    pub const fn m1_speed(&self) -> WireCode {
        self.m1_speed
    }

    #[must_use]
    pub const fn m2_speed(&self) -> WireCode {
        self.m2_speed
    }

    /// Temperature in whole degrees.
    #[must_use]
    pub const fn temperature(&self) -> i16 {
        self.temperature
    }

    /// Raw humidity byte, unscaled.
    #[must_use]
    pub const fn humidity(&self) -> u8 {
        self.humidity
    }

    #[must_use]
    pub const fn faults(&self) -> FaultFlags {
        self.faults
    }
}

/// Encoder and decoder for controller frames.
pub struct FrameCodec;

impl FrameCodec {
    /// Returns the low byte of the sum of `bytes`.
    ///
    /// ```
    /// use broan::FrameCodec;
    ///
    /// assert_eq!(0xA7, FrameCodec::checksum(&[0x02, 0x00, 0x00, 0x00, 0xA5]));
    /// ```
    #[must_use]
    pub fn checksum(bytes: &[u8]) -> u8 {
        bytes
            .iter()
            .fold(0u8, |sum, byte| sum.wrapping_add(*byte))
    }

    /// Encodes a command frame for the unit at `address`.
    ///
    /// The checksum covers the host id, mode, both speeds, and the option byte.
    ///
    /// # Errors
    ///
    /// Returns [`FrameCodecError::ChecksumNotRepresentable`] when `padding`
    /// is [`ChecksumPadding::Legacy`] and the checksum is below `0x10`.
    ///
    /// ```
    /// use broan::{ChecksumPadding, CommandFields, FrameCodec, WireCode};
    ///
    /// let frame = FrameCodec::build_command(
    ///     WireCode::new(0x00),
    ///     CommandFields::query(),
    ///     ChecksumPadding::Legacy,
    /// )?;
    /// assert_eq!("aa0002000000a5a7f5", frame.to_string());
    /// # Ok::<(), broan::FrameCodecError>(())
    /// ```
    pub fn build_command(
        address: WireCode,
        fields: CommandFields,
        padding: ChecksumPadding,
    ) -> Result<CommandFrame, FrameCodecError> {
        let payload = [
            address.value(),
            HOST_ID,
            fields.mode().value(),
            fields.m1_speed().value(),
            fields.m2_speed().value(),
            fields.option().value(),
        ];
        let checksum = Self::checksum(&payload[1..]);
        if padding == ChecksumPadding::Legacy && checksum < 0x10 {
            return Err(FrameCodecError::ChecksumNotRepresentable { checksum });
        }

        let mut frame = [0u8; COMMAND_FRAME_LEN];
        frame[0] = START_FLAG;
        frame[1..7].copy_from_slice(&payload);
        frame[7] = checksum;
        frame[8] = END_FLAG;
        Ok(CommandFrame(frame))
    }

    /// Decodes a status reply by position.
    ///
    /// Flags and checksum of the reply are not verified.
    ///
    /// # Errors
    ///
    /// Returns [`FrameCodecError::ShortResponse`] when fewer than 9 bytes are
    /// available.
    ///
    /// ```
    /// use broan::FrameCodec;
    ///
    /// let reply = [0xAA, 0x01, 0x02, 0x01, 0x02, 0x02, 0x19, 0x37, 0x00, 0x00, 0xF5];
    /// let fields = FrameCodec::parse_response(&reply)?;
    /// assert_eq!(25, fields.temperature());
    /// assert_eq!(55, fields.humidity());
    /// # Ok::<(), broan::FrameCodecError>(())
    /// ```
    pub fn parse_response(bytes: &[u8]) -> Result<ResponseFields, FrameCodecError> {
        if bytes.len() < MIN_RESPONSE_LEN {
            return Err(FrameCodecError::ShortResponse {
                expected: MIN_RESPONSE_LEN,
                actual: bytes.len(),
            });
        }

        Ok(ResponseFields {
            mode: WireCode::new(bytes[MODE_OFFSET]),
            m1_speed: WireCode::new(bytes[M1_SPEED_OFFSET]),
            m2_speed: WireCode::new(bytes[M2_SPEED_OFFSET]),
            temperature: Self::decode_temperature(bytes[TEMPERATURE_OFFSET]),
            humidity: bytes[HUMIDITY_OFFSET],
            faults: FaultFlags::from_byte(bytes[FAULT_OFFSET]),
        })
    }

    /// Decodes the temperature byte.
    ///
    /// Bit 7 carries the sign but the magnitude is the whole byte, so `0x85`
    /// decodes to `-133` rather than the two's-complement `-123`. This matches
    /// the vendor software and still needs verifying on hardware.
    ///
    /// ```
    /// use broan::FrameCodec;
    ///
    /// assert_eq!(25, FrameCodec::decode_temperature(0x19));
    /// assert_eq!(-133, FrameCodec::decode_temperature(0x85));
    /// ```
    #[must_use]
    pub fn decode_temperature(byte: u8) -> i16 {
        let magnitude = i16::from(byte);
        if byte & 0x80 == 0 {
            magnitude
        } else {
            -magnitude
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn reply(mode: u8, m1: u8, m2: u8, temperature: u8, humidity: u8, faults: u8) -> [u8; 11] {
        [
            0xAA,
            0x01,
            HOST_ID,
            mode,
            m1,
            m2,
            temperature,
            humidity,
            faults,
            0x00,
            END_FLAG,
        ]
    }

    #[test]
    fn query_frame_matches_protocol() {
        let frame = FrameCodec::build_command(
            WireCode::new(0x00),
            CommandFields::query(),
            ChecksumPadding::Legacy,
        )
        .expect("query frame should encode");
        assert_eq!(
            &[0xAA, 0x00, 0x02, 0x00, 0x00, 0x00, 0xA5, 0xA7, 0xF5],
            frame.as_bytes()
        );
        assert!(frame.is_query());
    }

    #[rstest]
    #[case("00", "00", "00", None)]
    #[case("01", "03", "03", None)]
    #[case("02", "00", "02", Some("5a"))]
    #[case("05", "01", "01", Some("a5"))]
    fn frames_are_nine_bytes_with_fixed_flags(
        #[case] mode: &str,
        #[case] m1: &str,
        #[case] m2: &str,
        #[case] option: Option<&str>,
    ) {
        let fields = CommandFields::parse(mode, m1, m2, option).expect("fields should parse");
        let frame = FrameCodec::build_command(WireCode::new(0x01), fields, ChecksumPadding::Legacy)
            .expect("frame should encode");
        let bytes = frame.as_bytes();
        assert_eq!(COMMAND_FRAME_LEN, bytes.len());
        assert_eq!(START_FLAG, bytes[0]);
        assert_eq!(HOST_ID, bytes[2]);
        assert_eq!(END_FLAG, bytes[8]);
    }

    #[test]
    fn set_frame_defaults_to_new_option() {
        let fields = CommandFields::parse("01", "02", "02", None).expect("fields should parse");
        let frame = FrameCodec::build_command(WireCode::new(0x01), fields, ChecksumPadding::Legacy)
            .expect("frame should encode");
        assert_eq!(WireCode::new(OPTION_NEW), frame.option());
        // 02 + 01 + 02 + 02 + 5a
        assert_eq!(0x61, frame.checksum());
        assert_eq!("aa01020102025a61f5", frame.to_string());
    }

    #[test]
    fn checksum_excludes_address_byte() {
        let fields = CommandFields::query();
        let low = FrameCodec::build_command(WireCode::new(0x00), fields, ChecksumPadding::Legacy)
            .expect("frame should encode");
        let high = FrameCodec::build_command(WireCode::new(0x7F), fields, ChecksumPadding::Legacy)
            .expect("frame should encode");
        assert_eq!(low.checksum(), high.checksum());
    }

    #[test]
    fn checksum_keeps_low_byte_of_overflowing_sum() {
        let fields = CommandFields::parse("ff", "ff", "ff", Some("ff")).expect("fields should parse");
        let frame = FrameCodec::build_command(WireCode::new(0x01), fields, ChecksumPadding::Legacy)
            .expect("frame should encode");
        // 0x02 + 4 * 0xff = 0x3fe
        assert_eq!(0xFE, frame.checksum());
    }

    #[test]
    fn legacy_padding_rejects_single_digit_checksum() {
        let fields = CommandFields::parse("00", "00", "00", Some("00")).expect("fields should parse");
        let result = FrameCodec::build_command(WireCode::new(0x01), fields, ChecksumPadding::Legacy);
        assert_matches!(
            result,
            Err(FrameCodecError::ChecksumNotRepresentable { checksum: 0x02 })
        );
    }

    #[test]
    fn zero_padded_checksum_emits_full_byte() {
        let fields = CommandFields::parse("00", "00", "00", Some("00")).expect("fields should parse");
        let frame =
            FrameCodec::build_command(WireCode::new(0x01), fields, ChecksumPadding::ZeroPadded)
                .expect("padded frame should encode");
        assert_eq!(0x02, frame.checksum());
        assert_eq!(COMMAND_FRAME_LEN, frame.as_bytes().len());
    }

    #[rstest]
    #[case("1", "00", "00", "mode")]
    #[case("00", "xx", "00", "m1_speed")]
    #[case("00", "00", "100", "m2_speed")]
    fn parse_rejects_malformed_fields(
        #[case] mode: &str,
        #[case] m1: &str,
        #[case] m2: &str,
        #[case] expected_field: &str,
    ) {
        let result = CommandFields::parse(mode, m1, m2, None);
        assert_matches!(
            result,
            Err(FrameCodecError::MalformedInput { field, .. }) if field == expected_field
        );
    }

    #[test]
    fn parse_rejects_malformed_option() {
        let result = CommandFields::parse("00", "00", "00", Some("a"));
        assert_matches!(
            result,
            Err(FrameCodecError::MalformedInput { field: "option", .. })
        );
    }

    #[test]
    fn parse_response_reads_fields_by_offset() {
        let fields = FrameCodec::parse_response(&reply(0x02, 0x00, 0x03, 0x19, 0x41, 0x00))
            .expect("full reply should decode");
        assert_eq!(WireCode::new(0x02), fields.mode());
        assert_eq!(WireCode::new(0x00), fields.m1_speed());
        assert_eq!(WireCode::new(0x03), fields.m2_speed());
        assert_eq!(25, fields.temperature());
        assert_eq!(65, fields.humidity());
        assert!(fields.faults().is_normal());
    }

    #[rstest]
    #[case(0x00, 0)]
    #[case(0x19, 25)]
    #[case(0x7F, 127)]
    #[case(0x80, -128)]
    #[case(0x85, -133)]
    #[case(0xFF, -255)]
    fn temperature_uses_whole_byte_magnitude(#[case] byte: u8, #[case] expected: i16) {
        assert_eq!(expected, FrameCodec::decode_temperature(byte));
    }

    #[test]
    fn humidity_is_unscaled() {
        let fields = FrameCodec::parse_response(&reply(0x01, 0x01, 0x01, 0x00, 0xFF, 0x00))
            .expect("full reply should decode");
        assert_eq!(255, fields.humidity());
    }

    #[rstest]
    #[case(0b0000_0000, "normal")]
    #[case(0b0010_0001, "M1 motor fault, humidity sensor fault")]
    #[case(0b0001_0000, "M2 motor fault")]
    #[case(0b0000_0010, "temperature sensor fault")]
    #[case(
        0b0011_0011,
        "M1 motor fault, M2 motor fault, temperature sensor fault, humidity sensor fault"
    )]
    #[case(0b1100_1100, "normal")]
    fn fault_byte_decodes_known_bits(#[case] byte: u8, #[case] expected: &str) {
        let fields = FrameCodec::parse_response(&reply(0x01, 0x01, 0x01, 0x19, 0x30, byte))
            .expect("full reply should decode");
        assert_eq!(expected, fields.faults().description());
    }

    #[test]
    fn fault_flags_constructor_matches_bit_positions() {
        let flags = FaultFlags::new(true, false, false, true);
        assert_eq!(0b0010_0001, flags.bits());
        assert!(flags.m1_motor());
        assert!(!flags.m2_motor());
        assert!(!flags.temperature_sensor());
        assert!(flags.humidity_sensor());
    }

    #[test]
    fn parse_response_accepts_nine_byte_reply() {
        let full = reply(0x01, 0x02, 0x02, 0x19, 0x30, 0x00);
        let fields = FrameCodec::parse_response(&full[..9]).expect("nine bytes cover every offset");
        assert_eq!(WireCode::new(0x02), fields.m2_speed());
    }

    #[rstest]
    #[case(0)]
    #[case(3)]
    #[case(8)]
    fn parse_response_rejects_truncated_reply(#[case] len: usize) {
        let full = reply(0x01, 0x02, 0x02, 0x19, 0x30, 0x00);
        let result = FrameCodec::parse_response(&full[..len]);
        assert_matches!(
            result,
            Err(FrameCodecError::ShortResponse { expected: 9, actual }) if actual == len
        );
    }
}

use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use bon::Builder;
use tracing::debug;

use super::hardware::Transport;
use crate::error::{FixtureError, TransportError};
use crate::handlers::{FaultFlags, FrameCodec};
use crate::protocol::{
    COMMAND_FRAME_LEN, DEFAULT_ADDRESS, END_FLAG, HOST_ID, OPTION_QUERY, RESPONSE_FRAME_LEN,
    START_FLAG, WireCode,
};
use crate::utils::format_hex;

// 22 degrees, 45 raw humidity
const DEFAULT_TEMPERATURE_BYTE: u8 = 0x16;
const DEFAULT_HUMIDITY: u8 = 0x2D;

/// Parsed fake hex payload.
#[derive(Debug, Clone, Eq, PartialEq, derive_more::Into)]
pub struct HexPayload {
    payload: Vec<u8>,
}

impl FromStr for HexPayload {
    type Err = FixtureError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let cleaned: String = value.chars().filter(|c| !c.is_whitespace()).collect();
        let payload = hex::decode(cleaned)?;
        Ok(Self { payload })
    }
}

/// Register contents of the simulated controller.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct SimulatedUnit {
    mode: WireCode,
    m1_speed: WireCode,
    m2_speed: WireCode,
    temperature_byte: u8,
    humidity: u8,
    faults: FaultFlags,
}

impl SimulatedUnit {
    /// Creates a stopped unit with the given sensor bytes.
    #[must_use]
    pub const fn new(temperature_byte: u8, humidity: u8, faults: FaultFlags) -> Self {
        Self {
            mode: WireCode::ZERO,
            m1_speed: WireCode::ZERO,
            m2_speed: WireCode::ZERO,
            temperature_byte,
            humidity,
            faults,
        }
    }

    /// Sets the running mode and speeds.
    #[must_use]
    pub const fn running(mut self, mode: WireCode, m1_speed: WireCode, m2_speed: WireCode) -> Self {
        self.mode = mode;
        self.m1_speed = m1_speed;
        self.m2_speed = m2_speed;
        self
    }

    fn apply(&mut self, frame: &[u8]) {
        self.mode = WireCode::new(frame[3]);
        self.m1_speed = WireCode::new(frame[4]);
        self.m2_speed = WireCode::new(frame[5]);
    }

    fn reply(&self, address: WireCode) -> Vec<u8> {
        let mut reply = vec![
            START_FLAG,
            address.value(),
            HOST_ID,
            self.mode.value(),
            self.m1_speed.value(),
            self.m2_speed.value(),
            self.temperature_byte,
            self.humidity,
            self.faults.bits(),
        ];
        reply.push(FrameCodec::checksum(&reply[2..]));
        reply.push(END_FLAG);
        debug_assert_eq!(RESPONSE_FRAME_LEN, reply.len());
        reply
    }
}

impl Default for SimulatedUnit {
    fn default() -> Self {
        Self::new(
            DEFAULT_TEMPERATURE_BYTE,
            DEFAULT_HUMIDITY,
            FaultFlags::default(),
        )
    }
}

/// Settings for constructing a fake transport.
#[derive(Debug, Builder)]
pub struct FakeTransportConfig {
    #[builder(default = DEFAULT_ADDRESS)]
    address: WireCode,
    #[builder(default)]
    unit: SimulatedUnit,
    /// Reply returned verbatim for every exchange instead of simulating.
    fixed_reply: Option<HexPayload>,
    /// Number of leading exchanges that fail with a link error.
    #[builder(default)]
    failures: usize,
}

/// Frames received by a [`FakeTransport`], shared with the test that owns it.
#[derive(Debug, Clone, Default)]
pub struct FrameLog {
    frames: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl FrameLog {
    /// Returns a copy of every frame received so far.
    #[must_use]
    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn push(&self, frame: &[u8]) {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(frame.to_vec());
    }
}

/// In-process controller used in tests and non-hardware environments.
///
/// Query frames are answered from the simulated registers; any other
/// well-formed frame overwrites mode and speeds first.
#[derive(Debug)]
pub struct FakeTransport {
    address: WireCode,
    unit: Mutex<SimulatedUnit>,
    fixed_reply: Option<Vec<u8>>,
    remaining_failures: AtomicUsize,
    log: FrameLog,
}

impl FakeTransport {
    #[must_use]
    pub fn new(config: FakeTransportConfig) -> Self {
        Self {
            address: config.address,
            unit: Mutex::new(config.unit),
            fixed_reply: config.fixed_reply.map(Into::into),
            remaining_failures: AtomicUsize::new(config.failures),
            log: FrameLog::default(),
        }
    }

    /// Returns a handle to the frames this transport receives.
    #[must_use]
    pub fn frame_log(&self) -> FrameLog {
        self.log.clone()
    }

    fn take_failure(&self) -> bool {
        self.remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
                remaining.checked_sub(1)
            })
            .is_ok()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn exchange(&self, frame: &[u8]) -> Result<Vec<u8>, TransportError> {
        self.log.push(frame);
        debug!(frame = %format_hex(frame), "fake controller received frame");

        if self.take_failure() {
            return Err(TransportError::Simulated);
        }
        if let Some(reply) = &self.fixed_reply {
            return Ok(reply.clone());
        }

        let mut unit = self.unit.lock().unwrap_or_else(PoisonError::into_inner);
        if frame.len() == COMMAND_FRAME_LEN && frame[6] != OPTION_QUERY {
            unit.apply(frame);
        }
        Ok(unit.reply(self.address))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    use super::*;

    const QUERY: [u8; 9] = [0xAA, 0x01, 0x02, 0x00, 0x00, 0x00, 0xA5, 0xA7, 0xF5];
    const SET_EXCHANGE_MEDIUM: [u8; 9] = [0xAA, 0x01, 0x02, 0x01, 0x02, 0x02, 0x5A, 0x61, 0xF5];

    #[test]
    fn hex_payload_ignores_whitespace() {
        let payload: HexPayload = "aa 01 02".parse().expect("hex should parse");
        assert_eq!(vec![0xAA, 0x01, 0x02], Vec::from(payload));
    }

    #[test]
    fn hex_payload_rejects_odd_length() {
        let result = "abc".parse::<HexPayload>();
        assert_matches!(result, Err(FixtureError::InvalidHex(_)));
    }

    #[tokio::test]
    async fn query_reports_default_unit() {
        let transport = FakeTransport::new(FakeTransportConfig::builder().build());
        let reply = transport.exchange(&QUERY).await.expect("fake exchange should succeed");
        assert_eq!(
            vec![0xAA, 0x01, 0x02, 0x00, 0x00, 0x00, 0x16, 0x2D, 0x00, 0x45, 0xF5],
            reply
        );
    }

    #[tokio::test]
    async fn set_frame_updates_simulated_registers() {
        let transport = FakeTransport::new(FakeTransportConfig::builder().build());
        transport
            .exchange(&SET_EXCHANGE_MEDIUM)
            .await
            .expect("fake exchange should succeed");
        let reply = transport.exchange(&QUERY).await.expect("fake exchange should succeed");
        assert_eq!(&[0x01, 0x02, 0x02], &reply[3..6]);
        assert_eq!(2, transport.frame_log().frames().len());
    }

    #[tokio::test]
    async fn injected_failures_precede_successful_exchanges() {
        let transport = FakeTransport::new(FakeTransportConfig::builder().failures(1).build());
        let first = transport.exchange(&QUERY).await;
        assert_matches!(first, Err(TransportError::Simulated));
        let second = transport.exchange(&QUERY).await;
        assert_matches!(second, Ok(reply) if reply.len() == RESPONSE_FRAME_LEN);
    }

    #[tokio::test]
    async fn fixed_reply_is_returned_verbatim() {
        let fixed: HexPayload = "aa0102".parse().expect("hex should parse");
        let transport = FakeTransport::new(
            FakeTransportConfig::builder()
                .fixed_reply(fixed)
                .build(),
        );
        let reply = transport.exchange(&QUERY).await.expect("fake exchange should succeed");
        assert_eq!(vec![0xAA, 0x01, 0x02], reply);
    }
}

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use crate::handlers::FrameCodecError;

/// Stage of a TCP exchange that ran out of time.
#[derive(Debug, Clone, Copy, Eq, PartialEq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ExchangeStage {
    Connect,
    Send,
    Receive,
}

/// Errors returned by the transport while exchanging one frame.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to resolve controller host `{host}`")]
    Resolve {
        host: String,
        source: std::io::Error,
    },
    #[error("controller host `{host}` did not resolve to any address")]
    NoAddress { host: String },
    #[error("failed to connect to controller at {addr}")]
    Connect {
        addr: SocketAddr,
        source: std::io::Error,
    },
    #[error("failed to send frame to controller")]
    Send { source: std::io::Error },
    #[error("failed to receive reply from controller")]
    Receive { source: std::io::Error },
    #[error("controller {stage} timed out after {after:?}")]
    Timeout {
        stage: ExchangeStage,
        after: Duration,
    },
    #[error("simulated controller link failure")]
    Simulated,
}

/// Errors returned by the device session.
///
/// Every transport failure collapses into `Communication`; the original
/// cause stays available through `source()`.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("invalid command input")]
    MalformedInput(#[source] FrameCodecError),
    #[error("communication with the controller failed")]
    Communication(#[from] TransportError),
    #[error("failed to decode controller reply")]
    Decode(#[source] FrameCodecError),
}

/// Errors returned when parsing fake transport fixtures.
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("fixture payload is not valid hexadecimal")]
    InvalidHex(#[from] hex::FromHexError),
}

/// Errors returned when validating a device configuration.
#[derive(Debug, Error, Clone, Copy, Eq, PartialEq)]
pub enum ConfigError {
    #[error("controller host must not be empty")]
    EmptyHost,
    #[error("controller port must be greater than zero")]
    ZeroPort,
}

/// Errors returned when resolving runtime connection options.
#[derive(Debug, Error)]
pub(crate) enum CliConfigError {
    #[error("missing controller host; pass --host or set BROAN_HOST")]
    MissingHost,
    #[error("missing controller port; pass --port or set BROAN_PORT")]
    MissingPort,
}

/// Errors returned by telemetry initialisation.
#[derive(Debug, Error)]
pub(crate) enum TelemetryError {
    #[error("failed to install tracing subscriber")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}

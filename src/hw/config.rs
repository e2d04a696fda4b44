use std::time::Duration;

use bon::Builder;

use super::hardware::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_IO_TIMEOUT, TcpTransportConfig, TransportBackend,
    transport_from_backend,
};
use super::fake_backend::FakeTransportConfig;
use super::model::DeviceAddress;
use super::session::DeviceSession;
use crate::error::ConfigError;
use crate::handlers::ChecksumPadding;
use crate::protocol::{DEFAULT_ADDRESS, WireCode};

/// Connection settings for one controller, consumed once to open a session.
///
/// ```
/// use broan::DeviceConfig;
///
/// let config = DeviceConfig::builder().host("192.168.1.40").port(8899).build();
/// assert_eq!("broan_192.168.1.40_01", config.address().unique_id());
/// ```
#[derive(Debug, Clone, Builder)]
pub struct DeviceConfig {
    #[builder(into)]
    host: String,
    port: u16,
    #[builder(default = DEFAULT_ADDRESS)]
    address: WireCode,
    #[builder(default)]
    checksum_padding: ChecksumPadding,
    #[builder(default = DEFAULT_CONNECT_TIMEOUT)]
    connect_timeout: Duration,
    #[builder(default = DEFAULT_IO_TIMEOUT)]
    io_timeout: Duration,
}

impl DeviceConfig {
    /// Checks the host and port.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty host or a zero port.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if self.port == 0 {
            return Err(ConfigError::ZeroPort);
        }
        Ok(())
    }

    #[must_use]
    pub fn address(&self) -> DeviceAddress {
        DeviceAddress::new(self.host.clone(), self.port, self.address)
    }

    /// Opens a session backed by the TCP transport.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration is invalid.
    pub fn into_session(self) -> Result<DeviceSession, ConfigError> {
        let backend = TransportBackend::Tcp(self.tcp_transport_config());
        self.into_session_with_backend(backend)
    }

    /// Opens a session backed by a simulated controller.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration is invalid.
    pub fn into_fake_session(self, fake: FakeTransportConfig) -> Result<DeviceSession, ConfigError> {
        self.into_session_with_backend(TransportBackend::Fake(fake))
    }

    pub(crate) fn into_session_with_backend(
        self,
        backend: TransportBackend,
    ) -> Result<DeviceSession, ConfigError> {
        self.validate()?;
        let session = DeviceSession::new(self.address(), transport_from_backend(backend))
            .with_checksum_padding(self.checksum_padding);
        Ok(session)
    }

    fn tcp_transport_config(&self) -> TcpTransportConfig {
        TcpTransportConfig::builder()
            .host(self.host.clone())
            .port(self.port)
            .connect_timeout(self.connect_timeout)
            .io_timeout(self.io_timeout)
            .build()
    }
}

use std::fmt::Debug;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use bon::Builder;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, lookup_host};
use tokio::time::timeout;
use tracing::{debug, info, instrument, trace};

use super::fake_backend::{FakeTransport, FakeTransportConfig};
use crate::error::{ExchangeStage, TransportError};
use crate::protocol::RESPONSE_FRAME_LEN;
use crate::utils::format_hex;

pub(crate) const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub(crate) const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(5);

/// Runtime transport selection.
#[derive(Debug)]
pub(crate) enum TransportBackend {
    Tcp(TcpTransportConfig),
    Fake(FakeTransportConfig),
}

/// Builds the transport for the selected runtime backend.
pub(crate) fn transport_from_backend(backend: TransportBackend) -> Box<dyn Transport> {
    match backend {
        TransportBackend::Tcp(config) => Box::new(TcpTransport::new(config)),
        TransportBackend::Fake(config) => {
            info!("using fake controller transport");
            Box::new(FakeTransport::new(config))
        }
    }
}

/// One request/response exchange with a controller.
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    /// Sends `frame` and returns the reply bytes.
    ///
    /// The reply may be shorter than a full frame when the peer closes early;
    /// length checks belong to the decoder.
    async fn exchange(&self, frame: &[u8]) -> Result<Vec<u8>, TransportError>;
}

/// Settings for the TCP transport.
#[derive(Debug, Clone, Builder)]
pub struct TcpTransportConfig {
    host: String,
    port: u16,
    #[builder(default = DEFAULT_CONNECT_TIMEOUT)]
    connect_timeout: Duration,
    #[builder(default = DEFAULT_IO_TIMEOUT)]
    io_timeout: Duration,
}

/// Opens one TCP connection per exchange.
#[derive(Debug)]
pub struct TcpTransport {
    config: TcpTransportConfig,
}

impl TcpTransport {
    #[must_use]
    pub fn new(config: TcpTransportConfig) -> Self {
        Self { config }
    }

    async fn resolve(&self) -> Result<SocketAddr, TransportError> {
        let host = &self.config.host;
        let addrs: Vec<SocketAddr> = lookup_host((host.as_str(), self.config.port))
            .await
            .map_err(|source| TransportError::Resolve {
                host: host.clone(),
                source,
            })?
            .collect();

        addrs
            .iter()
            .find(|addr| addr.is_ipv4())
            .or_else(|| addrs.first())
            .copied()
            .ok_or_else(|| TransportError::NoAddress { host: host.clone() })
    }

    async fn connect(&self) -> Result<TcpStream, TransportError> {
        let connect_timeout = self.config.connect_timeout;
        let attempt = async {
            let addr = self.resolve().await?;
            TcpStream::connect(addr)
                .await
                .map_err(|source| TransportError::Connect { addr, source })
        };

        timeout(connect_timeout, attempt)
            .await
            .map_err(|_elapsed| TransportError::Timeout {
                stage: ExchangeStage::Connect,
                after: connect_timeout,
            })?
    }
}

#[async_trait]
impl Transport for TcpTransport {
    #[instrument(
        skip(self, frame),
        level = "debug",
        fields(host = %self.config.host, port = self.config.port, frame = %format_hex(frame))
    )]
    async fn exchange(&self, frame: &[u8]) -> Result<Vec<u8>, TransportError> {
        let io_timeout = self.config.io_timeout;
        let mut stream = self.connect().await?;

        timeout(io_timeout, stream.write_all(frame))
            .await
            .map_err(|_elapsed| TransportError::Timeout {
                stage: ExchangeStage::Send,
                after: io_timeout,
            })?
            .map_err(|source| TransportError::Send { source })?;

        let reply = timeout(io_timeout, read_reply(&mut stream))
            .await
            .map_err(|_elapsed| TransportError::Timeout {
                stage: ExchangeStage::Receive,
                after: io_timeout,
            })?
            .map_err(|source| TransportError::Receive { source })?;

        if let Err(error) = stream.shutdown().await {
            trace!(?error, "failed to close controller connection cleanly");
        }

        debug!(reply = %format_hex(&reply), "received controller reply");
        Ok(reply)
    }
}

/// Reads until a full reply arrived or the peer closed the connection.
async fn read_reply(stream: &mut TcpStream) -> io::Result<Vec<u8>> {
    let mut reply = vec![0u8; RESPONSE_FRAME_LEN];
    let mut filled = 0usize;
    while filled < RESPONSE_FRAME_LEN {
        let read = stream.read(&mut reply[filled..]).await?;
        if read == 0 {
            break;
        }
        filled += read;
    }
    reply.truncate(filled);
    Ok(reply)
}

use std::time::Duration;

use bon::Builder;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::level_filters::LevelFilter;

use crate::cli::control::ControlArgs;
use crate::cli::decode::DecodeArgs;
use crate::cli::watch::WatchArgs;
use crate::error::{CliConfigError, FixtureError};
use crate::handlers::ChecksumPadding;
use crate::hw::{DeviceConfig, DeviceSession, FakeTransportConfig, HexPayload};
use crate::protocol::{DEFAULT_ADDRESS, WireCode};

const DEFAULT_TIMEOUT: &str = "5s";
const FAKE_HOST: &str = "fake-controller";
const FAKE_PORT: u16 = 8899;

/// Command-line options for the Broan controller tool.
#[derive(Debug, Parser)]
#[command(name = "broan", about = "Query and control Broan ventilation controllers.")]
pub struct Args {
    /// Controller host name or IP address.
    #[arg(long, global = true, env = "BROAN_HOST")]
    host: Option<String>,
    /// Controller TCP port.
    #[arg(long, global = true, env = "BROAN_PORT")]
    port: Option<u16>,
    /// Unit sub-address as two hex digits.
    #[arg(long, global = true, env = "BROAN_ADDRESS", default_value_t = DEFAULT_ADDRESS)]
    address: WireCode,
    /// Connect timeout (e.g. `500ms`, `5s`).
    #[arg(long, global = true, value_parser = parse_duration, default_value = DEFAULT_TIMEOUT)]
    connect_timeout: Duration,
    /// Send and receive timeout (e.g. `500ms`, `5s`).
    #[arg(long, global = true, value_parser = parse_duration, default_value = DEFAULT_TIMEOUT)]
    read_timeout: Duration,
    /// Always emit the checksum byte with a leading zero.
    #[arg(long, global = true)]
    pad_checksum: bool,
    /// Log verbosity; overrides `RUST_LOG`.
    #[arg(long, global = true, value_enum)]
    log_level: Option<LogLevel>,
    /// Output format; defaults to pretty on a terminal and JSON otherwise.
    #[arg(long, global = true, value_enum)]
    output: Option<OutputFormat>,
    /// Uses a simulated controller instead of the network.
    #[arg(long, global = true)]
    fake: bool,
    /// Fixed fake reply as hexadecimal bytes.
    #[arg(long, global = true, requires = "fake")]
    fake_reply: Option<HexPayload>,
    /// Number of fake exchanges that fail before the simulated controller answers.
    #[arg(long, global = true, requires = "fake")]
    fake_failures: Option<usize>,
    #[command(subcommand)]
    command: Command,
}

impl Args {
    /// Returns the requested log-level override.
    #[must_use]
    pub fn log_level(&self) -> Option<LogLevel> {
        self.log_level
    }

    /// Returns the requested output format.
    #[must_use]
    pub fn output_format(&self) -> Option<OutputFormat> {
        self.output
    }

    /// Splits parsed CLI arguments into command and connection settings.
    ///
    /// ```
    /// use clap::Parser;
    ///
    /// let args = broan::Args::try_parse_from(["broan", "--fake", "status"])?;
    /// let (command, connection) = args.into_command_and_connection();
    /// assert!(matches!(command, broan::Command::Status));
    /// assert!(connection.is_fake());
    /// # Ok::<(), clap::Error>(())
    /// ```
    #[must_use]
    pub fn into_command_and_connection(self) -> (Command, ConnectionArgs) {
        let Args {
            host,
            port,
            address,
            connect_timeout,
            read_timeout,
            pad_checksum,
            log_level: _,
            output: _,
            fake,
            fake_reply,
            fake_failures,
            command,
        } = self;

        let fake_args = fake.then(|| FakeArgs {
            reply: fake_reply,
            failures: fake_failures.unwrap_or_default(),
        });
        let connection = ConnectionArgs {
            host,
            port,
            address,
            connect_timeout,
            read_timeout,
            pad_checksum,
            fake: fake_args,
        };

        (command, connection)
    }
}

/// Connection settings resolved from the command line.
#[derive(Debug, Builder)]
pub struct ConnectionArgs {
    #[builder(into)]
    host: Option<String>,
    port: Option<u16>,
    #[builder(default = DEFAULT_ADDRESS)]
    address: WireCode,
    #[builder(default = Duration::from_secs(5))]
    connect_timeout: Duration,
    #[builder(default = Duration::from_secs(5))]
    read_timeout: Duration,
    #[builder(default)]
    pad_checksum: bool,
    fake: Option<FakeArgs>,
}

impl ConnectionArgs {
    /// Whether the simulated controller is selected.
    #[must_use]
    pub fn is_fake(&self) -> bool {
        self.fake.is_some()
    }

    /// Validates the settings and opens a device session.
    ///
    /// The fake controller does not need a host or port.
    ///
    /// # Errors
    ///
    /// Returns an error when the host or port is missing or invalid.
    pub fn into_session(self) -> anyhow::Result<DeviceSession> {
        let Self {
            host,
            port,
            address,
            connect_timeout,
            read_timeout,
            pad_checksum,
            fake,
        } = self;

        let (host, port) = match &fake {
            Some(_) => (
                host.unwrap_or_else(|| FAKE_HOST.to_string()),
                port.unwrap_or(FAKE_PORT),
            ),
            None => (
                host.ok_or(CliConfigError::MissingHost)?,
                port.ok_or(CliConfigError::MissingPort)?,
            ),
        };
        let checksum_padding = if pad_checksum {
            ChecksumPadding::ZeroPadded
        } else {
            ChecksumPadding::Legacy
        };
        let config = DeviceConfig::builder()
            .host(host)
            .port(port)
            .address(address)
            .checksum_padding(checksum_padding)
            .connect_timeout(connect_timeout)
            .io_timeout(read_timeout)
            .build();

        let session = match fake {
            Some(fake) => config.into_fake_session(fake.into_transport_config(address))?,
            None => config.into_session()?,
        };
        Ok(session)
    }
}

/// Simulated controller arguments for programmatic runs.
#[derive(Debug, Builder)]
pub struct FakeArgs {
    #[builder(with = |value: &str| -> std::result::Result<_, FixtureError> { value.parse() })]
    reply: Option<HexPayload>,
    #[builder(default)]
    failures: usize,
}

impl FakeArgs {
    fn into_transport_config(self, address: WireCode) -> FakeTransportConfig {
        FakeTransportConfig::builder()
            .address(address)
            .maybe_fixed_reply(self.reply)
            .failures(self.failures)
            .build()
    }
}

/// Supported CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Query the controller once and print its state.
    Status,
    /// Poll the controller until interrupted or a poll count is reached.
    Watch(WatchArgs),
    /// Send one control intent, then print the refreshed state.
    Control(ControlArgs),
    /// Decode a captured status reply without contacting a controller.
    Decode(DecodeArgs),
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable tables.
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Log verbosity accepted by `--log-level`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub(crate) fn as_level_filter(self) -> LevelFilter {
        match self {
            Self::Off => LevelFilter::OFF,
            Self::Error => LevelFilter::ERROR,
            Self::Warn => LevelFilter::WARN,
            Self::Info => LevelFilter::INFO,
            Self::Debug => LevelFilter::DEBUG,
            Self::Trace => LevelFilter::TRACE,
        }
    }
}

pub(crate) fn parse_duration(value: &str) -> Result<Duration, String> {
    humantime::parse_duration(value).map_err(|error| error.to_string())
}

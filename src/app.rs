use std::io;

use anyhow::Result;
use owo_colors::OwoColorize;
use tracing::instrument;
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::cli::ui::Painter;
use crate::cli::{Command, ConnectionArgs, LogLevel, OutputFormat};
use crate::handlers::FanHandler;
use crate::telemetry;
use crate::terminal::{SystemTerminalClient, TerminalClient};

/// App helper for opening a fan entity from connection settings.
#[derive(Debug)]
pub struct SessionHandler {
    connection: ConnectionArgs,
}

impl SessionHandler {
    #[must_use]
    pub fn new(connection: ConnectionArgs) -> Self {
        Self { connection }
    }

    /// Opens the fan entity without contacting the controller.
    ///
    /// # Errors
    ///
    /// Returns an error when the connection settings are incomplete or invalid.
    pub fn open(self) -> Result<FanHandler> {
        let session = self.connection.into_session()?;
        Ok(FanHandler::new(session))
    }

    /// Opens the fan entity and performs the first status query.
    ///
    /// ```
    /// # async fn demo() -> anyhow::Result<()> {
    /// let connection = broan::ConnectionArgs::builder()
    ///     .fake(broan::FakeArgs::builder().build())
    ///     .build();
    /// let fan = broan::SessionHandler::new(connection).connect().await?;
    /// assert!(fan.available());
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error if the settings are invalid or the first query fails.
    pub async fn connect(self) -> Result<FanHandler> {
        let mut fan = self.open()?;
        refresh(&mut fan).await?;
        Ok(fan)
    }
}

/// Performs the first status query of an opened fan entity.
#[instrument(skip(fan), level = "info", fields(entity = %fan.unique_id()))]
pub(crate) async fn refresh(fan: &mut FanHandler) -> Result<()> {
    let span = tracing::Span::current();
    span.pb_set_message("Querying controller");

    match fan.update().await {
        Ok(_snapshot) => {
            span.pb_set_finish_message(&format!("{} Controller responded", "✓".green()));
            Ok(())
        }
        Err(error) => {
            span.pb_set_finish_message(&format!("{} Controller did not respond", "✗".red()));
            Err(error.into())
        }
    }
}

/// Runs the CLI command with default terminal detection.
///
/// ```
/// # async fn run() -> anyhow::Result<()> {
/// use clap::Parser;
///
/// let args = broan::Args::try_parse_from(["broan", "--fake", "--output", "json", "status"])?;
/// let output_format = args.output_format();
/// let (command, connection) = args.into_command_and_connection();
/// let mut out = Vec::new();
/// broan::run(command, &mut out, connection, output_format).await?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns an error if tracing initialisation fails, the controller exchange
/// fails, or output writing fails.
pub async fn run<W>(
    command: Command,
    out: &mut W,
    connection: ConnectionArgs,
    output_format: Option<OutputFormat>,
) -> Result<()>
where
    W: io::Write,
{
    run_with_log_level(command, out, connection, output_format, None).await
}

/// Runs the CLI command with an explicit telemetry log-level override.
///
/// # Errors
///
/// Returns an error if tracing initialisation fails, the controller exchange
/// fails, or output writing fails.
pub async fn run_with_log_level<W>(
    command: Command,
    out: &mut W,
    connection: ConnectionArgs,
    output_format: Option<OutputFormat>,
    log_level: Option<LogLevel>,
) -> Result<()>
where
    W: io::Write,
{
    run_with_clients_and_log_level(
        command,
        out,
        &SystemTerminalClient,
        connection,
        output_format,
        log_level,
    )
    .await
}

/// Runs the CLI command with an injected terminal client.
///
/// ```
/// # async fn run() -> anyhow::Result<()> {
/// use clap::Parser;
///
/// struct FakeTerminal;
/// impl broan::TerminalClient for FakeTerminal {
///     fn stdout_is_terminal(&self) -> bool { false }
///     fn stderr_is_terminal(&self) -> bool { false }
/// }
///
/// let args = broan::Args::try_parse_from(["broan", "decode", "aa0102"])?;
/// let (command, connection) = args.into_command_and_connection();
/// let mut out = Vec::new();
/// let result = broan::run_with_clients_and_log_level(
///     command,
///     &mut out,
///     &FakeTerminal,
///     connection,
///     None,
///     None,
/// ).await;
/// assert!(result.is_err());
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns an error if tracing initialisation fails, the controller exchange
/// fails, or output writing fails.
#[instrument(
    skip(out, terminal_client, connection),
    level = "info",
    fields(command = %command_name(&command), ?log_level)
)]
pub async fn run_with_clients_and_log_level<W>(
    command: Command,
    out: &mut W,
    terminal_client: &dyn TerminalClient,
    connection: ConnectionArgs,
    output_format: Option<OutputFormat>,
    log_level: Option<LogLevel>,
) -> Result<()>
where
    W: io::Write,
{
    telemetry::initialise_tracing(
        "broan",
        terminal_client.stderr_is_terminal(),
        log_level.map(LogLevel::as_level_filter),
    )?;

    let stdout_is_terminal = terminal_client.stdout_is_terminal();
    let output_format = output_format.unwrap_or(if stdout_is_terminal {
        OutputFormat::Pretty
    } else {
        OutputFormat::Json
    });
    let painter = Painter::new(stdout_is_terminal);

    match command {
        Command::Status => crate::cli::status::run(connection, out, output_format, painter).await,
        Command::Watch(args) => {
            crate::cli::watch::run(connection, &args, out, output_format, painter).await
        }
        Command::Control(args) => {
            crate::cli::control::run(connection, &args, out, output_format, painter).await
        }
        Command::Decode(args) => crate::cli::decode::run(&args, out, output_format, painter),
    }
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Status => "status",
        Command::Watch(_args) => "watch",
        Command::Control(_args) => "control",
        Command::Decode(_args) => "decode",
    }
}

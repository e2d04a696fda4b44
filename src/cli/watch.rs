use std::io;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::IntervalStream;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::app::SessionHandler;
use crate::cli::command::parse_duration;
use crate::cli::ui::{Painter, StateReport, StateReportView};
use crate::cli::{ConnectionArgs, OutputFormat, current_report, write_json_line};
use crate::handlers::FanHandler;

const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Arguments for the `watch` command.
#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Delay between polls (at least `1s`).
    #[arg(long, default_value = "30s", value_parser = parse_poll_interval)]
    interval: Duration,
    /// Stop after this many polls.
    #[arg(long)]
    count: Option<u64>,
}

impl WatchArgs {
    /// Creates watch arguments; intervals below one second are raised to it.
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// let args = broan::WatchArgs::new(Duration::from_millis(10), Some(3));
    /// assert_eq!(Duration::from_secs(1), args.interval());
    /// ```
    #[must_use]
    pub fn new(interval: Duration, count: Option<u64>) -> Self {
        Self {
            interval: interval.max(MIN_POLL_INTERVAL),
            count,
        }
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// Why polling ended.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, strum_macros::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
enum StopReason {
    CountReached,
    Interrupted,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct WatchSummary {
    polls: u64,
    failures: u64,
    reason: StopReason,
}

/// JSON event emitted by `watch`.
#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum WatchEvent<'a> {
    Poll {
        poll: u64,
        state: &'a StateReport,
    },
    Failure {
        poll: u64,
        error: String,
        available: bool,
    },
    Stopped {
        polls: u64,
        failures: u64,
        reason: StopReason,
    },
}

/// Executes the `watch` command.
#[instrument(skip(connection, args, out, painter), level = "debug", fields(interval = ?args.interval, count = ?args.count))]
pub(crate) async fn run<W>(
    connection: ConnectionArgs,
    args: &WatchArgs,
    out: &mut W,
    output_format: OutputFormat,
    painter: Painter,
) -> Result<()>
where
    W: io::Write,
{
    let mut fan = SessionHandler::new(connection).open()?;
    let cancel = CancellationToken::new();
    let interrupt_listener = spawn_interrupt_listener(cancel.clone());

    let summary = poll(&mut fan, args, out, output_format, painter, &cancel).await;
    interrupt_listener.abort();
    let summary = summary?;

    match output_format {
        OutputFormat::Pretty => writeln!(
            out,
            "{}",
            painter.muted(format!(
                "Stopped after {} poll(s), {} failed ({})",
                summary.polls, summary.failures, summary.reason
            ))
        )?,
        OutputFormat::Json => write_json_line(
            out,
            &WatchEvent::Stopped {
                polls: summary.polls,
                failures: summary.failures,
                reason: summary.reason,
            },
        )?,
    }
    Ok(())
}

async fn poll<W>(
    fan: &mut FanHandler,
    args: &WatchArgs,
    out: &mut W,
    output_format: OutputFormat,
    painter: Painter,
    cancel: &CancellationToken,
) -> Result<WatchSummary>
where
    W: io::Write,
{
    let mut ticker = interval(args.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut ticks = IntervalStream::new(ticker);
    let mut polls = 0u64;
    let mut failures = 0u64;

    let reason = loop {
        if args.count.is_some_and(|count| polls >= count) {
            break StopReason::CountReached;
        }

        tokio::select! {
            () = cancel.cancelled() => break StopReason::Interrupted,
            Some(_tick) = ticks.next() => {
                polls += 1;
                match fan.update().await {
                    Ok(_snapshot) => {
                        let report = current_report(fan)?;
                        write_poll(out, output_format, painter, polls, &report)?;
                    }
                    Err(error) => {
                        failures += 1;
                        let error = format!("{:#}", anyhow::Error::from(error));
                        write_failure(out, output_format, painter, polls, error)?;
                    }
                }
            }
        }
    };

    Ok(WatchSummary {
        polls,
        failures,
        reason,
    })
}

fn write_poll<W: io::Write>(
    out: &mut W,
    output_format: OutputFormat,
    painter: Painter,
    poll: u64,
    report: &StateReport,
) -> Result<()> {
    match output_format {
        OutputFormat::Pretty => {
            let title = format!("Poll {poll}");
            writeln!(out, "{}", StateReportView::new(&title, report, painter))?;
        }
        OutputFormat::Json => write_json_line(out, &WatchEvent::Poll { poll, state: report })?,
    }
    Ok(())
}

fn write_failure<W: io::Write>(
    out: &mut W,
    output_format: OutputFormat,
    painter: Painter,
    poll: u64,
    error: String,
) -> Result<()> {
    match output_format {
        OutputFormat::Pretty => writeln!(
            out,
            "{}",
            painter.failure(format!("Poll {poll} failed: {error}"))
        )?,
        OutputFormat::Json => write_json_line(
            out,
            &WatchEvent::Failure {
                poll,
                error,
                available: false,
            },
        )?,
    }
    Ok(())
}

fn spawn_interrupt_listener(cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("interrupt received; stopping watch");
                cancel.cancel();
            }
            Err(error) => warn!(?error, "failed to listen for interrupt"),
        }
    })
}

fn parse_poll_interval(value: &str) -> Result<Duration, String> {
    let interval = parse_duration(value)?;
    if interval < MIN_POLL_INTERVAL {
        return Err(format!(
            "poll interval must be at least {}",
            humantime::format_duration(MIN_POLL_INTERVAL)
        ));
    }
    Ok(interval)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("1s", Duration::from_secs(1))]
    #[case("2m", Duration::from_secs(120))]
    fn poll_interval_accepts_values_from_one_second(#[case] input: &str, #[case] expected: Duration) {
        assert_eq!(Ok(expected), parse_poll_interval(input));
    }

    #[test]
    fn poll_interval_rejects_short_values() {
        assert_eq!(
            Err("poll interval must be at least 1s".to_string()),
            parse_poll_interval("200ms")
        );
    }

    #[test]
    fn stop_reason_renders_snake_case() {
        assert_eq!("count_reached", StopReason::CountReached.to_string());
    }
}

use std::io;

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;
use tracing::instrument;

use crate::app::{self, SessionHandler};
use crate::cli::ui::{Painter, StateReport, StateReportView};
use crate::cli::{ConnectionArgs, OutputFormat, current_report, write_json_line};
use crate::error::DeviceError;
use crate::handlers::{CommandFields, FanHandler, Percentage};
use crate::protocol::Mode;

/// JSON result emitted by a `control` action.
#[derive(Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum ControlResult<'a> {
    On {
        state: &'a StateReport,
    },
    Off {
        state: &'a StateReport,
    },
    Percentage {
        requested: Percentage,
        applied: bool,
        state: &'a StateReport,
    },
    Preset {
        requested: Mode,
        applied: bool,
        state: &'a StateReport,
    },
    Raw {
        frame: String,
        state: &'a StateReport,
    },
}

/// Arguments for the `control` command.
#[derive(Debug, Args)]
pub struct ControlArgs {
    #[command(subcommand)]
    action: ControlAction,
}

/// Action performed by the `control` command.
#[derive(Debug, Subcommand)]
pub enum ControlAction {
    /// Turn the fan on.
    On(OnArgs),
    /// Turn the fan off.
    Off,
    /// Set the fan speed in percent; 0 turns the fan off.
    Percentage(PercentageArgs),
    /// Switch the preset mode.
    Preset(PresetArgs),
    /// Send raw mode and speed codes as two hex digits each.
    Raw(RawArgs),
}

/// Arguments for `control on`.
#[derive(Debug, Default, Args)]
pub struct OnArgs {
    /// Target speed in percent.
    #[arg(long)]
    percentage: Option<Percentage>,
    /// Preset mode to start in.
    #[arg(long)]
    preset: Option<Mode>,
}

/// Arguments for `control percentage`.
#[derive(Debug, Args)]
pub struct PercentageArgs {
    percentage: Percentage,
}

/// Arguments for `control preset`.
#[derive(Debug, Args)]
pub struct PresetArgs {
    /// One of `exchange`, `exhaust`, `smart`, `boost`, `saving`, or `off`.
    preset: Mode,
}

/// Arguments for `control raw`.
#[derive(Debug, Args)]
pub struct RawArgs {
    mode: String,
    m1_speed: String,
    m2_speed: String,
    /// Option byte; defaults to `5a`.
    #[arg(long)]
    option: Option<String>,
}

impl RawArgs {
    fn fields(&self) -> Result<CommandFields, DeviceError> {
        CommandFields::parse(
            &self.mode,
            &self.m1_speed,
            &self.m2_speed,
            self.option.as_deref(),
        )
        .map_err(DeviceError::MalformedInput)
    }
}

/// Executes the `control` command.
#[instrument(skip(connection, args, out, painter), level = "info", fields(action = ?args.action, ?output_format))]
pub(crate) async fn run<W>(
    connection: ConnectionArgs,
    args: &ControlArgs,
    out: &mut W,
    output_format: OutputFormat,
    painter: Painter,
) -> Result<()>
where
    W: io::Write,
{
    let mut fan = SessionHandler::new(connection).open()?;
    // Raw frames are built before any exchange.
    if let ControlAction::Raw(raw_args) = &args.action {
        fan.session().command(raw_args.fields()?)?;
    }
    app::refresh(&mut fan).await?;

    let outcome = apply(&mut fan, &args.action).await?;
    let report = current_report(&fan)?;

    match output_format {
        OutputFormat::Pretty => {
            let message = outcome.message();
            let message = if outcome.applied() {
                painter.success(message)
            } else {
                painter.muted(message)
            };
            writeln!(out, "{message}")?;
            writeln!(
                out,
                "{}",
                StateReportView::new("Controller state", &report, painter)
            )?;
        }
        OutputFormat::Json => write_json_line(out, &outcome.into_result(&report))?,
    }
    Ok(())
}

/// What a control action did.
#[derive(Debug)]
enum Outcome {
    On,
    Off,
    Percentage { requested: Percentage, applied: bool },
    Preset { requested: Mode, applied: bool },
    Raw { frame: String },
}

impl Outcome {
    fn applied(&self) -> bool {
        match self {
            Self::Percentage { applied, .. } | Self::Preset { applied, .. } => *applied,
            Self::On | Self::Off | Self::Raw { .. } => true,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::On => "Fan turned on".to_string(),
            Self::Off => "Fan turned off".to_string(),
            Self::Percentage {
                requested,
                applied: true,
            } => format!("Applied percentage: {}%", requested.value()),
            Self::Percentage {
                requested,
                applied: false,
            } => format!(
                "Fan is off; percentage {}% was not applied",
                requested.value()
            ),
            Self::Preset {
                requested,
                applied: true,
            } => format!("Applied preset: {requested}"),
            Self::Preset {
                requested,
                applied: false,
            } => format!("Fan is off; preset {requested} was not applied"),
            Self::Raw { frame } => format!("Sent frame: {frame}"),
        }
    }

    fn into_result(self, state: &StateReport) -> ControlResult<'_> {
        match self {
            Self::On => ControlResult::On { state },
            Self::Off => ControlResult::Off { state },
            Self::Percentage { requested, applied } => ControlResult::Percentage {
                requested,
                applied,
                state,
            },
            Self::Preset { requested, applied } => ControlResult::Preset {
                requested,
                applied,
                state,
            },
            Self::Raw { frame } => ControlResult::Raw { frame, state },
        }
    }
}

async fn apply(fan: &mut FanHandler, action: &ControlAction) -> Result<Outcome> {
    let outcome = match action {
        ControlAction::On(on_args) => {
            fan.turn_on(on_args.percentage, on_args.preset).await?;
            Outcome::On
        }
        ControlAction::Off => {
            fan.turn_off().await?;
            Outcome::Off
        }
        ControlAction::Percentage(percentage_args) => {
            let requested = percentage_args.percentage;
            let applied = fan.set_percentage(requested).await?.is_some();
            Outcome::Percentage { requested, applied }
        }
        ControlAction::Preset(preset_args) => {
            let requested = preset_args.preset;
            let applied = fan.set_preset_mode(requested).await?.is_some();
            Outcome::Preset { requested, applied }
        }
        ControlAction::Raw(raw_args) => {
            let frame = fan.session().command(raw_args.fields()?)?;
            fan.send_frame(frame).await?;
            Outcome::Raw {
                frame: frame.to_string(),
            }
        }
    };
    Ok(outcome)
}

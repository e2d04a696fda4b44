use std::io;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use crate::cli::ui::{Painter, StateReport, StateReportView};
use crate::cli::{OutputFormat, write_json_line};
use crate::handlers::FrameCodec;
use crate::hw::{DeviceState, HexPayload};

/// Arguments for the `decode` command.
#[derive(Debug, Args)]
pub struct DecodeArgs {
    /// Captured status reply as hexadecimal bytes.
    reply: HexPayload,
}

#[derive(Serialize)]
struct DecodeResult<'a> {
    reply: String,
    state: &'a StateReport,
}

/// Executes the `decode` command.
pub(crate) fn run<W>(
    args: &DecodeArgs,
    out: &mut W,
    output_format: OutputFormat,
    painter: Painter,
) -> Result<()>
where
    W: io::Write,
{
    let bytes: Vec<u8> = args.reply.clone().into();
    let fields = FrameCodec::parse_response(&bytes).context("failed to decode status reply")?;
    let report = StateReport::detached(&DeviceState::from_response(&fields));

    match output_format {
        OutputFormat::Pretty => {
            writeln!(
                out,
                "{}",
                StateReportView::new("Decoded reply", &report, painter)
            )?;
        }
        OutputFormat::Json => write_json_line(
            out,
            &DecodeResult {
                reply: hex::encode(&bytes),
                state: &report,
            },
        )?,
    }
    Ok(())
}

use std::io;

use anyhow::Result;
use tracing::instrument;

use crate::app::SessionHandler;
use crate::cli::ui::{Painter, StateReportView};
use crate::cli::{ConnectionArgs, OutputFormat, current_report, write_json_line};

/// Executes the `status` command.
#[instrument(skip(connection, out, painter), level = "debug", fields(?output_format))]
pub(crate) async fn run<W>(
    connection: ConnectionArgs,
    out: &mut W,
    output_format: OutputFormat,
    painter: Painter,
) -> Result<()>
where
    W: io::Write,
{
    let fan = SessionHandler::new(connection).connect().await?;
    let report = current_report(&fan)?;

    match output_format {
        OutputFormat::Pretty => {
            writeln!(
                out,
                "{}",
                StateReportView::new("Controller state", &report, painter)
            )?;
        }
        OutputFormat::Json => write_json_line(out, &report)?,
    }
    Ok(())
}

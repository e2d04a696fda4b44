pub(crate) mod command;
pub(crate) mod control;
pub(crate) mod decode;
pub(crate) mod status;
pub(crate) mod ui;
pub(crate) mod watch;

use std::io;

use anyhow::{Result, bail};
use serde::Serialize;

use self::ui::StateReport;
use crate::handlers::FanHandler;

pub use self::command::{Args, Command, ConnectionArgs, FakeArgs, LogLevel, OutputFormat};
pub use self::control::{
    ControlAction, ControlArgs, OnArgs, PercentageArgs, PresetArgs, RawArgs,
};
pub use self::decode::DecodeArgs;
pub use self::watch::WatchArgs;

/// Writes one compact JSON object followed by a newline.
pub(crate) fn write_json_line(out: &mut impl io::Write, value: &impl Serialize) -> Result<()> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

/// Report of the fan's cached state.
pub(crate) fn current_report(fan: &FanHandler) -> Result<StateReport> {
    let session = fan.session();
    let Some(state) = session.state() else {
        bail!("no controller state has been received yet");
    };
    Ok(StateReport::for_device(
        session.address(),
        state,
        fan.available(),
    ))
}

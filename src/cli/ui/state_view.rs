use std::fmt::{self, Display, Formatter};

use serde::Serialize;

use super::painter::Painter;
use super::table::Table;
use crate::handlers::{FanSnapshot, Percentage, speed_name_for_code};
use crate::hw::{DeviceAddress, DeviceState, PowerState};
use crate::protocol::{Mode, WireCode};
use crate::utils::format_optional;

/// One decoded controller state as printed by the CLI.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub(crate) struct StateReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    device: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    unique_id: Option<String>,
    power: PowerState,
    preset: Option<Mode>,
    percentage: Percentage,
    mode: WireCode,
    m1_speed: WireCode,
    m2_speed: WireCode,
    temperature: i16,
    humidity: u8,
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    available: Option<bool>,
}

impl StateReport {
    pub(crate) fn for_device(address: &DeviceAddress, state: &DeviceState, available: bool) -> Self {
        let mut report = Self::detached(state);
        report.device = Some(address.to_string());
        report.unique_id = Some(address.unique_id());
        report.available = Some(available);
        report
    }

    /// Report for a reply that did not come from a known device.
    pub(crate) fn detached(state: &DeviceState) -> Self {
        let FanSnapshot {
            power,
            percentage,
            preset,
            temperature,
            humidity,
            status,
            available: _,
        } = FanSnapshot::from_state(state, true);

        Self {
            device: None,
            unique_id: None,
            power,
            preset,
            percentage,
            mode: state.mode(),
            m1_speed: state.m1_speed(),
            m2_speed: state.m2_speed(),
            temperature,
            humidity,
            status,
            available: None,
        }
    }

    fn rows(&self, painter: &Painter) -> Vec<(&'static str, String)> {
        let mut rows = Vec::with_capacity(12);
        if let Some(device) = &self.device {
            rows.push(("device", painter.value(device)));
        }
        if let Some(unique_id) = &self.unique_id {
            rows.push(("unique id", unique_id.clone()));
        }
        rows.extend([
            ("power", painter.power(self.power)),
            ("preset", format_optional(self.preset)),
            ("percentage", format!("{}%", self.percentage.value())),
            ("mode", self.mode.to_string()),
            ("m1 speed", speed_cell(self.m1_speed)),
            ("m2 speed", speed_cell(self.m2_speed)),
            ("temperature", self.temperature.to_string()),
            ("humidity", self.humidity.to_string()),
            (
                "status",
                painter.status(&self.status, self.status == "normal"),
            ),
        ]);
        if let Some(available) = self.available {
            rows.push(("available", if available { "yes" } else { "no" }.to_string()));
        }
        rows
    }
}

fn speed_cell(code: WireCode) -> String {
    let code = code.to_string();
    let name = speed_name_for_code(&code);
    format!("{code} ({name})")
}

/// Titled table rendering of a [`StateReport`].
pub(crate) struct StateReportView<'a> {
    title: &'a str,
    report: &'a StateReport,
    painter: Painter,
}

impl<'a> StateReportView<'a> {
    pub(crate) fn new(title: &'a str, report: &'a StateReport, painter: Painter) -> Self {
        Self {
            title,
            report,
            painter,
        }
    }
}

impl Display for StateReportView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.painter.heading(self.title))?;
        write!(
            f,
            "{}",
            Table::key_value(&self.painter, self.report.rows(&self.painter))
        )
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::handlers::FrameCodec;

    fn state(reply: &[u8]) -> DeviceState {
        let fields = FrameCodec::parse_response(reply).expect("reply should decode");
        DeviceState::from_response(&fields)
    }

    #[test]
    fn detached_report_omits_device_identity() {
        let report = StateReport::detached(
            &state(&[0xAA, 0x01, 0x02, 0x02, 0x00, 0x02, 0x14, 0x32, 0x00, 0x00, 0xF5]),
        );
        let json = serde_json::to_string(&report).expect("report should serialise");
        assert_eq!(
            r#"{"power":"on","preset":"exhaust","percentage":66,"mode":"02","m1_speed":"00","m2_speed":"02","temperature":20,"humidity":50,"status":"normal"}"#,
            json
        );
    }

    #[test]
    fn view_renders_titled_table() {
        let address = DeviceAddress::new("fan.local", 8899, WireCode::new(0x01));
        let report = StateReport::for_device(
            &address,
            &state(&[0xAA, 0x01, 0x02, 0x01, 0x01, 0x01, 0x16, 0x2D, 0x21, 0x00, 0xF5]),
            true,
        );
        let view = StateReportView::new("Controller state", &report, Painter::new(false));
        assert_snapshot!(view.to_string(), @r"
        Controller state
        ╭─────────────┬───────────────────────────────────────╮
        │ field       │ value                                 │
        ├─────────────┼───────────────────────────────────────┤
        │ device      │ fan.local:8899#01                     │
        │ unique id   │ broan_fan.local_01                    │
        │ power       │ on                                    │
        │ preset      │ exchange                              │
        │ percentage  │ 33%                                   │
        │ mode        │ 01                                    │
        │ m1 speed    │ 01 (low)                              │
        │ m2 speed    │ 01 (low)                              │
        │ temperature │ 22                                    │
        │ humidity    │ 45                                    │
        │ status      │ M1 motor fault, humidity sensor fault │
        │ available   │ yes                                   │
        ╰─────────────┴───────────────────────────────────────╯
        ");
    }
}

use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

use super::frame_codec::{CommandFields, CommandFrame, FrameCodecError};
use super::lookup::{preset_code_for_name, speed_code_for_name};
use super::percentage::Percentage;
use crate::error::DeviceError;
use crate::hw::{DeviceSession, DeviceState, PowerState};
use crate::protocol::{Mode, SpeedLevel};

/// Errors returned by fan intents.
#[derive(Debug, Error)]
pub enum FanError {
    #[error(transparent)]
    Device(#[from] DeviceError),
    /// The active preset drives the motors at fixed speeds.
    #[error("preset `{preset}` runs at a fixed speed")]
    SpeedFixedByPreset { preset: Mode },
}

/// State published to the host platform.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct FanSnapshot {
    pub power: PowerState,
    pub percentage: Percentage,
    pub preset: Option<Mode>,
    pub temperature: i16,
    pub humidity: u8,
    pub status: String,
    pub available: bool,
}

impl FanSnapshot {
    /// Maps a controller state into the host-facing view.
    ///
    /// The exhaust preset reports the exhaust motor; every other preset
    /// reports the supply motor.
    #[must_use]
    pub fn from_state(state: &DeviceState, available: bool) -> Self {
        let preset = state.preset();
        let speed = match preset {
            Some(Mode::Exhaust) => state.m2_level(),
            _ => state.m1_level(),
        };

        Self {
            power: state.power(),
            percentage: Percentage::from_speed(speed),
            preset,
            temperature: state.temperature(),
            humidity: state.humidity(),
            status: state.fault_description(),
            available,
        }
    }
}

/// Host-facing fan entity backed by one device session.
///
/// Intents translate to a single set frame followed by a status query.
/// Percentage and preset changes requested while the fan is off are kept
/// and used by the next [`FanHandler::turn_on`].
#[derive(Debug)]
pub struct FanHandler {
    session: DeviceSession,
    pending_preset: Option<Mode>,
    pending_percentage: Option<Percentage>,
    available: bool,
}

impl FanHandler {
    #[must_use]
    pub fn new(session: DeviceSession) -> Self {
        Self {
            session,
            pending_preset: None,
            pending_percentage: None,
            available: true,
        }
    }

    /// Stable identifier, `broan_{host}_{address}`.
    #[must_use]
    pub fn unique_id(&self) -> String {
        self.session.address().unique_id()
    }

    /// Whether the last exchange with the controller succeeded.
    #[must_use]
    pub fn available(&self) -> bool {
        self.available
    }

    #[must_use]
    pub fn session(&self) -> &DeviceSession {
        &self.session
    }

    /// Last published state; `None` before the first successful refresh.
    #[must_use]
    pub fn snapshot(&self) -> Option<FanSnapshot> {
        self.session
            .state()
            .map(|state| FanSnapshot::from_state(state, self.available))
    }

    /// Returns the motor speeds a preset runs at for a requested speed.
    ///
    /// ```
    /// use broan::{FanHandler, Mode, SpeedLevel};
    ///
    /// assert_eq!(
    ///     (SpeedLevel::Off, SpeedLevel::Medium),
    ///     FanHandler::speed_targets(Mode::Exhaust, SpeedLevel::Medium)
    /// );
    /// assert_eq!(
    ///     (SpeedLevel::High, SpeedLevel::High),
    ///     FanHandler::speed_targets(Mode::Boost, SpeedLevel::Low)
    /// );
    /// ```
    #[must_use]
    pub fn speed_targets(preset: Mode, speed: SpeedLevel) -> (SpeedLevel, SpeedLevel) {
        match preset {
            Mode::Exchange => (speed, speed),
            Mode::Exhaust => (SpeedLevel::Off, speed),
            Mode::Smart | Mode::Saving => (SpeedLevel::Low, SpeedLevel::Low),
            Mode::Boost => (SpeedLevel::High, SpeedLevel::High),
            Mode::Off => (SpeedLevel::Off, SpeedLevel::Off),
        }
    }

    /// Whether a preset ignores the requested speed.
    #[must_use]
    pub fn speed_is_fixed(preset: Mode) -> bool {
        matches!(preset, Mode::Smart | Mode::Boost | Mode::Saving)
    }

    /// Builds the command fields for `preset` at `speed` from the name
    /// tables.
    ///
    /// # Errors
    ///
    /// Returns [`FrameCodecError::MalformedInput`] if a table yields a code
    /// that is not two hex digits.
    pub fn fields_for(preset: Mode, speed: SpeedLevel) -> Result<CommandFields, FrameCodecError> {
        let (m1_speed, m2_speed) = Self::speed_targets(preset, speed);
        CommandFields::parse(
            preset_code_for_name(preset.name()),
            speed_code_for_name(m1_speed.name()),
            speed_code_for_name(m2_speed.name()),
            None,
        )
    }

    /// Refreshes the published state from the controller.
    ///
    /// # Errors
    ///
    /// Returns the device error and marks the entity unavailable; the last
    /// known values stay in place.
    #[instrument(skip(self), level = "debug", fields(entity = %self.unique_id()))]
    pub async fn update(&mut self) -> Result<FanSnapshot, FanError> {
        let result = self.session.query().await;
        self.finish(result)
    }

    /// Turns the fan on.
    ///
    /// A missing or zero percentage falls back to the pending percentage,
    /// then to full speed. A missing preset falls back to the pending
    /// preset, then to [`Mode::Exchange`].
    ///
    /// # Errors
    ///
    /// Returns the device error of the set or the follow-up query.
    #[instrument(skip(self), level = "debug", fields(entity = %self.unique_id()))]
    pub async fn turn_on(
        &mut self,
        percentage: Option<Percentage>,
        preset: Option<Mode>,
    ) -> Result<FanSnapshot, FanError> {
        let percentage = percentage
            .filter(|value| *value != Percentage::ZERO)
            .or(self.pending_percentage)
            .unwrap_or(Percentage::FULL);
        let preset = preset
            .and_then(Mode::as_preset)
            .or(self.pending_preset)
            .unwrap_or(Mode::Exchange);

        info!(%preset, percentage = percentage.value(), "turning fan on");
        self.send(preset, percentage.speed()).await
    }

    /// Turns the fan off.
    ///
    /// # Errors
    ///
    /// Returns the device error of the set or the follow-up query.
    #[instrument(skip(self), level = "debug", fields(entity = %self.unique_id()))]
    pub async fn turn_off(&mut self) -> Result<FanSnapshot, FanError> {
        info!("turning fan off");
        self.send(Mode::Off, SpeedLevel::Off).await
    }

    /// Sets the fan speed.
    ///
    /// Zero turns the fan off. While the fan is off the percentage is only
    /// remembered and `Ok(None)` is returned.
    ///
    /// # Errors
    ///
    /// Returns [`FanError::SpeedFixedByPreset`] when the active preset runs
    /// at fixed speeds, otherwise any device error.
    #[instrument(skip(self), level = "debug", fields(entity = %self.unique_id()))]
    pub async fn set_percentage(
        &mut self,
        percentage: Percentage,
    ) -> Result<Option<FanSnapshot>, FanError> {
        if percentage == Percentage::ZERO {
            return self.turn_off().await.map(Some);
        }
        let Some(preset) = self.running_preset() else {
            info!(
                percentage = percentage.value(),
                "fan is off; keeping percentage for the next turn on"
            );
            self.pending_percentage = Some(percentage);
            return Ok(None);
        };
        if Self::speed_is_fixed(preset) {
            warn!(%preset, "ignoring speed change for a fixed-speed preset");
            return Err(FanError::SpeedFixedByPreset { preset });
        }

        self.send(preset, percentage.speed()).await.map(Some)
    }

    /// Switches the preset, keeping the current speed.
    ///
    /// While the fan is off the preset is only remembered and `Ok(None)` is
    /// returned. [`Mode::Off`] turns the fan off.
    ///
    /// # Errors
    ///
    /// Returns the device error of the set or the follow-up query.
    #[instrument(skip(self), level = "debug", fields(entity = %self.unique_id()))]
    pub async fn set_preset_mode(&mut self, preset: Mode) -> Result<Option<FanSnapshot>, FanError> {
        let Some(preset) = preset.as_preset() else {
            return self.turn_off().await.map(Some);
        };
        if self.running_preset().is_none() {
            info!(%preset, "fan is off; keeping preset for the next turn on");
            self.pending_preset = Some(preset);
            return Ok(None);
        }

        self.send(preset, self.current_speed()).await.map(Some)
    }

    /// Sends a prebuilt frame, then refreshes the published state.
    ///
    /// Remembered values are kept, since the frame is not an intent.
    ///
    /// # Errors
    ///
    /// Returns the device error of the send or the follow-up query and marks
    /// the entity unavailable.
    #[instrument(skip(self, frame), level = "debug", fields(entity = %self.unique_id(), %frame))]
    pub async fn send_frame(&mut self, frame: CommandFrame) -> Result<FanSnapshot, FanError> {
        let result = self.session.send_and_requery(frame).await;
        self.finish(result)
    }

    fn running_preset(&self) -> Option<Mode> {
        self.session
            .state()
            .filter(|state| state.power().is_on())
            .map(|state| state.preset().unwrap_or(Mode::Exchange))
    }

    fn current_speed(&self) -> SpeedLevel {
        self.snapshot()
            .map(|snapshot| snapshot.percentage.speed())
            .filter(|speed| *speed != SpeedLevel::Off)
            .unwrap_or(SpeedLevel::High)
    }

    async fn send(&mut self, preset: Mode, speed: SpeedLevel) -> Result<FanSnapshot, FanError> {
        let fields = Self::fields_for(preset, speed).map_err(DeviceError::MalformedInput)?;
        let result = self.session.apply(fields).await;
        let snapshot = self.finish(result)?;
        self.pending_preset = None;
        self.pending_percentage = None;
        Ok(snapshot)
    }

    fn finish(&mut self, result: Result<DeviceState, DeviceError>) -> Result<FanSnapshot, FanError> {
        match result {
            Ok(state) => {
                self.available = true;
                Ok(FanSnapshot::from_state(&state, true))
            }
            Err(error) => {
                if !matches!(error, DeviceError::MalformedInput(_)) {
                    self.available = false;
                }
                warn!(error = %error, "controller exchange failed; keeping last known state");
                Err(error.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(Mode::Exchange, SpeedLevel::Low, (SpeedLevel::Low, SpeedLevel::Low))]
    #[case(Mode::Exchange, SpeedLevel::High, (SpeedLevel::High, SpeedLevel::High))]
    #[case(Mode::Exhaust, SpeedLevel::Low, (SpeedLevel::Off, SpeedLevel::Low))]
    #[case(Mode::Smart, SpeedLevel::High, (SpeedLevel::Low, SpeedLevel::Low))]
    #[case(Mode::Boost, SpeedLevel::Low, (SpeedLevel::High, SpeedLevel::High))]
    #[case(Mode::Saving, SpeedLevel::Medium, (SpeedLevel::Low, SpeedLevel::Low))]
    #[case(Mode::Off, SpeedLevel::High, (SpeedLevel::Off, SpeedLevel::Off))]
    fn speed_targets_follow_preset(
        #[case] preset: Mode,
        #[case] speed: SpeedLevel,
        #[case] expected: (SpeedLevel, SpeedLevel),
    ) {
        assert_eq!(expected, FanHandler::speed_targets(preset, speed));
    }

    #[test]
    fn fields_for_exhaust_stops_supply_motor() {
        let fields = FanHandler::fields_for(Mode::Exhaust, SpeedLevel::Medium)
            .expect("table codes should parse");
        assert_eq!("02", fields.mode().to_string());
        assert_eq!("00", fields.m1_speed().to_string());
        assert_eq!("02", fields.m2_speed().to_string());
    }

    #[rstest]
    #[case(Mode::Exchange, SpeedLevel::High, ["01", "03", "03"])]
    #[case(Mode::Boost, SpeedLevel::Low, ["04", "03", "03"])]
    #[case(Mode::Saving, SpeedLevel::High, ["05", "01", "01"])]
    #[case(Mode::Off, SpeedLevel::Medium, ["00", "00", "00"])]
    fn fields_for_uses_table_codes(
        #[case] preset: Mode,
        #[case] speed: SpeedLevel,
        #[case] expected: [&str; 3],
    ) {
        let fields = FanHandler::fields_for(preset, speed).expect("table codes should parse");
        assert_eq!(
            expected.map(str::to_string),
            [
                fields.mode().to_string(),
                fields.m1_speed().to_string(),
                fields.m2_speed().to_string(),
            ]
        );
    }

    #[rstest]
    #[case(Mode::Exchange, false)]
    #[case(Mode::Exhaust, false)]
    #[case(Mode::Smart, true)]
    #[case(Mode::Boost, true)]
    #[case(Mode::Saving, true)]
    fn fixed_speed_presets(#[case] preset: Mode, #[case] expected: bool) {
        assert_eq!(expected, FanHandler::speed_is_fixed(preset));
    }
}

use tracing::{debug, info, instrument};

use super::hardware::Transport;
use super::model::{DeviceAddress, DeviceState};
use crate::error::DeviceError;
use crate::handlers::{ChecksumPadding, CommandFields, CommandFrame, FrameCodec};
use crate::utils::format_hex;

/// Live connection context for one controller.
///
/// Every call performs a fresh round trip; the cached state only records the
/// last successful query. Mutating methods take `&mut self`, so a session has
/// a single writer at a time.
#[derive(Debug)]
pub struct DeviceSession {
    address: DeviceAddress,
    transport: Box<dyn Transport>,
    padding: ChecksumPadding,
    state: Option<DeviceState>,
}

impl DeviceSession {
    #[must_use]
    pub fn new(address: DeviceAddress, transport: Box<dyn Transport>) -> Self {
        Self {
            address,
            transport,
            padding: ChecksumPadding::default(),
            state: None,
        }
    }

    /// Selects how command checksums are rendered.
    #[must_use]
    pub fn with_checksum_padding(mut self, padding: ChecksumPadding) -> Self {
        self.padding = padding;
        self
    }

    #[must_use]
    pub fn address(&self) -> &DeviceAddress {
        &self.address
    }

    #[must_use]
    pub fn checksum_padding(&self) -> ChecksumPadding {
        self.padding
    }

    /// Last successfully decoded state, if any query succeeded yet.
    #[must_use]
    pub fn state(&self) -> Option<&DeviceState> {
        self.state.as_ref()
    }

    /// Builds a command frame for this session's controller.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::MalformedInput`] when the frame cannot be
    /// rendered with the session's checksum padding.
    pub fn command(&self, fields: CommandFields) -> Result<CommandFrame, DeviceError> {
        FrameCodec::build_command(self.address.address(), fields, self.padding)
            .map_err(DeviceError::MalformedInput)
    }

    /// Queries the controller and replaces the cached state.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Communication`] when the exchange fails and
    /// [`DeviceError::Decode`] when the reply is too short. The cached state
    /// is left untouched on error.
    #[instrument(skip(self), level = "debug", fields(device = %self.address))]
    pub async fn query(&mut self) -> Result<DeviceState, DeviceError> {
        let frame = self.command(CommandFields::query())?;
        let reply = self.transport.exchange(frame.as_bytes()).await?;
        let fields = FrameCodec::parse_response(&reply).map_err(DeviceError::Decode)?;
        let state = DeviceState::from_response(&fields);

        info!(
            mode = %state.mode(),
            m1_speed = %state.m1_speed(),
            m2_speed = %state.m2_speed(),
            temperature = state.temperature(),
            humidity = state.humidity(),
            power = %state.power(),
            status = %state.fault_description(),
            "controller state refreshed"
        );
        self.state = Some(state.clone());
        Ok(state)
    }

    /// Sends `frame`, discards its reply, then queries the controller.
    ///
    /// # Errors
    ///
    /// Returns the first failing exchange or decode error; the cached state
    /// is left untouched on error.
    #[instrument(skip(self, frame), level = "debug", fields(device = %self.address, frame = %frame))]
    pub async fn send_and_requery(&mut self, frame: CommandFrame) -> Result<DeviceState, DeviceError> {
        let reply = self.transport.exchange(frame.as_bytes()).await?;
        debug!(reply = %format_hex(&reply), "ignoring command acknowledgement");
        self.query().await
    }

    /// Builds a frame from `fields` and applies it with [`Self::send_and_requery`].
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::MalformedInput`] before any I/O when the frame
    /// cannot be built, otherwise as [`Self::send_and_requery`].
    pub async fn apply(&mut self, fields: CommandFields) -> Result<DeviceState, DeviceError> {
        let frame = self.command(fields)?;
        self.send_and_requery(frame).await
    }
}

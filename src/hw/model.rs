use std::fmt;

use serde_with::SerializeDisplay;
use strum_macros::Display;

use crate::handlers::{FaultFlags, ResponseFields};
use crate::protocol::{Mode, SpeedLevel, WireCode};

/// Network location and sub-address of one controller.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct DeviceAddress {
    host: String,
    port: u16,
    address: WireCode,
}

impl DeviceAddress {
    /// Creates a controller address.
    ///
    /// ```
    /// use broan::{DeviceAddress, WireCode};
    ///
    /// let address = DeviceAddress::new("192.168.1.40", 8899, WireCode::new(0x01));
    /// assert_eq!("broan_192.168.1.40_01", address.unique_id());
    /// ```
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16, address: WireCode) -> Self {
        Self {
            host: host.into(),
            port,
            address,
        }
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Sub-address of the unit on the shared line.
    #[must_use]
    pub fn address(&self) -> WireCode {
        self.address
    }

    /// Stable identifier for the host platform entity.
    #[must_use]
    pub fn unique_id(&self) -> String {
        format!("broan_{}_{}", self.host, self.address)
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}#{}", self.host, self.port, self.address)
    }
}

/// Derived on/off state of the unit.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Display, SerializeDisplay)]
#[strum(serialize_all = "lowercase")]
pub enum PowerState {
    Off,
    On,
}

impl PowerState {
    /// Derives the power state from the reported mode and exhaust speed.
    ///
    /// A zero exhaust speed or a zero mode each mean the unit is off.
    ///
    /// ```
    /// use broan::{PowerState, WireCode};
    ///
    /// assert_eq!(PowerState::Off, PowerState::derive(WireCode::new(0x01), WireCode::new(0x00)));
    /// assert_eq!(PowerState::Off, PowerState::derive(WireCode::new(0x00), WireCode::new(0x02)));
    /// assert_eq!(PowerState::On, PowerState::derive(WireCode::new(0x01), WireCode::new(0x02)));
    /// ```
    #[must_use]
    pub fn derive(mode: WireCode, m2_speed: WireCode) -> Self {
        if m2_speed == WireCode::ZERO || mode == WireCode::ZERO {
            Self::Off
        } else {
            Self::On
        }
    }

    #[must_use]
    pub fn is_on(self) -> bool {
        self == Self::On
    }
}

/// Last decoded snapshot of one controller.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DeviceState {
    mode: WireCode,
    m1_speed: WireCode,
    m2_speed: WireCode,
    temperature: i16,
    humidity: u8,
    faults: FaultFlags,
    power: PowerState,
}

impl DeviceState {
    /// Builds a snapshot from a decoded reply, deriving the power state.
    #[must_use]
    pub fn from_response(fields: &ResponseFields) -> Self {
        Self {
            mode: fields.mode(),
            m1_speed: fields.m1_speed(),
            m2_speed: fields.m2_speed(),
            temperature: fields.temperature(),
            humidity: fields.humidity(),
            faults: fields.faults(),
            power: PowerState::derive(fields.mode(), fields.m2_speed()),
        }
    }

    /// Raw mode code as reported.
    #[must_use]
    pub fn mode(&self) -> WireCode {
        self.mode
    }

    /// Supply motor speed code.
    #[must_use]
    pub fn m1_speed(&self) -> WireCode {
        self.m1_speed
    }

    /// Exhaust motor speed code.
    #[must_use]
    pub fn m2_speed(&self) -> WireCode {
        self.m2_speed
    }

    #[must_use]
    pub fn temperature(&self) -> i16 {
        self.temperature
    }

    #[must_use]
    pub fn humidity(&self) -> u8 {
        self.humidity
    }

    #[must_use]
    pub fn faults(&self) -> FaultFlags {
        self.faults
    }

    #[must_use]
    pub fn power(&self) -> PowerState {
        self.power
    }

    /// Human-readable fault summary, `"normal"` when no fault bit is set.
    #[must_use]
    pub fn fault_description(&self) -> String {
        self.faults.description()
    }

    /// Reported mode, unknown codes read as `Off`.
    #[must_use]
    pub fn operating_mode(&self) -> Mode {
        Mode::from_code(self.mode)
    }

    /// Reported preset, `None` when the mode is off or unknown.
    #[must_use]
    pub fn preset(&self) -> Option<Mode> {
        self.operating_mode().as_preset()
    }

    #[must_use]
    pub fn m1_level(&self) -> SpeedLevel {
        SpeedLevel::from_code(self.m1_speed)
    }

    #[must_use]
    pub fn m2_level(&self) -> SpeedLevel {
        SpeedLevel::from_code(self.m2_speed)
    }
}

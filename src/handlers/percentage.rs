use thiserror::Error;

use crate::protocol::SpeedLevel;

use super::lookup::{percentage_for_speed, speed_for_percentage};

const MIN_PERCENTAGE: u8 = 0;
const MAX_PERCENTAGE: u8 = 100;

/// Errors returned by percentage validation.
#[derive(Debug, Error, Clone, Copy, Eq, PartialEq)]
pub enum PercentageError {
    /// The percentage was outside the accepted range.
    #[error("percentage {value} is out of range ({min}..={max})")]
    OutOfRange { value: u8, min: u8, max: u8 },
}

/// Validated fan percentage in the inclusive range `0..=100`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, serde::Serialize)]
#[serde(transparent)]
pub struct Percentage(u8);

impl Percentage {
    /// Full speed.
    pub const FULL: Self = Self(MAX_PERCENTAGE);
    /// Stopped.
    pub const ZERO: Self = Self(MIN_PERCENTAGE);

    /// Creates a validated percentage.
    ///
    /// # Errors
    ///
    /// Returns an error when `value` is outside `0..=100`.
    ///
    /// ```
    /// use broan::Percentage;
    ///
    /// let value = Percentage::new(66)?;
    /// assert_eq!(66, value.value());
    /// # Ok::<(), broan::PercentageError>(())
    /// ```
    pub fn new(value: u8) -> Result<Self, PercentageError> {
        if !(MIN_PERCENTAGE..=MAX_PERCENTAGE).contains(&value) {
            return Err(PercentageError::OutOfRange {
                value,
                min: MIN_PERCENTAGE,
                max: MAX_PERCENTAGE,
            });
        }

        Ok(Self(value))
    }

    /// Returns the displayed percentage of a speed step.
    #[must_use]
    pub fn from_speed(speed: SpeedLevel) -> Self {
        Self(percentage_for_speed(speed))
    }

    /// Returns the underlying percentage.
    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    /// Returns the speed step this percentage selects.
    ///
    /// ```
    /// use broan::{Percentage, SpeedLevel};
    ///
    /// assert_eq!(SpeedLevel::Medium, Percentage::new(50)?.speed());
    /// # Ok::<(), broan::PercentageError>(())
    /// ```
    #[must_use]
    pub fn speed(self) -> SpeedLevel {
        speed_for_percentage(self.0)
    }
}

impl std::str::FromStr for Percentage {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let parsed = value.parse::<u8>().map_err(|error| error.to_string())?;
        Self::new(parsed).map_err(|error| error.to_string())
    }
}

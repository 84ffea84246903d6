//! Error types for sensor configuration and setup.

use pulsein_counter::{ConfigError, SetupError};

use crate::config::Board;

/// Errors raised while loading, validating or activating pulse sensors.
#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    /// The configuration file could not be read.
    #[error("failed to read sensor configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration document is not valid YAML for this schema.
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Sensor names identify published values and must not be empty.
    #[error("sensor #{index} has an empty name")]
    EmptyName {
        /// Position of the sensor in the configuration.
        index: usize,
    },

    /// The pin does not exist on the board's GPIO bank 0.
    #[error("pin {pin} is out of range for {board} GPIO pins (0..{gpio_count})")]
    PinOutOfRange {
        /// Requested pin.
        pin: u8,
        /// Target board.
        board: Board,
        /// Number of bank-0 GPIO pins on the board.
        gpio_count: u8,
    },

    /// Only PWM channel B pins can count input edges.
    #[error("pin {pin} must be a PWM input pin (odd numbered GPIO pin)")]
    NotInputPin {
        /// Requested pin.
        pin: u8,
    },

    /// Two sensors need the same PWM slice.
    #[error("pin {pin} needs PWM slice {slice}, which is already in use")]
    SliceInUse {
        /// Requested pin.
        pin: u8,
        /// Slice the pin maps to.
        slice: u8,
    },

    /// Polling more often than once per millisecond is not supported.
    #[error("sensor `{name}`: update interval must be at least 1ms")]
    ZeroUpdateInterval {
        /// Sensor name.
        name: String,
    },

    /// A counter tunable is invalid.
    #[error("sensor `{name}`: {source}")]
    InvalidTunable {
        /// Sensor name.
        name: String,
        /// Underlying validation error.
        #[source]
        source: ConfigError,
    },

    /// The counter channel could not be activated.
    #[error("pulse counter setup failed: {0}")]
    Setup(#[from] SetupError),
}

/// A specialized `Result` type for sensor operations.
pub type SensorResult<T> = Result<T, SensorError>;

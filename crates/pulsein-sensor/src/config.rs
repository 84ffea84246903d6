//! YAML configuration of pulse rate sensors.
//!
//! ```yaml
//! board: rpipico
//! sensors:
//!   - name: fan_speed
//!     pin: 5
//!     unit: per_minute
//!     pulses_per_event: 2
//!     update_interval_ms: 10000
//! ```
//!
//! [`PulseInConfig::validate`] applies the board's pin rules and assigns each
//! sensor its PWM slice, which is also the counter channel it activates.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use pulsein_counter::reader::{DEFAULT_MAX_ATTEMPTS, DEFAULT_READ_WINDOW_US};
use pulsein_counter::{ChannelDescriptor, ChannelId, ConfigError, RateScale, RateUnit, ReadConfig};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{SensorError, SensorResult};
use crate::pins::{gpio_to_slice, is_input_pin};

/// Default polling period of a sensor.
pub const DEFAULT_UPDATE_INTERVAL_MS: u64 = 60_000;

/// Supported boards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Board {
    /// Raspberry Pi Pico (RP2040).
    #[serde(rename = "rpipico")]
    RpiPico,
    /// Raspberry Pi Pico 2 W (RP2350A).
    #[serde(rename = "rpipico2w")]
    RpiPico2W,
}

impl Board {
    /// Number of GPIO pins in bank 0.
    #[must_use]
    pub const fn bank0_gpio_count(self) -> u8 {
        match self {
            Self::RpiPico | Self::RpiPico2W => 30,
        }
    }

    /// Configuration name of the board.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::RpiPico => "rpipico",
            Self::RpiPico2W => "rpipico2w",
        }
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn default_update_interval_ms() -> u64 {
    DEFAULT_UPDATE_INTERVAL_MS
}

fn default_pulses_per_event() -> u32 {
    1
}

fn default_read_window_us() -> u32 {
    DEFAULT_READ_WINDOW_US
}

fn default_max_read_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

/// Configuration of one pulse rate sensor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SensorConfig {
    /// Name the sensor publishes under.
    pub name: String,
    /// GPIO the pulses arrive on. Must be a PWM channel B pin.
    pub pin: u8,
    /// Polling period in milliseconds.
    #[serde(default = "default_update_interval_ms")]
    pub update_interval_ms: u64,
    /// Unit of the published rate.
    #[serde(default)]
    pub unit: RateUnit,
    /// Pulses making up one counted event.
    #[serde(default = "default_pulses_per_event")]
    pub pulses_per_event: u32,
    /// Decimal places of the published value.
    #[serde(default)]
    pub accuracy_decimals: u8,
    /// Consistent read window in microseconds.
    #[serde(default = "default_read_window_us")]
    pub read_window_us: u32,
    /// Attempts per read before the update is skipped.
    #[serde(default = "default_max_read_attempts")]
    pub max_read_attempts: u32,
}

impl SensorConfig {
    /// Sensor on `pin` with all defaults.
    #[must_use]
    pub fn new(name: impl Into<String>, pin: u8) -> Self {
        Self {
            name: name.into(),
            pin,
            update_interval_ms: DEFAULT_UPDATE_INTERVAL_MS,
            unit: RateUnit::default(),
            pulses_per_event: default_pulses_per_event(),
            accuracy_decimals: 0,
            read_window_us: DEFAULT_READ_WINDOW_US,
            max_read_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Set the published unit and pulses per event.
    #[must_use]
    pub fn with_unit(mut self, unit: RateUnit, pulses_per_event: u32) -> Self {
        self.unit = unit;
        self.pulses_per_event = pulses_per_event;
        self
    }

    /// Set the polling period.
    #[must_use]
    pub fn with_update_interval_ms(mut self, update_interval_ms: u64) -> Self {
        self.update_interval_ms = update_interval_ms;
        self
    }

    /// Set the number of published decimal places.
    #[must_use]
    pub fn with_accuracy_decimals(mut self, accuracy_decimals: u8) -> Self {
        self.accuracy_decimals = accuracy_decimals;
        self
    }

    /// Set the consistent read tuning.
    #[must_use]
    pub fn with_read_tuning(mut self, read_window_us: u32, max_read_attempts: u32) -> Self {
        self.read_window_us = read_window_us;
        self.max_read_attempts = max_read_attempts;
        self
    }

    /// Polling period.
    #[must_use]
    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }

    /// Rate scale for the configured unit.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroPulsesPerEvent`] for zero pulses per event.
    pub fn scale(&self) -> Result<RateScale, ConfigError> {
        RateScale::from_unit(self.unit, self.pulses_per_event)
    }

    /// Read protocol tuning.
    ///
    /// # Errors
    ///
    /// Returns an error if the window or the attempt budget is zero.
    pub fn read_config(&self) -> Result<ReadConfig, ConfigError> {
        ReadConfig::new(self.read_window_us, self.max_read_attempts)
    }

    fn check_tunables(&self) -> SensorResult<()> {
        if self.update_interval_ms == 0 {
            return Err(SensorError::ZeroUpdateInterval {
                name: self.name.clone(),
            });
        }
        self.scale()
            .and_then(|_| self.read_config())
            .map(|_| ())
            .map_err(|source| SensorError::InvalidTunable {
                name: self.name.clone(),
                source,
            })
    }
}

/// A sensor that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSensor {
    /// Position among the configured sensors.
    pub index: usize,
    /// PWM slice counting the sensor's pulses.
    pub slice: u8,
    /// The sensor's configuration.
    pub config: SensorConfig,
}

impl ValidatedSensor {
    /// Counter channel of the sensor.
    #[must_use]
    pub fn channel(&self) -> ChannelId {
        ChannelId::new(self.slice)
    }

    /// Channel descriptor to activate.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a tunable is invalid. Cannot happen for a
    /// sensor produced by [`PulseInConfig::validate`] unless its config was
    /// modified afterwards.
    pub fn descriptor(&self) -> Result<ChannelDescriptor, ConfigError> {
        Ok(ChannelDescriptor::new(self.channel(), self.config.pin)
            .with_scale(self.config.scale()?)
            .with_read_config(self.config.read_config()?))
    }
}

/// Top-level configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PulseInConfig {
    /// Target board.
    pub board: Board,
    /// Configured sensors.
    #[serde(default)]
    pub sensors: Vec<SensorConfig>,
}

impl PulseInConfig {
    /// Empty configuration for `board`.
    #[must_use]
    pub fn new(board: Board) -> Self {
        Self {
            board,
            sensors: Vec::new(),
        }
    }

    /// Add a sensor.
    #[must_use]
    pub fn with_sensor(mut self, sensor: SensorConfig) -> Self {
        self.sensors.push(sensor);
        self
    }

    /// Parse a YAML document.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::Parse`] if the document does not match the
    /// schema. The result is not validated.
    pub fn from_yaml_str(yaml: &str) -> SensorResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::Io`] or [`SensorError::Parse`].
    pub fn load(path: &Path) -> SensorResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&content)?;
        debug!(path = %path.display(), sensors = config.sensors.len(), "loaded pulse sensor configuration");
        Ok(config)
    }

    /// Serialize back to YAML.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::Parse`] if serialization fails.
    pub fn to_yaml_string(&self) -> SensorResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Validate every sensor in order and assign its slice.
    ///
    /// A sensor's pin must exist on the board, must be a channel B pin and
    /// must not share its slice with an earlier sensor.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn validate(&self) -> SensorResult<Vec<ValidatedSensor>> {
        let gpio_count = self.board.bank0_gpio_count();
        let mut used_slices: u32 = 0;
        let mut validated = Vec::with_capacity(self.sensors.len());

        for (index, sensor) in self.sensors.iter().enumerate() {
            if sensor.name.trim().is_empty() {
                return Err(SensorError::EmptyName { index });
            }
            let pin = sensor.pin;
            if pin >= gpio_count {
                return Err(SensorError::PinOutOfRange {
                    pin,
                    board: self.board,
                    gpio_count,
                });
            }
            if !is_input_pin(pin) {
                return Err(SensorError::NotInputPin { pin });
            }
            let slice = gpio_to_slice(pin);
            let bit = 1u32 << slice;
            if used_slices & bit != 0 {
                return Err(SensorError::SliceInUse { pin, slice });
            }
            sensor.check_tunables()?;

            used_slices |= bit;
            validated.push(ValidatedSensor {
                index,
                slice,
                config: sensor.clone(),
            });
        }
        Ok(validated)
    }
}

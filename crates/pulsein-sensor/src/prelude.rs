//! Prelude for pulsein-sensor.
//!
//! Re-exports the sensor types together with the counter types needed to
//! drive them.

pub use crate::clock::SystemClock;
pub use crate::config::{Board, PulseInConfig, SensorConfig, ValidatedSensor};
pub use crate::error::{SensorError, SensorResult};
pub use crate::sensor::{PulseRateSensor, SensorState};
pub use crate::sink::{MemorySink, StateSink, TracingSink};

pub use pulsein_counter::prelude::*;

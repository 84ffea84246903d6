//! # pulsein-sensor
//!
//! Pulse rate sensors on top of [`pulsein_counter`]: each sensor counts the
//! rising edges on one RP2040 / RP2350 PWM input pin and periodically
//! publishes the rate in hertz or per minute.
//!
//! - [`config`]: YAML configuration and pin validation
//! - [`sensor`]: the polling component
//! - [`sink`]: where published values go
//!
//! ## Example
//!
//! ```rust
//! use pulsein_counter::sim::{ManualClock, SimulatedPwm};
//! use pulsein_sensor::prelude::*;
//!
//! let config = PulseInConfig::from_yaml_str(
//!     "board: rpipico\nsensors:\n  - name: fan\n    pin: 5\n    unit: per_minute\n    pulses_per_event: 2\n",
//! )
//! .expect("valid yaml");
//! let sensors = config.validate().expect("valid pins");
//!
//! let counter = PulseCounter::new(SimulatedPwm::rp2040());
//! let clock = ManualClock::new(0);
//! let sink = MemorySink::new();
//!
//! let mut fan = PulseRateSensor::new(&counter, sensors[0].clone());
//! fan.setup(&clock).expect("channel free");
//!
//! counter.hal().pulse(fan.config().channel(), 40);
//! clock.set_us(1_000_000);
//! fan.update(&clock, &sink);
//! assert_eq!(sink.last("fan"), Some(1200.0));
//! ```

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    missing_debug_implementations
)]
#![warn(clippy::pedantic)]

pub mod clock;
pub mod config;
pub mod error;
pub mod pins;
pub mod prelude;
pub mod sensor;
pub mod sink;

pub use clock::SystemClock;
pub use config::{Board, PulseInConfig, SensorConfig, ValidatedSensor};
pub use error::{SensorError, SensorResult};
pub use pins::{PwmChannel, gpio_to_channel, gpio_to_slice};
pub use sensor::{PulseRateSensor, SensorState};
pub use sink::{MemorySink, StateSink, TracingSink};

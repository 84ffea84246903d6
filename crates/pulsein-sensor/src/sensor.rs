//! Polling pulse rate sensor.
//!
//! [`PulseRateSensor`] owns one counter channel. An external scheduler calls
//! [`PulseRateSensor::setup`] once and [`PulseRateSensor::update`] every
//! [`PulseRateSensor::update_interval`]. A sensor whose setup failed stays
//! failed and never polls; a failed read only skips that one update.

use std::time::Duration;

use pulsein_counter::{
    ChannelHandle, MonotonicClock, PulseCounter, PulseCounterHal, ReadStats, SetupError,
};
use tracing::{debug, error, info, warn};

use crate::config::ValidatedSensor;
use crate::error::SensorResult;
use crate::pins::gpio_to_channel;
use crate::sink::StateSink;

/// Lifecycle of a sensor.
#[derive(Debug, Clone)]
pub enum SensorState {
    /// Created, `setup` not called yet.
    Pending,
    /// Counting and ready to poll.
    Active(ChannelHandle),
    /// Setup failed; the sensor never polls.
    Failed(SetupError),
}

/// Periodically publishes the pulse rate of one channel.
#[derive(Debug)]
pub struct PulseRateSensor<'c, H> {
    counter: &'c PulseCounter<H>,
    sensor: ValidatedSensor,
    state: SensorState,
}

impl<'c, H: PulseCounterHal> PulseRateSensor<'c, H> {
    /// Sensor for `sensor`, counting on `counter`.
    #[must_use]
    pub fn new(counter: &'c PulseCounter<H>, sensor: ValidatedSensor) -> Self {
        Self {
            counter,
            sensor,
            state: SensorState::Pending,
        }
    }

    /// Name the sensor publishes under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.sensor.config.name
    }

    /// Validated configuration.
    #[must_use]
    pub fn config(&self) -> &ValidatedSensor {
        &self.sensor
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> &SensorState {
        &self.state
    }

    /// Whether setup failed.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self.state, SensorState::Failed(_))
    }

    /// Read statistics, once active.
    #[must_use]
    pub fn stats(&self) -> Option<ReadStats> {
        match &self.state {
            SensorState::Active(handle) => Some(handle.stats()),
            SensorState::Pending | SensorState::Failed(_) => None,
        }
    }

    /// Polling period for the scheduler.
    #[must_use]
    pub fn update_interval(&self) -> Duration {
        self.sensor.config.update_interval()
    }

    /// Activate the sensor's counter channel.
    ///
    /// Calling it again on an active sensor is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::Setup`](crate::SensorError::Setup) if the
    /// channel cannot be activated; the sensor is then marked failed.
    pub fn setup<C>(&mut self, clock: &C) -> SensorResult<()>
    where
        C: MonotonicClock + ?Sized,
    {
        match &self.state {
            SensorState::Active(_) => return Ok(()),
            SensorState::Failed(err) => return Err((*err).into()),
            SensorState::Pending => {}
        }

        let activated = self
            .sensor
            .descriptor()
            .map_err(SetupError::from)
            .and_then(|descriptor| self.counter.activate(descriptor, clock));

        match activated {
            Ok(handle) => {
                debug!(sensor = self.name(), slice = self.sensor.slice, "sensor active");
                self.state = SensorState::Active(handle);
                Ok(())
            }
            Err(err) => {
                error!(sensor = self.name(), pin = self.sensor.config.pin, error = %err, "sensor setup failed");
                self.state = SensorState::Failed(err);
                Err(err.into())
            }
        }
    }

    /// Poll the channel and publish the rate.
    ///
    /// Returns the published value, or `None` if nothing was published
    /// because the sensor is not active or the read was inconsistent.
    pub fn update<C, S>(&mut self, clock: &C, sink: &S) -> Option<f64>
    where
        C: MonotonicClock + ?Sized,
        S: StateSink + ?Sized,
    {
        let SensorState::Active(handle) = &mut self.state else {
            debug!(sensor = %self.sensor.config.name, "update skipped, sensor not active");
            return None;
        };

        match self.counter.read(handle, clock) {
            Ok(reading) => {
                let value = round_to_decimals(reading.rate, self.sensor.config.accuracy_decimals);
                debug!(
                    sensor = %self.sensor.config.name,
                    pulses = reading.pulses,
                    elapsed_us = reading.elapsed_us,
                    attempts = reading.attempts,
                    value,
                    "pulse rate read"
                );
                sink.publish(&self.sensor.config.name, value);
                Some(value)
            }
            Err(err) => {
                warn!(sensor = %self.sensor.config.name, error = %err, "skipping update");
                None
            }
        }
    }

    /// Log the sensor's configuration.
    pub fn dump_config(&self) {
        let config = &self.sensor.config;
        info!(
            sensor = %config.name,
            pin = config.pin,
            slice = self.sensor.slice,
            channel = %gpio_to_channel(config.pin),
            unit = config.unit.symbol(),
            pulses_per_event = config.pulses_per_event,
            update_interval_ms = config.update_interval_ms,
            "pulse rate sensor"
        );
        if let SensorState::Failed(err) = &self.state {
            error!(sensor = %config.name, error = %err, "setup failed, sensor is disabled");
        }
    }
}

/// Round `value` to `decimals` places.
///
/// Values that cannot be scaled without overflowing are returned unchanged.
#[must_use]
pub fn round_to_decimals(value: f64, decimals: u8) -> f64 {
    let factor = 10f64.powi(i32::from(decimals));
    let scaled = value * factor;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / factor
}

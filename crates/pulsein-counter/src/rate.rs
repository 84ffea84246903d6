//! Samples of the extended count and the rate derived from two of them.

use crate::clock::elapsed_us;
use crate::error::ConfigError;
use crate::hal::low_bits_mask;

/// Width of the software high word in bits.
pub const HIGH_WORD_BITS: u32 = u32::BITS;

/// Extended count and the time it was read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sample {
    /// `(high << counter_bits) | low`.
    pub count: u64,
    /// Clock reading closest to the accepted `low` read.
    pub timestamp_us: u32,
}

impl Sample {
    /// Build a sample from its parts.
    #[must_use]
    pub const fn new(count: u64, timestamp_us: u32) -> Self {
        Self {
            count,
            timestamp_us,
        }
    }

    /// Combine a high word and a raw counter value.
    ///
    /// `low` is masked to `counter_bits`.
    #[must_use]
    pub const fn from_parts(high: u32, low: u32, counter_bits: u32, timestamp_us: u32) -> Self {
        let count = ((high as u64) << counter_bits) | (low as u64 & low_bits_mask(counter_bits));
        Self::new(count, timestamp_us)
    }
}

/// Pulses between two samples, modulo the full extended width.
///
/// The extended count is `32 + counter_bits` wide; wrapping of the extended
/// count itself therefore still yields the small forward distance.
#[inline]
#[must_use]
pub const fn pulse_delta(previous: &Sample, current: &Sample, counter_bits: u32) -> u64 {
    current.count.wrapping_sub(previous.count)
        & low_bits_mask(HIGH_WORD_BITS.saturating_add(counter_bits))
}

/// Unit of the published rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RateUnit {
    /// Events per second.
    #[default]
    Hertz,
    /// Events per minute (RPM for one event per revolution).
    PerMinute,
}

impl RateUnit {
    /// Seconds per unit time.
    #[must_use]
    pub const fn seconds(self) -> f64 {
        match self {
            Self::Hertz => 1.0,
            Self::PerMinute => 60.0,
        }
    }

    /// Unit symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Hertz => "Hz",
            Self::PerMinute => "1/min",
        }
    }
}

/// Conversion from pulses per second to the published unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateScale {
    multiplier: f64,
}

impl Default for RateScale {
    fn default() -> Self {
        Self::hertz()
    }
}

impl RateScale {
    /// Pulses per second.
    #[must_use]
    pub const fn hertz() -> Self {
        Self { multiplier: 1.0 }
    }

    /// Pulses per minute.
    #[must_use]
    pub const fn per_minute() -> Self {
        Self { multiplier: 60.0 }
    }

    /// Arbitrary multiplier applied to pulses per second.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidMultiplier`] unless `multiplier` is finite
    /// and positive.
    pub fn with_multiplier(multiplier: f64) -> Result<Self, ConfigError> {
        let scale = Self { multiplier };
        scale.validate()?;
        Ok(scale)
    }

    /// Events in `unit` when each event produces `pulses_per_event` pulses.
    ///
    /// A quadrature input counted on both edges of both phases gives four
    /// pulses per event.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroPulsesPerEvent`] if `pulses_per_event` is 0.
    pub fn from_unit(unit: RateUnit, pulses_per_event: u32) -> Result<Self, ConfigError> {
        if pulses_per_event == 0 {
            return Err(ConfigError::ZeroPulsesPerEvent);
        }
        Ok(Self {
            multiplier: unit.seconds() / f64::from(pulses_per_event),
        })
    }

    /// The multiplier applied to pulses per second.
    #[must_use]
    pub const fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Check the multiplier is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidMultiplier`] for non-finite or
    /// non-positive multipliers.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.multiplier.is_finite() && self.multiplier > 0.0 {
            Ok(())
        } else {
            Err(ConfigError::InvalidMultiplier)
        }
    }

    /// Rate for `pulses` counted over `elapsed_us` microseconds.
    ///
    /// An empty interval reports zero rather than dividing by zero; this is
    /// what the first read right after activation sees.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn rate(&self, pulses: u64, elapsed_us: u32) -> f64 {
        if elapsed_us == 0 {
            return 0.0;
        }
        pulses as f64 * 1_000_000.0 / f64::from(elapsed_us) * self.multiplier
    }
}

/// One computed rate and the deltas it came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateReading {
    /// Rate in the channel's unit.
    pub rate: f64,
    /// Pulses counted since the previous sample.
    pub pulses: u64,
    /// Microseconds since the previous sample.
    pub elapsed_us: u32,
    /// Attempts the consistent read needed (1 on the happy path).
    pub attempts: u32,
    /// The sample that now serves as the previous one.
    pub sample: Sample,
}

impl RateReading {
    /// Compute the reading between two samples.
    #[must_use]
    pub fn between(
        previous: &Sample,
        current: &Sample,
        counter_bits: u32,
        scale: &RateScale,
        attempts: u32,
    ) -> Self {
        let pulses = pulse_delta(previous, current, counter_bits);
        let elapsed = elapsed_us(previous.timestamp_us, current.timestamp_us);
        Self {
            rate: scale.rate(pulses, elapsed),
            pulses,
            elapsed_us: elapsed,
            attempts,
            sample: *current,
        }
    }
}

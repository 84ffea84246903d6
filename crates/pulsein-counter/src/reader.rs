//! Consistent read of the extended count.
//!
//! The high word is written by the wrap interrupt, the low word by the
//! counting hardware, and the poller reads both without a lock. A snapshot is
//! accepted only when nothing could have wrapped between the reads:
//!
//! ```text
//! t_a = now()
//! high_a = tracker.high(ch)
//! low = hal.counter(ch)
//! pending = hal.pending() has ch
//! t_b = now()
//! high_b = tracker.high(ch)
//!
//! reject if high_a != high_b     wrap serviced mid-read, low is ambiguous
//! reject if pending              wrap latched but not yet counted in high
//! reject if t_b - t_a >= window  something preempted the read
//! accept (high_a << W) | low @ t_b
//! ```
//!
//! The flag is sampled before `high_b`: the handler increments before it
//! clears, so a flag seen clear after a post-wrap `low` means the increment
//! already happened, and `high_b` then catches it unless it predates `high_a`.

use tracing::{debug, trace};

use crate::channel::ChannelId;
use crate::clock::{MonotonicClock, elapsed_us};
use crate::error::{ConfigError, ReadError};
use crate::hal::PulseCounterHal;
use crate::rate::Sample;
use crate::tracker::WrapTracker;

/// Default read window in microseconds.
///
/// A clean read takes under 5 µs on RP2040.
pub const DEFAULT_READ_WINDOW_US: u32 = 20;

/// Default attempt budget of one read.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 64;

/// Tuning of the consistent read protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadConfig {
    /// A read whose timestamps are this far apart or more is retried.
    ///
    /// Depends on interrupt latency and scheduler jitter of the platform.
    pub read_window_us: u32,
    /// Attempts before giving up with
    /// [`ReadError::ConsistencyRetryExhausted`].
    pub max_attempts: u32,
}

impl Default for ReadConfig {
    fn default() -> Self {
        Self {
            read_window_us: DEFAULT_READ_WINDOW_US,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl ReadConfig {
    /// Create a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if either value is zero.
    pub fn new(read_window_us: u32, max_attempts: u32) -> Result<Self, ConfigError> {
        let config = Self {
            read_window_us,
            max_attempts,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroReadWindow`] or [`ConfigError::ZeroAttempts`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.read_window_us == 0 {
            return Err(ConfigError::ZeroReadWindow);
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        Ok(())
    }
}

/// An accepted snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsistentRead {
    /// The consistent sample.
    pub sample: Sample,
    /// High word the sample was built from.
    pub high: u32,
    /// Raw counter value the sample was built from.
    pub low: u32,
    /// Attempts used, including the accepted one.
    pub attempts: u32,
}

/// Why one attempt was thrown away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    HighChanged,
    WrapPending,
    SlowRead,
}

/// Read a consistent `(high, low, timestamp)` snapshot of `channel`.
///
/// # Real-Time Safety
///
/// Allocation-free and lock-free. Bounded by `config.max_attempts`
/// iterations.
///
/// # Errors
///
/// Returns [`ReadError::ConsistencyRetryExhausted`] when every attempt was
/// rejected.
pub fn read_consistent<H, C>(
    hal: &H,
    tracker: &WrapTracker,
    channel: ChannelId,
    clock: &C,
    config: &ReadConfig,
) -> Result<ConsistentRead, ReadError>
where
    H: PulseCounterHal + ?Sized,
    C: MonotonicClock + ?Sized,
{
    let counter_bits = hal.counter_bits();
    let attempts = config.max_attempts.max(1);

    for attempt in 1..=attempts {
        let t_a = clock.now_us();
        let high_a = tracker.high_word(channel);
        let low = hal.raw_counter(channel);
        let pending = hal.pending_wraps().contains(channel);
        let t_b = clock.now_us();
        let high_b = tracker.high_word(channel);

        let rejection = if high_a != high_b {
            Some(Rejection::HighChanged)
        } else if pending {
            Some(Rejection::WrapPending)
        } else if elapsed_us(t_a, t_b) >= config.read_window_us {
            Some(Rejection::SlowRead)
        } else {
            None
        };

        match rejection {
            None => {
                return Ok(ConsistentRead {
                    sample: Sample::from_parts(high_a, low, counter_bits, t_b),
                    high: high_a,
                    low,
                    attempts: attempt,
                });
            }
            Some(reason) => {
                trace!(%channel, attempt, ?reason, "counter read rejected");
            }
        }
    }

    debug!(%channel, attempts, "consistent counter read exhausted its attempts");
    Err(ReadError::ConsistencyRetryExhausted { channel, attempts })
}

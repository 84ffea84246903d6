//! Channel activation and the per-channel read entry points.
//!
//! [`PulseCounter`] owns the hardware handle and the [`WrapTracker`]. It is
//! the object a platform places in a `static` so that its wrap interrupt
//! vector can call [`PulseCounter::on_wrap_interrupt`].
//!
//! Each activated channel is represented by a [`ChannelHandle`] owned by the
//! polling side. The handle carries the previous [`Sample`], so reading a
//! channel requires `&mut ChannelHandle` and cannot be re-entered for the
//! same channel.

use portable_atomic::{AtomicBool, Ordering};
use tracing::debug;

use crate::channel::{ChannelDescriptor, ChannelId};
use crate::clock::MonotonicClock;
use crate::error::{ReadError, SetupError};
use crate::hal::{PulseCounterHal, is_supported_counter_width};
use crate::rate::{RateReading, RateScale, Sample};
use crate::reader::{ReadConfig, read_consistent};
use crate::tracker::WrapTracker;

/// Read statistics of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadStats {
    /// Successful reads.
    pub reads: u64,
    /// Rejected attempts across all reads, successful or not.
    pub retries: u64,
    /// Reads that ran out of attempts.
    pub exhausted: u64,
}

/// Polling-side state of one activated channel.
#[derive(Debug, Clone)]
pub struct ChannelHandle {
    channel: ChannelId,
    pin: u8,
    counter_bits: u32,
    scale: RateScale,
    read: ReadConfig,
    last: Sample,
    stats: ReadStats,
}

impl ChannelHandle {
    /// Hardware channel.
    #[must_use]
    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    /// Input pin.
    #[must_use]
    pub fn pin(&self) -> u8 {
        self.pin
    }

    /// Raw counter width in bits.
    #[must_use]
    pub fn counter_bits(&self) -> u32 {
        self.counter_bits
    }

    /// Rate scale applied to this channel.
    #[must_use]
    pub fn scale(&self) -> &RateScale {
        &self.scale
    }

    /// Read protocol tuning of this channel.
    #[must_use]
    pub fn read_config(&self) -> &ReadConfig {
        &self.read
    }

    /// Sample the next rate is computed against.
    #[must_use]
    pub fn last_sample(&self) -> Sample {
        self.last
    }

    /// Read statistics.
    #[must_use]
    pub fn stats(&self) -> ReadStats {
        self.stats
    }
}

/// Extended pulse counters sharing one wrap interrupt.
///
/// # Example
///
/// ```rust
/// use pulsein_counter::prelude::*;
/// use pulsein_counter::sim::{ManualClock, SimulatedPwm};
///
/// static COUNTER: PulseCounter<SimulatedPwm> = PulseCounter::new(SimulatedPwm::rp2040());
///
/// // Platform wrap interrupt vector
/// fn pwm_irq_wrap() {
///     COUNTER.on_wrap_interrupt();
/// }
///
/// let clock = ManualClock::new(0);
/// let ch = ChannelId::new(0);
/// let mut handle = COUNTER
///     .activate(ChannelDescriptor::new(ch, 1), &clock)
///     .expect("activation");
///
/// COUNTER.hal().pulse(ch, 70_000);
/// pwm_irq_wrap();
///
/// clock.set_us(1_000_000);
/// let reading = COUNTER.read(&mut handle, &clock).expect("read");
/// assert_eq!(reading.pulses, 70_000);
/// ```
#[derive(Debug)]
pub struct PulseCounter<H> {
    hal: H,
    tracker: WrapTracker,
    handler_installed: AtomicBool,
}

impl<H: PulseCounterHal> PulseCounter<H> {
    /// Wrap `hal` with a fresh tracker.
    #[must_use]
    pub const fn new(hal: H) -> Self {
        Self {
            hal,
            tracker: WrapTracker::new(),
            handler_installed: AtomicBool::new(false),
        }
    }

    /// The hardware handle.
    #[must_use]
    pub fn hal(&self) -> &H {
        &self.hal
    }

    /// The wraparound tracker.
    #[must_use]
    pub fn tracker(&self) -> &WrapTracker {
        &self.tracker
    }

    /// Activate a channel for pulse counting.
    ///
    /// Validation happens first and a failure leaves hardware and tracker
    /// untouched. On success the channel is configured for rising-edge
    /// counting, brought into the shared interrupt's scope with any stale
    /// wrap flag cleared before its interrupt is enabled, started, and its
    /// first sample is taken so that the first rate covers only time since
    /// activation.
    ///
    /// Must be called before polling starts and not concurrently with other
    /// activations.
    ///
    /// # Errors
    ///
    /// - [`SetupError::InvalidConfiguration`] for invalid tunables
    /// - [`SetupError::IncompatibleChannel`] if the channel does not exist,
    ///   cannot count on `pin`, or the hardware counter width is outside
    ///   `1..=`[`MAX_COUNTER_BITS`](crate::hal::MAX_COUNTER_BITS)
    /// - [`SetupError::ChannelAlreadyActive`] if the channel is enabled
    ///   already
    pub fn activate<C>(
        &self,
        descriptor: ChannelDescriptor,
        clock: &C,
    ) -> Result<ChannelHandle, SetupError>
    where
        C: MonotonicClock + ?Sized,
    {
        let ChannelDescriptor {
            channel,
            pin,
            scale,
            read,
        } = descriptor;

        descriptor.validate()?;
        let counter_bits = self.hal.counter_bits();
        if !is_supported_counter_width(counter_bits)
            || channel.index() >= self.hal.channel_count()
            || channel.mask().is_empty()
            || !self.hal.supports_edge_counting(channel, pin)
        {
            return Err(SetupError::IncompatibleChannel { channel, pin });
        }
        if self.hal.is_counting_enabled(channel) || self.tracker.is_in_use(channel) {
            return Err(SetupError::ChannelAlreadyActive { channel });
        }

        self.hal.configure_edge_counting(channel, pin);
        if !self.handler_installed.swap(true, Ordering::SeqCst) {
            self.hal.install_wrap_handler();
            debug!("installed shared wrap interrupt handler");
        }
        self.tracker.mark_in_use(channel);
        self.hal.clear_wraps(channel.mask());
        self.hal.set_wrap_interrupt_enabled(channel, true);
        self.hal.set_counting_enabled(channel, true);

        // Counter was reset by configure; no wrap can be pending this early.
        let last = Sample::from_parts(
            self.tracker.high_word(channel),
            self.hal.raw_counter(channel),
            counter_bits,
            clock.now_us(),
        );

        debug!(%channel, pin, counter_bits, "pulse channel activated");
        Ok(ChannelHandle {
            channel,
            pin,
            counter_bits,
            scale,
            read,
            last,
            stats: ReadStats::default(),
        })
    }

    /// Wrap interrupt entry point.
    ///
    /// # Real-Time Safety
    ///
    /// Interrupt-safe, see [`WrapTracker::service`].
    #[inline]
    pub fn on_wrap_interrupt(&self) {
        self.tracker.service(&self.hal);
    }

    /// Take a consistent sample of `handle`'s channel without consuming it.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::ConsistencyRetryExhausted`] if no consistent
    /// snapshot was obtained within the channel's attempt budget.
    pub fn sample<C>(&self, handle: &ChannelHandle, clock: &C) -> Result<Sample, ReadError>
    where
        C: MonotonicClock + ?Sized,
    {
        read_consistent(&self.hal, &self.tracker, handle.channel, clock, &handle.read)
            .map(|read| read.sample)
    }

    /// Read the channel and compute the rate since the previous read.
    ///
    /// On success the new sample replaces the previous one. On failure the
    /// previous sample is kept.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::ConsistencyRetryExhausted`] if no consistent
    /// snapshot was obtained within the channel's attempt budget.
    pub fn read<C>(&self, handle: &mut ChannelHandle, clock: &C) -> Result<RateReading, ReadError>
    where
        C: MonotonicClock + ?Sized,
    {
        match read_consistent(&self.hal, &self.tracker, handle.channel, clock, &handle.read) {
            Ok(read) => {
                let reading = RateReading::between(
                    &handle.last,
                    &read.sample,
                    handle.counter_bits,
                    &handle.scale,
                    read.attempts,
                );
                handle.last = read.sample;
                handle.stats.reads = handle.stats.reads.saturating_add(1);
                handle.stats.retries = handle
                    .stats
                    .retries
                    .saturating_add(u64::from(read.attempts.saturating_sub(1)));
                Ok(reading)
            }
            Err(err) => {
                let ReadError::ConsistencyRetryExhausted { attempts, .. } = err;
                handle.stats.exhausted = handle.stats.exhausted.saturating_add(1);
                handle.stats.retries = handle.stats.retries.saturating_add(u64::from(attempts));
                Err(err)
            }
        }
    }

    /// Read the channel and return the rate in its configured unit.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::ConsistencyRetryExhausted`] if no consistent
    /// snapshot was obtained within the channel's attempt budget.
    pub fn read_rate<C>(&self, handle: &mut ChannelHandle, clock: &C) -> Result<f64, ReadError>
    where
        C: MonotonicClock + ?Sized,
    {
        self.read(handle, clock).map(|reading| reading.rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{ManualClock, SimulatedPwm};

    #[test]
    fn test_activation_sequence() -> Result<(), SetupError> {
        let counter = PulseCounter::new(SimulatedPwm::rp2040());
        let clock = ManualClock::new(1_000);
        let ch = ChannelId::new(3);
        counter.hal().force_pending(ch);

        let handle = counter.activate(ChannelDescriptor::new(ch, 7), &clock)?;

        let pwm = counter.hal();
        assert!(pwm.is_counting_enabled(ch));
        assert!(pwm.is_wrap_interrupt_enabled(ch));
        assert!(!pwm.pending_wraps().contains(ch), "stale flag cleared");
        assert_eq!(pwm.wrap_handler_installs(), 1);
        assert!(counter.tracker().is_in_use(ch));
        assert_eq!(handle.last_sample(), Sample::new(0, 1_000));
        assert_eq!(handle.pin(), 7);
        assert_eq!(handle.counter_bits(), 16);
        Ok(())
    }

    #[test]
    fn test_handler_installed_once() -> Result<(), SetupError> {
        let counter = PulseCounter::new(SimulatedPwm::rp2040());
        let clock = ManualClock::new(0);
        counter.activate(ChannelDescriptor::new(ChannelId::new(0), 1), &clock)?;
        counter.activate(ChannelDescriptor::new(ChannelId::new(1), 3), &clock)?;
        counter.activate(ChannelDescriptor::new(ChannelId::new(2), 5), &clock)?;
        assert_eq!(counter.hal().wrap_handler_installs(), 1);
        assert_eq!(counter.tracker().channels_in_use().len(), 3);
        Ok(())
    }

    #[test]
    fn test_second_activation_of_channel_fails() -> Result<(), SetupError> {
        let counter = PulseCounter::new(SimulatedPwm::rp2040());
        let clock = ManualClock::new(0);
        let ch = ChannelId::new(4);
        counter.activate(ChannelDescriptor::new(ch, 9), &clock)?;

        let again = counter.activate(ChannelDescriptor::new(ch, 9), &clock);
        assert!(matches!(again, Err(SetupError::ChannelAlreadyActive { .. })));
        Ok(())
    }

    #[test]
    fn test_out_of_range_channel_is_incompatible() {
        let counter = PulseCounter::new(SimulatedPwm::rp2040());
        let clock = ManualClock::new(0);
        let result = counter.activate(ChannelDescriptor::new(ChannelId::new(8), 17), &clock);
        assert!(matches!(result, Err(SetupError::IncompatibleChannel { .. })));
    }

    #[test]
    fn test_failed_read_keeps_previous_sample() -> Result<(), SetupError> {
        let counter = PulseCounter::new(SimulatedPwm::rp2040());
        let clock = ManualClock::new(0);
        let ch = ChannelId::new(0);
        let descriptor = ChannelDescriptor::new(ch, 1).with_read_config(ReadConfig {
            read_window_us: 20,
            max_attempts: 2,
        });
        let mut handle = counter.activate(descriptor, &clock)?;
        let seed = handle.last_sample();

        counter.hal().pulse(ch, 70_000);
        clock.set_us(10_000);
        assert!(counter.read(&mut handle, &clock).is_err());
        assert_eq!(handle.last_sample(), seed);
        assert_eq!(handle.stats().exhausted, 1);
        assert_eq!(handle.stats().retries, 2);

        counter.on_wrap_interrupt();
        let reading = counter.read(&mut handle, &clock);
        assert!(matches!(reading, Ok(r) if r.pulses == 70_000 && r.elapsed_us == 10_000));
        assert_eq!(handle.stats().reads, 1);
        Ok(())
    }
}

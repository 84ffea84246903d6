//! Simulated counting hardware and a manual clock.
//!
//! This module provides [`SimulatedPwm`], a software implementation of
//! [`PulseCounterHal`] for testing and hardware-free environments, and
//! [`ManualClock`], a [`MonotonicClock`] driven by the caller.
//!
//! Each channel's counter value and wrap flag share one atomic word, so a
//! wrap and its flag become visible together, as they do on RP2040 where
//! `CTR` and `INTR` update on the same clock edge.

use portable_atomic::{AtomicU32, AtomicU64, Ordering};

use crate::channel::{ChannelId, ChannelMask, MAX_CHANNELS};
use crate::clock::MonotonicClock;
use crate::hal::{PulseCounterHal, low_bits_mask};

const PENDING: u64 = 1 << 32;
const COUNT: u64 = PENDING - 1;

/// Software PWM-slice counters.
///
/// Channels count only while enabled. Pins are compatible with a channel when
/// they are odd (the B input of an RP2040 slice) and the channel was not
/// marked incompatible with [`mark_incompatible`](Self::mark_incompatible).
///
/// # Example
///
/// ```rust
/// use pulsein_counter::sim::SimulatedPwm;
/// use pulsein_counter::{ChannelId, PulseCounterHal};
///
/// let pwm = SimulatedPwm::new(8, 16);
/// let ch = ChannelId::new(0);
/// pwm.set_counting_enabled(ch, true);
///
/// assert_eq!(pwm.pulse(ch, 65_540), 1);
/// assert_eq!(pwm.raw_counter(ch), 4);
/// assert!(pwm.pending_wraps().contains(ch));
/// ```
#[derive(Debug)]
pub struct SimulatedPwm {
    channels: usize,
    counter_bits: u32,
    /// Counter value in the low 32 bits, wrap flag in bit 32.
    state: [AtomicU64; MAX_CHANNELS],
    counting: AtomicU32,
    wrap_irq: AtomicU32,
    incompatible: AtomicU32,
    handler_installs: AtomicU32,
}

impl SimulatedPwm {
    /// Create `channels` counters of `counter_bits` bits each.
    ///
    /// `channels` is clamped to [`MAX_CHANNELS`] and `counter_bits` to `1..=32`.
    #[must_use]
    pub const fn new(channels: usize, counter_bits: u32) -> Self {
        let channels = if channels > MAX_CHANNELS {
            MAX_CHANNELS
        } else {
            channels
        };
        let counter_bits = if counter_bits == 0 {
            1
        } else if counter_bits > 32 {
            32
        } else {
            counter_bits
        };
        Self {
            channels,
            counter_bits,
            state: [const { AtomicU64::new(0) }; MAX_CHANNELS],
            counting: AtomicU32::new(0),
            wrap_irq: AtomicU32::new(0),
            incompatible: AtomicU32::new(0),
            handler_installs: AtomicU32::new(0),
        }
    }

    /// Eight 16-bit channels, like the RP2040 PWM block.
    #[must_use]
    pub const fn rp2040() -> Self {
        Self::new(8, 16)
    }

    /// Feed `pulses` rising edges into `channel`.
    ///
    /// Returns how many times the counter wrapped. Any number of wraps latches
    /// a single flag, like the hardware does.
    pub fn pulse(&self, channel: ChannelId, pulses: u64) -> u64 {
        if !self.is_counting_enabled(channel) {
            return 0;
        }
        let Some(state) = self.slot(channel) else {
            return 0;
        };

        let bits = self.counter_bits;
        let mut wraps = 0;
        let update = state.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
            let total = (current & COUNT).saturating_add(pulses);
            wraps = total >> bits;
            let flag = if wraps > 0 { PENDING } else { current & PENDING };
            Some((total & low_bits_mask(bits)) | flag)
        });
        if update.is_err() {
            return 0;
        }
        wraps
    }

    /// Overwrite the raw counter of `channel`, leaving its flag alone.
    pub fn set_counter(&self, channel: ChannelId, value: u32) {
        if let Some(state) = self.slot(channel) {
            let value = u64::from(value) & low_bits_mask(self.counter_bits);
            let mut current = state.load(Ordering::SeqCst);
            while let Err(actual) = state.compare_exchange_weak(
                current,
                (current & PENDING) | value,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                current = actual;
            }
        }
    }

    /// Latch the wrap flag of `channel` without touching its counter.
    pub fn force_pending(&self, channel: ChannelId) {
        if let Some(state) = self.slot(channel) {
            state.fetch_or(PENDING, Ordering::SeqCst);
        }
    }

    /// Make `channel` reject every pin.
    pub fn mark_incompatible(&self, channel: ChannelId) {
        self.incompatible
            .fetch_or(channel.mask().bits(), Ordering::SeqCst);
    }

    /// Enable counting on `channel` as some other owner would.
    pub fn enable_externally(&self, channel: ChannelId) {
        self.set_counting_enabled(channel, true);
    }

    /// How many times the wrap handler was installed.
    #[must_use]
    pub fn wrap_handler_installs(&self) -> u32 {
        self.handler_installs.load(Ordering::SeqCst)
    }

    /// Whether the wrap interrupt of `channel` is enabled.
    #[must_use]
    pub fn is_wrap_interrupt_enabled(&self, channel: ChannelId) -> bool {
        ChannelMask::from_bits(self.wrap_irq.load(Ordering::SeqCst)).contains(channel)
    }

    fn slot(&self, channel: ChannelId) -> Option<&AtomicU64> {
        if channel.index() < self.channels {
            self.state.get(channel.index())
        } else {
            None
        }
    }

    fn set_bit(word: &AtomicU32, channel: ChannelId, on: bool) {
        let bit = channel.mask().bits();
        if on {
            word.fetch_or(bit, Ordering::SeqCst);
        } else {
            word.fetch_and(!bit, Ordering::SeqCst);
        }
    }
}

impl Default for SimulatedPwm {
    fn default() -> Self {
        Self::rp2040()
    }
}

impl PulseCounterHal for SimulatedPwm {
    fn counter_bits(&self) -> u32 {
        self.counter_bits
    }

    fn channel_count(&self) -> usize {
        self.channels
    }

    fn supports_edge_counting(&self, channel: ChannelId, pin: u8) -> bool {
        let incompatible = ChannelMask::from_bits(self.incompatible.load(Ordering::SeqCst));
        channel.index() < self.channels && pin % 2 == 1 && !incompatible.contains(channel)
    }

    fn is_counting_enabled(&self, channel: ChannelId) -> bool {
        ChannelMask::from_bits(self.counting.load(Ordering::SeqCst)).contains(channel)
    }

    fn configure_edge_counting(&self, channel: ChannelId, _pin: u8) {
        Self::set_bit(&self.counting, channel, false);
        if let Some(state) = self.slot(channel) {
            state.fetch_and(PENDING, Ordering::SeqCst);
        }
    }

    fn install_wrap_handler(&self) {
        self.handler_installs.fetch_add(1, Ordering::SeqCst);
    }

    fn set_wrap_interrupt_enabled(&self, channel: ChannelId, enabled: bool) {
        Self::set_bit(&self.wrap_irq, channel, enabled);
    }

    fn set_counting_enabled(&self, channel: ChannelId, enabled: bool) {
        Self::set_bit(&self.counting, channel, enabled);
    }

    #[allow(clippy::cast_possible_truncation)]
    fn raw_counter(&self, channel: ChannelId) -> u32 {
        self.slot(channel)
            .map_or(0, |state| (state.load(Ordering::SeqCst) & COUNT) as u32)
    }

    fn pending_wraps(&self) -> ChannelMask {
        self.state
            .iter()
            .take(self.channels)
            .enumerate()
            .filter(|(_, state)| state.load(Ordering::SeqCst) & PENDING != 0)
            .fold(ChannelMask::EMPTY, |mask, (index, _)| {
                #[allow(clippy::cast_possible_truncation)]
                let channel = ChannelId::new(index as u8);
                mask.union(channel.mask())
            })
    }

    fn clear_wraps(&self, mask: ChannelMask) {
        for channel in mask {
            if let Some(state) = self.slot(channel) {
                state.fetch_and(!PENDING, Ordering::SeqCst);
            }
        }
    }
}

/// Clock whose value is set by the caller.
///
/// With a non-zero step, every reading advances the clock by `step_us` after
/// returning, which makes each read-protocol window exactly `step_us` wide.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_us: AtomicU32,
    step_us: AtomicU32,
}

impl ManualClock {
    /// Clock frozen at `start_us`.
    #[must_use]
    pub const fn new(start_us: u32) -> Self {
        Self::with_step(start_us, 0)
    }

    /// Clock starting at `start_us` that advances `step_us` per reading.
    #[must_use]
    pub const fn with_step(start_us: u32, step_us: u32) -> Self {
        Self {
            now_us: AtomicU32::new(start_us),
            step_us: AtomicU32::new(step_us),
        }
    }

    /// Jump to `now_us`.
    pub fn set_us(&self, now_us: u32) {
        self.now_us.store(now_us, Ordering::SeqCst);
    }

    /// Move forward by `delta_us`, wrapping.
    pub fn advance_us(&self, delta_us: u32) {
        self.now_us.fetch_add(delta_us, Ordering::SeqCst);
    }

    /// Change the per-reading step.
    pub fn set_step_us(&self, step_us: u32) {
        self.step_us.store(step_us, Ordering::SeqCst);
    }
}

impl MonotonicClock for ManualClock {
    fn now_us(&self) -> u32 {
        let step = self.step_us.load(Ordering::SeqCst);
        self.now_us.fetch_add(step, Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_channel_ignores_pulses() {
        let pwm = SimulatedPwm::rp2040();
        let ch = ChannelId::new(3);
        assert_eq!(pwm.pulse(ch, 10), 0);
        assert_eq!(pwm.raw_counter(ch), 0);
    }

    #[test]
    fn test_pulse_wraps_and_latches_once() {
        let pwm = SimulatedPwm::rp2040();
        let ch = ChannelId::new(1);
        pwm.set_counting_enabled(ch, true);

        pwm.set_counter(ch, 65_530);
        assert_eq!(pwm.pulse(ch, 3 * 65_536), 3);
        assert_eq!(pwm.raw_counter(ch), 65_530);
        assert_eq!(pwm.pending_wraps(), ch.mask());
    }

    #[test]
    fn test_configure_resets_counter_but_keeps_flag() {
        let pwm = SimulatedPwm::rp2040();
        let ch = ChannelId::new(0);
        pwm.set_counting_enabled(ch, true);
        pwm.pulse(ch, 70_000);

        pwm.configure_edge_counting(ch, 1);

        assert_eq!(pwm.raw_counter(ch), 0);
        assert!(!pwm.is_counting_enabled(ch));
        assert!(pwm.pending_wraps().contains(ch));
    }

    #[test]
    fn test_set_counter_keeps_pending_flag() {
        let pwm = SimulatedPwm::rp2040();
        let ch = ChannelId::new(2);
        pwm.force_pending(ch);

        pwm.set_counter(ch, 0x1_2345);

        assert_eq!(pwm.raw_counter(ch), 0x2345, "value masked to counter width");
        assert!(pwm.pending_wraps().contains(ch));

        let other = ChannelId::new(3);
        pwm.set_counter(other, 7);
        assert_eq!(pwm.raw_counter(other), 7);
        assert!(!pwm.pending_wraps().contains(other));
    }

    #[test]
    fn test_pin_compatibility() {
        let pwm = SimulatedPwm::rp2040();
        assert!(pwm.supports_edge_counting(ChannelId::new(0), 1));
        assert!(!pwm.supports_edge_counting(ChannelId::new(0), 0));
        assert!(!pwm.supports_edge_counting(ChannelId::new(8), 17));

        pwm.mark_incompatible(ChannelId::new(0));
        assert!(!pwm.supports_edge_counting(ChannelId::new(0), 1));
    }

    #[test]
    fn test_manual_clock_step() {
        let clock = ManualClock::with_step(100, 7);
        assert_eq!(clock.now_us(), 100);
        assert_eq!(clock.now_us(), 107);
        clock.set_step_us(0);
        clock.advance_us(3);
        assert_eq!(clock.now_us(), 117);
        assert_eq!(clock.now_us(), 117);
    }
}

//! Hardware abstraction for the counting channels.
//!
//! This module provides the [`PulseCounterHal`] trait, the only way the core
//! touches hardware registers. A host-side implementation lives in
//! [`crate::sim`].

use crate::channel::{ChannelId, ChannelMask};

/// Narrow free-running counters with a latched wrap flag per channel.
///
/// On RP2040 each channel is a PWM slice in `DIV_B_RISING` mode: the 16-bit
/// `CTR` register counts rising edges on the slice's B pin and the slice's bit
/// in `INTR` latches on every wrap until written back.
///
/// # Real-Time Safety
///
/// [`raw_counter`](Self::raw_counter), [`pending_wraps`](Self::pending_wraps)
/// and [`clear_wraps`](Self::clear_wraps) are called from the wrap interrupt
/// and from the read protocol. They must not block or allocate.
///
/// # Implementation Requirements
///
/// 1. The counter value and the pending flag update together: a reader that
///    sees a wrapped counter value and then reads the flag sees it set (or
///    already cleared by the interrupt handler).
/// 2. [`clear_wraps`](Self::clear_wraps) clears exactly the given channels.
/// 3. [`configure_edge_counting`](Self::configure_edge_counting) leaves the
///    counter at zero and stopped.
pub trait PulseCounterHal: Send + Sync {
    /// Width of the raw counter in bits (16 on RP2040).
    ///
    /// Channels of hardware reporting a width outside
    /// `1..=`[`MAX_COUNTER_BITS`] cannot be activated.
    fn counter_bits(&self) -> u32;

    /// Number of counting channels the hardware provides.
    fn channel_count(&self) -> usize;

    /// Whether `pin` can drive rising-edge counting on `channel`.
    fn supports_edge_counting(&self, channel: ChannelId, pin: u8) -> bool;

    /// Whether counting is currently enabled on `channel`, by anyone.
    fn is_counting_enabled(&self, channel: ChannelId) -> bool;

    /// Put `channel` in rising-edge counting mode on `pin`, counter reset to zero.
    fn configure_edge_counting(&self, channel: ChannelId, pin: u8);

    /// Install and unmask the shared wrap interrupt handler.
    ///
    /// Called once, when the first channel is activated.
    fn install_wrap_handler(&self);

    /// Enable or disable the wrap interrupt of `channel`.
    fn set_wrap_interrupt_enabled(&self, channel: ChannelId, enabled: bool);

    /// Start or stop counting on `channel`.
    fn set_counting_enabled(&self, channel: ChannelId, enabled: bool);

    /// Current raw counter value of `channel`.
    fn raw_counter(&self, channel: ChannelId) -> u32;

    /// Channels whose wrap flag is latched.
    fn pending_wraps(&self) -> ChannelMask;

    /// Acknowledge the wrap flags of `mask`.
    fn clear_wraps(&self, mask: ChannelMask);
}

impl<T: PulseCounterHal + ?Sized> PulseCounterHal for &T {
    fn counter_bits(&self) -> u32 {
        (**self).counter_bits()
    }

    fn channel_count(&self) -> usize {
        (**self).channel_count()
    }

    fn supports_edge_counting(&self, channel: ChannelId, pin: u8) -> bool {
        (**self).supports_edge_counting(channel, pin)
    }

    fn is_counting_enabled(&self, channel: ChannelId) -> bool {
        (**self).is_counting_enabled(channel)
    }

    fn configure_edge_counting(&self, channel: ChannelId, pin: u8) {
        (**self).configure_edge_counting(channel, pin);
    }

    fn install_wrap_handler(&self) {
        (**self).install_wrap_handler();
    }

    fn set_wrap_interrupt_enabled(&self, channel: ChannelId, enabled: bool) {
        (**self).set_wrap_interrupt_enabled(channel, enabled);
    }

    fn set_counting_enabled(&self, channel: ChannelId, enabled: bool) {
        (**self).set_counting_enabled(channel, enabled);
    }

    #[inline]
    fn raw_counter(&self, channel: ChannelId) -> u32 {
        (**self).raw_counter(channel)
    }

    #[inline]
    fn pending_wraps(&self) -> ChannelMask {
        (**self).pending_wraps()
    }

    #[inline]
    fn clear_wraps(&self, mask: ChannelMask) {
        (**self).clear_wraps(mask);
    }
}

/// Widest raw counter the extended count supports.
///
/// The extended count is `32 + bits` wide and must fit a `u64`.
pub const MAX_COUNTER_BITS: u32 = 32;

/// Whether a raw counter of `bits` bits can be extended.
#[inline]
#[must_use]
pub const fn is_supported_counter_width(bits: u32) -> bool {
    bits >= 1 && bits <= MAX_COUNTER_BITS
}

/// Mask selecting the low `bits` bits of a `u64`.
#[inline]
#[must_use]
pub const fn low_bits_mask(bits: u32) -> u64 {
    if bits >= u64::BITS {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

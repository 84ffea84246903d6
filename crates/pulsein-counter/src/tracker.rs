//! Wraparound tracking from the shared wrap interrupt.
//!
//! [`WrapTracker`] holds the per-channel high words that extend the raw
//! hardware counters, plus the set of channels the shared interrupt handler
//! is responsible for.
//!
//! # Real-Time Safety
//!
//! - [`WrapTracker::service`] runs in interrupt context: no allocation, no
//!   blocking, bounded by the number of channels in use
//! - The handler is the only writer of the high words; the poller only loads
//!   them
//! - High words use sequentially consistent ordering so that, across cores,
//!   the poller observes the increment and the flag clear in the same order
//!   the handler performed them

use portable_atomic::{AtomicU32, AtomicU64, Ordering};

use crate::channel::{ChannelId, ChannelMask, MAX_CHANNELS};
use crate::hal::PulseCounterHal;

/// Diagnostic counters of the wrap interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrackerSnapshot {
    /// Channels currently serviced by the handler.
    pub channels_in_use: ChannelMask,
    /// Handler invocations that found at least one wrap to service.
    pub interrupts_serviced: u64,
    /// Handler invocations that found nothing to do.
    pub spurious_interrupts: u64,
    /// Total wraps accounted across all channels.
    pub wraps_counted: u64,
}

/// Per-channel high words, written only by the shared wrap interrupt.
///
/// `const`-constructible so it can live in a `static` reachable from an
/// interrupt vector.
#[derive(Debug)]
pub struct WrapTracker {
    high: [AtomicU32; MAX_CHANNELS],
    in_use: AtomicU32,
    interrupts_serviced: AtomicU64,
    spurious_interrupts: AtomicU64,
    wraps_counted: AtomicU64,
}

impl Default for WrapTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl WrapTracker {
    /// Create a tracker with no channels in use and all high words at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            high: [const { AtomicU32::new(0) }; MAX_CHANNELS],
            in_use: AtomicU32::new(0),
            interrupts_serviced: AtomicU64::new(0),
            spurious_interrupts: AtomicU64::new(0),
            wraps_counted: AtomicU64::new(0),
        }
    }

    /// Service the shared wrap interrupt.
    ///
    /// Increments the high word of every in-use channel with a latched wrap
    /// flag, then clears exactly those flags. Channels outside the in-use set
    /// are left alone, both their high words and their flags.
    ///
    /// # Real-Time Safety
    ///
    /// Interrupt-safe. One load of the hardware status, one increment per
    /// serviced channel and one flag write.
    pub fn service<H: PulseCounterHal + ?Sized>(&self, hal: &H) {
        let mask = self.channels_in_use().intersection(hal.pending_wraps());
        if mask.is_empty() {
            self.spurious_interrupts.fetch_add(1, Ordering::Relaxed);
            return;
        }

        for channel in mask {
            if let Some(high) = self.high.get(channel.index()) {
                high.fetch_add(1, Ordering::SeqCst);
            }
        }
        // Flags are acknowledged only after every high word is bumped.
        hal.clear_wraps(mask);

        self.interrupts_serviced.fetch_add(1, Ordering::Relaxed);
        self.wraps_counted
            .fetch_add(u64::from(mask.len()), Ordering::Relaxed);
    }

    /// Current high word of `channel`.
    ///
    /// Channels outside [`MAX_CHANNELS`] always read as zero.
    #[inline]
    #[must_use]
    pub fn high_word(&self, channel: ChannelId) -> u32 {
        self.high
            .get(channel.index())
            .map_or(0, |high| high.load(Ordering::SeqCst))
    }

    /// Channels the handler is responsible for.
    #[inline]
    #[must_use]
    pub fn channels_in_use(&self) -> ChannelMask {
        ChannelMask::from_bits(self.in_use.load(Ordering::SeqCst))
    }

    /// Whether `channel` is serviced by the handler.
    #[inline]
    #[must_use]
    pub fn is_in_use(&self, channel: ChannelId) -> bool {
        self.channels_in_use().contains(channel)
    }

    /// Add `channel` to the handler's scope.
    ///
    /// Returns the set of channels in use before the call.
    pub fn mark_in_use(&self, channel: ChannelId) -> ChannelMask {
        ChannelMask::from_bits(
            self.in_use
                .fetch_or(channel.mask().bits(), Ordering::SeqCst),
        )
    }

    /// Diagnostic counters.
    #[must_use]
    pub fn snapshot(&self) -> TrackerSnapshot {
        TrackerSnapshot {
            channels_in_use: self.channels_in_use(),
            interrupts_serviced: self.interrupts_serviced.load(Ordering::Relaxed),
            spurious_interrupts: self.spurious_interrupts.load(Ordering::Relaxed),
            wraps_counted: self.wraps_counted.load(Ordering::Relaxed),
        }
    }
}

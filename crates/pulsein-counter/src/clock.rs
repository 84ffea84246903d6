//! Microsecond time source consulted by the read protocol.

/// Monotonic microsecond clock.
///
/// The value is a free-running `u32` that wraps after about 71 minutes; all
/// consumers subtract timestamps with wrapping arithmetic, so only intervals
/// shorter than one wrap are meaningful. Polling intervals are far below that.
///
/// # Real-Time Safety
///
/// Implementations are called inside the read protocol's critical window and
/// must not block or allocate.
pub trait MonotonicClock {
    /// Current time in microseconds.
    fn now_us(&self) -> u32;
}

impl<T: MonotonicClock + ?Sized> MonotonicClock for &T {
    #[inline]
    fn now_us(&self) -> u32 {
        (**self).now_us()
    }
}

/// Microseconds elapsed from `earlier` to `later`, tolerant of clock wrap.
#[inline]
#[must_use]
pub const fn elapsed_us(earlier: u32, later: u32) -> u32 {
    later.wrapping_sub(earlier)
}

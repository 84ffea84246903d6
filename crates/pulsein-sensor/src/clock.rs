//! Host clock for the read protocol.

use std::time::Instant;

use pulsein_counter::MonotonicClock;

/// Microseconds since creation as a wrapping `u32`, from [`Instant`].
///
/// Wraps every ~71.6 minutes, which the rate computation tolerates as long
/// as consecutive reads are closer together than that.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    /// Clock starting at zero now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl MonotonicClock for SystemClock {
    #[allow(clippy::cast_possible_truncation)]
    fn now_us(&self) -> u32 {
        // truncation is the wrap
        self.origin.elapsed().as_micros() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_advances() {
        let clock = SystemClock::new();
        let first = clock.now_us();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let elapsed = pulsein_counter::clock::elapsed_us(first, clock.now_us());
        assert!(elapsed >= 2_000);
    }
}

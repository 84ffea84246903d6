//! RP2040 / RP2350 GPIO to PWM mapping.
//!
//! Each PWM slice drives two GPIOs. Channel A can only output; channel B can
//! also clock the slice's counter from its input, which is what pulse
//! counting uses. The mapping mirrors the pico-sdk's
//! `pwm_gpio_to_slice_num` and `pwm_gpio_to_channel`.

use core::fmt;

/// PWM channel of a slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PwmChannel {
    /// Output-only channel (even GPIO).
    A,
    /// Channel that can clock the counter from its pin (odd GPIO).
    B,
}

impl fmt::Display for PwmChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::B => write!(f, "B"),
        }
    }
}

/// PWM slice driven by `pin`.
///
/// GPIOs 32 and up belong to the extra slices of the RP2350B.
#[must_use]
pub const fn gpio_to_slice(pin: u8) -> u8 {
    if pin < 32 {
        (pin >> 1) & 7
    } else {
        8 + ((pin >> 1) & 3)
    }
}

/// PWM channel `pin` is wired to.
#[must_use]
pub const fn gpio_to_channel(pin: u8) -> PwmChannel {
    if pin & 1 == 0 {
        PwmChannel::A
    } else {
        PwmChannel::B
    }
}

/// Whether `pin` can be used as a pulse counter input.
#[must_use]
pub const fn is_input_pin(pin: u8) -> bool {
    matches!(gpio_to_channel(pin), PwmChannel::B)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_mapping() {
        assert_eq!(gpio_to_slice(0), 0);
        assert_eq!(gpio_to_slice(1), 0);
        assert_eq!(gpio_to_slice(5), 2);
        assert_eq!(gpio_to_slice(15), 7);
        // slices repeat from GPIO 16 on the RP2040
        assert_eq!(gpio_to_slice(17), 0);
        assert_eq!(gpio_to_slice(29), 6);
        assert_eq!(gpio_to_slice(33), 8);
        assert_eq!(gpio_to_slice(47), 11);
    }

    #[test]
    fn test_channel_mapping() {
        assert_eq!(gpio_to_channel(4), PwmChannel::A);
        assert_eq!(gpio_to_channel(5), PwmChannel::B);
        assert!(is_input_pin(29));
        assert!(!is_input_pin(28));
    }
}

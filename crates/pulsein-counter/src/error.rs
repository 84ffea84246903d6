//! Error types for channel setup and counter reads.

use crate::channel::ChannelId;

/// Invalid tunable in a [`ChannelDescriptor`](crate::ChannelDescriptor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The read window must be at least one microsecond.
    #[error("read window must be at least 1us")]
    ZeroReadWindow,
    /// At least one read attempt is required.
    #[error("max read attempts must be at least 1")]
    ZeroAttempts,
    /// The rate multiplier must be finite and positive.
    #[error("rate multiplier must be finite and positive")]
    InvalidMultiplier,
    /// A logical event cannot consist of zero pulses.
    #[error("pulses per event must be at least 1")]
    ZeroPulsesPerEvent,
}

/// Channel activation failure.
///
/// All variants are fatal for the channel: the caller must not poll it.
/// Activation fails before touching any shared state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SetupError {
    /// The channel cannot count rising edges on the requested pin.
    #[error("channel {channel} cannot count rising edges on pin {pin}")]
    IncompatibleChannel {
        /// Requested channel.
        channel: ChannelId,
        /// Requested input pin.
        pin: u8,
    },
    /// The channel is already enabled by another owner.
    #[error("channel {channel} is already active")]
    ChannelAlreadyActive {
        /// Requested channel.
        channel: ChannelId,
    },
    /// The descriptor carries an invalid tunable.
    #[error("invalid channel configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),
}

/// Counter read failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ReadError {
    /// Every attempt of the consistent read protocol was rejected.
    ///
    /// Recoverable: skip this tick and read again on the next one. The
    /// channel's previous sample is kept, so the next successful read covers
    /// both ticks.
    #[error("channel {channel}: no consistent counter snapshot after {attempts} attempts")]
    ConsistencyRetryExhausted {
        /// Channel being read.
        channel: ChannelId,
        /// Number of rejected attempts.
        attempts: u32,
    },
}

impl ReadError {
    /// Whether the caller can simply retry on its next tick.
    #[must_use]
    pub fn is_recoverable(self) -> bool {
        matches!(self, Self::ConsistencyRetryExhausted { .. })
    }

    /// Channel the failed read was for.
    #[must_use]
    pub fn channel(self) -> ChannelId {
        match self {
            Self::ConsistencyRetryExhausted { channel, .. } => channel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_error_is_recoverable() {
        let err = ReadError::ConsistencyRetryExhausted {
            channel: ChannelId::new(3),
            attempts: 64,
        };
        assert!(err.is_recoverable());
        assert_eq!(err.channel(), ChannelId::new(3));
    }

    #[test]
    fn test_config_error_converts_into_setup_error() {
        let err: SetupError = ConfigError::ZeroAttempts.into();
        assert_eq!(
            err,
            SetupError::InvalidConfiguration(ConfigError::ZeroAttempts)
        );
    }
}

//! Channel identifiers, channel sets and activation descriptors.

use crate::error::ConfigError;
use crate::rate::RateScale;
use crate::reader::ReadConfig;

/// Upper bound on the number of hardware counting channels.
///
/// Matches the width of [`ChannelMask`].
pub const MAX_CHANNELS: usize = 32;

/// Index of one hardware counting unit (a PWM slice on RP2040).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ChannelId(u8);

impl ChannelId {
    /// Create a channel id from its hardware index.
    #[must_use]
    pub const fn new(index: u8) -> Self {
        Self(index)
    }

    /// Hardware index of the channel.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Raw hardware index.
    #[must_use]
    pub const fn raw(self) -> u8 {
        self.0
    }

    /// Single-bit mask selecting this channel.
    ///
    /// Returns an empty mask for indices that do not fit in a [`ChannelMask`].
    #[must_use]
    pub const fn mask(self) -> ChannelMask {
        if (self.0 as usize) < MAX_CHANNELS {
            ChannelMask(1u32 << self.0)
        } else {
            ChannelMask::EMPTY
        }
    }
}

impl core::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Set of channels, one bit per [`ChannelId`].
///
/// Used both for the "channels in use" scope of the shared wrap interrupt and
/// for the hardware's pending-wrap status register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ChannelMask(u32);

impl ChannelMask {
    /// The empty set.
    pub const EMPTY: Self = Self(0);

    /// Build a mask from raw bits.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw bits of the mask.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// True if no channel is selected.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True if `channel` is in the set.
    #[must_use]
    pub const fn contains(self, channel: ChannelId) -> bool {
        self.0 & channel.mask().0 != 0
    }

    /// Set intersection.
    #[must_use]
    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Set union.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Number of channels in the set.
    #[must_use]
    pub const fn len(self) -> u32 {
        self.0.count_ones()
    }

    /// Iterate the channels in ascending index order.
    pub fn iter(self) -> ChannelMaskIter {
        ChannelMaskIter { remaining: self.0 }
    }
}

impl IntoIterator for ChannelMask {
    type Item = ChannelId;
    type IntoIter = ChannelMaskIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<ChannelId> for ChannelMask {
    fn from_iter<I: IntoIterator<Item = ChannelId>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::EMPTY, |acc, channel| acc.union(channel.mask()))
    }
}

/// Iterator over the channels of a [`ChannelMask`].
#[derive(Debug, Clone)]
pub struct ChannelMaskIter {
    remaining: u32,
}

impl Iterator for ChannelMaskIter {
    type Item = ChannelId;

    #[allow(clippy::cast_possible_truncation)]
    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let index = self.remaining.trailing_zeros();
        // clear lowest set bit
        self.remaining &= self.remaining - 1;
        Some(ChannelId::new(index as u8))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining.count_ones() as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for ChannelMaskIter {}

/// Everything needed to activate one logical pulse input.
///
/// Supplied once to [`PulseCounter::activate`](crate::PulseCounter::activate).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelDescriptor {
    /// Hardware channel that will count the pulses.
    pub channel: ChannelId,
    /// Input pin routed to the channel's counting input.
    pub pin: u8,
    /// Conversion from pulses per second to the published unit.
    pub scale: RateScale,
    /// Tuning of the consistent read protocol.
    pub read: ReadConfig,
}

impl ChannelDescriptor {
    /// Descriptor with a hertz scale and the default read configuration.
    #[must_use]
    pub fn new(channel: ChannelId, pin: u8) -> Self {
        Self {
            channel,
            pin,
            scale: RateScale::hertz(),
            read: ReadConfig::default(),
        }
    }

    /// Replace the rate scale.
    #[must_use]
    pub fn with_scale(mut self, scale: RateScale) -> Self {
        self.scale = scale;
        self
    }

    /// Replace the read configuration.
    #[must_use]
    pub fn with_read_config(mut self, read: ReadConfig) -> Self {
        self.read = read;
        self
    }

    /// Validate the descriptor's tunables.
    ///
    /// # Errors
    ///
    /// Returns the first invalid value found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.read.validate()?;
        self.scale.validate()
    }
}

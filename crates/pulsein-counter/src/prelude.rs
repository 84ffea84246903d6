//! Prelude for pulsein-counter.
//!
//! This module re-exports the most commonly used types for convenient importing.
//!
//! # Example
//!
//! ```rust
//! use pulsein_counter::prelude::*;
//!
//! let descriptor = ChannelDescriptor::new(ChannelId::new(0), 1)
//!     .with_scale(RateScale::per_minute());
//! assert!(descriptor.validate().is_ok());
//! ```

pub use crate::channel::{ChannelDescriptor, ChannelId, ChannelMask};
pub use crate::clock::MonotonicClock;
pub use crate::error::{ConfigError, ReadError, SetupError};
pub use crate::hal::PulseCounterHal;
pub use crate::rate::{RateReading, RateScale, RateUnit, Sample};
pub use crate::reader::ReadConfig;
pub use crate::registry::{ChannelHandle, PulseCounter, ReadStats};
pub use crate::tracker::{TrackerSnapshot, WrapTracker};

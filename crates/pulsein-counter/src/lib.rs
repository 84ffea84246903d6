//! # pulsein-counter
//!
//! Extends a narrow free-running hardware pulse counter (16 bits on RP2040 PWM
//! slices) into a wide monotonic pulse count and derives a pulse rate from it.
//!
//! Two execution contexts touch the count:
//!
//! - the shared wrap **interrupt**, which bumps a per-channel high word every
//!   time a channel's counter wraps ([`WrapTracker`]);
//! - the periodic **poller**, which reads `(high, low, timestamp)` and turns
//!   the difference to the previous read into a rate ([`PulseCounter::read_rate`]).
//!
//! They never share a lock. The poller instead uses a detect-and-retry read
//! protocol ([`reader::read_consistent`]) that rejects any snapshot which may
//! straddle a wrap the interrupt has not accounted for yet.
//!
//! ## Real-Time Safety
//!
//! - **No heap allocations**, in the interrupt handler or in the read path
//! - **No blocking operations**, the read retry loop is a bounded busy-spin
//! - **Atomics only** for state shared with interrupt context
//!
//! ## Known limitation
//!
//! If the interrupt handler is delayed by more than one full wrap period of the
//! raw counter, the latched pending flag absorbs the second wrap and one wrap
//! is lost. This cannot be detected from the counter alone and shows up as a
//! single low reading.
//!
//! ## Example
//!
//! ```rust
//! use pulsein_counter::prelude::*;
//! use pulsein_counter::sim::{ManualClock, SimulatedPwm};
//!
//! let counter = PulseCounter::new(SimulatedPwm::new(8, 16));
//! let clock = ManualClock::new(0);
//!
//! let descriptor = ChannelDescriptor::new(ChannelId::new(2), 5);
//! let mut handle = counter.activate(descriptor, &clock).expect("activation");
//!
//! counter.hal().pulse(ChannelId::new(2), 100);
//! clock.set_us(100_000);
//! let rate = counter.read_rate(&mut handle, &clock).expect("consistent read");
//! assert!((rate - 1000.0).abs() < 1e-9);
//! ```

#![no_std]
#![deny(
    unsafe_op_in_unsafe_fn,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::panic,
    missing_docs,
    missing_debug_implementations
)]
#![warn(clippy::pedantic)]
#![cfg_attr(docsrs, feature(doc_cfg))]

#[cfg(feature = "std")]
extern crate std;

pub mod channel;
pub mod clock;
pub mod error;
pub mod hal;
pub mod prelude;
pub mod rate;
pub mod reader;
pub mod registry;
pub mod sim;
pub mod tracker;

pub use channel::{ChannelDescriptor, ChannelId, ChannelMask, MAX_CHANNELS};
pub use clock::MonotonicClock;
pub use error::{ConfigError, ReadError, SetupError};
pub use hal::PulseCounterHal;
pub use rate::{RateReading, RateScale, RateUnit, Sample};
pub use reader::{ConsistentRead, ReadConfig};
pub use registry::{ChannelHandle, PulseCounter, ReadStats};
pub use tracker::{TrackerSnapshot, WrapTracker};

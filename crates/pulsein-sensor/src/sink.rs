//! Destinations for published sensor values.

use parking_lot::Mutex;
use tracing::info;

/// Receives the values a sensor publishes.
pub trait StateSink {
    /// Publish `value` for the sensor called `name`.
    fn publish(&self, name: &str, value: f64);
}

impl<T: StateSink + ?Sized> StateSink for &T {
    fn publish(&self, name: &str, value: f64) {
        (**self).publish(name, value);
    }
}

/// Logs every published value at `info` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl StateSink for TracingSink {
    fn publish(&self, name: &str, value: f64) {
        info!(sensor = name, value, "publishing state");
    }
}

/// Keeps every published value in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    values: Mutex<Vec<(String, f64)>>,
}

impl MemorySink {
    /// Empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything published so far, oldest first.
    #[must_use]
    pub fn values(&self) -> Vec<(String, f64)> {
        self.values.lock().clone()
    }

    /// Latest value published for `name`.
    #[must_use]
    pub fn last(&self, name: &str) -> Option<f64> {
        self.values
            .lock()
            .iter()
            .rev()
            .find(|(sensor, _)| sensor == name)
            .map(|&(_, value)| value)
    }

    /// Number of values published.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.lock().len()
    }

    /// Whether nothing has been published.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.lock().is_empty()
    }
}

impl StateSink for MemorySink {
    fn publish(&self, name: &str, value: f64) {
        self.values.lock().push((name.to_owned(), value));
    }
}

//! End-to-end sensor tests against the simulated PWM block.

#![cfg(test)]

use pulsein_counter::sim::{ManualClock, SimulatedPwm};
use pulsein_sensor::prelude::*;

type TestResult = Result<(), Box<dyn std::error::Error>>;

const TWO_SENSORS: &str = r"
board: rpipico
sensors:
  - name: fan
    pin: 5
    unit: per_minute
    pulses_per_event: 2
  - name: flow
    pin: 9
    accuracy_decimals: 2
    update_interval_ms: 1000
";

fn sensors(counter: &PulseCounter<SimulatedPwm>) -> Result<Vec<PulseRateSensor<'_, SimulatedPwm>>, SensorError> {
    let config = PulseInConfig::from_yaml_str(TWO_SENSORS)?;
    Ok(config
        .validate()?
        .into_iter()
        .map(|sensor| PulseRateSensor::new(counter, sensor))
        .collect())
}

#[test]
fn test_first_update_after_setup_publishes_zero() -> TestResult {
    let counter = PulseCounter::new(SimulatedPwm::rp2040());
    let clock = ManualClock::new(123_456);
    let sink = MemorySink::new();

    for mut sensor in sensors(&counter)? {
        sensor.setup(&clock)?;
        assert_eq!(sensor.update(&clock, &sink), Some(0.0));
    }
    assert_eq!(sink.len(), 2);
    Ok(())
}

#[test]
fn test_sensors_publish_independent_rates() -> TestResult {
    let counter = PulseCounter::new(SimulatedPwm::rp2040());
    let clock = ManualClock::new(0);
    let sink = MemorySink::new();
    let mut sensors = sensors(&counter)?;
    for sensor in &mut sensors {
        sensor.setup(&clock)?;
    }

    // 150 000 fan pulses wrap the 16-bit counter twice
    let fan_channel = ChannelId::new(2);
    counter.hal().pulse(fan_channel, 60_000);
    counter.on_wrap_interrupt();
    counter.hal().pulse(fan_channel, 60_000);
    counter.on_wrap_interrupt();
    counter.hal().pulse(fan_channel, 30_000);
    counter.on_wrap_interrupt();
    counter.hal().pulse(ChannelId::new(4), 1_234);
    clock.set_us(10_000_000);

    for sensor in &mut sensors {
        sensor.update(&clock, &sink);
    }

    // fan: 15 000 Hz / 2 * 60
    assert_eq!(sink.last("fan"), Some(450_000.0));
    // flow: 123.4 Hz to two decimals
    assert_eq!(sink.last("flow"), Some(123.4));
    assert_eq!(counter.tracker().snapshot().wraps_counted, 2);
    Ok(())
}

#[test]
fn test_update_intervals_follow_config() -> TestResult {
    let counter = PulseCounter::new(SimulatedPwm::rp2040());
    let sensors = sensors(&counter)?;
    let intervals: Vec<_> = sensors.iter().map(|s| s.update_interval().as_millis()).collect();
    assert_eq!(intervals, vec![60_000, 1_000]);
    Ok(())
}

#[test]
fn test_failed_sensor_does_not_affect_others() -> TestResult {
    let counter = PulseCounter::new(SimulatedPwm::rp2040());
    let clock = ManualClock::new(0);
    let sink = MemorySink::new();
    // slice 2 is owned by someone else
    counter.hal().enable_externally(ChannelId::new(2));

    let mut sensors = sensors(&counter)?;
    let results: Vec<_> = sensors.iter_mut().map(|s| s.setup(&clock).is_ok()).collect();
    assert_eq!(results, vec![false, true]);

    counter.hal().pulse(ChannelId::new(4), 500);
    clock.set_us(1_000_000);
    let published: Vec<_> = sensors.iter_mut().map(|s| s.update(&clock, &sink)).collect();

    assert_eq!(published, vec![None, Some(500.0)]);
    assert_eq!(sink.values(), vec![("flow".to_owned(), 500.0)]);
    let failed = sensors.first().ok_or("missing fan")?;
    assert!(matches!(
        failed.state(),
        SensorState::Failed(SetupError::ChannelAlreadyActive { .. })
    ));
    Ok(())
}

#[test]
fn test_setup_is_idempotent_once_active() -> TestResult {
    let counter = PulseCounter::new(SimulatedPwm::rp2040());
    let clock = ManualClock::new(0);
    let mut sensors = sensors(&counter)?;
    let flow = sensors.get_mut(1).ok_or("missing flow")?;

    flow.setup(&clock)?;
    flow.setup(&clock)?;

    assert_eq!(counter.hal().wrap_handler_installs(), 1);
    assert_eq!(counter.tracker().channels_in_use().len(), 1);
    Ok(())
}

#[test]
fn test_update_before_setup_publishes_nothing() -> TestResult {
    let counter = PulseCounter::new(SimulatedPwm::rp2040());
    let clock = ManualClock::new(0);
    let sink = MemorySink::new();
    let mut sensors = sensors(&counter)?;

    for sensor in &mut sensors {
        assert_eq!(sensor.update(&clock, &sink), None);
        assert!(sensor.stats().is_none());
    }
    assert!(sink.is_empty());
    Ok(())
}

#[test]
fn test_stats_track_reads() -> TestResult {
    let counter = PulseCounter::new(SimulatedPwm::rp2040());
    let clock = ManualClock::new(0);
    let sink = TracingSink;
    let mut sensors = sensors(&counter)?;
    let flow = sensors.get_mut(1).ok_or("missing flow")?;
    flow.setup(&clock)?;

    for tick in 1..=5u32 {
        clock.set_us(tick * 1_000_000);
        flow.update(&clock, &sink);
    }

    let stats = flow.stats().ok_or("sensor not active")?;
    assert_eq!(stats.reads, 5);
    assert_eq!(stats.exhausted, 0);
    Ok(())
}

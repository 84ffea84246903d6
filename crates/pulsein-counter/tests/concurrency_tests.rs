//! Concurrency tests for pulsein-counter.
//!
//! A second thread plays the role of the pulse source plus wrap interrupt
//! while the test thread polls, so the read protocol runs against real
//! cross-thread interleavings.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use pulsein_counter::prelude::*;
use pulsein_counter::sim::{ManualClock, SimulatedPwm};

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn polling_config() -> ReadConfig {
    ReadConfig {
        read_window_us: 20,
        max_attempts: 100_000,
    }
}

#[test]
fn test_poller_never_sees_count_go_backwards() -> TestResult {
    let counter = Arc::new(PulseCounter::new(SimulatedPwm::rp2040()));
    let clock = ManualClock::new(0);
    let ch = ChannelId::new(0);
    let mut handle = counter.activate(
        ChannelDescriptor::new(ch, 1).with_read_config(polling_config()),
        &clock,
    )?;

    let bursts: u64 = 20_000;
    let burst_size: u64 = 4_099;
    let done = Arc::new(AtomicBool::new(false));

    let source = {
        let counter = Arc::clone(&counter);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            for _ in 0..bursts {
                counter.hal().pulse(ch, burst_size);
                counter.on_wrap_interrupt();
            }
            done.store(true, Ordering::SeqCst);
        })
    };

    let mut last = 0u64;
    let mut reads = 0u64;
    while !done.load(Ordering::SeqCst) {
        if let Ok(reading) = counter.read(&mut handle, &clock) {
            assert!(
                reading.sample.count >= last,
                "count went backwards: {} -> {}",
                last,
                reading.sample.count
            );
            last = reading.sample.count;
            reads += 1;
        }
    }
    assert!(source.join().is_ok(), "source thread panicked unexpectedly");

    let final_sample = counter.sample(&handle, &clock)?;
    assert_eq!(final_sample.count, bursts * burst_size);
    assert!(final_sample.count >= last);
    assert_eq!(handle.stats().reads, reads);
    Ok(())
}

#[test]
fn test_one_interrupt_services_every_channel() -> TestResult {
    let counter = Arc::new(PulseCounter::new(SimulatedPwm::rp2040()));
    let clock = ManualClock::new(0);
    let channels = [ChannelId::new(0), ChannelId::new(2), ChannelId::new(5)];
    let pins = [1u8, 5, 11];
    let rounds: u64 = 5_000;

    let mut handles = Vec::new();
    for (ch, pin) in channels.iter().zip(pins) {
        handles.push(counter.activate(
            ChannelDescriptor::new(*ch, pin).with_read_config(polling_config()),
            &clock,
        )?);
    }

    let done = Arc::new(AtomicBool::new(false));
    let source = {
        let counter = Arc::clone(&counter);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            for _ in 0..rounds {
                for (i, &ch) in channels.iter().enumerate() {
                    counter.hal().pulse(ch, 10_007 * (i as u64 + 1));
                }
                counter.on_wrap_interrupt();
            }
            done.store(true, Ordering::SeqCst);
        })
    };

    let mut last = [0u64; 3];
    while !done.load(Ordering::SeqCst) {
        for (handle, last) in handles.iter_mut().zip(last.iter_mut()) {
            if let Ok(reading) = counter.read(handle, &clock) {
                assert!(reading.sample.count >= *last);
                *last = reading.sample.count;
            }
        }
    }
    assert!(source.join().is_ok(), "source thread panicked unexpectedly");

    for (i, handle) in handles.iter().enumerate() {
        let sample = counter.sample(handle, &clock)?;
        assert_eq!(sample.count, rounds * 10_007 * (i as u64 + 1));
    }
    let snapshot = counter.tracker().snapshot();
    assert_eq!(snapshot.channels_in_use.len(), 3);
    assert!(snapshot.interrupts_serviced > 0);
    Ok(())
}

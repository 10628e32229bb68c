//! Fuzz target: `SignalDebouncer`
//!
//! Drives the debouncer with arbitrary record streams, interleaved
//! flush polls and re-arms, and verifies:
//! - No panics under any input sequence
//! - Every emitted qualified signal carries at least one repeat
//! - Monotonic time never produces a deadline in the past of the burst
//!
//! cargo fuzz run fuzz_debounce

#![no_main]

use libfuzzer_sys::fuzz_target;

use homeguard::config::AlarmConfig;
use homeguard::debounce::SignalDebouncer;
use homeguard::signal::{RawSignal, SignalSource};

fuzz_target!(|data: &[u8]| {
    let mut config = AlarmConfig::default();
    config.rf_repeat_threshold = 1 + (data.first().copied().unwrap_or(0) % 8) as u16;
    let mut d = SignalDebouncer::new(&config);

    let mut now: u64 = 0;
    for chunk in data.chunks(6) {
        if chunk.len() < 6 {
            break;
        }
        now += u64::from(chunk[0]);

        let source = match chunk[1] % 4 {
            0 => SignalSource::Wired,
            1 | 2 => SignalSource::Rx433,
            _ => SignalSource::Bus,
        };
        let raw = RawSignal {
            source,
            address: u32::from(chunk[2]),
            value: u32::from_le_bytes([chunk[3], chunk[4], 0, 0]),
            repeats: u16::from(chunk[5] % 4),
        };

        for q in d.offer(raw, now) {
            assert!(q.repeats >= 1);
        }
        match chunk[5] % 3 {
            0 => {
                if let Some(q) = d.poll_flush(now) {
                    assert!(q.repeats >= 1);
                    assert!(q.end_of_packet);
                }
            }
            1 => d.rearm(),
            _ => {}
        }
        if let Some(deadline) = d.deadline_ms() {
            assert!(deadline >= now);
        }
    }
});

//! Incoming-signal debouncer.
//!
//! RF receivers deliver one record per code repetition, so a single key
//! press arrives as a burst of identical records. The debouncer collapses
//! a burst into one qualified signal with a cumulative repeat count:
//!
//! * early dispatch — once the repeat count reaches the configured
//!   threshold the signal is forwarded immediately (`end_of_packet =
//!   false`) to keep latency low, and is not re-dispatched when the burst
//!   later ends;
//! * idle flush — a configurable quiet gap ends the burst; if it was
//!   never dispatched it is flushed now with `end_of_packet = true`;
//! * re-arm — when the matcher defers a match because an event slot wants
//!   more repeats, [`rearm`](SignalDebouncer::rearm) clears the dispatched
//!   latch so the next repetition re-dispatches with the higher count.
//!
//! Wired contacts are already edge-qualified by the driver layer and pass
//! through untouched, as do bus/virtual events.

use heapless::Vec;

use crate::config::AlarmConfig;
use crate::signal::{QualifiedSignal, RawSignal, SignalSource};

/// An open RF burst.
#[derive(Debug, Clone, Copy)]
struct Burst {
    address: u32,
    value: u32,
    repeats: u16,
    last_ms: u64,
    dispatched: bool,
}

/// Collapses raw signal records into qualified signals.
pub struct SignalDebouncer {
    threshold: u16,
    idle_ms: u64,
    burst: Option<Burst>,
}

/// Up to two signals can leave one `offer` call: the flush of a stale
/// burst plus the dispatch of the new one.
pub type DebounceOutput = Vec<QualifiedSignal, 2>;

impl SignalDebouncer {
    pub fn new(config: &AlarmConfig) -> Self {
        Self {
            threshold: config.rf_repeat_threshold.max(1),
            idle_ms: u64::from(config.rf_idle_timeout_ms),
            burst: None,
        }
    }

    /// Feed one raw record. `now_ms` is the worker's monotonic clock.
    pub fn offer(&mut self, raw: RawSignal, now_ms: u64) -> DebounceOutput {
        let mut out = DebounceOutput::new();
        let repeats = raw.repeats.max(1);

        match raw.source {
            // Non-repeating sources dispatch immediately, leaving any open
            // RF burst untouched.
            SignalSource::Wired | SignalSource::Bus => {
                let _ = out.push(QualifiedSignal {
                    source: raw.source,
                    address: raw.address,
                    value: raw.value,
                    repeats,
                    end_of_packet: true,
                });
            }

            SignalSource::Rx433 => {
                match self.burst {
                    Some(ref mut b) if b.address == raw.address && b.value == raw.value => {
                        b.repeats = b.repeats.saturating_add(repeats);
                        b.last_ms = now_ms;
                        if !b.dispatched && b.repeats >= self.threshold {
                            b.dispatched = true;
                            let _ = out.push(Self::qualified(raw, b.repeats, false));
                        }
                    }
                    other => {
                        // A different code interrupts the burst: flush the
                        // old one if it never went out, then start fresh.
                        if let Some(stale) = other {
                            if !stale.dispatched {
                                let _ = out.push(QualifiedSignal {
                                    source: SignalSource::Rx433,
                                    address: stale.address,
                                    value: stale.value,
                                    repeats: stale.repeats,
                                    end_of_packet: true,
                                });
                            }
                        }
                        let dispatched = repeats >= self.threshold;
                        self.burst = Some(Burst {
                            address: raw.address,
                            value: raw.value,
                            repeats,
                            last_ms: now_ms,
                            dispatched,
                        });
                        if dispatched {
                            let _ = out.push(Self::qualified(raw, repeats, false));
                        }
                    }
                }
            }
        }
        out
    }

    /// Flush the open burst if its idle timeout elapsed. Buffer state
    /// resets whether or not the signal had already been dispatched.
    pub fn poll_flush(&mut self, now_ms: u64) -> Option<QualifiedSignal> {
        let b = self.burst?;
        if now_ms.saturating_sub(b.last_ms) < self.idle_ms {
            return None;
        }
        self.burst = None;
        if b.dispatched {
            return None;
        }
        Some(QualifiedSignal {
            source: SignalSource::Rx433,
            address: b.address,
            value: b.value,
            repeats: b.repeats,
            end_of_packet: true,
        })
    }

    /// Clear the dispatched latch so the next repetition of the open burst
    /// re-dispatches with its higher count. Called by the worker when the
    /// matcher defers on an event-slot repeat threshold.
    pub fn rearm(&mut self) {
        if let Some(b) = self.burst.as_mut() {
            b.dispatched = false;
        }
    }

    /// Absolute time (ms) at which the open burst should be flushed.
    /// `None` when no burst is open — the worker may block indefinitely.
    pub fn deadline_ms(&self) -> Option<u64> {
        self.burst.map(|b| b.last_ms + self.idle_ms)
    }

    fn qualified(raw: RawSignal, repeats: u16, end_of_packet: bool) -> QualifiedSignal {
        QualifiedSignal {
            source: raw.source,
            address: raw.address,
            value: raw.value,
            repeats,
            end_of_packet,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(threshold: u16, idle_ms: u32) -> AlarmConfig {
        let mut c = AlarmConfig::default();
        c.rf_repeat_threshold = threshold;
        c.rf_idle_timeout_ms = idle_ms;
        c
    }

    fn rf(value: u32) -> RawSignal {
        RawSignal {
            source: SignalSource::Rx433,
            address: 0,
            value,
            repeats: 1,
        }
    }

    #[test]
    fn rf_burst_dispatches_once_at_threshold() {
        let mut d = SignalDebouncer::new(&config(3, 450));
        assert!(d.offer(rf(0xABC123), 0).is_empty());
        assert!(d.offer(rf(0xABC123), 10).is_empty());
        let out = d.offer(rf(0xABC123), 20);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].repeats, 3);
        assert!(!out[0].end_of_packet);

        // Further repeats of the same burst stay silent…
        assert!(d.offer(rf(0xABC123), 30).is_empty());
        // …and the idle flush does not re-dispatch.
        assert_eq!(d.poll_flush(1_000), None);
        assert_eq!(d.deadline_ms(), None);
    }

    #[test]
    fn below_threshold_burst_flushes_at_idle_timeout() {
        let mut d = SignalDebouncer::new(&config(3, 450));
        assert!(d.offer(rf(0x55), 0).is_empty());
        assert!(d.offer(rf(0x55), 100).is_empty());

        // Not idle yet.
        assert_eq!(d.poll_flush(400), None);

        let q = d.poll_flush(550).expect("idle flush");
        assert_eq!(q.repeats, 2);
        assert!(q.end_of_packet);
        assert_eq!(d.poll_flush(600), None);
    }

    #[test]
    fn repeat_count_accumulates_receiver_precollapsed_repeats() {
        let mut d = SignalDebouncer::new(&config(5, 450));
        let mut sig = rf(0x77);
        sig.repeats = 2;
        assert!(d.offer(sig, 0).is_empty()); // 2 < 5
        assert!(d.offer(sig, 10).is_empty()); // 4 < 5
        let out = d.offer(sig, 20); // 6 >= 5
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].repeats, 6);
        assert!(!out[0].end_of_packet);
    }

    #[test]
    fn new_code_flushes_undispatched_burst() {
        let mut d = SignalDebouncer::new(&config(3, 450));
        assert!(d.offer(rf(0x11), 0).is_empty());
        let out = d.offer(rf(0x22), 50);
        // Flush of 0x11 (eop) — 0x22 opens a new burst below threshold.
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].value, 0x11);
        assert!(out[0].end_of_packet);
        assert_eq!(out[0].repeats, 1);
    }

    #[test]
    fn threshold_one_dispatches_first_record() {
        let mut d = SignalDebouncer::new(&config(1, 450));
        let out = d.offer(rf(0x99), 0);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].repeats, 1);
        assert!(!out[0].end_of_packet);
    }

    #[test]
    fn rearm_redispatches_on_next_repeat() {
        let mut d = SignalDebouncer::new(&config(2, 450));
        assert!(d.offer(rf(0xAA), 0).is_empty());
        let out = d.offer(rf(0xAA), 10);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].repeats, 2);

        // Matcher deferred (slot threshold not met) — re-arm.
        d.rearm();
        let out = d.offer(rf(0xAA), 20);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].repeats, 3);
    }

    #[test]
    fn wired_passes_through_immediately() {
        let mut d = SignalDebouncer::new(&config(3, 450));
        let sig = RawSignal {
            source: SignalSource::Wired,
            address: 5,
            value: 1,
            repeats: 0,
        };
        let out = d.offer(sig, 0);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].repeats, 1);
        assert!(out[0].end_of_packet);
        assert_eq!(d.deadline_ms(), None);
    }

    #[test]
    fn bus_passthrough_leaves_open_burst_intact() {
        let mut d = SignalDebouncer::new(&config(3, 450));
        assert!(d.offer(rf(0x33), 0).is_empty());

        let bus = RawSignal {
            source: SignalSource::Bus,
            address: 42,
            value: 1,
            repeats: 1,
        };
        let out = d.offer(bus, 10);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].source, SignalSource::Bus);

        // RF burst still open and flushable.
        let q = d.poll_flush(500).expect("burst survives bus event");
        assert_eq!(q.value, 0x33);
    }

    #[test]
    fn deadline_tracks_last_repeat() {
        let mut d = SignalDebouncer::new(&config(5, 450));
        assert!(d.offer(rf(0x44), 100).is_empty());
        assert_eq!(d.deadline_ms(), Some(550));
        assert!(d.offer(rf(0x44), 300).is_empty());
        assert_eq!(d.deadline_ms(), Some(750));
    }
}

//! Alarm worker — the single consumer of the signal queue.
//!
//! One dedicated thread drains a bounded FIFO of [`Message`]s and drives
//! the engine; producers (GPIO edge handlers, the RF receiver task, bus
//! command handlers, timer expiries) enqueue non-blockingly through a
//! cloned [`SignalHandle`]. A full queue drops the record with an error
//! log — interrupt-adjacent producers must never block.
//!
//! The worker blocks indefinitely on an empty queue, but switches to a
//! bounded wait while a debounce burst is open so the idle-timeout flush
//! fires on time.

use std::sync::mpsc::{sync_channel, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{error, info, warn};

use crate::config::AlarmConfig;
use crate::engine::AlarmEngine;
use crate::error::{Error, RegistryError};
use crate::mode::{AlarmMode, ControlSource};
use crate::ports::AlarmPorts;
use crate::registry::{EventSpec, SensorId, SensorKind, ZoneId};
use crate::respond::Responses;
use crate::signal::{Message, RawSignal, SignalSource, SIGNAL_QUEUE_DEPTH};

// ---------------------------------------------------------------------------
// Producer handle
// ---------------------------------------------------------------------------

/// Cloneable, non-blocking producer side of the worker queue.
#[derive(Clone)]
pub struct SignalHandle {
    tx: SyncSender<Message>,
}

impl SignalHandle {
    pub(crate) fn from_sender(tx: SyncSender<Message>) -> Self {
        Self { tx }
    }

    /// Post an external signal record (the `post_external_signal` surface).
    /// Returns `false` when the queue is full or closed.
    pub fn post(&self, source: SignalSource, address: u32, value: u32) -> bool {
        self.post_raw(RawSignal {
            source,
            address,
            value,
            repeats: 1,
        })
    }

    pub fn post_raw(&self, raw: RawSignal) -> bool {
        self.post_message(Message::Signal(raw))
    }

    /// Request a mode change from a control channel.
    pub fn request_mode(&self, mode: AlarmMode, source: ControlSource) -> bool {
        self.post_message(Message::SetMode { mode, source })
    }

    /// Ask the worker to republish the status snapshot.
    pub fn publish_status(&self) -> bool {
        self.post_message(Message::PublishStatus)
    }

    /// Low-level enqueue, shared by the timer-service adapters.
    pub fn post_message(&self, msg: Message) -> bool {
        match self.tx.try_send(msg) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                error!("QUEUE | full, message dropped");
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                warn!("QUEUE | worker gone, message dropped");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Service (configuration phase)
// ---------------------------------------------------------------------------

/// The alarm system before its worker starts: owns the engine and the
/// queue, and exposes the configuration-phase API.
pub struct AlarmService {
    engine: AlarmEngine,
    tx: SyncSender<Message>,
    rx: Receiver<Message>,
}

impl AlarmService {
    /// Validate the configuration, create the queue, and bind the timer
    /// service to it.
    pub fn new(config: AlarmConfig, mut ports: AlarmPorts) -> Result<Self, Error> {
        config.validate().map_err(Error::Config)?;

        let (tx, rx) = sync_channel(SIGNAL_QUEUE_DEPTH);
        ports.timers.bind(SignalHandle { tx: tx.clone() });

        Ok(Self {
            engine: AlarmEngine::new(config, ports),
            tx,
            rx,
        })
    }

    // ── Registry configuration (pre-start only) ───────────────

    pub fn add_zone(
        &mut self,
        name: &'static str,
        topic: &'static str,
        relay: Option<crate::ports::RelayControl>,
    ) -> Result<ZoneId, RegistryError> {
        self.engine.add_zone(name, topic, relay)
    }

    pub fn set_zone_responses(
        &mut self,
        zone: ZoneId,
        mode: AlarmMode,
        on_set: Responses,
        on_clear: Responses,
    ) -> Result<(), RegistryError> {
        self.engine.set_zone_responses(zone, mode, on_set, on_clear)
    }

    pub fn add_sensor(
        &mut self,
        kind: SensorKind,
        name: &'static str,
        topic: &'static str,
        address: u32,
    ) -> Result<SensorId, RegistryError> {
        self.engine.add_sensor(kind, name, topic, address)
    }

    pub fn set_sensor_event(
        &mut self,
        sensor: SensorId,
        zone: ZoneId,
        slot: usize,
        spec: EventSpec,
    ) -> Result<(), RegistryError> {
        self.engine.set_sensor_event(sensor, zone, slot, spec)
    }

    /// Producer handle; clone freely.
    pub fn handle(&self) -> SignalHandle {
        SignalHandle {
            tx: self.tx.clone(),
        }
    }

    // ── Start ─────────────────────────────────────────────────

    /// Replay the persisted mode and spawn the worker thread.
    pub fn start(mut self) -> std::io::Result<RunningAlarm> {
        self.engine.restore_mode();

        let tx = self.tx.clone();
        let join = thread::Builder::new()
            .name("alarm".into())
            .spawn(move || worker_loop(self.engine, self.rx))?;

        info!("WORKER | started");
        Ok(RunningAlarm {
            tx,
            join: Some(join),
        })
    }
}

// ---------------------------------------------------------------------------
// Running system
// ---------------------------------------------------------------------------

/// Handle to the running worker.
pub struct RunningAlarm {
    tx: SyncSender<Message>,
    join: Option<JoinHandle<()>>,
}

impl RunningAlarm {
    pub fn handle(&self) -> SignalHandle {
        SignalHandle {
            tx: self.tx.clone(),
        }
    }

    /// Pause signal processing and deregister external sources. Zone and
    /// sensor state stays exactly as of the last processed signal.
    pub fn suspend(&self) -> bool {
        self.handle().post_message(Message::Suspend)
    }

    pub fn resume(&self) -> bool {
        self.handle().post_message(Message::Resume)
    }

    /// Terminate the worker and join it; pending timers are canceled
    /// before the engine is dropped.
    pub fn stop(mut self) {
        let _ = self.tx.send(Message::Shutdown);
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                error!("WORKER | panicked during shutdown");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Worker loop
// ---------------------------------------------------------------------------

fn worker_loop(mut engine: AlarmEngine, rx: Receiver<Message>) {
    loop {
        // Bounded wait only while a debounce burst is open.
        let msg = match engine.wait_budget_ms() {
            Some(budget) => match rx.recv_timeout(Duration::from_millis(budget)) {
                Ok(m) => Some(m),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => break,
            },
            None => match rx.recv() {
                Ok(m) => Some(m),
                Err(_) => break,
            },
        };

        if let Some(m) = msg {
            if !engine.handle_message(m) {
                info!("WORKER | stopped");
                return;
            }
        }
        engine.poll_debounce();
    }

    // All producers dropped without an explicit stop — clean up anyway.
    engine.shutdown();
    info!("WORKER | queue closed, stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AlarmConfig;
    use crate::ports::tests_support::recording_ports;
    use crate::registry::EventKind;
    use crate::respond::RESP_ALARM_SIREN;
    use crate::signal::VALUE_NONE;

    fn service() -> (AlarmService, crate::ports::tests_support::Recorder) {
        let (ports, rec) = recording_ports();
        let svc = AlarmService::new(AlarmConfig::default(), ports).unwrap();
        (svc, rec)
    }

    #[test]
    fn invalid_config_is_rejected() {
        let (ports, _rec) = recording_ports();
        let mut config = AlarmConfig::default();
        config.rf_repeat_threshold = 0;
        assert!(AlarmService::new(config, ports).is_err());
    }

    #[test]
    fn end_to_end_wired_alarm_through_worker() {
        let (mut svc, rec) = service();
        let zone = svc.add_zone("hall", "hall", None).unwrap();
        svc.set_zone_responses(zone, AlarmMode::Armed, RESP_ALARM_SIREN, Responses::NONE)
            .unwrap();
        let sensor = svc
            .add_sensor(SensorKind::Wired, "door", "door", 5)
            .unwrap();
        svc.set_sensor_event(
            sensor,
            zone,
            0,
            EventSpec {
                kind: EventKind::Alarm,
                value_set: 1,
                message_set: "door open",
                value_clear: 0,
                message_clear: "door closed",
                threshold: 1,
                clear_timeout_ms: 0,
                publish_interval_s: 0,
                confirm: false,
            },
        )
        .unwrap();

        let running = svc.start().unwrap();
        let handle = running.handle();
        assert!(handle.request_mode(AlarmMode::Armed, ControlSource::Buttons));
        assert!(handle.post(SignalSource::Wired, 5, 1));
        running.stop();

        // The worker processed everything before joining.
        assert!(rec.siren_on());
        assert!(rec.status_count() >= 2);
    }

    #[test]
    fn suspend_drops_signals_resume_processes_again() {
        let (mut svc, rec) = service();
        let zone = svc.add_zone("hall", "hall", None).unwrap();
        svc.set_zone_responses(zone, AlarmMode::Armed, RESP_ALARM_SIREN, Responses::NONE)
            .unwrap();
        let sensor = svc
            .add_sensor(SensorKind::Bus, "virtual", "virt", 9)
            .unwrap();
        svc.set_sensor_event(
            sensor,
            zone,
            0,
            EventSpec {
                kind: EventKind::Alarm,
                value_set: 1,
                message_set: "",
                value_clear: 0,
                message_clear: "",
                threshold: 1,
                clear_timeout_ms: 0,
                publish_interval_s: 0,
                confirm: false,
            },
        )
        .unwrap();

        let running = svc.start().unwrap();
        let handle = running.handle();
        handle.request_mode(AlarmMode::Armed, ControlSource::Command);

        running.suspend();
        handle.post(SignalSource::Bus, 9, 1);
        running.resume();
        running.stop();

        // The suspended signal was dropped, so the siren never sounded.
        assert!(!rec.siren_on());
        assert!(rec.sources_suspended() >= 1);
        assert!(rec.sources_resumed() >= 1);
    }

    #[test]
    fn value_none_guard() {
        // post() with VALUE_NONE must never match anything — smoke check
        // that the worker survives it.
        let (mut svc, _rec) = service();
        let zone = svc.add_zone("z", "z", None).unwrap();
        let sensor = svc.add_sensor(SensorKind::Bus, "v", "v", 1).unwrap();
        svc.set_sensor_event(
            sensor,
            zone,
            0,
            EventSpec {
                kind: EventKind::Alarm,
                value_set: VALUE_NONE,
                message_set: "",
                value_clear: VALUE_NONE,
                message_clear: "",
                threshold: 1,
                clear_timeout_ms: 0,
                publish_interval_s: 0,
                confirm: false,
            },
        )
        .unwrap();
        let running = svc.start().unwrap();
        running.handle().post(SignalSource::Bus, 1, VALUE_NONE);
        running.stop();
    }
}

//! Alarm engine — the single owned context the worker drives.
//!
//! Owns the registry, debouncer, mode machine, annunciator drivers, global
//! alarm state, and every injected port. All mutation happens on the
//! worker thread via [`handle_message`](AlarmEngine::handle_message);
//! timer expiries arrive as ordinary messages, so there is exactly one
//! writer and the core needs no locks. No process-wide singletons —
//! multiple independent engines can coexist (and do, in tests).
//!
//! The dispatch algorithm itself (signal → match → response) lives in
//! `dispatch.rs`; this file holds construction, the configuration-phase
//! API, mode-change orchestration, and lifecycle.

use log::{debug, info, warn};

use crate::annunciator::{BuzzerDriver, FlasherDriver, SirenDriver};
use crate::config::AlarmConfig;
use crate::debounce::SignalDebouncer;
use crate::error::RegistryError;
use crate::mode::{AlarmMode, ControlSource, ModeMachine};
use crate::ports::{
    AlarmIndicators, AlarmPorts, Clock, LevelReader, ModeChangeHook, ModeStore, NotificationSink,
    NotifyKind, RelayControl, SignalSources, StatusSink, TimerService,
};
use crate::registry::{EventSpec, Registry, SensorId, SensorKind, ZoneId};
use crate::respond::Responses;
use crate::signal::Message;
use crate::status::{self, StatusSnapshot};

// ---------------------------------------------------------------------------
// Global alarm state
// ---------------------------------------------------------------------------

/// Reference to the (sensor, event slot) pair that produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventRef {
    pub sensor: SensorId,
    pub slot: u8,
    pub at: i64,
}

/// Alarm-wide mutable state — the single source of truth consumed by the
/// status projection.
pub struct AlarmState {
    /// Alarms registered since the last arming (saturating).
    pub alarms: u16,
    pub last_event: Option<EventRef>,
    pub last_alarm: Option<EventRef>,
    /// A confirmation-required trigger is waiting for its second trigger.
    pub confirm_pending: bool,
    pub(crate) confirm_timer: Option<crate::ports::TimerHandle>,
}

impl AlarmState {
    fn new() -> Self {
        Self {
            alarms: 0,
            last_event: None,
            last_alarm: None,
            confirm_pending: false,
            confirm_timer: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// The worker-owned alarm context.
pub struct AlarmEngine {
    pub(crate) config: AlarmConfig,
    pub(crate) registry: Registry,
    pub(crate) debouncer: SignalDebouncer,
    pub(crate) mode: ModeMachine,
    pub(crate) state: AlarmState,

    pub(crate) siren: SirenDriver,
    pub(crate) flasher: FlasherDriver,
    pub(crate) buzzer: BuzzerDriver,
    pub(crate) outs: AlarmIndicators,

    pub(crate) timers: Box<dyn TimerService + Send>,
    pub(crate) clock: Box<dyn Clock + Send>,
    pub(crate) notifier: Box<dyn NotificationSink + Send>,
    pub(crate) status: Box<dyn StatusSink + Send>,
    pub(crate) store: Box<dyn ModeStore + Send>,
    pub(crate) levels: Option<Box<dyn LevelReader + Send>>,
    sources: Option<Box<dyn SignalSources + Send>>,
    pub(crate) on_mode_change: Option<ModeChangeHook>,

    suspended: bool,
}

impl AlarmEngine {
    pub fn new(config: AlarmConfig, ports: AlarmPorts) -> Self {
        let debouncer = SignalDebouncer::new(&config);
        let buzzer = BuzzerDriver::new(config.buzzer_enabled);
        Self {
            debouncer,
            buzzer,
            registry: Registry::new(),
            mode: ModeMachine::new(),
            state: AlarmState::new(),
            siren: SirenDriver::new(),
            flasher: FlasherDriver::new(),
            outs: ports.indicators,
            timers: ports.timers,
            clock: ports.clock,
            notifier: ports.notifier,
            status: ports.status,
            store: ports.store,
            levels: ports.levels,
            sources: ports.sources,
            on_mode_change: ports.on_mode_change,
            suspended: false,
            config,
        }
    }

    // ── Configuration phase ───────────────────────────────────

    pub fn add_zone(
        &mut self,
        name: &'static str,
        topic: &'static str,
        relay: Option<RelayControl>,
    ) -> Result<ZoneId, RegistryError> {
        let id = self.registry.add_zone(name, topic, relay);
        if let Err(e) = id {
            warn!("CONFIG | zone '{name}' rejected: {e}");
        }
        id
    }

    pub fn set_zone_responses(
        &mut self,
        zone: ZoneId,
        mode: AlarmMode,
        on_set: Responses,
        on_clear: Responses,
    ) -> Result<(), RegistryError> {
        self.registry.set_responses(zone, mode, on_set, on_clear)
    }

    pub fn add_sensor(
        &mut self,
        kind: SensorKind,
        name: &'static str,
        topic: &'static str,
        address: u32,
    ) -> Result<SensorId, RegistryError> {
        let id = self.registry.add_sensor(kind, name, topic, address);
        if let Err(e) = id {
            warn!("CONFIG | sensor '{name}' rejected: {e}");
        }
        id
    }

    pub fn set_sensor_event(
        &mut self,
        sensor: SensorId,
        zone: ZoneId,
        slot: usize,
        spec: EventSpec,
    ) -> Result<(), RegistryError> {
        self.registry.set_event(sensor, zone, slot, spec)
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Replay the persisted arming mode through the ordinary transition
    /// path (`forced`, so indication refreshes without double-mutating
    /// counters). Defaults to `Disabled` on first boot.
    pub fn restore_mode(&mut self) {
        let stored = self.store.load().unwrap_or(AlarmMode::Disabled);
        self.change_mode(stored, ControlSource::Stored, "boot restore", true, true);
    }

    /// Process one worker message. Returns `false` when the worker should
    /// terminate.
    pub fn handle_message(&mut self, msg: Message) -> bool {
        match msg {
            Message::Signal(raw) => {
                if self.suspended {
                    debug!("ENGINE | suspended, signal dropped");
                } else {
                    self.ingest_signal(raw);
                }
            }
            Message::Timer(ev) => {
                if self.suspended {
                    debug!("ENGINE | suspended, timer {ev:?} dropped");
                } else {
                    self.handle_timer(ev);
                }
            }
            Message::SetMode { mode, source } => {
                if !self.suspended {
                    self.change_mode(mode, source, source.label(), false, true);
                }
            }
            Message::PublishStatus => {
                if !self.suspended {
                    self.publish_status();
                }
            }
            Message::Suspend => {
                if !self.suspended {
                    self.suspended = true;
                    if let Some(s) = self.sources.as_mut() {
                        s.suspend();
                    }
                    info!("ENGINE | suspended");
                }
            }
            Message::Resume => {
                if self.suspended {
                    self.suspended = false;
                    if let Some(s) = self.sources.as_mut() {
                        s.resume();
                    }
                    info!("ENGINE | resumed");
                }
            }
            Message::Shutdown => {
                self.shutdown();
                return false;
            }
        }
        true
    }

    /// Flush the debouncer if its idle deadline passed. Called by the
    /// worker after every wakeup.
    pub fn poll_debounce(&mut self) {
        if self.suspended {
            return;
        }
        let now = self.clock.monotonic_ms();
        if let Some(q) = self.debouncer.poll_flush(now) {
            self.handle_qualified(q);
        }
    }

    /// How long the worker may sleep: `None` blocks indefinitely, `Some`
    /// bounds the wait so the open debounce burst flushes on time.
    pub fn wait_budget_ms(&self) -> Option<u64> {
        self.debouncer
            .deadline_ms()
            .map(|dl| dl.saturating_sub(self.clock.monotonic_ms()))
    }

    /// Cancel every pending one-shot timer. Runs before the worker exits
    /// so nothing fires into freed state.
    pub fn shutdown(&mut self) {
        for h in self.registry.take_clear_timers() {
            self.timers.cancel(h);
        }
        self.siren
            .alarm_off(true, self.outs.siren.as_mut(), self.timers.as_mut());
        self.flasher
            .alarm_off(true, self.outs.flasher.as_mut(), self.timers.as_mut());
        if let Some(t) = self.state.confirm_timer.take() {
            self.timers.cancel(t);
        }
        self.state.confirm_pending = false;
        info!("ENGINE | shutdown, all timers canceled");
    }

    // ── Mode transitions ──────────────────────────────────────

    /// Apply a mode change from any control channel.
    ///
    /// `origin` names the concrete trigger ("remote control, gate fob");
    /// `publish` republishes the full status afterwards. A non-forced
    /// request for the current mode is a no-op.
    pub fn change_mode(
        &mut self,
        new: AlarmMode,
        source: ControlSource,
        origin: &str,
        forced: bool,
        publish: bool,
    ) {
        let Some(changed) = self.mode.request(new, forced) else {
            return;
        };

        if changed {
            if let Err(e) = self.store.store(new) {
                warn!("MODE | persist failed: {e}");
            }
            if new.is_armed() {
                // Fresh arming: counters start clean.
                self.state.alarms = 0;
                self.registry.reset_event_counts();
            } else {
                self.siren
                    .alarm_off(true, self.outs.siren.as_mut(), self.timers.as_mut());
                self.flasher
                    .alarm_off(true, self.outs.flasher.as_mut(), self.timers.as_mut());
            }
        }

        let pending = self.state.alarms > 0;
        self.outs
            .mode_led
            .blink(self.config.indication.pattern(new, pending));
        self.flasher
            .mode_refresh(self.outs.flasher.as_mut(), &self.config, new, pending);

        // Audible feedback only for physical controls at the panel —
        // remote/bus changes must stay silent locally.
        if source.is_local() {
            self.siren.mode_refresh(self.outs.siren.as_mut(), &self.config);
            self.buzzer
                .mode_refresh(self.outs.buzzer.as_mut(), &self.config, new);
        }

        if publish {
            self.publish_status();
        }

        info!(
            "MODE | {} (source: {}, origin: {})",
            new.label(),
            source.label(),
            origin
        );
        let text = format!("Security mode: {} ({})", new.label(), origin);
        self.notifier.send(NotifyKind::Info, &text);

        if let Some(cb) = self.on_mode_change.as_mut() {
            cb(new, source);
        }
    }

    // ── Status ────────────────────────────────────────────────

    /// Build the current snapshot without publishing it.
    pub fn snapshot(&self) -> StatusSnapshot {
        status::project(
            &self.registry,
            self.mode.current(),
            self.state.alarms,
            self.state.last_alarm.map(|r| (r.sensor, r.at)),
            self.state.last_event.map(|r| (r.sensor, r.at)),
            self.siren.active(),
            self.flasher.active(),
        )
    }

    /// Publish the snapshot to the status sink (idempotent).
    pub fn publish_status(&mut self) {
        let snap = self.snapshot();
        self.status.publish_status(&snap);
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn mode(&self) -> AlarmMode {
        self.mode.current()
    }

    pub fn alarm_count(&self) -> u16 {
        self.state.alarms
    }

    pub fn siren_active(&self) -> bool {
        self.siren.active()
    }

    pub fn flasher_active(&self) -> bool {
        self.flasher.active()
    }

    pub fn confirm_pending(&self) -> bool {
        self.state.confirm_pending
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &AlarmConfig {
        &self.config
    }

    /// Runtime buzzer master switch.
    pub fn set_buzzer_enabled(&mut self, enabled: bool) {
        self.buzzer.set_enabled(enabled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::tests_support::recording_ports;
    use crate::registry::EventKind;
    use crate::respond::RESP_ALARM_SIREN;
    use crate::signal::{RawSignal, SignalSource};

    fn engine() -> (AlarmEngine, crate::ports::tests_support::Recorder) {
        let (ports, rec) = recording_ports();
        (AlarmEngine::new(AlarmConfig::default(), ports), rec)
    }

    fn armed_engine_with_alarm() -> (AlarmEngine, crate::ports::tests_support::Recorder) {
        let (mut e, rec) = engine();
        let zone = e.add_zone("hall", "hall", None).unwrap();
        e.set_zone_responses(zone, AlarmMode::Armed, RESP_ALARM_SIREN, Responses::NONE)
            .unwrap();
        let sensor = e.add_sensor(SensorKind::Wired, "door", "door", 5).unwrap();
        e.set_sensor_event(
            sensor,
            zone,
            0,
            EventSpec {
                kind: EventKind::Alarm,
                value_set: 1,
                message_set: "open",
                value_clear: 0,
                message_clear: "closed",
                threshold: 1,
                clear_timeout_ms: 0,
                publish_interval_s: 0,
                confirm: false,
            },
        )
        .unwrap();
        e.change_mode(AlarmMode::Armed, ControlSource::Command, "test", false, false);
        (e, rec)
    }

    #[test]
    fn restore_mode_defaults_to_disabled() {
        let (mut e, _rec) = engine();
        e.restore_mode();
        assert_eq!(e.mode(), AlarmMode::Disabled);
    }

    #[test]
    fn change_mode_persists_and_notifies() {
        let (mut e, rec) = engine();
        e.change_mode(AlarmMode::Armed, ControlSource::Bus, "bus", false, true);
        assert_eq!(e.mode(), AlarmMode::Armed);
        assert_eq!(rec.stored_modes(), vec![AlarmMode::Armed]);
        assert_eq!(rec.status_count(), 1);
        assert_eq!(rec.notification_count(), 1);
    }

    #[test]
    fn unforced_same_mode_is_fully_idempotent() {
        let (mut e, rec) = engine();
        e.change_mode(AlarmMode::Armed, ControlSource::Bus, "bus", false, true);
        let stores = rec.stored_modes().len();
        let statuses = rec.status_count();
        e.change_mode(AlarmMode::Armed, ControlSource::Bus, "bus", false, true);
        assert_eq!(rec.stored_modes().len(), stores);
        assert_eq!(rec.status_count(), statuses);
    }

    #[test]
    fn forced_replay_does_not_reset_counters() {
        let (mut e, _rec) = armed_engine_with_alarm();
        e.ingest_signal(RawSignal {
            source: SignalSource::Wired,
            address: 5,
            value: 1,
            repeats: 1,
        });
        assert_eq!(e.alarm_count(), 1);

        // Boot-style replay of the same mode: counters must survive.
        e.change_mode(AlarmMode::Armed, ControlSource::Stored, "replay", true, true);
        assert_eq!(e.alarm_count(), 1);
    }

    #[test]
    fn entering_armed_resets_alarms_and_event_counts() {
        let (mut e, _rec) = armed_engine_with_alarm();
        e.ingest_signal(RawSignal {
            source: SignalSource::Wired,
            address: 5,
            value: 1,
            repeats: 1,
        });
        assert_eq!(e.alarm_count(), 1);

        e.change_mode(AlarmMode::Disabled, ControlSource::Command, "t", false, false);
        e.change_mode(AlarmMode::Armed, ControlSource::Command, "t", false, false);
        assert_eq!(e.alarm_count(), 0);
        let (id, _) = e.registry().sensors().next().unwrap();
        assert_eq!(e.registry().sensor(id).unwrap().events[0].count, 0);
    }

    #[test]
    fn entering_disabled_forces_annunciators_off() {
        let (mut e, rec) = armed_engine_with_alarm();
        e.ingest_signal(RawSignal {
            source: SignalSource::Wired,
            address: 5,
            value: 1,
            repeats: 1,
        });
        assert!(e.siren_active());
        assert!(e.flasher_active());

        e.change_mode(AlarmMode::Disabled, ControlSource::Bus, "bus", false, false);
        assert!(!e.siren_active());
        assert!(!e.flasher_active());
        assert!(!rec.siren_on());
        assert!(!rec.flasher_on());
    }

    #[test]
    fn mode_change_callback_receives_source() {
        use std::sync::{Arc, Mutex};
        let (mut ports, _rec) = recording_ports();
        let seen: Arc<Mutex<Vec<(AlarmMode, ControlSource)>>> = Arc::default();
        let seen2 = seen.clone();
        ports.on_mode_change = Some(Box::new(move |mode, source| {
            seen2.lock().unwrap().push((mode, source));
        }));
        let mut e = AlarmEngine::new(AlarmConfig::default(), ports);
        e.change_mode(AlarmMode::Perimeter, ControlSource::Buttons, "btn", false, false);
        assert_eq!(
            seen.lock().unwrap().as_slice(),
            &[(AlarmMode::Perimeter, ControlSource::Buttons)]
        );
    }

    #[test]
    fn shutdown_cancels_confirmation_timer() {
        let (mut e, rec) = engine();
        let zone = e.add_zone("z", "z", None).unwrap();
        e.set_zone_responses(zone, AlarmMode::Armed, RESP_ALARM_SIREN, Responses::NONE)
            .unwrap();
        let sensor = e.add_sensor(SensorKind::Wired, "pir", "pir", 7).unwrap();
        e.set_sensor_event(
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
                confirm: true,
            },
        )
        .unwrap();
        e.change_mode(AlarmMode::Armed, ControlSource::Command, "t", false, false);
        e.ingest_signal(RawSignal {
            source: SignalSource::Wired,
            address: 7,
            value: 1,
            repeats: 1,
        });
        assert!(e.confirm_pending());

        e.shutdown();
        assert!(!e.confirm_pending());
        // The confirm window timer was canceled, not left to fire.
        assert!(!rec.canceled().is_empty());
    }
}

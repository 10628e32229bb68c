//! Response dispatcher — signal → match → bitmask-driven reactions.
//!
//! Continues the [`AlarmEngine`] impl from `engine.rs` with the hot path:
//! ingesting raw signals, resolving matches, and executing every response
//! bit of the owning zone's mask for the current mode.
//!
//! Two deliberate compatibility quirks are preserved from deployed
//! response tables:
//! * both the increment and decrement alarm-counter bits are evaluated on
//!   both the set and the clear transition (each with its own mask);
//! * alarm confirmation is one shared flag + timer for the whole system,
//!   so two unrelated sensors can confirm each other.

use log::{info, warn};

use crate::engine::{AlarmEngine, EventRef};
use crate::matcher::{find_match, MatchOutcome};
use crate::mode::{AlarmMode, ControlSource};
use crate::ports::NotifyKind;
use crate::registry::{EventKind, SensorId, ZoneId};
use crate::respond::{Response, Responses};
use crate::signal::{QualifiedSignal, RawSignal, SignalSource, TimerEvent};
use crate::status::SignalEventRecord;

/// Copies of the slot/zone fields the dispatcher needs after it starts
/// mutating the registry.
struct SlotView {
    kind: EventKind,
    zone: ZoneId,
    confirm: bool,
    clear_timeout_ms: u32,
    sensor_name: &'static str,
    sensor_topic: &'static str,
    zone_name: &'static str,
    zone_topic: &'static str,
    message: &'static str,
    resp: Responses,
}

impl AlarmEngine {
    // ── Raw-signal ingestion ──────────────────────────────────

    pub(crate) fn ingest_signal(&mut self, mut raw: RawSignal) {
        self.outs.rf_led.blink(self.config.rf_activity);

        // Reconcile wired contacts against the live pin level — the edge
        // in the queue may be stale after contact bounce.
        if raw.source == SignalSource::Wired {
            if let Some(reader) = self.levels.as_mut() {
                if let Some(level) = reader.read_level(raw.address) {
                    raw.value = level;
                }
            }
        }

        info!(
            "SIGNAL | source={:?} addr=0x{:08X} value=0x{:08X} repeats={}",
            raw.source, raw.address, raw.value, raw.repeats
        );

        let now = self.clock.monotonic_ms();
        for q in self.debouncer.offer(raw, now) {
            self.handle_qualified(q);
        }
    }

    pub(crate) fn handle_qualified(&mut self, q: QualifiedSignal) {
        match find_match(&self.registry, &q) {
            MatchOutcome::Matched {
                sensor,
                slot,
                is_set,
            } => self.process_event(sensor, slot, is_set, q.value),
            MatchOutcome::Deferred { .. } => {
                // Below the slot's repeat threshold: keep the burst open and
                // retry on the next repetition.
                self.debouncer.rearm();
            }
            MatchOutcome::UnknownCommand { sensor } => {
                let name = self
                    .registry
                    .sensor(sensor)
                    .map_or("?", |s| s.name);
                let text = format!(
                    "Unidentified command 0x{:08X} / {} for sensor '{}'",
                    q.value, q.value, name
                );
                self.notifier.send(NotifyKind::Warning, &text);
            }
            MatchOutcome::UnknownSensor => {
                let text = format!(
                    "Unidentified signal {:?} 0x{:08X} / {}",
                    q.source, q.value, q.value
                );
                self.notifier.send(NotifyKind::Warning, &text);
            }
            MatchOutcome::Ignored => {}
        }
    }

    // ── Response dispatch ─────────────────────────────────────

    /// Execute the response mask for one event transition. Also entered by
    /// the auto-clear timer with `is_set = false`.
    pub(crate) fn process_event(&mut self, sensor: SensorId, slot: u8, is_set: bool, value: u32) {
        let at = self.clock.epoch_secs();
        let mode = self.mode.current();

        // 1. Resolve the slot and its zone mask, defensively.
        let Some(view) = self.slot_view(sensor, slot, is_set, mode) else {
            warn!("DISPATCH | dangling sensor/zone reference, event dropped");
            return;
        };

        // 2. Record the transition and apply the counter bits.
        let confirmed = if is_set && view.confirm {
            self.check_confirmation()
        } else {
            true
        };

        if is_set {
            if let Some(s) = self.registry.sensor_mut(sensor) {
                let e = &mut s.events[slot as usize];
                e.state = true;
                e.count = e.count.saturating_add(1);
                e.last_at = at;
            }
            if let Some(z) = self.registry.zone_mut(view.zone) {
                z.status = z.status.saturating_add(1);
                z.last_set = at;
            }
            self.state.last_event = Some(EventRef { sensor, slot, at });
            self.apply_alarm_counter(view.resp, sensor, slot, at);
            info!(
                "EVENT SET | {}/{} ({:?}) value=0x{:08X}",
                view.zone_name, view.sensor_name, view.kind, value
            );

            // Re-arm the per-event auto-clear timer.
            if view.clear_timeout_ms > 0 {
                self.rearm_auto_clear(sensor, slot, view.clear_timeout_ms);
            }
        } else {
            if let Some(s) = self.registry.sensor_mut(sensor) {
                s.events[slot as usize].state = false;
            }
            if let Some(z) = self.registry.zone_mut(view.zone) {
                if z.status > 0 {
                    z.status -= 1;
                }
                if z.status == 0 {
                    z.last_clear = at;
                }
            }
            // Same increment/decrement evaluation as the set path, with
            // this transition's mask.
            self.apply_alarm_counter(view.resp, sensor, slot, at);
            info!(
                "EVENT CLEAR | {}/{} ({:?})",
                view.zone_name, view.sensor_name, view.kind
            );

            if let Some(h) = self
                .registry
                .sensor_mut(sensor)
                .and_then(|s| s.events[slot as usize].clear_timer.take())
            {
                self.timers.cancel(h);
            }
        }

        // 3. Control kinds reroute into the mode machine, regardless of
        // confirmation gating.
        if is_set && view.kind.is_control() {
            self.handle_control_event(view.kind, view.sensor_name);
        }

        // 4. Mask-bit side effects, annunciators/notification gated until
        // confirmed.
        let gated = is_set && view.confirm && !confirmed;

        if view.resp.contains(Response::PublishEvent) && self.publish_due(sensor, slot, at) {
            let record = SignalEventRecord {
                sensor: view.sensor_name,
                sensor_topic: view.sensor_topic,
                zone: view.zone_name,
                zone_topic: view.zone_topic,
                kind: view.kind,
                is_set,
                value,
                message: view.message,
                at,
            };
            self.status.publish_event(&record);
        }

        if is_set && !gated {
            if view.resp.contains(Response::Buzzer) {
                self.buzzer.alarm_on(self.outs.buzzer.as_mut(), &self.config);
            }
            if view.resp.contains(Response::Siren) {
                let hour = self.clock.hour_of_day();
                self.siren.alarm_on(
                    self.outs.siren.as_mut(),
                    self.timers.as_mut(),
                    &self.config,
                    hour,
                );
            }
            if view.resp.contains(Response::Flasher) {
                self.flasher.alarm_on(
                    self.outs.flasher.as_mut(),
                    self.timers.as_mut(),
                    &self.config,
                );
            }
        }

        if view.resp.contains(Response::RelayOn) {
            self.drive_relay(view.zone, Some(true));
        }
        if view.resp.contains(Response::RelayOff) {
            self.drive_relay(view.zone, Some(false));
        }
        if view.resp.contains(Response::RelayToggle) {
            self.drive_relay(view.zone, None);
        }

        if view.resp.contains(Response::Notify) && !gated {
            let count = self
                .registry
                .sensor(sensor)
                .map_or(0, |s| s.events[slot as usize].count);
            let kind = if is_set { NotifyKind::Alarm } else { NotifyKind::Info };
            let text = format!(
                "{}/{}: {} [mode: {}, siren: {}, count: {}, t: {}]",
                view.zone_name,
                view.sensor_name,
                if view.message.is_empty() {
                    if is_set { "set" } else { "clear" }
                } else {
                    view.message
                },
                mode.label(),
                if self.siren.active() { "on" } else { "off" },
                count,
                at
            );
            self.notifier.send(kind, &text);
        }

        // 5. Status goes out unconditionally.
        self.publish_status();
    }

    // ── Confirmation protocol ─────────────────────────────────

    /// One shared confirmation context system-wide: the first
    /// confirmation-required trigger opens the window and is suppressed;
    /// any further trigger inside the window confirms.
    fn check_confirmation(&mut self) -> bool {
        if self.state.confirm_pending {
            info!("CONFIRM | confirmed within window");
            return true;
        }
        self.state.confirm_pending = true;
        match self
            .timers
            .schedule(TimerEvent::ConfirmExpire, self.config.confirm_window_ms)
        {
            Ok(h) => self.state.confirm_timer = Some(h),
            Err(e) => warn!("CONFIRM | window timer failed: {e}"),
        }
        info!("CONFIRM | first trigger, awaiting confirmation");
        false
    }

    // ── Control events ────────────────────────────────────────

    /// Remote-control event kinds. Disable first silences an active
    /// siren/flasher; only a second press disarms.
    fn handle_control_event(&mut self, kind: EventKind, sensor_name: &'static str) {
        match kind {
            EventKind::CtrlDisable => {
                if self.siren.active() || self.flasher.active() {
                    self.siren
                        .alarm_off(true, self.outs.siren.as_mut(), self.timers.as_mut());
                    self.flasher
                        .alarm_off(true, self.outs.flasher.as_mut(), self.timers.as_mut());
                    info!("CONTROL | annunciators silenced by '{sensor_name}'");
                } else {
                    self.change_mode(
                        AlarmMode::Disabled,
                        ControlSource::RemoteControl,
                        sensor_name,
                        false,
                        true,
                    );
                }
            }
            EventKind::CtrlArm => self.change_mode(
                AlarmMode::Armed,
                ControlSource::RemoteControl,
                sensor_name,
                true,
                true,
            ),
            EventKind::CtrlPerimeter => self.change_mode(
                AlarmMode::Perimeter,
                ControlSource::RemoteControl,
                sensor_name,
                true,
                true,
            ),
            EventKind::CtrlOutbuildings => self.change_mode(
                AlarmMode::Outbuildings,
                ControlSource::RemoteControl,
                sensor_name,
                true,
                true,
            ),
            _ => {}
        }
    }

    // ── Timer fires (marshaled through the queue) ─────────────

    pub(crate) fn handle_timer(&mut self, ev: TimerEvent) {
        match ev {
            TimerEvent::SirenOff => self.siren.timer_expired(self.outs.siren.as_mut()),
            TimerEvent::FlasherOff => self.flasher.timer_expired(self.outs.flasher.as_mut()),
            TimerEvent::ConfirmExpire => {
                self.state.confirm_pending = false;
                self.state.confirm_timer = None;
                info!("CONFIRM | window expired unconfirmed");
            }
            TimerEvent::AutoClear { sensor, slot } => {
                // The handle is spent; drop it without cancel.
                let live = match self.registry.sensor_mut(sensor) {
                    Some(s) => {
                        let e = &mut s.events[slot as usize];
                        e.clear_timer = None;
                        e.state
                    }
                    None => false,
                };
                if live {
                    info!("AUTO-CLEAR | sensor #{} slot {}", sensor.0, slot);
                    self.process_event(sensor, slot, false, 0);
                }
            }
        }
    }

    // ── Internal ──────────────────────────────────────────────

    fn slot_view(
        &self,
        sensor: SensorId,
        slot: u8,
        is_set: bool,
        mode: AlarmMode,
    ) -> Option<SlotView> {
        let s = self.registry.sensor(sensor)?;
        let e = s.events.get(slot as usize)?;
        let zone_id = e.zone?;
        let z = self.registry.zone(zone_id)?;
        Some(SlotView {
            kind: e.kind,
            zone: zone_id,
            confirm: e.confirm,
            clear_timeout_ms: e.clear_timeout_ms,
            sensor_name: s.name,
            sensor_topic: s.topic,
            zone_name: z.name,
            zone_topic: z.topic,
            message: if is_set { e.message_set } else { e.message_clear },
            resp: if is_set {
                z.resp_set[mode as usize]
            } else {
                z.resp_clear[mode as usize]
            },
        })
    }

    /// Legacy dual-check: both counter bits are honored on every
    /// transition. Kept bit-for-bit compatible with deployed tables.
    fn apply_alarm_counter(&mut self, resp: Responses, sensor: SensorId, slot: u8, at: i64) {
        if resp.contains(Response::AlarmInc) {
            self.state.alarms = self.state.alarms.saturating_add(1);
            self.state.last_alarm = Some(EventRef { sensor, slot, at });
        }
        if resp.contains(Response::AlarmDec) && self.state.alarms > 0 {
            self.state.alarms -= 1;
        }
    }

    fn rearm_auto_clear(&mut self, sensor: SensorId, slot: u8, timeout_ms: u32) {
        if let Some(h) = self
            .registry
            .sensor_mut(sensor)
            .and_then(|s| s.events[slot as usize].clear_timer.take())
        {
            self.timers.cancel(h);
        }
        match self
            .timers
            .schedule(TimerEvent::AutoClear { sensor, slot }, timeout_ms)
        {
            Ok(h) => {
                if let Some(s) = self.registry.sensor_mut(sensor) {
                    s.events[slot as usize].clear_timer = Some(h);
                }
            }
            // Degraded mode: the event will stay set until a real clear.
            Err(e) => warn!("AUTO-CLEAR | timer failed: {e}"),
        }
    }

    /// Publish-throttle check: at most one event publication per slot per
    /// configured interval.
    fn publish_due(&mut self, sensor: SensorId, slot: u8, at: i64) -> bool {
        let Some(s) = self.registry.sensor_mut(sensor) else {
            return false;
        };
        let e = &mut s.events[slot as usize];
        if e.publish_interval_s == 0 || at >= e.publish_next {
            e.publish_next = at + i64::from(e.publish_interval_s);
            true
        } else {
            false
        }
    }

    fn drive_relay(&mut self, zone: ZoneId, demand: Option<bool>) {
        let Some(z) = self.registry.zone_mut(zone) else {
            return;
        };
        let Some(relay) = z.relay.as_mut() else {
            // Zone without load control — the bit is inert.
            return;
        };
        let target = demand.unwrap_or(!z.relay_state);
        let applied = relay(target);
        z.relay_state = applied;
        info!("RELAY | zone '{}' demand={} applied={}", z.name, target, applied);
    }
}

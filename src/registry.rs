//! Sensor/zone registry — the static configuration graph.
//!
//! Zones and sensors live in arena-style append-only vectors built during
//! the configuration phase; [`ZoneId`]/[`SensorId`] index handles replace
//! raw pointers, so teardown cannot dangle. Event slots are owned by their
//! sensor in a fixed priority-ordered array (lowest index wins).
//!
//! Setters are configuration-time only; after `start()` the registry is
//! touched exclusively by the worker. The mutable runtime fields inside
//! zones and event slots (counts, timestamps, timer handles) belong to the
//! matcher/dispatcher.

use serde::{Deserialize, Serialize};

use crate::error::RegistryError;
use crate::mode::{AlarmMode, MODE_COUNT};
use crate::ports::{RelayControl, TimerHandle};
use crate::respond::Responses;
use crate::signal::VALUE_NONE;

/// Capacity limits. Registration past a limit fails with a typed error
/// and the system continues without the entity.
pub const MAX_ZONES: usize = 16;
pub const MAX_SENSORS: usize = 64;
pub const MAX_EVENTS_PER_SENSOR: usize = 4;

// ---------------------------------------------------------------------------
// Handles
// ---------------------------------------------------------------------------

/// Stable index handle for a registered zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneId(pub(crate) u16);

/// Stable index handle for a registered sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorId(pub(crate) u16);

// ---------------------------------------------------------------------------
// Sensor/event taxonomy
// ---------------------------------------------------------------------------

/// Sensor input technology — selects the address/value decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    /// Wired contact on a GPIO input.
    Wired,
    /// RF sensor whose whole code is its identity (no command field).
    RfGeneric,
    /// RF sensor with a 24-bit code: 20-bit address + 4-bit command.
    RfAddressed,
    /// Virtual sensor fed from the bus.
    Bus,
}

/// What a matched event means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EventKind {
    /// Unconfigured slot — never matches.
    #[default]
    Empty,
    /// Intrusion/fire alarm signal.
    Alarm,
    /// Sensor enclosure opened.
    Tamper,
    /// Mains power state.
    Power,
    /// Sensor battery low.
    BatteryLow,
    /// Remote control: disarm (or silence an active siren).
    CtrlDisable,
    /// Remote control: full arm.
    CtrlArm,
    /// Remote control: perimeter arm.
    CtrlPerimeter,
    /// Remote control: outbuildings arm.
    CtrlOutbuildings,
}

impl EventKind {
    /// Control kinds reroute into the mode state machine.
    pub fn is_control(self) -> bool {
        matches!(
            self,
            Self::CtrlDisable | Self::CtrlArm | Self::CtrlPerimeter | Self::CtrlOutbuildings
        )
    }
}

// ---------------------------------------------------------------------------
// Zone
// ---------------------------------------------------------------------------

/// Logical grouping of sensors sharing a response policy per mode.
pub struct Zone {
    pub name: &'static str,
    /// Key the status sink publishes this zone under.
    pub topic: &'static str,
    /// Optional load-control capability driven by the relay response bits.
    pub relay: Option<RelayControl>,

    // Runtime state (dispatcher-owned).
    /// Number of currently active events in the zone. Never negative.
    pub status: u16,
    pub last_set: i64,
    pub last_clear: i64,
    /// Last state the relay capability reported applying.
    pub relay_state: bool,

    /// Reaction masks indexed by mode, for the set and clear transitions.
    /// Default-populated with [`Responses::NONE`] for every mode, so the
    /// tables are always fully defined before use.
    pub resp_set: [Responses; MODE_COUNT],
    pub resp_clear: [Responses; MODE_COUNT],
}

// ---------------------------------------------------------------------------
// Event slot
// ---------------------------------------------------------------------------

/// One configured (value → meaning) mapping owned by a sensor, tied to a
/// zone. Priority order = slot index, first match wins.
pub struct EventSlot {
    pub kind: EventKind,
    pub zone: Option<ZoneId>,
    /// Value that sets the event ([`VALUE_NONE`] = unused).
    pub value_set: u32,
    pub message_set: &'static str,
    /// Value that clears the event ([`VALUE_NONE`] = unused).
    pub value_clear: u32,
    pub message_clear: &'static str,
    /// Minimum qualified repeat count before the match fires.
    pub threshold: u16,
    /// Auto-clear delay after a set (0 = no auto-clear).
    pub clear_timeout_ms: u32,
    /// Event-publication throttle in seconds (0 = unthrottled).
    pub publish_interval_s: u16,
    /// Alarm must be confirmed by a second trigger within the window.
    pub confirm: bool,

    // Runtime state (matcher/dispatcher-owned).
    pub state: bool,
    pub last_at: i64,
    pub count: u32,
    /// Earliest wall-clock second the next publication may go out.
    pub publish_next: i64,
    /// Pending auto-clear timer, canceled on clear/teardown.
    pub clear_timer: Option<TimerHandle>,
}

impl Default for EventSlot {
    fn default() -> Self {
        Self {
            kind: EventKind::Empty,
            zone: None,
            value_set: VALUE_NONE,
            message_set: "",
            value_clear: VALUE_NONE,
            message_clear: "",
            threshold: 0,
            clear_timeout_ms: 0,
            publish_interval_s: 0,
            confirm: false,
            state: false,
            last_at: 0,
            count: 0,
            publish_next: 0,
            clear_timer: None,
        }
    }
}

/// Configuration parameters for one event slot.
#[derive(Debug, Clone, Copy)]
pub struct EventSpec {
    pub kind: EventKind,
    pub value_set: u32,
    pub message_set: &'static str,
    pub value_clear: u32,
    pub message_clear: &'static str,
    pub threshold: u16,
    pub clear_timeout_ms: u32,
    pub publish_interval_s: u16,
    pub confirm: bool,
}

// ---------------------------------------------------------------------------
// Sensor
// ---------------------------------------------------------------------------

/// A physical or virtual input source with up to
/// [`MAX_EVENTS_PER_SENSOR`] configured events.
pub struct Sensor {
    pub kind: SensorKind,
    pub name: &'static str,
    pub topic: &'static str,
    /// RF address, GPIO number, or virtual id depending on `kind`.
    pub address: u32,
    pub events: [EventSlot; MAX_EVENTS_PER_SENSOR],
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Exclusive owner of all zones and sensors.
pub struct Registry {
    zones: Vec<Zone>,
    sensors: Vec<Sensor>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            zones: Vec::new(),
            sensors: Vec::new(),
        }
    }

    // ── Configuration phase ───────────────────────────────────

    pub fn add_zone(
        &mut self,
        name: &'static str,
        topic: &'static str,
        relay: Option<RelayControl>,
    ) -> Result<ZoneId, RegistryError> {
        if self.zones.len() >= MAX_ZONES {
            return Err(RegistryError::ZoneLimit);
        }
        let id = ZoneId(self.zones.len() as u16);
        self.zones.push(Zone {
            name,
            topic,
            relay,
            status: 0,
            last_set: 0,
            last_clear: 0,
            relay_state: false,
            resp_set: [Responses::NONE; MODE_COUNT],
            resp_clear: [Responses::NONE; MODE_COUNT],
        });
        Ok(id)
    }

    pub fn set_responses(
        &mut self,
        zone: ZoneId,
        mode: AlarmMode,
        on_set: Responses,
        on_clear: Responses,
    ) -> Result<(), RegistryError> {
        let z = self
            .zones
            .get_mut(zone.0 as usize)
            .ok_or(RegistryError::UnknownZone)?;
        z.resp_set[mode as usize] = on_set;
        z.resp_clear[mode as usize] = on_clear;
        Ok(())
    }

    pub fn add_sensor(
        &mut self,
        kind: SensorKind,
        name: &'static str,
        topic: &'static str,
        address: u32,
    ) -> Result<SensorId, RegistryError> {
        if self.sensors.len() >= MAX_SENSORS {
            return Err(RegistryError::SensorLimit);
        }
        let id = SensorId(self.sensors.len() as u16);
        self.sensors.push(Sensor {
            kind,
            name,
            topic,
            address,
            events: core::array::from_fn(|_| EventSlot::default()),
        });
        Ok(id)
    }

    pub fn set_event(
        &mut self,
        sensor: SensorId,
        zone: ZoneId,
        slot: usize,
        spec: EventSpec,
    ) -> Result<(), RegistryError> {
        if zone.0 as usize >= self.zones.len() {
            return Err(RegistryError::UnknownZone);
        }
        if slot >= MAX_EVENTS_PER_SENSOR {
            return Err(RegistryError::SlotIndex);
        }
        let s = self
            .sensors
            .get_mut(sensor.0 as usize)
            .ok_or(RegistryError::UnknownSensor)?;
        s.events[slot] = EventSlot {
            kind: spec.kind,
            zone: Some(zone),
            value_set: spec.value_set,
            message_set: spec.message_set,
            value_clear: spec.value_clear,
            message_clear: spec.message_clear,
            threshold: spec.threshold,
            clear_timeout_ms: spec.clear_timeout_ms,
            publish_interval_s: spec.publish_interval_s,
            confirm: spec.confirm,
            ..EventSlot::default()
        };
        Ok(())
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn zone(&self, id: ZoneId) -> Option<&Zone> {
        self.zones.get(id.0 as usize)
    }

    pub fn zone_mut(&mut self, id: ZoneId) -> Option<&mut Zone> {
        self.zones.get_mut(id.0 as usize)
    }

    pub fn sensor(&self, id: SensorId) -> Option<&Sensor> {
        self.sensors.get(id.0 as usize)
    }

    pub fn sensor_mut(&mut self, id: SensorId) -> Option<&mut Sensor> {
        self.sensors.get_mut(id.0 as usize)
    }

    pub fn zones(&self) -> impl Iterator<Item = (ZoneId, &Zone)> {
        self.zones
            .iter()
            .enumerate()
            .map(|(i, z)| (ZoneId(i as u16), z))
    }

    pub fn sensors(&self) -> impl Iterator<Item = (SensorId, &Sensor)> {
        self.sensors
            .iter()
            .enumerate()
            .map(|(i, s)| (SensorId(i as u16), s))
    }

    pub fn zone_count(&self) -> usize {
        self.zones.len()
    }

    pub fn sensor_count(&self) -> usize {
        self.sensors.len()
    }

    // ── Worker-phase bulk operations ──────────────────────────

    /// Zero every event trigger count. Runs when an armed mode is entered.
    pub fn reset_event_counts(&mut self) {
        for s in &mut self.sensors {
            for e in &mut s.events {
                e.count = 0;
            }
        }
    }

    /// Detach and return every pending auto-clear timer handle, for
    /// cancellation before teardown.
    pub fn take_clear_timers(&mut self) -> Vec<TimerHandle> {
        let mut handles = Vec::new();
        for s in &mut self.sensors {
            for e in &mut s.events {
                if let Some(h) = e.clear_timer.take() {
                    handles.push(h);
                }
            }
        }
        handles
    }
}

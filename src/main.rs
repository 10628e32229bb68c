//! HomeGuard Firmware — Main Entry Point
//!
//! Wires the adapters to the alarm core and runs the panel:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  PinIndicator×5   LogNotificationSink   NvsModeStore           │
//! │  (IndicatorOut)   LogStatusSink         SystemClock            │
//! │  ThreadTimerService                     GpioLevelReader        │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │           AlarmEngine (pure logic, worker-owned)       │    │
//! │  │  Debounce · Match · Mode · Dispatch · Annunciators     │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! GPIO interrupts follow the ISR-sets-atomic / main-loop-polls pattern:
//! the ISR only records an edge, the loop posts the record into the
//! worker queue from thread context.

#![deny(unused_must_use)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use log::{info, warn};

use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::{InterruptType, PinDriver, Pull};
use esp_idf_hal::peripherals::Peripherals;

use homeguard::adapters::indicator::PinIndicator;
use homeguard::adapters::notify::{LogNotificationSink, LogStatusSink};
use homeguard::adapters::nvs::NvsModeStore;
use homeguard::adapters::time::SystemClock;
use homeguard::adapters::timer::ThreadTimerService;
use homeguard::config::AlarmConfig;
use homeguard::mode::{AlarmMode, ControlSource};
use homeguard::ports::{AlarmIndicators, AlarmPorts, LevelReader};
use homeguard::registry::{EventKind, EventSpec, SensorKind};
use homeguard::respond::{RESP_ALARM_SIREN, RESP_CONTROL, RESP_NOTIFY_ONLY, RESP_NONE};
use homeguard::signal::{SignalSource, VALUE_NONE};
use homeguard::worker::AlarmService;

// ── Pin map ───────────────────────────────────────────────────

const DOOR_CONTACT_GPIO: u32 = 5;

// ── GPIO level reconciliation ─────────────────────────────────

struct GpioLevelReader;

impl LevelReader for GpioLevelReader {
    fn read_level(&mut self, gpio: u32) -> Option<u32> {
        // SAFETY: gpio_get_level is safe for any configured input pin and
        // callable from any task context.
        Some(unsafe { esp_idf_svc::sys::gpio_get_level(gpio as i32) } as u32)
    }
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("HomeGuard v{}", env!("CARGO_PKG_VERSION"));

    let peripherals = Peripherals::take()?;
    let pins = peripherals.pins;

    // ── Annunciator outputs ───────────────────────────────────
    let indicators = AlarmIndicators {
        siren: Box::new(PinIndicator::new(PinDriver::output(pins.gpio17)?, FreeRtos)),
        flasher: Box::new(PinIndicator::new(PinDriver::output(pins.gpio18)?, FreeRtos)),
        buzzer: Box::new(PinIndicator::new(PinDriver::output(pins.gpio19)?, FreeRtos)),
        mode_led: Box::new(PinIndicator::new(PinDriver::output(pins.gpio21)?, FreeRtos)),
        rf_led: Box::new(PinIndicator::new(PinDriver::output(pins.gpio22)?, FreeRtos)),
    };

    // ── Persistence ───────────────────────────────────────────
    let store: Box<dyn homeguard::ports::ModeStore + Send> = match NvsModeStore::new() {
        Ok(s) => Box::new(s),
        Err(e) => {
            warn!("NVS unavailable ({e}), mode will not survive reboots");
            struct NoStore;
            impl homeguard::ports::ModeStore for NoStore {
                fn store(
                    &mut self,
                    _mode: AlarmMode,
                ) -> Result<(), homeguard::StoreError> {
                    Ok(())
                }
                fn load(&self) -> Option<AlarmMode> {
                    None
                }
            }
            Box::new(NoStore)
        }
    };

    let ports = AlarmPorts {
        indicators,
        timers: Box::new(ThreadTimerService::new()),
        clock: Box::new(SystemClock::new()),
        notifier: Box::new(LogNotificationSink::new()),
        status: Box::new(LogStatusSink::new()),
        store,
        levels: Some(Box::new(GpioLevelReader)),
        sources: None,
        on_mode_change: Some(Box::new(|mode, source| {
            info!("HOST | mode changed to {:?} by {:?}", mode, source);
        })),
    };

    // ── Alarm core + site configuration ───────────────────────
    let mut alarm = AlarmService::new(AlarmConfig::default(), ports)?;

    let hallway = alarm.add_zone("Hallway", "hall", None)?;
    alarm.set_zone_responses(hallway, AlarmMode::Disabled, RESP_NOTIFY_ONLY, RESP_NONE)?;
    alarm.set_zone_responses(hallway, AlarmMode::Armed, RESP_ALARM_SIREN, RESP_NONE)?;
    alarm.set_zone_responses(hallway, AlarmMode::Perimeter, RESP_ALARM_SIREN, RESP_NONE)?;
    alarm.set_zone_responses(hallway, AlarmMode::Outbuildings, RESP_NOTIFY_ONLY, RESP_NONE)?;

    let remotes = alarm.add_zone("Remotes", "remote", None)?;
    for mode in [
        AlarmMode::Disabled,
        AlarmMode::Armed,
        AlarmMode::Perimeter,
        AlarmMode::Outbuildings,
    ] {
        alarm.set_zone_responses(remotes, mode, RESP_CONTROL, RESP_NONE)?;
    }

    let door = alarm.add_sensor(SensorKind::Wired, "Front door", "door", DOOR_CONTACT_GPIO)?;
    alarm.set_sensor_event(
        door,
        hallway,
        0,
        EventSpec {
            kind: EventKind::Alarm,
            value_set: 1,
            message_set: "door opened",
            value_clear: 0,
            message_clear: "door closed",
            threshold: 1,
            clear_timeout_ms: 0,
            publish_interval_s: 0,
            confirm: false,
        },
    )?;

    let keyfob = alarm.add_sensor(SensorKind::RfAddressed, "Gate keyfob", "fob", 0xABCDE)?;
    for (slot, (kind, value)) in [
        (EventKind::CtrlDisable, 0x1u32),
        (EventKind::CtrlArm, 0x2),
        (EventKind::CtrlPerimeter, 0x4),
        (EventKind::CtrlOutbuildings, 0x8),
    ]
    .into_iter()
    .enumerate()
    {
        alarm.set_sensor_event(
            keyfob,
            remotes,
            slot,
            EventSpec {
                kind,
                value_set: value,
                message_set: "",
                value_clear: VALUE_NONE,
                message_clear: "",
                threshold: 2,
                clear_timeout_ms: 0,
                publish_interval_s: 0,
                confirm: false,
            },
        )?;
    }

    // ── Door-contact ISR (edge → atomic, loop → queue) ────────
    let door_edge = Arc::new(AtomicBool::new(false));
    let mut door_pin = PinDriver::input(pins.gpio5)?;
    door_pin.set_pull(Pull::Up)?;
    door_pin.set_interrupt_type(InterruptType::AnyEdge)?;
    {
        let door_edge = door_edge.clone();
        // SAFETY: the callback only performs a lock-free atomic store.
        unsafe {
            door_pin.subscribe(move || {
                door_edge.store(true, Ordering::Release);
            })?;
        }
    }
    door_pin.enable_interrupt()?;

    // ── Arm/disarm panel buttons ──────────────────────────────
    let arm_edge = Arc::new(AtomicBool::new(false));
    let mut arm_pin = PinDriver::input(pins.gpio9)?;
    arm_pin.set_pull(Pull::Up)?;
    arm_pin.set_interrupt_type(InterruptType::NegEdge)?;
    {
        let arm_edge = arm_edge.clone();
        // SAFETY: lock-free atomic store only.
        unsafe {
            arm_pin.subscribe(move || {
                arm_edge.store(true, Ordering::Release);
            })?;
        }
    }
    arm_pin.enable_interrupt()?;

    // ── Start the worker ──────────────────────────────────────
    let running = alarm.start()?;
    let handle = running.handle();
    info!("System ready. Entering event loop.");

    loop {
        FreeRtos::delay_ms(50);

        if door_edge.swap(false, Ordering::Acquire) {
            // The worker reconciles the actual level via GpioLevelReader.
            handle.post(SignalSource::Wired, DOOR_CONTACT_GPIO, 1);
            if let Err(e) = door_pin.enable_interrupt() {
                warn!("door interrupt re-enable failed: {e}");
            }
        }

        if arm_edge.swap(false, Ordering::Acquire) {
            // Single panel button toggles between disarmed and armed.
            handle.request_mode(AlarmMode::Armed, ControlSource::Buttons);
            if let Err(e) = arm_pin.enable_interrupt() {
                warn!("arm interrupt re-enable failed: {e}");
            }
        }
    }
}

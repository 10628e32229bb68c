//! Shared mock ports for the integration suites.

// Each suite uses a different subset of the observers.
#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use homeguard::config::BlinkPattern;
use homeguard::mode::AlarmMode;
use homeguard::ports::{
    AlarmIndicators, AlarmPorts, Clock, IndicatorOut, ModeStore, NotificationSink, NotifyKind,
    StatusSink, TimerHandle, TimerService,
};
use homeguard::signal::TimerEvent;
use homeguard::status::{SignalEventRecord, StatusSnapshot};
use homeguard::TimerError;

/// Which annunciator channel a call landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Siren,
    Flasher,
    Buzzer,
    ModeLed,
    RfLed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndicatorCall {
    On(Channel),
    Off(Channel),
    Blink(Channel, BlinkPattern),
}

#[derive(Default)]
pub struct Observed {
    pub indicator_calls: Vec<IndicatorCall>,
    pub notifications: Vec<(NotifyKind, String)>,
    pub statuses: Vec<StatusSnapshot>,
    pub events: Vec<SignalEventRecord>,
    pub stored_modes: Vec<AlarmMode>,
    pub scheduled: Vec<(TimerHandle, TimerEvent, u32)>,
    pub canceled: Vec<TimerHandle>,
}

/// Observer over every mock port. Clone freely; all clones share state.
#[derive(Clone, Default)]
pub struct Observer(pub Arc<Mutex<Observed>>);

impl Observer {
    pub fn channel_on(&self, ch: Channel) -> bool {
        // Last on/off transition for the channel wins.
        let obs = self.0.lock().unwrap();
        let mut on = false;
        for call in &obs.indicator_calls {
            match call {
                IndicatorCall::On(c) if *c == ch => on = true,
                IndicatorCall::Off(c) if *c == ch => on = false,
                _ => {}
            }
        }
        on
    }

    pub fn blinks_on(&self, ch: Channel) -> usize {
        self.0
            .lock()
            .unwrap()
            .indicator_calls
            .iter()
            .filter(|c| matches!(c, IndicatorCall::Blink(got, _) if *got == ch))
            .count()
    }

    pub fn notifications(&self) -> Vec<(NotifyKind, String)> {
        self.0.lock().unwrap().notifications.clone()
    }

    pub fn event_publications(&self) -> usize {
        self.0.lock().unwrap().events.len()
    }

    pub fn status_publications(&self) -> usize {
        self.0.lock().unwrap().statuses.len()
    }

    pub fn last_status(&self) -> Option<StatusSnapshot> {
        self.0.lock().unwrap().statuses.last().cloned()
    }

    pub fn scheduled(&self) -> Vec<(TimerHandle, TimerEvent, u32)> {
        self.0.lock().unwrap().scheduled.clone()
    }

    pub fn canceled(&self) -> Vec<TimerHandle> {
        self.0.lock().unwrap().canceled.clone()
    }

    pub fn stored_modes(&self) -> Vec<AlarmMode> {
        self.0.lock().unwrap().stored_modes.clone()
    }
}

struct MockIndicator {
    obs: Observer,
    channel: Channel,
}

impl IndicatorOut for MockIndicator {
    fn turn_on(&mut self) {
        self.obs
            .0
            .lock()
            .unwrap()
            .indicator_calls
            .push(IndicatorCall::On(self.channel));
    }
    fn turn_off(&mut self) {
        self.obs
            .0
            .lock()
            .unwrap()
            .indicator_calls
            .push(IndicatorCall::Off(self.channel));
    }
    fn blink(&mut self, pattern: BlinkPattern) {
        self.obs
            .0
            .lock()
            .unwrap()
            .indicator_calls
            .push(IndicatorCall::Blink(self.channel, pattern));
    }
}

struct MockTimers {
    obs: Observer,
    next: u32,
}

impl TimerService for MockTimers {
    fn schedule(&mut self, event: TimerEvent, after_ms: u32) -> Result<TimerHandle, TimerError> {
        self.next += 1;
        let handle = TimerHandle(self.next);
        self.obs
            .0
            .lock()
            .unwrap()
            .scheduled
            .push((handle, event, after_ms));
        Ok(handle)
    }
    fn cancel(&mut self, handle: TimerHandle) {
        self.obs.0.lock().unwrap().canceled.push(handle);
    }
}

/// Manually advanced clock shared with the engine under test.
#[derive(Clone, Default)]
pub struct TestClock {
    ms: Arc<AtomicU64>,
    pub hour: Arc<AtomicU64>,
}

impl TestClock {
    pub fn advance_ms(&self, ms: u64) {
        self.ms.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for TestClock {
    fn monotonic_ms(&self) -> u64 {
        self.ms.load(Ordering::SeqCst)
    }
    fn epoch_secs(&self) -> i64 {
        1_700_000_000 + (self.ms.load(Ordering::SeqCst) / 1_000) as i64
    }
    fn hour_of_day(&self) -> Option<u8> {
        let h = self.hour.load(Ordering::SeqCst);
        if h < 24 { Some(h as u8) } else { None }
    }
}

struct MockNotifier(Observer);

impl NotificationSink for MockNotifier {
    fn send(&mut self, kind: NotifyKind, message: &str) {
        self.0
             .0
            .lock()
            .unwrap()
            .notifications
            .push((kind, message.to_string()));
    }
}

struct MockStatus(Observer);

impl StatusSink for MockStatus {
    fn publish_status(&mut self, snapshot: &StatusSnapshot) {
        self.0 .0.lock().unwrap().statuses.push(snapshot.clone());
    }
    fn publish_event(&mut self, event: &SignalEventRecord) {
        self.0 .0.lock().unwrap().events.push(*event);
    }
}

struct MockStore(Observer);

impl ModeStore for MockStore {
    fn store(&mut self, mode: AlarmMode) -> Result<(), homeguard::StoreError> {
        self.0 .0.lock().unwrap().stored_modes.push(mode);
        Ok(())
    }
    fn load(&self) -> Option<AlarmMode> {
        self.0 .0.lock().unwrap().stored_modes.last().copied()
    }
}

/// Build a mock port bundle plus its observer and shared clock.
pub fn mock_ports() -> (AlarmPorts, Observer, TestClock) {
    let obs = Observer::default();
    let clock = TestClock::default();
    clock.hour.store(99, Ordering::SeqCst); // unsynced by default

    let ind = |channel| {
        Box::new(MockIndicator {
            obs: obs.clone(),
            channel,
        }) as Box<dyn IndicatorOut + Send>
    };

    let ports = AlarmPorts {
        indicators: AlarmIndicators {
            siren: ind(Channel::Siren),
            flasher: ind(Channel::Flasher),
            buzzer: ind(Channel::Buzzer),
            mode_led: ind(Channel::ModeLed),
            rf_led: ind(Channel::RfLed),
        },
        timers: Box::new(MockTimers {
            obs: obs.clone(),
            next: 0,
        }),
        clock: Box::new(clock.clone()),
        notifier: Box::new(MockNotifier(obs.clone())),
        status: Box::new(MockStatus(obs.clone())),
        store: Box::new(MockStore(obs.clone())),
        levels: None,
        sources: None,
        on_mode_change: None,
    };
    (ports, obs, clock)
}

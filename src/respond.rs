//! Response masks — the per-zone, per-mode reaction policy.
//!
//! Each zone carries one [`Responses`] mask per arming mode for the set
//! transition and one for the clear transition. Every bit acts
//! independently and unconditionally, except the annunciator/notification
//! bits which the dispatcher gates behind alarm confirmation.

use core::fmt;
use core::ops::BitOr;
use serde::{Deserialize, Serialize};

/// A single named reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Response {
    /// Increment the global alarm counter (saturating).
    AlarmInc = 1 << 0,
    /// Decrement the global alarm counter (floor 0).
    AlarmDec = 1 << 1,
    /// Publish the event record to the status/event sink.
    PublishEvent = 1 << 2,
    /// Publish the full status snapshot.
    PublishStatus = 1 << 3,
    /// Send a formatted notification.
    Notify = 1 << 4,
    /// Sound the siren.
    Siren = 1 << 5,
    /// Light the flasher beacon.
    Flasher = 1 << 6,
    /// Beep the panel buzzer.
    Buzzer = 1 << 7,
    /// Switch the zone relay on.
    RelayOn = 1 << 8,
    /// Switch the zone relay off.
    RelayOff = 1 << 9,
    /// Toggle the zone relay.
    RelayToggle = 1 << 10,
}

impl Response {
    /// Return the bitmask for this reaction.
    pub const fn mask(self) -> u16 {
        self as u16
    }
}

/// A set of reactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Responses(pub u16);

impl Responses {
    pub const NONE: Responses = Responses(0);

    pub const fn with(self, r: Response) -> Self {
        Self(self.0 | r.mask())
    }

    pub fn contains(self, r: Response) -> bool {
        self.0 & r.mask() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Response {
    type Output = Responses;
    fn bitor(self, rhs: Response) -> Responses {
        Responses(self.mask() | rhs.mask())
    }
}

impl BitOr<Response> for Responses {
    type Output = Responses;
    fn bitor(self, rhs: Response) -> Responses {
        Responses(self.0 | rhs.mask())
    }
}

impl fmt::Display for Responses {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04X}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Standard reaction sets
// ---------------------------------------------------------------------------

/// No reaction (default).
pub const RESP_NONE: Responses = Responses::NONE;
/// Remote-control events: publish only.
pub const RESP_CONTROL: Responses = Responses::NONE
    .with(Response::PublishEvent)
    .with(Response::PublishStatus);
/// Register-only sensors (door counters etc.).
pub const RESP_REGISTER: Responses = RESP_CONTROL;
/// Publish + notification, no local annunciation.
pub const RESP_NOTIFY_ONLY: Responses = RESP_CONTROL.with(Response::Notify);
/// Publish + notification + flasher.
pub const RESP_FLASH_NOTIFY: Responses = RESP_NOTIFY_ONLY.with(Response::Flasher);
/// Alarm without local annunciation beyond the buzzer.
pub const RESP_ALARM_NOTIFY: Responses = RESP_NOTIFY_ONLY
    .with(Response::AlarmInc)
    .with(Response::Buzzer);
/// Silent alarm: everything except the siren.
pub const RESP_ALARM_SILENT: Responses = RESP_ALARM_NOTIFY.with(Response::Flasher);
/// Full alarm: siren, flasher, buzzer, notification, counter.
pub const RESP_ALARM_SIREN: Responses = RESP_ALARM_SILENT.with(Response::Siren);
/// Mains power restored.
pub const RESP_POWER_ON: Responses = RESP_NOTIFY_ONLY.with(Response::Flasher);
/// Mains power lost: counts as an alarm, no siren.
pub const RESP_POWER_OFF: Responses = RESP_ALARM_SILENT;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_are_distinct_bits() {
        let all = [
            Response::AlarmInc,
            Response::AlarmDec,
            Response::PublishEvent,
            Response::PublishStatus,
            Response::Notify,
            Response::Siren,
            Response::Flasher,
            Response::Buzzer,
            Response::RelayOn,
            Response::RelayOff,
            Response::RelayToggle,
        ];
        let mut seen = 0u16;
        for r in all {
            assert_eq!(seen & r.mask(), 0, "overlapping bit: {:?}", r);
            seen |= r.mask();
        }
    }

    #[test]
    fn contains_after_or() {
        let resp = Response::Siren | Response::Flasher;
        assert!(resp.contains(Response::Siren));
        assert!(resp.contains(Response::Flasher));
        assert!(!resp.contains(Response::Buzzer));
    }

    #[test]
    fn standard_sets_compose() {
        assert!(RESP_ALARM_SIREN.contains(Response::AlarmInc));
        assert!(RESP_ALARM_SIREN.contains(Response::Siren));
        assert!(RESP_ALARM_SIREN.contains(Response::Flasher));
        assert!(RESP_ALARM_SILENT.contains(Response::Flasher));
        assert!(!RESP_ALARM_SILENT.contains(Response::Siren));
        assert!(RESP_CONTROL.contains(Response::PublishEvent));
        assert!(!RESP_CONTROL.contains(Response::AlarmInc));
        assert!(RESP_NONE.is_empty());
    }
}

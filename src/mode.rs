//! Arming-mode state machine.
//!
//! The mode value is the single security policy selector: every zone holds
//! one response mask per mode, and the dispatcher indexes those tables with
//! the current mode. [`ModeMachine`] owns the value and the transition
//! rule; the side effects of a transition (persistence, counter resets,
//! annunciator refresh, notification) are orchestrated by the engine.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Mode
// ---------------------------------------------------------------------------

/// Arming mode. Determines the reaction to events per zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AlarmMode {
    /// Security disabled — events are still recorded, reactions are muted
    /// unless the zone's disabled-mode mask says otherwise (24h zones).
    Disabled = 0,
    /// Full arming.
    Armed = 1,
    /// Perimeter-only arming (people inside).
    Perimeter = 2,
    /// Outbuildings arming (garage, sheds).
    Outbuildings = 3,
}

impl AlarmMode {
    /// Total number of modes — used to size the response tables.
    pub const COUNT: usize = 4;

    /// Convert a stored `u8` back to a mode. `None` on out-of-range input
    /// (corrupted persistence), which callers treat as `Disabled`.
    pub fn from_index(idx: u8) -> Option<Self> {
        match idx {
            0 => Some(Self::Disabled),
            1 => Some(Self::Armed),
            2 => Some(Self::Perimeter),
            3 => Some(Self::Outbuildings),
            _ => None,
        }
    }

    /// Any non-disabled mode counts as armed.
    pub fn is_armed(self) -> bool {
        self != Self::Disabled
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Armed => "armed",
            Self::Perimeter => "perimeter",
            Self::Outbuildings => "outbuildings",
        }
    }
}

/// Number of modes, re-exported for table sizing.
pub const MODE_COUNT: usize = AlarmMode::COUNT;

// ---------------------------------------------------------------------------
// Control source
// ---------------------------------------------------------------------------

/// Which control channel requested a mode change.
///
/// Local physical controls (panel buttons, RF remote) get audible feedback
/// on a transition; remote channels must not re-trigger it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSource {
    /// Replay of the persisted mode at boot/reconnect.
    Stored,
    /// Panel buttons.
    Buttons,
    /// RF remote control fob.
    RemoteControl,
    /// Bus / messaging channel command.
    Bus,
    /// Scripted command.
    Command,
}

impl ControlSource {
    /// True for physical controls at the panel — these get the siren chirp
    /// and buzzer feedback on mode changes.
    pub fn is_local(self) -> bool {
        matches!(self, Self::Buttons | Self::RemoteControl)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Stored => "stored",
            Self::Buttons => "buttons",
            Self::RemoteControl => "remote control",
            Self::Bus => "bus",
            Self::Command => "command",
        }
    }
}

// ---------------------------------------------------------------------------
// ModeMachine
// ---------------------------------------------------------------------------

/// Owns the current arming mode and applies the transition rule.
pub struct ModeMachine {
    current: AlarmMode,
}

impl ModeMachine {
    pub fn new() -> Self {
        Self {
            current: AlarmMode::Disabled,
        }
    }

    pub fn current(&self) -> AlarmMode {
        self.current
    }

    /// Apply a mode request.
    ///
    /// Returns `None` when the request is a no-op (`!forced` and the mode
    /// is unchanged) — the caller must not run any transition side effects.
    /// Returns `Some(changed)` when the request applies; `changed` is false
    /// for a forced re-apply of the current mode (boot replay), in which
    /// case indication is refreshed but counters are left alone.
    pub fn request(&mut self, new: AlarmMode, forced: bool) -> Option<bool> {
        if !forced && new == self.current {
            return None;
        }
        let changed = new != self.current;
        self.current = new;
        Some(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_disabled() {
        let m = ModeMachine::new();
        assert_eq!(m.current(), AlarmMode::Disabled);
    }

    #[test]
    fn unforced_same_mode_is_noop() {
        let mut m = ModeMachine::new();
        assert_eq!(m.request(AlarmMode::Disabled, false), None);
    }

    #[test]
    fn unforced_new_mode_applies() {
        let mut m = ModeMachine::new();
        assert_eq!(m.request(AlarmMode::Armed, false), Some(true));
        assert_eq!(m.current(), AlarmMode::Armed);
    }

    #[test]
    fn forced_same_mode_applies_without_change() {
        let mut m = ModeMachine::new();
        m.request(AlarmMode::Perimeter, false);
        assert_eq!(m.request(AlarmMode::Perimeter, true), Some(false));
        assert_eq!(m.current(), AlarmMode::Perimeter);
    }

    #[test]
    fn from_index_roundtrip() {
        for idx in 0..AlarmMode::COUNT as u8 {
            let mode = AlarmMode::from_index(idx).unwrap();
            assert_eq!(mode as u8, idx);
        }
        assert_eq!(AlarmMode::from_index(4), None);
    }

    #[test]
    fn armed_classification() {
        assert!(!AlarmMode::Disabled.is_armed());
        assert!(AlarmMode::Armed.is_armed());
        assert!(AlarmMode::Perimeter.is_armed());
        assert!(AlarmMode::Outbuildings.is_armed());
    }
}

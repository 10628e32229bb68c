//! Log-backed notification and status sinks.
//!
//! Writes structured output to the ESP-IDF logger (UART / USB-CDC in
//! production). A messenger-gateway or MQTT adapter would implement the
//! same traits; the engine never knows the difference.

use log::{info, warn};

use crate::ports::{NotificationSink, NotifyKind, StatusSink};
use crate::status::{SignalEventRecord, StatusSnapshot};

/// Adapter that logs every outbound alert to the serial console.
pub struct LogNotificationSink;

impl LogNotificationSink {
    pub fn new() -> Self {
        Self
    }
}

impl NotificationSink for LogNotificationSink {
    fn send(&mut self, kind: NotifyKind, message: &str) {
        match kind {
            NotifyKind::Alarm => warn!("NOTIFY(alarm) | {message}"),
            NotifyKind::Warning => warn!("NOTIFY(warn)  | {message}"),
            NotifyKind::Info => info!("NOTIFY(info)  | {message}"),
        }
    }
}

/// Adapter that logs snapshots and event records as JSON lines.
pub struct LogStatusSink;

impl LogStatusSink {
    pub fn new() -> Self {
        Self
    }
}

impl StatusSink for LogStatusSink {
    fn publish_status(&mut self, snapshot: &StatusSnapshot) {
        match serde_json::to_string(snapshot) {
            Ok(json) => info!("STATUS | {json}"),
            Err(e) => warn!("STATUS | serialization failed: {e}"),
        }
    }

    fn publish_event(&mut self, event: &SignalEventRecord) {
        match serde_json::to_string(event) {
            Ok(json) => info!("EVENT  | {json}"),
            Err(e) => warn!("EVENT  | serialization failed: {e}"),
        }
    }
}

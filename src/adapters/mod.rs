//! Adapters — concrete implementations of the port traits.
//!
//! | Adapter     | Implements         | Connects to                  |
//! |-------------|--------------------|------------------------------|
//! | `indicator` | IndicatorOut       | embedded-hal OutputPin + delay |
//! | `notify`    | NotificationSink   | Serial log output            |
//! |             | StatusSink         | Serial log (JSON)            |
//! | `nvs`       | ModeStore          | NVS / in-memory store        |
//! | `time`      | Clock              | ESP32 system timer           |
//! | `timer`     | TimerService       | Worker-queue one-shot threads|

pub mod indicator;
pub mod notify;
pub mod nvs;
pub mod time;
pub mod timer;

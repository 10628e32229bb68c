//! One-shot timer service over the worker queue.
//!
//! Every schedule spawns a sleeper thread that, on expiry, posts
//! [`Message::Timer`] back into the bound worker queue — the callback
//! never touches engine state from its own context. Cancellation removes
//! the id from the live set; a sleeper that wakes to find its id gone
//! posts nothing.
//!
//! A raced cancel (timer fires while cancel is in flight) can still
//! deliver the message; the engine re-checks the owning state on every
//! timer event, so a stale fire is a no-op.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use log::warn;

use crate::error::TimerError;
use crate::ports::{TimerHandle, TimerService};
use crate::signal::{Message, TimerEvent};
use crate::worker::SignalHandle;

pub struct ThreadTimerService {
    queue: Option<SignalHandle>,
    next_id: u32,
    live: Arc<Mutex<HashSet<u32>>>,
}

impl ThreadTimerService {
    pub fn new() -> Self {
        Self {
            queue: None,
            next_id: 0,
            live: Arc::new(Mutex::new(HashSet::new())),
        }
    }
}

impl TimerService for ThreadTimerService {
    fn bind(&mut self, queue: SignalHandle) {
        self.queue = Some(queue);
    }

    fn schedule(&mut self, event: TimerEvent, after_ms: u32) -> Result<TimerHandle, TimerError> {
        let Some(queue) = self.queue.clone() else {
            warn!("TIMER | schedule before bind");
            return Err(TimerError::CreateFailed);
        };

        self.next_id = self.next_id.wrapping_add(1);
        let id = self.next_id;
        self.live.lock().unwrap().insert(id);

        let live = self.live.clone();
        thread::Builder::new()
            .name("alarm-timer".into())
            .spawn(move || {
                thread::sleep(Duration::from_millis(u64::from(after_ms)));
                let was_live = live.lock().unwrap().remove(&id);
                if was_live {
                    queue.post_message(Message::Timer(event));
                }
            })
            .map_err(|_| TimerError::StartFailed)?;

        Ok(TimerHandle(id))
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.live.lock().unwrap().remove(&handle.0);
    }
}

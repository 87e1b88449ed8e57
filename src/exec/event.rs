// src/exec/event.rs

//! Per-operator synchronisation object.
//!
//! Each operator owns one [`Event`]; a chain is represented externally by the
//! event of its last operator. Within one run the status only moves forward:
//!
//! ```text
//! Initialized -> Scheduled -> Success | Failed
//! ```
//!
//! `Success` and `Failed` are terminal until the next [`Event::reset`].

use std::sync::{Arc, Condvar, Mutex, MutexGuard};

use crate::types::{DeviceOption, DeviceType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventStatus {
    /// No work has been issued for this run.
    Initialized,
    /// Work was issued and may still be in flight on the device.
    Scheduled,
    Success,
    Failed,
}

impl EventStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, EventStatus::Success | EventStatus::Failed)
    }
}

#[derive(Debug)]
struct EventState {
    status: EventStatus,
    error: Option<String>,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<EventState>,
    finished: Condvar,
}

/// Completion handle of one operator.
///
/// Clones share the same status. Asynchronous operators keep a clone to
/// complete the event from the device side.
#[derive(Debug, Clone)]
pub struct Event {
    device: DeviceOption,
    shared: Arc<Shared>,
}

impl Event {
    pub fn new(device: DeviceOption) -> Self {
        Self {
            device,
            shared: Arc::new(Shared {
                state: Mutex::new(EventState {
                    status: EventStatus::Initialized,
                    error: None,
                }),
                finished: Condvar::new(),
            }),
        }
    }

    pub fn device(&self) -> DeviceOption {
        self.device
    }

    pub fn device_type(&self) -> DeviceType {
        self.device.device_type
    }

    pub fn query(&self) -> EventStatus {
        self.lock().status
    }

    pub fn error_message(&self) -> Option<String> {
        self.lock().error.clone()
    }

    /// Mark work as issued. Only moves an `Initialized` event forward.
    pub fn set_scheduled(&self) {
        let mut state = self.lock();
        if state.status == EventStatus::Initialized {
            state.status = EventStatus::Scheduled;
        }
    }

    /// Move the event to a terminal state.
    ///
    /// `None` means success, `Some(msg)` means failure with `msg` attached.
    /// The first terminal transition wins; later calls are ignored and
    /// return `false`.
    pub fn set_finished(&self, error: Option<&str>) -> bool {
        let mut state = self.lock();
        if state.status.is_terminal() {
            return false;
        }
        match error {
            Some(msg) => {
                state.status = EventStatus::Failed;
                state.error = Some(msg.to_string());
            }
            None => state.status = EventStatus::Success,
        }
        drop(state);
        self.shared.finished.notify_all();
        true
    }

    /// Block until work issued for this event has drained.
    ///
    /// Returns immediately for `Initialized` and terminal events.
    pub fn finish(&self) -> EventStatus {
        let mut state = self.lock();
        while state.status == EventStatus::Scheduled {
            state = match self.shared.finished.wait(state) {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
        state.status
    }

    pub fn reset(&self) {
        let mut state = self.lock();
        state.status = EventStatus::Initialized;
        state.error = None;
    }

    fn lock(&self) -> MutexGuard<'_, EventState> {
        // A panicking operator must not take the event down with it.
        self.shared.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn first_terminal_transition_wins() {
        let ev = Event::new(DeviceOption::cpu());
        ev.set_scheduled();
        assert_eq!(ev.query(), EventStatus::Scheduled);

        assert!(ev.set_finished(Some("boom")));
        assert!(!ev.set_finished(None));
        assert!(!ev.set_finished(Some("second")));

        assert_eq!(ev.query(), EventStatus::Failed);
        assert_eq!(ev.error_message().as_deref(), Some("boom"));
    }

    #[test]
    fn set_scheduled_does_not_undo_terminal_state() {
        let ev = Event::new(DeviceOption::cpu());
        ev.set_finished(None);
        ev.set_scheduled();
        assert_eq!(ev.query(), EventStatus::Success);
    }

    #[test]
    fn reset_clears_status_and_message() {
        let ev = Event::new(DeviceOption::cpu());
        ev.set_finished(Some("x"));
        ev.reset();
        assert_eq!(ev.query(), EventStatus::Initialized);
        assert!(ev.error_message().is_none());
    }

    #[test]
    fn finish_blocks_until_device_completes() {
        let ev = Event::new(DeviceOption::cuda(0));
        ev.set_scheduled();

        let device = ev.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            device.set_finished(None);
        });

        assert_eq!(ev.finish(), EventStatus::Success);
        handle.join().unwrap();
    }

    #[test]
    fn finish_on_initialized_event_returns_immediately() {
        let ev = Event::new(DeviceOption::cpu());
        assert_eq!(ev.finish(), EventStatus::Initialized);
    }
}

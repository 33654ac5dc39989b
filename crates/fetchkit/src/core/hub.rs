//! Synchronous fan-out of progress events.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::data::{EventName, ProgressCallback, ProgressEvent};

/// Identifies one registration on an [`EventHub`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

#[derive(Default)]
struct Registry {
    download: Vec<(HandlerId, ProgressCallback)>,
    upload: Vec<(HandlerId, ProgressCallback)>,
}

impl Registry {
    fn channel(&mut self, name: EventName) -> &mut Vec<(HandlerId, ProgressCallback)> {
        match name {
            EventName::Download => &mut self.download,
            EventName::Upload => &mut self.upload,
        }
    }
}

/// Handler registry for the `download` and `upload` channels.
///
/// No buffering and no replay: a handler only sees events emitted after it
/// was registered.
#[derive(Default)]
pub struct EventHub {
    registry: Mutex<Registry>,
    next_id: AtomicU64,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler`; delivery follows registration order.
    pub fn on(&self, name: EventName, handler: ProgressCallback) -> HandlerId {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .channel(name)
            .push((id, handler));
        id
    }

    /// Remove the registration `id`. Returns `false` if it was not present.
    pub fn off(&self, name: EventName, id: HandlerId) -> bool {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        let channel = registry.channel(name);
        match channel.iter().position(|(h, _)| *h == id) {
            Some(index) => {
                channel.remove(index);
                true
            }
            None => false,
        }
    }

    /// Deliver `event` to every handler currently registered on `name`.
    ///
    /// A panicking handler is logged and skipped; the rest still run.
    pub fn emit(&self, name: EventName, event: &ProgressEvent) {
        // Snapshot so handlers can (un)subscribe without deadlocking.
        let handlers: Vec<ProgressCallback> = self
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .channel(name)
            .iter()
            .map(|(_, h)| h.clone())
            .collect();

        for handler in handlers {
            if panic::catch_unwind(AssertUnwindSafe(|| handler(event))).is_err() {
                tracing::warn!(event = %name, "progress handler panicked");
            }
        }
    }

    pub fn handler_count(&self, name: EventName) -> usize {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .channel(name)
            .len()
    }
}

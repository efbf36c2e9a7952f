use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread;

use bson::Bson;

/// Subscribable channels (§6 Events).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Insert,
    Update,
    Delete,
    PreInsert,
    PreUpdate,
    Error,
    Close,
    FlushBuffer,
    Warning,
}

/// Event payload handed to listeners. `Bson::Array` for batch operations,
/// a bare value otherwise; `Error` carries the error's `Display` text.
#[derive(Debug, Clone)]
pub struct Event {
    pub channel: Channel,
    pub payload: Bson,
}

type Listener = Box<dyn FnMut(&Event) + Send>;

/// `channel -> list of callbacks`, with synchronous and deferred dispatch.
///
/// Async dispatch posts the callback invocation onto a detached
/// fire-and-forget thread rather than calling it inline — the same
/// background-thread shape as the TTL sweep (`ttl::TtlHandle`), just spawned
/// per emission instead of on a timer.
pub struct EventBus {
    listeners: HashMap<Channel, Vec<Listener>>,
    async_listeners: bool,
}

impl EventBus {
    pub fn new(async_listeners: bool) -> Self {
        Self {
            listeners: HashMap::new(),
            async_listeners,
        }
    }

    pub fn on(&mut self, channel: Channel, listener: Listener) {
        self.listeners.entry(channel).or_default().push(listener);
    }

    pub fn remove_listeners(&mut self, channel: Channel) {
        self.listeners.remove(&channel);
    }

    /// Dispatch `payload` on `channel`. Synchronous listeners run inline, in
    /// registration order, on this thread; async listeners are invoked on a
    /// detached worker and never observed by the caller.
    pub fn emit(&mut self, channel: Channel, payload: Bson) {
        let Some(listeners) = self.listeners.get_mut(&channel) else {
            return;
        };
        let event = Event { channel, payload };
        if self.async_listeners {
            // Listeners aren't `'static` (they may close over collection state
            // reachable only within this call), so deferred dispatch clones the
            // event and runs under a lock shared with the spawned thread rather
            // than moving the closures themselves off-thread.
            let event = Arc::new(event);
            for listener in listeners.iter_mut() {
                let event = Arc::clone(&event);
                let listener = Arc::new(Mutex::new(std::mem::replace(listener, Box::new(|_| {}))));
                let listener_for_thread = Arc::clone(&listener);
                thread::spawn(move || {
                    let mut l = listener_for_thread.lock().unwrap();
                    l(&event);
                });
            }
        } else {
            for listener in listeners.iter_mut() {
                listener(&event);
            }
        }
    }
}

//! Multi-subscriber event with removable handlers.

use crate::data_plane::update_delivery::invoke_isolated;
use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Identifies one attached handler so it can be detached later.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerKey(u64);

pub type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Handlers invoked in attachment order whenever the event is raised.
pub struct EventHandlers<T> {
    next_key: AtomicU64,
    handlers: Mutex<Vec<(HandlerKey, Handler<T>)>>,
}

impl<T> EventHandlers<T> {
    pub fn new() -> Self {
        Self {
            next_key: AtomicU64::new(1),
            handlers: Mutex::new(Vec::new()),
        }
    }

    pub fn add<F>(&self, handler: F) -> HandlerKey
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.add_shared(Arc::new(handler))
    }

    pub fn add_shared(&self, handler: Handler<T>) -> HandlerKey {
        let key = HandlerKey(self.next_key.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((key, handler));
        key
    }

    pub fn remove(&self, key: HandlerKey) -> bool {
        let mut handlers = self.handlers.lock().unwrap_or_else(PoisonError::into_inner);
        let before = handlers.len();
        handlers.retain(|(existing, _)| *existing != key);
        handlers.len() != before
    }

    pub fn len(&self) -> usize {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invokes every handler attached at the time of the call.
    ///
    /// A panicking handler does not prevent the others from running; the keys
    /// and panic messages of failed handlers are returned to the caller.
    pub fn raise(&self, value: &T) -> Vec<(HandlerKey, String)> {
        let snapshot: Vec<(HandlerKey, Handler<T>)> = self
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        snapshot
            .into_iter()
            .filter_map(|(key, handler)| {
                invoke_isolated(|| handler(value))
                    .err()
                    .map(|message| (key, message))
            })
            .collect()
    }
}

impl<T> Default for EventHandlers<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Debug for EventHandlers<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHandlers")
            .field("handlers", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::EventHandlers;
    use std::sync::{Arc, Mutex};

    #[test]
    fn raise_runs_handlers_in_attachment_order() {
        let event = EventHandlers::<u32>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second"] {
            let seen = seen.clone();
            event.add(move |value| seen.lock().unwrap().push(format!("{tag}:{value}")));
        }

        assert!(event.raise(&3).is_empty());
        assert_eq!(*seen.lock().unwrap(), vec!["first:3", "second:3"]);
    }

    #[test]
    fn removed_handler_is_not_invoked() {
        let event = EventHandlers::<u32>::new();
        let calls = Arc::new(Mutex::new(0));
        let counter = calls.clone();
        let key = event.add(move |_| *counter.lock().unwrap() += 1);

        assert!(event.remove(key));
        assert!(!event.remove(key));
        event.raise(&1);

        assert_eq!(*calls.lock().unwrap(), 0);
        assert!(event.is_empty());
    }

    #[test]
    fn panicking_handler_is_reported_and_others_still_run() {
        let event = EventHandlers::<u32>::new();
        let calls = Arc::new(Mutex::new(0));
        let bad = event.add(|_| panic!("bad handler"));
        let counter = calls.clone();
        event.add(move |_| *counter.lock().unwrap() += 1);

        let failures = event.raise(&1);

        assert_eq!(failures, vec![(bad, "bad handler".to_string())]);
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[test]
    fn handler_may_detach_itself_while_raised() {
        let event = Arc::new(EventHandlers::<u32>::new());
        let key_slot = Arc::new(Mutex::new(None));
        let inner_event = event.clone();
        let inner_slot = key_slot.clone();
        let key = event.add(move |_| {
            if let Some(key) = *inner_slot.lock().unwrap() {
                inner_event.remove(key);
            }
        });
        *key_slot.lock().unwrap() = Some(key);

        event.raise(&1);
        assert!(event.is_empty());
    }
}

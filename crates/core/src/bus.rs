//! Event bus - named-event publish/subscribe for generated frames
//!
//! Handlers run synchronously, in registration order, inside [`EventBus::emit`].
//! There is no queueing: emission takes exactly as long as the handlers do.
//!
//! Every handler invocation is its own failure boundary. A handler that returns
//! an error or panics is logged and counted in the [`EmitReport`]; the handlers
//! after it still receive the payload and `emit` itself never fails.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};

use tracing::warn;

/// Event name frames are published under.
pub const FRAME_EVENT: &str = "frame";

/// Error type handlers may return.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Result type of a handler invocation.
pub type HandlerResult = Result<(), HandlerError>;

type Handler<P> = Box<dyn FnMut(&P) -> HandlerResult>;

/// Token returned by [`EventBus::on`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Outcome of a single [`EventBus::emit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EmitReport {
    /// Handlers that returned `Ok`.
    pub delivered: usize,
    /// Handlers that returned `Err` or panicked.
    pub failed: usize,
}

impl EmitReport {
    pub fn total(&self) -> usize {
        self.delivered + self.failed
    }
}

struct Subscriber<P> {
    id: SubscriptionId,
    handler: Handler<P>,
}

/// Synchronous publish/subscribe channel keyed by event name.
pub struct EventBus<P> {
    next_id: u64,
    subscribers: HashMap<String, Vec<Subscriber<P>>>,
}

impl<P> Default for EventBus<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> std::fmt::Debug for EventBus<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: HashMap<&str, usize> = self
            .subscribers
            .iter()
            .map(|(name, subs)| (name.as_str(), subs.len()))
            .collect();
        f.debug_struct("EventBus")
            .field("next_id", &self.next_id)
            .field("subscribers", &counts)
            .finish()
    }
}

impl<P> EventBus<P> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            subscribers: HashMap::new(),
        }
    }

    /// Register `handler` for every emission of `event`.
    pub fn on<F>(&mut self, event: &str, handler: F) -> SubscriptionId
    where
        F: FnMut(&P) -> HandlerResult + 'static,
    {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.subscribers
            .entry(event.to_string())
            .or_default()
            .push(Subscriber {
                id,
                handler: Box::new(handler),
            });
        id
    }

    /// Remove a subscription. Unknown ids are ignored; returns whether one was removed.
    pub fn off(&mut self, event: &str, id: SubscriptionId) -> bool {
        let Some(subs) = self.subscribers.get_mut(event) else {
            return false;
        };
        let before = subs.len();
        subs.retain(|s| s.id != id);
        let removed = subs.len() != before;
        if subs.is_empty() {
            self.subscribers.remove(event);
        }
        removed
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.subscribers.get(event).map(Vec::len).unwrap_or(0)
    }

    /// Invoke every handler registered for `event` with `payload`.
    pub fn emit(&mut self, event: &str, payload: &P) -> EmitReport {
        let mut report = EmitReport::default();
        let Some(subs) = self.subscribers.get_mut(event) else {
            return report;
        };

        for sub in subs.iter_mut() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| (sub.handler)(payload)));
            match outcome {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(err)) => {
                    warn!(event, subscription = sub.id.0, error = %err, "handler failed");
                    report.failed += 1;
                }
                Err(cause) => {
                    warn!(
                        event,
                        subscription = sub.id.0,
                        panic = panic_message(&*cause),
                        "handler panicked"
                    );
                    report.failed += 1;
                }
            }
        }

        report
    }
}

fn panic_message(cause: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = cause.downcast_ref::<&str>() {
        s
    } else if let Some(s) = cause.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_emit_without_subscribers() {
        let mut bus: EventBus<u32> = EventBus::new();
        assert_eq!(bus.emit(FRAME_EVENT, &1), EmitReport::default());
    }

    #[test]
    fn test_events_are_independent() {
        let mut bus: EventBus<u32> = EventBus::new();
        let hits = Rc::new(RefCell::new(0));
        let h = Rc::clone(&hits);
        bus.on("other", move |_| {
            *h.borrow_mut() += 1;
            Ok(())
        });

        bus.emit(FRAME_EVENT, &1);
        assert_eq!(*hits.borrow(), 0);
        bus.emit("other", &1);
        assert_eq!(*hits.borrow(), 1);
    }

    #[test]
    fn test_off_unknown_is_noop() {
        let mut bus: EventBus<u32> = EventBus::new();
        let id = bus.on(FRAME_EVENT, |_| Ok(()));
        assert!(!bus.off("nope", id));
        assert!(bus.off(FRAME_EVENT, id));
        assert!(!bus.off(FRAME_EVENT, id));
        assert_eq!(bus.listener_count(FRAME_EVENT), 0);
    }

    #[test]
    fn test_error_handler_does_not_block_siblings() {
        let mut bus: EventBus<u32> = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        bus.on(FRAME_EVENT, |_| Err("boom".into()));
        let s = Rc::clone(&seen);
        bus.on(FRAME_EVENT, move |v| {
            s.borrow_mut().push(*v);
            Ok(())
        });

        let report = bus.emit(FRAME_EVENT, &7);
        assert_eq!(report, EmitReport { delivered: 1, failed: 1 });
        assert_eq!(*seen.borrow(), vec![7]);
    }

    #[test]
    fn test_panic_message_extraction() {
        let boxed: Box<dyn std::any::Any + Send> = Box::new("static");
        assert_eq!(panic_message(&*boxed), "static");
        let boxed: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(&*boxed), "owned");
        let boxed: Box<dyn std::any::Any + Send> = Box::new(3u8);
        assert_eq!(panic_message(&*boxed), "non-string panic payload");
    }
}

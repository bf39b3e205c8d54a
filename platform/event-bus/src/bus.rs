use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use crate::envelope::{DomainEvent, EventKind};

type Handler = Arc<dyn Fn(&DomainEvent) + Send + Sync>;

/// Handle returned by [`EventBus::subscribe`]; pass to
/// [`EventBus::unsubscribe`] to detach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriberId(u64);

struct Subscriber {
    id: SubscriberId,
    name: String,
    // Empty = every kind.
    kinds: Vec<EventKind>,
    handler: Handler,
}

impl Subscriber {
    fn wants(&self, kind: EventKind) -> bool {
        self.kinds.is_empty() || self.kinds.contains(&kind)
    }
}

/// Synchronous in-process event bus.
///
/// Subscribers are invoked on the publishing thread in registration order.
/// The subscriber list is copied under a short lock before iteration, so a
/// handler that subscribes or unsubscribes during delivery cannot race the
/// walk — it takes effect from the next publish.
pub struct EventBus {
    subscribers: Mutex<Vec<Subscriber>>,
    next_id: Mutex<u64>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            next_id: Mutex::new(0),
        }
    }

    /// Register a handler for the given kinds; an empty slice subscribes to
    /// every event. `name` identifies the subscriber in logs.
    pub fn subscribe(
        &self,
        name: impl Into<String>,
        kinds: &[EventKind],
        handler: impl Fn(&DomainEvent) + Send + Sync + 'static,
    ) -> SubscriberId {
        let id = {
            let mut next = lock_or_recover(&self.next_id);
            *next += 1;
            SubscriberId(*next)
        };
        let subscriber = Subscriber {
            id,
            name: name.into(),
            kinds: kinds.to_vec(),
            handler: Arc::new(handler),
        };
        lock_or_recover(&self.subscribers).push(subscriber);
        id
    }

    pub fn unsubscribe(&self, id: SubscriberId) {
        lock_or_recover(&self.subscribers).retain(|s| s.id != id);
    }

    /// Deliver the event to every matching subscriber, in registration order.
    ///
    /// A panicking handler is contained and logged; delivery continues with
    /// the next subscriber.
    pub fn publish(&self, event: &DomainEvent) {
        let matching: Vec<(String, Handler)> = {
            let subscribers = lock_or_recover(&self.subscribers);
            subscribers
                .iter()
                .filter(|s| s.wants(event.kind))
                .map(|s| (s.name.clone(), Arc::clone(&s.handler)))
                .collect()
        };

        tracing::debug!(
            event = %event.kind,
            event_id = %event.event_id,
            subscribers = matching.len(),
            "publishing domain event"
        );

        for (name, handler) in matching {
            if catch_unwind(AssertUnwindSafe(|| handler(event))).is_err() {
                tracing::error!(
                    subscriber = %name,
                    event = %event.kind,
                    "subscriber panicked during delivery; continuing"
                );
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        lock_or_recover(&self.subscribers).len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

fn lock_or_recover<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn event(kind: EventKind) -> DomainEvent {
        DomainEvent::new(kind, json!({"entity_id": "x-1"}))
    }

    #[test]
    fn delivers_in_registration_order() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let seen = Arc::clone(&seen);
            bus.subscribe(tag, &[], move |_event| {
                seen.lock().unwrap().push(tag);
            });
        }

        bus.publish(&event(EventKind::RoleCreated));
        assert_eq!(*seen.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn kind_filter_limits_delivery() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        bus.subscribe(
            "journal-only",
            &[EventKind::JournalEntryPosted],
            move |_event| {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        );

        bus.publish(&event(EventKind::RoleCreated));
        bus.publish(&event(EventKind::JournalEntryPosted));
        bus.publish(&event(EventKind::JournalEntryCreated));

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panicking_subscriber_does_not_abort_delivery() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));

        bus.subscribe("faulty", &[], |_event| panic!("handler bug"));
        let counter = Arc::clone(&hits);
        bus.subscribe("healthy", &[], move |_event| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish(&event(EventKind::PermissionUpdated));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_stops_future_deliveries() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        let id = bus.subscribe("transient", &[], move |_event| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish(&event(EventKind::RoleUpdated));
        bus.unsubscribe(id);
        bus.publish(&event(EventKind::RoleUpdated));

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn each_committed_publish_delivers_exactly_once() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        bus.subscribe("counter", &[EventKind::JournalEntryCreated], move |_e| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        for _ in 0..5 {
            bus.publish(&event(EventKind::JournalEntryCreated));
        }
        assert_eq!(hits.load(Ordering::SeqCst), 5);
    }
}

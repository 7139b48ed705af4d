//! Synchronous event bus
//!
//! Lightweight notification hub coordinating systems without breaking
//! determinism. One subscriber list and one FIFO queue per concrete event
//! type; the `TypeId` lookup happens only at the map edge, dispatch itself
//! is fully typed.
//!
//! Ordering contract: subscribers run in subscription order, per event
//! type. Publishing an event of type `E` from inside a handler already
//! processing an `E` enqueues it; the outer dispatch loop drains the queue,
//! snapshotting the subscriber list at the start of each individual event's
//! dispatch. Subscribe/unsubscribe from inside a handler therefore only
//! affects subsequent events, never the one in flight. No cross-type
//! ordering is guaranteed.

use std::any::{Any, TypeId};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct ChannelInner<E> {
    handlers: Vec<(u64, Handler<E>)>,
    queue: VecDeque<E>,
    dispatching: bool,
    next_id: u64,
}

struct TypedChannel<E> {
    inner: Mutex<ChannelInner<E>>,
}

impl<E: Send + Sync + 'static> TypedChannel<E> {
    fn new() -> Self {
        Self {
            inner: Mutex::new(ChannelInner {
                handlers: Vec::new(),
                queue: VecDeque::new(),
                dispatching: false,
                next_id: 0,
            }),
        }
    }

    fn add(&self, handler: Handler<E>) -> u64 {
        let mut inner = self.inner.lock().expect("event channel lock poisoned");
        let id = inner.next_id;
        inner.next_id += 1;
        inner.handlers.push((id, handler));
        id
    }

    fn remove(&self, id: u64) {
        let mut inner = self.inner.lock().expect("event channel lock poisoned");
        inner.handlers.retain(|(handler_id, _)| *handler_id != id);
    }

    fn publish(&self, event: E) {
        {
            let mut inner = self.inner.lock().expect("event channel lock poisoned");
            inner.queue.push_back(event);
            if inner.dispatching {
                // A dispatch loop for this type is already draining the
                // queue further up the stack; it will pick this event up.
                return;
            }
            inner.dispatching = true;
        }

        loop {
            let (event, handlers) = {
                let mut inner = self.inner.lock().expect("event channel lock poisoned");
                match inner.queue.pop_front() {
                    Some(event) => {
                        let snapshot: Vec<Handler<E>> =
                            inner.handlers.iter().map(|(_, h)| h.clone()).collect();
                        (event, snapshot)
                    }
                    None => {
                        inner.dispatching = false;
                        return;
                    }
                }
            };

            for handler in handlers {
                (*handler)(&event);
            }
        }
    }
}

/// Handle returned by [`EventBus::subscribe`].
///
/// Call [`dispose`](Subscription::dispose) to remove the handler. Dropping
/// the handle does NOT unsubscribe; double-dispose is a no-op.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn dispose(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

/// Synchronous publish/subscribe hub with one channel per event type.
pub struct EventBus {
    channels: Mutex<ahash::AHashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            channels: Mutex::new(ahash::AHashMap::new()),
        }
    }

    /// Register `handler` for events of type `E`.
    pub fn subscribe<E, F>(&self, handler: F) -> Subscription
    where
        E: Send + Sync + 'static,
        F: Fn(&E) + Send + Sync + 'static,
    {
        let channel = self.channel_for::<E>();
        let id = channel.add(Arc::new(handler));
        let weak = Arc::downgrade(&channel);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(channel) = weak.upgrade() {
                    channel.remove(id);
                }
            })),
        }
    }

    /// Deliver `event` to every subscriber of its type, synchronously.
    pub fn publish<E: Send + Sync + 'static>(&self, event: E) {
        let entry = {
            let channels = self.channels.lock().expect("event bus lock poisoned");
            channels.get(&TypeId::of::<E>()).cloned()
        };

        if let Some(entry) = entry {
            let typed = entry
                .downcast::<TypedChannel<E>>()
                .ok()
                .expect("event channel registered under wrong TypeId");
            typed.publish(event);
        }
    }

    fn channel_for<E: Send + Sync + 'static>(&self) -> Arc<TypedChannel<E>> {
        let mut channels = self.channels.lock().expect("event bus lock poisoned");
        let entry = channels
            .entry(TypeId::of::<E>())
            .or_insert_with(|| Arc::new(TypedChannel::<E>::new()));
        entry
            .clone()
            .downcast::<TypedChannel<E>>()
            .ok()
            .expect("event channel registered under wrong TypeId")
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Ping(u32);

    #[derive(Debug, Clone, PartialEq)]
    struct Pong(u32);

    fn collect<E: Clone + Send + Sync + 'static>(
        bus: &EventBus,
        log: &Arc<Mutex<Vec<E>>>,
    ) -> Subscription {
        let log = Arc::clone(log);
        bus.subscribe::<E, _>(move |event: &E| {
            log.lock().unwrap().push(event.clone());
        })
    }

    #[test]
    fn test_publish_reaches_subscribers_in_order() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let first = Arc::clone(&log);
        let _s1 = bus.subscribe::<Ping, _>(move |e| first.lock().unwrap().push(("first", e.0)));
        let second = Arc::clone(&log);
        let _s2 = bus.subscribe::<Ping, _>(move |e| second.lock().unwrap().push(("second", e.0)));

        bus.publish(Ping(7));

        assert_eq!(*log.lock().unwrap(), vec![("first", 7), ("second", 7)]);
    }

    #[test]
    fn test_publish_without_subscribers_is_noop() {
        let bus = EventBus::new();
        bus.publish(Ping(1));
    }

    #[test]
    fn test_types_do_not_interfere() {
        let bus = EventBus::new();
        let pings = Arc::new(Mutex::new(Vec::new()));
        let pongs = Arc::new(Mutex::new(Vec::new()));
        let _s1 = collect::<Ping>(&bus, &pings);
        let _s2 = collect::<Pong>(&bus, &pongs);

        bus.publish(Ping(1));
        bus.publish(Pong(2));

        assert_eq!(*pings.lock().unwrap(), vec![Ping(1)]);
        assert_eq!(*pongs.lock().unwrap(), vec![Pong(2)]);
    }

    #[test]
    fn test_nested_publish_is_queued_not_inlined() {
        let bus = Arc::new(EventBus::new());
        let log = Arc::new(Mutex::new(Vec::new()));

        // First handler republishes once; the nested event must wait until
        // every handler has seen the outer event.
        let republisher = Arc::clone(&bus);
        let first = Arc::clone(&log);
        let _s1 = bus.subscribe::<Ping, _>(move |e| {
            first.lock().unwrap().push(("first", e.0));
            if e.0 == 0 {
                republisher.publish(Ping(1));
            }
        });
        let second = Arc::clone(&log);
        let _s2 = bus.subscribe::<Ping, _>(move |e| second.lock().unwrap().push(("second", e.0)));

        bus.publish(Ping(0));

        assert_eq!(
            *log.lock().unwrap(),
            vec![("first", 0), ("second", 0), ("first", 1), ("second", 1)]
        );
    }

    #[test]
    fn test_subscribe_during_dispatch_affects_next_event_only() {
        let bus = Arc::new(EventBus::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        let late_subs = Arc::new(Mutex::new(Vec::new()));

        let subscriber_bus = Arc::clone(&bus);
        let late_log = Arc::clone(&log);
        let holder = Arc::clone(&late_subs);
        let _s1 = bus.subscribe::<Ping, _>(move |e| {
            if e.0 == 0 {
                let inner_log = Arc::clone(&late_log);
                let sub = subscriber_bus
                    .subscribe::<Ping, _>(move |e| inner_log.lock().unwrap().push(("late", e.0)));
                holder.lock().unwrap().push(sub);
            }
        });

        bus.publish(Ping(0));
        // The in-flight event was dispatched against the pre-subscribe snapshot.
        assert!(log.lock().unwrap().is_empty());

        bus.publish(Ping(1));
        assert_eq!(*log.lock().unwrap(), vec![("late", 1)]);
    }

    #[test]
    fn test_dispose_removes_handler() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut sub = collect::<Ping>(&bus, &log);

        bus.publish(Ping(1));
        sub.dispose();
        bus.publish(Ping(2));
        // Disposing twice is a no-op.
        sub.dispose();
        bus.publish(Ping(3));

        assert_eq!(*log.lock().unwrap(), vec![Ping(1)]);
    }

    #[test]
    fn test_drop_does_not_unsubscribe() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        drop(collect::<Ping>(&bus, &log));

        bus.publish(Ping(4));
        assert_eq!(*log.lock().unwrap(), vec![Ping(4)]);
    }
}

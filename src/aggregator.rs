use std::{
    any::{Any, TypeId},
    collections::HashMap,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{
        Arc, PoisonError, RwLock,
        atomic::{AtomicU64, Ordering},
    },
};

use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};

use crate::internal::Subscriber;

/// Identifies a subscription so it can be removed again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// In-process publish/subscribe bus keyed by event type.
///
/// Subscribers register for one concrete type and only receive events of
/// exactly that type. Handlers run synchronously on the publishing thread.
/// Publishing a type nobody subscribed to is a no-op.
///
/// `EventAggregator` is cheap to clone; clones share subscribers.
///
/// # Example
///
/// ```rust
/// use pubsub_relay::EventAggregator;
///
/// #[derive(Clone)]
/// struct Tick(u32);
///
/// let bus = EventAggregator::new();
/// bus.subscribe(|tick: &Tick| println!("tick {}", tick.0));
/// assert_eq!(bus.publish(&Tick(1)), 1);
/// assert_eq!(bus.publish(&"not subscribed"), 0);
/// ```
#[derive(Clone, Default)]
pub struct EventAggregator {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    subscribers: RwLock<HashMap<TypeId, Vec<Subscriber>>>,
    next_id: AtomicU64,
}

impl EventAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call `handler` for every event of type `E` published from now on.
    pub fn subscribe<E, F>(&self, handler: F) -> SubscriptionId
    where
        E: Send + Sync + 'static,
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let subscriber = Subscriber::new::<E, F>(id, handler);
        self.inner
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(TypeId::of::<E>())
            .or_default()
            .push(subscriber);
        tracing::trace!(event_type = std::any::type_name::<E>(), ?id, "Subscribed");
        id
    }

    /// Receive events of type `E` through a channel instead of a callback.
    pub fn subscribe_channel<E>(&self) -> (SubscriptionId, UnboundedReceiver<E>)
    where
        E: Clone + Send + Sync + 'static,
    {
        let (tx, rx) = unbounded_channel();
        let id = self.subscribe(move |event: &E| {
            let _ = tx.send(event.clone());
        });
        (id, rx)
    }

    /// Remove a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self
            .inner
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let mut removed = false;
        subscribers.retain(|_, list| {
            let before = list.len();
            list.retain(|s| s.id != id);
            removed |= list.len() != before;
            !list.is_empty()
        });
        removed
    }

    /// Number of subscribers registered for `E`.
    pub fn subscriber_count<E: 'static>(&self) -> usize {
        self.inner
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&TypeId::of::<E>())
            .map_or(0, Vec::len)
    }

    /// Deliver `event` to every subscriber of `E`. Returns how many were called.
    ///
    /// A panicking handler is logged and skipped; the others still run.
    pub fn publish<E: Send + Sync + 'static>(&self, event: &E) -> usize {
        // Snapshot so handlers may subscribe or publish without deadlocking.
        let subscribers = match self
            .inner
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&TypeId::of::<E>())
        {
            Some(list) => list.clone(),
            None => {
                tracing::trace!(event_type = std::any::type_name::<E>(), "No subscribers");
                return 0;
            }
        };

        for subscriber in &subscribers {
            let event: &dyn Any = event;
            let result = catch_unwind(AssertUnwindSafe(|| (subscriber.handler)(event)));
            if result.is_err() {
                tracing::error!(
                    event_type = std::any::type_name::<E>(),
                    id = ?subscriber.id,
                    "Subscriber panicked"
                );
            }
        }
        subscribers.len()
    }
}

impl std::fmt::Debug for EventAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let types = self
            .inner
            .subscribers
            .read()
            .map(|s| s.len())
            .unwrap_or_default();
        f.debug_struct("EventAggregator")
            .field("event_types", &types)
            .finish()
    }
}

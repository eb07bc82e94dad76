use std::sync::{Arc, OnceLock};

use crate::{Broadcaster, ClientShim, Error, Event, EventAggregator, Result, ServerShim};

/// Shim connecting an [`EventAggregator`] to the relay, on either side.
///
/// - Server: call [`forward`](AggregatorShim::forward) for each event type
///   clients should receive, then pass the shim to
///   [`Broadcaster::register_shims`]. Business logic keeps publishing on the
///   aggregator and never touches the channel.
/// - Client: hand the shim to a [`Dispatcher`](crate::Dispatcher); received
///   events are published on the aggregator as if they were local.
#[derive(Clone)]
pub struct AggregatorShim {
    aggregator: EventAggregator,
    broadcaster: Arc<OnceLock<Broadcaster>>,
}

impl AggregatorShim {
    pub fn new(aggregator: EventAggregator) -> Self {
        Self {
            aggregator,
            broadcaster: Arc::new(OnceLock::new()),
        }
    }

    /// Broadcast every `E` published on the aggregator.
    ///
    /// Events published before the shim is attached are dropped. Broadcast
    /// failures are logged, since the aggregator has no way to report them to
    /// the publisher; call [`Broadcaster::broadcast`] directly to handle them.
    pub fn forward<E: Event>(self) -> Self {
        let broadcaster = self.broadcaster.clone();
        self.aggregator.subscribe(move |event: &E| match broadcaster.get() {
            Some(broadcaster) => {
                if let Err(e) = broadcaster.broadcast(event) {
                    tracing::warn!(event_type = %E::type_name(), error = %e, "Couldn't broadcast event");
                }
            }
            None => {
                tracing::debug!(event_type = %E::type_name(), "Shim not attached yet, event dropped");
            }
        });
        self
    }

    pub fn aggregator(&self) -> &EventAggregator {
        &self.aggregator
    }
}

impl ServerShim for AggregatorShim {
    fn attach(&self, broadcaster: Broadcaster) -> Result<()> {
        self.broadcaster
            .set(broadcaster)
            .map_err(|_| Error::ShimAlreadyAttached)
    }

    fn is_attached(&self) -> bool {
        self.broadcaster.get().is_some()
    }
}

impl ClientShim for AggregatorShim {
    fn publish<E: Event>(&self, event: E) {
        let delivered = self.aggregator.publish(&event);
        tracing::trace!(event_type = %E::type_name(), delivered, "Published received event");
    }
}

impl std::fmt::Debug for AggregatorShim {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregatorShim")
            .field("aggregator", &self.aggregator)
            .field("attached", &self.is_attached())
            .finish()
    }
}

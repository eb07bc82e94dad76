use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
};

use crate::{Codec, Config, Connection, Envelope, ErasedEvent, Error, Event, Result};

/// Client-side shim sitting between the channel and the application's own
/// eventing mechanism.
///
/// The dispatcher calls `publish` with the concrete event type rebuilt from
/// the envelope, so the application sees exactly what it would have seen had
/// the event been published locally.
pub trait ClientShim: Send + Sync + 'static {
    /// Hand `event` to the application's eventing mechanism.
    fn publish<E: Event>(&self, event: E);
}

/// Publishes a decoded event through the shim as its concrete type.
type Route<S> = fn(&S, Box<dyn ErasedEvent>) -> Result<()>;

fn publish_as<S: ClientShim, E: Event>(shim: &S, event: Box<dyn ErasedEvent>) -> Result<()> {
    let found = event.event_type().into_owned();
    let event = event.downcast::<E>().ok_or_else(|| Error::TypeMismatch {
        expected: E::type_name().into_owned(),
        found,
    })?;
    shim.publish(event);
    Ok(())
}

/// Routes received envelopes to a [`ClientShim`] by their recorded type.
///
/// The routing table is a [`Codec`] fixed when the dispatcher is built: one
/// entry per event type the client understands, each carrying the route that
/// publishes it. Envelopes for other types are dropped.
///
/// ```rust,ignore
/// let dispatcher = Dispatcher::builder(shim)
///     .route::<SimpleEvent>()
///     .route::<ComplexEvent>()
///     .build()?;
/// client::initialise(&mut connection, dispatcher, &config)?;
/// ```
pub struct Dispatcher<S: ClientShim> {
    shim: S,
    codec: Codec<Route<S>>,
}

impl<S: ClientShim> Dispatcher<S> {
    pub fn builder(shim: S) -> DispatcherBuilder<S> {
        DispatcherBuilder {
            shim,
            codec: Codec::default(),
            error: None,
        }
    }

    /// Decode `envelope` and publish the event through the shim.
    pub fn dispatch(&self, envelope: &Envelope) -> Result<()> {
        let (event, route) = self.codec.decode_with(envelope)?;
        route(&self.shim, event)
    }

    /// Entry point for the channel: dispatch, log and drop on failure.
    ///
    /// Never fails and never panics; a bad message doesn't affect the ones
    /// after it. Returns whether an event reached the shim.
    pub fn on_envelope_received(&self, envelope: &Envelope) -> bool {
        match catch_unwind(AssertUnwindSafe(|| self.dispatch(envelope))) {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                tracing::warn!(event_type = envelope.type_name(), error = %e, "Dropping received event");
                false
            }
            Err(_) => {
                tracing::error!(event_type = envelope.type_name(), "Client shim panicked while publishing");
                false
            }
        }
    }

    /// Whether envelopes recorded as `type_name` are routed.
    pub fn handles(&self, type_name: &str) -> bool {
        self.codec.contains(type_name)
    }

    pub fn codec(&self) -> &Codec<Route<S>> {
        &self.codec
    }

    pub fn shim(&self) -> &S {
        &self.shim
    }
}

/// Collects the routes of a [`Dispatcher`].
pub struct DispatcherBuilder<S: ClientShim> {
    shim: S,
    codec: Codec<Route<S>>,
    error: Option<Error>,
}

impl<S: ClientShim> DispatcherBuilder<S> {
    /// Route envelopes recorded as `E` to `ClientShim::publish::<E>`.
    pub fn route<E: Event>(mut self) -> Self {
        if self.error.is_some() {
            return self;
        }
        if let Err(e) = self.codec.register_with::<E>(publish_as::<S, E>) {
            self.error = Some(e);
        }
        self
    }

    /// Finish the table. Fails if any type identifier was routed twice.
    pub fn build(self) -> Result<Dispatcher<S>> {
        if let Some(e) = self.error {
            return Err(e);
        }
        Ok(Dispatcher {
            shim: self.shim,
            codec: self.codec,
        })
    }
}

/// Wire `dispatcher` to the envelopes arriving on `connection`.
///
/// Call before the connection starts receiving, or early events are lost.
pub fn initialise<C, S>(connection: &mut C, dispatcher: Dispatcher<S>, config: &Config) -> Result<()>
where
    C: Connection + ?Sized,
    S: ClientShim,
{
    tracing::debug!(method = %config.method, routes = dispatcher.codec.len(), "Client dispatcher initialised");
    let dispatcher = Arc::new(dispatcher);
    connection.on(
        &config.method,
        Box::new(move |envelope: &Envelope| {
            dispatcher.on_envelope_received(envelope);
        }),
    )
}

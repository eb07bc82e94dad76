use std::{any::Any, borrow::Cow};

use serde::{Serialize, de::DeserializeOwned};

use crate::{Envelope, Result};

/// Marker trait for events carried by the relay.
///
/// Implement this for every payload type that may be broadcast to clients
/// (usually via `#[derive(Event)]`). Events must be serializable because the
/// channel only moves untyped messages, and `Send + Sync + Clone + 'static`
/// because they are handed between tasks and delivered to several subscribers.
///
/// # Type identifier
///
/// [`Event::type_name`] is recorded in every [`Envelope`] and used by the
/// receiving process to pick the concrete type to reconstruct. Both ends must
/// agree on it. The default is [`std::any::type_name`], which std documents
/// as neither unique nor stable across compiler versions. It is only good
/// enough when server and client are the same build sharing the crate that
/// defines the events. For binaries built separately, or a name that
/// survives refactoring, pin it with `#[event(name = "...")]` or by
/// overriding this method.
pub trait Event: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Identifier of this event type on the wire.
    fn type_name() -> Cow<'static, str> {
        Cow::Borrowed(std::any::type_name::<Self>())
    }
}

/// Object-safe view of an [`Event`] whose concrete type is only known at runtime.
///
/// Every `Event` implements it. This is what [`Codec::decode`](crate::Codec::decode)
/// returns: the caller can inspect the type identifier and downcast.
pub trait ErasedEvent: Any + Send + Sync {
    /// Type identifier of the concrete event.
    fn event_type(&self) -> Cow<'static, str>;

    /// Wrap the event in an envelope ready to be sent.
    fn to_envelope(&self) -> Result<Envelope>;

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync>;
}

impl<E: Event> ErasedEvent for E {
    fn event_type(&self) -> Cow<'static, str> {
        E::type_name()
    }

    fn to_envelope(&self) -> Result<Envelope> {
        Envelope::encode(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync> {
        self
    }
}

impl dyn ErasedEvent {
    /// Whether the concrete type behind this event is `E`.
    pub fn is<E: Event>(&self) -> bool {
        self.as_any().is::<E>()
    }

    pub fn downcast_ref<E: Event>(&self) -> Option<&E> {
        self.as_any().downcast_ref::<E>()
    }

    /// Take the concrete event out. `None` if it isn't an `E`.
    pub fn downcast<E: Event>(self: Box<Self>) -> Option<E> {
        self.into_any().downcast::<E>().ok().map(|event| *event)
    }
}

impl std::fmt::Debug for dyn ErasedEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErasedEvent")
            .field("event_type", &self.event_type())
            .finish_non_exhaustive()
    }
}

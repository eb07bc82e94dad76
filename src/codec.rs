use std::{borrow::Cow, collections::HashMap};

use crate::{Envelope, ErasedEvent, Error, Event, Result};

type DecodeFn = fn(&Envelope) -> Result<Box<dyn ErasedEvent>>;

/// Table of the event types this process can rebuild from an [`Envelope`].
///
/// Built once at startup with [`Codec::register`]. Registering the same type
/// identifier twice is an error, so a conflicting setup is caught before any
/// message arrives rather than while handling one.
///
/// Each entry may carry an action of type `A` next to its decoder, looked up
/// together with [`Codec::decode_with`]. The client
/// [`Dispatcher`](crate::Dispatcher) keeps its routes this way.
///
/// ```rust,ignore
/// let mut codec = Codec::new();
/// codec.register::<SimpleEvent>()?.register::<ComplexEvent>()?;
///
/// let event = codec.decode(&envelope)?;
/// if let Some(simple) = event.downcast_ref::<SimpleEvent>() { /* ... */ }
/// ```
pub struct Codec<A = ()> {
    entries: HashMap<Cow<'static, str>, Entry<A>>,
}

struct Entry<A> {
    decode: DecodeFn,
    action: A,
}

impl Codec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `E` decodable by this codec.
    pub fn register<E: Event>(&mut self) -> Result<&mut Self> {
        self.register_with::<E>(())
    }
}

impl<A> Codec<A> {
    /// Make `E` decodable, with `action` attached to its entry.
    pub fn register_with<E: Event>(&mut self, action: A) -> Result<&mut Self> {
        let name = E::type_name();
        if self.entries.contains_key(&name) {
            return Err(Error::DuplicateEventType(name.into_owned()));
        }
        let decode: DecodeFn = |envelope| {
            envelope
                .decode::<E>()
                .map(|event| Box::new(event) as Box<dyn ErasedEvent>)
        };
        self.entries.insert(name, Entry { decode, action });
        Ok(self)
    }

    /// Rebuild the event recorded in `envelope` as its concrete type.
    pub fn decode(&self, envelope: &Envelope) -> Result<Box<dyn ErasedEvent>> {
        self.decode_with(envelope).map(|(event, _)| event)
    }

    /// Same as [`decode`](Codec::decode), also returning the action
    /// registered for the event's type.
    pub fn decode_with(&self, envelope: &Envelope) -> Result<(Box<dyn ErasedEvent>, &A)> {
        let entry = self
            .entries
            .get(envelope.type_name())
            .ok_or_else(|| Error::UnknownEventType(envelope.type_name().to_owned()))?;
        Ok(((entry.decode)(envelope)?, &entry.action))
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.entries.contains_key(type_name)
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_ref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<A> Default for Codec<A> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<A> std::fmt::Debug for Codec<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Codec")
            .field("types", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

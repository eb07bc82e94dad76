use serde::{Deserialize, Serialize};

use crate::{Error, Event, Result};

/// Event payload plus the identifier of its concrete type.
///
/// - `type`: the [`Event::type_name`] of the event that produced the payload.
/// - `payload`: the event serialized as JSON text.
///
/// The channel only moves homogeneous messages, so the receiver relies on the
/// recorded type to know which structure to rebuild. A payload is only ever
/// decoded as the type recorded next to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    type_name: String,
    payload: String,
}

impl Envelope {
    /// Build an envelope from already serialized parts.
    ///
    /// Mostly useful for transports and tests; use [`Envelope::encode`] for events.
    pub fn new<N, P>(type_name: N, payload: P) -> Self
    where
        N: Into<String>,
        P: Into<String>,
    {
        Self {
            type_name: type_name.into(),
            payload: payload.into(),
        }
    }

    /// Serialize an event, recording its concrete type.
    pub fn encode<E: Event>(event: &E) -> Result<Self> {
        let payload = serde_json::to_string(event).map_err(|source| Error::Serialize {
            type_name: E::type_name().into_owned(),
            source,
        })?;
        Ok(Self {
            type_name: E::type_name().into_owned(),
            payload,
        })
    }

    /// Rebuild the event as `E`.
    ///
    /// Fails with [`Error::TypeMismatch`] if the envelope was produced by a
    /// different type, and with [`Error::Payload`] if the payload doesn't fit `E`.
    pub fn decode<E: Event>(&self) -> Result<E> {
        let expected = E::type_name();
        if self.type_name != expected {
            return Err(Error::TypeMismatch {
                expected: expected.into_owned(),
                found: self.type_name.clone(),
            });
        }
        serde_json::from_str(&self.payload).map_err(|source| Error::Payload {
            type_name: self.type_name.clone(),
            source,
        })
    }

    /// Identifier of the concrete event type.
    #[inline]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Serialized event.
    #[inline]
    pub fn payload(&self) -> &str {
        &self.payload
    }
}

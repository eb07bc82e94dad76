//! Seams to the real-time transport.
//!
//! The relay doesn't own connections, framing or reconnection. It only needs
//! a way to push a named message to every connected client, and a way to
//! register a handler for a named message on the client side. [`Hub`](crate::Hub)
//! implements both in memory; a network transport implements the same two traits.

use std::sync::Arc;

use crate::{Envelope, Result};

/// Handler invoked for every envelope received under a message name.
pub type MessageHandler = Box<dyn Fn(&Envelope) + Send + Sync>;

/// Server side of the channel: broadcast to all connected clients.
pub trait Channel: Send + Sync {
    /// Send `envelope` under `method` to every client connected right now.
    ///
    /// No acknowledgement and no buffering for clients that connect later.
    /// Having no clients connected is not an error.
    fn send_to_all(&self, method: &str, envelope: Envelope) -> Result<()>;
}

impl<C: Channel + ?Sized> Channel for Arc<C> {
    fn send_to_all(&self, method: &str, envelope: Envelope) -> Result<()> {
        (**self).send_to_all(method, envelope)
    }
}

/// Client side of the channel: route named messages to handlers.
pub trait Connection {
    /// Register `handler` for messages named `method`.
    ///
    /// Implementations may refuse registration once the connection is running.
    fn on(&mut self, method: &str, handler: MessageHandler) -> Result<()>;
}

use std::{
    collections::HashMap,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
};

use tokio::{
    select,
    sync::broadcast::{Receiver, error::RecvError},
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{Envelope, MessageHandler};

/// A message as it travels through the hub.
#[derive(Debug, Clone)]
pub(crate) struct HubMessage {
    pub method: Arc<str>,
    pub envelope: Arc<Envelope>,
}

/// Receive loop of a single hub connection.
pub(crate) struct MessagePump {
    connection_id: Uuid,
    receiver: Receiver<HubMessage>,
    handlers: HashMap<String, Vec<MessageHandler>>,
    cancel_token: CancellationToken,
}

impl MessagePump {
    pub fn new(
        connection_id: Uuid,
        receiver: Receiver<HubMessage>,
        handlers: HashMap<String, Vec<MessageHandler>>,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            connection_id,
            receiver,
            handlers,
            cancel_token,
        }
    }

    pub async fn run(&mut self) {
        loop {
            select! {
                _ = self.cancel_token.cancelled() => break,
                msg = self.receiver.recv() => match msg {
                    Ok(msg) => self.deliver(&msg),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(connection = %self.connection_id, skipped, "Connection fell behind, messages dropped");
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
        tracing::debug!(connection = %self.connection_id, "Connection stopped");
    }

    fn deliver(&self, msg: &HubMessage) {
        let Some(handlers) = self.handlers.get(msg.method.as_ref()) else {
            tracing::trace!(connection = %self.connection_id, method = %msg.method, "No handler for message");
            return;
        };
        for handler in handlers {
            let result = catch_unwind(AssertUnwindSafe(|| handler(&msg.envelope)));
            if result.is_err() {
                tracing::error!(
                    connection = %self.connection_id,
                    method = %msg.method,
                    "Message handler panicked"
                );
            }
        }
    }
}

use std::{collections::HashMap, sync::Arc};

use tokio::{sync::broadcast, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    Channel, Config, Connection, Envelope, Error, MessageHandler, Result,
    internal::{HubMessage, MessagePump},
};

/// In-memory real-time channel.
///
/// Every [`HubConnection`] created with [`Hub::connect`] receives every
/// message sent after it connected. A connection that falls more than
/// `channel_size` messages behind skips the oldest ones. `Hub` is cheap to
/// clone; clones share the same connections.
#[derive(Debug, Clone)]
pub struct Hub {
    name: Arc<str>,
    sender: broadcast::Sender<HubMessage>,
}

impl Hub {
    pub fn new(config: &Config) -> Self {
        let (sender, _) = broadcast::channel(config.channel_size.max(1));
        Self {
            name: Arc::from(config.hub_name.as_ref()),
            sender,
        }
    }

    /// Open a new client connection.
    ///
    /// Messages sent from now on are buffered for it, but handlers only run
    /// once [`HubConnection::start`] is called.
    pub fn connect(&self) -> HubConnection {
        let connection = HubConnection::new(self.name.clone(), self.sender.subscribe());
        tracing::debug!(hub = %self.name, connection = %connection.id, "Client connected");
        connection
    }

    /// Number of connections currently open.
    pub fn connection_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl Channel for Hub {
    fn send_to_all(&self, method: &str, envelope: Envelope) -> Result<()> {
        let msg = HubMessage {
            method: Arc::from(method),
            envelope: Arc::new(envelope),
        };
        match self.sender.send(msg) {
            Ok(connections) => {
                tracing::trace!(hub = %self.name, method, connections, "Message sent");
            }
            Err(_) => {
                tracing::trace!(hub = %self.name, method, "No connections, message dropped");
            }
        }
        Ok(())
    }
}

/// Client end of a [`Hub`].
///
/// Register handlers with [`Connection::on`], then [`start`](HubConnection::start)
/// the receive loop. Dropping the connection stops the loop.
pub struct HubConnection {
    id: Uuid,
    hub_name: Arc<str>,
    receiver: Option<broadcast::Receiver<HubMessage>>,
    handlers: HashMap<String, Vec<MessageHandler>>,
    cancel_token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl HubConnection {
    fn new(hub_name: Arc<str>, receiver: broadcast::Receiver<HubMessage>) -> Self {
        Self {
            id: Uuid::new_v4(),
            hub_name,
            receiver: Some(receiver),
            handlers: HashMap::new(),
            cancel_token: CancellationToken::new(),
            task: None,
        }
    }

    #[inline]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Whether [`start`](HubConnection::start) has been called.
    #[inline]
    pub fn is_started(&self) -> bool {
        self.receiver.is_none()
    }

    /// Spawn the receive loop on the current tokio runtime.
    pub fn start(&mut self) -> Result<()> {
        let receiver = self
            .receiver
            .take()
            .ok_or(Error::ConnectionAlreadyStarted)?;
        let handlers = std::mem::take(&mut self.handlers);
        let mut pump = MessagePump::new(self.id, receiver, handlers, self.cancel_token.clone());
        self.task = Some(tokio::spawn(async move { pump.run().await }));
        tracing::debug!(hub = %self.hub_name, connection = %self.id, "Connection started");
        Ok(())
    }

    /// Stop the receive loop and wait for it to finish.
    pub async fn stop(&mut self) -> Result<()> {
        self.cancel_token.cancel();
        if let Some(task) = self.task.take() {
            task.await?;
        }
        Ok(())
    }
}

impl Connection for HubConnection {
    fn on(&mut self, method: &str, handler: MessageHandler) -> Result<()> {
        if self.is_started() {
            return Err(Error::ConnectionAlreadyStarted);
        }
        self.handlers
            .entry(method.to_owned())
            .or_default()
            .push(handler);
        Ok(())
    }
}

impl Drop for HubConnection {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

impl std::fmt::Debug for HubConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubConnection")
            .field("id", &self.id)
            .field("hub_name", &self.hub_name)
            .field("started", &self.is_started())
            .finish_non_exhaustive()
    }
}

//! pubsub-relay - typed events over a real-time push channel
//!
//! Business logic on the server publishes events on its own in-process bus;
//! clients receive the same concrete event types on theirs. Neither side
//! touches the transport: shims translate between the local bus and the relay.
//!
//! The relay records each event's type identifier next to its JSON payload
//! ([`Envelope`]), and the client rebuilds the concrete type from a routing
//! table built at startup ([`Dispatcher`]).
//!
//! ```rust,ignore
//! // server
//! let hub = Hub::new(&config);
//! let broadcaster = Broadcaster::new(hub.clone(), &config);
//! let server_shim = AggregatorShim::new(server_bus.clone()).forward::<SimpleEvent>();
//! broadcaster.register_shims([&server_shim as &dyn ServerShim])?;
//!
//! // client
//! let mut connection = hub.connect();
//! let dispatcher = Dispatcher::builder(AggregatorShim::new(client_bus.clone()))
//!     .route::<SimpleEvent>()
//!     .build()?;
//! client::initialise(&mut connection, dispatcher, &config)?;
//! connection.start()?;
//! ```
//!
//! See `demos/relay.rs` for a complete program.

mod aggregator;
mod channel;
pub mod client;
mod codec;
mod config;
mod envelope;
mod error;
mod event;
mod hub;
mod server;
mod shim;

mod internal;

pub use aggregator::{EventAggregator, SubscriptionId};
pub use channel::{Channel, Connection, MessageHandler};
pub use client::{ClientShim, Dispatcher, DispatcherBuilder};
pub use codec::Codec;
pub use config::{Config, DEFAULT_HUB_NAME, DEFAULT_METHOD};
pub use envelope::Envelope;
pub use error::Error;
pub use event::{ErasedEvent, Event};
pub use hub::{Hub, HubConnection};
pub use server::{Broadcaster, ServerShim};
pub use shim::AggregatorShim;

#[cfg(feature = "macros")]
pub use pubsub_relay_macros::Event;

pub type Result<T = ()> = std::result::Result<T, Error>;

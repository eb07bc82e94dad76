//! Server and client of the relay in one process, over the in-memory hub.
//!
//! The server's business logic publishes on its own event aggregator once a
//! second, alternating between two event types. It knows nothing about the
//! hub: the server shim forwards those events to the broadcaster. On the
//! client, a shim republishes what arrives on the client's aggregator, where
//! plain subscribers pick it up.
//!
//! Run with `cargo run --example relay`.

use std::time::Duration;

use chrono::{DateTime, Local, NaiveDate, Utc};
use pubsub_relay::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, Event)]
#[serde(rename_all = "PascalCase")]
struct SimpleEvent {
    message_text: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, Event)]
#[serde(rename_all = "PascalCase")]
struct ComplexEvent {
    employee: Employee,
    timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Employee {
    name: String,
    birth_date: NaiveDate,
}

/// Publishes an event every second. Only ever talks to the aggregator.
struct BusinessLogic {
    bus: EventAggregator,
    flip: bool,
}

impl BusinessLogic {
    fn new(bus: EventAggregator) -> Self {
        Self { bus, flip: false }
    }

    async fn run(&mut self, ticks: usize) {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        for _ in 0..ticks {
            interval.tick().await;
            if self.flip {
                self.bus.publish(&SimpleEvent {
                    message_text: format!("Server says hi at {}", Local::now()),
                });
            } else {
                self.bus.publish(&ComplexEvent {
                    employee: Employee {
                        name: "John Smith".into(),
                        birth_date: Local::now().date_naive(),
                    },
                    timestamp: Utc::now(),
                });
            }
            self.flip = !self.flip;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let config = Config::default();
    let hub = Hub::new(&config);

    // Server: register shims before any client connects.
    let server_bus = EventAggregator::new();
    let server_shim = AggregatorShim::new(server_bus.clone())
        .forward::<SimpleEvent>()
        .forward::<ComplexEvent>();
    let broadcaster = Broadcaster::new(hub.clone(), &config);
    broadcaster.register_shims([&server_shim as &dyn ServerShim])?;

    // Client: subscribe on the client's own aggregator, then connect.
    let client_bus = EventAggregator::new();
    client_bus.subscribe(|e: &SimpleEvent| {
        tracing::info!("Simple event. Message text: {}", e.message_text);
    });
    client_bus.subscribe(|e: &ComplexEvent| {
        tracing::info!(
            "Complex event. Employee: {} {}, timestamp: {}",
            e.employee.name,
            e.employee.birth_date,
            e.timestamp
        );
    });

    let mut connection = hub.connect();
    let dispatcher = Dispatcher::builder(AggregatorShim::new(client_bus))
        .route::<SimpleEvent>()
        .route::<ComplexEvent>()
        .build()?;
    client::initialise(&mut connection, dispatcher, &config)?;
    connection.start()?;

    tracing::info!("Relay started, publishing for a few seconds");
    BusinessLogic::new(server_bus).run(6).await;

    // Let the last message through before shutting the connection down.
    tokio::time::sleep(Duration::from_millis(50)).await;
    connection.stop().await
}

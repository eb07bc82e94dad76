//! End-to-end tests: server aggregator -> hub -> client aggregator.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use pubsub_relay::{
    AggregatorShim, Broadcaster, Channel, Config, Dispatcher, Envelope, Error, Event,
    EventAggregator, Hub, HubConnection, ServerShim, client,
};
use serde::{Deserialize, Serialize, Serializer};
use tokio::{sync::mpsc::UnboundedReceiver, time::timeout};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Event)]
#[serde(rename_all = "PascalCase")]
struct SimpleEvent {
    message_text: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Event)]
#[serde(rename_all = "PascalCase")]
struct ComplexEvent {
    employee: Employee,
    timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Employee {
    name: String,
    birth_date: NaiveDate,
}

/// Known to the server only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Event)]
struct AuditEvent {
    action: String,
}

#[derive(Clone, Debug, Deserialize, Event)]
struct BrokenEvent;

impl Serialize for BrokenEvent {
    fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
        Err(serde::ser::Error::custom("cannot serialize"))
    }
}

struct Server {
    bus: EventAggregator,
    broadcaster: Broadcaster,
    _shim: AggregatorShim,
}

fn start_server(hub: &Hub, config: &Config) -> Server {
    let bus = EventAggregator::new();
    let shim = AggregatorShim::new(bus.clone())
        .forward::<SimpleEvent>()
        .forward::<ComplexEvent>()
        .forward::<AuditEvent>();
    let broadcaster = Broadcaster::new(hub.clone(), config);
    broadcaster
        .register_shims([&shim as &dyn ServerShim])
        .unwrap();
    Server {
        bus,
        broadcaster,
        _shim: shim,
    }
}

struct Client {
    simple: UnboundedReceiver<SimpleEvent>,
    complex: UnboundedReceiver<ComplexEvent>,
    connection: HubConnection,
}

fn connect_client(hub: &Hub, config: &Config) -> Client {
    let bus = EventAggregator::new();
    let (_, simple) = bus.subscribe_channel::<SimpleEvent>();
    let (_, complex) = bus.subscribe_channel::<ComplexEvent>();

    let mut connection = hub.connect();
    let dispatcher = Dispatcher::builder(AggregatorShim::new(bus))
        .route::<SimpleEvent>()
        .route::<ComplexEvent>()
        .build()
        .unwrap();
    client::initialise(&mut connection, dispatcher, config).unwrap();
    connection.start().unwrap();

    Client {
        simple,
        complex,
        connection,
    }
}

async fn next<T>(rx: &mut UnboundedReceiver<T>) -> T {
    timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("subscription closed")
}

async fn assert_quiet<T: std::fmt::Debug>(rx: &mut UnboundedReceiver<T>) {
    if let Ok(Some(event)) = timeout(Duration::from_millis(50), rx.recv()).await {
        panic!("unexpected event: {event:?}");
    }
}

fn hello() -> SimpleEvent {
    SimpleEvent {
        message_text: "hello".into(),
    }
}

#[tokio::test]
async fn test_simple_event_reaches_client_once() {
    let config = Config::default();
    let hub = Hub::new(&config);
    let server = start_server(&hub, &config);
    let mut client = connect_client(&hub, &config);

    assert_eq!(server.bus.publish(&hello()), 1);

    assert_eq!(next(&mut client.simple).await, hello());
    assert_quiet(&mut client.simple).await;
    assert_quiet(&mut client.complex).await;
    client.connection.stop().await.unwrap();
}

#[tokio::test]
async fn test_complex_event_reaches_its_own_subscriber() {
    let config = Config::default();
    let hub = Hub::new(&config);
    let server = start_server(&hub, &config);
    let mut client = connect_client(&hub, &config);

    let sent = ComplexEvent {
        employee: Employee {
            name: "John Smith".into(),
            birth_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        },
        timestamp: "2024-05-01T12:30:00Z".parse().unwrap(),
    };
    server.bus.publish(&sent);

    let received = next(&mut client.complex).await;
    assert_eq!(received, sent);
    assert_eq!(received.employee.name, "John Smith");
    assert_eq!(
        received.employee.birth_date,
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
    );
    assert_quiet(&mut client.simple).await;
    client.connection.stop().await.unwrap();
}

#[tokio::test]
async fn test_every_client_receives_broadcast() {
    let config = Config::default();
    let hub = Hub::new(&config);
    let server = start_server(&hub, &config);
    let mut first = connect_client(&hub, &config);
    let mut second = connect_client(&hub, &config);

    server.broadcaster.broadcast(&hello()).unwrap();

    assert_eq!(next(&mut first.simple).await, hello());
    assert_eq!(next(&mut second.simple).await, hello());
    first.connection.stop().await.unwrap();
    second.connection.stop().await.unwrap();
}

#[tokio::test]
async fn test_two_shims_fan_in_to_one_broadcaster() {
    let config = Config::default();
    let hub = Hub::new(&config);
    let broadcaster = Broadcaster::new(hub.clone(), &config);
    let orders = EventAggregator::new();
    let billing = EventAggregator::new();
    let orders_shim = AggregatorShim::new(orders.clone()).forward::<SimpleEvent>();
    let billing_shim = AggregatorShim::new(billing.clone()).forward::<SimpleEvent>();
    broadcaster
        .register_shims([&orders_shim as &dyn ServerShim, &billing_shim])
        .unwrap();
    let mut client = connect_client(&hub, &config);

    orders.publish(&SimpleEvent {
        message_text: "from orders".into(),
    });
    billing.publish(&SimpleEvent {
        message_text: "from billing".into(),
    });

    let mut texts = vec![
        next(&mut client.simple).await.message_text,
        next(&mut client.simple).await.message_text,
    ];
    texts.sort();
    assert_eq!(texts, ["from billing", "from orders"]);
    assert_quiet(&mut client.simple).await;
    client.connection.stop().await.unwrap();
}

#[tokio::test]
async fn test_unknown_type_is_dropped_and_relay_keeps_going() {
    let config = Config::default();
    let hub = Hub::new(&config);
    let server = start_server(&hub, &config);
    let mut client = connect_client(&hub, &config);

    server.bus.publish(&AuditEvent {
        action: "login".into(),
    });
    server.bus.publish(&hello());

    assert_eq!(next(&mut client.simple).await, hello());
    assert_quiet(&mut client.simple).await;
    assert_quiet(&mut client.complex).await;
    client.connection.stop().await.unwrap();
}

#[tokio::test]
async fn test_malformed_message_does_not_block_the_next() {
    let config = Config::default();
    let hub = Hub::new(&config);
    let server = start_server(&hub, &config);
    let mut client = connect_client(&hub, &config);

    hub.send_to_all(
        &config.method,
        Envelope::new(SimpleEvent::type_name(), "this is not json"),
    )
    .unwrap();
    hub.send_to_all(
        &config.method,
        Envelope::new(ComplexEvent::type_name(), r#"{"Employee": 42}"#),
    )
    .unwrap();
    server.bus.publish(&hello());

    assert_eq!(next(&mut client.simple).await, hello());
    assert_quiet(&mut client.complex).await;
    client.connection.stop().await.unwrap();
}

#[tokio::test]
async fn test_event_without_client_subscribers_is_noop() {
    let config = Config::default();
    let hub = Hub::new(&config);
    let server = start_server(&hub, &config);

    // Routed, but nobody on the client bus listens for it.
    let bus = EventAggregator::new();
    let (_, mut simple) = bus.subscribe_channel::<SimpleEvent>();
    let mut connection = hub.connect();
    let dispatcher = Dispatcher::builder(AggregatorShim::new(bus))
        .route::<SimpleEvent>()
        .route::<ComplexEvent>()
        .build()
        .unwrap();
    client::initialise(&mut connection, dispatcher, &config).unwrap();
    connection.start().unwrap();

    server.bus.publish(&ComplexEvent {
        employee: Employee {
            name: "Ada".into(),
            birth_date: NaiveDate::from_ymd_opt(1990, 12, 10).unwrap(),
        },
        timestamp: Utc::now(),
    });
    server.bus.publish(&hello());

    assert_eq!(next(&mut simple).await, hello());
    connection.stop().await.unwrap();
}

#[tokio::test]
async fn test_custom_method_name_on_both_ends() {
    let config = Config::default().with_method("OrdersBusEvent");
    let hub = Hub::new(&config);
    let server = start_server(&hub, &config);
    let mut client = connect_client(&hub, &config);
    // A client listening on the default name sees nothing.
    let mut stranger = connect_client(&hub, &Config::default());

    server.bus.publish(&hello());

    assert_eq!(next(&mut client.simple).await, hello());
    assert_quiet(&mut stranger.simple).await;
    client.connection.stop().await.unwrap();
    stranger.connection.stop().await.unwrap();
}

#[tokio::test]
async fn test_serialization_error_reaches_the_caller() {
    let config = Config::default();
    let hub = Hub::new(&config);
    let broadcaster = Broadcaster::new(hub.clone(), &config);

    let err = broadcaster.broadcast(&BrokenEvent).unwrap_err();
    assert!(matches!(err, Error::Serialize { ref type_name, .. } if *type_name == BrokenEvent::type_name()));
}

#[tokio::test]
async fn test_wire_uses_pascal_case_fields() {
    let envelope = Envelope::encode(&hello()).unwrap();
    assert_eq!(envelope.payload(), r#"{"MessageText":"hello"}"#);
    assert!(envelope.type_name().ends_with("SimpleEvent"));
}

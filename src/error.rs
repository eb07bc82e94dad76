#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Couldn't serialize event '{type_name}': {source}")]
    Serialize {
        type_name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Event type '{0}' is not registered in this process.")]
    UnknownEventType(String),

    #[error("Payload doesn't match event type '{type_name}': {source}")]
    Payload {
        type_name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Envelope carries '{found}' but '{expected}' was requested.")]
    TypeMismatch { expected: String, found: String },

    #[error("Event type '{0}' is already registered.")]
    DuplicateEventType(String),

    #[error("Shim is already attached to a broadcaster.")]
    ShimAlreadyAttached,

    #[error("Connection has already started.")]
    ConnectionAlreadyStarted,

    #[error("Connection task join error: {0}")]
    JoinError(#[from] tokio::task::JoinError),
}

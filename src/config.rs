use std::borrow::Cow;

/// Name of the message carrying envelopes over the channel.
pub const DEFAULT_METHOD: &str = "PubSubBusEvent";

/// Name the hub is known by on the channel.
pub const DEFAULT_HUB_NAME: &str = "PubSubHub";

/// Relay configuration shared by the server and client sides.
///
/// Both ends must use the same `method`. Use the builder methods to
/// customize, or [`Default`] for the stock values.
///
/// # Examples
///
/// ```rust
/// use pubsub_relay::Config;
///
/// let config = Config::default()
///     .with_channel_size(512)          // Tolerate slower connections
///     .with_method("OrdersBusEvent");  // Separate message name per relay
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of messages the in-memory hub buffers per connection.
    /// A connection that falls further behind skips the oldest messages.
    /// Default: 128
    pub channel_size: usize,

    /// Message name envelopes are sent and received under.
    /// Default: `PubSubBusEvent`
    pub method: Cow<'static, str>,

    /// Hub name, used to label log output.
    /// Default: `PubSubHub`
    pub hub_name: Cow<'static, str>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            channel_size: 128,
            method: Cow::Borrowed(DEFAULT_METHOD),
            hub_name: Cow::Borrowed(DEFAULT_HUB_NAME),
        }
    }
}

impl Config {
    /// Set the per-connection buffer size of the hub. Zero is treated as one.
    pub fn with_channel_size(mut self, size: usize) -> Self {
        self.channel_size = size;
        self
    }

    pub fn with_method<M: Into<Cow<'static, str>>>(mut self, method: M) -> Self {
        self.method = method.into();
        self
    }

    pub fn with_hub_name<N: Into<Cow<'static, str>>>(mut self, name: N) -> Self {
        self.hub_name = name.into();
        self
    }
}

mod message_pump;
mod subscriber;

pub(crate) use message_pump::{HubMessage, MessagePump};
pub(crate) use subscriber::Subscriber;

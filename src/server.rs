use std::sync::Arc;

use crate::{Channel, Config, Envelope, ErasedEvent, Error, Event, Result};

/// Server-side shim sitting between the application's eventing mechanism
/// and the broadcaster.
///
/// [`Broadcaster::register_shims`] hands each shim a broadcaster; the shim
/// calls [`Broadcaster::broadcast`] for every event it wants clients to see.
pub trait ServerShim: Send + Sync {
    /// Receive the broadcaster this shim forwards to.
    ///
    /// Called once during startup. Implementations should return
    /// [`Error::ShimAlreadyAttached`] on a second call.
    fn attach(&self, broadcaster: Broadcaster) -> Result<()>;

    /// Whether [`attach`](ServerShim::attach) already succeeded.
    fn is_attached(&self) -> bool;
}

/// Pushes events to every client connected to a [`Channel`].
///
/// This is the single context object that owns the reference to the channel.
/// Create it once at startup and clone it into whatever needs to broadcast;
/// clones share the channel.
#[derive(Clone)]
pub struct Broadcaster {
    channel: Arc<dyn Channel>,
    method: Arc<str>,
}

impl Broadcaster {
    pub fn new<C: Channel + 'static>(channel: C, config: &Config) -> Self {
        Self {
            channel: Arc::new(channel),
            method: Arc::from(config.method.as_ref()),
        }
    }

    /// Attach every shim to this broadcaster.
    ///
    /// All or nothing: if any shim is already attached, or appears twice,
    /// none of them is attached. Do this before the channel accepts
    /// connections: events a shim sees before it is attached are dropped.
    pub fn register_shims<'a, I>(&self, shims: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a dyn ServerShim>,
    {
        let shims: Vec<&dyn ServerShim> = shims.into_iter().collect();
        for (i, shim) in shims.iter().enumerate() {
            let repeated = shims[..i].iter().any(|other| std::ptr::addr_eq(*other, *shim));
            if repeated || shim.is_attached() {
                return Err(Error::ShimAlreadyAttached);
            }
        }
        for shim in &shims {
            shim.attach(self.clone())?;
        }
        tracing::debug!(shims = shims.len(), method = %self.method, "Shims registered");
        Ok(())
    }

    /// Send `event` to all connected clients.
    ///
    /// Fire-and-forget: no acknowledgement, and clients connecting later
    /// never see it. Fails only if the event can't be serialized or the
    /// channel reports an error.
    pub fn broadcast<E: Event>(&self, event: &E) -> Result<()> {
        self.send(Envelope::encode(event)?)
    }

    /// Same as [`broadcast`](Broadcaster::broadcast), for events only known at runtime.
    pub fn broadcast_erased(&self, event: &dyn ErasedEvent) -> Result<()> {
        self.send(event.to_envelope()?)
    }

    /// Name of the message envelopes are sent under.
    pub fn method(&self) -> &str {
        &self.method
    }

    fn send(&self, envelope: Envelope) -> Result<()> {
        tracing::trace!(event_type = envelope.type_name(), method = %self.method, "Broadcasting");
        self.channel.send_to_all(&self.method, envelope)
    }
}

impl std::fmt::Debug for Broadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broadcaster")
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Mutex, OnceLock};

    use serde::{Deserialize, Serialize};

    use super::*;

    /// Channel recording what it was asked to send.
    #[derive(Default)]
    struct RecordingChannel {
        sent: Mutex<Vec<(String, Envelope)>>,
    }

    impl Channel for RecordingChannel {
        fn send_to_all(&self, method: &str, envelope: Envelope) -> Result<()> {
            self.sent.lock().unwrap().push((method.to_owned(), envelope));
            Ok(())
        }
    }

    #[derive(Default)]
    struct SlotShim {
        broadcaster: OnceLock<Broadcaster>,
    }

    impl ServerShim for SlotShim {
        fn attach(&self, broadcaster: Broadcaster) -> Result<()> {
            self.broadcaster
                .set(broadcaster)
                .map_err(|_| Error::ShimAlreadyAttached)
        }

        fn is_attached(&self) -> bool {
            self.broadcaster.get().is_some()
        }
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Alarm {
        level: u8,
    }
    impl Event for Alarm {}

    #[test]
    fn test_broadcast_sends_envelope_under_method() {
        let channel = Arc::new(RecordingChannel::default());
        let config = Config::default().with_method("Alarms");
        let broadcaster = Broadcaster::new(channel.clone(), &config);

        broadcaster.broadcast(&Alarm { level: 3 }).unwrap();

        let sent = channel.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "Alarms");
        assert_eq!(sent[0].1.decode::<Alarm>().unwrap(), Alarm { level: 3 });
    }

    #[test]
    fn test_broadcast_erased_keeps_concrete_type() {
        let channel = Arc::new(RecordingChannel::default());
        let broadcaster = Broadcaster::new(channel.clone(), &Config::default());
        let event: Box<dyn ErasedEvent> = Box::new(Alarm { level: 1 });

        broadcaster.broadcast_erased(event.as_ref()).unwrap();

        let sent = channel.sent.lock().unwrap();
        assert_eq!(sent[0].1.type_name(), Alarm::type_name());
    }

    #[test]
    fn test_register_shims_attaches_each_once() {
        let broadcaster = Broadcaster::new(RecordingChannel::default(), &Config::default());
        let first = SlotShim::default();
        let second = SlotShim::default();

        broadcaster
            .register_shims([&first as &dyn ServerShim, &second])
            .unwrap();
        assert!(first.broadcaster.get().is_some());
        assert!(second.broadcaster.get().is_some());

        let err = broadcaster
            .register_shims([&first as &dyn ServerShim])
            .unwrap_err();
        assert!(matches!(err, Error::ShimAlreadyAttached));
    }

    #[test]
    fn test_failed_registration_attaches_nothing() {
        let broadcaster = Broadcaster::new(RecordingChannel::default(), &Config::default());
        let fresh = SlotShim::default();
        let taken = SlotShim::default();
        broadcaster
            .register_shims([&taken as &dyn ServerShim])
            .unwrap();

        let err = broadcaster
            .register_shims([&fresh as &dyn ServerShim, &taken])
            .unwrap_err();
        assert!(matches!(err, Error::ShimAlreadyAttached));
        assert!(!fresh.is_attached());

        // Once the conflict is removed the same shim registers fine.
        broadcaster
            .register_shims([&fresh as &dyn ServerShim])
            .unwrap();
        assert!(fresh.is_attached());
    }

    #[test]
    fn test_same_shim_listed_twice_is_rejected() {
        let broadcaster = Broadcaster::new(RecordingChannel::default(), &Config::default());
        let shim = SlotShim::default();
        let err = broadcaster
            .register_shims([&shim as &dyn ServerShim, &shim])
            .unwrap_err();
        assert!(matches!(err, Error::ShimAlreadyAttached));
        assert!(!shim.is_attached());
    }

    #[test]
    fn test_shims_share_one_channel() {
        let channel = Arc::new(RecordingChannel::default());
        let broadcaster = Broadcaster::new(channel.clone(), &Config::default());
        let first = SlotShim::default();
        let second = SlotShim::default();
        broadcaster
            .register_shims([&first as &dyn ServerShim, &second])
            .unwrap();

        first.broadcaster.get().unwrap().broadcast(&Alarm { level: 1 }).unwrap();
        second.broadcaster.get().unwrap().broadcast(&Alarm { level: 2 }).unwrap();

        assert_eq!(channel.sent.lock().unwrap().len(), 2);
    }
}

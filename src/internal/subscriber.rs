use std::{any::Any, sync::Arc};

use crate::SubscriptionId;

type Handler = Arc<dyn Fn(&dyn Any) + Send + Sync>;

/// A handler registered with the aggregator for one event type.
#[derive(Clone)]
pub(crate) struct Subscriber {
    pub id: SubscriptionId,
    pub handler: Handler,
}

impl Subscriber {
    pub fn new<E, F>(id: SubscriptionId, handler: F) -> Subscriber
    where
        E: 'static,
        F: Fn(&E) + Send + Sync + 'static,
    {
        // Subscribers are stored per TypeId, so the downcast only fails if
        // the aggregator misfiled the handler.
        let handler = move |event: &dyn Any| {
            if let Some(event) = event.downcast_ref::<E>() {
                handler(event);
            }
        };
        Subscriber {
            id,
            handler: Arc::new(handler),
        }
    }
}

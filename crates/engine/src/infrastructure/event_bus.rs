//! In-process publish/subscribe for committed document changes.
//!
//! One bus exists per resource kind. Publishing never waits for listeners:
//! events are queued to a dispatcher task that delivers each event to the
//! entity-scoped topic (`save:<id>`) and then the unscoped one (`save`),
//! calling listeners one after another in registration order.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use futures_util::FutureExt;
use questline_domain::{Resource, ResourceEvent, Topic, Verb};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::infrastructure::ports::{PersistHook, RepoError};

/// Errors a listener may report. They are logged, never propagated.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
    #[error("{0}")]
    Failed(String),
}

#[async_trait]
pub trait EventListener: Send + Sync {
    fn name(&self) -> &'static str;

    async fn handle(&self, event: &ResourceEvent) -> Result<(), ListenerError>;
}

type Subscriptions = HashMap<Topic, Vec<Arc<dyn EventListener>>>;

pub struct EventBus {
    kind: &'static str,
    subscriptions: Arc<RwLock<Subscriptions>>,
    sender: Mutex<Option<mpsc::UnboundedSender<ResourceEvent>>>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl EventBus {
    /// Creates the bus and spawns its dispatcher on the current runtime.
    pub fn start(kind: &'static str) -> Arc<Self> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let subscriptions: Arc<RwLock<Subscriptions>> = Arc::default();
        let dispatcher = tokio::spawn(dispatch(kind, receiver, subscriptions.clone()));

        Arc::new(Self {
            kind,
            subscriptions,
            sender: Mutex::new(Some(sender)),
            dispatcher: Mutex::new(Some(dispatcher)),
        })
    }

    pub fn subscribe(&self, topic: Topic, listener: Arc<dyn EventListener>) {
        tracing::debug!(kind = self.kind, topic = %topic, listener = listener.name(), "Listener subscribed");
        let mut subscriptions = self
            .subscriptions
            .write()
            .unwrap_or_else(|e| e.into_inner());
        subscriptions.entry(topic).or_default().push(listener);
    }

    /// Queues `event` for delivery and returns immediately.
    pub fn publish(&self, event: ResourceEvent) {
        let sender = self.sender.lock().unwrap_or_else(|e| e.into_inner());
        let Some(sender) = sender.as_ref() else {
            tracing::warn!(kind = self.kind, id = %event.entity_id, verb = %event.verb, "Event published after shutdown, dropped");
            return;
        };
        if sender.send(event).is_err() {
            tracing::warn!(kind = self.kind, "Event dispatcher is gone, event dropped");
        }
    }

    /// Stops accepting events, delivers everything already queued, then joins
    /// the dispatcher.
    pub async fn shutdown(&self) {
        self.sender
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        let dispatcher = self
            .dispatcher
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(dispatcher) = dispatcher {
            if let Err(e) = dispatcher.await {
                tracing::error!(kind = self.kind, error = %e, "Event dispatcher failed");
            }
        }
        tracing::debug!(kind = self.kind, "Event bus drained");
    }
}

async fn dispatch(
    kind: &'static str,
    mut receiver: mpsc::UnboundedReceiver<ResourceEvent>,
    subscriptions: Arc<RwLock<Subscriptions>>,
) {
    while let Some(event) = receiver.recv().await {
        for topic in event.topics() {
            let listeners = subscriptions
                .read()
                .unwrap_or_else(|e| e.into_inner())
                .get(&topic)
                .cloned()
                .unwrap_or_default();

            for listener in listeners {
                let outcome = AssertUnwindSafe(listener.handle(&event))
                    .catch_unwind()
                    .await;
                match outcome {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => tracing::warn!(
                        kind,
                        topic = %topic,
                        listener = listener.name(),
                        error = %e,
                        "Event listener failed"
                    ),
                    Err(_) => tracing::warn!(
                        kind,
                        topic = %topic,
                        listener = listener.name(),
                        "Event listener panicked"
                    ),
                }
            }
        }
    }
}

/// Bridges store hooks to a bus: every committed write becomes an event.
pub struct BusHook {
    bus: Arc<EventBus>,
}

impl BusHook {
    pub fn new(bus: Arc<EventBus>) -> Arc<Self> {
        Arc::new(Self { bus })
    }

    fn publish<R: Resource>(&self, verb: Verb, entity: &R) {
        let document = match serde_json::to_value(entity) {
            Ok(document) => document,
            Err(e) => {
                tracing::error!(kind = R::KIND, error = %e, "Failed to serialize event document");
                return;
            }
        };
        self.bus.publish(ResourceEvent::new(
            R::KIND,
            verb,
            entity.identity().id.to_string(),
            document,
        ));
    }
}

impl<R: Resource> PersistHook<R> for BusHook {
    fn after_save(&self, entity: &R) {
        self.publish(Verb::Save, entity);
    }

    fn after_remove(&self, entity: &R) {
        self.publish(Verb::Remove, entity);
    }
}

//! Event bus: per-subscriber fan-out of lifecycle events.
//!
//! A naive single-consumer queue cannot serve N subscribers — fire would only ever
//! reach whichever task drained first. This bus instead keeps one bounded queue per
//! subscriber; `fire` writes into every live queue and drops on any that is full,
//! rather than ever blocking the producer.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, mpsc};

use crate::model::{Event, EventType};

/// Capacity of each subscriber's buffer. A subscriber more than this far behind
/// the producer loses events rather than slowing it down.
const SUBSCRIBER_CAPACITY: usize = 256;

struct Subscriber {
    id: u64,
    sender: mpsc::Sender<Event>,
}

/// Fan-out broadcast of [`Event`]s to any number of live subscribers.
pub struct EventBus {
    subscribers: Mutex<Vec<Subscriber>>,
    next_id: AtomicU64,
}

/// A live subscription. Dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    bus: Arc<EventBus>,
    receiver: mpsc::Receiver<Event>,
}

impl Subscription {
    pub async fn recv(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let bus = self.bus.clone();
        let id = self.id;
        tokio::spawn(async move {
            bus.unsubscribe(id).await;
        });
    }
}

impl EventBus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        })
    }

    /// Registers a new subscriber and returns a handle to receive events from it.
    pub async fn subscribe(self: &Arc<Self>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (sender, receiver) = mpsc::channel(SUBSCRIBER_CAPACITY);
        self.subscribers.lock().await.push(Subscriber { id, sender });
        Subscription {
            id,
            bus: self.clone(),
            receiver,
        }
    }

    async fn unsubscribe(&self, id: u64) {
        self.subscribers.lock().await.retain(|s| s.id != id);
    }

    /// Fans `event` out to every live subscriber. Never blocks: a full or closed
    /// queue is simply skipped (and, if closed, pruned on the next pass).
    pub async fn fire(&self, event_type: EventType, id: impl Into<String>) {
        let event = Event::new(event_type, id);
        let mut subscribers = self.subscribers.lock().await;
        subscribers.retain(|sub| match sub.sender.try_send(event.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(subscriber_id = sub.id, "event subscriber is full, dropping event");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.lock().await.len()
    }
}

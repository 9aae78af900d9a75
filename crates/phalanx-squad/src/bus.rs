//! Synchronous publish/subscribe fan-out.
//!
//! `publish` iterates over a snapshot of the subscriber list, so callbacks
//! may ask for subscription changes through [`BusRequests`] without
//! disturbing the dispatch in progress. Those changes apply once every
//! subscriber in the snapshot has seen the event.

use std::fmt;
use std::sync::Arc;

use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Callback<E> = Arc<dyn Fn(&E, &mut BusRequests<E>) + Send + Sync>;

/// Subscription changes requested from inside a callback.
pub struct BusRequests<E> {
    next_id: u64,
    subscribe: Vec<(SubscriptionId, Callback<E>)>,
    unsubscribe: Vec<SubscriptionId>,
}

impl<E> BusRequests<E> {
    fn new(next_id: u64) -> Self {
        Self {
            next_id,
            subscribe: Vec::new(),
            unsubscribe: Vec::new(),
        }
    }

    /// Queue a new subscriber; it starts receiving from the next publish.
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: Fn(&E, &mut BusRequests<E>) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribe.push((id, Arc::new(callback)));
        id
    }

    /// Queue removal of a subscriber.
    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.unsubscribe.push(id);
    }
}

pub struct EventBus<E> {
    subscribers: Vec<(SubscriptionId, Callback<E>)>,
    next_id: u64,
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self {
            subscribers: Vec::new(),
            next_id: 0,
        }
    }
}

impl<E> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: Fn(&E, &mut BusRequests<E>) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Arc::new(callback)));
        id
    }

    /// Returns whether the subscriber existed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Deliver `event` to every current subscriber, in subscription order.
    /// Returns the number of callbacks invoked.
    pub fn publish(&mut self, event: &E) -> usize {
        if self.subscribers.is_empty() {
            trace!("no subscribers");
            return 0;
        }
        let snapshot: Vec<Callback<E>> = self.subscribers.iter().map(|(_, cb)| Arc::clone(cb)).collect();
        let mut requests = BusRequests::new(self.next_id);
        for callback in &snapshot {
            callback(event, &mut requests);
        }

        self.next_id = requests.next_id;
        for id in requests.unsubscribe {
            self.unsubscribe(id);
        }
        self.subscribers.extend(requests.subscribe);
        snapshot.len()
    }
}

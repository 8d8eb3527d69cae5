//! Battle State Store
//!
//! One mutable snapshot, one writer ([`StorePublisher`], owned by the
//! driver) and any number of readers ([`BattleStore`]). Callback
//! subscribers run synchronously inside [`StorePublisher::publish`];
//! async readers can follow the same value through a `watch` channel.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::watch;

use super::state::BattleSnapshot;

type Callback = Arc<dyn Fn(&BattleSnapshot) + Send + Sync>;

#[derive(Default)]
struct Subscribers {
    next_id: AtomicU64,
    list: Mutex<Vec<(u64, Callback)>>,
}

impl Subscribers {
    fn remove(&self, id: u64) {
        self.list.lock().retain(|(existing, _)| *existing != id);
    }
}

/// The write side of the store
pub struct StorePublisher {
    sender: watch::Sender<BattleSnapshot>,
    subscribers: Arc<Subscribers>,
}

impl StorePublisher {
    pub fn new(initial: BattleSnapshot) -> Self {
        let (sender, _) = watch::channel(initial);
        Self {
            sender,
            subscribers: Arc::new(Subscribers::default()),
        }
    }

    /// Replace the visible snapshot and run every subscriber before returning
    pub fn publish(&self, snapshot: BattleSnapshot) {
        self.sender.send_replace(snapshot);

        // Callbacks run outside the lock so they may (un)subscribe
        let callbacks: Vec<Callback> = {
            let list = self.subscribers.list.lock();
            if list.is_empty() {
                return;
            }
            list.iter().map(|(_, callback)| Arc::clone(callback)).collect()
        };
        for callback in callbacks {
            callback(&snapshot);
        }
    }

    /// A read handle onto this store
    pub fn store(&self) -> BattleStore {
        BattleStore {
            receiver: self.sender.subscribe(),
            subscribers: Arc::clone(&self.subscribers),
        }
    }
}

/// Read-only handle onto the published snapshot
#[derive(Clone)]
pub struct BattleStore {
    receiver: watch::Receiver<BattleSnapshot>,
    subscribers: Arc<Subscribers>,
}

impl BattleStore {
    /// The most recently published snapshot
    pub fn current(&self) -> BattleSnapshot {
        *self.receiver.borrow()
    }

    /// Register `callback` for every future publish.
    ///
    /// The callback is not invoked for the current value. It stays
    /// registered until the returned [`Subscription`] is dropped or
    /// [`Subscription::unsubscribe`] is called.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&BattleSnapshot) + Send + Sync + 'static,
    {
        let id = self.subscribers.next_id.fetch_add(1, Ordering::SeqCst);
        self.subscribers.list.lock().push((id, Arc::new(callback)));
        Subscription {
            id,
            subscribers: Arc::downgrade(&self.subscribers),
        }
    }

    /// Follow the snapshot asynchronously.
    ///
    /// The current value counts as seen, so `changed()` only fires for
    /// publishes made after this call.
    pub fn watch(&self) -> watch::Receiver<BattleSnapshot> {
        let mut receiver = self.receiver.clone();
        receiver.mark_unchanged();
        receiver
    }

    /// Number of registered callbacks
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.list.lock().len()
    }
}

/// Registration handle returned by [`BattleStore::subscribe`]
pub struct Subscription {
    id: u64,
    subscribers: Weak<Subscribers>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        // Drop does the work
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(subscribers) = self.subscribers.upgrade() {
            subscribers.remove(self.id);
        }
    }
}

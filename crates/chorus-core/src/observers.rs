use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Callback registered for one state field.
pub type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Token returned by every `subscribe_to_*` call; pass it back to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Listener registry for one field.
///
/// Ids grow monotonically, so iterating the map yields registration order.
/// Not synchronized on its own; the manager keeps every registry behind its
/// state lock.
pub(crate) struct Observers<T> {
    listeners: BTreeMap<SubscriptionId, Listener<T>>,
}

impl<T> Observers<T> {
    pub(crate) fn new() -> Self {
        Self {
            listeners: BTreeMap::new(),
        }
    }

    pub(crate) fn add(&mut self, listener: Listener<T>) -> SubscriptionId {
        let id = SubscriptionId::next();
        self.listeners.insert(id, listener);
        id
    }

    /// Returns false when the id was never registered here or is already gone.
    pub(crate) fn remove(&mut self, id: SubscriptionId) -> bool {
        self.listeners.remove(&id).is_some()
    }

    pub(crate) fn snapshot(&self) -> Vec<Listener<T>> {
        self.listeners.values().cloned().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.len()
    }
}

/// Fan a value out to listeners in order. A panicking listener unwinds out of
/// this call and the remaining listeners are skipped.
pub(crate) fn notify<T>(listeners: &[Listener<T>], value: &T) {
    for listener in listeners {
        listener(value);
    }
}

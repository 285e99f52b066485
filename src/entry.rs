use std::fmt;
use std::sync::Arc;

/// Callback invoked with `(previous, new)` when an entry's value changes
pub type ChangeCallback<T> = Arc<dyn Fn(&T, &T) + Send + Sync>;

/// Handle returned by [`PersData::subscribe`](crate::PersData::subscribe), used to unsubscribe
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub(crate) u64);

impl SubscriptionId {
    /// Returned when subscribing with an absent key. Unsubscribing it is a no-op.
    pub const NONE: SubscriptionId = SubscriptionId(0);

    /// Returns true if this handle refers to an actual subscription
    pub fn is_active(self) -> bool {
        self != Self::NONE
    }
}

pub(crate) struct Subscriber<T> {
    pub(crate) id: SubscriptionId,
    pub(crate) callback: ChangeCallback<T>,
}

/// The value, persistence flag and subscribers stored for one key
pub(crate) struct Entry<T> {
    pub(crate) value: T,
    pub(crate) persistent: bool,
    pub(crate) subscribers: Vec<Subscriber<T>>,
}

impl<T> Entry<T> {
    pub(crate) fn new(value: T, persistent: bool) -> Self {
        Self {
            value,
            persistent,
            subscribers: Vec::new(),
        }
    }

    /// Clones the callbacks in registration order so they can run without the lock held
    pub(crate) fn snapshot_callbacks(&self) -> Vec<ChangeCallback<T>> {
        self.subscribers
            .iter()
            .map(|s| Arc::clone(&s.callback))
            .collect()
    }

    pub(crate) fn remove_subscriber(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        self.subscribers.len() != before
    }
}

impl<T: fmt::Debug> fmt::Debug for Entry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("value", &self.value)
            .field("persistent", &self.persistent)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

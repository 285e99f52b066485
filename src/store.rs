use crate::entry::{Entry, Subscriber, SubscriptionId};
use crate::error::StoreError;
use crate::key::DataKey;
use parking_lot::ReentrantMutex;
use std::any::type_name;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Persistence given to entries created without an explicit flag
pub const DEFAULT_PERSISTENT: bool = true;

/// Values a [`PersData`] store can hold
///
/// Change detection uses the type's own `PartialEq`; an equality that is not
/// reflexive or symmetric makes notifications fire spuriously or not at all.
pub trait StoreValue: Clone + PartialEq + Default + Send + Sync + 'static {}

impl<T> StoreValue for T where T: Clone + PartialEq + Default + Send + Sync + 'static {}

/// The outcome of a `try_get_*` call
///
/// `value` holds the stored value when `found` is true, and the operation's
/// fallback otherwise.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Lookup<V> {
    value: V,
    found: bool,
}

impl<V> Lookup<V> {
    pub(crate) fn found(value: V) -> Self {
        Self { value, found: true }
    }

    pub(crate) fn missing(fallback: V) -> Self {
        Self {
            value: fallback,
            found: false,
        }
    }

    /// True if an entry existed for the key
    pub fn is_found(&self) -> bool {
        self.found
    }

    /// The stored value, or the fallback if nothing was found
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Consumes the lookup, returning the stored value or the fallback
    pub fn into_value(self) -> V {
        self.value
    }

    /// Consumes the lookup, returning `None` if nothing was found
    pub fn into_option(self) -> Option<V> {
        if self.found {
            Some(self.value)
        } else {
            None
        }
    }
}

impl<V> From<Lookup<V>> for Option<V> {
    fn from(lookup: Lookup<V>) -> Self {
        lookup.into_option()
    }
}

#[derive(Debug)]
struct Slots<K, T> {
    entries: HashMap<K, Entry<T>>,
    last_subscription: u64,
}

/// A thread-safe keyed store for values of one type
///
/// Each key owns a value, a persistence flag and an ordered list of change
/// subscribers. Entries are created lazily by the first write, persistence
/// change or subscription for a key, and only disappear through
/// [`clear_non_persistent`](Self::clear_non_persistent) or
/// [`clear_all`](Self::clear_all). Cloning a `PersData` yields another handle
/// to the same entries.
///
/// Absent keys (see [`DataKey::is_absent`]) are accepted by every operation
/// and never create entries.
///
/// # Examples
///
/// ```
/// use sovran_persdata::{PersData, StoreError};
/// use std::sync::{Arc, Mutex};
///
/// let scores = PersData::<&'static str, i32>::new();
/// let seen = Arc::new(Mutex::new(Vec::new()));
///
/// let sink = Arc::clone(&seen);
/// scores.subscribe(&"player", move |old, new| {
///     sink.lock().unwrap().push((*old, *new));
/// })?;
///
/// scores.set_value(&"player", 10)?;
/// scores.set_value(&"player", 10)?; // unchanged, no notification
/// scores.set_value(&"player", 25)?;
///
/// assert_eq!(*seen.lock().unwrap(), vec![(0, 10), (10, 25)]);
/// assert_eq!(scores.get_value(&"player")?, 25);
/// # Ok::<(), StoreError>(())
/// ```
#[derive(Clone, Debug)]
pub struct PersData<K, T>
where
    K: DataKey,
    T: StoreValue,
{
    slots: Arc<Mutex<Slots<K, T>>>,
    // Serializes writes, callbacks included. Reentrant so callbacks can write.
    writer: Arc<ReentrantMutex<()>>,
}

impl<K, T> PersData<K, T>
where
    K: DataKey,
    T: StoreValue,
{
    /// Creates a new, empty store
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(Slots {
                entries: HashMap::new(),
                last_subscription: 0,
            })),
            writer: Arc::new(ReentrantMutex::new(())),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Slots<K, T>>, StoreError> {
        self.slots.lock().map_err(|_| StoreError::LockError)
    }

    /// Sets the value for `key`
    ///
    /// The first write creates the entry silently with persistence
    /// [`DEFAULT_PERSISTENT`]. Later writes notify every subscriber with
    /// `(previous, new)` if the value differs, then commit it. An existing
    /// entry keeps its persistence flag.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::LockError` if the internal lock cannot be acquired.
    pub fn set_value(&self, key: &K, value: T) -> Result<(), StoreError> {
        self.write(key, value, None)
    }

    /// Sets the value for `key` and its persistence flag
    ///
    /// Behaves like [`set_value`](Self::set_value), but also stores
    /// `persistent`, even when the value is unchanged.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::LockError` if the internal lock cannot be acquired.
    pub fn set_value_with_persistence(
        &self,
        key: &K,
        value: T,
        persistent: bool,
    ) -> Result<(), StoreError> {
        self.write(key, value, Some(persistent))
    }

    fn write(&self, key: &K, value: T, persistent: Option<bool>) -> Result<(), StoreError> {
        if key.is_absent() {
            return Ok(());
        }

        let _writer = self.writer.lock();
        let (previous, callbacks) = {
            let mut slots = self.lock()?;
            let entry = match slots.entries.get_mut(key) {
                Some(entry) => entry,
                None => {
                    let persistent = persistent.unwrap_or(DEFAULT_PERSISTENT);
                    log::trace!(
                        "created {} entry for {:?} (persistent: {})",
                        type_name::<T>(),
                        key,
                        persistent
                    );
                    slots
                        .entries
                        .insert(key.clone(), Entry::new(value, persistent));
                    return Ok(());
                }
            };

            if entry.value == value {
                if let Some(persistent) = persistent {
                    entry.persistent = persistent;
                }
                return Ok(());
            }

            (entry.value.clone(), entry.snapshot_callbacks())
        };

        // The map lock is released so callbacks can read or write the store.
        // Other threads' writes wait on `writer` until the commit below.
        // A subscriber reading this key here still sees `previous`.
        for callback in &callbacks {
            callback(&previous, &value);
        }

        let mut slots = self.lock()?;
        if let Some(entry) = slots.entries.get_mut(key) {
            entry.value = value;
            if let Some(persistent) = persistent {
                entry.persistent = persistent;
            }
        }
        Ok(())
    }

    /// Looks up the value for `key` without creating an entry
    ///
    /// A missing entry yields `T::default()` with `is_found() == false`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::LockError` if the internal lock cannot be acquired.
    pub fn try_get_value(&self, key: &K) -> Result<Lookup<T>, StoreError> {
        if key.is_absent() {
            return Ok(Lookup::missing(T::default()));
        }

        let slots = self.lock()?;
        Ok(match slots.entries.get(key) {
            Some(entry) => Lookup::found(entry.value.clone()),
            None => Lookup::missing(T::default()),
        })
    }

    /// Returns the value for `key`, or `T::default()` if there is none
    ///
    /// # Errors
    ///
    /// Returns `StoreError::LockError` if the internal lock cannot be acquired.
    pub fn get_value(&self, key: &K) -> Result<T, StoreError> {
        Ok(self.try_get_value(key)?.into_value())
    }

    /// Sets the persistence flag for `key`
    ///
    /// Creates an entry holding `T::default()` if none exists. Never notifies.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::LockError` if the internal lock cannot be acquired.
    pub fn set_persistent(&self, key: &K, persistent: bool) -> Result<(), StoreError> {
        if key.is_absent() {
            return Ok(());
        }

        let mut slots = self.lock()?;
        match slots.entries.get_mut(key) {
            Some(entry) => entry.persistent = persistent,
            None => {
                log::trace!(
                    "created default {} entry for {:?} (persistent: {})",
                    type_name::<T>(),
                    key,
                    persistent
                );
                slots
                    .entries
                    .insert(key.clone(), Entry::new(T::default(), persistent));
            }
        }
        Ok(())
    }

    /// Looks up the persistence flag for `key` without creating an entry
    ///
    /// A missing entry reports `true`, so callers falling back on the value
    /// never treat an unknown key as sweepable.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::LockError` if the internal lock cannot be acquired.
    pub fn try_get_persistent(&self, key: &K) -> Result<Lookup<bool>, StoreError> {
        if key.is_absent() {
            return Ok(Lookup::missing(true));
        }

        let slots = self.lock()?;
        Ok(match slots.entries.get(key) {
            Some(entry) => Lookup::found(entry.persistent),
            None => Lookup::missing(true),
        })
    }

    /// Returns the persistence flag for `key`, or `false` if there is no entry
    ///
    /// Note the fallback differs from [`try_get_persistent`](Self::try_get_persistent).
    ///
    /// # Errors
    ///
    /// Returns `StoreError::LockError` if the internal lock cannot be acquired.
    pub fn get_persistent(&self, key: &K) -> Result<bool, StoreError> {
        let lookup = self.try_get_persistent(key)?;
        Ok(lookup.is_found() && lookup.into_value())
    }

    /// Registers `callback` to run with `(previous, new)` whenever the value for `key` changes
    ///
    /// Subscribing creates a default entry if none exists, without notifying.
    /// Callbacks run synchronously on the writing thread, in registration order.
    /// Subscribing with an absent key returns [`SubscriptionId::NONE`].
    ///
    /// # Errors
    ///
    /// Returns `StoreError::LockError` if the internal lock cannot be acquired.
    pub fn subscribe<F>(&self, key: &K, callback: F) -> Result<SubscriptionId, StoreError>
    where
        F: Fn(&T, &T) + Send + Sync + 'static,
    {
        if key.is_absent() {
            return Ok(SubscriptionId::NONE);
        }

        let mut slots = self.lock()?;
        slots.last_subscription += 1;
        let id = SubscriptionId(slots.last_subscription);

        let entry = slots
            .entries
            .entry(key.clone())
            .or_insert_with(|| Entry::new(T::default(), DEFAULT_PERSISTENT));
        entry.subscribers.push(Subscriber {
            id,
            callback: Arc::new(callback),
        });

        log::trace!("subscribed {:?} to {} key {:?}", id, type_name::<T>(), key);
        Ok(id)
    }

    /// Removes a subscription from `key`
    ///
    /// Returns `true` if the subscription existed. A write already running its
    /// callbacks may still call it once; every later write will not.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::LockError` if the internal lock cannot be acquired.
    pub fn unsubscribe(&self, key: &K, id: SubscriptionId) -> Result<bool, StoreError> {
        if key.is_absent() || !id.is_active() {
            return Ok(false);
        }

        let mut slots = self.lock()?;
        let removed = slots
            .entries
            .get_mut(key)
            .map_or(false, |entry| entry.remove_subscriber(id));
        if removed {
            log::trace!("unsubscribed {:?} from {} key {:?}", id, type_name::<T>(), key);
        }
        Ok(removed)
    }

    /// Returns the number of subscribers registered for `key`
    ///
    /// # Errors
    ///
    /// Returns `StoreError::LockError` if the internal lock cannot be acquired.
    pub fn subscriber_count(&self, key: &K) -> Result<usize, StoreError> {
        if key.is_absent() {
            return Ok(0);
        }

        let slots = self.lock()?;
        Ok(slots
            .entries
            .get(key)
            .map_or(0, |entry| entry.subscribers.len()))
    }

    /// Removes every entry whose persistence flag is `false`
    ///
    /// Removed entries lose their subscribers silently; no callback runs.
    /// Returns the number of entries removed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::LockError` if the internal lock cannot be acquired.
    pub fn clear_non_persistent(&self) -> Result<usize, StoreError> {
        let mut slots = self.lock()?;
        let before = slots.entries.len();
        slots.entries.retain(|_, entry| entry.persistent);
        let removed = before - slots.entries.len();

        if removed > 0 {
            log::debug!(
                "cleared {} non-persistent {} entries",
                removed,
                type_name::<T>()
            );
        }
        Ok(removed)
    }

    /// Removes every entry regardless of its persistence flag
    ///
    /// Returns the number of entries removed. No callback runs.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::LockError` if the internal lock cannot be acquired.
    pub fn clear_all(&self) -> Result<usize, StoreError> {
        let mut slots = self.lock()?;
        let removed = slots.entries.len();
        slots.entries.clear();

        if removed > 0 {
            log::debug!("cleared all {} {} entries", removed, type_name::<T>());
        }
        Ok(removed)
    }

    /// Returns true if an entry exists for `key`
    ///
    /// # Errors
    ///
    /// Returns `StoreError::LockError` if the internal lock cannot be acquired.
    pub fn contains_key(&self, key: &K) -> Result<bool, StoreError> {
        if key.is_absent() {
            return Ok(false);
        }

        let slots = self.lock()?;
        Ok(slots.entries.contains_key(key))
    }

    /// Returns the number of entries
    ///
    /// # Errors
    ///
    /// Returns `StoreError::LockError` if the internal lock cannot be acquired.
    pub fn len(&self) -> Result<usize, StoreError> {
        let slots = self.lock()?;
        Ok(slots.entries.len())
    }

    /// Returns true if the store holds no entries
    ///
    /// # Errors
    ///
    /// Returns `StoreError::LockError` if the internal lock cannot be acquired.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        let slots = self.lock()?;
        Ok(slots.entries.is_empty())
    }

    /// Returns every key that currently has an entry
    ///
    /// # Errors
    ///
    /// Returns `StoreError::LockError` if the internal lock cannot be acquired.
    pub fn keys(&self) -> Result<Vec<K>, StoreError> {
        let slots = self.lock()?;
        Ok(slots.entries.keys().cloned().collect())
    }
}

impl<K, T> Default for PersData<K, T>
where
    K: DataKey,
    T: StoreValue,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::KeyId;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_first_write_is_silent() -> Result<(), StoreError> {
        let store = PersData::<KeyId, i32>::new();
        let key = KeyId::unique();
        let hits = Arc::new(AtomicUsize::new(0));

        store.set_value(&key, 3)?;
        let counter = Arc::clone(&hits);
        store.subscribe(&key, move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        })?;

        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(store.try_get_persistent(&key)?, Lookup::found(true));
        Ok(())
    }

    #[test]
    fn test_callback_sees_previous_value_in_store() -> Result<(), StoreError> {
        let store = PersData::<&'static str, String>::new();
        store.set_value(&"name", "old".to_string())?;

        let observed = Arc::new(Mutex::new(None));
        let reader = store.clone();
        let sink = Arc::clone(&observed);
        store.subscribe(&"name", move |_, _| {
            *sink.lock().unwrap() = Some(reader.get_value(&"name").unwrap());
        })?;

        store.set_value(&"name", "new".to_string())?;

        assert_eq!(observed.lock().unwrap().as_deref(), Some("old"));
        assert_eq!(store.get_value(&"name")?, "new");
        Ok(())
    }

    #[test]
    fn test_callback_can_write_other_keys() -> Result<(), StoreError> {
        let store = PersData::<u32, i32>::new();
        let mirror = store.clone();
        store.subscribe(&1, move |_, new| {
            mirror.set_value(&2, new * 2).unwrap();
        })?;

        store.set_value(&1, 5)?;
        assert_eq!(store.get_value(&2)?, 10);
        Ok(())
    }

    #[test]
    fn test_persistence_updates_on_equal_value() -> Result<(), StoreError> {
        let store = PersData::<u32, i32>::new();
        store.set_value(&1, 5)?;
        store.set_value_with_persistence(&1, 5, false)?;
        assert!(!store.get_persistent(&1)?);

        store.set_value(&1, 6)?;
        assert!(!store.get_persistent(&1)?);
        Ok(())
    }

    #[test]
    fn test_sweep_during_callback_drops_commit() -> Result<(), StoreError> {
        let store = PersData::<u32, i32>::new();
        store.set_value_with_persistence(&1, 1, false)?;

        let sweeper = store.clone();
        store.subscribe(&1, move |_, _| {
            sweeper.clear_non_persistent().unwrap();
        })?;

        store.set_value(&1, 2)?;
        assert!(!store.contains_key(&1)?);
        Ok(())
    }

    #[test]
    fn test_lookup_conversions() {
        let hit = Lookup::found(4);
        let miss = Lookup::missing(0);

        assert!(hit.is_found());
        assert_eq!(*hit.value(), 4);
        assert_eq!(Option::from(hit), Some(4));
        assert_eq!(miss.into_option(), None);
        assert_eq!(miss.into_value(), 0);
    }
}

use crate::any_store::AnyStore;
use crate::entry::SubscriptionId;
use crate::error::StoreError;
use crate::key::DataKey;
use crate::store::{Lookup, PersData, StoreValue};
use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex};

/// Owns one [`PersData`] store per value type
///
/// The registry is the context object components share instead of global
/// state: a store for `T` is created the first time `store::<T>()` is called,
/// and every later call returns a handle to the same store. Stores for
/// different value types never share entries, even for equal keys.
///
/// # Examples
///
/// ```
/// use sovran_persdata::{KeyInterner, StoreError, StoreRegistry, KeyId};
///
/// let keys = KeyInterner::new();
/// let registry = StoreRegistry::<KeyId>::new();
///
/// let level = keys.intern("level")?;
/// registry.store::<i32>()?.set_value(&level, 3)?;
/// registry.store::<String>()?.set_value(&level, "forest".to_string())?;
///
/// assert_eq!(registry.store::<i32>()?.get_value(&level)?, 3);
/// assert_eq!(registry.store::<String>()?.get_value(&level)?, "forest");
/// # Ok::<(), StoreError>(())
/// ```
pub struct StoreRegistry<K>
where
    K: DataKey,
{
    stores: Arc<Mutex<HashMap<TypeId, AnyStore>>>,
    _key: PhantomData<fn(K)>,
}

impl<K> StoreRegistry<K>
where
    K: DataKey,
{
    /// Creates a new registry with no stores
    pub fn new() -> Self {
        Self {
            stores: Arc::new(Mutex::new(HashMap::new())),
            _key: PhantomData,
        }
    }

    /// Returns the store for values of type `T`, creating it on first use
    ///
    /// # Errors
    ///
    /// - Returns `StoreError::LockError` if the internal lock cannot be acquired
    /// - Returns `StoreError::TypeMismatch` if the slot for `T` holds another store type
    pub fn store<T: StoreValue>(&self) -> Result<PersData<K, T>, StoreError> {
        let mut stores = self.stores.lock().map_err(|_| StoreError::LockError)?;
        let slot = stores.entry(TypeId::of::<T>()).or_insert_with(|| {
            log::trace!("created store for {}", type_name::<T>());
            AnyStore::new(PersData::<K, T>::new())
        });

        slot.downcast_ref::<K, T>()
            .cloned()
            .ok_or(StoreError::TypeMismatch(type_name::<T>()))
    }

    /// Returns true if a store for `T` has been created
    ///
    /// # Errors
    ///
    /// Returns `StoreError::LockError` if the internal lock cannot be acquired.
    pub fn contains_store<T: StoreValue>(&self) -> Result<bool, StoreError> {
        let stores = self.stores.lock().map_err(|_| StoreError::LockError)?;
        Ok(stores.contains_key(&TypeId::of::<T>()))
    }

    /// Returns the number of stores created so far
    ///
    /// # Errors
    ///
    /// Returns `StoreError::LockError` if the internal lock cannot be acquired.
    pub fn len(&self) -> Result<usize, StoreError> {
        let stores = self.stores.lock().map_err(|_| StoreError::LockError)?;
        Ok(stores.len())
    }

    /// Returns true if no store has been created
    ///
    /// # Errors
    ///
    /// Returns `StoreError::LockError` if the internal lock cannot be acquired.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        let stores = self.stores.lock().map_err(|_| StoreError::LockError)?;
        Ok(stores.is_empty())
    }

    /// Returns the value type names of every created store
    ///
    /// # Errors
    ///
    /// Returns `StoreError::LockError` if the internal lock cannot be acquired.
    pub fn type_names(&self) -> Result<Vec<&'static str>, StoreError> {
        let stores = self.stores.lock().map_err(|_| StoreError::LockError)?;
        Ok(stores.values().map(|slot| slot.type_name).collect())
    }

    /// Runs [`PersData::clear_non_persistent`] on every store
    ///
    /// Returns the total number of entries removed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::LockError` if any lock cannot be acquired.
    pub fn clear_non_persistent(&self) -> Result<usize, StoreError> {
        let stores = self.stores.lock().map_err(|_| StoreError::LockError)?;
        let mut removed = 0;
        for slot in stores.values() {
            removed += slot.store.clear_non_persistent()?;
        }
        log::debug!("cleared non-persistent data ({} entries)", removed);
        Ok(removed)
    }

    /// Runs [`PersData::clear_all`] on every store
    ///
    /// Returns the total number of entries removed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::LockError` if any lock cannot be acquired.
    pub fn clear_all(&self) -> Result<usize, StoreError> {
        let stores = self.stores.lock().map_err(|_| StoreError::LockError)?;
        let mut removed = 0;
        for slot in stores.values() {
            removed += slot.store.clear_all()?;
        }
        log::debug!("cleared all data ({} entries)", removed);
        Ok(removed)
    }

    /// Drops every store
    ///
    /// Handles obtained earlier keep working but are detached: the next
    /// `store::<T>()` call creates a fresh, empty store.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::LockError` if the internal lock cannot be acquired.
    pub fn reset(&self) -> Result<(), StoreError> {
        let mut stores = self.stores.lock().map_err(|_| StoreError::LockError)?;
        let dropped = stores.len();
        stores.clear();
        log::debug!("reset registry ({} stores dropped)", dropped);
        Ok(())
    }
}

impl<K> Clone for StoreRegistry<K>
where
    K: DataKey,
{
    fn clone(&self) -> Self {
        Self {
            stores: Arc::clone(&self.stores),
            _key: PhantomData,
        }
    }
}

impl<K> Default for StoreRegistry<K>
where
    K: DataKey,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Store operations called from the key side
///
/// Each method looks up the store for `T` in `registry` (creating it on first
/// use) and forwards to the matching [`PersData`] operation. Implemented for
/// every [`DataKey`].
///
/// # Examples
///
/// ```
/// use sovran_persdata::{KeyExt, KeyId, StoreError, StoreRegistry};
///
/// let registry = StoreRegistry::<KeyId>::new();
/// let lives = KeyId::unique();
///
/// lives.set_value_in(&registry, 3u8)?;
/// assert_eq!(lives.get_value_in::<u8>(&registry)?, 3);
/// assert!(!lives.try_get_value_in::<String>(&registry)?.is_found());
/// # Ok::<(), StoreError>(())
/// ```
///
/// # Errors
///
/// Every method returns the errors of [`StoreRegistry::store`] and of the
/// forwarded [`PersData`] operation.
pub trait KeyExt: DataKey {
    /// See [`PersData::set_value`]
    fn set_value_in<T: StoreValue>(
        &self,
        registry: &StoreRegistry<Self>,
        value: T,
    ) -> Result<(), StoreError> {
        registry.store::<T>()?.set_value(self, value)
    }

    /// See [`PersData::set_value_with_persistence`]
    fn set_value_with_persistence_in<T: StoreValue>(
        &self,
        registry: &StoreRegistry<Self>,
        value: T,
        persistent: bool,
    ) -> Result<(), StoreError> {
        registry
            .store::<T>()?
            .set_value_with_persistence(self, value, persistent)
    }

    /// See [`PersData::try_get_value`]
    fn try_get_value_in<T: StoreValue>(
        &self,
        registry: &StoreRegistry<Self>,
    ) -> Result<Lookup<T>, StoreError> {
        registry.store::<T>()?.try_get_value(self)
    }

    /// See [`PersData::get_value`]
    fn get_value_in<T: StoreValue>(&self, registry: &StoreRegistry<Self>) -> Result<T, StoreError> {
        registry.store::<T>()?.get_value(self)
    }

    /// See [`PersData::set_persistent`]
    fn set_persistent_in<T: StoreValue>(
        &self,
        registry: &StoreRegistry<Self>,
        persistent: bool,
    ) -> Result<(), StoreError> {
        registry.store::<T>()?.set_persistent(self, persistent)
    }

    /// See [`PersData::try_get_persistent`]
    fn try_get_persistent_in<T: StoreValue>(
        &self,
        registry: &StoreRegistry<Self>,
    ) -> Result<Lookup<bool>, StoreError> {
        registry.store::<T>()?.try_get_persistent(self)
    }

    /// See [`PersData::get_persistent`]
    fn get_persistent_in<T: StoreValue>(
        &self,
        registry: &StoreRegistry<Self>,
    ) -> Result<bool, StoreError> {
        registry.store::<T>()?.get_persistent(self)
    }

    /// See [`PersData::subscribe`]
    fn subscribe_in<T, F>(
        &self,
        registry: &StoreRegistry<Self>,
        callback: F,
    ) -> Result<SubscriptionId, StoreError>
    where
        T: StoreValue,
        F: Fn(&T, &T) + Send + Sync + 'static,
    {
        registry.store::<T>()?.subscribe(self, callback)
    }

    /// See [`PersData::unsubscribe`]
    fn unsubscribe_in<T: StoreValue>(
        &self,
        registry: &StoreRegistry<Self>,
        id: SubscriptionId,
    ) -> Result<bool, StoreError> {
        registry.store::<T>()?.unsubscribe(self, id)
    }
}

impl<K: DataKey> KeyExt for K {}

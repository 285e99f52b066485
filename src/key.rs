use crate::error::StoreError;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// An opaque identity used to look up entries in a [`PersData`](crate::PersData) store.
///
/// Equality and hashing must stay stable for as long as the key is in use.
/// A key may also be *absent* (the null identity); every store operation treats
/// an absent key as a silent no-op.
pub trait DataKey: Clone + Eq + Hash + Debug + Send + Sync + 'static {
    /// Returns true if this key is the null identity
    fn is_absent(&self) -> bool {
        false
    }
}

impl<K: DataKey> DataKey for Option<K> {
    fn is_absent(&self) -> bool {
        match self {
            Some(key) => key.is_absent(),
            None => true,
        }
    }
}

macro_rules! impl_data_key {
    ($($ty:ty),*) => {
        $(impl DataKey for $ty {})*
    };
}

impl_data_key!(String, &'static str, u32, u64, usize);

// 0 is reserved for KeyId::NULL.
static NEXT_KEY_ID: AtomicU64 = AtomicU64::new(1);

/// A cheap, copyable key handle.
///
/// Handles come either from [`KeyId::unique`] or from a [`KeyInterner`]. Both
/// draw from the same counter, so they never collide.
///
/// # Examples
///
/// ```
/// use sovran_persdata::{DataKey, KeyId};
///
/// let a = KeyId::unique();
/// let b = KeyId::unique();
/// assert_ne!(a, b);
/// assert!(KeyId::NULL.is_absent());
/// assert!(!a.is_absent());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyId(u64);

impl KeyId {
    /// The null identity
    pub const NULL: KeyId = KeyId(0);

    /// Allocates a new process-unique handle
    pub fn unique() -> Self {
        KeyId(NEXT_KEY_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw handle value
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl Default for KeyId {
    fn default() -> Self {
        KeyId::NULL
    }
}

impl DataKey for KeyId {
    fn is_absent(&self) -> bool {
        *self == KeyId::NULL
    }
}

#[derive(Debug, Default)]
struct Names {
    ids: HashMap<String, KeyId>,
    names: HashMap<KeyId, String>,
}

/// A thread-safe string interner that hands out [`KeyId`]s
///
/// The same name always maps to the same `KeyId` for the lifetime of the
/// interner. Clones share the same table.
///
/// # Examples
///
/// ```
/// use sovran_persdata::{KeyInterner, StoreError};
///
/// let keys = KeyInterner::new();
/// let score = keys.intern("score")?;
/// assert_eq!(keys.intern("score")?, score);
/// assert_eq!(keys.name_of(score)?.as_deref(), Some("score"));
/// # Ok::<(), StoreError>(())
/// ```
#[derive(Clone, Debug, Default)]
pub struct KeyInterner {
    table: Arc<Mutex<Names>>,
}

impl KeyInterner {
    /// Creates a new, empty interner
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the `KeyId` for `name`, allocating one on first use
    ///
    /// # Errors
    ///
    /// Returns `StoreError::LockError` if the internal lock cannot be acquired.
    pub fn intern(&self, name: &str) -> Result<KeyId, StoreError> {
        let mut table = self.table.lock().map_err(|_| StoreError::LockError)?;
        if let Some(id) = table.ids.get(name) {
            return Ok(*id);
        }

        let id = KeyId::unique();
        table.ids.insert(name.to_string(), id);
        table.names.insert(id, name.to_string());
        log::trace!("interned key {:?} as {:?}", name, id);
        Ok(id)
    }

    /// Returns the `KeyId` for `name` without allocating
    ///
    /// # Errors
    ///
    /// Returns `StoreError::LockError` if the internal lock cannot be acquired.
    pub fn lookup(&self, name: &str) -> Result<Option<KeyId>, StoreError> {
        let table = self.table.lock().map_err(|_| StoreError::LockError)?;
        Ok(table.ids.get(name).copied())
    }

    /// Returns the name a `KeyId` was interned from, if any
    ///
    /// # Errors
    ///
    /// Returns `StoreError::LockError` if the internal lock cannot be acquired.
    pub fn name_of(&self, id: KeyId) -> Result<Option<String>, StoreError> {
        let table = self.table.lock().map_err(|_| StoreError::LockError)?;
        Ok(table.names.get(&id).cloned())
    }

    /// Returns the number of interned names
    ///
    /// # Errors
    ///
    /// Returns `StoreError::LockError` if the internal lock cannot be acquired.
    pub fn len(&self) -> Result<usize, StoreError> {
        let table = self.table.lock().map_err(|_| StoreError::LockError)?;
        Ok(table.ids.len())
    }

    /// Returns true if nothing has been interned yet
    ///
    /// # Errors
    ///
    /// Returns `StoreError::LockError` if the internal lock cannot be acquired.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        let table = self.table.lock().map_err(|_| StoreError::LockError)?;
        Ok(table.ids.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_absent_keys() {
        assert!(KeyId::NULL.is_absent());
        assert!(KeyId::default().is_absent());
        assert!(None::<String>.is_absent());
        assert!(Some(KeyId::NULL).is_absent());
        assert!(!Some("volume").is_absent());
        assert!(!"volume".to_string().is_absent());
        assert!(!0u64.is_absent());
    }

    #[test]
    fn test_unique_ids_differ() {
        let ids: Vec<KeyId> = (0..100).map(|_| KeyId::unique()).collect();
        for (i, a) in ids.iter().enumerate() {
            assert!(!a.is_absent());
            for b in &ids[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_intern_is_stable() -> Result<(), StoreError> {
        let keys = KeyInterner::new();
        assert!(keys.is_empty()?);

        let health = keys.intern("health")?;
        let mana = keys.intern("mana")?;

        assert_ne!(health, mana);
        assert_eq!(keys.intern("health")?, health);
        assert_eq!(keys.lookup("mana")?, Some(mana));
        assert_eq!(keys.lookup("stamina")?, None);
        assert_eq!(keys.name_of(health)?, Some("health".to_string()));
        assert_eq!(keys.name_of(KeyId::NULL)?, None);
        assert_eq!(keys.len()?, 2);

        Ok(())
    }

    #[test]
    fn test_interned_ids_never_collide_with_unique() -> Result<(), StoreError> {
        let keys = KeyInterner::new();
        let handle = KeyId::unique();
        let named = keys.intern("level")?;
        assert_ne!(handle, named);
        Ok(())
    }

    #[test]
    fn test_intern_across_threads() {
        let keys = KeyInterner::new();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let keys = keys.clone();
                thread::spawn(move || keys.intern("shared").unwrap())
            })
            .collect();

        let ids: Vec<KeyId> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(ids.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(keys.len().unwrap(), 1);
    }
}

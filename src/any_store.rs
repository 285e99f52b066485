use crate::error::StoreError;
use crate::key::DataKey;
use crate::store::{PersData, StoreValue};
use std::any::{type_name, Any, TypeId};

/// The operations a registry can run on a store without knowing its value type
pub(crate) trait ErasedStore: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn clear_non_persistent(&self) -> Result<usize, StoreError>;
    fn clear_all(&self) -> Result<usize, StoreError>;
}

impl<K, T> ErasedStore for PersData<K, T>
where
    K: DataKey,
    T: StoreValue,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clear_non_persistent(&self) -> Result<usize, StoreError> {
        PersData::clear_non_persistent(self)
    }

    fn clear_all(&self) -> Result<usize, StoreError> {
        PersData::clear_all(self)
    }
}

/// A type-erased store that remembers which value type it holds
pub(crate) struct AnyStore {
    pub(crate) value_type: TypeId,
    pub(crate) type_name: &'static str,
    pub(crate) store: Box<dyn ErasedStore>,
}

impl AnyStore {
    pub(crate) fn new<K: DataKey, T: StoreValue>(store: PersData<K, T>) -> Self {
        Self {
            value_type: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            store: Box::new(store),
        }
    }

    /// Check if the contained store holds values of type T
    pub(crate) fn is_type<T: 'static>(&self) -> bool {
        self.value_type == TypeId::of::<T>()
    }

    /// Get a reference to the contained store if it is keyed by K and holds T
    pub(crate) fn downcast_ref<K: DataKey, T: StoreValue>(&self) -> Option<&PersData<K, T>> {
        if !self.is_type::<T>() {
            return None;
        }
        self.store.as_any().downcast_ref::<PersData<K, T>>()
    }
}

use std::fmt;

/// Errors that can occur when using a PersData store or its registry
///
/// A missing key is never an error. Lookups report absence through
/// [`Lookup::found`](crate::Lookup::found) instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Failed to acquire lock on the store
    LockError,
    /// A registry slot held a store for a different value type
    TypeMismatch(&'static str),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StoreError::LockError => write!(f, "Failed to acquire lock"),
            StoreError::TypeMismatch(name) => {
                write!(f, "Registered store does not hold values of type {}", name)
            }
        }
    }
}

impl std::error::Error for StoreError {}

//! # sovran-persdata
//!
//! A thread-safe keyed value store with persistence flags and change notification.
//!
//! `sovran-persdata` keeps one value per key for each value type, together with
//! a *persistent* flag and a list of change subscribers. Components that share
//! state agree on a key and a value type, then read, write and observe the value
//! without knowing about each other. At reset points (a level reload, a new
//! session) non-persistent entries are swept away while persistent ones survive.
//!
//! ## Key Features
//!
//! - **Lazy entries**: the first write, persistence change or subscription creates the entry
//! - **Change notification**: subscribers receive `(previous, new)` only when the value actually changes
//! - **Per-type isolation**: each value type has its own store, even for equal keys
//! - **Sweeps**: drop every non-persistent entry, or everything, in one call
//! - **Null-safe keys**: an absent key turns every operation into a no-op
//!
//! "Persistent" only means *survives a sweep*. Nothing is written to disk.
//!
//! ## Usage Examples
//!
//! ### Basic Usage
//!
//! ```rust
//! use sovran_persdata::{PersData, StoreError};
//!
//! fn main() -> Result<(), StoreError> {
//!     let volume = PersData::<String, f32>::new();
//!     let key = "master".to_string();
//!
//!     // Nothing stored yet
//!     let lookup = volume.try_get_value(&key)?;
//!     assert!(!lookup.is_found());
//!     assert_eq!(*lookup.value(), 0.0);
//!
//!     volume.set_value(&key, 0.8)?;
//!     assert_eq!(volume.get_value(&key)?, 0.8);
//!
//!     Ok(())
//! }
//! ```
//!
//! ### Observing Changes
//!
//! ```rust
//! use sovran_persdata::{KeyId, PersData, StoreError};
//! use std::sync::{Arc, Mutex};
//!
//! fn main() -> Result<(), StoreError> {
//!     let health = PersData::<KeyId, u32>::new();
//!     let player = KeyId::unique();
//!     health.set_value(&player, 100)?;
//!
//!     let log = Arc::new(Mutex::new(Vec::new()));
//!     let sink = Arc::clone(&log);
//!     let id = health.subscribe(&player, move |old, new| {
//!         sink.lock().unwrap().push(format!("{} -> {}", old, new));
//!     })?;
//!
//!     health.set_value(&player, 80)?;
//!     health.set_value(&player, 80)?;
//!     health.unsubscribe(&player, id)?;
//!     health.set_value(&player, 50)?;
//!
//!     assert_eq!(*log.lock().unwrap(), vec!["100 -> 80".to_string()]);
//!     Ok(())
//! }
//! ```
//!
//! ### Sweeping at a Reset Point
//!
//! ```rust
//! use sovran_persdata::{KeyInterner, KeyId, StoreError, StoreRegistry};
//!
//! fn main() -> Result<(), StoreError> {
//!     let keys = KeyInterner::new();
//!     let registry = StoreRegistry::<KeyId>::new();
//!
//!     let coins = keys.intern("coins")?;
//!     let door_open = keys.intern("door_open")?;
//!
//!     registry.store::<u32>()?.set_value_with_persistence(&coins, 12, true)?;
//!     registry.store::<bool>()?.set_value_with_persistence(&door_open, true, false)?;
//!
//!     // Level reloads: scene-local state goes away, progress stays
//!     registry.clear_non_persistent()?;
//!
//!     assert_eq!(registry.store::<u32>()?.get_value(&coins)?, 12);
//!     assert!(!registry.store::<bool>()?.try_get_value(&door_open)?.is_found());
//!     Ok(())
//! }
//! ```
//!
//! ### Error Handling
//!
//! Absence is never an error. The only failure is a poisoned lock:
//!
//! ```rust
//! use sovran_persdata::{PersData, StoreError};
//!
//! let store = PersData::<u64, String>::new();
//! match store.get_value(&7) {
//!     Ok(value) => println!("Value: {:?}", value),
//!     Err(StoreError::LockError) => println!("Failed to acquire lock"),
//!     Err(e) => println!("Other error: {}", e),
//! }
//! ```

mod any_store;
mod entry;
mod error;
mod key;
mod registry;
mod store;

pub use entry::{ChangeCallback, SubscriptionId};
pub use error::StoreError;
pub use key::{DataKey, KeyId, KeyInterner};
pub use registry::{KeyExt, StoreRegistry};
pub use store::{Lookup, PersData, StoreValue, DEFAULT_PERSISTENT};

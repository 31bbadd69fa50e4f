//! Common library for the access-control client
//!
//! This crate provides the device-local pieces shared by every service:
//! key-value storage, the TTL cache built on top of it, a clock abstraction
//! and the storage error types.

pub mod cache;
pub mod clock;
pub mod error;
pub mod storage;

/// Example usage of the storage and cache modules
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use common::cache::{CacheConfig, LocalCache};
/// use common::storage::{CARDS_CACHE_KEY, FileStore};
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = Arc::new(FileStore::open("store.json")?);
///     let cache = LocalCache::new(store, CacheConfig::default());
///     cache.set(CARDS_CACHE_KEY, &vec!["04A2B1C3"])?;
///     let cards: Option<Vec<String>> = cache.get(CARDS_CACHE_KEY)?;
///     println!("Cached cards: {:?}", cards);
///     Ok(())
/// }
/// ```
pub fn example_usage() {}

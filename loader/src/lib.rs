//! Per-request batching and caching of keyed lookups.
//!
//! A loader collects every key requested during the current burst of resolver work, fetches them
//! with a single call to its [`Fetch`] implementation once the burst is over, and hands each
//! caller the value for its own key. Outcomes are cached for the lifetime of the loader, so a
//! loader should be created for each request and dropped afterwards.
//!
//! Two shapes are provided:
//! - [`Loader`] resolves one value per key, failing with [`LoadError::NotFound`] when the fetch
//!   does not return the key
//! - [`GroupedLoader`] resolves a collection per key, where a missing key is an empty collection
//!
//! A grouped fetch can be wrapped with [`prime_into`] so every child it returns is also cached in
//! the loader that looks children up directly.

use std::hash::Hash;

mod engine;
mod error;
mod fetch;
mod grouped;
mod options;
mod prime;
mod scheduler;
mod single;

pub use error::{InvalidUsage, LoadError};
pub use fetch::{fetch_fn, group_by, Fetch, FetchFn};
pub use grouped::GroupedLoader;
pub use options::{Options, DEFAULT_DELAY};
pub use prime::{prime_into, PrimeInto};
pub use scheduler::{Manual, Scheduler};
pub use single::Loader;

/// Any value that can be used to look up entries in a loader
pub trait Key: Send + Sync + Eq + Hash + Clone + 'static {}

impl<T> Key for T where T: Send + Sync + Eq + Hash + Clone + 'static {}

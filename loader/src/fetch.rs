use crate::Key;
use async_trait::async_trait;
use std::{collections::HashMap, future::Future, hash::Hash};

/// Resolves a batch of keys against the underlying store
#[async_trait]
pub trait Fetch<K: Key>: Send + Sync + 'static {
    /// The value produced for each key
    type Value: Send + Sync + Clone + 'static;

    /// The error raised when the whole batch could not be fetched
    type Error: Send + Sync + 'static;

    /// Fetch the values for the distinct `keys` in a single request to the store.
    ///
    /// Keys that are missing from the returned map have no value.
    async fn fetch(&self, keys: &[K]) -> Result<HashMap<K, Self::Value>, Self::Error>;
}

/// A [`Fetch`] implementation backed by a closure
///
/// Created with [`fetch_fn`].
#[derive(Clone)]
pub struct FetchFn<F>(F);

/// Use a closure as the fetch for a loader
pub fn fetch_fn<F>(f: F) -> FetchFn<F> {
    FetchFn(f)
}

#[async_trait]
impl<K, V, E, F, Fut> Fetch<K> for FetchFn<F>
where
    K: Key,
    V: Send + Sync + Clone + 'static,
    E: Send + Sync + 'static,
    F: Fn(Vec<K>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HashMap<K, V>, E>> + Send + 'static,
{
    type Value = V;
    type Error = E;

    async fn fetch(&self, keys: &[K]) -> Result<HashMap<K, V>, E> {
        (self.0)(keys.to_vec()).await
    }
}

/// Group `(key, value)` rows into the multi-map expected from a grouped fetch
pub fn group_by<K, V, I>(rows: I) -> HashMap<K, Vec<V>>
where
    K: Eq + Hash,
    I: IntoIterator<Item = (K, V)>,
{
    rows.into_iter()
        .fold(HashMap::new(), |mut groups, (key, value)| {
            groups.entry(key).or_insert_with(Vec::new).push(value);
            groups
        })
}

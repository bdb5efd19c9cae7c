use crate::{engine::Engine, Fetch, Key, LoadError, Options, Scheduler};

/// Batches and caches lookups for one-to-many relations
///
/// The fetch returns every child for the requested parents at once, grouped by parent key. A
/// parent that is missing from the fetch result has no children.
pub struct GroupedLoader<K: Key, F: Fetch<K>> {
    engine: Engine<K, F>,
}

impl<K: Key, F: Fetch<K>> Clone for GroupedLoader<K, F> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
        }
    }
}

impl<K, T, F> GroupedLoader<K, F>
where
    K: Key,
    T: Send + Sync + Clone + 'static,
    F: Fetch<K, Value = Vec<T>>,
{
    /// Create a loader that dispatches each batch once the current burst of loads is over
    pub fn new<S: Scheduler>(fetch: F, scheduler: S) -> Self {
        Self::with_options(fetch, scheduler, Options::default())
    }

    /// Create a loader with custom batching behaviour
    pub fn with_options<S: Scheduler>(fetch: F, scheduler: S, options: Options) -> Self {
        Self {
            engine: Engine::new(fetch, scheduler, options),
        }
    }

    /// Load the children of a parent
    pub async fn load(&self, key: K) -> Result<Vec<T>, LoadError<F::Error>> {
        let children = self.engine.resolve(key).await?;
        Ok(children.unwrap_or_default())
    }

    /// Load the children of many parents, in the order they were requested
    pub async fn load_many<I>(&self, keys: I) -> Result<Vec<Vec<T>>, LoadError<F::Error>>
    where
        I: IntoIterator<Item = K>,
    {
        let keys = keys.into_iter().collect::<Vec<_>>();
        let groups = self.engine.resolve_many(&keys).await?;
        Ok(groups.into_iter().map(Option::unwrap_or_default).collect())
    }

    /// Fetch the pending batch now, without waiting for the scheduler
    pub async fn flush(&self) {
        self.engine.flush().await
    }

    /// Add the children of a parent to the cache if it has not been requested yet
    pub fn prime(&self, key: K, children: Vec<T>) -> bool {
        self.engine.prime(key, children)
    }

    /// Forget the cached children of a parent so the next load fetches them again
    pub fn clear(&self, key: &K) {
        self.engine.clear(key)
    }

    /// Forget the cached children of every parent
    pub fn clear_all(&self) {
        self.engine.clear_all()
    }

    /// Drop the pending batch without fetching it
    pub fn cancel(&self) {
        self.engine.cancel()
    }
}

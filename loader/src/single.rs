use crate::{engine::Engine, Fetch, Key, LoadError, Options, Scheduler};

/// Batches and caches lookups that resolve to at most one value per key
///
/// ```ignore
/// let speakers = Loader::new(SpeakerFetch(db.clone()), tokio::spawn);
/// let speaker = speakers.load(1).await?;
/// ```
pub struct Loader<K: Key, F: Fetch<K>> {
    engine: Engine<K, F>,
}

impl<K: Key, F: Fetch<K>> Clone for Loader<K, F> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
        }
    }
}

impl<K: Key, F: Fetch<K>> Loader<K, F> {
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

    /// Load the value for a key
    ///
    /// Fails with [`LoadError::NotFound`] if the fetch does not produce a value for the key.
    pub async fn load(&self, key: K) -> Result<F::Value, LoadError<F::Error>> {
        self.engine.resolve(key).await?.ok_or(LoadError::NotFound)
    }

    /// Load the value for a key, treating a missing value as `None`
    pub async fn load_optional(&self, key: K) -> Result<Option<F::Value>, LoadError<F::Error>> {
        self.engine.resolve(key).await
    }

    /// Load the values for many keys, in the order they were requested
    ///
    /// Keys without a value are `None`, so a missing key never fails the others.
    pub async fn load_many<I>(&self, keys: I) -> Result<Vec<Option<F::Value>>, LoadError<F::Error>>
    where
        I: IntoIterator<Item = K>,
    {
        let keys = keys.into_iter().collect::<Vec<_>>();
        self.engine.resolve_many(&keys).await
    }

    /// Fetch the pending batch now, without waiting for the scheduler
    pub async fn flush(&self) {
        self.engine.flush().await
    }

    /// Add a value to the cache if the key has not been requested yet
    ///
    /// Returns whether the value was stored.
    pub fn prime(&self, key: K, value: F::Value) -> bool {
        self.engine.prime(key, value)
    }

    /// Overwrite the cached value for a key, typically after the underlying record changed
    pub fn replace(&self, key: K, value: F::Value) {
        self.engine.replace(key, value)
    }

    /// Forget the cached value for a key so the next load fetches it again
    pub fn clear(&self, key: &K) {
        self.engine.clear(key)
    }

    /// Forget every cached value
    pub fn clear_all(&self) {
        self.engine.clear_all()
    }

    /// Drop the pending batch without fetching it
    ///
    /// Requests waiting on the batch fail with [`LoadError::Cancelled`] and any later load fails
    /// with [`LoadError::InvalidUsage`].
    pub fn cancel(&self) {
        self.engine.cancel()
    }
}

#[cfg(test)]
mod tests {
    use super::Loader;
    use crate::{fetch_fn, Fetch, LoadError, Manual, Options};
    use futures::{future::join_all, poll};
    use std::{
        collections::HashMap,
        convert::Infallible,
        sync::{Arc, Mutex},
        time::Duration,
    };

    type Calls = Arc<Mutex<Vec<Vec<i32>>>>;

    /// Values exist for every even key
    fn evens(calls: Calls) -> impl Fetch<i32, Value = String, Error = Infallible> {
        fetch_fn(move |keys: Vec<i32>| {
            calls.lock().unwrap().push(keys.clone());
            async move {
                let found = keys
                    .into_iter()
                    .filter(|key| key % 2 == 0)
                    .map(|key| (key, format!("value {key}")))
                    .collect::<HashMap<_, _>>();
                Ok::<_, Infallible>(found)
            }
        })
    }

    fn sorted(calls: &Calls) -> Vec<Vec<i32>> {
        calls
            .lock()
            .unwrap()
            .iter()
            .map(|keys| {
                let mut keys = keys.clone();
                keys.sort();
                keys
            })
            .collect()
    }

    #[tokio::test]
    async fn cached_key_is_not_fetched_again() {
        let calls = Calls::default();
        let loader = Loader::new(evens(calls.clone()), tokio::spawn);

        assert_eq!(loader.load(2).await.unwrap(), "value 2");
        assert_eq!(loader.load(2).await.unwrap(), "value 2");
        assert_eq!(sorted(&calls), vec![vec![2]]);
    }

    #[tokio::test]
    async fn in_flight_key_is_shared() {
        let calls = Calls::default();
        let loader = Loader::new(evens(calls.clone()), tokio::spawn);

        let (a, b) = tokio::join!(loader.load(4), loader.load(4));
        assert_eq!(a.unwrap(), "value 4");
        assert_eq!(b.unwrap(), "value 4");
        assert_eq!(sorted(&calls), vec![vec![4]]);
    }

    #[tokio::test]
    async fn missing_key_is_not_found() {
        let loader = Loader::new(evens(Calls::default()), tokio::spawn);

        let error = loader.load(3).await.unwrap_err();
        assert!(error.is_not_found());
        assert_eq!(loader.load_optional(3).await.unwrap(), None);
    }

    #[tokio::test]
    async fn load_many_deduplicates_and_keeps_order() {
        let calls = Calls::default();
        let loader = Loader::new(evens(calls.clone()), tokio::spawn);
        loader.load(2).await.unwrap();

        let values = loader.load_many([6, 2, 3, 6]).await.unwrap();
        assert_eq!(
            values,
            vec![
                Some(String::from("value 6")),
                Some(String::from("value 2")),
                None,
                Some(String::from("value 6")),
            ]
        );
        assert_eq!(sorted(&calls), vec![vec![2], vec![3, 6]]);
    }

    #[tokio::test]
    async fn concurrent_loads_share_one_fetch() {
        let calls = Calls::default();
        let loader = Loader::new(evens(calls.clone()), tokio::spawn);

        let results = join_all((1..=6).map(|key| loader.load_optional(key))).await;
        assert_eq!(results.len(), 6);
        assert_eq!(sorted(&calls), vec![vec![1, 2, 3, 4, 5, 6]]);
    }

    #[tokio::test]
    async fn batches_are_split_by_max_size() {
        let calls = Calls::default();
        let options = Options::new(None, Some(2)).unwrap();
        let loader = Loader::with_options(evens(calls.clone()), tokio::spawn, options);

        let values = loader.load_many([1, 2, 3, 4, 5]).await.unwrap();
        assert_eq!(values.iter().filter(|value| value.is_some()).count(), 2);
        assert_eq!(sorted(&calls), vec![vec![1, 2], vec![3, 4], vec![5]]);
    }

    #[tokio::test]
    async fn delay_widens_the_batch_window() {
        let calls = Calls::default();
        let options = Options::new(Some(Duration::from_millis(20)), None).unwrap();
        let loader = Loader::with_options(evens(calls.clone()), tokio::spawn, options);

        let first = loader.load(2);
        let second = async {
            tokio::time::sleep(Duration::from_millis(1)).await;
            loader.load(4).await
        };
        let (first, second) = tokio::join!(first, second);

        assert!(first.is_ok());
        assert!(second.is_ok());
        assert_eq!(sorted(&calls), vec![vec![2, 4]]);
    }

    #[tokio::test]
    async fn manual_scheduler_waits_for_flush() {
        let calls = Calls::default();
        let loader = Loader::new(evens(calls.clone()), Manual);

        let mut pending = Box::pin(loader.load(8));
        assert!(poll!(&mut pending).is_pending());

        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(calls.lock().unwrap().is_empty());

        loader.flush().await;
        assert_eq!(pending.await.unwrap(), "value 8");
        assert_eq!(sorted(&calls), vec![vec![8]]);
    }

    #[tokio::test]
    async fn primed_value_skips_fetch() {
        let calls = Calls::default();
        let loader = Loader::new(evens(calls.clone()), tokio::spawn);

        assert!(loader.prime(1, String::from("primed")));
        assert!(!loader.prime(1, String::from("ignored")));

        assert_eq!(loader.load(1).await.unwrap(), "primed");
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn replaced_value_overwrites_cache() {
        let calls = Calls::default();
        let loader = Loader::new(evens(calls.clone()), tokio::spawn);

        assert_eq!(loader.load(2).await.unwrap(), "value 2");
        loader.replace(2, String::from("renamed"));

        assert_eq!(loader.load(2).await.unwrap(), "renamed");
        assert_eq!(sorted(&calls), vec![vec![2]]);
    }

    #[tokio::test]
    async fn replace_answers_pending_requests() {
        let calls = Calls::default();
        let loader = Loader::new(evens(calls.clone()), Manual);

        let mut pending = Box::pin(loader.load(4));
        assert!(poll!(&mut pending).is_pending());

        loader.replace(4, String::from("written"));
        assert_eq!(pending.await.unwrap(), "written");

        loader.flush().await;
        assert_eq!(loader.load(4).await.unwrap(), "written");
    }

    #[tokio::test]
    async fn cleared_key_is_fetched_again() {
        let calls = Calls::default();
        let loader = Loader::new(evens(calls.clone()), tokio::spawn);

        assert!(loader.prime(2, String::from("stale")));
        loader.clear(&2);

        assert_eq!(loader.load(2).await.unwrap(), "value 2");
        assert_eq!(sorted(&calls), vec![vec![2]]);
    }

    #[tokio::test]
    async fn cancel_drops_pending_batch() {
        let calls = Calls::default();
        let loader = Loader::new(evens(calls.clone()), tokio::spawn);

        let mut pending = Box::pin(loader.load(2));
        assert!(poll!(&mut pending).is_pending());

        loader.cancel();
        assert!(matches!(pending.await, Err(LoadError::Cancelled)));

        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(calls.lock().unwrap().is_empty());

        let error = loader.load(2).await.unwrap_err();
        assert!(matches!(error, LoadError::InvalidUsage(_)));
    }
}

use crate::{error::LoadError, Fetch, InvalidUsage, Key, Options, Scheduler};
use futures::{
    channel::oneshot,
    future::{join_all, FutureExt},
};
use std::{
    any::type_name,
    collections::{hash_map::Entry, HashMap},
    mem,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
};
use tracing::{debug, warn};

/// The outcome of fetching a key, shared by everyone who requested it
///
/// `None` means the fetch succeeded but did not produce a value for the key.
pub(crate) type Resolution<V, E> = Result<Option<V>, Arc<E>>;

/// Batching and caching shared by every loader shape
pub(crate) struct Engine<K: Key, F: Fetch<K>> {
    inner: Arc<Inner<K, F>>,
}

impl<K: Key, F: Fetch<K>> Clone for Engine<K, F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<K: Key, F: Fetch<K>> {
    fetch: F,
    scheduler: Box<dyn Scheduler>,
    options: Options,
    state: Mutex<State<K, F::Value, F::Error>>,
}

struct State<K, V, E> {
    /// Keys whose fetch has completed
    resolved: HashMap<K, Resolution<V, E>>,
    /// Requests for keys that are queued or in flight
    waiting: HashMap<K, Vec<oneshot::Sender<Resolution<V, E>>>>,
    /// Keys queued since the last dispatch, in the order they were first requested
    batch: Vec<K>,
    /// Whether a dispatch has been handed to the scheduler for the current batch
    scheduled: bool,
    cancelled: bool,
}

/// A request's view of a single distinct key
enum Slot<V, E> {
    Ready(Resolution<V, E>),
    Waiting(oneshot::Receiver<Resolution<V, E>>),
}

impl<K: Key, F: Fetch<K>> Engine<K, F> {
    pub(crate) fn new<S: Scheduler>(fetch: F, scheduler: S, options: Options) -> Self {
        let state = State {
            resolved: HashMap::new(),
            waiting: HashMap::new(),
            batch: Vec::new(),
            scheduled: false,
            cancelled: false,
        };

        Self {
            inner: Arc::new(Inner {
                fetch,
                scheduler: Box::new(scheduler),
                options,
                state: Mutex::new(state),
            }),
        }
    }

    /// Resolve a single key
    pub(crate) async fn resolve(&self, key: K) -> Result<Option<F::Value>, LoadError<F::Error>> {
        let mut values = self.resolve_many(std::slice::from_ref(&key)).await?;
        Ok(values.pop().flatten())
    }

    /// Resolve every key, in order. Repeated keys are only requested once.
    pub(crate) async fn resolve_many(
        &self,
        keys: &[K],
    ) -> Result<Vec<Option<F::Value>>, LoadError<F::Error>> {
        let mut slots = Vec::new();
        let mut positions = Vec::with_capacity(keys.len());

        let schedule = {
            let mut state = self.inner.lock();
            if state.cancelled {
                return Err(InvalidUsage::new("loader was used after being cancelled").into());
            }

            let mut indexes = HashMap::with_capacity(keys.len());
            for key in keys {
                let index = *indexes.entry(key).or_insert_with(|| {
                    slots.push(state.register(key));
                    slots.len() - 1
                });
                positions.push(index);
            }

            state.claim_dispatch()
        };

        if schedule {
            Inner::schedule(&self.inner);
        }

        let mut resolutions = Vec::with_capacity(slots.len());
        for slot in slots {
            let resolution = match slot {
                Slot::Ready(resolution) => resolution,
                Slot::Waiting(receiver) => receiver.await.map_err(|_| LoadError::Cancelled)?,
            };
            resolutions.push(resolution);
        }

        positions
            .into_iter()
            .map(|index| match &resolutions[index] {
                Ok(value) => Ok(value.clone()),
                Err(error) => Err(LoadError::FetchFailed(Arc::clone(error))),
            })
            .collect()
    }

    /// Dispatch the pending batch immediately
    ///
    /// The dispatch is also handed to the scheduler, so it runs to completion even if the caller
    /// stops waiting for the flush.
    pub(crate) async fn flush(&self) {
        let inner = Arc::clone(&self.inner);
        let dispatch = async move { inner.dispatch().await }.boxed().shared();

        self.inner.scheduler.schedule(dispatch.clone().boxed());
        dispatch.await
    }

    /// Seed the cache with a value, returns whether the key was previously unknown
    pub(crate) fn prime(&self, key: K, value: F::Value) -> bool {
        let mut state = self.inner.lock();
        if state.resolved.contains_key(&key) || state.waiting.contains_key(&key) {
            return false;
        }

        state.resolved.insert(key, Ok(Some(value)));
        true
    }

    /// Store a value for a key, overwriting whatever was cached
    ///
    /// Anyone still waiting on the key receives the new value.
    pub(crate) fn replace(&self, key: K, value: F::Value) {
        let mut state = self.inner.lock();
        state.complete(key.clone(), Ok(Some(value.clone())));
        state.resolved.insert(key, Ok(Some(value)));
    }

    /// Forget the cached outcome for a key, the next load fetches it again
    pub(crate) fn clear(&self, key: &K) {
        self.inner.lock().resolved.remove(key);
    }

    /// Forget every cached outcome
    pub(crate) fn clear_all(&self) {
        self.inner.lock().resolved.clear();
    }

    /// Drop the pending batch without fetching it and reject any further loads
    pub(crate) fn cancel(&self) {
        let mut state = self.inner.lock();
        state.cancelled = true;

        let batch = mem::take(&mut state.batch);
        for key in &batch {
            state.waiting.remove(key);
        }

        debug!(
            fetch = type_name::<F>(),
            keys = batch.len(),
            "cancelled pending batch"
        );
    }
}

impl<K: Key, F: Fetch<K>> Inner<K, F> {
    fn lock(&self) -> MutexGuard<'_, State<K, F::Value, F::Error>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hand a dispatch of the current batch to the scheduler
    ///
    /// The dispatch only holds a weak reference, so a scope that is dropped before the batch is
    /// dispatched never issues the fetch.
    fn schedule(this: &Arc<Self>) {
        let inner = Arc::downgrade(this);
        let delay = this.options.delay();

        let dispatch = async move {
            if delay.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(delay).await;
            }

            match Weak::upgrade(&inner) {
                Some(inner) => inner.dispatch().await,
                None => debug!(fetch = type_name::<F>(), "scope ended before dispatch"),
            }
        };

        this.scheduler.schedule(dispatch.boxed());
    }

    /// Take the pending batch and fetch it
    async fn dispatch(&self) {
        let keys = {
            let mut state = self.lock();
            state.scheduled = false;
            mem::take(&mut state.batch)
        };

        if keys.is_empty() {
            return;
        }

        let size = self
            .options
            .max_batch_size()
            .map_or(keys.len(), |size| size.get());
        join_all(keys.chunks(size).map(|chunk| self.run(chunk.to_vec()))).await;
    }

    /// Fetch a chunk of keys and distribute the results to everyone waiting on them
    async fn run(&self, keys: Vec<K>) {
        debug!(
            fetch = type_name::<F>(),
            keys = keys.len(),
            "dispatching batch"
        );

        let guard = InFlight::new(self, &keys);
        let outcome = self.fetch.fetch(&keys).await;
        guard.disarm();

        let mut state = self.lock();
        match outcome {
            Ok(mut found) => {
                for key in keys {
                    let value = found.remove(&key);
                    state.complete(key, Ok(value));
                }
            }
            Err(error) => {
                warn!(
                    fetch = type_name::<F>(),
                    keys = keys.len(),
                    "batch fetch failed"
                );

                let error = Arc::new(error);
                for key in keys {
                    state.complete(key, Err(Arc::clone(&error)));
                }
            }
        }
    }
}

impl<K: Key, V: Clone, E> State<K, V, E> {
    /// Attach a request for `key`, queueing it if nobody has asked for it yet
    fn register(&mut self, key: &K) -> Slot<V, E> {
        if let Some(resolution) = self.resolved.get(key) {
            return Slot::Ready(resolution.clone());
        }

        let (sender, receiver) = oneshot::channel();
        match self.waiting.entry(key.clone()) {
            Entry::Occupied(mut entry) => entry.get_mut().push(sender),
            Entry::Vacant(entry) => {
                entry.insert(vec![sender]);
                self.batch.push(key.clone());
            }
        }

        Slot::Waiting(receiver)
    }

    /// Whether the caller is responsible for scheduling a dispatch
    fn claim_dispatch(&mut self) -> bool {
        if self.batch.is_empty() || self.scheduled {
            return false;
        }

        self.scheduled = true;
        true
    }

    /// Record the outcome for a key and wake everyone waiting on it
    ///
    /// Keys nobody is waiting on anymore were replaced or cancelled in the meantime, their
    /// outcome is discarded.
    fn complete(&mut self, key: K, resolution: Resolution<V, E>) {
        let Some(waiters) = self.waiting.remove(&key) else {
            return;
        };

        for waiter in waiters {
            // the requester may have stopped waiting
            let _ = waiter.send(resolution.clone());
        }

        self.resolved.insert(key, resolution);
    }
}

/// Puts the keys of an in-flight chunk back in the batch if its fetch is abandoned midway
///
/// The requests stay attached, so the keys go out with the next dispatch. Once the loader is
/// cancelled the requests are released instead.
struct InFlight<'a, K: Key, F: Fetch<K>> {
    inner: &'a Inner<K, F>,
    keys: &'a [K],
    armed: bool,
}

impl<'a, K: Key, F: Fetch<K>> InFlight<'a, K, F> {
    fn new(inner: &'a Inner<K, F>, keys: &'a [K]) -> Self {
        Self {
            inner,
            keys,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl<K: Key, F: Fetch<K>> Drop for InFlight<'_, K, F> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let mut state = self.inner.lock();
        if state.cancelled {
            for key in self.keys {
                state.waiting.remove(key);
            }
        } else {
            let requeued = self
                .keys
                .iter()
                .filter(|key| state.waiting.contains_key(*key))
                .cloned()
                .collect::<Vec<_>>();
            state.batch.splice(0..0, requeued);
        }

        debug!(
            fetch = type_name::<F>(),
            keys = self.keys.len(),
            cancelled = state.cancelled,
            "in-flight batch abandoned"
        );
    }
}

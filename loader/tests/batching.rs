use futures::{future::join_all, poll};
use loader::{fetch_fn, group_by, Fetch, GroupedLoader, LoadError, Loader, Manual, Options};
use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex},
    time::Duration,
};

type Calls = Arc<Mutex<Vec<Vec<u32>>>>;

#[derive(Debug)]
struct StoreUnavailable;

impl fmt::Display for StoreUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "store unavailable")
    }
}

impl std::error::Error for StoreUnavailable {}

/// A store holding values for the keys 1, 2 and 4
fn store(calls: Calls) -> impl Fetch<u32, Value = String, Error = StoreUnavailable> {
    fetch_fn(move |keys: Vec<u32>| {
        calls.lock().unwrap().push(keys.clone());
        async move {
            let found = keys
                .into_iter()
                .filter(|key| matches!(*key, 1 | 2 | 4))
                .map(|key| (key, format!("v{key}")))
                .collect::<HashMap<_, _>>();
            Ok::<_, StoreUnavailable>(found)
        }
    })
}

/// A store that is always down
fn broken(calls: Calls) -> impl Fetch<u32, Value = String, Error = StoreUnavailable> {
    fetch_fn(move |keys: Vec<u32>| {
        calls.lock().unwrap().push(keys);
        async move { Err::<HashMap<u32, String>, _>(StoreUnavailable) }
    })
}

/// A store that takes a while to respond
fn slow(calls: Calls) -> impl Fetch<u32, Value = String, Error = StoreUnavailable> {
    fetch_fn(move |keys: Vec<u32>| {
        calls.lock().unwrap().push(keys.clone());
        async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let found = keys
                .into_iter()
                .map(|key| (key, format!("v{key}")))
                .collect::<HashMap<_, _>>();
            Ok::<_, StoreUnavailable>(found)
        }
    })
}

fn fetched(calls: &Calls) -> Vec<Vec<u32>> {
    let mut calls = calls.lock().unwrap().clone();
    for keys in &mut calls {
        keys.sort();
    }
    calls
}

#[tokio::test]
async fn concurrent_loads_are_fetched_once_with_missing_keys_not_found() {
    let calls = Calls::default();
    let loader = Loader::new(store(calls.clone()), tokio::spawn);

    let results = join_all((1..=5).map(|key| loader.load(key))).await;

    assert_eq!(fetched(&calls), vec![vec![1, 2, 3, 4, 5]]);
    assert_eq!(results[0].as_ref().unwrap(), "v1");
    assert_eq!(results[1].as_ref().unwrap(), "v2");
    assert!(matches!(results[2], Err(LoadError::NotFound)));
    assert_eq!(results[3].as_ref().unwrap(), "v4");
    assert!(matches!(results[4], Err(LoadError::NotFound)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_loads_are_fetched_once_on_a_multi_threaded_runtime() {
    for _ in 0..50 {
        let calls = Calls::default();
        let loader = Loader::new(store(calls.clone()), tokio::spawn);

        let results = join_all((1..=5).map(|key| loader.load_optional(key))).await;

        assert_eq!(results.len(), 5);
        assert_eq!(fetched(&calls), vec![vec![1, 2, 3, 4, 5]]);
    }
}

#[tokio::test]
async fn repeated_loads_hit_the_cache() {
    let calls = Calls::default();
    let loader = Loader::new(store(calls.clone()), tokio::spawn);

    loader.load(1).await.unwrap();
    loader.load(1).await.unwrap();
    let missing = loader.load(3).await;
    let missing_again = loader.load(3).await;

    assert!(matches!(missing, Err(LoadError::NotFound)));
    assert!(matches!(missing_again, Err(LoadError::NotFound)));
    assert_eq!(fetched(&calls), vec![vec![1], vec![3]]);
}

#[tokio::test]
async fn scopes_do_not_share_cached_values() {
    let calls = Calls::default();
    let first = Loader::new(store(calls.clone()), tokio::spawn);
    let second = Loader::new(store(calls.clone()), tokio::spawn);

    first.load(2).await.unwrap();
    second.load(2).await.unwrap();

    assert_eq!(fetched(&calls), vec![vec![2], vec![2]]);
}

#[tokio::test]
async fn fetch_failure_fails_the_whole_batch() {
    let calls = Calls::default();
    let loader = Loader::new(broken(calls.clone()), tokio::spawn);

    let results = join_all([1, 2, 3].map(|key| loader.load(key))).await;

    let errors = results
        .into_iter()
        .map(|result| match result {
            Err(LoadError::FetchFailed(error)) => error,
            other => panic!("expected a fetch failure, got {other:?}"),
        })
        .collect::<Vec<_>>();
    assert!(Arc::ptr_eq(&errors[0], &errors[1]));
    assert!(Arc::ptr_eq(&errors[1], &errors[2]));
    assert_eq!(fetched(&calls), vec![vec![1, 2, 3]]);

    // failures are remembered for the rest of the scope
    assert!(matches!(loader.load(2).await, Err(LoadError::FetchFailed(_))));
    assert_eq!(calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn dropped_scope_never_fetches() {
    let calls = Calls::default();
    let loader = Loader::new(store(calls.clone()), tokio::spawn);

    {
        let mut pending = Box::pin(loader.load(1));
        assert!(poll!(&mut pending).is_pending());
    }
    drop(loader);

    tokio::time::sleep(Duration::from_millis(5)).await;
    assert!(calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn abandoned_caller_does_not_cancel_siblings() {
    let calls = Calls::default();
    let loader = Loader::new(slow(calls.clone()), tokio::spawn);

    let mut abandoned = Box::pin(loader.load(1));
    assert!(poll!(&mut abandoned).is_pending());

    let sibling = loader.load(2);
    let other = async {
        tokio::task::yield_now().await;
        drop(abandoned);
    };
    let (sibling, ()) = tokio::join!(sibling, other);

    assert_eq!(sibling.unwrap(), "v2");
    assert_eq!(fetched(&calls), vec![vec![1, 2]]);

    // the abandoned key still completed and was cached
    assert_eq!(loader.load(1).await.unwrap(), "v1");
    assert_eq!(calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn abandoned_flush_still_delivers_the_batch() {
    let calls = Calls::default();
    let options = Options::new(Some(Duration::from_secs(60)), None).unwrap();
    let loader = Loader::with_options(slow(calls.clone()), tokio::spawn, options);

    let mut first = Box::pin(loader.load(1));
    let mut second = Box::pin(loader.load(2));
    assert!(poll!(&mut first).is_pending());
    assert!(poll!(&mut second).is_pending());

    let flushed = tokio::time::timeout(Duration::from_millis(5), loader.flush()).await;
    assert!(flushed.is_err());

    assert_eq!(first.await.unwrap(), "v1");
    assert_eq!(second.await.unwrap(), "v2");
    assert_eq!(fetched(&calls), vec![vec![1, 2]]);
}

#[tokio::test]
async fn abandoned_manual_flush_keeps_callers_waiting_for_the_next_one() {
    let calls = Calls::default();
    let loader = Loader::new(slow(calls.clone()), Manual);

    let mut first = Box::pin(loader.load(1));
    let mut second = Box::pin(loader.load(2));
    assert!(poll!(&mut first).is_pending());
    assert!(poll!(&mut second).is_pending());

    let flushed = tokio::time::timeout(Duration::from_millis(5), loader.flush()).await;
    assert!(flushed.is_err());
    assert!(poll!(&mut first).is_pending());

    loader.flush().await;
    assert_eq!(first.await.unwrap(), "v1");
    assert_eq!(second.await.unwrap(), "v2");
    assert_eq!(fetched(&calls), vec![vec![1, 2], vec![1, 2]]);
}

#[tokio::test]
async fn grouped_loader_resolves_missing_parents_to_empty() {
    let loader = GroupedLoader::new(
        fetch_fn(|parents: Vec<u32>| async move {
            let rows = parents
                .into_iter()
                .filter(|parent| *parent != 7)
                .flat_map(|parent| [(parent, parent * 10), (parent, parent * 10 + 1)]);
            Ok::<_, StoreUnavailable>(group_by(rows))
        }),
        tokio::spawn,
    );

    let (found, missing) = tokio::join!(loader.load(1), loader.load(7));
    assert_eq!(found.unwrap(), vec![10, 11]);
    assert_eq!(missing.unwrap(), Vec::<u32>::new());
}

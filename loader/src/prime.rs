use crate::{Fetch, Key, Loader};
use async_trait::async_trait;
use std::collections::HashMap;

/// A grouped fetch that also caches each child it returns in a by-key [`Loader`]
///
/// Created with [`prime_into`].
pub struct PrimeInto<F, K: Key, T: Fetch<K>> {
    fetch: F,
    target: Loader<K, T>,
    key_of: fn(&T::Value) -> K,
}

/// Prime `target` with every child returned by `fetch`, keyed by `key_of`
///
/// Children the target already knows about are left alone.
pub fn prime_into<F, K, T>(
    fetch: F,
    target: Loader<K, T>,
    key_of: fn(&T::Value) -> K,
) -> PrimeInto<F, K, T>
where
    K: Key,
    T: Fetch<K>,
{
    PrimeInto {
        fetch,
        target,
        key_of,
    }
}

#[async_trait]
impl<P, F, K, T> Fetch<P> for PrimeInto<F, K, T>
where
    P: Key,
    K: Key,
    T: Fetch<K>,
    F: Fetch<P, Value = Vec<T::Value>>,
{
    type Value = Vec<T::Value>;
    type Error = F::Error;

    async fn fetch(&self, keys: &[P]) -> Result<HashMap<P, Self::Value>, Self::Error> {
        let groups = self.fetch.fetch(keys).await?;

        for child in groups.values().flatten() {
            self.target.prime((self.key_of)(child), child.clone());
        }

        Ok(groups)
    }
}

#[cfg(test)]
mod tests {
    use super::prime_into;
    use crate::{fetch_fn, group_by, Fetch, GroupedLoader, Loader};
    use std::{
        collections::HashMap,
        convert::Infallible,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
    };

    type Book = (u32, &'static str);

    /// (author, book) rows
    const SHELF: &[(u32, Book)] = &[
        (1, (10, "Dune")),
        (1, (11, "Children of Dune")),
        (2, (20, "Solaris")),
    ];

    fn books_by_id(fetches: Arc<AtomicUsize>) -> impl Fetch<u32, Value = Book, Error = Infallible> {
        fetch_fn(move |ids: Vec<u32>| {
            fetches.fetch_add(1, Ordering::SeqCst);
            async move {
                let found = SHELF
                    .iter()
                    .map(|(_, book)| *book)
                    .filter(|(id, _)| ids.contains(id))
                    .map(|book| (book.0, book))
                    .collect::<HashMap<_, _>>();
                Ok::<_, Infallible>(found)
            }
        })
    }

    fn books_by_author() -> impl Fetch<u32, Value = Vec<Book>, Error = Infallible> {
        fetch_fn(|authors: Vec<u32>| async move {
            let rows = SHELF
                .iter()
                .filter(|(author, _)| authors.contains(author))
                .copied();
            Ok::<_, Infallible>(group_by(rows))
        })
    }

    #[tokio::test]
    async fn children_are_cached_by_id() {
        let fetches = Arc::new(AtomicUsize::new(0));
        let by_id = Loader::new(books_by_id(fetches.clone()), tokio::spawn);
        let by_author = GroupedLoader::new(
            prime_into(books_by_author(), by_id.clone(), |book: &Book| book.0),
            tokio::spawn,
        );

        let books = by_author.load(1).await.unwrap();
        assert_eq!(books.len(), 2);

        assert_eq!(by_id.load(10).await.unwrap(), (10, "Dune"));
        assert_eq!(by_id.load(11).await.unwrap(), (11, "Children of Dune"));
        assert_eq!(fetches.load(Ordering::SeqCst), 0);

        assert_eq!(by_id.load(20).await.unwrap(), (20, "Solaris"));
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cached_children_are_not_overwritten() {
        let by_id = Loader::new(books_by_id(Arc::default()), tokio::spawn);
        assert!(by_id.prime(10, (10, "Dune (revised)")));

        let by_author = GroupedLoader::new(
            prime_into(books_by_author(), by_id.clone(), |book: &Book| book.0),
            tokio::spawn,
        );
        by_author.load(1).await.unwrap();

        assert_eq!(by_id.load(10).await.unwrap(), (10, "Dune (revised)"));
    }
}

use async_graphql::{
    connection::{Connection, Edge},
    OutputType,
};

/// Page size when the client asks for neither `first` nor `last`
const DEFAULT_PAGE_SIZE: usize = 10;

/// The most items a single page may hold
const MAX_PAGE_SIZE: usize = 50;

/// The slice of a listing selected by the connection arguments
///
/// Cursors are offsets into the listing.
#[derive(Debug, Eq, PartialEq)]
pub(crate) struct Window {
    pub offset: usize,
    pub limit: usize,
    has_previous: bool,
    has_next: bool,
}

impl Window {
    pub fn new(
        total: usize,
        after: Option<usize>,
        before: Option<usize>,
        first: Option<usize>,
        last: Option<usize>,
    ) -> Self {
        let first = match (first, last) {
            (None, None) => Some(DEFAULT_PAGE_SIZE),
            (first, _) => first.map(|first| first.min(MAX_PAGE_SIZE)),
        };
        let last = last.map(|last| last.min(MAX_PAGE_SIZE));

        let mut start = after.map_or(0, |after| after.saturating_add(1)).min(total);
        let mut end = before.map_or(total, |before| before.min(total)).max(start);

        if let Some(first) = first {
            end = end.min(start + first);
        }
        if let Some(last) = last {
            start = start.max(end.saturating_sub(last));
        }

        Self {
            offset: start,
            limit: end - start,
            has_previous: start > 0,
            has_next: end < total,
        }
    }

    /// Build the connection from the items in the window
    pub fn connection<T: OutputType>(&self, items: Vec<T>) -> Connection<usize, T> {
        let mut connection = Connection::new(self.has_previous, self.has_next);
        connection.edges.extend(
            items
                .into_iter()
                .enumerate()
                .map(|(i, item)| Edge::new(self.offset + i, item)),
        );
        connection
    }
}

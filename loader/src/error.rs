use std::{
    fmt::{self, Display, Formatter},
    sync::Arc,
};

/// Errors that can occur while loading a key
#[derive(Debug)]
pub enum LoadError<E> {
    /// The fetch completed, but did not produce a value for the key
    NotFound,
    /// The fetch for the batch containing the key failed
    ///
    /// Every key in the batch shares the same underlying error.
    FetchFailed(Arc<E>),
    /// The loader was dropped or cancelled before the key's batch completed
    Cancelled,
    /// The loader was used incorrectly
    InvalidUsage(InvalidUsage),
}

impl<E> LoadError<E> {
    /// Whether the key simply had no value
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// The underlying fetch error, if any
    pub fn fetch_error(&self) -> Option<&Arc<E>> {
        match self {
            Self::FetchFailed(error) => Some(error),
            _ => None,
        }
    }
}

impl<E: Display> Display for LoadError<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "no value exists for the requested key"),
            Self::FetchFailed(error) => write!(f, "failed to fetch batch: {error}"),
            Self::Cancelled => write!(f, "load was cancelled before its batch completed"),
            Self::InvalidUsage(error) => write!(f, "{error}"),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for LoadError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::FetchFailed(error) => Some(error.as_ref()),
            Self::InvalidUsage(error) => Some(error),
            Self::NotFound | Self::Cancelled => None,
        }
    }
}

impl<E> From<InvalidUsage> for LoadError<E> {
    fn from(error: InvalidUsage) -> Self {
        Self::InvalidUsage(error)
    }
}

#[cfg(feature = "graphql")]
impl<E> async_graphql::ErrorExtensions for LoadError<E>
where
    E: Display + Send + Sync + 'static,
{
    fn extend(&self) -> async_graphql::Error {
        let code = match self {
            Self::NotFound => "NOT_FOUND",
            Self::FetchFailed(_) => "FETCH_FAILED",
            Self::Cancelled => "CANCELLED",
            Self::InvalidUsage(_) => "INVALID_USAGE",
        };

        async_graphql::Error::new(self.to_string())
            .extend_with(|_, extensions| extensions.set("code", code))
    }
}

/// Raised when a loader is configured or used incorrectly
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct InvalidUsage(&'static str);

impl InvalidUsage {
    pub(crate) const fn new(reason: &'static str) -> Self {
        Self(reason)
    }

    /// Why the usage was rejected
    pub fn reason(&self) -> &'static str {
        self.0
    }
}

impl Display for InvalidUsage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "invalid loader usage: {}", self.0)
    }
}

impl std::error::Error for InvalidUsage {}

#[cfg(test)]
mod tests {
    use super::{InvalidUsage, LoadError};
    use std::{error::Error, fmt, sync::Arc};

    #[derive(Debug)]
    struct Unavailable;

    impl fmt::Display for Unavailable {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "store unavailable")
        }
    }

    impl Error for Unavailable {}

    #[test]
    fn fetch_failure_exposes_source() {
        let error = LoadError::FetchFailed(Arc::new(Unavailable));
        assert_eq!(error.to_string(), "failed to fetch batch: store unavailable");
        assert!(error.source().is_some());
        assert!(error.fetch_error().is_some());
    }

    #[test]
    fn not_found_is_distinct_from_failure() {
        let error = LoadError::<Unavailable>::NotFound;
        assert!(error.is_not_found());
        assert!(error.source().is_none());
        assert!(error.fetch_error().is_none());
    }

    #[test]
    fn invalid_usage_converts() {
        let error: LoadError<Unavailable> = InvalidUsage::new("bad").into();
        assert_eq!(error.to_string(), "invalid loader usage: bad");
    }
}

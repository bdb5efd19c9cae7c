use crate::InvalidUsage;
use std::{num::NonZeroUsize, time::Duration};

/// How long a batch stays open when no delay is configured
///
/// Loads issued by other workers of a multi-threaded runtime only join the batch if they arrive
/// before it closes, a single yield is not enough for that.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(1);

/// Batching behaviour for a loader
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Options {
    delay: Duration,
    max_batch_size: Option<NonZeroUsize>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            delay: DEFAULT_DELAY,
            max_batch_size: None,
        }
    }
}

impl Options {
    /// Validate and create a set of options
    ///
    /// `delay` is how long the batch stays open after its first key, [`DEFAULT_DELAY`] when
    /// omitted. A zero delay closes the batch once the current task yields.
    /// `max_batch_size` caps the number of keys passed to a single fetch; larger batches are
    /// split into several concurrent fetches.
    pub fn new(delay: Option<Duration>, max_batch_size: Option<usize>) -> Result<Self, InvalidUsage> {
        let max_batch_size = max_batch_size
            .map(|size| {
                NonZeroUsize::new(size)
                    .ok_or(InvalidUsage::new("max batch size must be greater than zero"))
            })
            .transpose()?;

        Ok(Self {
            delay: delay.unwrap_or(DEFAULT_DELAY),
            max_batch_size,
        })
    }

    /// How long the dispatch waits before closing the batch
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// The most keys passed to a single fetch
    pub fn max_batch_size(&self) -> Option<NonZeroUsize> {
        self.max_batch_size
    }
}

#[cfg(test)]
mod tests {
    use super::{Options, DEFAULT_DELAY};
    use std::time::Duration;

    #[test]
    fn zero_batch_size_is_rejected() {
        let error = Options::new(None, Some(0)).unwrap_err();
        assert_eq!(error.reason(), "max batch size must be greater than zero");
    }

    #[test]
    fn valid_options() {
        let options = Options::new(Some(Duration::from_millis(2)), Some(50)).unwrap();
        assert_eq!(options.delay(), Duration::from_millis(2));
        assert_eq!(options.max_batch_size().map(|s| s.get()), Some(50));
    }

    #[test]
    fn default_holds_batch_open_briefly() {
        let options = Options::default();
        assert_eq!(options.delay(), DEFAULT_DELAY);
        assert!(!options.delay().is_zero());
        assert_eq!(options.max_batch_size(), None);
    }

    #[test]
    fn omitted_delay_uses_default() {
        let options = Options::new(None, Some(10)).unwrap();
        assert_eq!(options.delay(), DEFAULT_DELAY);
    }

    #[test]
    fn zero_delay_is_allowed() {
        let options = Options::new(Some(Duration::ZERO), None).unwrap();
        assert!(options.delay().is_zero());
    }
}

use futures::future::BoxFuture;

/// Decides when a pending batch is dispatched
///
/// Any spawner with the shape of [`tokio::spawn`] is a scheduler: the dispatch task it receives
/// waits for the configured delay before closing the batch, so every load issued in the current
/// burst of work ends up in the same fetch. Flushes are handed over too, so a flush keeps running
/// after its caller is dropped.
pub trait Scheduler: Send + Sync + 'static {
    /// Arrange for `dispatch` to be run
    fn schedule(&self, dispatch: BoxFuture<'static, ()>);
}

impl<S, R> Scheduler for S
where
    S: Fn(BoxFuture<'static, ()>) -> R + Send + Sync + 'static,
{
    fn schedule(&self, dispatch: BoxFuture<'static, ()>) {
        let _ = self(dispatch);
    }
}

/// Never dispatches on its own, batches are only fetched by an explicit `flush`
///
/// A flush abandoned midway puts its keys back in the batch for the next one.
#[derive(Clone, Copy, Debug, Default)]
pub struct Manual;

impl Scheduler for Manual {
    fn schedule(&self, _dispatch: BoxFuture<'static, ()>) {}
}

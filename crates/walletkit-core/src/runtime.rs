//! Executor seam for the single-threaded UI runtime.

use std::time::Duration;

use futures::future::LocalBoxFuture;

/// Spawns local tasks and provides timers.
///
/// Browser builds back this with `spawn_local` and `gloo-timers`; tests use a
/// tokio `LocalSet`.
pub trait Scheduler {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>);

    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()>;
}

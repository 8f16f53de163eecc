//! Browser executor for session tasks.

use std::time::Duration;

use futures::FutureExt;
use futures::future::LocalBoxFuture;

use walletkit_core::Scheduler;

/// Spawns on the page's microtask queue and sleeps with `setTimeout`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserScheduler;

impl Scheduler for BrowserScheduler {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        wasm_bindgen_futures::spawn_local(task);
    }

    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        gloo_timers::future::sleep(duration).boxed_local()
    }
}

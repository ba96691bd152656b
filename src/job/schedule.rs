//! Host timer and task plumbing
//!
//! Uses the current tokio runtime when there is one and falls back to a
//! dedicated OS thread otherwise, so jobs with delays or external futures can
//! still be run from plain synchronous code.

use std::future::Future;
use std::thread;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::trace;

/// Run `task` once `delay` has elapsed
pub(crate) fn after(delay: Duration, task: impl FnOnce() + Send + 'static) {
    match Handle::try_current() {
        Ok(handle) => {
            handle.spawn(async move {
                tokio::time::sleep(delay).await;
                task();
            });
        }
        Err(_) => {
            trace!(?delay, "no tokio runtime; scheduling delay on a thread");
            thread::spawn(move || {
                thread::sleep(delay);
                task();
            });
        }
    }
}

/// Drive `future` to completion without waiting for it
pub(crate) fn detach(future: impl Future<Output = ()> + Send + 'static) {
    match Handle::try_current() {
        Ok(handle) => {
            handle.spawn(future);
        }
        Err(_) => {
            trace!("no tokio runtime; driving future on a thread");
            thread::spawn(move || futures::executor::block_on(future));
        }
    }
}

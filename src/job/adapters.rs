//! Bridges between jobs and Rust futures
//!
//! [`Job::from_future`] is the single place where failures from outside the
//! algebra (an `Err` output or a panic) are converted into the job's error
//! type. Going the other way, a job can be drained into a future that resolves
//! to `Result<A, E>` or to an always-successful `Outcome<E, A>`.

use super::{schedule, Job};
use crate::outcome::Outcome;
use futures::future::{self, BoxFuture};
use futures::FutureExt;
use std::any::Any;
use std::future::{Future, IntoFuture};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::warn;

/// A failure raised by an external operation before it reaches a catcher
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection<X> {
    /// The operation resolved to `Err`
    #[error("external operation failed: {0}")]
    Error(X),
    /// The operation panicked while starting or running
    #[error("external operation panicked: {0}")]
    Panic(String),
}

impl<E, A> Job<E, A>
where
    E: Send + 'static,
    A: Send + 'static,
{
    /// Wrap an external asynchronous operation
    ///
    /// `start` is called on every run and the future it returns is driven to
    /// completion on the current tokio runtime (or a helper thread when there
    /// is none). `catcher` must not panic.
    pub fn from_future<X, Fut>(
        start: impl Fn() -> Fut + Send + Sync + 'static,
        catcher: impl Fn(Rejection<X>) -> E + Send + Sync + 'static,
    ) -> Self
    where
        Fut: Future<Output = Result<A, X>> + Send + 'static,
        X: Send + 'static,
    {
        let catcher = Arc::new(catcher);
        Job::new(move |resolver| {
            let future = match panic::catch_unwind(AssertUnwindSafe(&start)) {
                Ok(future) => future,
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    warn!(%message, "external operation panicked while starting");
                    resolver.fail(catcher(Rejection::Panic(message)));
                    return;
                }
            };

            let catcher = Arc::clone(&catcher);
            schedule::detach(async move {
                let outcome = match AssertUnwindSafe(future).catch_unwind().await {
                    Ok(Ok(value)) => Outcome::Success(value),
                    Ok(Err(error)) => Outcome::Failure(catcher(Rejection::Error(error))),
                    Err(payload) => {
                        let message = panic_message(payload.as_ref());
                        warn!(%message, "external operation panicked");
                        Outcome::Failure(catcher(Rejection::Panic(message)))
                    }
                };
                resolver.complete(outcome);
            });
        })
    }

    /// Run the job and wait for it, with failure as `Err`
    pub async fn run_to_result(&self) -> Result<A, E> {
        self.run_to_outcome().await.into_result()
    }

    /// Run the job and wait for its outcome; never resolves to an error
    ///
    /// A job that drops its resolver without completing stays pending forever,
    /// just as it would when run with callbacks.
    pub async fn run_to_outcome(&self) -> Outcome<E, A> {
        let (tx, rx) = oneshot::channel();
        self.run_with(move |outcome| {
            // The receiver is gone if the caller stopped waiting.
            let _ = tx.send(outcome);
        });

        match rx.await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!("job dropped its resolver without completing");
                future::pending().await
            }
        }
    }
}

impl<E, A> IntoFuture for Job<E, A>
where
    E: Send + 'static,
    A: Send + 'static,
{
    type Output = Result<A, E>;
    type IntoFuture = BoxFuture<'static, Result<A, E>>;

    fn into_future(self) -> Self::IntoFuture {
        async move { self.run_to_result().await }.boxed()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

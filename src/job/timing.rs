//! Timing modifiers: delay, timeout and retry
//!
//! Timeouts are built on [`race`] and retries on [`alt`], so they inherit
//! their semantics: a timed-out job keeps running and its eventual completion
//! is discarded, and retries run strictly one attempt at a time.

use super::combinators::{alt, race};
use super::{schedule, Job};
use crate::config::RetryConfig;
use crate::error::ConfigError;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Start `job` only after `delay` has elapsed on the host timer
pub fn with_delay<E, A>(delay: Duration, job: Job<E, A>) -> Job<E, A>
where
    E: Send + 'static,
    A: Send + 'static,
{
    Job::new(move |resolver| {
        let job = job.clone();
        schedule::after(delay, move || job.start(resolver));
    })
}

/// Fail with `error` if `job` has not completed within `timeout`
pub fn with_timeout<E, A>(timeout: Duration, error: E, job: Job<E, A>) -> Job<E, A>
where
    E: Clone + Send + Sync + 'static,
    A: Send + 'static,
{
    race(job, [with_delay(timeout, Job::fail(error))])
}

/// Run `job` up to `retries + 1` times, stopping at the first success
pub fn retry<E, A>(retries: usize, job: Job<E, A>) -> Job<E, A>
where
    E: Send + 'static,
    A: Send + 'static,
{
    alt(job.clone(), std::iter::repeat(job).take(retries))
}

/// Run up to `retries + 1` attempts, each built by `make_attempt(index)`
///
/// Attempt indices start at 0. Attempts are built when they are about to run,
/// so a factory that composes a delay into later attempts gets backoff.
pub fn retry_with_count<E, A>(
    make_attempt: impl Fn(usize) -> Job<E, A> + Send + Sync + 'static,
    retries: usize,
) -> Job<E, A>
where
    E: Send + 'static,
    A: Send + 'static,
{
    let make_attempt = Arc::new(make_attempt);
    let attempt = |index: usize| {
        let make_attempt = Arc::clone(&make_attempt);
        Job::defer(move || {
            debug!(attempt = index, "starting attempt");
            make_attempt(index)
        })
    };
    alt(attempt(0), (1..=retries).map(attempt))
}

/// Retry with the delays described by `config`
///
/// The first attempt starts immediately; attempt `n` waits
/// `config.delay_for_attempt(n)` before starting. The config is validated
/// before any job is built.
pub fn retry_with_config<E, A>(
    make_attempt: impl Fn(usize) -> Job<E, A> + Send + Sync + 'static,
    config: &RetryConfig,
) -> Result<Job<E, A>, ConfigError>
where
    E: Send + 'static,
    A: Send + 'static,
{
    config.validate()?;
    let delays = config.clone();
    Ok(retry_with_count(
        move |attempt| {
            let job = make_attempt(attempt);
            let delay = delays.delay_for_attempt(attempt);
            if delay.is_zero() {
                job
            } else {
                with_delay(delay, job)
            }
        },
        config.attempts as usize,
    ))
}

impl<E, A> Job<E, A>
where
    E: Send + 'static,
    A: Send + 'static,
{
    /// Delay the start of this job
    pub fn delay(self, delay: Duration) -> Job<E, A> {
        with_delay(delay, self)
    }

    /// Fail with `error` unless this job completes within `timeout`
    pub fn timeout(self, timeout: Duration, error: E) -> Job<E, A>
    where
        E: Clone + Sync,
    {
        with_timeout(timeout, error, self)
    }

    /// Re-run this job on failure, up to `retries` extra times
    pub fn retry(self, retries: usize) -> Job<E, A> {
        retry(retries, self)
    }
}

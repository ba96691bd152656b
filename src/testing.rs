//! Testing utilities for code built on jobs
//!
//! Counting factories and flaky jobs make it easy to assert how many times an
//! underlying operation actually ran, which is what cache, retry and race
//! behaviour is usually about.

use crate::job::Job;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use tracing_subscriber::EnvFilter;

/// Shared count of how many times an operation ran
#[derive(Debug, Clone, Default)]
pub struct CallCounter(Arc<AtomicUsize>);

impl CallCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one call and return the new total
    pub fn increment(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// A `key -> Job` factory whose jobs count each time they run
pub fn counting_factory<K, E, A>(
    produce: impl Fn(K) -> A + Send + Sync + 'static,
) -> (
    impl Fn(K) -> Job<E, A> + Send + Sync + 'static,
    CallCounter,
)
where
    K: Clone + Send + Sync + 'static,
    E: Send + 'static,
    A: Send + 'static,
{
    let counter = CallCounter::new();
    let calls = counter.clone();
    let produce = Arc::new(produce);
    let factory = move |key: K| {
        let counter = counter.clone();
        let produce = Arc::clone(&produce);
        Job::new(move |resolver| {
            counter.increment();
            resolver.succeed(produce(key.clone()));
        })
    };
    (factory, calls)
}

/// A job that fails its first `failures` runs and succeeds afterwards
pub fn flaky_job<E, A>(failures: usize, value: A, error: E) -> (Job<E, A>, CallCounter)
where
    E: Clone + Send + Sync + 'static,
    A: Clone + Send + Sync + 'static,
{
    let counter = CallCounter::new();
    let runs = counter.clone();
    let job = Job::new(move |resolver| {
        if runs.increment() <= failures {
            resolver.fail(error.clone());
        } else {
            resolver.succeed(value.clone());
        }
    });
    (job, counter)
}

static TRACING: Once = Once::new();

/// Install a test-friendly tracing subscriber once per process
///
/// Honours `RUST_LOG` and defaults to `warn`.
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

//! The lazy, callback-driven job type
//!
//! A [`Job`] describes work without performing it. Building a job, mapping it,
//! binding it or racing it only assembles a graph of bodies; nothing happens
//! until one of the run entry points is called. Every execution completes by
//! invoking exactly one of the two continuations held by its [`Resolver`], or
//! never completes at all.
//!
//! # Architecture
//!
//! - **Core** (this module): constructors, running, and the functor, monad and
//!   applicative operations (`map`, `bind`, `ap`, `bimap`, `catch_error`).
//! - **Combinators** (`combinators`): race, list, alt and alt_collect.
//! - **Timing** (`timing`): delay, timeout and retry modifiers.
//! - **Adapters** (`adapters`): bridges to and from Rust futures.
//!
//! A job is reusable: running the same value twice performs two independent
//! executions that share no per-run state.
//!
//! ```rust
//! use jobkit::{Job, Outcome};
//!
//! let greeting = Job::<String, _>::pure("dog")
//!     .map(|name| format!("Hello, {name}"))
//!     .bind(|text| Job::pure(text.len()));
//!
//! greeting.run_with(|outcome| assert_eq!(outcome, Outcome::Success(10)));
//! ```

pub mod adapters;
pub mod combinators;
mod resolver;
pub(crate) mod schedule;
pub mod timing;


pub use adapters::Rejection;
pub use combinators::{alt, alt_collect, list, list_non_empty, race};
pub use resolver::{Callback, Resolver};
pub use timing::{retry, retry_with_config, retry_with_count, with_delay, with_timeout};

use crate::outcome::Outcome;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type Body<E, A> = dyn Fn(Resolver<E, A>) + Send + Sync;

/// A deferred unit of work that either succeeds with `A` or fails with `E`
pub struct Job<E, A> {
    body: Arc<Body<E, A>>,
}

impl<E, A> Clone for Job<E, A> {
    fn clone(&self) -> Self {
        Self {
            body: Arc::clone(&self.body),
        }
    }
}

impl<E, A> fmt::Debug for Job<E, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job").finish_non_exhaustive()
    }
}

impl<E, A> Job<E, A>
where
    E: Send + 'static,
    A: Send + 'static,
{
    /// Wrap a body function. The body runs once per execution.
    pub fn new(body: impl Fn(Resolver<E, A>) + Send + Sync + 'static) -> Self {
        Self {
            body: Arc::new(body),
        }
    }

    /// Wrap a body that takes the two terminal callbacks separately
    ///
    /// Only the first callback invoked has any effect.
    pub fn from_callbacks(
        body: impl Fn(Callback<A>, Callback<E>) + Send + Sync + 'static,
    ) -> Self {
        Self::new(move |resolver| {
            let (on_success, on_failure) = resolver.split();
            body(on_success, on_failure)
        })
    }

    /// A job that succeeds synchronously with `value`
    pub fn pure(value: A) -> Self
    where
        A: Clone + Sync,
    {
        Self::new(move |resolver| resolver.succeed(value.clone()))
    }

    /// A job that fails synchronously with `error`
    pub fn fail(error: E) -> Self
    where
        E: Clone + Sync,
    {
        Self::new(move |resolver| resolver.fail(error.clone()))
    }

    /// A job that evaluates `f` each time it runs
    pub fn from_fn(f: impl Fn() -> Result<A, E> + Send + Sync + 'static) -> Self {
        Self::new(move |resolver| resolver.complete(f().into()))
    }

    /// A job whose inner job is built afresh on every run
    pub fn defer(make: impl Fn() -> Job<E, A> + Send + Sync + 'static) -> Self {
        Self::new(move |resolver| make().start(resolver))
    }

    /// Execute the body with an existing resolver
    pub fn start(&self, resolver: Resolver<E, A>) {
        (self.body)(resolver)
    }

    /// Execute the job, routing its completion to one of two callbacks
    ///
    /// Synchronous jobs complete before this returns; asynchronous ones call
    /// back later from whichever task or thread their source completes on.
    pub fn run(
        &self,
        on_success: impl FnOnce(A) + Send + 'static,
        on_failure: impl FnOnce(E) + Send + 'static,
    ) {
        self.start(Resolver::from_callbacks(on_success, on_failure))
    }

    /// Execute the job with a single continuation receiving the outcome
    pub fn run_with(&self, next: impl FnOnce(Outcome<E, A>) + Send + 'static) {
        self.start(Resolver::new(next))
    }

    /// Transform the whole outcome, including which branch it lands on
    pub fn bimap<G, B>(
        self,
        f: impl Fn(Outcome<E, A>) -> Outcome<G, B> + Send + Sync + 'static,
    ) -> Job<G, B>
    where
        G: Send + 'static,
        B: Send + 'static,
    {
        let f = Arc::new(f);
        Job::new(move |resolver: Resolver<G, B>| {
            let f = Arc::clone(&f);
            self.run_with(move |outcome| resolver.complete(f(outcome)));
        })
    }

    /// Transform the success value; failures pass through unchanged
    pub fn map<B>(self, f: impl Fn(A) -> B + Send + Sync + 'static) -> Job<E, B>
    where
        B: Send + 'static,
    {
        self.bimap(move |outcome| outcome.map(&f))
    }

    /// Transform the error value; successes pass through unchanged
    pub fn map_err<G>(self, f: impl Fn(E) -> G + Send + Sync + 'static) -> Job<G, A>
    where
        G: Send + 'static,
    {
        self.bimap(move |outcome| outcome.map_err(&f))
    }

    /// Recover from, or translate, a failure
    pub fn catch_error(
        self,
        g: impl Fn(E) -> Outcome<E, A> + Send + Sync + 'static,
    ) -> Job<E, A> {
        self.bimap(move |outcome| match outcome {
            Outcome::Success(a) => Outcome::Success(a),
            Outcome::Failure(e) => g(e),
        })
    }

    /// Sequence a second job that depends on this job's value
    pub fn bind<B>(self, to_job_b: impl Fn(A) -> Job<E, B> + Send + Sync + 'static) -> Job<E, B>
    where
        B: Send + 'static,
    {
        let to_job_b = Arc::new(to_job_b);
        Job::new(move |resolver: Resolver<E, B>| {
            let to_job_b = Arc::clone(&to_job_b);
            self.run_with(move |outcome| match outcome {
                Outcome::Success(a) => to_job_b(a).start(resolver),
                Outcome::Failure(e) => resolver.fail(e),
            });
        })
    }

    /// Alias for [`Job::bind`]
    pub fn and_then<B>(
        self,
        to_job_b: impl Fn(A) -> Job<E, B> + Send + Sync + 'static,
    ) -> Job<E, B>
    where
        B: Send + 'static,
    {
        self.bind(to_job_b)
    }
}

/// Apply the function produced by `job_f` to the value produced by `job_a`
///
/// `job_f` runs first; `job_a` only starts once it has succeeded.
pub fn ap<E, A, B, F>(job_f: Job<E, F>, job_a: Job<E, A>) -> Job<E, B>
where
    E: Send + 'static,
    A: Send + 'static,
    B: Send + 'static,
    F: FnOnce(A) -> B + Send + 'static,
{
    Job::new(move |resolver: Resolver<E, B>| {
        let job_a = job_a.clone();
        job_f.run_with(move |outcome| match outcome {
            Outcome::Success(f) => {
                job_a.run_with(move |outcome| resolver.complete(outcome.map(f)));
            }
            Outcome::Failure(e) => resolver.fail(e),
        });
    })
}

/// Lift a binary function over two jobs
pub fn lift_a2<E, A, B, C>(
    f: impl Fn(A, B) -> C + Send + Sync + 'static,
    job_a: Job<E, A>,
    job_b: Job<E, B>,
) -> Job<E, C>
where
    E: Send + 'static,
    A: Send + 'static,
    B: Send + 'static,
    C: Send + 'static,
{
    let f = Arc::new(f);
    let job_f = job_a.map(move |a| {
        let f = Arc::clone(&f);
        move |b| f(a, b)
    });
    ap(job_f, job_b)
}

/// Lift a ternary function over three jobs
pub fn lift_a3<E, A, B, C, D>(
    f: impl Fn(A, B, C) -> D + Send + Sync + 'static,
    job_a: Job<E, A>,
    job_b: Job<E, B>,
    job_c: Job<E, C>,
) -> Job<E, D>
where
    E: Send + 'static,
    A: Send + 'static,
    B: Send + 'static,
    C: Send + 'static,
    D: Send + 'static,
{
    let f = Arc::new(f);
    let job_f = job_a.map(move |a| {
        let f = Arc::clone(&f);
        move |b| move |c| f(a, b, c)
    });
    ap(ap(job_f, job_b), job_c)
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

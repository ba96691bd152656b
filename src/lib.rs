//! # jobkit
//!
//! Lazy, composable jobs built on continuation callbacks.
//!
//! A [`Job<E, A>`] is deferred work that, once run, completes exactly once
//! with either a value `A` or an error `E` and never panics its way out of the
//! algebra. Jobs compose with `map`, `bind` and `ap`, run concurrently with
//! [`race`] and [`list`], fall back with [`alt`], and gain timing behaviour
//! with `delay`, `timeout` and `retry`. [`FifoCache`] memoizes a job factory
//! over a FIFO window, and [`JobReader`] threads a read-only context through
//! all of it.
//!
//! Nothing is ever cancelled: a race or timeout only discards late results,
//! and the losing work still runs to completion.
//!
//! ```rust
//! use jobkit::{alt_collect, Job, Outcome};
//!
//! let job = alt_collect(
//!     Job::<&str, u32>::fail("primary down"),
//!     [Job::fail("replica down"), Job::pure(3)],
//! );
//! job.run_with(|outcome| assert_eq!(outcome, Outcome::Success(3)));
//! ```
//!
//! ## Modules
//!
//! - `outcome` - Two-variant result of a finished job
//! - `job` - The job type, combinators, timing modifiers and future adapters
//! - `cache` - FIFO-windowed memoization of job factories
//! - `reader` - Context-carrying jobs layered over the base algebra
//! - `config` - Serde configuration for retries, caching and timeouts
//! - `testing` - Counting factories and tracing setup for tests

pub mod cache;
pub mod config;
pub mod error;
pub mod job;
pub mod outcome;
pub mod reader;
pub mod testing;

pub use cache::{with_fifo_cache, FifoCache};
pub use config::{BackoffStrategy, CacheConfig, JobConfig, RetryConfig};
pub use error::ConfigError;
pub use job::{
    alt, alt_collect, ap, lift_a2, lift_a3, list, list_non_empty, race, retry, retry_with_config,
    retry_with_count, with_delay, with_timeout, Callback, Job, Rejection, Resolver,
};
pub use outcome::Outcome;
pub use reader::JobReader;

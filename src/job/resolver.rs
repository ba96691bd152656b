//! Terminal continuations handed to a job body
//!
//! A [`Resolver`] is the pair of callbacks a body must finish through. Both
//! `succeed` and `fail` consume the resolver, so a body that holds exactly one
//! resolver can complete at most once. Dropping a resolver without completing
//! it leaves the job hung, which is a valid (if unhelpful) job.

use super::lock;
use crate::outcome::Outcome;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::trace;

/// One-shot callback for a single branch of a split resolver
pub type Callback<T> = Box<dyn FnOnce(T) + Send>;

/// The success/failure continuation pair for one execution of a job
pub struct Resolver<E, A> {
    next: Box<dyn FnOnce(Outcome<E, A>) + Send>,
}

impl<E, A> Resolver<E, A>
where
    E: Send + 'static,
    A: Send + 'static,
{
    /// Resolver that forwards whichever outcome arrives to `next`
    pub fn new(next: impl FnOnce(Outcome<E, A>) + Send + 'static) -> Self {
        Self {
            next: Box::new(next),
        }
    }

    /// Resolver built from separate success and failure callbacks
    pub fn from_callbacks(
        on_success: impl FnOnce(A) + Send + 'static,
        on_failure: impl FnOnce(E) + Send + 'static,
    ) -> Self {
        Self::new(move |outcome| match outcome {
            Outcome::Success(a) => on_success(a),
            Outcome::Failure(e) => on_failure(e),
        })
    }

    /// Complete with a value
    pub fn succeed(self, value: A) {
        (self.next)(Outcome::Success(value))
    }

    /// Complete with an error
    pub fn fail(self, error: E) {
        (self.next)(Outcome::Failure(error))
    }

    /// Complete with whichever branch `outcome` holds
    pub fn complete(self, outcome: Outcome<E, A>) {
        (self.next)(outcome)
    }

    /// Split into two independent callbacks that share a single completion
    ///
    /// Whichever callback is invoked first completes the resolver; the other
    /// becomes a no-op.
    pub fn split(self) -> (Callback<A>, Callback<E>) {
        let shared = Arc::new(Mutex::new(Some(self)));
        let on_failure_slot = Arc::clone(&shared);

        let on_success: Callback<A> = Box::new(move |value| {
            let claimed = lock(&shared).take();
            match claimed {
                Some(resolver) => resolver.succeed(value),
                None => trace!("success callback invoked after completion; ignoring"),
            }
        });
        let on_failure: Callback<E> = Box::new(move |error| {
            let claimed = lock(&on_failure_slot).take();
            match claimed {
                Some(resolver) => resolver.fail(error),
                None => trace!("failure callback invoked after completion; ignoring"),
            }
        });

        (on_success, on_failure)
    }
}

impl<E, A> fmt::Debug for Resolver<E, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver").finish_non_exhaustive()
    }
}

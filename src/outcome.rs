//! Two-variant outcome of a completed job
//!
//! `Outcome` is what a [`Job`](crate::Job) hands to its caller once it has
//! finished: either the value it produced or the error it failed with. Type
//! parameters are error-first, matching `Job<E, A>`.

use serde::{Deserialize, Serialize};

/// The answer produced by a finished job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Outcome<E, A> {
    /// The job completed with a value
    Success(A),
    /// The job completed with an error
    Failure(E),
}

impl<E, A> Outcome<E, A> {
    pub fn success(value: A) -> Self {
        Outcome::Success(value)
    }

    pub fn failure(error: E) -> Self {
        Outcome::Failure(error)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure(_))
    }

    /// Collapse both branches into a single value
    pub fn fold<B>(self, on_failure: impl FnOnce(E) -> B, on_success: impl FnOnce(A) -> B) -> B {
        match self {
            Outcome::Success(a) => on_success(a),
            Outcome::Failure(e) => on_failure(e),
        }
    }

    pub fn map<B>(self, f: impl FnOnce(A) -> B) -> Outcome<E, B> {
        match self {
            Outcome::Success(a) => Outcome::Success(f(a)),
            Outcome::Failure(e) => Outcome::Failure(e),
        }
    }

    pub fn map_err<G>(self, f: impl FnOnce(E) -> G) -> Outcome<G, A> {
        match self {
            Outcome::Success(a) => Outcome::Success(a),
            Outcome::Failure(e) => Outcome::Failure(f(e)),
        }
    }

    pub fn and_then<B>(self, f: impl FnOnce(A) -> Outcome<E, B>) -> Outcome<E, B> {
        match self {
            Outcome::Success(a) => f(a),
            Outcome::Failure(e) => Outcome::Failure(e),
        }
    }

    pub fn as_ref(&self) -> Outcome<&E, &A> {
        match self {
            Outcome::Success(a) => Outcome::Success(a),
            Outcome::Failure(e) => Outcome::Failure(e),
        }
    }

    pub fn success_value(self) -> Option<A> {
        match self {
            Outcome::Success(a) => Some(a),
            Outcome::Failure(_) => None,
        }
    }

    pub fn failure_value(self) -> Option<E> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure(e) => Some(e),
        }
    }

    /// Pair two outcomes, keeping the first failure seen
    pub fn combine<B>(self, other: Outcome<E, B>) -> Outcome<E, (A, B)> {
        match (self, other) {
            (Outcome::Failure(e), _) => Outcome::Failure(e),
            (_, Outcome::Failure(e)) => Outcome::Failure(e),
            (Outcome::Success(a), Outcome::Success(b)) => Outcome::Success((a, b)),
        }
    }

    /// All values in order, or the first failure
    pub fn all(outcomes: impl IntoIterator<Item = Outcome<E, A>>) -> Outcome<E, Vec<A>> {
        let mut values = Vec::new();
        for outcome in outcomes {
            match outcome {
                Outcome::Success(a) => values.push(a),
                Outcome::Failure(e) => return Outcome::Failure(e),
            }
        }
        Outcome::Success(values)
    }

    /// The first success, or `other` when this one failed
    ///
    /// When both failed the later failure is kept.
    pub fn first(self, other: Outcome<E, A>) -> Outcome<E, A> {
        match self {
            Outcome::Success(a) => Outcome::Success(a),
            Outcome::Failure(_) => other,
        }
    }

    pub fn into_result(self) -> Result<A, E> {
        self.into()
    }
}

impl<A> Outcome<A, A> {
    /// Extract the value regardless of which branch holds it
    pub fn flatten(self) -> A {
        match self {
            Outcome::Success(a) | Outcome::Failure(a) => a,
        }
    }
}

impl<E, A> From<Result<A, E>> for Outcome<E, A> {
    fn from(result: Result<A, E>) -> Self {
        match result {
            Ok(a) => Outcome::Success(a),
            Err(e) => Outcome::Failure(e),
        }
    }
}

impl<E, A> From<Outcome<E, A>> for Result<A, E> {
    fn from(outcome: Outcome<E, A>) -> Self {
        match outcome {
            Outcome::Success(a) => Ok(a),
            Outcome::Failure(e) => Err(e),
        }
    }
}

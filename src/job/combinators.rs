//! Concurrency combinators: race, list, alt and alt_collect
//!
//! None of these cancel anything. `race` starts every branch and forwards the
//! first completion, but the losing branches keep running and their side
//! effects still happen; their completions are simply dropped.

use super::{lock, Job, Resolver};
use crate::outcome::Outcome;
use std::collections::VecDeque;
use std::iter;
use std::mem;
use std::sync::{Arc, Mutex};
use tracing::{debug, trace};

/// Start every job at once and forward whichever completes first
pub fn race<E, A>(first: Job<E, A>, rest: impl IntoIterator<Item = Job<E, A>>) -> Job<E, A>
where
    E: Send + 'static,
    A: Send + 'static,
{
    let jobs: Vec<Job<E, A>> = iter::once(first).chain(rest).collect();
    Job::new(move |resolver| {
        // Holds the outer resolver until the first branch claims it.
        let winner = Arc::new(Mutex::new(Some(resolver)));
        for (index, job) in jobs.iter().enumerate() {
            let winner = Arc::clone(&winner);
            job.run_with(move |outcome| {
                let claimed = lock(&winner).take();
                match claimed {
                    Some(resolver) => {
                        trace!(branch = index, "race won");
                        resolver.complete(outcome);
                    }
                    None => trace!(branch = index, "race already decided; dropping completion"),
                }
            });
        }
    })
}

/// Start every job at once and collect every outcome in the original order
///
/// Never fails: a failed job shows up as an `Outcome::Failure` slot.
pub fn list<E, A>(
    first: Job<E, A>,
    rest: impl IntoIterator<Item = Job<E, A>>,
) -> Job<E, Vec<Outcome<E, A>>>
where
    E: Send + 'static,
    A: Send + 'static,
{
    collect_all(iter::once(first).chain(rest).collect())
}

/// Like [`list`], but fails with `empty_error` when given no jobs
pub fn list_non_empty<E, A>(
    jobs: impl IntoIterator<Item = Job<E, A>>,
    empty_error: E,
) -> Job<E, Vec<Outcome<E, A>>>
where
    E: Clone + Send + Sync + 'static,
    A: Send + 'static,
{
    let jobs: Vec<Job<E, A>> = jobs.into_iter().collect();
    if jobs.is_empty() {
        return Job::fail(empty_error);
    }
    collect_all(jobs)
}

struct Collected<E, A> {
    slots: Vec<Option<Outcome<E, A>>>,
    remaining: usize,
    resolver: Option<Resolver<E, Vec<Outcome<E, A>>>>,
}

type Finished<E, A> = (Resolver<E, Vec<Outcome<E, A>>>, Vec<Outcome<E, A>>);

impl<E, A> Collected<E, A>
where
    E: Send + 'static,
    A: Send + 'static,
{
    /// Fill a slot; returns the resolver and results once every slot is filled
    fn store(&mut self, index: usize, outcome: Outcome<E, A>) -> Option<Finished<E, A>> {
        self.slots[index] = Some(outcome);
        self.remaining -= 1;
        if self.remaining > 0 {
            return None;
        }

        let resolver = self.resolver.take()?;
        let outcomes = self.slots.drain(..).flatten().collect();
        Some((resolver, outcomes))
    }
}

fn collect_all<E, A>(jobs: Vec<Job<E, A>>) -> Job<E, Vec<Outcome<E, A>>>
where
    E: Send + 'static,
    A: Send + 'static,
{
    Job::new(move |resolver| {
        if jobs.is_empty() {
            resolver.succeed(Vec::new());
            return;
        }

        let state = Arc::new(Mutex::new(Collected {
            slots: iter::repeat_with(|| None).take(jobs.len()).collect(),
            remaining: jobs.len(),
            resolver: Some(resolver),
        }));
        for (index, job) in jobs.iter().enumerate() {
            let state = Arc::clone(&state);
            job.run_with(move |outcome| {
                let finished = lock(&state).store(index, outcome);
                if let Some((resolver, outcomes)) = finished {
                    resolver.succeed(outcomes);
                }
            });
        }
    })
}

/// Try each job in turn until one succeeds
///
/// Only one job runs at a time. When every job fails, the last failure is
/// forwarded.
pub fn alt<E, A>(first: Job<E, A>, rest: impl IntoIterator<Item = Job<E, A>>) -> Job<E, A>
where
    E: Send + 'static,
    A: Send + 'static,
{
    let fallbacks: Vec<Job<E, A>> = rest.into_iter().collect();
    Job::new(move |resolver| {
        let state = Fallbacks {
            remaining: fallbacks.iter().cloned().collect(),
            resolver,
        };
        run_in_sequence(first.clone(), state, alt_step);
    })
}

struct Fallbacks<E, A> {
    remaining: VecDeque<Job<E, A>>,
    resolver: Resolver<E, A>,
}

fn alt_step<E, A>(
    mut state: Fallbacks<E, A>,
    outcome: Outcome<E, A>,
) -> Option<(Job<E, A>, Fallbacks<E, A>)>
where
    E: Send + 'static,
    A: Send + 'static,
{
    match outcome {
        Outcome::Success(a) => state.resolver.succeed(a),
        Outcome::Failure(e) => match state.remaining.pop_front() {
            Some(next) => {
                debug!(remaining = state.remaining.len(), "alt falling back to next job");
                return Some((next, state));
            }
            None => state.resolver.fail(e),
        },
    }
    None
}

/// Like [`alt`], but an exhausted run fails with every error in order
pub fn alt_collect<E, A>(
    first: Job<E, A>,
    rest: impl IntoIterator<Item = Job<E, A>>,
) -> Job<Vec<E>, A>
where
    E: Send + 'static,
    A: Send + 'static,
{
    let fallbacks: Vec<Job<E, A>> = rest.into_iter().collect();
    Job::new(move |resolver| {
        let state = CollectingFallbacks {
            remaining: fallbacks.iter().cloned().collect(),
            errors: Vec::with_capacity(fallbacks.len() + 1),
            resolver,
        };
        run_in_sequence(first.clone(), state, alt_collect_step);
    })
}

struct CollectingFallbacks<E, A> {
    remaining: VecDeque<Job<E, A>>,
    errors: Vec<E>,
    resolver: Resolver<Vec<E>, A>,
}

fn alt_collect_step<E, A>(
    mut state: CollectingFallbacks<E, A>,
    outcome: Outcome<E, A>,
) -> Option<(Job<E, A>, CollectingFallbacks<E, A>)>
where
    E: Send + 'static,
    A: Send + 'static,
{
    match outcome {
        Outcome::Success(a) => state.resolver.succeed(a),
        Outcome::Failure(e) => {
            state.errors.push(e);
            match state.remaining.pop_front() {
                Some(next) => {
                    debug!(failures = state.errors.len(), "alt_collect falling back to next job");
                    return Some((next, state));
                }
                None => state.resolver.fail(state.errors),
            }
        }
    }
    None
}

/// Where a sequenced job's outcome goes once it completes
enum Handoff<E, A, S> {
    /// The driving loop is still inside `run_with`
    Pending,
    /// Completed before `run_with` returned; the loop picks it up
    Completed(Outcome<E, A>),
    /// The loop has returned; the callback continues the sequence
    Detached(S),
}

/// Run `job`, feed its outcome to `step`, and keep going while `step` yields
/// another job
///
/// Jobs that complete synchronously are driven by a loop, so a long chain of
/// synchronous failures runs in constant stack. Only a completion that arrives
/// after `run_with` has returned continues from inside the callback.
fn run_in_sequence<E, A, S>(
    mut job: Job<E, A>,
    mut state: S,
    step: fn(S, Outcome<E, A>) -> Option<(Job<E, A>, S)>,
) where
    E: Send + 'static,
    A: Send + 'static,
    S: Send + 'static,
{
    loop {
        let handoff = Arc::new(Mutex::new(Handoff::Pending));
        let slot = Arc::clone(&handoff);
        job.run_with(move |outcome| {
            let state = {
                let mut guard = lock(&slot);
                match mem::replace(&mut *guard, Handoff::Pending) {
                    Handoff::Detached(state) => state,
                    _ => {
                        *guard = Handoff::Completed(outcome);
                        return;
                    }
                }
            };
            if let Some((next, state)) = step(state, outcome) {
                run_in_sequence(next, state, step);
            }
        });

        let outcome = {
            let mut guard = lock(&handoff);
            match mem::replace(&mut *guard, Handoff::Pending) {
                Handoff::Completed(outcome) => outcome,
                _ => {
                    *guard = Handoff::Detached(state);
                    return;
                }
            }
        };
        match step(state, outcome) {
            Some((next, next_state)) => {
                job = next;
                state = next_state;
            }
            None => return,
        }
    }
}

impl<E, A> Job<E, A>
where
    E: Send + 'static,
    A: Send + 'static,
{
    /// Race this job against `others`
    pub fn race(self, others: impl IntoIterator<Item = Job<E, A>>) -> Job<E, A> {
        race(self, others)
    }

    /// Run this job alongside `others` and collect every outcome
    pub fn list(self, others: impl IntoIterator<Item = Job<E, A>>) -> Job<E, Vec<Outcome<E, A>>> {
        list(self, others)
    }

    /// Fall back to `others` in order if this job fails
    pub fn alt(self, others: impl IntoIterator<Item = Job<E, A>>) -> Job<E, A> {
        alt(self, others)
    }

    /// Fall back to `others` in order, keeping every failure
    pub fn alt_collect(self, others: impl IntoIterator<Item = Job<E, A>>) -> Job<Vec<E>, A> {
        alt_collect(self, others)
    }
}

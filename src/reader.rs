//! Jobs that read from a shared context
//!
//! A [`JobReader`] is a job that still needs its context. Supplying the
//! context with [`JobReader::provide`] yields an ordinary [`Job`], and every
//! combinator here is defined by providing the context to its children and
//! delegating to the base algebra, so the two layers cannot drift apart.

use crate::job::{self, Job, Rejection};
use crate::outcome::Outcome;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

type Build<Ctx, E, A> = dyn Fn(&Ctx) -> Job<E, A> + Send + Sync;

/// A job parameterised by a read-only context
pub struct JobReader<Ctx, E, A> {
    build: Arc<Build<Ctx, E, A>>,
}

impl<Ctx, E, A> Clone for JobReader<Ctx, E, A> {
    fn clone(&self) -> Self {
        Self {
            build: Arc::clone(&self.build),
        }
    }
}

impl<Ctx, E, A> fmt::Debug for JobReader<Ctx, E, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobReader").finish_non_exhaustive()
    }
}

impl<Ctx, E, A> JobReader<Ctx, E, A>
where
    Ctx: Clone + Send + Sync + 'static,
    E: Send + 'static,
    A: Send + 'static,
{
    /// Build the job from the context each time it is provided
    pub fn new(build: impl Fn(&Ctx) -> Job<E, A> + Send + Sync + 'static) -> Self {
        Self {
            build: Arc::new(build),
        }
    }

    /// A reader that ignores its context
    pub fn from_job(job: Job<E, A>) -> Self {
        Self::new(move |_| job.clone())
    }

    pub fn pure(value: A) -> Self
    where
        A: Clone + Sync,
    {
        Self::from_job(Job::pure(value))
    }

    pub fn fail(error: E) -> Self
    where
        E: Clone + Sync,
    {
        Self::from_job(Job::fail(error))
    }

    /// A reader whose outcome is computed from the context
    pub fn from_context(f: impl Fn(&Ctx) -> Outcome<E, A> + Send + Sync + 'static) -> Self {
        let f = Arc::new(f);
        Self::new(move |ctx: &Ctx| {
            let f = Arc::clone(&f);
            let ctx = ctx.clone();
            Job::new(move |resolver| resolver.complete(f(&ctx)))
        })
    }

    /// Wrap an external asynchronous operation that needs the context
    pub fn from_future<X, Fut>(
        start: impl Fn(Ctx) -> Fut + Send + Sync + 'static,
        catcher: impl Fn(Rejection<X>) -> E + Send + Sync + 'static,
    ) -> Self
    where
        Fut: Future<Output = Result<A, X>> + Send + 'static,
        X: Send + 'static,
    {
        let start = Arc::new(start);
        let catcher = Arc::new(catcher);
        Self::new(move |ctx: &Ctx| {
            let start = Arc::clone(&start);
            let catcher = Arc::clone(&catcher);
            let ctx = ctx.clone();
            Job::from_future(move || start(ctx.clone()), move |rejection| catcher(rejection))
        })
    }

    /// Supply the context, producing a runnable job
    pub fn provide(&self, ctx: &Ctx) -> Job<E, A> {
        (self.build)(ctx)
    }

    pub fn run(
        &self,
        ctx: &Ctx,
        on_success: impl FnOnce(A) + Send + 'static,
        on_failure: impl FnOnce(E) + Send + 'static,
    ) {
        self.provide(ctx).run(on_success, on_failure)
    }

    pub fn run_with(&self, ctx: &Ctx, next: impl FnOnce(Outcome<E, A>) + Send + 'static) {
        self.provide(ctx).run_with(next)
    }

    pub async fn run_to_result(&self, ctx: &Ctx) -> Result<A, E> {
        self.provide(ctx).run_to_result().await
    }

    pub async fn run_to_outcome(&self, ctx: &Ctx) -> Outcome<E, A> {
        self.provide(ctx).run_to_outcome().await
    }

    /// Transform the job produced for every context
    fn lift<G, B>(
        self,
        f: impl Fn(Job<E, A>) -> Job<G, B> + Send + Sync + 'static,
    ) -> JobReader<Ctx, G, B>
    where
        G: Send + 'static,
        B: Send + 'static,
    {
        JobReader::new(move |ctx: &Ctx| f(self.provide(ctx)))
    }

    pub fn bimap<G, B>(
        self,
        f: impl Fn(Outcome<E, A>) -> Outcome<G, B> + Send + Sync + 'static,
    ) -> JobReader<Ctx, G, B>
    where
        G: Send + 'static,
        B: Send + 'static,
    {
        let f = Arc::new(f);
        self.lift(move |job| {
            let f = Arc::clone(&f);
            job.bimap(move |outcome| f(outcome))
        })
    }

    pub fn map<B>(self, f: impl Fn(A) -> B + Send + Sync + 'static) -> JobReader<Ctx, E, B>
    where
        B: Send + 'static,
    {
        self.bimap(move |outcome| outcome.map(&f))
    }

    pub fn map_err<G>(self, f: impl Fn(E) -> G + Send + Sync + 'static) -> JobReader<Ctx, G, A>
    where
        G: Send + 'static,
    {
        self.bimap(move |outcome| outcome.map_err(&f))
    }

    pub fn catch_error(
        self,
        g: impl Fn(E) -> Outcome<E, A> + Send + Sync + 'static,
    ) -> JobReader<Ctx, E, A> {
        self.bimap(move |outcome| match outcome {
            Outcome::Success(a) => Outcome::Success(a),
            Outcome::Failure(e) => g(e),
        })
    }

    /// Sequence a dependent reader; both see the same context
    pub fn bind<B>(
        self,
        to_reader_b: impl Fn(A) -> JobReader<Ctx, E, B> + Send + Sync + 'static,
    ) -> JobReader<Ctx, E, B>
    where
        B: Send + 'static,
    {
        let to_reader_b = Arc::new(to_reader_b);
        JobReader::new(move |ctx: &Ctx| {
            let to_reader_b = Arc::clone(&to_reader_b);
            let ctx_b = ctx.clone();
            self.provide(ctx).bind(move |a| to_reader_b(a).provide(&ctx_b))
        })
    }

    pub fn race(self, others: impl IntoIterator<Item = JobReader<Ctx, E, A>>) -> Self {
        let others: Vec<_> = others.into_iter().collect();
        JobReader::new(move |ctx: &Ctx| {
            job::race(self.provide(ctx), provide_all(&others, ctx))
        })
    }

    pub fn list(
        self,
        others: impl IntoIterator<Item = JobReader<Ctx, E, A>>,
    ) -> JobReader<Ctx, E, Vec<Outcome<E, A>>> {
        let others: Vec<_> = others.into_iter().collect();
        JobReader::new(move |ctx: &Ctx| {
            job::list(self.provide(ctx), provide_all(&others, ctx))
        })
    }

    pub fn alt(self, others: impl IntoIterator<Item = JobReader<Ctx, E, A>>) -> Self {
        let others: Vec<_> = others.into_iter().collect();
        JobReader::new(move |ctx: &Ctx| {
            job::alt(self.provide(ctx), provide_all(&others, ctx))
        })
    }

    pub fn delay(self, delay: Duration) -> Self {
        self.lift(move |job| job.delay(delay))
    }

    pub fn timeout(self, timeout: Duration, error: E) -> Self
    where
        E: Clone + Sync,
    {
        self.lift(move |job| job.timeout(timeout, error.clone()))
    }

    pub fn retry(self, retries: usize) -> Self {
        self.lift(move |job| job.retry(retries))
    }
}

impl<Ctx, E> JobReader<Ctx, E, Ctx>
where
    Ctx: Clone + Send + Sync + 'static,
    E: Send + 'static,
{
    /// A reader that succeeds with the context itself
    pub fn ask() -> Self {
        Self::from_context(|ctx| Outcome::Success(ctx.clone()))
    }
}

/// Apply the function read by `reader_f` to the value read by `reader_a`
pub fn ap<Ctx, E, A, B, F>(
    reader_f: JobReader<Ctx, E, F>,
    reader_a: JobReader<Ctx, E, A>,
) -> JobReader<Ctx, E, B>
where
    Ctx: Clone + Send + Sync + 'static,
    E: Send + 'static,
    A: Send + 'static,
    B: Send + 'static,
    F: FnOnce(A) -> B + Send + 'static,
{
    JobReader::new(move |ctx: &Ctx| job::ap(reader_f.provide(ctx), reader_a.provide(ctx)))
}

fn provide_all<Ctx, E, A>(readers: &[JobReader<Ctx, E, A>], ctx: &Ctx) -> Vec<Job<E, A>>
where
    Ctx: Clone + Send + Sync + 'static,
    E: Send + 'static,
    A: Send + 'static,
{
    readers.iter().map(|reader| reader.provide(ctx)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::flaky_job;

    #[derive(Clone)]
    struct Env {
        greeting: &'static str,
        retries: usize,
    }

    fn env() -> Env {
        Env {
            greeting: "Hello",
            retries: 2,
        }
    }

    #[tokio::test]
    async fn test_ask_returns_context() {
        let reader = JobReader::<Env, String, Env>::ask().map(|env| env.greeting.len());
        assert_eq!(reader.run_to_result(&env()).await, Ok(5));
    }

    #[tokio::test]
    async fn test_bind_threads_context_to_both_sides() {
        let reader: JobReader<Env, String, String> = JobReader::pure("dog").bind(|name| {
            JobReader::from_context(move |env: &Env| {
                Outcome::Success(format!("{}, {name}", env.greeting))
            })
        });
        assert_eq!(
            reader.run_to_result(&env()).await,
            Ok("Hello, dog".to_string())
        );
    }

    #[tokio::test]
    async fn test_from_context_failure_and_catch() {
        let reader: JobReader<Env, String, String> = JobReader::from_context(|env: &Env| {
            Outcome::Failure(format!("{} retries left", env.retries))
        })
        .catch_error(|e| Outcome::Success(format!("recovered: {e}")));
        assert_eq!(
            reader.run_to_result(&env()).await,
            Ok("recovered: 2 retries left".to_string())
        );
    }

    #[tokio::test]
    async fn test_list_and_alt_delegate_to_base_algebra() {
        let ok: JobReader<Env, String, usize> =
            JobReader::from_context(|env: &Env| Outcome::Success(env.retries));
        let bad: JobReader<Env, String, usize> = JobReader::fail("nope".to_string());

        let listed = ok.clone().list([bad.clone()]);
        assert_eq!(
            listed.run_to_result(&env()).await,
            Ok(vec![Outcome::Success(2), Outcome::Failure("nope".to_string())])
        );

        let fallback = bad.alt([ok]);
        assert_eq!(fallback.run_to_result(&env()).await, Ok(2));
    }

    #[tokio::test]
    async fn test_ap_applies_function() {
        let reader_f: JobReader<Env, String, _> = JobReader::from_context(|env: &Env| {
            let greeting = env.greeting;
            Outcome::Success(move |name: &str| format!("{greeting} {name}"))
        });
        let reader_a = JobReader::pure("Bruce");
        assert_eq!(
            ap(reader_f, reader_a).run_to_result(&env()).await,
            Ok("Hello Bruce".to_string())
        );
    }

    #[tokio::test]
    async fn test_from_future_receives_context() {
        let reader: JobReader<Env, String, String> = JobReader::from_future(
            |env: Env| async move { Ok::<_, String>(env.greeting.to_uppercase()) },
            |rejection| rejection.to_string(),
        );
        assert_eq!(reader.run_to_result(&env()).await, Ok("HELLO".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_race_picks_fastest_reader() {
        let mirror = |name: &'static str, latency: u64| {
            JobReader::<Env, String, String>::from_context(move |env: &Env| {
                Outcome::Success(format!("{} from {name}", env.greeting))
            })
            .delay(Duration::from_millis(latency))
        };

        let reader = mirror("eu", 120).race([mirror("us", 100), mirror("ap", 110)]);
        assert_eq!(
            reader.run_to_result(&env()).await,
            Ok("Hello from us".to_string())
        );
    }

    #[tokio::test]
    async fn test_retry_reruns_failed_reader() {
        let (flaky, runs) = flaky_job(2, "ok", "down".to_string());
        let reader: JobReader<Env, String, &str> = JobReader::from_job(flaky).retry(2);
        assert_eq!(reader.run_to_result(&env()).await, Ok("ok"));
        assert_eq!(runs.count(), 3);
    }

    #[tokio::test]
    async fn test_retry_count_read_from_context() {
        let (flaky, runs) = flaky_job(5, "ok", "down".to_string());
        let reader = JobReader::new(move |env: &Env| flaky.clone().retry(env.retries));
        assert_eq!(reader.run_to_result(&env()).await, Err("down".to_string()));
        assert_eq!(runs.count(), 3);
    }
}

//! Integration tests for jobs composed through the public API

use anyhow::Result;
use jobkit::testing::{counting_factory, flaky_job, init_test_tracing, CallCounter};
use jobkit::{
    alt, list, race, retry_with_config, with_fifo_cache, FifoCache, Job, JobConfig, JobReader,
    Outcome, Rejection,
};
use std::time::Duration;

#[tokio::test]
async fn test_fifo_cache_window_of_ten() -> Result<()> {
    init_test_tracing();
    let (factory, calls) = counting_factory(|key: u32| format!("Hello, {key}"));
    let cache: FifoCache<u32, String, String> = FifoCache::new(factory, 10);

    for key in 0..20 {
        let value = cache.job(key).run_to_result().await;
        assert_eq!(value, Ok(format!("Hello, {key}")));
    }
    assert_eq!(calls.count(), 20);
    assert_eq!(cache.len(), 10);

    // The last ten inserts are still served from memory
    for key in 10..20 {
        cache.job(key).run_to_result().await.ok();
    }
    assert_eq!(calls.count(), 20);

    // The first ten fell out of the window
    for key in 0..10 {
        assert!(!cache.contains(&key));
    }
    cache.job(0).run_to_result().await.ok();
    assert_eq!(calls.count(), 21);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_cached_factory_composes_with_async_jobs() -> Result<()> {
    let (factory, calls) = counting_factory(|key: &'static str| key.len());
    let slow_factory = move |key: &'static str| factory(key).delay(Duration::from_millis(50));
    let lookup = with_fifo_cache::<_, String, _>(slow_factory, 4);

    let first = list(lookup("dog"), [lookup("horse")]).run_to_result().await;
    assert_eq!(
        first,
        Ok(vec![Outcome::Success(3), Outcome::Success(5)])
    );

    let start = tokio::time::Instant::now();
    assert_eq!(lookup("dog").await, Ok(3));
    assert_eq!(start.elapsed(), Duration::ZERO);
    assert_eq!(calls.count(), 2);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_config_driven_retry_and_timeout() -> Result<()> {
    init_test_tracing();
    let config = JobConfig::from_toml_str(
        r#"
        timeout = "2s"

        [retry]
        attempts = 3
        initial_delay = "100ms"
        backoff = "fixed"
        "#,
    )?;

    let (flaky, runs) = flaky_job(2, "payload", "upstream busy".to_string());
    let job = retry_with_config(move |_| flaky.clone(), &config.retry)?;
    let job = match config.timeout {
        Some(timeout) => job.timeout(timeout, "gave up".to_string()),
        None => job,
    };

    assert_eq!(job.await, Ok("payload"));
    assert_eq!(runs.count(), 3);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_timeout_wins_over_slow_retries() -> Result<()> {
    let config = JobConfig::from_toml_str(
        r#"
        [retry]
        attempts = 5
        initial_delay = "1s"
        backoff = "fixed"
        "#,
    )?;

    let (flaky, runs) = flaky_job(10, 0u8, "down");
    let job = retry_with_config(move |_| flaky.clone(), &config.retry)?
        .timeout(Duration::from_millis(2500), "deadline exceeded");

    assert_eq!(job.run_to_result().await, Err("deadline exceeded"));
    // Attempts at 0s, 1s and 2s had started before the deadline
    assert_eq!(runs.count(), 3);
    Ok(())
}

#[tokio::test]
async fn test_external_operations_behind_fallback() -> Result<()> {
    let primary: Job<String, u16> = Job::from_future(
        || async { Err::<u16, _>("primary refused") },
        |rejection| rejection.to_string(),
    );
    let replica: Job<String, u16> =
        Job::from_future(|| async { Ok::<_, String>(8080) }, |rejection| rejection.to_string());

    assert_eq!(alt(primary.clone(), [replica]).await, Ok(8080));
    assert_eq!(
        primary.await,
        Err("external operation failed: primary refused".to_string())
    );
    Ok(())
}

#[tokio::test]
async fn test_panicking_future_is_contained() -> Result<()> {
    let job: Job<Rejection<String>, u8> = Job::from_future(
        || -> std::future::Ready<Result<u8, String>> { panic!("start blew up") },
        |rejection| rejection,
    );
    assert_eq!(
        job.run_to_outcome().await,
        Outcome::Failure(Rejection::Panic("start blew up".to_string()))
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_race_of_mirrors() -> Result<()> {
    let mirror = |name: &'static str, latency: u64| {
        Job::<String, _>::pure(name).delay(Duration::from_millis(latency))
    };
    let fastest = race(
        mirror("eu", 120),
        [mirror("us", 80), mirror("ap", 200)],
    );
    assert_eq!(fastest.await, Ok("us"));
    Ok(())
}

#[derive(Clone)]
struct Services {
    region: &'static str,
    lookups: CallCounter,
}

fn lookup_user(id: u32) -> JobReader<Services, String, String> {
    JobReader::from_context(move |services: &Services| {
        services.lookups.increment();
        if id == 0 {
            Outcome::Failure("no such user".to_string())
        } else {
            Outcome::Success(format!("user-{id}@{}", services.region))
        }
    })
}

#[tokio::test(start_paused = true)]
async fn test_reader_threads_context_through_combinators() -> Result<()> {
    let services = Services {
        region: "eu-west",
        lookups: CallCounter::new(),
    };

    let profile = lookup_user(7)
        .delay(Duration::from_millis(10))
        .timeout(Duration::from_secs(1), "timed out".to_string())
        .bind(|user| JobReader::ask().map(move |services: Services| {
            format!("{user} via {}", services.region)
        }));

    assert_eq!(
        profile.run_to_result(&services).await,
        Ok("user-7@eu-west via eu-west".to_string())
    );

    let fallback = lookup_user(0).alt([lookup_user(1)]);
    assert_eq!(
        fallback.run_to_result(&services).await,
        Ok("user-1@eu-west".to_string())
    );
    assert_eq!(services.lookups.count(), 3);
    Ok(())
}

#[test]
fn test_outcome_serializes_with_type_tag() -> Result<()> {
    let outcomes: Vec<Outcome<String, u32>> =
        vec![Outcome::Success(3), Outcome::Failure("oh no".to_string())];
    let json = serde_json::to_string(&outcomes)?;
    assert_eq!(
        json,
        r#"[{"type":"Success","value":3},{"type":"Failure","value":"oh no"}]"#
    );

    let parsed: Vec<Outcome<String, u32>> = serde_json::from_str(&json)?;
    assert_eq!(parsed, outcomes);
    Ok(())
}

#[test]
fn test_load_config_from_file() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("jobs.toml");
    std::fs::write(&path, "[cache]\nlimit = 25\n")?;

    let config = JobConfig::load(&path)?;
    assert_eq!(config.cache.limit, 25);
    assert_eq!(config.timeout, None);

    let (factory, _calls) = counting_factory(|key: u8| key);
    let cache: FifoCache<u8, String, u8> = FifoCache::from_config(factory, &config.cache)?;
    assert_eq!(cache.limit(), 25);
    Ok(())
}

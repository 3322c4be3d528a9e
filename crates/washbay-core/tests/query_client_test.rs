#![allow(clippy::unwrap_used)]
// Integration tests for `QueryClient` and `Query<T>` on a manual clock.
//
// Runs on tokio's current-thread runtime: a spawned fetch only makes
// progress when the test yields, which keeps interleavings deterministic.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use pretty_assertions::assert_eq;
use tokio::sync::Notify;

use washbay_core::testing::ManualClock;
use washbay_core::{Clock, FetchError, QueryClient, QueryDefaults, QueryKey, QueryOptions};

// ── Helpers ─────────────────────────────────────────────────────────

type Calls = Arc<AtomicUsize>;

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).single().unwrap()
}

fn setup() -> (ManualClock, QueryClient) {
    let clock = ManualClock::new(start());
    let client = QueryClient::with_clock(QueryDefaults::default(), Arc::new(clock.clone()));
    (clock, client)
}

fn counter() -> Calls {
    Arc::new(AtomicUsize::new(0))
}

/// Producer that always resolves to `result`, counting invocations.
fn constant<T>(
    calls: &Calls,
    result: Result<T, FetchError>,
) -> impl Fn() -> BoxFuture<'static, Result<T, FetchError>> + Send + Sync + 'static
where
    T: Clone + Send + Sync + 'static,
{
    let calls = Arc::clone(calls);
    move || {
        calls.fetch_add(1, Ordering::SeqCst);
        let result = result.clone();
        async move { result }.boxed()
    }
}

/// Producer whose n-th invocation resolves to `script[n]`, or `rest` once
/// the script runs out.
fn scripted<T>(
    calls: &Calls,
    script: Vec<Result<T, FetchError>>,
    rest: Result<T, FetchError>,
) -> impl Fn() -> BoxFuture<'static, Result<T, FetchError>> + Send + Sync + 'static
where
    T: Clone + Send + Sync + 'static,
{
    let calls = Arc::clone(calls);
    move || {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        let result = script.get(n).cloned().unwrap_or_else(|| rest.clone());
        async move { result }.boxed()
    }
}

/// Producer whose n-th invocation waits for `gates[n]` and then resolves
/// to `n`. `finished` counts invocations that have returned.
fn gated(
    calls: &Calls,
    gates: &Arc<Vec<Notify>>,
    finished: &Calls,
) -> impl Fn() -> BoxFuture<'static, Result<usize, FetchError>> + Send + Sync + 'static {
    let calls = Arc::clone(calls);
    let gates = Arc::clone(gates);
    let finished = Arc::clone(finished);
    move || {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        let gates = Arc::clone(&gates);
        let finished = Arc::clone(&finished);
        async move {
            gates[n].notified().await;
            finished.fetch_add(1, Ordering::SeqCst);
            Ok(n)
        }
        .boxed()
    }
}

fn gates(n: usize) -> Arc<Vec<Notify>> {
    Arc::new((0..n).map(|_| Notify::new()).collect())
}

/// Yield to spawned tasks until `cond` holds.
async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..1_000 {
        if cond() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}

async fn exploding() -> Result<Vec<u32>, FetchError> {
    panic!("producer blew up")
}

fn transient() -> FetchError {
    FetchError::new("connection reset by peer")
}

// ── Coalescing ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_concurrent_wraps_invoke_producer_once() {
    let (_clock, client) = setup();
    let calls = counter();
    let gates = gates(1);
    let finished = counter();

    let queries: Vec<_> = (0..5)
        .map(|_| {
            client.wrap(
                "services",
                gated(&calls, &gates, &finished),
                QueryOptions::default(),
            )
        })
        .collect();

    assert!(queries[0].state().is_loading);
    gates[0].notify_one();
    queries[0].settled().await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    for query in &queries {
        assert_eq!(query.data().as_deref(), Some(&0));
    }
    assert_eq!(client.observer_count::<usize>("services"), 5);
}

#[tokio::test]
async fn test_fetch_and_retry_join_in_flight_fetch() {
    let (_clock, client) = setup();
    let calls = counter();
    let gates = gates(1);
    let finished = counter();

    let query = client.wrap("locations", gated(&calls, &gates, &finished), QueryOptions::default());
    gates[0].notify_one();
    let (a, b) = tokio::join!(query.fetch(), query.retry());

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(a.data.as_deref(), Some(&0));
    assert_eq!(b.data.as_deref(), Some(&0));
}

#[tokio::test]
async fn test_fresh_data_is_not_refetched_on_wrap() {
    let (_clock, client) = setup();
    let calls = counter();

    let first = client.wrap("services", constant(&calls, Ok(vec![1u32])), QueryOptions::default());
    first.settled().await;
    let second = client.wrap("services", constant(&calls, Ok(vec![2u32])), QueryOptions::default());

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!second.state().is_fetching);
    assert_eq!(second.data().as_deref(), Some(&vec![1]));
}

// ── Ordering ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_late_result_never_overwrites_newer_one() {
    let (_clock, client) = setup();
    let calls = counter();
    let gates = gates(2);
    let finished = counter();

    let query = client.wrap("appointments", gated(&calls, &gates, &finished), QueryOptions::default());
    wait_until(|| calls.load(Ordering::SeqCst) == 1).await;

    // Fetch B supersedes fetch A.
    assert_eq!(client.invalidate("appointments"), 1);
    wait_until(|| calls.load(Ordering::SeqCst) == 2).await;

    gates[1].notify_one();
    let state = query.settled().await;
    assert_eq!(state.data.as_deref(), Some(&1));

    gates[0].notify_one();
    wait_until(|| finished.load(Ordering::SeqCst) == 2).await;

    let state = query.state();
    assert_eq!(state.data.as_deref(), Some(&1));
    assert!(!state.is_fetching);
}

#[tokio::test]
async fn test_fetching_clears_only_when_latest_fetch_settles() {
    let (_clock, client) = setup();
    let calls = counter();
    let gates = gates(2);
    let finished = counter();

    let query = client.wrap("dashboard", gated(&calls, &gates, &finished), QueryOptions::default());
    wait_until(|| calls.load(Ordering::SeqCst) == 1).await;
    client.invalidate("dashboard");
    wait_until(|| calls.load(Ordering::SeqCst) == 2).await;

    // A lands first: applied, but B is still running.
    gates[0].notify_one();
    wait_until(|| finished.load(Ordering::SeqCst) == 1).await;
    let state = query.state();
    assert_eq!(state.data.as_deref(), Some(&0));
    assert!(state.is_fetching);

    gates[1].notify_one();
    let state = query.settled().await;
    assert_eq!(state.data.as_deref(), Some(&1));
}

// ── Retry ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_retry_exhaustion_invokes_producer_attempts_plus_one() {
    let (clock, client) = setup();
    let calls = counter();

    let query = client.wrap(
        "services",
        constant::<Vec<u32>>(&calls, Err(transient())),
        QueryOptions::default().retry_attempts(2),
    );
    let state = query.settled().await;

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(state.is_error);
    assert!(!state.is_loading);
    assert!(!state.is_empty);
    assert_eq!(state.error.as_ref().map(FetchError::message), Some("connection reset by peer"));
    assert_eq!(clock.sleeps_ms(), vec![1000, 2000]);
    assert_eq!(query.snapshot().failure_count, 3);
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let (clock, client) = setup();
    let calls = counter();

    let query = client.wrap(
        ["services", "svc-missing"],
        constant::<Vec<u32>>(&calls, Err(FetchError::with_status("service not found", 404))),
        QueryOptions::default(),
    );
    let state = query.settled().await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(state.is_error);
    assert!(clock.sleeps().is_empty());
}

#[tokio::test]
async fn test_validation_error_is_not_retried() {
    let (clock, client) = setup();
    let calls = counter();

    let query = client.wrap(
        "bookings",
        constant::<Vec<u32>>(&calls, Err(FetchError::new("invalid date range"))),
        QueryOptions::default(),
    );
    query.settled().await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(clock.sleeps().is_empty());
}

#[tokio::test]
async fn test_backoff_delays_double_and_cap() {
    let (clock, client) = setup();
    let calls = counter();
    let retries = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&retries);

    let query = client.wrap(
        "metrics",
        constant::<Vec<u32>>(&calls, Err(transient())),
        QueryOptions::default()
            .retry_attempts(6)
            .retry_delay_base(Duration::from_millis(1000))
            .on_retry(move |attempt| seen.lock().unwrap().push(attempt)),
    );
    query.settled().await;

    assert_eq!(clock.sleeps_ms(), vec![1000, 2000, 4000, 8000, 16000, 30000]);
    assert_eq!(*retries.lock().unwrap(), vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(calls.load(Ordering::SeqCst), 7);
}

#[tokio::test]
async fn test_manual_retry_resets_attempt_counter() {
    let (clock, client) = setup();
    let calls = counter();

    // Three failures exhaust the budget, the fourth call succeeds, and
    // everything after that fails again.
    let query = client.wrap(
        "appointments",
        scripted(
            &calls,
            vec![
                Err(transient()),
                Err(transient()),
                Err(transient()),
                Ok(vec![7u32]),
            ],
            Err(transient()),
        ),
        QueryOptions::default().retry_attempts(2),
    );
    let state = query.settled().await;
    assert!(state.is_error);
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    let state = query.retry().await;
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert!(state.error.is_none());
    assert!(!state.is_error);
    assert_eq!(state.data.as_deref(), Some(&vec![7]));

    // A later failure walks the full backoff sequence again.
    let state = query.refetch().await;
    assert_eq!(calls.load(Ordering::SeqCst), 7);
    assert!(state.is_error);
    assert_eq!(state.data.as_deref(), Some(&vec![7]));
    assert_eq!(clock.sleeps_ms(), vec![1000, 2000, 1000, 2000]);
}

#[tokio::test]
async fn test_every_fetch_gets_a_full_retry_budget() {
    let (clock, client) = setup();
    let calls = counter();

    let query = client.wrap(
        "services",
        constant::<Vec<u32>>(&calls, Err(transient())),
        QueryOptions::default().retry_attempts(2),
    );
    query.settled().await;
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    let state = query.refetch().await;
    assert!(state.is_error);
    assert_eq!(calls.load(Ordering::SeqCst), 6);

    assert_eq!(client.invalidate("services"), 1);
    let state = query.settled().await;
    assert!(state.is_error);
    assert_eq!(calls.load(Ordering::SeqCst), 9);

    // A new observer mounting on the failed entry retries in full as well.
    let second = client.wrap(
        "services",
        constant::<Vec<u32>>(&calls, Err(transient())),
        QueryOptions::default().retry_attempts(2),
    );
    second.settled().await;
    assert_eq!(calls.load(Ordering::SeqCst), 12);

    assert_eq!(
        clock.sleeps_ms(),
        vec![1000, 2000, 1000, 2000, 1000, 2000, 1000, 2000]
    );
}

#[tokio::test]
async fn test_manual_retry_joins_running_retry_loop() {
    let (clock, client) = setup();
    let calls = counter();
    let gates = gates(2);

    // First call fails after its gate opens, the second succeeds.
    let producer = {
        let calls = Arc::clone(&calls);
        let gates = Arc::clone(&gates);
        move || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            let gates = Arc::clone(&gates);
            async move {
                gates[n].notified().await;
                if n == 0 {
                    Err(transient())
                } else {
                    Ok(vec![u32::try_from(n).unwrap()])
                }
            }
            .boxed()
        }
    };

    let query = client.wrap("appointments", producer, QueryOptions::default());
    gates[0].notify_one();
    wait_until(|| calls.load(Ordering::SeqCst) == 2).await;
    assert!(query.state().is_fetching);

    let (state, ()) = tokio::join!(query.retry(), async { gates[1].notify_one() });

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(!state.is_error);
    assert_eq!(state.data.as_deref(), Some(&vec![1]));
    assert_eq!(clock.sleeps_ms(), vec![1000]);
}

#[tokio::test]
async fn test_error_keeps_previous_data() {
    let (_clock, client) = setup();
    let calls = counter();

    let query = client.wrap(
        "services",
        scripted(&calls, vec![Ok(vec![1u32])], Err(FetchError::with_status("gone", 410))),
        QueryOptions::default(),
    );
    query.settled().await;
    let state = query.refetch().await;

    assert!(state.is_error);
    assert_eq!(state.data.as_deref(), Some(&vec![1]));
    assert!(state.last_updated.is_some());
}

// ── Callbacks ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_callbacks_fire_once_per_event() {
    let (_clock, client) = setup();
    let calls = counter();
    let successes = Arc::new(AtomicU32::new(0));
    let errors = Arc::new(AtomicU32::new(0));
    let (s, e) = (Arc::clone(&successes), Arc::clone(&errors));

    let query = client.wrap(
        "services",
        scripted(&calls, vec![Ok(vec![1u32])], Err(FetchError::with_status("bad", 400))),
        QueryOptions::default()
            .on_success(move |_| {
                s.fetch_add(1, Ordering::SeqCst);
            })
            .on_error(move |_| {
                e.fetch_add(1, Ordering::SeqCst);
            }),
    );
    query.settled().await;
    query.refetch().await;

    assert_eq!(successes.load(Ordering::SeqCst), 1);
    assert_eq!(errors.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_panicking_callback_leaves_state_intact() {
    let (_clock, client) = setup();
    let calls = counter();

    let query = client.wrap(
        "services",
        constant(&calls, Ok(vec![3u32])),
        QueryOptions::default().on_success(|_| panic!("listener blew up")),
    );
    let state = query.settled().await;

    assert!(!state.is_error);
    assert_eq!(state.data.as_deref(), Some(&vec![3]));
}

#[tokio::test]
async fn test_panicking_producer_surfaces_as_error() {
    let (_clock, client) = setup();

    let query = client.wrap("services", exploding, QueryOptions::default());
    let state = query.settled().await;

    assert!(state.is_error);
    assert_eq!(state.error.as_ref().map(FetchError::message), Some("query producer panicked"));
}

// ── Emptiness & staleness ───────────────────────────────────────────

#[tokio::test]
async fn test_empty_list_reports_empty_after_load() {
    let (_clock, client) = setup();
    let calls = counter();

    let query = client.wrap("appointments", constant(&calls, Ok(Vec::<u32>::new())), QueryOptions::default());
    assert!(!query.state().is_empty, "loading is never empty");

    let state = query.settled().await;
    assert!(state.is_empty);
    assert!(!state.is_loading);
}

#[tokio::test]
async fn test_data_goes_stale_after_stale_time() {
    let (clock, client) = setup();
    let calls = counter();

    let query = client.wrap("services", constant(&calls, Ok(vec![1u32])), QueryOptions::default());
    let state = query.settled().await;
    assert!(!state.is_stale);

    clock.advance(Duration::from_millis(400_000));
    assert!(query.state().is_stale);

    // A fresh observer of stale data triggers a refetch.
    let again = client.wrap("services", constant(&calls, Ok(vec![2u32])), QueryOptions::default());
    let state = again.settled().await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(!state.is_stale);
    assert_eq!(query.data().as_deref(), Some(&vec![2]));
}

// ── Invalidation & direct updates ───────────────────────────────────

#[tokio::test]
async fn test_invalidate_prefix_refetches_observed_entries() {
    let (_clock, client) = setup();
    let all_calls = counter();
    let scheduled_calls = counter();
    let service_calls = counter();

    let all = client.wrap(["appointments", "all"], constant(&all_calls, Ok(vec![1u32])), QueryOptions::default());
    let scheduled = client.wrap(
        ["appointments", "scheduled"],
        constant(&scheduled_calls, Ok(vec![2u32])),
        QueryOptions::default(),
    );
    let services = client.wrap("services", constant(&service_calls, Ok(vec![3u32])), QueryOptions::default());
    all.settled().await;
    scheduled.settled().await;
    services.settled().await;

    assert_eq!(client.invalidate_prefix("appointments"), 2);
    assert!(all.state().is_stale);
    all.settled().await;
    scheduled.settled().await;

    assert_eq!(all_calls.load(Ordering::SeqCst), 2);
    assert_eq!(scheduled_calls.load(Ordering::SeqCst), 2);
    assert_eq!(service_calls.load(Ordering::SeqCst), 1);
    assert!(!all.state().is_stale);
}

#[tokio::test]
async fn test_invalidate_marks_unobserved_entry_stale_without_fetching() {
    let (_clock, client) = setup();
    let calls = counter();

    client.set_query_data(["appointments", "cancelled"], vec![9u32]);
    assert_eq!(client.invalidate_prefix("appointments"), 1);

    let query = client.wrap(
        ["appointments", "cancelled"],
        constant(&calls, Ok(vec![10u32])),
        QueryOptions::default(),
    );
    assert_eq!(query.data().as_deref(), Some(&vec![9]));
    assert!(query.state().is_stale);

    let state = query.settled().await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(state.data.as_deref(), Some(&vec![10]));
}

#[tokio::test]
async fn test_set_query_data_is_visible_to_observers() {
    let (clock, client) = setup();
    let calls = counter();

    let query = client.wrap("services", constant(&calls, Ok(vec![1u32])), QueryOptions::default());
    query.settled().await;

    client.set_query_data("services", vec![5u32, 6]);
    let state = query.state();
    assert_eq!(state.data.as_deref(), Some(&vec![5, 6]));
    assert_eq!(state.last_updated, Some(clock.now()));
    assert_eq!(client.get_query_data::<Vec<u32>>("services").as_deref(), Some(&vec![5, 6]));
    assert!(client.get_query_data::<Vec<u32>>("locations").is_none());
}

#[tokio::test]
async fn test_payload_types_do_not_share_entries() {
    let (_clock, client) = setup();
    let calls = counter();

    client.set_query_data("metrics", 42u64);
    client.set_query_data("metrics", String::from("forty-two"));

    assert_eq!(client.get_query_data::<u64>("metrics").as_deref(), Some(&42));
    assert_eq!(client.get_query_data::<String>("metrics").as_deref().map(String::as_str), Some("forty-two"));
    assert_eq!(client.len(), 2);
    assert_eq!(client.keys(), vec![QueryKey::from("metrics")]);

    let query = client.wrap("metrics", constant(&calls, Ok(7u32)), QueryOptions::default());
    query.settled().await;
    assert_eq!(client.get_query_data::<u64>("metrics").as_deref(), Some(&42));
}

// ── Observers ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_set_key_ignores_old_key_result() {
    let (_clock, client) = setup();
    let calls = counter();
    let gates = gates(1);
    let finished = counter();
    let other_calls = counter();

    let mut query = client.wrap(["appointments", "all"], gated(&calls, &gates, &finished), QueryOptions::default());
    wait_until(|| calls.load(Ordering::SeqCst) == 1).await;

    query.set_key(["appointments", "scheduled"], constant(&other_calls, Ok(100usize)));
    assert_eq!(query.key(), &QueryKey::from(["appointments", "scheduled"]));
    query.settled().await;

    gates[0].notify_one();
    wait_until(|| finished.load(Ordering::SeqCst) == 1).await;

    assert_eq!(query.data().as_deref(), Some(&100));
    assert_eq!(client.observer_count::<usize>(["appointments", "all"]), 0);
}

#[tokio::test]
async fn test_disabled_query_waits_for_enable() {
    let (_clock, client) = setup();
    let calls = counter();

    let mut query = client.wrap(
        "services",
        constant(&calls, Ok(vec![1u32])),
        QueryOptions::default().enabled(false),
    );
    tokio::task::yield_now().await;
    let state = query.state();
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(!state.is_loading);
    assert!(state.data.is_none());

    // Disabled entries are marked but never refetched by invalidation.
    client.invalidate("services");
    tokio::task::yield_now().await;
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    query.set_enabled(true);
    let state = query.settled().await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(state.data.as_deref(), Some(&vec![1]));
}

#[tokio::test]
async fn test_changed_yields_each_transition() {
    let (_clock, client) = setup();
    let calls = counter();
    let gates = gates(1);
    let finished = counter();

    let mut query = client.wrap("services", gated(&calls, &gates, &finished), QueryOptions::default());
    gates[0].notify_one();

    let mut last = query.state();
    while last.is_fetching {
        last = query.changed().await.unwrap();
    }
    assert_eq!(last.data.as_deref(), Some(&0));
}

// ── Garbage collection ──────────────────────────────────────────────

#[tokio::test]
async fn test_gc_drops_unobserved_entries_after_window() {
    let (clock, client) = setup();
    let calls = counter();

    let query = client.wrap("services", constant(&calls, Ok(vec![1u32])), QueryOptions::default());
    query.settled().await;
    drop(query);

    assert_eq!(client.gc(), 0);
    clock.advance(Duration::from_millis(300_001));
    assert_eq!(client.gc(), 1);
    assert!(client.is_empty());
}

#[tokio::test]
async fn test_dropping_last_observer_schedules_collection() {
    let (_clock, client) = setup();
    let calls = counter();

    let query = client.wrap(
        "services",
        constant(&calls, Ok(vec![1u32])),
        QueryOptions::default().gc_time(Duration::ZERO),
    );
    query.settled().await;
    drop(query);

    wait_until(|| client.is_empty()).await;
}

#[tokio::test]
async fn test_observed_entries_survive_gc() {
    let (clock, client) = setup();
    let calls = counter();

    let query = client.wrap("services", constant(&calls, Ok(vec![1u32])), QueryOptions::default());
    query.settled().await;
    clock.advance(Duration::from_secs(3600));

    assert_eq!(client.gc(), 0);
    assert_eq!(client.remove("services"), 1);
    assert!(client.is_empty());
    // The handle keeps its own view of the removed entry.
    assert_eq!(query.data().as_deref(), Some(&vec![1]));
}

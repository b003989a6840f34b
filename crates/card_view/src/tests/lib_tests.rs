use std::{
    collections::HashMap,
    sync::Mutex as StdMutex,
    time::Duration,
};

use async_trait::async_trait;
use serde_json::{json, Value};

use super::*;

const CONTAINER: &str = "shelter-card-container";

struct FetchPlan {
    delay: Option<Duration>,
    result: Result<Vec<RawRecord>, FetchError>,
}

#[derive(Default)]
struct TestFetcher {
    plans: HashMap<String, FetchPlan>,
}

impl TestFetcher {
    fn returning(endpoint: &str, fixture: Value) -> Self {
        Self::default().plan(endpoint, None, Ok(records_from(fixture)))
    }

    fn failing(endpoint: &str, err: FetchError) -> Self {
        Self::default().plan(endpoint, None, Err(err))
    }

    fn plan(
        mut self,
        endpoint: &str,
        delay: Option<Duration>,
        result: Result<Vec<RawRecord>, FetchError>,
    ) -> Self {
        self.plans
            .insert(endpoint.to_string(), FetchPlan { delay, result });
        self
    }
}

#[async_trait]
impl RecordFetcher for TestFetcher {
    async fn fetch_records(&self, endpoint: &str) -> Result<Vec<RawRecord>, FetchError> {
        let plan = self
            .plans
            .get(endpoint)
            .unwrap_or_else(|| panic!("no fetch plan for endpoint '{endpoint}'"));
        if let Some(delay) = plan.delay {
            tokio::time::sleep(delay).await;
        }
        plan.result.clone()
    }
}

#[derive(Default)]
struct RecordingSink {
    failures: StdMutex<Vec<(FetchErrorKind, String)>>,
}

impl RecordingSink {
    fn recorded(&self) -> Vec<(FetchErrorKind, String)> {
        self.failures.lock().expect("sink lock").clone()
    }
}

impl ObservabilitySink for RecordingSink {
    fn failure(&self, kind: FetchErrorKind, message: &str) {
        self.failures
            .lock()
            .expect("sink lock")
            .push((kind, message.to_string()));
    }
}

fn records_from(fixture: Value) -> Vec<RawRecord> {
    match fixture {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(map) => map,
                _ => RawRecord::new(),
            })
            .collect(),
        _ => panic!("fixture must be a JSON array"),
    }
}

struct Harness {
    page: Arc<InMemoryPage>,
    sink: Arc<RecordingSink>,
    renderer: Arc<CardRenderer>,
}

fn harness(fetcher: TestFetcher) -> Harness {
    let page = Arc::new(InMemoryPage::with_containers([CONTAINER]));
    let sink = Arc::new(RecordingSink::default());
    let renderer = CardRenderer::with_sink(
        Arc::new(fetcher),
        Arc::clone(&page) as Arc<dyn ContainerHost>,
        Arc::clone(&sink) as Arc<dyn ObservabilitySink>,
    );
    Harness {
        page,
        sink,
        renderer,
    }
}

fn card_count(content: &str) -> usize {
    content.matches("<div class=\"card\"").count()
}

#[tokio::test]
async fn renders_one_fragment_per_record_in_response_order() {
    let h = harness(TestFetcher::returning(
        "shelters",
        json!([
            {"id": 3, "name": "Cohort"},
            {"id": 1, "name": "Haven"},
            {"id": 2, "name": "Arche"}
        ]),
    ));

    let outcome = h.renderer.load_once("shelters", CONTAINER).await;
    assert_eq!(outcome, LoadOutcome::Rendered { cards: 3 });

    let content = h.page.content(CONTAINER).await.expect("content");
    assert_eq!(card_count(&content), 3);

    let third = content.find("id=\"shelter-3\"").expect("shelter-3");
    let first = content.find("id=\"shelter-1\"").expect("shelter-1");
    let second = content.find("id=\"shelter-2\"").expect("shelter-2");
    assert!(third < first && first < second, "response order not preserved");
}

#[tokio::test]
async fn failed_fetch_leaves_exactly_one_fallback_fragment() {
    let h = harness(TestFetcher::failing(
        "shelters",
        FetchError::HttpStatus { status: 500 },
    ));
    h.page
        .replace_content(CONTAINER, "<p>stale</p>".into())
        .await
        .expect("seed");

    let outcome = h.renderer.load_once("shelters", CONTAINER).await;
    assert_eq!(
        outcome,
        LoadOutcome::Failed {
            kind: FetchErrorKind::HttpStatus
        }
    );

    let content = h.page.content(CONTAINER).await.expect("content");
    assert_eq!(content, FALLBACK_FRAGMENT);
    assert_eq!(card_count(&content), 0);

    let failures = h.sink.recorded();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, FetchErrorKind::HttpStatus);
    assert!(failures[0].1.contains("500"));
}

#[tokio::test]
async fn defaulted_records_never_abort_the_render() {
    let h = harness(TestFetcher::returning(
        "shelters",
        json!([
            {"id": 1, "name": "Cohort", "email": "a@b.org", "phone": "+1", "address": "1 Rd"},
            "not-an-object",
            {"id": 2, "name": "Haven"}
        ]),
    ));

    let outcome = h.renderer.load_once("shelters", CONTAINER).await;
    assert_eq!(outcome, LoadOutcome::Rendered { cards: 3 });

    let content = h.page.content(CONTAINER).await.expect("content");
    assert_eq!(card_count(&content), 3);
    assert!(!content.contains("undefined"));
    assert!(!content.contains("null"));
    // The record after the malformed one still renders fully.
    assert!(content.contains("id=\"shelter-2\""));
    assert!(content.contains("<p>Email: </p>"));
}

#[tokio::test]
async fn reloading_replaces_content_instead_of_appending() {
    let h = harness(TestFetcher::returning(
        "shelters",
        json!([{"id": 1, "name": "Cohort"}, {"id": 2, "name": "Haven"}]),
    ));

    h.renderer.load_once("shelters", CONTAINER).await;
    h.renderer.load_once("shelters", CONTAINER).await;

    let content = h.page.content(CONTAINER).await.expect("content");
    assert_eq!(card_count(&content), 2);
    assert_eq!(content.matches("id=\"shelter-1\"").count(), 1);
}

#[tokio::test]
async fn markup_in_field_values_is_rendered_inert() {
    let h = harness(TestFetcher::returning(
        "shelters",
        json!([{"id": 1, "name": "<script>alert('pwned')</script>"}]),
    ));

    h.renderer.load_once("shelters", CONTAINER).await;

    let content = h.page.content(CONTAINER).await.expect("content");
    assert!(!content.contains("<script>"));
    assert!(content.contains("&lt;script&gt;alert(&#39;pwned&#39;)&lt;/script&gt;"));
}

#[tokio::test]
async fn missing_container_aborts_silently() {
    let h = harness(TestFetcher::returning("shelters", json!([{"id": 1}])));

    let outcome = h.renderer.load_once("shelters", "ghost-container").await;
    assert_eq!(outcome, LoadOutcome::MissingContainer);
    assert!(h.sink.recorded().is_empty());
}

#[tokio::test]
async fn invalid_endpoint_takes_the_failure_path() {
    let h = harness(TestFetcher::default());

    let outcome = h.renderer.load_once("shelters/../admin", CONTAINER).await;
    assert_eq!(
        outcome,
        LoadOutcome::Failed {
            kind: FetchErrorKind::InvalidEndpoint
        }
    );

    let content = h.page.content(CONTAINER).await.expect("content");
    assert_eq!(content, FALLBACK_FRAGMENT);
    assert_eq!(h.sink.recorded()[0].0, FetchErrorKind::InvalidEndpoint);
}

#[tokio::test]
async fn cancelled_load_leaves_the_container_untouched() {
    let h = harness(TestFetcher::default().plan(
        "shelters",
        Some(Duration::from_millis(200)),
        Ok(records_from(json!([{"id": 1, "name": "Cohort"}]))),
    ));
    h.page
        .replace_content(CONTAINER, "<p>previous</p>".into())
        .await
        .expect("seed");

    let handle = h.renderer.load("shelters", CONTAINER);
    let phases = handle.phase_changes();
    handle.cancel();

    let outcome = handle.join().await;
    assert_eq!(outcome, LoadOutcome::Cancelled);
    assert_eq!(*phases.borrow(), LoadPhase::Cancelled);
    assert_eq!(
        h.page.content(CONTAINER).await.expect("content"),
        "<p>previous</p>"
    );
}

#[tokio::test]
async fn cancel_after_commit_keeps_the_rendered_content() {
    let h = harness(TestFetcher::returning("shelters", json!([{"id": 1}])));

    let handle = h.renderer.load("shelters", CONTAINER);
    let mut phases = handle.phase_changes();
    phases
        .wait_for(|phase| *phase == LoadPhase::Rendered)
        .await
        .expect("rendered");

    handle.cancel();
    assert_eq!(handle.join().await, LoadOutcome::Rendered { cards: 1 });
    let content = h.page.content(CONTAINER).await.expect("content");
    assert_eq!(card_count(&content), 1);
}

#[tokio::test]
async fn concurrent_loads_on_one_container_never_interleave() {
    // Fast load succeeds immediately; slow load fails after a delay. The
    // slow failure commits last, so the final state must be exactly the
    // fallback fragment with no card fragments mixed in.
    let h = harness(
        TestFetcher::default()
            .plan(
                "pets",
                None,
                Ok(records_from(json!([{"id": 9, "name": "Rex"}]))),
            )
            .plan(
                "shelters",
                Some(Duration::from_millis(100)),
                Err(FetchError::Network {
                    message: "connection reset".into(),
                }),
            ),
    );

    let fast = h.renderer.load("pets", CONTAINER);
    let slow = h.renderer.load("shelters", CONTAINER);
    let (fast_outcome, slow_outcome) = tokio::join!(fast.join(), slow.join());

    assert_eq!(fast_outcome, LoadOutcome::Rendered { cards: 1 });
    assert_eq!(
        slow_outcome,
        LoadOutcome::Failed {
            kind: FetchErrorKind::Network
        }
    );
    assert_eq!(
        h.page.content(CONTAINER).await.expect("content"),
        FALLBACK_FRAGMENT
    );
}

#[tokio::test]
async fn concurrent_slow_success_wins_over_fast_failure() {
    let h = harness(
        TestFetcher::default()
            .plan(
                "shelters",
                Some(Duration::from_millis(100)),
                Ok(records_from(json!([{"id": 1, "name": "Cohort"}]))),
            )
            .plan(
                "pets",
                None,
                Err(FetchError::HttpStatus { status: 502 }),
            ),
    );

    let slow = h.renderer.load("shelters", CONTAINER);
    let fast = h.renderer.load("pets", CONTAINER);
    let (slow_outcome, fast_outcome) = tokio::join!(slow.join(), fast.join());

    assert_eq!(slow_outcome, LoadOutcome::Rendered { cards: 1 });
    assert_eq!(
        fast_outcome,
        LoadOutcome::Failed {
            kind: FetchErrorKind::HttpStatus
        }
    );

    let content = h.page.content(CONTAINER).await.expect("content");
    assert_eq!(card_count(&content), 1);
    assert!(!content.contains(FALLBACK_FRAGMENT));
}

#[tokio::test]
async fn each_load_runs_a_fresh_state_machine() {
    let h = harness(
        TestFetcher::default()
            .plan(
                "shelters",
                None,
                Err(FetchError::Network {
                    message: "down".into(),
                }),
            )
            .plan(
                "pets",
                None,
                Ok(records_from(json!([{"id": 4, "name": "Maya"}]))),
            ),
    );

    let first = h.renderer.load_once("shelters", CONTAINER).await;
    assert!(matches!(first, LoadOutcome::Failed { .. }));

    let second = h.renderer.load_once("pets", CONTAINER).await;
    assert_eq!(second, LoadOutcome::Rendered { cards: 1 });
    let content = h.page.content(CONTAINER).await.expect("content");
    assert!(content.contains("id=\"pet-4\""));
    assert!(!content.contains(FALLBACK_FRAGMENT));
}

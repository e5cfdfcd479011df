// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::helpers::{morning, raw, CannedEngine};
use pricecrawl::config::settings::{CompletionPolicy, Settings};
use pricecrawl::domain::services::category_scraper::CategoryOutcome;
use pricecrawl::domain::services::run_state_store::RunStateStore;
use pricecrawl::infrastructure::backend_client::HttpBackendClient;
use pricecrawl::infrastructure::storage::JsonFileRunStateRepository;
use pricecrawl::scheduler::clock::ManualClock;
use pricecrawl::utils::retry_policy::RetryPolicy;
use pricecrawl::workers::manager::{RunOrchestrator, RunStatus};
use pricecrawl::workers::site_worker::SiteWorker;
use pricecrawl::workers::SiteScraper;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ENDPOINT: &str = "/api/scraper/price";

struct Pipeline {
    orchestrator: RunOrchestrator,
    clock: Arc<ManualClock>,
    engine: Arc<CannedEngine>,
    state_path: PathBuf,
    _dir: TempDir,
}

fn settings(backend: &str) -> Settings {
    Settings::from_toml_str(&format!(
        r#"
        [backend]
        url = "{}{}"
        timeout_secs = 5

        [[scrapers]]
        identity = "daraz_phones"
        site = "daraz"
        per_category_limit = 3
        min_delay_ms = 0
        max_delay_ms = 0
        categories = [
            {{ name = "phones", path = "/catalog/?q=phones" }},
            {{ name = "laptops", path = "/catalog/?q=laptops" }},
        ]
        "#,
        backend, ENDPOINT
    ))
    .expect("settings should load")
}

fn pipeline(server: &MockServer, engine: CannedEngine) -> Pipeline {
    let settings = settings(&server.uri());
    settings.validate().expect("settings should be valid");

    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("last_run.json");
    let clock = Arc::new(ManualClock::new(morning(19)));
    let store = Arc::new(RunStateStore::new(
        Arc::new(JsonFileRunStateRepository::new(&state_path)),
        clock.clone(),
        settings.schedule.run_interval_days,
    ));
    let engine = Arc::new(engine);
    let retry = RetryPolicy::immediate(3);

    let scrapers = settings
        .scrapers
        .iter()
        .map(|s| {
            Arc::new(SiteWorker::from_settings(s, engine.clone(), store.clone(), retry.clone()))
                as Arc<dyn SiteScraper>
        })
        .collect();
    let sink = Arc::new(HttpBackendClient::new(&settings.backend).unwrap());

    Pipeline {
        orchestrator: RunOrchestrator::new(scrapers, sink, retry, CompletionPolicy::Always),
        clock,
        engine,
        state_path,
        _dir: dir,
    }
}

fn storefront() -> CannedEngine {
    CannedEngine::default()
        .with_page(
            "phones",
            vec![
                raw("Samsung Galaxy A15 128GB", "Rs. 54,999"),
                raw("Infinix Hot 40i", "Rs. 32,499"),
                raw("Apple iPhone 13", "Rs. 189,999"),
                raw("Xiaomi Redmi 13C", "Rs. 29,999"),
            ],
        )
        .with_page(
            "laptops",
            vec![
                raw("HP 250 G9 Core i5", "Rs. 139,000"),
                raw("Dell Latitude 5420", "Rs. 98,500"),
            ],
        )
}

async fn posted_bodies(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect()
}

#[tokio::test]
async fn test_run_now_submits_one_batch_per_category_and_records_the_day() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(201))
        .expect(2)
        .mount(&server)
        .await;
    let pipeline = pipeline(&server, storefront());

    let report = pipeline.orchestrator.run_cycle(false).await;

    let run = &report.scrapers[0];
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.records, 5);
    assert!(run.marked_complete);
    assert!(run.submissions.iter().all(|s| s.succeeded() && s.attempts == 1));
    assert_eq!(pipeline.engine.opened(), 1);
    assert_eq!(pipeline.engine.closed(), 1);

    let bodies = posted_bodies(&server).await;
    assert_eq!(bodies.len(), 2);
    assert_eq!(bodies[0]["scraper"], "daraz_phones");
    assert_eq!(bodies[0]["category"], "phones");
    assert_eq!(bodies[0]["listings"].as_array().unwrap().len(), 3);
    assert_eq!(bodies[0]["listings"][0]["title"], "Samsung Galaxy A15 128GB");
    assert_eq!(bodies[0]["listings"][0]["price"], 54999.0);
    assert_eq!(bodies[0]["listings"][0]["brand"], "Samsung");
    assert_eq!(bodies[0]["listings"][0]["source"], "Daraz");
    assert_eq!(
        bodies[0]["listings"][0]["description"],
        "Samsung Galaxy A15 128GB"
    );
    assert_eq!(bodies[1]["category"], "laptops");
    assert_eq!(bodies[1]["listings"].as_array().unwrap().len(), 2);

    let state: Value =
        serde_json::from_str(&std::fs::read_to_string(&pipeline.state_path).unwrap()).unwrap();
    assert_eq!(state["daraz_phones"], "2026-10-19");
}

#[tokio::test]
async fn test_second_run_same_day_is_skipped_until_the_next_day() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    let pipeline = pipeline(&server, storefront());

    assert_eq!(pipeline.orchestrator.run_cycle(false).await.completed(), 1);

    let again = pipeline.orchestrator.run_cycle(false).await;
    assert_eq!(again.skipped(), 1);
    assert_eq!(pipeline.engine.opened(), 1);
    assert_eq!(posted_bodies(&server).await.len(), 2);

    pipeline.clock.set(morning(20));
    assert_eq!(pipeline.orchestrator.run_cycle(false).await.completed(), 1);
    assert_eq!(pipeline.engine.opened(), 2);
}

#[tokio::test]
async fn test_deleted_state_file_makes_the_scraper_due_again() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    let pipeline = pipeline(&server, storefront());

    pipeline.orchestrator.run_cycle(false).await;
    std::fs::remove_file(&pipeline.state_path).unwrap();

    assert_eq!(pipeline.orchestrator.run_cycle(false).await.completed(), 1);
}

#[tokio::test]
async fn test_empty_category_is_reported_and_not_submitted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    let engine = CannedEngine::default().with_page("phones", vec![raw("Apple iPhone 15", "Rs. 289,999")]);
    let pipeline = pipeline(&server, engine);

    let report = pipeline.orchestrator.run_cycle(false).await;

    let run = &report.scrapers[0];
    assert_eq!(run.tallies[1].category, "laptops");
    assert_eq!(run.tallies[1].outcome, CategoryOutcome::ZeroFound);
    assert_eq!(run.submissions.len(), 1);
    assert!(run.marked_complete);
}

#[tokio::test]
async fn test_malformed_listings_are_dropped_before_submission() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    let engine = CannedEngine::default().with_page(
        "phones",
        vec![
            raw("Vivo Y17s", "Rs. 36,999"),
            raw("Realme Note 50", "Price not found"),
            raw("", "Rs. 10,000"),
        ],
    );
    let pipeline = pipeline(&server, engine);

    let report = pipeline.orchestrator.run_cycle(false).await;

    assert_eq!(
        report.scrapers[0].tallies[0].outcome,
        CategoryOutcome::Scraped {
            found: 3,
            kept: 1,
            dropped: 2,
        }
    );
    let bodies = posted_bodies(&server).await;
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["listings"][0]["title"], "Vivo Y17s");
}

#[tokio::test]
async fn test_backend_outage_is_retried_and_the_day_still_counts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .expect(6)
        .mount(&server)
        .await;
    let pipeline = pipeline(&server, storefront());

    let report = pipeline.orchestrator.run_cycle(false).await;

    let run = &report.scrapers[0];
    assert_eq!(run.submissions.len(), 2);
    for submission in &run.submissions {
        assert!(!submission.succeeded());
        assert_eq!(submission.attempts, 3);
        assert!(submission.error.as_deref().unwrap().contains("503"));
    }
    assert!(run.marked_complete);
    assert_eq!(pipeline.engine.closed(), 1);
    assert_eq!(pipeline.orchestrator.run_cycle(false).await.skipped(), 1);
}

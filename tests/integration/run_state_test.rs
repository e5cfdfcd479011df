// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::helpers::morning;
use pricecrawl::domain::models::run_state::ScraperIdentity;
use pricecrawl::domain::services::run_state_store::RunStateStore;
use pricecrawl::infrastructure::storage::JsonFileRunStateRepository;
use pricecrawl::scheduler::clock::ManualClock;
use std::path::Path;
use std::sync::Arc;

fn store(path: &Path, clock: Arc<ManualClock>) -> RunStateStore {
    RunStateStore::new(Arc::new(JsonFileRunStateRepository::new(path)), clock, 1)
}

#[tokio::test]
async fn test_state_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state").join("last_run.json");
    let clock = Arc::new(ManualClock::new(morning(19)));
    let daraz = ScraperIdentity::new("daraz_selenium");

    store(&path, clock.clone()).mark_complete(&daraz, None).await.unwrap();

    let reopened = store(&path, clock.clone());
    assert!(!reopened.should_run_today(&daraz).await);
    assert!(reopened.should_run_today(&ScraperIdentity::new("amazon_selenium")).await);

    clock.set(morning(20));
    assert!(reopened.should_run_today(&daraz).await);
}

#[tokio::test]
async fn test_hand_edited_file_is_honoured() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("last_run.json");
    std::fs::write(
        &path,
        r#"{ "daraz_selenium": "2026-10-19", "amazon_selenium": "2026-10-18T02:00:13.512" }"#,
    )
    .unwrap();
    let store = store(&path, Arc::new(ManualClock::new(morning(19))));

    assert!(!store.should_run_today(&ScraperIdentity::new("daraz_selenium")).await);
    assert!(store.should_run_today(&ScraperIdentity::new("amazon_selenium")).await);
}

#[tokio::test]
async fn test_corrupt_file_means_every_scraper_is_due() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("last_run.json");
    std::fs::write(&path, "{ not json").unwrap();
    let store = store(&path, Arc::new(ManualClock::new(morning(19))));
    let daraz = ScraperIdentity::new("daraz_selenium");

    assert!(store.should_run_today(&daraz).await);

    store.mark_complete(&daraz, None).await.unwrap();
    assert!(!store.should_run_today(&daraz).await);
    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("\"daraz_selenium\""));
}

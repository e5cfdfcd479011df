// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::Utc;
use pricecrawl::config::settings::BackendSettings;
use pricecrawl::domain::models::listing::{ListingBatch, ListingRecord};
use pricecrawl::domain::models::run_state::ScraperIdentity;
use pricecrawl::domain::repositories::listing_sink::ListingSink;
use pricecrawl::infrastructure::backend_client::HttpBackendClient;
use pricecrawl::utils::errors::SubmissionError;
use pricecrawl::utils::retry_policy::Retryable;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(url: String) -> HttpBackendClient {
    HttpBackendClient::new(&BackendSettings {
        url,
        timeout_secs: 5,
    })
    .unwrap()
}

fn batch() -> ListingBatch {
    ListingBatch {
        scraper: ScraperIdentity::new("amazon_selenium"),
        category: "Headphone".to_string(),
        listings: vec![ListingRecord {
            category: "Headphone".to_string(),
            title: "Sony WH-1000XM5".to_string(),
            price: 348.0,
            source_url: "https://www.amazon.com/dp/B09XS7JWHH".to_string(),
            source: "Amazon".to_string(),
            brand: "Sony".to_string(),
            description: "Sony WH-1000XM5 Wireless Noise Canceling Headphones".to_string(),
            image_url: None,
            scraped_at: Utc::now(),
        }],
    }
}

#[tokio::test]
async fn test_submit_posts_batch_as_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/prices"))
        .and(body_partial_json(serde_json::json!({
            "scraper": "amazon_selenium",
            "category": "Headphone",
            "listings": [{
                "title": "Sony WH-1000XM5",
                "price": 348.0,
                "brand": "Sony",
                "description": "Sony WH-1000XM5 Wireless Noise Canceling Headphones"
            }]
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(format!("{}/prices", server.uri()));
    assert!(client.submit(&batch()).await.is_ok());
}

#[tokio::test]
async fn test_non_success_status_is_a_retryable_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database unavailable"))
        .mount(&server)
        .await;

    let err = client(format!("{}/prices", server.uri()))
        .submit(&batch())
        .await
        .unwrap_err();

    match &err {
        SubmissionError::Status { status, body } => {
            assert_eq!(*status, 500);
            assert_eq!(body, "database unavailable");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_unreachable_backend_is_a_transport_error() {
    let server = MockServer::start().await;
    let url = format!("{}/prices", server.uri());
    drop(server);

    let err = client(url).submit(&batch()).await.unwrap_err();

    assert!(matches!(err, SubmissionError::Transport(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_endpoint_ignores_surrounding_whitespace() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/prices"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    let url = format!("{}/prices", server.uri());

    let client = client(format!("  {}\n", url));

    assert_eq!(client.endpoint(), url);
    assert!(client.submit(&batch()).await.is_ok());
}

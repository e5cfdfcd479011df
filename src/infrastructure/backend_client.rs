// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::BackendSettings;
use crate::domain::models::listing::ListingBatch;
use crate::domain::repositories::listing_sink::ListingSink;
use crate::utils::errors::SubmissionError;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::{debug, error, info};

const MAX_ERROR_BODY_CHARS: usize = 512;

/// 后端 HTTP 客户端
///
/// 以 JSON POST 提交分类批次，任何 2xx 视为成功
pub struct HttpBackendClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpBackendClient {
    /// 创建后端客户端
    ///
    /// # 参数
    ///
    /// * `settings` - 后端配置
    ///
    /// # 返回值
    ///
    /// * `Ok(HttpBackendClient)` - 客户端
    /// * `Err(SubmissionError)` - HTTP 客户端构建失败
    pub fn new(settings: &BackendSettings) -> Result<Self, SubmissionError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(concat!("pricecrawl/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            endpoint: settings.url.trim().to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ListingSink for HttpBackendClient {
    async fn submit(&self, batch: &ListingBatch) -> Result<(), SubmissionError> {
        let body = serde_json::to_vec(batch)?;
        debug!(
            scraper = %batch.scraper,
            category = %batch.category,
            listings = batch.listings.len(),
            "Submitting batch to {}",
            self.endpoint
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            info!(
                scraper = %batch.scraper,
                category = %batch.category,
                status = status.as_u16(),
                "Batch accepted by backend"
            );
            return Ok(());
        }

        let body = response
            .text()
            .await
            .unwrap_or_default()
            .chars()
            .take(MAX_ERROR_BODY_CHARS)
            .collect::<String>();
        error!(
            scraper = %batch.scraper,
            category = %batch.category,
            status = status.as_u16(),
            "Backend rejected batch"
        );
        Err(SubmissionError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

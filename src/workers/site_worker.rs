// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::ScraperSettings;
use crate::domain::models::listing::Category;
use crate::domain::models::run_state::ScraperIdentity;
use crate::domain::models::site::SiteProfile;
use crate::domain::repositories::run_state_repository::RunStateError;
use crate::domain::services::category_scraper::{CategoryScraper, ScrapeOutcome};
use crate::domain::services::run_state_store::RunStateStore;
use crate::engines::traits::RenderEngine;
use crate::utils::retry_policy::RetryPolicy;
use crate::workers::worker::SiteScraper;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// 通用站点抓取器
///
/// 站点差异全部来自 `SiteProfile`，不需要为每个站点单独实现
pub struct SiteWorker {
    identity: ScraperIdentity,
    categories: Vec<Category>,
    per_category_limit: usize,
    scraper: CategoryScraper,
    store: Arc<RunStateStore>,
}

impl SiteWorker {
    pub fn new(
        identity: ScraperIdentity,
        categories: Vec<Category>,
        per_category_limit: usize,
        scraper: CategoryScraper,
        store: Arc<RunStateStore>,
    ) -> Self {
        Self {
            identity,
            categories,
            per_category_limit,
            scraper,
            store,
        }
    }

    /// 根据抓取器配置构建
    ///
    /// # 参数
    ///
    /// * `settings` - 抓取器配置
    /// * `engine` - 渲染引擎
    /// * `store` - 运行状态存储
    /// * `retry` - 重试策略
    pub fn from_settings(
        settings: &ScraperSettings,
        engine: Arc<dyn RenderEngine>,
        store: Arc<RunStateStore>,
        retry: RetryPolicy,
    ) -> Self {
        let mut profile = SiteProfile::for_kind(settings.site);
        if let Some(base_url) = &settings.base_url {
            profile = profile.with_base_url(base_url.clone());
        }

        let scraper = CategoryScraper::new(engine, Arc::new(profile), retry).with_politeness_delay(
            Duration::from_millis(settings.min_delay_ms),
            Duration::from_millis(settings.max_delay_ms),
        );
        let categories = settings
            .categories
            .iter()
            .map(|c| Category::new(c.name.clone(), c.path.clone()))
            .collect();

        Self::new(
            ScraperIdentity::new(settings.identity.clone()),
            categories,
            settings.per_category_limit,
            scraper,
            store,
        )
    }

    pub fn per_category_limit(&self) -> usize {
        self.per_category_limit
    }
}

#[async_trait]
impl SiteScraper for SiteWorker {
    fn identity(&self) -> &ScraperIdentity {
        &self.identity
    }

    fn categories(&self) -> &[Category] {
        &self.categories
    }

    async fn should_run_today(&self) -> bool {
        self.store.should_run_today(&self.identity).await
    }

    async fn scrape(&self, categories: &[Category]) -> ScrapeOutcome {
        self.scraper.scrape(categories, self.per_category_limit).await
    }

    async fn mark_run_complete(&self) -> Result<(), RunStateError> {
        self.store.mark_complete(&self.identity, None).await
    }
}

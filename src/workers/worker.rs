// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::listing::Category;
use crate::domain::models::run_state::ScraperIdentity;
use crate::domain::repositories::run_state_repository::RunStateError;
use crate::domain::services::category_scraper::ScrapeOutcome;
use async_trait::async_trait;

/// 站点抓取器特质
///
/// 调度器只通过该特质与具体站点交互
#[async_trait]
pub trait SiteScraper: Send + Sync {
    /// 运行状态键
    fn identity(&self) -> &ScraperIdentity;

    /// 配置的分类，按抓取顺序排列
    fn categories(&self) -> &[Category];

    /// 今天是否需要运行
    async fn should_run_today(&self) -> bool;

    /// 抓取给定分类
    async fn scrape(&self, categories: &[Category]) -> ScrapeOutcome;

    /// 把今天记为已运行
    async fn mark_run_complete(&self) -> Result<(), RunStateError>;
}

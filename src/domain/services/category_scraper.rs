// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::listing::{Category, ListingRecord, RawListing};
use crate::domain::models::site::SiteProfile;
use crate::engines::traits::{EngineError, RenderEngine, RenderSession};
use crate::utils::retry_policy::{with_retry, RetryPolicy};
use chrono::Utc;
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// 向页面请求的原始条目数为保留上限的倍数，格式错误的条目不占用名额
const RAW_WINDOW_FACTOR: usize = 3;

/// 单个分类的抓取结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryOutcome {
    /// 抓到商品，`dropped` 为规范化失败被丢弃的条目数
    Scraped {
        found: usize,
        kept: usize,
        dropped: usize,
    },
    /// 页面渲染后没有任何商品
    ZeroFound,
    /// 重试耗尽或遇到不可重试错误
    Failed { attempts: u32, error: String },
}

/// 分类结果统计
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTally {
    pub category: String,
    pub outcome: CategoryOutcome,
}

/// 一次抓取运行的结果
#[derive(Debug, Clone, Default)]
pub struct ScrapeOutcome {
    /// 按分类配置顺序排列的商品记录
    pub records: Vec<ListingRecord>,
    /// 每个分类一条统计，顺序与输入一致
    pub tallies: Vec<CategoryTally>,
}

impl ScrapeOutcome {
    /// 失败的分类数
    pub fn failed_categories(&self) -> usize {
        self.tallies
            .iter()
            .filter(|t| matches!(t.outcome, CategoryOutcome::Failed { .. }))
            .count()
    }
}

/// 分类抓取服务
///
/// 每次运行打开一个渲染会话，按顺序复用于所有分类，结束时关闭会话。
/// 单个分类失败不会中断其余分类。
pub struct CategoryScraper {
    engine: Arc<dyn RenderEngine>,
    profile: Arc<SiteProfile>,
    retry: RetryPolicy,
    min_delay: Duration,
    max_delay: Duration,
}

impl CategoryScraper {
    /// 创建分类抓取服务
    ///
    /// # 参数
    ///
    /// * `engine` - 渲染引擎
    /// * `profile` - 站点画像
    /// * `retry` - 打开会话和抓取分类共用的重试策略
    pub fn new(engine: Arc<dyn RenderEngine>, profile: Arc<SiteProfile>, retry: RetryPolicy) -> Self {
        Self {
            engine,
            profile,
            retry,
            min_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// 设置相邻分类之间的随机间隔
    pub fn with_politeness_delay(mut self, min_delay: Duration, max_delay: Duration) -> Self {
        self.min_delay = min_delay;
        self.max_delay = max_delay.max(min_delay);
        self
    }

    /// 按顺序抓取所有分类
    ///
    /// # 参数
    ///
    /// * `categories` - 分类列表
    /// * `per_category_limit` - 每个分类最多保留的记录数
    ///
    /// # 返回值
    ///
    /// 抓取结果，会话无法建立时所有分类均记为失败
    pub async fn scrape(&self, categories: &[Category], per_category_limit: usize) -> ScrapeOutcome {
        let mut outcome = ScrapeOutcome::default();

        let opened = with_retry(&self.retry, "open_session", |_| {
            self.engine.open_session(self.profile.clone())
        })
        .await;

        let session = match opened {
            Ok(session) => SessionSlot::new(self.engine.clone(), self.profile.clone(), session),
            Err(e) => {
                warn!(site = %self.profile.name, error = %e, "Could not open browser session");
                outcome.tallies = categories
                    .iter()
                    .map(|c| CategoryTally {
                        category: c.name.clone(),
                        outcome: CategoryOutcome::Failed {
                            attempts: e.attempts(),
                            error: e.to_string(),
                        },
                    })
                    .collect();
                return outcome;
            }
        };

        for (index, category) in categories.iter().enumerate() {
            if index > 0 {
                self.politeness_pause().await;
            }
            let (records, tally) = self
                .scrape_category(&session, category, per_category_limit)
                .await;
            outcome.records.extend(records);
            outcome.tallies.push(tally);
        }

        session.close().await;
        outcome
    }

    async fn scrape_category(
        &self,
        session: &SessionSlot,
        category: &Category,
        limit: usize,
    ) -> (Vec<ListingRecord>, CategoryTally) {
        let operation = format!("fetch_category:{}", category.name);
        let window = limit.saturating_mul(RAW_WINDOW_FACTOR);
        let fetched = with_retry(&self.retry, &operation, |_| {
            session.fetch(category, window)
        })
        .await;

        let raw = match fetched {
            Ok(raw) => raw,
            Err(e) => {
                warn!(site = %self.profile.name, category = %category.name, error = %e, "Category failed");
                let tally = CategoryTally {
                    category: category.name.clone(),
                    outcome: CategoryOutcome::Failed {
                        attempts: e.attempts(),
                        error: e.to_string(),
                    },
                };
                return (Vec::new(), tally);
            }
        };

        if raw.is_empty() {
            info!(site = %self.profile.name, category = %category.name, "No products found");
            let tally = CategoryTally {
                category: category.name.clone(),
                outcome: CategoryOutcome::ZeroFound,
            };
            return (Vec::new(), tally);
        }

        let scraped_at = Utc::now();
        let mut records = Vec::new();
        let mut dropped = 0;
        for entry in &raw {
            if records.len() >= limit {
                break;
            }
            match ListingRecord::normalize(entry, &category.name, &self.profile.name, scraped_at) {
                Ok(record) => records.push(record),
                Err(e) => {
                    debug!(category = %category.name, title = %entry.title, error = %e, "Dropping malformed listing");
                    dropped += 1;
                }
            }
        }

        counter!("pricecrawl_listings_scraped_total", "site" => self.profile.name.clone())
            .increment(records.len() as u64);
        counter!("pricecrawl_listings_dropped_total", "site" => self.profile.name.clone())
            .increment(dropped as u64);
        info!(
            site = %self.profile.name,
            category = %category.name,
            found = raw.len(),
            kept = records.len(),
            dropped,
            "Category scraped"
        );

        let tally = CategoryTally {
            category: category.name.clone(),
            outcome: CategoryOutcome::Scraped {
                found: raw.len(),
                kept: records.len(),
                dropped,
            },
        };
        (records, tally)
    }

    async fn politeness_pause(&self) {
        if self.max_delay.is_zero() {
            return;
        }
        let min = self.min_delay.as_millis() as u64;
        let max = self.max_delay.as_millis() as u64;
        let delay = if max > min {
            rand::random_range(min..=max)
        } else {
            min
        };
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
}

/// 可重建的渲染会话
///
/// 会话级错误（浏览器崩溃、CDP 通道断开）后丢弃当前会话，
/// 下一次抓取时重新打开，因此重试落在新会话上。
struct SessionSlot {
    engine: Arc<dyn RenderEngine>,
    profile: Arc<SiteProfile>,
    current: Mutex<Option<Box<dyn RenderSession>>>,
}

impl SessionSlot {
    fn new(
        engine: Arc<dyn RenderEngine>,
        profile: Arc<SiteProfile>,
        session: Box<dyn RenderSession>,
    ) -> Self {
        Self {
            engine,
            profile,
            current: Mutex::new(Some(session)),
        }
    }

    async fn fetch(
        &self,
        category: &Category,
        limit: usize,
    ) -> Result<Vec<RawListing>, EngineError> {
        let mut current = self.current.lock().await;
        if current.is_none() {
            info!(site = %self.profile.name, "Reopening browser session");
            *current = Some(self.engine.open_session(self.profile.clone()).await?);
        }

        let result = match (*current).as_ref() {
            Some(session) => session.fetch_category(category, limit).await,
            None => Err(EngineError::SessionUnavailable("browser session missing".into())),
        };
        if let Err(e) = &result {
            if e.is_session_lost() {
                warn!(site = %self.profile.name, error = %e, "Browser session lost, discarding it");
                if let Some(mut dead) = current.take() {
                    if let Err(close_err) = dead.close().await {
                        debug!(error = %close_err, "Failed to close lost session");
                    }
                }
            }
        }
        result
    }

    async fn close(self) {
        if let Some(mut session) = self.current.into_inner() {
            if let Err(e) = session.close().await {
                warn!(site = %self.profile.name, error = %e, "Failed to close browser session");
            }
        }
    }
}

#[cfg(test)]
#[path = "category_scraper_test.rs"]
mod tests;

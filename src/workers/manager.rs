// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::CompletionPolicy;
use crate::domain::models::listing::{ListingBatch, ListingRecord};
use crate::domain::models::run_state::ScraperIdentity;
use crate::domain::repositories::listing_sink::ListingSink;
use crate::domain::services::category_scraper::CategoryTally;
use crate::utils::retry_policy::{with_retry, RetryPolicy};
use crate::workers::worker::SiteScraper;
use metrics::counter;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// 调度器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Checking,
    Running,
    Submitting,
    Sleeping,
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            SchedulerState::Idle => "idle",
            SchedulerState::Checking => "checking",
            SchedulerState::Running => "running",
            SchedulerState::Submitting => "submitting",
            SchedulerState::Sleeping => "sleeping",
        };
        f.write_str(name)
    }
}

/// 单个抓取器的运行结论
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// 今天已运行过，未抓取
    Skipped,
    /// 完成抓取和提交（可能部分失败）
    Completed,
}

/// 单个分类批次的提交结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReport {
    pub category: String,
    pub listings: usize,
    pub attempts: u32,
    /// 失败原因，成功时为空
    pub error: Option<String>,
}

impl SubmissionReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// 单个抓取器的运行报告
#[derive(Debug, Clone)]
pub struct ScraperRunReport {
    pub identity: ScraperIdentity,
    pub status: RunStatus,
    pub tallies: Vec<CategoryTally>,
    pub submissions: Vec<SubmissionReport>,
    pub records: usize,
    pub marked_complete: bool,
}

impl ScraperRunReport {
    fn skipped(identity: ScraperIdentity) -> Self {
        Self {
            identity,
            status: RunStatus::Skipped,
            tallies: Vec::new(),
            submissions: Vec::new(),
            records: 0,
            marked_complete: false,
        }
    }
}

/// 一个检查周期的报告
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub run_id: Uuid,
    pub scrapers: Vec<ScraperRunReport>,
}

impl CycleReport {
    /// 被跳过的抓取器数
    pub fn skipped(&self) -> usize {
        self.scrapers
            .iter()
            .filter(|s| s.status == RunStatus::Skipped)
            .count()
    }

    /// 完成运行的抓取器数
    pub fn completed(&self) -> usize {
        self.scrapers
            .iter()
            .filter(|s| s.status == RunStatus::Completed)
            .count()
    }
}

/// 运行编排器
///
/// 一个周期内依次处理每个抓取器：检查运行状态、抓取、按分类提交、标记完成。
/// 抓取器之间串行执行，任何一个失败都不影响后续抓取器。
pub struct RunOrchestrator {
    scrapers: Vec<Arc<dyn SiteScraper>>,
    sink: Arc<dyn ListingSink>,
    retry: RetryPolicy,
    completion_policy: CompletionPolicy,
    state: Mutex<SchedulerState>,
}

impl RunOrchestrator {
    /// 创建运行编排器
    ///
    /// # 参数
    ///
    /// * `scrapers` - 按执行顺序排列的抓取器
    /// * `sink` - 后端提交实现
    /// * `retry` - 批次提交的重试策略
    /// * `completion_policy` - 运行完成标记策略
    pub fn new(
        scrapers: Vec<Arc<dyn SiteScraper>>,
        sink: Arc<dyn ListingSink>,
        retry: RetryPolicy,
        completion_policy: CompletionPolicy,
    ) -> Self {
        Self {
            scrapers,
            sink,
            retry,
            completion_policy,
            state: Mutex::new(SchedulerState::Idle),
        }
    }

    /// 当前状态
    pub fn state(&self) -> SchedulerState {
        *self.state.lock()
    }

    pub(crate) fn set_state(&self, state: SchedulerState) {
        let mut current = self.state.lock();
        if *current != state {
            tracing::debug!(from = %*current, to = %state, "Scheduler state changed");
            *current = state;
        }
    }

    /// 执行一个检查周期
    ///
    /// # 参数
    ///
    /// * `force` - 为 true 时跳过运行状态检查
    pub async fn run_cycle(&self, force: bool) -> CycleReport {
        let run_id = Uuid::new_v4();
        let span = info_span!("run_cycle", %run_id);

        async {
            info!(scrapers = self.scrapers.len(), force, "Starting run cycle");
            let mut reports = Vec::with_capacity(self.scrapers.len());
            for scraper in &self.scrapers {
                reports.push(self.run_scraper(scraper.as_ref(), force).await);
            }
            self.set_state(SchedulerState::Idle);

            let report = CycleReport {
                run_id,
                scrapers: reports,
            };
            info!(
                completed = report.completed(),
                skipped = report.skipped(),
                "Run cycle finished"
            );
            report
        }
        .instrument(span)
        .await
    }

    async fn run_scraper(&self, scraper: &dyn SiteScraper, force: bool) -> ScraperRunReport {
        let identity = scraper.identity().clone();

        self.set_state(SchedulerState::Checking);
        if !force && !scraper.should_run_today().await {
            info!(scraper = %identity, "Already ran today, skipping");
            counter!("pricecrawl_runs_total", "status" => "skipped").increment(1);
            return ScraperRunReport::skipped(identity);
        }

        self.set_state(SchedulerState::Running);
        info!(scraper = %identity, categories = scraper.categories().len(), "Scraping");
        let outcome = scraper.scrape(scraper.categories()).await;

        self.set_state(SchedulerState::Submitting);
        let records = outcome.records.len();
        let failed_categories = outcome.failed_categories();
        let mut submissions = Vec::new();
        for batch in group_by_category(&identity, outcome.records) {
            submissions.push(self.submit_batch(&batch).await);
        }

        let all_succeeded =
            failed_categories == 0 && submissions.iter().all(SubmissionReport::succeeded);
        let should_mark = match self.completion_policy {
            CompletionPolicy::Always => true,
            CompletionPolicy::RequireSuccess => all_succeeded,
        };

        let marked_complete = if should_mark {
            match scraper.mark_run_complete().await {
                Ok(()) => true,
                Err(e) => {
                    error!(scraper = %identity, error = %e, "Failed to record run completion");
                    false
                }
            }
        } else {
            warn!(scraper = %identity, "Run had failures, leaving it eligible to run again today");
            false
        };

        counter!("pricecrawl_runs_total", "status" => "completed").increment(1);
        ScraperRunReport {
            identity,
            status: RunStatus::Completed,
            tallies: outcome.tallies,
            submissions,
            records,
            marked_complete,
        }
    }

    async fn submit_batch(&self, batch: &ListingBatch) -> SubmissionReport {
        let operation = format!("submit:{}", batch.category);
        let mut attempts = 0;
        let result = with_retry(&self.retry, &operation, |attempt| {
            attempts = attempt;
            self.sink.submit(batch)
        })
        .await;

        let error = match result {
            Ok(()) => {
                counter!("pricecrawl_submissions_total", "result" => "success").increment(1);
                None
            }
            Err(e) => {
                counter!("pricecrawl_submissions_total", "result" => "failure").increment(1);
                error!(scraper = %batch.scraper, category = %batch.category, error = %e, "Batch submission failed");
                Some(e.to_string())
            }
        };

        SubmissionReport {
            category: batch.category.clone(),
            listings: batch.listings.len(),
            attempts,
            error,
        }
    }
}

/// 按分类分组，保持分类首次出现的顺序
fn group_by_category(scraper: &ScraperIdentity, records: Vec<ListingRecord>) -> Vec<ListingBatch> {
    let mut batches: Vec<ListingBatch> = Vec::new();
    for record in records {
        match batches.iter_mut().find(|b| b.category == record.category) {
            Some(batch) => batch.listings.push(record),
            None => batches.push(ListingBatch {
                scraper: scraper.clone(),
                category: record.category.clone(),
                listings: vec![record],
            }),
        }
    }
    batches
}

#[cfg(test)]
#[path = "manager_test.rs"]
mod tests;

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::run_state::ScraperIdentity;
use crate::domain::repositories::run_state_repository::{RunStateError, RunStateRepository};
use crate::scheduler::clock::Clock;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 运行状态存储
///
/// 回答“该抓取器今天是否应该运行”。读取失败时按从未运行处理（放行），
/// 宁可多跑一次也不因状态文件损坏而永久停摆。
pub struct RunStateStore {
    repository: Arc<dyn RunStateRepository>,
    clock: Arc<dyn Clock>,
    interval_days: u32,
}

impl RunStateStore {
    /// 创建运行状态存储
    ///
    /// # 参数
    ///
    /// * `repository` - 持久化后端
    /// * `clock` - 本地时钟
    /// * `interval_days` - 两次运行之间的最少天数，至少为 1
    pub fn new(
        repository: Arc<dyn RunStateRepository>,
        clock: Arc<dyn Clock>,
        interval_days: u32,
    ) -> Self {
        Self {
            repository,
            clock,
            interval_days: interval_days.max(1),
        }
    }

    /// 今天是否应该运行
    pub async fn should_run_today(&self, identity: &ScraperIdentity) -> bool {
        let today = self.clock.today();
        match self.repository.load(identity).await {
            Ok(None) => true,
            Ok(Some(state)) => {
                let due = state.is_due(today, self.interval_days);
                debug!(
                    scraper = %identity,
                    last_run = %state.last_run_date,
                    %today,
                    due,
                    "Checked run state"
                );
                due
            }
            Err(e) => {
                warn!(scraper = %identity, error = %e, "Run state unreadable, treating as never run");
                true
            }
        }
    }

    /// 标记运行完成，默认日期为今天
    pub async fn mark_complete(
        &self,
        identity: &ScraperIdentity,
        date: Option<NaiveDate>,
    ) -> Result<(), RunStateError> {
        let date = date.unwrap_or_else(|| self.clock.today());
        self.repository.save(identity, date).await?;
        info!(scraper = %identity, %date, "Marked run complete");
        Ok(())
    }

    /// 清除运行状态，下次检查必然放行
    pub async fn reset(&self, identity: &ScraperIdentity) -> Result<(), RunStateError> {
        self.repository.clear(identity).await
    }
}

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 抓取器标识
///
/// 站点与分类组合的稳定键，用作运行状态的键
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScraperIdentity(String);

impl ScraperIdentity {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScraperIdentity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScraperIdentity {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// 运行状态
///
/// 每个标识最多一条，成功运行后覆盖写入
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunState {
    pub identity: ScraperIdentity,
    /// 上次运行的本地日历日期
    pub last_run_date: NaiveDate,
}

impl RunState {
    /// 距离 `today` 是否已满 `interval_days` 天
    pub fn is_due(&self, today: NaiveDate, interval_days: u32) -> bool {
        (today - self.last_run_date).num_days() >= i64::from(interval_days)
    }
}

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::run_state::{RunState, ScraperIdentity};
use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

/// 运行状态存储错误类型
#[derive(Error, Debug)]
pub enum RunStateError {
    /// IO错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// 文件内容无法解析
    #[error("Corrupt run state: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// 运行状态仓库特质
///
/// 每个标识最多保存一条记录，写入即覆盖
#[async_trait]
pub trait RunStateRepository: Send + Sync {
    /// 读取标识的运行状态，不存在时返回 `None`
    async fn load(&self, identity: &ScraperIdentity) -> Result<Option<RunState>, RunStateError>;

    /// 覆盖写入标识的上次运行日期
    async fn save(&self, identity: &ScraperIdentity, date: NaiveDate) -> Result<(), RunStateError>;

    /// 删除标识的运行状态，等同于从未运行
    async fn clear(&self, identity: &ScraperIdentity) -> Result<(), RunStateError>;
}

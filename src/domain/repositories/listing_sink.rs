// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::listing::ListingBatch;
use crate::utils::errors::SubmissionError;
use async_trait::async_trait;

/// 商品提交特质
///
/// 后端存储服务的抽象，一次提交一个分类批次
#[async_trait]
pub trait ListingSink: Send + Sync {
    /// 提交分类批次，非 2xx 或连接失败返回 `SubmissionError`
    async fn submit(&self, batch: &ListingBatch) -> Result<(), SubmissionError>;
}

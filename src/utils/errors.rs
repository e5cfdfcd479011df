// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::utils::retry_policy::Retryable;
use thiserror::Error;

/// 数据格式错误
///
/// 商品条目无法规范化时产生，只计数并丢弃，不重试
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MalformedDataError {
    #[error("Missing product title")]
    MissingTitle,

    #[error("Unparseable price: {0:?}")]
    UnparseablePrice(String),

    #[error("Price out of range: {0}")]
    PriceOutOfRange(f64),
}

/// 后端提交错误
#[derive(Error, Debug)]
pub enum SubmissionError {
    /// 后端返回非 2xx 状态码
    #[error("Backend responded with status {status}: {body}")]
    Status { status: u16, body: String },

    /// 连接、超时等传输层错误
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// 负载序列化失败
    #[error("Failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

impl Retryable for SubmissionError {
    fn is_retryable(&self) -> bool {
        match self {
            SubmissionError::Status { .. } => true,
            SubmissionError::Transport(e) => !e.is_builder(),
            SubmissionError::Encode(_) => false,
        }
    }
}

impl Retryable for MalformedDataError {
    fn is_retryable(&self) -> bool {
        false
    }
}

/// 配置错误
///
/// 仅在启动阶段出现，视为致命错误
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid schedule time {0:?}, expected HH:MM")]
    InvalidScheduleTime(String),

    #[error("Backend endpoint is missing")]
    MissingEndpoint,

    #[error("Invalid backend endpoint {url:?}: {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("No scrapers configured")]
    NoScrapers,

    #[error("Scraper {0} has no categories")]
    EmptyCategories(String),

    #[error("Duplicate scraper identity {0}")]
    DuplicateIdentity(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

impl Retryable for ConfigurationError {
    fn is_retryable(&self) -> bool {
        false
    }
}

// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::domain::models::site::SiteKind;
use crate::utils::errors::ConfigurationError;
use crate::utils::retry_policy::RetryPolicy;
use chrono::NaiveTime;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// 应用程序配置设置
///
/// 包含后端、调度、浏览器、重试、运行状态、日志和抓取器等所有配置项
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// 后端提交配置
    pub backend: BackendSettings,
    /// 调度配置
    pub schedule: ScheduleSettings,
    /// 浏览器配置
    pub browser: BrowserSettings,
    /// 重试配置
    pub retry: RetrySettings,
    /// 运行状态配置
    pub run_state: RunStateSettings,
    /// 日志配置
    pub logging: LoggingSettings,
    /// 抓取器列表
    #[serde(default = "default_scrapers")]
    pub scrapers: Vec<ScraperSettings>,
}

/// 后端配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct BackendSettings {
    /// 提交地址
    pub url: String,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
}

/// 运行完成标记策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CompletionPolicy {
    /// 无论成功与否都标记当天已运行
    #[default]
    Always,
    /// 仅当所有分类抓取和提交都成功时才标记
    RequireSuccess,
}

/// 调度配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleSettings {
    /// 每日触发时间 (HH:MM, 24小时制)
    pub daily_time: String,
    /// 两次运行之间的最少天数
    pub run_interval_days: u32,
    /// 运行完成标记策略
    pub completion_policy: CompletionPolicy,
}

/// 浏览器配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserSettings {
    /// 远程 Chrome 调试地址，为空时本地启动
    pub remote_url: Option<String>,
    /// 是否无头模式
    pub headless: bool,
    /// 页面导航超时时间（秒）
    pub page_load_timeout_secs: u64,
    /// 等待商品列表渲染的最长时间（秒）
    pub render_wait_secs: u64,
    /// 滚动间隔（毫秒）
    pub scroll_pause_ms: u64,
    /// 窗口宽度
    pub window_width: u32,
    /// 窗口高度
    pub window_height: u32,
}

/// 重试配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySettings {
    /// 最大尝试次数
    pub max_attempts: u32,
    /// 初始退避时间（毫秒）
    pub base_delay_ms: u64,
    /// 最大退避时间（毫秒）
    pub max_delay_ms: u64,
}

/// 运行状态配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct RunStateSettings {
    /// 运行状态文件路径
    pub path: String,
}

/// 日志配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    /// EnvFilter 过滤规则
    pub filter: String,
    /// 是否输出 JSON 格式
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "info,pricecrawl=debug".to_string(),
            json: false,
        }
    }
}

/// 分类配置
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CategorySettings {
    /// 分类名称
    pub name: String,
    /// 相对于站点地址的列表页路径
    pub path: String,
}

/// 单个抓取器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ScraperSettings {
    /// 运行状态键
    pub identity: String,
    /// 站点类型
    pub site: SiteKind,
    /// 覆盖站点默认地址
    #[serde(default)]
    pub base_url: Option<String>,
    /// 每个分类最多抓取的商品数
    pub per_category_limit: usize,
    /// 按顺序抓取的分类
    pub categories: Vec<CategorySettings>,
    /// 分类之间的最短间隔（毫秒）
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,
    /// 分类之间的最长间隔（毫秒）
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_min_delay_ms() -> u64 {
    2000
}

fn default_max_delay_ms() -> u64 {
    5000
}

fn category(name: &str, path: &str) -> CategorySettings {
    CategorySettings {
        name: name.to_string(),
        path: path.to_string(),
    }
}

fn default_scrapers() -> Vec<ScraperSettings> {
    vec![
        ScraperSettings {
            identity: "daraz_selenium".to_string(),
            site: SiteKind::Daraz,
            base_url: None,
            per_category_limit: 2,
            categories: vec![
                category("Phone", "/catalog/?q=smartphone"),
                category("Laptop", "/catalog/?q=laptop"),
                category("Headphone", "/catalog/?q=headphones"),
                category("Tablet", "/catalog/?q=tablet"),
                category("Airpod", "/catalog/?q=airpods"),
                category("Speaker", "/catalog/?q=bluetooth+speaker"),
            ],
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        },
        ScraperSettings {
            identity: "amazon_selenium".to_string(),
            site: SiteKind::Amazon,
            base_url: None,
            per_category_limit: 20,
            categories: vec![
                category("Phone", "/s?k=smartphone"),
                category("Laptop", "/s?k=laptop"),
                category("Headphone", "/s?k=headphones"),
                category("Tablet", "/s?k=tablet"),
                category("Airpod", "/s?k=airpods"),
                category("Speaker", "/s?k=bluetooth+speaker"),
            ],
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        },
    ]
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 依次加载默认值、`config/default`、`config/{APP_ENVIRONMENT}`、
    /// 可选的额外配置文件以及 `PRICECRAWL__*` 环境变量
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigurationError)` - 配置加载失败
    pub fn new(extra_file: Option<&Path>) -> Result<Self, ConfigurationError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        let mut builder = Self::builder()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false));

        if let Some(path) = extra_file {
            builder = builder.add_source(File::from(path).required(true));
        }

        let settings: Settings = builder
            .add_source(Environment::with_prefix("PRICECRAWL").separator("__"))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// 从 TOML 字符串加载配置（叠加在默认值之上）
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigurationError> {
        let settings: Settings = Self::builder()?
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    fn builder() -> Result<ConfigBuilder<DefaultState>, ConfigurationError> {
        let builder = Config::builder()
            // Default backend settings
            .set_default("backend.url", "http://localhost:5000/api/scraper/price")?
            .set_default("backend.timeout_secs", 10)?
            // Default schedule settings
            .set_default("schedule.daily_time", "02:00")?
            .set_default("schedule.run_interval_days", 1)?
            .set_default("schedule.completion_policy", "always")?
            // Default browser settings
            .set_default("browser.headless", true)?
            .set_default("browser.page_load_timeout_secs", 30)?
            .set_default("browser.render_wait_secs", 15)?
            .set_default("browser.scroll_pause_ms", 500)?
            .set_default("browser.window_width", 1920)?
            .set_default("browser.window_height", 1080)?
            // Default retry settings
            .set_default("retry.max_attempts", 3)?
            .set_default("retry.base_delay_ms", 3000)?
            .set_default("retry.max_delay_ms", 60000)?
            // Default run state settings
            .set_default("run_state.path", "last_run.json")?
            // Default logging settings
            .set_default("logging.filter", "info,pricecrawl=debug")?
            .set_default("logging.json", false)?;
        Ok(builder)
    }

    /// 校验配置
    ///
    /// 任何错误都在启动阶段直接返回，不做重试
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.schedule.target_time()?;

        let url = self.backend.url.trim();
        if url.is_empty() {
            return Err(ConfigurationError::MissingEndpoint);
        }
        let parsed = url::Url::parse(url).map_err(|e| ConfigurationError::InvalidEndpoint {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigurationError::InvalidEndpoint {
                url: url.to_string(),
                reason: format!("unsupported scheme {}", parsed.scheme()),
            });
        }

        if self.schedule.run_interval_days == 0 {
            return Err(invalid("schedule.run_interval_days", "must be at least 1"));
        }
        if self.retry.max_attempts == 0 {
            return Err(invalid("retry.max_attempts", "must be at least 1"));
        }
        if self.scrapers.is_empty() {
            return Err(ConfigurationError::NoScrapers);
        }

        let mut identities = HashSet::new();
        for scraper in &self.scrapers {
            if !identities.insert(scraper.identity.as_str()) {
                return Err(ConfigurationError::DuplicateIdentity(
                    scraper.identity.clone(),
                ));
            }
            if scraper.categories.is_empty() {
                return Err(ConfigurationError::EmptyCategories(
                    scraper.identity.clone(),
                ));
            }
            if scraper.per_category_limit == 0 {
                return Err(invalid(
                    &format!("{}.per_category_limit", scraper.identity),
                    "must be at least 1",
                ));
            }
            if scraper.min_delay_ms > scraper.max_delay_ms {
                return Err(invalid(
                    &format!("{}.min_delay_ms", scraper.identity),
                    "must not exceed max_delay_ms",
                ));
            }
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> ConfigurationError {
    ConfigurationError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

impl ScheduleSettings {
    /// 解析每日触发时间
    pub fn target_time(&self) -> Result<NaiveTime, ConfigurationError> {
        parse_schedule_time(&self.daily_time)
    }
}

/// 解析 `HH:MM` 格式的时间
pub fn parse_schedule_time(value: &str) -> Result<NaiveTime, ConfigurationError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|_| ConfigurationError::InvalidScheduleTime(value.to_string()))
}

impl RetrySettings {
    /// 转换为重试策略
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.base_delay_ms))
            .with_max_delay(Duration::from_millis(self.max_delay_ms))
    }
}

#[cfg(test)]
#[path = "settings_test.rs"]
mod tests;

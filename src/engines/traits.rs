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

use crate::domain::models::listing::{Category, RawListing};
use crate::domain::models::site::SiteProfile;
use crate::utils::retry_policy::Retryable;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// 渲染引擎错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    /// 无法建立浏览器会话
    #[error("Browser session unavailable: {0}")]
    SessionUnavailable(String),
    /// 页面导航失败
    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },
    /// 页面加载超时
    #[error("Timed out loading {url}")]
    Timeout { url: String },
    /// CDP 协议错误
    #[error("Browser protocol error: {0}")]
    Protocol(String),
    /// 地址无效
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl EngineError {
    /// 会话本身已失效（浏览器崩溃、CDP 通道断开），需要重新打开会话
    pub fn is_session_lost(&self) -> bool {
        matches!(
            self,
            EngineError::SessionUnavailable(_) | EngineError::Protocol(_)
        )
    }
}

impl Retryable for EngineError {
    /// 地址无效的请求重试也不会成功，其余错误都视为暂时性故障
    fn is_retryable(&self) -> bool {
        !matches!(self, EngineError::InvalidUrl(_))
    }
}

/// 渲染引擎特质
///
/// 负责获取浏览器会话，一次抓取运行只打开一个会话
#[async_trait]
pub trait RenderEngine: Send + Sync {
    /// 打开会话
    ///
    /// # 参数
    ///
    /// * `profile` - 站点画像，决定地址拼接和选择器
    ///
    /// # 返回值
    ///
    /// * `Ok(Box<dyn RenderSession>)` - 已就绪的会话
    /// * `Err(EngineError)` - 浏览器无法启动或连接
    async fn open_session(
        &self,
        profile: Arc<SiteProfile>,
    ) -> Result<Box<dyn RenderSession>, EngineError>;

    /// 引擎名称
    fn name(&self) -> &'static str;
}

/// 渲染会话特质
///
/// 会话在多个分类之间复用。调用方必须在结束时调用 `close`，
/// 实现方在 `Drop` 中兜底释放资源。
#[async_trait]
pub trait RenderSession: Send + Sync {
    /// 抓取分类列表页，返回至多 `limit` 个条目
    ///
    /// 页面渲染后没有商品时返回空列表而不是错误
    async fn fetch_category(
        &self,
        category: &Category,
        limit: usize,
    ) -> Result<Vec<RawListing>, EngineError>;

    /// 关闭会话，重复调用无副作用
    async fn close(&mut self) -> Result<(), EngineError>;
}

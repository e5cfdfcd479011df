// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::BrowserSettings;
use crate::domain::models::listing::{Category, RawListing};
use crate::domain::models::site::SiteProfile;
use crate::engines::extractor::extract_listings;
use crate::engines::identity::BrowserIdentity;
use crate::engines::traits::{EngineError, RenderEngine, RenderSession};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::{Headers, SetExtraHttpHeadersParams};
use chromiumoxide::{Browser, BrowserConfig, Handler, Page};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

const MAX_SCROLL_STEPS: u64 = 20;
const RENDER_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Chromium 渲染引擎
///
/// 基于 chromiumoxide 驱动无头 Chrome。配置了 `remote_url` 时连接已有实例，
/// 否则每个会话启动一个独立的浏览器进程。
pub struct ChromiumEngine {
    settings: BrowserSettings,
}

impl ChromiumEngine {
    /// 创建 Chromium 引擎
    ///
    /// # 参数
    ///
    /// * `settings` - 浏览器配置
    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }

    async fn connect(&self) -> Result<(Browser, Handler, bool), EngineError> {
        if let Some(url) = &self.settings.remote_url {
            info!("Connecting to remote Chrome instance at: {}", url);
            let (browser, handler) = Browser::connect(url)
                .await
                .map_err(|e| EngineError::SessionUnavailable(format!("connect {}: {}", url, e)))?;
            return Ok((browser, handler, true));
        }

        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(self.settings.window_width, self.settings.window_height)
            .request_timeout(Duration::from_secs(self.settings.page_load_timeout_secs))
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-blink-features=AutomationControlled");
        if !self.settings.headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(EngineError::SessionUnavailable)?;

        let (browser, handler) = Browser::launch(config)
            .await
            .map_err(|e| EngineError::SessionUnavailable(e.to_string()))?;
        Ok((browser, handler, false))
    }
}

#[async_trait]
impl RenderEngine for ChromiumEngine {
    async fn open_session(
        &self,
        profile: Arc<SiteProfile>,
    ) -> Result<Box<dyn RenderSession>, EngineError> {
        let (browser, mut handler, remote) = self.connect().await?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        // 先组装会话，后续步骤失败时由 Drop 回收浏览器
        let mut session = ChromiumSession {
            browser: Some(browser),
            page: None,
            handler: handler_task,
            remote,
            profile,
            settings: self.settings.clone(),
        };

        let identity = BrowserIdentity::random();
        let page = session
            .browser
            .as_ref()
            .ok_or_else(|| EngineError::SessionUnavailable("browser missing".into()))?
            .new_page("about:blank")
            .await
            .map_err(|e| EngineError::SessionUnavailable(e.to_string()))?;
        page.set_user_agent(identity.user_agent.as_str())
            .await
            .map_err(|e| EngineError::Protocol(e.to_string()))?;
        page.execute(SetExtraHttpHeadersParams::new(Headers::new(
            identity.headers_json(),
        )))
        .await
        .map_err(|e| EngineError::Protocol(e.to_string()))?;
        session.page = Some(page);

        debug!(
            site = %session.profile.name,
            user_agent = %identity.user_agent,
            remote,
            "Browser session opened"
        );
        Ok(Box::new(session))
    }

    fn name(&self) -> &'static str {
        "chromium"
    }
}

/// Chromium 会话
///
/// 持有浏览器、单个标签页和 CDP 事件处理任务
pub struct ChromiumSession {
    browser: Option<Browser>,
    page: Option<Page>,
    handler: JoinHandle<()>,
    remote: bool,
    profile: Arc<SiteProfile>,
    settings: BrowserSettings,
}

impl ChromiumSession {
    fn page(&self) -> Result<&Page, EngineError> {
        self.page
            .as_ref()
            .ok_or_else(|| EngineError::SessionUnavailable("session already closed".into()))
    }

    /// 轮询商品卡片，直到出现或等待时间耗尽
    async fn wait_for_items(&self, page: &Page) -> bool {
        let deadline = Instant::now() + Duration::from_secs(self.settings.render_wait_secs);
        loop {
            for selector in &self.profile.item_selectors {
                if let Ok(found) = page.find_elements(selector.as_str()).await {
                    if !found.is_empty() {
                        return true;
                    }
                }
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(RENDER_POLL_INTERVAL).await;
        }
    }

    /// 逐屏滚动触发懒加载，最后回到顶部
    async fn slow_scroll(&self, page: &Page) -> Result<(), EngineError> {
        let height = page
            .evaluate("document.body.scrollHeight")
            .await
            .map_err(|e| EngineError::Protocol(e.to_string()))?
            .into_value::<f64>()
            .unwrap_or(0.0);

        let pause = Duration::from_millis(self.settings.scroll_pause_ms);
        for y in scroll_steps(height.max(0.0) as u64, u64::from(self.settings.window_height)) {
            page.evaluate(format!("window.scrollTo(0, {});", y))
                .await
                .map_err(|e| EngineError::Protocol(e.to_string()))?;
            tokio::time::sleep(pause).await;
        }
        page.evaluate("window.scrollTo(0, 0);")
            .await
            .map_err(|e| EngineError::Protocol(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl RenderSession for ChromiumSession {
    async fn fetch_category(
        &self,
        category: &Category,
        limit: usize,
    ) -> Result<Vec<RawListing>, EngineError> {
        let url = self.profile.category_url(&category.path);
        Url::parse(&url).map_err(|e| EngineError::InvalidUrl(format!("{}: {}", url, e)))?;

        let page = self.page()?;
        let timeout = Duration::from_secs(self.settings.page_load_timeout_secs);

        tokio::time::timeout(timeout, page.goto(url.as_str()))
            .await
            .map_err(|_| EngineError::Timeout { url: url.clone() })?
            .map_err(|e| EngineError::Navigation {
                url: url.clone(),
                message: e.to_string(),
            })?;

        if !self.wait_for_items(page).await {
            debug!(category = %category.name, "No listing items rendered before wait elapsed");
        }
        self.slow_scroll(page).await?;

        let html = tokio::time::timeout(timeout, page.content())
            .await
            .map_err(|_| EngineError::Timeout { url: url.clone() })?
            .map_err(|e| EngineError::Protocol(e.to_string()))?;

        let listings = extract_listings(&html, &self.profile, &url, limit);
        if listings.is_empty() && self.profile.looks_like_captcha(&html) {
            warn!(
                site = %self.profile.name,
                category = %category.name,
                "Listing page looks like a CAPTCHA interstitial"
            );
        }
        Ok(listings)
    }

    async fn close(&mut self) -> Result<(), EngineError> {
        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                warn!(error = %e, "Failed to close page");
            }
        }

        if let Some(mut browser) = self.browser.take() {
            // 远程实例由外部管理，只断开连接
            if !self.remote {
                browser
                    .close()
                    .await
                    .map_err(|e| EngineError::Protocol(e.to_string()))?;
                if let Err(e) = browser.wait().await {
                    warn!(error = %e, "Failed waiting for browser process to exit");
                }
            }
        }

        self.handler.abort();
        debug!(site = %self.profile.name, "Browser session closed");
        Ok(())
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        // 浏览器进程随 Browser 一起被回收
        self.handler.abort();
    }
}

/// 滚动位置序列，步长为视口高度，最多 `MAX_SCROLL_STEPS` 步
fn scroll_steps(page_height: u64, viewport: u64) -> Vec<u64> {
    let step = viewport.max(1);
    (1..=MAX_SCROLL_STEPS)
        .map(|i| i * step)
        .take_while(|y| *y < page_height + step)
        .map(|y| y.min(page_height))
        .collect()
}

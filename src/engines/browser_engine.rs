// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::engines::token_capture::TokenCapture;
use crate::engines::traits::{FetchRequest, PageEngine, RawPage};
use crate::utils::errors::FetchError;
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::{
    EventRequestWillBeSent, EventResponseReceived, ResourceType,
};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use std::future::Future;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// 就绪选择器的轮询间隔
const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// 浏览器引擎
///
/// 基于chromiumoxide的无头Chrome。浏览器在首次抓取时按实例懒启动，
/// 之后在同一实例内复用；配置了远程调试地址时连接已有的Chrome。
pub struct BrowserEngine {
    browser: OnceCell<Browser>,
    remote_debugging_url: Option<String>,
    launch_timeout: Duration,
}

impl BrowserEngine {
    pub fn new(remote_debugging_url: Option<String>, launch_timeout: Duration) -> Self {
        Self {
            browser: OnceCell::new(),
            remote_debugging_url,
            launch_timeout,
        }
    }

    // Lazily launches or connects to Chrome, once per engine instance.
    async fn browser(&self) -> Result<&Browser, FetchError> {
        self.browser
            .get_or_try_init(|| async {
                let (browser, mut handler) = if let Some(url) = &self.remote_debugging_url {
                    info!("Connecting to remote Chrome instance at: {}", url);
                    Browser::connect(url.as_str()).await.map_err(|e| {
                        FetchError::Network(format!("Failed to connect to remote Chrome: {}", e))
                    })?
                } else {
                    let config = BrowserConfig::builder()
                        .no_sandbox()
                        .request_timeout(self.launch_timeout)
                        .arg("--disable-gpu")
                        .arg("--disable-dev-shm-usage")
                        .build()
                        .map_err(FetchError::Network)?;
                    Browser::launch(config)
                        .await
                        .map_err(|e| FetchError::Network(format!("Failed to launch Chrome: {}", e)))?
                };

                // Spawn a handler to process browser events
                tokio::spawn(async move {
                    while let Some(h) = handler.next().await {
                        if h.is_err() {
                            break;
                        }
                    }
                });

                Ok(browser)
            })
            .await
    }

    async fn open_page(&self) -> Result<Page, FetchError> {
        self.browser()
            .await?
            .new_page("about:blank")
            .await
            .map_err(|e| FetchError::Network(e.to_string()))
    }

    async fn wait_for_selector(page: &Page, selector: &str) {
        loop {
            if page.find_element(selector).await.is_ok() {
                return;
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
    }

    async fn render(page: &Page, request: &FetchRequest) -> Result<(String, String), FetchError> {
        page.goto(request.url.as_str())
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        if let Some(selector) = &request.ready_selector {
            Self::wait_for_selector(page, selector).await;
        }

        let content = page
            .content()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        let url = page
            .url()
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| request.url.to_string());
        Ok((url, content))
    }

    async fn close_page(page: Page, listener: Option<JoinHandle<()>>) {
        if let Some(listener) = listener {
            listener.abort();
        }
        if let Err(e) = page.close().await {
            warn!("Failed to close page: {}", e);
        }
    }

    /// 打开站点并捕获其脚本发往API域名的Bearer令牌
    ///
    /// # 参数
    ///
    /// * `target_url` - 会触发API请求的公开页面
    /// * `api_domain` - API域名
    /// * `page_load_timeout` - 页面加载超时（超时不视为失败）
    /// * `wait_for_request` - 加载后继续监听请求的时长
    ///
    /// # 返回值
    ///
    /// 捕获到的完整 `Authorization` 请求头值
    pub async fn capture_bearer_token(
        &self,
        target_url: &str,
        api_domain: &str,
        page_load_timeout: Duration,
        wait_for_request: Duration,
    ) -> Result<String, FetchError> {
        let page = self.open_page().await?;
        let capture = Arc::new(TokenCapture::new(api_domain));

        let mut events = page
            .event_listener::<EventRequestWillBeSent>()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        let listener_capture = Arc::clone(&capture);
        let listener = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if listener_capture.observe(&event.request.url, event.request.headers.inner()) {
                    break;
                }
            }
        });

        if tokio::time::timeout(page_load_timeout, page.goto(target_url))
            .await
            .is_err()
        {
            debug!("Token page load timed out, continuing to listen: {}", target_url);
        }
        tokio::time::sleep(wait_for_request).await;

        listener.abort();
        if let Err(e) = page.close().await {
            warn!("Failed to close token capture page: {}", e);
        }

        capture
            .token()
            .ok_or_else(|| FetchError::Blocked(format!("no bearer token observed for {}", api_domain)))
    }
}

#[async_trait]
impl PageEngine for BrowserEngine {
    /// 执行浏览器抓取
    ///
    /// # 参数
    ///
    /// * `request` - 抓取请求
    ///
    /// # 返回值
    ///
    /// * `Ok(RawPage)` - 渲染后的页面内容
    /// * `Err(FetchError)` - 超时或浏览器错误
    async fn fetch(&self, request: &FetchRequest) -> Result<RawPage, FetchError> {
        let start = Instant::now();
        let timeout_ms = request.timeout.as_millis() as u64;

        let page = tokio::time::timeout(request.timeout, self.open_page())
            .await
            .map_err(|_| FetchError::Timeout { timeout_ms })??;

        let status = Arc::new(OnceLock::new());
        let listener = match page.event_listener::<EventResponseReceived>().await {
            Ok(mut events) => {
                let status = Arc::clone(&status);
                Some(tokio::spawn(async move {
                    while let Some(event) = events.next().await {
                        if let Some(code) = document_status(&event.r#type, event.response.status) {
                            let _ = status.set(code);
                            break;
                        }
                    }
                }))
            }
            Err(e) => {
                warn!("Failed to watch navigation responses: {}", e);
                None
            }
        };

        let remaining = request.timeout.saturating_sub(start.elapsed());
        let (url, content) = run_bounded(
            remaining,
            timeout_ms,
            Self::render(&page, request),
            Self::close_page(page.clone(), listener),
        )
        .await?;

        Ok(RawPage {
            url,
            // no Document response seen means the page came from cache or a non-HTTP scheme
            status: status.get().copied().unwrap_or(200),
            content,
            content_type: "text/html".to_string(),
            elapsed_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn name(&self) -> &'static str {
        "browser"
    }
}

/// 主文档响应的HTTP状态码；子资源返回 `None`
fn document_status(resource_type: &ResourceType, status: i64) -> Option<u16> {
    if !matches!(resource_type, ResourceType::Document) {
        return None;
    }
    u16::try_from(status).ok()
}

/// 在截止时间内执行 `work`，成功、失败或超时后都会执行 `cleanup`
///
/// `cleanup` 在独立任务中运行，调用方的future被丢弃（例如外层超时）时仍会完成。
async fn run_bounded<T, W, C>(
    deadline: Duration,
    timeout_ms: u64,
    work: W,
    cleanup: C,
) -> Result<T, FetchError>
where
    W: Future<Output = Result<T, FetchError>>,
    C: Future<Output = ()> + Send + 'static,
{
    let guard = CloseOnDrop::new(cleanup);
    let outcome = tokio::time::timeout(deadline, work).await;
    if let Err(e) = guard.finish().await {
        warn!("Page cleanup task failed: {}", e);
    }
    outcome.map_err(|_| FetchError::Timeout { timeout_ms })?
}

/// 持有尚未执行的页面清理；被丢弃时把清理交给运行时执行
struct CloseOnDrop {
    cleanup: Option<BoxFuture<'static, ()>>,
}

impl CloseOnDrop {
    fn new<C>(cleanup: C) -> Self
    where
        C: Future<Output = ()> + Send + 'static,
    {
        Self {
            cleanup: Some(cleanup.boxed()),
        }
    }

    /// 启动清理并返回其句柄；等待句柄期间被取消不影响清理本身
    fn finish(mut self) -> JoinHandle<()> {
        match self.cleanup.take() {
            Some(cleanup) => tokio::spawn(cleanup),
            None => tokio::spawn(async {}),
        }
    }
}

impl Drop for CloseOnDrop {
    fn drop(&mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    handle.spawn(cleanup);
                }
                Err(_) => warn!("No runtime available to close abandoned page"),
            }
        }
    }
}

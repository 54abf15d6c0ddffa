// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::engines::block_detection;
use crate::engines::host_throttle::HostThrottle;
use crate::engines::traits::{FetchRequest, PageEngine, RawPage};
use crate::utils::errors::{ErrorKind, FetchError};
use crate::utils::retry_policy::RetryPolicy;
use crate::utils::url_utils::host_key;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

/// 抓取选项
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// 单次请求超时（毫秒）
    pub timeout_ms: u64,
    /// 最大重试次数
    pub max_retries: u32,
    /// 退避策略
    pub retry_backoff: RetryPolicy,
    /// 同一主机相邻请求的最小间隔（毫秒）
    pub rate_limit_ms: u64,
    /// 动态页面就绪选择器
    pub ready_selector: Option<String>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 15_000,
            max_retries: 3,
            retry_backoff: RetryPolicy::standard(),
            rate_limit_ms: 1_000,
            ready_selector: None,
        }
    }
}

impl FetchOptions {
    pub fn with_ready_selector(&self, selector: Option<String>) -> Self {
        Self {
            ready_selector: selector,
            ..self.clone()
        }
    }
}

/// 页面抓取器
///
/// 在引擎之上提供超时、重试退避、每主机并发与最小间隔限制，
/// 以及拦截页识别。不缓存任何页面内容。
#[derive(Clone)]
pub struct Fetcher {
    engine: Arc<dyn PageEngine>,
    throttle: HostThrottle,
}

impl Fetcher {
    pub fn new(engine: Arc<dyn PageEngine>, throttle: HostThrottle) -> Self {
        Self { engine, throttle }
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    /// 抓取页面
    ///
    /// # 参数
    ///
    /// * `url` - 目标URL
    /// * `options` - 抓取选项
    ///
    /// # 返回值
    ///
    /// * `Ok(RawPage)` - 2xx且非拦截页的原始页面
    /// * `Err(FetchError)` - 不可重试的错误，或重试耗尽后的最后一个错误
    pub async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<RawPage, FetchError> {
        let parsed =
            Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrl(format!(
                "unsupported scheme: {}",
                parsed.scheme()
            )));
        }

        let host = host_key(&parsed);
        let request = FetchRequest::new(parsed, Duration::from_millis(options.timeout_ms))
            .with_ready_selector(options.ready_selector.clone());

        let mut attempt = 0u32;
        loop {
            match self.attempt(&host, &request, options).await {
                Ok(page) => {
                    debug!(url = %url, attempt, elapsed_ms = page.elapsed_ms, "Fetched page");
                    return Ok(page);
                }
                Err(err) => {
                    metrics::counter!("racecrawl_fetch_failures_total", "kind" => err.kind())
                        .increment(1);
                    if !err.is_retryable() || attempt >= options.max_retries {
                        return Err(err);
                    }
                    attempt += 1;
                    let delay = options.retry_backoff.calculate_backoff(attempt);
                    warn!(
                        url = %url,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Fetch failed, retrying: {}",
                        err
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn attempt(
        &self,
        host: &str,
        request: &FetchRequest,
        options: &FetchOptions,
    ) -> Result<RawPage, FetchError> {
        let _permit = self
            .throttle
            .acquire(host, Duration::from_millis(options.rate_limit_ms))
            .await?;

        metrics::counter!("racecrawl_fetch_attempts_total").increment(1);
        let start = Instant::now();
        let outcome = tokio::time::timeout(request.timeout, self.engine.fetch(request))
            .await
            .map_err(|_| FetchError::Timeout {
                timeout_ms: options.timeout_ms,
            })?;
        metrics::histogram!("racecrawl_fetch_duration_seconds")
            .record(start.elapsed().as_secs_f64());

        block_detection::classify(outcome?)
    }
}

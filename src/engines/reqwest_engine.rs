// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::engines::traits::{FetchRequest, PageEngine, RawPage};
use crate::utils::errors::FetchError;
use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION};
use std::time::Instant;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; racecrawl/0.1)";

/// HTTP抓取引擎
///
/// 基于reqwest实现，适用于静态页面与JSON数据源。可携带Bearer令牌。
pub struct ReqwestEngine {
    user_agent: String,
    bearer_token: RwLock<Option<String>>,
}

impl Default for ReqwestEngine {
    fn default() -> Self {
        Self::new(DEFAULT_USER_AGENT)
    }
}

impl ReqwestEngine {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            bearer_token: RwLock::new(None),
        }
    }

    /// 设置Bearer令牌
    ///
    /// 接受完整的请求头值（`Bearer xxx`）或裸令牌。
    pub fn set_bearer_token(&self, token: impl Into<String>) {
        let token = token.into();
        let header = if token.to_ascii_lowercase().starts_with("bearer ") {
            token
        } else {
            format!("Bearer {}", token)
        };
        *self.bearer_token.write() = Some(header);
    }

    pub fn has_bearer_token(&self) -> bool {
        self.bearer_token.read().is_some()
    }

    fn build_headers(&self, request: &FetchRequest) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/json;q=0.9,*/*;q=0.8"),
        );
        if let Some(token) = self.bearer_token.read().as_deref() {
            if let Ok(value) = HeaderValue::from_str(token) {
                headers.insert(AUTHORIZATION, value);
            }
        }
        for (k, v) in &request.headers {
            if let (Ok(k), Ok(v)) = (
                HeaderName::from_bytes(k.as_bytes()),
                HeaderValue::from_str(v),
            ) {
                headers.insert(k, v);
            }
        }
        headers
    }

    fn map_error(err: reqwest::Error, request: &FetchRequest) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout {
                timeout_ms: request.timeout.as_millis() as u64,
            }
        } else if err.is_builder() {
            FetchError::InvalidUrl(err.to_string())
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

#[async_trait]
impl PageEngine for ReqwestEngine {
    /// 执行HTTP抓取
    ///
    /// # 参数
    ///
    /// * `request` - 抓取请求
    ///
    /// # 返回值
    ///
    /// * `Ok(RawPage)` - 原始页面（任何状态码）
    /// * `Err(FetchError)` - 超时或连接层错误
    async fn fetch(&self, request: &FetchRequest) -> Result<RawPage, FetchError> {
        // Each request gets a fresh client for cookie isolation
        let client = reqwest::Client::builder()
            .user_agent(self.user_agent.as_str())
            .timeout(request.timeout)
            .cookie_store(true)
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let start = Instant::now();
        let response = client
            .get(request.url.clone())
            .headers(self.build_headers(request))
            .send()
            .await
            .map_err(|e| Self::map_error(e, request))?;

        let status = response.status().as_u16();
        let url = response.url().to_string();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.trim().is_empty())
            .unwrap_or("text/html")
            .to_string();

        let content = response
            .text()
            .await
            .map_err(|e| Self::map_error(e, request))?;

        Ok(RawPage {
            url,
            status,
            content,
            content_type,
            elapsed_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn name(&self) -> &'static str {
        "reqwest"
    }
}

#[cfg(test)]
#[path = "reqwest_engine_test.rs"]
mod tests;

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::utils::errors::FetchError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// 抓取请求
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// 目标URL
    pub url: Url,
    /// 请求头
    pub headers: HashMap<String, String>,
    /// 超时时间
    pub timeout: Duration,
    /// 动态页面就绪选择器，出现后才读取页面内容
    pub ready_selector: Option<String>,
}

impl FetchRequest {
    pub fn new(url: Url, timeout: Duration) -> Self {
        Self {
            url,
            headers: HashMap::new(),
            timeout,
            ready_selector: None,
        }
    }

    pub fn with_ready_selector(mut self, selector: Option<String>) -> Self {
        self.ready_selector = selector;
        self
    }
}

/// 原始页面
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPage {
    /// 页面URL（用于解析相对链接）
    pub url: String,
    /// HTTP状态码
    pub status: u16,
    /// 响应内容
    pub content: String,
    /// 内容类型
    pub content_type: String,
    /// 响应时间（毫秒）
    pub elapsed_ms: u64,
}

impl RawPage {
    /// 内容是否为JSON
    pub fn is_json(&self) -> bool {
        self.content_type.contains("json") || self.content.trim_start().starts_with('{')
    }
}

/// 页面抓取引擎特质
///
/// 引擎只负责单次请求；重试、限流与拦截识别由 `Fetcher` 处理。
/// 非2xx响应也以 `Ok(RawPage)` 返回，由调用方分类。
#[async_trait]
pub trait PageEngine: Send + Sync {
    /// 执行单次抓取
    async fn fetch(&self, request: &FetchRequest) -> Result<RawPage, FetchError>;

    /// 引擎名称
    fn name(&self) -> &'static str;
}

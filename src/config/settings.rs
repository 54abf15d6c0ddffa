// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::engines::fetcher::FetchOptions;
use crate::parsers::records::PageKind;
use crate::utils::retry_policy::RetryPolicy;
use chrono::{NaiveDate, NaiveDateTime};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;
use validator::{Validate, ValidationError};

/// 环境变量前缀，例如 `RACECRAWL__PIPELINE__WORKER_CONCURRENCY=16`
pub const ENV_PREFIX: &str = "RACECRAWL";

/// 应用程序配置设置
///
/// 包含抓取、流水线、数据源、存储、别名表、指标与运行范围等所有配置项
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Settings {
    /// 抓取配置
    #[validate(nested)]
    pub fetcher: FetcherSettings,
    /// 流水线并发配置
    #[validate(nested)]
    pub pipeline: PipelineSettings,
    /// 数据源配置
    #[validate(nested)]
    pub sources: SourceSettings,
    /// 存储配置
    #[validate(nested)]
    pub storage: StorageSettings,
    /// 别名表配置
    #[serde(default)]
    pub aliases: AliasSettings,
    /// 指标配置
    #[validate(nested)]
    pub metrics: MetricsSettings,
    /// 运行范围
    #[serde(default)]
    pub run: RunSettings,
}

/// 抓取配置设置
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct FetcherSettings {
    /// 赛会页与赛事页使用的引擎 (browser, reqwest)
    #[validate(custom(function = "validate_engine"))]
    pub engine: String,
    /// 单次请求超时（毫秒）
    #[validate(range(min = 100, max = 600_000))]
    pub timeout_ms: u64,
    /// 最大重试次数
    #[validate(range(max = 10))]
    pub max_retries: u32,
    /// 首次退避（毫秒）
    pub initial_backoff_ms: u64,
    /// 退避上限（毫秒）
    pub max_backoff_ms: u64,
    /// 退避倍数
    #[validate(range(min = 1.0))]
    pub backoff_multiplier: f64,
    /// 抖动比例
    #[validate(range(min = 0.0, max = 1.0))]
    pub jitter_factor: f64,
    /// 同一主机相邻请求的最小间隔（毫秒）
    pub rate_limit_ms: u64,
    /// 每个主机的并发请求数
    #[validate(range(min = 1))]
    pub per_host_concurrency: usize,
    /// HTTP引擎的User-Agent
    #[validate(length(min = 1))]
    pub user_agent: String,
    /// 远程Chrome调试地址，未配置时启动本地无头Chrome
    pub remote_debugging_url: Option<String>,
    /// 浏览器启动超时（毫秒）
    pub browser_launch_timeout_ms: u64,
    /// 各页面类型的就绪选择器
    #[serde(default)]
    pub ready_selectors: ReadySelectors,
}

/// 动态页面就绪选择器
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReadySelectors {
    pub schedule: Option<String>,
    pub meeting_card: Option<String>,
    pub race_card: Option<String>,
    pub results_page: Option<String>,
}

impl FetcherSettings {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            backoff_multiplier: self.backoff_multiplier,
            jitter_factor: self.jitter_factor,
        }
    }

    /// 指定页面类型的抓取选项
    pub fn fetch_options(&self, kind: PageKind) -> FetchOptions {
        FetchOptions {
            timeout_ms: self.timeout_ms,
            max_retries: self.max_retries,
            retry_backoff: self.retry_policy(),
            rate_limit_ms: self.rate_limit_ms,
            ready_selector: self.ready_selector(kind),
        }
    }

    pub fn ready_selector(&self, kind: PageKind) -> Option<String> {
        match kind {
            PageKind::Schedule => self.ready_selectors.schedule.clone(),
            PageKind::MeetingCard => self.ready_selectors.meeting_card.clone(),
            PageKind::RaceCard => self.ready_selectors.race_card.clone(),
            PageKind::ResultsPage => self.ready_selectors.results_page.clone(),
        }
    }

    pub fn browser_launch_timeout(&self) -> Duration {
        Duration::from_millis(self.browser_launch_timeout_ms)
    }
}

/// 流水线并发配置
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PipelineSettings {
    /// 同时进行抓取、解析与规范化的页面数
    #[validate(range(min = 1))]
    pub worker_concurrency: usize,
    /// 同时对账的赛会数
    #[validate(range(min = 1))]
    pub reconcile_concurrency: usize,
}

/// 数据源配置
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SourceSettings {
    /// 赛程URL模板，支持 `{date}`、`{year}`、`{month}`、`{day}`
    #[validate(custom(function = "validate_schedule_template"))]
    pub schedule_url_template: String,
    /// JSON赛程中赛程ID对应的赛会页模板，支持 `{year}`、`{fixture_id}`
    #[validate(length(min = 1))]
    pub fixture_url_template: String,
    /// 赛程页使用的引擎 (browser, reqwest)
    #[validate(custom(function = "validate_engine"))]
    pub schedule_engine: String,
    /// 用于捕获Bearer令牌的公开页面
    pub token_url: Option<String>,
    /// 需要令牌的API域名
    pub api_domain: Option<String>,
    /// 等待API请求出现的时间（毫秒）
    pub token_wait_ms: u64,
}

/// 存储配置设置
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct StorageSettings {
    /// 存储类型 (local, memory)
    #[validate(custom(function = "validate_storage_type"))]
    pub storage_type: String,
    /// 本地存储路径 (当 type=local 时使用)
    pub local_path: String,
}

/// 别名表配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AliasSettings {
    /// YAML别名表路径，未配置时只做精确匹配
    pub path: Option<String>,
}

/// 指标配置
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct MetricsSettings {
    /// 是否启用 Prometheus 导出
    pub enabled: bool,
    /// 导出端点监听地址
    #[validate(custom(function = "validate_socket_addr"))]
    pub listen_addr: String,
}

/// 运行范围
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunSettings {
    /// 起始日期，默认今天
    pub start_date: Option<NaiveDate>,
    /// 结束日期（含），默认等于起始日期
    pub end_date: Option<NaiveDate>,
    /// 覆盖"当前"英国本地时间，用于重放历史运行
    pub as_of: Option<NaiveDateTime>,
}

impl RunSettings {
    /// 解析日期范围，不做先后校验
    pub fn date_range(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let start = self.start_date.unwrap_or(today);
        let end = self.end_date.unwrap_or(start);
        (start, end)
    }
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 依次叠加：默认值、`config/default`、`config/{APP_ENVIRONMENT}`、
    /// 以 `RACECRAWL` 为前缀的环境变量
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        let builder = Self::defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

        builder.build()?.try_deserialize()
    }

    /// 只包含默认值的构建器
    pub fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            // Default fetcher settings
            .set_default("fetcher.engine", "browser")?
            .set_default("fetcher.timeout_ms", 15_000)?
            .set_default("fetcher.max_retries", 3)?
            .set_default("fetcher.initial_backoff_ms", 1_000)?
            .set_default("fetcher.max_backoff_ms", 30_000)?
            .set_default("fetcher.backoff_multiplier", 2.0)?
            .set_default("fetcher.jitter_factor", 0.1)?
            .set_default("fetcher.rate_limit_ms", 1_000)?
            .set_default("fetcher.per_host_concurrency", 2)?
            .set_default("fetcher.user_agent", crate::engines::reqwest_engine::DEFAULT_USER_AGENT)?
            .set_default("fetcher.browser_launch_timeout_ms", 60_000)?
            // Default pipeline settings
            .set_default("pipeline.worker_concurrency", 8)?
            .set_default("pipeline.reconcile_concurrency", 4)?
            // Default source settings
            .set_default(
                "sources.schedule_url_template",
                "https://api09.horseracing.software/bha/v1/fixtures/?fields=courseId,courseName,fixtureDate,fixtureType,fixtureSession,abandonedReasonCode,highlightTitle&month={month}&order=desc&page=1&per_page=250&resultsAvailable=1&year={year}",
            )?
            .set_default(
                "sources.fixture_url_template",
                "https://www.britishhorseracing.com/racing/fixtures/{year}/{fixture_id}/",
            )?
            .set_default("sources.schedule_engine", "reqwest")?
            .set_default("sources.token_wait_ms", 15_000)?
            // Default storage settings
            .set_default("storage.storage_type", "local")?
            .set_default("storage.local_path", "./storage/racing")?
            // Default metrics settings
            .set_default("metrics.enabled", false)?
            .set_default("metrics.listen_addr", "0.0.0.0:9000")
    }
}

fn validate_engine(engine: &str) -> Result<(), ValidationError> {
    match engine {
        "browser" | "reqwest" => Ok(()),
        _ => Err(ValidationError::new("unknown_engine")),
    }
}

fn validate_storage_type(storage_type: &str) -> Result<(), ValidationError> {
    match storage_type {
        "local" | "memory" => Ok(()),
        _ => Err(ValidationError::new("unknown_storage_type")),
    }
}

fn validate_schedule_template(template: &str) -> Result<(), ValidationError> {
    let has_placeholder = ["{date}", "{year}", "{month}", "{day}"]
        .iter()
        .any(|p| template.contains(p));
    if !has_placeholder {
        return Err(ValidationError::new("schedule_template_without_date"));
    }
    Ok(())
}

fn validate_socket_addr(addr: &str) -> Result<(), ValidationError> {
    addr.parse::<std::net::SocketAddr>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("invalid_socket_addr"))
}

#[cfg(test)]
#[path = "settings_test.rs"]
mod tests;

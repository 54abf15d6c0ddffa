// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use anyhow::Context;
use chrono::Utc;
use racecrawl::application::{CancelHandle, CollectRacingRequest, CollectRacingUseCase};
use racecrawl::config::settings::Settings;
use racecrawl::domain::repositories::alias_repository::AliasTable;
use racecrawl::engines::browser_engine::BrowserEngine;
use racecrawl::engines::reqwest_engine::ReqwestEngine;
use racecrawl::engines::traits::PageEngine;
use racecrawl::infrastructure::alias_table::StaticAliasTable;
use racecrawl::infrastructure::metrics;
use racecrawl::infrastructure::storage;
use racecrawl::utils::racing_formats::uk_local_time;
use racecrawl::utils::telemetry;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use validator::Validate;

/// 主函数
///
/// 加载配置、构建引擎与存储，执行一次采集运行并输出JSON报告
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize logging
    telemetry::init_telemetry();
    info!("Starting racecrawl...");

    // 2. Load configuration
    let settings = Settings::new().context("failed to load configuration")?;
    settings
        .validate()
        .context("configuration validation failed")?;
    let settings = Arc::new(settings);
    info!("Configuration loaded");

    if settings.metrics.enabled {
        let addr: SocketAddr = settings.metrics.listen_addr.parse()?;
        metrics::init_metrics(addr);
    }

    // 3. Collaborators
    let aliases: Arc<dyn AliasTable> = match &settings.aliases.path {
        Some(path) => {
            let table = StaticAliasTable::load(path)
                .with_context(|| format!("failed to load alias table {}", path))?;
            info!(entries = table.len(), "Alias table loaded from {}", path);
            Arc::new(table)
        }
        None => Arc::new(StaticAliasTable::new()),
    };
    let storage = storage::create_storage(&settings.storage)?;
    info!("Storage initialized: {}", settings.storage.storage_type);

    // 4. Engines
    let http = Arc::new(ReqwestEngine::new(settings.fetcher.user_agent.clone()));
    let needs_token = settings.sources.token_url.is_some() && settings.sources.api_domain.is_some();
    let needs_browser = settings.fetcher.engine == "browser"
        || settings.sources.schedule_engine == "browser"
        || needs_token;
    let browser = needs_browser.then(|| {
        Arc::new(BrowserEngine::new(
            settings.fetcher.remote_debugging_url.clone(),
            settings.fetcher.browser_launch_timeout(),
        ))
    });

    if let (Some(token_url), Some(api_domain), Some(browser)) = (
        &settings.sources.token_url,
        &settings.sources.api_domain,
        &browser,
    ) {
        match browser
            .capture_bearer_token(
                token_url,
                api_domain,
                Duration::from_millis(settings.fetcher.timeout_ms),
                Duration::from_millis(settings.sources.token_wait_ms),
            )
            .await
        {
            Ok(token) => {
                http.set_bearer_token(token);
                info!("Bearer token captured for {}", api_domain);
            }
            Err(e) => warn!("Bearer token capture failed, continuing without it: {}", e),
        }
    }

    let pick = |name: &str| -> anyhow::Result<Arc<dyn PageEngine>> {
        match (name, &browser) {
            ("reqwest", _) => Ok(http.clone() as Arc<dyn PageEngine>),
            ("browser", Some(browser)) => Ok(browser.clone() as Arc<dyn PageEngine>),
            (other, _) => anyhow::bail!("engine '{}' is not available", other),
        }
    };
    let schedule_engine = pick(&settings.sources.schedule_engine)?;
    let page_engine = pick(&settings.fetcher.engine)?;

    // 5. Run
    let cancel = CancelHandle::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, no new pages will be scheduled");
            signal_cancel.cancel();
        }
    });

    let today = uk_local_time(Utc::now()).date();
    let (start, end) = settings.run.date_range(today);
    let use_case = CollectRacingUseCase::new(
        schedule_engine,
        page_engine,
        storage,
        aliases,
        settings.clone(),
    );
    let report = use_case
        .run(CollectRacingRequest::new(start, end), cancel)
        .await?;

    info!("{}", serde_json::to_string(&report)?);
    Ok(())
}

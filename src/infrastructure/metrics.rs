// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{info, warn};

/// 初始化指标导出
///
/// 安装 Prometheus 记录器并在 `addr` 上提供抓取端点。
/// 未调用时各 `metrics` 宏为空操作。
///
/// # 参数
///
/// * `addr` - 监听地址，例如 `0.0.0.0:9000`
pub fn init_metrics(addr: SocketAddr) {
    // Ignore error if address is already in use (for development/testing)
    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        warn!(
            "Failed to install Prometheus recorder: {}. This might happen if the port is already in use.",
            e
        );
        return;
    }

    describe_metrics();
    info!("Metrics exporter listening on {}", addr);
}

fn describe_metrics() {
    describe_counter!(
        "racecrawl_fetch_attempts_total",
        "Total number of page fetch attempts, retries included"
    );
    describe_counter!(
        "racecrawl_fetch_failures_total",
        "Total number of fetches that failed after retries, by error kind"
    );
    describe_histogram!(
        "racecrawl_fetch_duration_seconds",
        "Duration of a single fetch attempt in seconds"
    );
    describe_counter!(
        "racecrawl_upserts_total",
        "Total number of applied upsert operations, by action"
    );
    describe_counter!(
        "racecrawl_runs_total",
        "Total number of finished scrape runs, by final state"
    );
}

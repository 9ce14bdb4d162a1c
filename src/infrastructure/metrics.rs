// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::MetricsSettings;
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{info, warn};

/// 安装 Prometheus 导出器并注册指标说明
///
/// 监听地址无效或端口被占用时只记录警告，服务照常启动
pub fn init_metrics(settings: &MetricsSettings) {
    if !settings.enabled {
        info!("Metrics exporter disabled");
        return;
    }

    let addr: SocketAddr = match settings.listen_addr.parse() {
        Ok(addr) => addr,
        Err(e) => {
            warn!("Invalid metrics address {}: {}", settings.listen_addr, e);
            return;
        }
    };

    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        warn!("Failed to install Prometheus recorder: {}. This might happen if the port is already in use.", e);
        return;
    }

    describe_counter!("crawler_runs_started_total", "Crawl runs accepted, by mode");
    describe_counter!(
        "crawler_runs_finished_total",
        "Crawl runs finalized, by terminal status"
    );
    describe_counter!(
        "crawler_articles_total",
        "Articles stored, by outcome (inserted, updated)"
    );
    describe_counter!(
        "crawler_fetch_errors_total",
        "Article fetches that failed after retries, by reason"
    );
    describe_gauge!("crawler_active_runs", "Crawl runs currently executing");
    describe_histogram!(
        "crawler_run_duration_seconds",
        "Wall-clock duration of crawl runs in seconds"
    );

    info!("Metrics exporter listening on {}", addr);
}

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::MetricsSettings;
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{info, warn};

pub const PROFILES_EXTRACTED: &str = "leadcrawl_profiles_extracted_total";
pub const PROFILES_SKIPPED: &str = "leadcrawl_profiles_skipped_total";
pub const BATCH_FLUSHES: &str = "leadcrawl_batch_flushes_total";
pub const BATCH_FLUSH_FAILURES: &str = "leadcrawl_batch_flush_failures_total";
pub const FETCH_FAILURES: &str = "leadcrawl_fetch_failures_total";
pub const JOBS_FINISHED: &str = "leadcrawl_jobs_finished_total";
pub const JOBS_STALLED: &str = "leadcrawl_jobs_stalled_total";
pub const BUFFERED_PROFILES: &str = "leadcrawl_buffered_profiles";

/// 安装 Prometheus 导出器并注册指标说明
///
/// 地址被占用时只记录警告，抓取照常进行。
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

    describe_counter!(PROFILES_EXTRACTED, "Profiles extracted and buffered");
    describe_counter!(PROFILES_SKIPPED, "Profile pages dropped because no name was found");
    describe_counter!(BATCH_FLUSHES, "Batches persisted to the database");
    describe_counter!(BATCH_FLUSH_FAILURES, "Batch flush attempts that failed");
    describe_counter!(FETCH_FAILURES, "Page fetches that failed on every transport");
    describe_counter!(JOBS_FINISHED, "Jobs reaching a terminal status, by status");
    describe_counter!(JOBS_STALLED, "In-progress jobs failed by the stale-job sweeper");
    describe_gauge!(BUFFERED_PROFILES, "Profiles held in memory awaiting flush");

    info!("Metrics exporter listening on {}", addr);
}

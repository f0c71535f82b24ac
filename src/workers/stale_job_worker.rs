// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::MonitorSettings;
use crate::domain::repositories::scrape_job_repository::{RepositoryError, ScrapeJobRepository};
use crate::infrastructure::metrics::{JOBS_FINISHED, JOBS_STALLED};
use chrono::{DateTime, FixedOffset, Utc};
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// 停滞作业清理工作器
///
/// 进行中的作业在 `stale_after` 内没有任何进度（`updated_at` 没有推进），
/// 说明抓取进程已经退出或卡死，将其标记为失败。
pub struct StaleJobSweeper<R>
where
    R: ScrapeJobRepository + 'static,
{
    repository: Arc<R>,
    stale_after: chrono::Duration,
    interval: Duration,
}

impl<R> StaleJobSweeper<R>
where
    R: ScrapeJobRepository + 'static,
{
    pub fn new(repository: Arc<R>, settings: &MonitorSettings) -> Self {
        Self {
            repository,
            stale_after: chrono::Duration::minutes(settings.stale_after_minutes),
            interval: Duration::from_secs(settings.sweep_interval_secs.max(1)),
        }
    }

    /// 运行工作器
    pub async fn run(&self) {
        info!(
            "Stale job sweeper started (stale after {} min)",
            self.stale_after.num_minutes()
        );

        let mut interval = tokio::time::interval(self.interval);

        loop {
            interval.tick().await;

            match self.sweep(Utc::now()).await {
                Ok(count) => {
                    if count > 0 {
                        info!("Failed {} stalled jobs", count);
                    }
                }
                Err(e) => {
                    error!("Failed to sweep stalled jobs: {}", e);
                }
            }
        }
    }

    /// 启动后台运行
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    /// 扫描一次，返回被标记失败的作业数
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let cutoff: DateTime<FixedOffset> = (now - self.stale_after).into();
        let mut failed = 0;

        for job in self.repository.find_stale(cutoff).await? {
            let message = format!("stalled: no progress since {}", job.updated_at.to_rfc3339());
            if self.repository.fail_stale(job.id, &message).await? {
                warn!("Job {} {}", job.id, message);
                counter!(JOBS_STALLED).increment(1);
                counter!(JOBS_FINISHED, "status" => "failed").increment(1);
                failed += 1;
            }
        }

        Ok(failed)
    }
}

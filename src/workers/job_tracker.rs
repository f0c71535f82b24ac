// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::scrape_job::{JobStatus, ScrapeJob};
use crate::domain::repositories::scrape_job_repository::{RepositoryError, ScrapeJobRepository};
use crate::infrastructure::metrics::JOBS_FINISHED;
use metrics::counter;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// 作业状态跟踪器
///
/// 把作业的生命周期写回数据库。每个方法都是条件更新，
/// 作业不处于预期状态时返回 `RepositoryError::StatusConflict`。
pub struct JobTracker<R>
where
    R: ScrapeJobRepository + 'static,
{
    repository: Arc<R>,
}

impl<R> Clone for JobTracker<R>
where
    R: ScrapeJobRepository + 'static,
{
    fn clone(&self) -> Self {
        Self {
            repository: self.repository.clone(),
        }
    }
}

impl<R> JobTracker<R>
where
    R: ScrapeJobRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// 认领待处理作业：pending → in_progress
    pub async fn mark_in_progress(&self, id: Uuid) -> Result<ScrapeJob, RepositoryError> {
        let job = self
            .repository
            .transition(id, JobStatus::Pending, JobStatus::InProgress, None, None)
            .await?;
        info!("Job {} started", id);
        Ok(job)
    }

    /// 成功结束：in_progress → completed
    pub async fn mark_completed(
        &self,
        id: Uuid,
        leads_found: i64,
    ) -> Result<ScrapeJob, RepositoryError> {
        let job = self
            .repository
            .transition(
                id,
                JobStatus::InProgress,
                JobStatus::Completed,
                None,
                Some(leads_found),
            )
            .await?;
        counter!(JOBS_FINISHED, "status" => "completed").increment(1);
        info!("Job {} completed with {} leads", id, leads_found);
        Ok(job)
    }

    /// 失败结束：in_progress → failed
    pub async fn mark_failed(
        &self,
        id: Uuid,
        error: impl Into<String>,
    ) -> Result<ScrapeJob, RepositoryError> {
        let error = error.into();
        let job = self
            .repository
            .transition(
                id,
                JobStatus::InProgress,
                JobStatus::Failed,
                Some(error.clone()),
                None,
            )
            .await?;
        counter!(JOBS_FINISHED, "status" => "failed").increment(1);
        warn!("Job {} failed: {}", id, error);
        Ok(job)
    }
}

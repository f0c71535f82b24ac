// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::scrape_job::{DomainError, JobStatus, ScrapeJob};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

/// 仓库错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// 数据库错误
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    /// 记录未找到
    #[error("Record not found")]
    NotFound,
    /// 条件更新未命中：作业不处于预期状态
    #[error("Job {id} is not {expected}")]
    StatusConflict { id: Uuid, expected: JobStatus },
    /// 状态机不允许的转换
    #[error(transparent)]
    Domain(#[from] DomainError),
    /// 存储的数据无法还原为领域对象
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

/// 抓取作业仓库特质
///
/// 所有状态变更都是条件更新（`WHERE status = expected`），
/// 并发的进程或运维操作不会让状态倒退。
#[async_trait]
pub trait ScrapeJobRepository: Send + Sync {
    /// 创建新作业
    async fn create(&self, job: &ScrapeJob) -> Result<ScrapeJob, RepositoryError>;
    /// 根据ID查找作业
    async fn find_by_id(&self, id: Uuid) -> Result<Option<ScrapeJob>, RepositoryError>;
    /// 最早创建的待处理作业
    async fn next_pending(&self) -> Result<Option<ScrapeJob>, RepositoryError>;
    /// 仅当作业处于 `expected` 状态时写入新状态
    ///
    /// 返回更新后的作业；状态不符时返回 `StatusConflict`。
    async fn transition(
        &self,
        id: Uuid,
        expected: JobStatus,
        next: JobStatus,
        error_message: Option<String>,
        leads_found: Option<i64>,
    ) -> Result<ScrapeJob, RepositoryError>;
    /// 所有进行中的作业，按创建时间排序
    async fn find_in_progress(&self) -> Result<Vec<ScrapeJob>, RepositoryError>;
    /// 推进 `updated_at`
    async fn touch(&self, id: Uuid) -> Result<(), RepositoryError>;
    /// 查找 `updated_at` 早于给定时间的进行中作业
    async fn find_stale(
        &self,
        older_than: DateTime<FixedOffset>,
    ) -> Result<Vec<ScrapeJob>, RepositoryError>;
    /// 将停滞作业标记为失败，作业已离开进行中状态时返回 `false`
    async fn fail_stale(&self, id: Uuid, message: &str) -> Result<bool, RepositoryError>;
}

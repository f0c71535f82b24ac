// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::profile_record::ProfileRecord;
use crate::domain::repositories::scrape_job_repository::RepositoryError;
use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

/// 一次批量落库的结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    /// 新插入的档案数
    pub inserted: u64,
    /// 按 `profile_url` 合并更新的档案数
    pub updated: u64,
    /// 落库后作业下不同档案URL的总数
    pub leads_found: i64,
}

/// 档案批量存储
///
/// 一个批次在同一事务内完成：逐条按 `(job_id, profile_url)` 合并或插入，
/// 然后重新统计作业的档案数并推进作业的 `updated_at`。
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn persist_batch(
        &self,
        job_id: Uuid,
        records: &[ProfileRecord],
    ) -> Result<BatchOutcome, RepositoryError>;
}

/// 档案记录仓库特质
#[async_trait]
pub trait ProfileRecordRepository: ProfileStore {
    /// 查询作业下的全部档案，按 `profile_url` 排序
    async fn find_by_job(&self, job_id: Uuid) -> Result<Vec<ProfileRecord>, RepositoryError>;
    /// 作业下不同档案URL的数量
    async fn count_by_job(&self, job_id: Uuid) -> Result<i64, RepositoryError>;
}

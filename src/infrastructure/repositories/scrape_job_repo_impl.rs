// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::domain::models::scrape_job::{next_timestamp, DomainError, JobStatus, ScrapeJob};
use crate::domain::repositories::scrape_job_repository::{RepositoryError, ScrapeJobRepository};
use crate::infrastructure::database::entities::scrape_job as job_entity;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use std::sync::Arc;
use uuid::Uuid;

/// 抓取作业仓库实现
///
/// 基于SeaORM实现的作业数据访问层
#[derive(Clone)]
pub struct ScrapeJobRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl ScrapeJobRepositoryImpl {
    /// 创建新的作业仓库实例
    ///
    /// # 参数
    ///
    /// * `db` - 数据库连接
    ///
    /// # 返回值
    ///
    /// 返回新的作业仓库实例
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl TryFrom<job_entity::Model> for ScrapeJob {
    type Error = RepositoryError;

    fn try_from(model: job_entity::Model) -> Result<Self, Self::Error> {
        let status = model.status.parse().map_err(|_| {
            RepositoryError::Corrupt(format!("job {} has status {:?}", model.id, model.status))
        })?;
        Ok(Self {
            id: model.id,
            target_url: model.target_url,
            site: model.site,
            status,
            created_at: model.created_at,
            updated_at: model.updated_at,
            error_message: model.error_message,
            leads_found: model.leads_found,
        })
    }
}

impl From<&ScrapeJob> for job_entity::ActiveModel {
    fn from(job: &ScrapeJob) -> Self {
        Self {
            id: Set(job.id),
            target_url: Set(job.target_url.clone()),
            site: Set(job.site.clone()),
            status: Set(job.status.to_string()),
            error_message: Set(job.error_message.clone()),
            leads_found: Set(job.leads_found),
            created_at: Set(job.created_at),
            updated_at: Set(job.updated_at),
        }
    }
}

#[async_trait]
impl ScrapeJobRepository for ScrapeJobRepositoryImpl {
    async fn create(&self, job: &ScrapeJob) -> Result<ScrapeJob, RepositoryError> {
        let model: job_entity::ActiveModel = job.into();
        model.insert(self.db.as_ref()).await?.try_into()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ScrapeJob>, RepositoryError> {
        job_entity::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .map(TryInto::try_into)
            .transpose()
    }

    async fn next_pending(&self) -> Result<Option<ScrapeJob>, RepositoryError> {
        job_entity::Entity::find()
            .filter(job_entity::Column::Status.eq(JobStatus::Pending.to_string()))
            .order_by_asc(job_entity::Column::CreatedAt)
            .one(self.db.as_ref())
            .await?
            .map(TryInto::try_into)
            .transpose()
    }

    async fn transition(
        &self,
        id: Uuid,
        expected: JobStatus,
        next: JobStatus,
        error_message: Option<String>,
        leads_found: Option<i64>,
    ) -> Result<ScrapeJob, RepositoryError> {
        if !expected.can_transition_to(next) {
            return Err(DomainError::InvalidStateTransition {
                from: expected,
                to: next,
            }
            .into());
        }

        let txn = self.db.begin().await?;

        let current = job_entity::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        if current.status != expected.to_string() {
            return Err(RepositoryError::StatusConflict { id, expected });
        }

        let mut update = job_entity::Entity::update_many()
            .col_expr(job_entity::Column::Status, Expr::value(next.to_string()))
            .col_expr(
                job_entity::Column::UpdatedAt,
                Expr::value(next_timestamp(current.updated_at)),
            );
        if let Some(message) = error_message {
            update = update.col_expr(job_entity::Column::ErrorMessage, Expr::value(message));
        }
        if let Some(count) = leads_found {
            update = update.col_expr(job_entity::Column::LeadsFound, Expr::value(count));
        }

        // Conditional on the status we just read, so a concurrent writer wins cleanly
        let result = update
            .filter(job_entity::Column::Id.eq(id))
            .filter(job_entity::Column::Status.eq(expected.to_string()))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(RepositoryError::StatusConflict { id, expected });
        }

        let updated = job_entity::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        txn.commit().await?;

        updated.try_into()
    }

    async fn find_in_progress(&self) -> Result<Vec<ScrapeJob>, RepositoryError> {
        job_entity::Entity::find()
            .filter(job_entity::Column::Status.eq(JobStatus::InProgress.to_string()))
            .order_by_asc(job_entity::Column::CreatedAt)
            .all(self.db.as_ref())
            .await?
            .into_iter()
            .map(TryInto::try_into)
            .collect()
    }

    async fn touch(&self, id: Uuid) -> Result<(), RepositoryError> {
        let txn = self.db.begin().await?;
        let current = job_entity::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        let updated_at = next_timestamp(current.updated_at);
        let mut active: job_entity::ActiveModel = current.into();
        active.updated_at = Set(updated_at);
        active.update(&txn).await?;

        txn.commit().await?;
        Ok(())
    }

    async fn find_stale(
        &self,
        older_than: DateTime<FixedOffset>,
    ) -> Result<Vec<ScrapeJob>, RepositoryError> {
        job_entity::Entity::find()
            .filter(job_entity::Column::Status.eq(JobStatus::InProgress.to_string()))
            .filter(job_entity::Column::UpdatedAt.lt(older_than))
            .order_by_asc(job_entity::Column::UpdatedAt)
            .all(self.db.as_ref())
            .await?
            .into_iter()
            .map(TryInto::try_into)
            .collect()
    }

    async fn fail_stale(&self, id: Uuid, message: &str) -> Result<bool, RepositoryError> {
        let now: DateTime<FixedOffset> = Utc::now().into();
        let result = job_entity::Entity::update_many()
            .col_expr(
                job_entity::Column::Status,
                Expr::value(JobStatus::Failed.to_string()),
            )
            .col_expr(job_entity::Column::ErrorMessage, Expr::value(message))
            .col_expr(job_entity::Column::UpdatedAt, Expr::value(now))
            .filter(job_entity::Column::Id.eq(id))
            .filter(job_entity::Column::Status.eq(JobStatus::InProgress.to_string()))
            .exec(self.db.as_ref())
            .await?;

        Ok(result.rows_affected > 0)
    }
}

#[cfg(test)]
#[path = "scrape_job_repo_impl_test.rs"]
mod tests;

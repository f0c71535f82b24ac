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

use crate::domain::models::profile_record::ProfileRecord;
use crate::domain::models::scrape_job::next_timestamp;
use crate::domain::repositories::profile_record_repository::{
    BatchOutcome, ProfileRecordRepository, ProfileStore,
};
use crate::domain::repositories::scrape_job_repository::RepositoryError;
use crate::infrastructure::database::entities::{
    profile_record as record_entity, scrape_job as job_entity,
};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// 档案记录仓库实现
///
/// 以 `(job_id, profile_url)` 为自然键做更新合并，同一URL永远只有一行。
#[derive(Clone)]
pub struct ProfileRecordRepositoryImpl {
    db: Arc<DatabaseConnection>,
}

impl ProfileRecordRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

fn strings_to_json(values: &[String]) -> Value {
    Value::Array(values.iter().cloned().map(Value::String).collect())
}

fn json_to_strings(value: Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

impl From<record_entity::Model> for ProfileRecord {
    fn from(model: record_entity::Model) -> Self {
        Self {
            job_id: model.job_id,
            profile_url: model.profile_url,
            source_site: model.source_site,
            full_name: model.full_name,
            first_name: model.first_name,
            last_name: model.last_name,
            company: model.company,
            city: model.city,
            state: model.state,
            phone: model.phone,
            phones: json_to_strings(model.phones),
            email: model.email,
            emails: json_to_strings(model.emails),
            years_experience: model.years_experience,
            deals_closed: model.deals_closed,
            review_count: model.review_count,
            extra: match model.extra {
                Value::Object(map) => map,
                _ => Map::new(),
            },
        }
    }
}

/// 把档案字段写入活动模型，不触碰主键和时间戳
fn apply_fields(active: &mut record_entity::ActiveModel, record: &ProfileRecord) {
    active.source_site = Set(record.source_site.clone());
    active.full_name = Set(record.full_name.clone());
    active.first_name = Set(record.first_name.clone());
    active.last_name = Set(record.last_name.clone());
    active.company = Set(record.company.clone());
    active.city = Set(record.city.clone());
    active.state = Set(record.state.clone());
    active.phone = Set(record.phone.clone());
    active.phones = Set(strings_to_json(&record.phones));
    active.email = Set(record.email.clone());
    active.emails = Set(strings_to_json(&record.emails));
    active.years_experience = Set(record.years_experience);
    active.deals_closed = Set(record.deals_closed);
    active.review_count = Set(record.review_count);
    active.extra = Set(Value::Object(record.extra.clone()));
}

#[async_trait]
impl ProfileStore for ProfileRecordRepositoryImpl {
    async fn persist_batch(
        &self,
        job_id: Uuid,
        records: &[ProfileRecord],
    ) -> Result<BatchOutcome, RepositoryError> {
        let txn = self.db.begin().await?;

        let job = job_entity::Entity::find_by_id(job_id)
            .one(&txn)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        let now: DateTime<FixedOffset> = Utc::now().into();
        let mut outcome = BatchOutcome::default();

        for record in records {
            let existing = record_entity::Entity::find()
                .filter(record_entity::Column::JobId.eq(job_id))
                .filter(record_entity::Column::ProfileUrl.eq(record.profile_url.as_str()))
                .one(&txn)
                .await?;

            match existing {
                Some(model) => {
                    let mut merged: ProfileRecord = model.clone().into();
                    merged.merge_from(record);

                    let mut active: record_entity::ActiveModel = model.into();
                    apply_fields(&mut active, &merged);
                    active.updated_at = Set(now);
                    active.update(&txn).await?;
                    outcome.updated += 1;
                }
                None => {
                    let mut active = record_entity::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        job_id: Set(job_id),
                        profile_url: Set(record.profile_url.clone()),
                        created_at: Set(now),
                        updated_at: Set(now),
                        ..Default::default()
                    };
                    apply_fields(&mut active, record);
                    active.insert(&txn).await?;
                    outcome.inserted += 1;
                }
            }
        }

        // Unique (job_id, profile_url) makes the row count the distinct URL count
        let leads_found = record_entity::Entity::find()
            .filter(record_entity::Column::JobId.eq(job_id))
            .count(&txn)
            .await? as i64;

        let updated_at = next_timestamp(job.updated_at);
        let mut job: job_entity::ActiveModel = job.into();
        job.leads_found = Set(leads_found);
        job.updated_at = Set(updated_at);
        job.update(&txn).await?;

        txn.commit().await?;

        outcome.leads_found = leads_found;
        debug!(
            "Persisted batch for job {}: {} inserted, {} updated, {} total",
            job_id, outcome.inserted, outcome.updated, leads_found
        );
        Ok(outcome)
    }
}

#[async_trait]
impl ProfileRecordRepository for ProfileRecordRepositoryImpl {
    async fn find_by_job(&self, job_id: Uuid) -> Result<Vec<ProfileRecord>, RepositoryError> {
        let models = record_entity::Entity::find()
            .filter(record_entity::Column::JobId.eq(job_id))
            .order_by_asc(record_entity::Column::ProfileUrl)
            .all(self.db.as_ref())
            .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn count_by_job(&self, job_id: Uuid) -> Result<i64, RepositoryError> {
        let count = record_entity::Entity::find()
            .filter(record_entity::Column::JobId.eq(job_id))
            .count(self.db.as_ref())
            .await?;
        Ok(count as i64)
    }
}

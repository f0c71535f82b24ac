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

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    application::dto::job_request::{CreateJobRequestDto, FailJobRequestDto},
    domain::{
        models::{
            scrape_job::ScrapeJob,
            site_profile::SiteProfile,
        },
        repositories::{
            profile_record_repository::ProfileRecordRepository,
            scrape_job_repository::{RepositoryError, ScrapeJobRepository},
        },
    },
    presentation::errors::AppError,
    workers::job_tracker::JobTracker,
};

/// 服务配置的默认站点
#[derive(Debug, Clone)]
pub struct DefaultSite(pub String);

/// 创建新的抓取作业
///
/// 作业以 `pending` 状态写入，由后台工作器认领。
pub async fn create_job<JR>(
    Extension(job_repo): Extension<Arc<JR>>,
    Extension(default_site): Extension<DefaultSite>,
    Json(payload): Json<CreateJobRequestDto>,
) -> Result<impl IntoResponse, AppError>
where
    JR: ScrapeJobRepository + 'static,
{
    payload.validate()?;

    let site = payload.site.unwrap_or_else(|| default_site.0.clone());
    if site != default_site.0 {
        SiteProfile::builtin(&site)?;
    }

    let job = job_repo
        .create(&ScrapeJob::new(payload.target_url, site))
        .await?;
    info!("Created job {} for {}", job.id, job.target_url);
    Ok((StatusCode::CREATED, Json(job)))
}

/// 查询作业
pub async fn get_job<JR>(
    Extension(job_repo): Extension<Arc<JR>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ScrapeJob>, AppError>
where
    JR: ScrapeJobRepository + 'static,
{
    let job = job_repo
        .find_by_id(id)
        .await?
        .ok_or(RepositoryError::NotFound)?;
    Ok(Json(job))
}

/// 列出作业已持久化的档案
pub async fn get_job_profiles<JR, PR>(
    Extension(job_repo): Extension<Arc<JR>>,
    Extension(profile_repo): Extension<Arc<PR>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError>
where
    JR: ScrapeJobRepository + 'static,
    PR: ProfileRecordRepository + 'static,
{
    if job_repo.find_by_id(id).await?.is_none() {
        return Err(RepositoryError::NotFound.into());
    }
    let profiles = profile_repo.find_by_job(id).await?;
    Ok(Json(json!({
        "job_id": id,
        "count": profiles.len(),
        "profiles": profiles,
    })))
}

/// 运维手动终止进行中的作业
///
/// 仅 `in_progress` 作业可被终止，其余状态返回 409。
pub async fn fail_job<JR>(
    Extension(job_repo): Extension<Arc<JR>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<FailJobRequestDto>,
) -> Result<Json<ScrapeJob>, AppError>
where
    JR: ScrapeJobRepository + 'static,
{
    payload.validate()?;
    let job = JobTracker::new(job_repo)
        .mark_failed(id, payload.reason)
        .await?;
    Ok(Json(job))
}


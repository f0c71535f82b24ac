// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::repositories::profile_record_repository::ProfileRecordRepository;
use crate::domain::repositories::scrape_job_repository::ScrapeJobRepository;
use crate::presentation::handlers::job_handler::{self, DefaultSite};
use axum::{
    routing::{get, post},
    Extension, Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// 按仓库类型实例化的作业路由
pub fn job_routes<JR, PR>() -> Router
where
    JR: ScrapeJobRepository + 'static,
    PR: ProfileRecordRepository + 'static,
{
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/v1/version", get(version));

    let job_routes = Router::new()
        .route("/v1/jobs", post(job_handler::create_job::<JR>))
        .route("/v1/jobs/{id}", get(job_handler::get_job::<JR>))
        .route(
            "/v1/jobs/{id}/profiles",
            get(job_handler::get_job_profiles::<JR, PR>),
        )
        .route("/v1/jobs/{id}/fail", post(job_handler::fail_job::<JR>));

    Router::new().merge(public_routes).merge(job_routes)
}

/// 组装带依赖注入与请求追踪的完整应用
///
/// # 参数
///
/// * `job_repo` - 作业仓库
/// * `profile_repo` - 档案仓库
/// * `default_site` - 请求未指定站点时使用的站点名
pub fn app<JR, PR>(job_repo: Arc<JR>, profile_repo: Arc<PR>, default_site: String) -> Router
where
    JR: ScrapeJobRepository + 'static,
    PR: ProfileRecordRepository + 'static,
{
    job_routes::<JR, PR>()
        .layer(Extension(job_repo))
        .layer(Extension(profile_repo))
        .layer(Extension(DefaultSite(default_site)))
        .layer(TraceLayer::new_for_http())
}

/// 健康检查端点
///
/// # 返回值
///
/// 返回"OK"字符串
pub async fn health_check() -> &'static str {
    "OK"
}

/// 版本信息端点
pub async fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

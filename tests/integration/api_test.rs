// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::helpers::test_db;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use leadcrawl::domain::models::profile_record::ProfileRecord;
use leadcrawl::domain::repositories::profile_record_repository::ProfileStore;
use leadcrawl::infrastructure::repositories::profile_record_repo_impl::ProfileRecordRepositoryImpl;
use leadcrawl::infrastructure::repositories::scrape_job_repo_impl::ScrapeJobRepositoryImpl;
use leadcrawl::presentation::routes;
use leadcrawl::workers::job_tracker::JobTracker;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

struct TestApp {
    router: Router,
    jobs: Arc<ScrapeJobRepositoryImpl>,
    profiles: Arc<ProfileRecordRepositoryImpl>,
}

async fn test_app() -> TestApp {
    let db = test_db().await;
    let jobs = Arc::new(ScrapeJobRepositoryImpl::new(db.clone()));
    let profiles = Arc::new(ProfileRecordRepositoryImpl::new(db));
    let router = routes::app(jobs.clone(), profiles.clone(), "realtor".to_string());
    TestApp {
        router,
        jobs,
        profiles,
    }
}

async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = router
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn create(app: &TestApp) -> Uuid {
    let (status, body) = send(
        &app.router,
        "POST",
        "/v1/jobs",
        Some(json!({ "target_url": "https://www.realtor.com/realestateagents/seattle_wa" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = test_app().await;
    let response = app
        .router
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_create_and_fetch_job() {
    let app = test_app().await;
    let id = create(&app).await;

    let (status, body) = send(&app.router, "GET", &format!("/v1/jobs/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["site"], "realtor");
    assert_eq!(body["leads_found"], 0);
    assert!(body["error_message"].is_null());
}

#[tokio::test]
async fn test_create_rejects_bad_input() {
    let app = test_app().await;

    let (status, body) = send(
        &app.router,
        "POST",
        "/v1/jobs",
        Some(json!({ "target_url": "seattle agents" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = send(
        &app.router,
        "POST",
        "/v1/jobs",
        Some(json!({
            "target_url": "https://www.example.com/agents",
            "site": "nowhere"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_job_is_404() {
    let app = test_app().await;
    let id = Uuid::new_v4();

    let (status, _) = send(&app.router, "GET", &format!("/v1/jobs/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app.router, "GET", &format!("/v1/jobs/{id}/profiles"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_profiles_endpoint_lists_persisted_records() {
    let app = test_app().await;
    let id = create(&app).await;

    let records: Vec<_> = ["b", "a"]
        .iter()
        .map(|suffix| {
            ProfileRecord::new(
                id,
                format!("https://www.realtor.com/realestateagents/00000000000000000000000{suffix}"),
                "realtor".to_string(),
                "Jane Doe".to_string(),
            )
        })
        .collect();
    app.profiles.persist_batch(id, &records).await.unwrap();

    let (status, body) = send(&app.router, "GET", &format!("/v1/jobs/{id}/profiles"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    let urls: Vec<&str> = body["profiles"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["profile_url"].as_str().unwrap())
        .collect();
    assert!(urls[0] < urls[1]);

    let (_, job) = send(&app.router, "GET", &format!("/v1/jobs/{id}"), None).await;
    assert_eq!(job["leads_found"], 2);
}

#[tokio::test]
async fn test_operator_can_fail_running_job_only() {
    let app = test_app().await;
    let id = create(&app).await;
    let uri = format!("/v1/jobs/{id}/fail");

    // Pending jobs have not been claimed yet
    let (status, _) = send(&app.router, "POST", &uri, Some(json!({ "reason": "stuck" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    JobTracker::new(app.jobs.clone())
        .mark_in_progress(id)
        .await
        .unwrap();

    let (status, _) = send(&app.router, "POST", &uri, Some(json!({ "reason": "" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app.router,
        "POST",
        &uri,
        Some(json!({ "reason": "worker host lost" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "failed");
    assert_eq!(body["error_message"], "worker host lost");

    // Terminal jobs stay terminal
    let (status, _) = send(&app.router, "POST", &uri, Some(json!({ "reason": "again" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

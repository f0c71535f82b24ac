// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::helpers::test_db;
use chrono::{Duration, Utc};
use leadcrawl::domain::models::profile_record::ProfileRecord;
use leadcrawl::domain::models::scrape_job::{JobStatus, ScrapeJob};
use leadcrawl::domain::repositories::profile_record_repository::{
    ProfileRecordRepository, ProfileStore,
};
use leadcrawl::domain::repositories::scrape_job_repository::{
    RepositoryError, ScrapeJobRepository,
};
use leadcrawl::infrastructure::repositories::profile_record_repo_impl::ProfileRecordRepositoryImpl;
use leadcrawl::infrastructure::repositories::scrape_job_repo_impl::ScrapeJobRepositoryImpl;
use leadcrawl::workers::job_tracker::JobTracker;
use std::sync::Arc;
use uuid::Uuid;

fn record(job_id: Uuid, n: usize) -> ProfileRecord {
    let mut record = ProfileRecord::new(
        job_id,
        format!("https://www.realtor.com/realestateagents/{:024x}", n),
        "realtor".to_string(),
        format!("Agent Number{n}"),
    );
    record.phone = Some(format!("206555{n:04}"));
    record.phones = vec![format!("206555{n:04}")];
    record
}

async fn started_job(jobs: &ScrapeJobRepositoryImpl) -> ScrapeJob {
    let job = jobs
        .create(&ScrapeJob::new(
            "https://www.realtor.com/realestateagents/seattle_wa".to_string(),
            "realtor".to_string(),
        ))
        .await
        .unwrap();
    JobTracker::new(Arc::new(jobs.clone()))
        .mark_in_progress(job.id)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_replaying_a_batch_after_restart_creates_no_duplicates() {
    let db = test_db().await;
    let jobs = ScrapeJobRepositoryImpl::new(db.clone());
    let profiles = ProfileRecordRepositoryImpl::new(db.clone());
    let job = started_job(&jobs).await;

    // First run persisted 20 profiles before the process died
    let first: Vec<_> = (0..20).map(|n| record(job.id, n)).collect();
    profiles.persist_batch(job.id, &first).await.unwrap();

    // The rerun sees the same directory and persists everything again
    let rerun: Vec<_> = (0..35).map(|n| record(job.id, n)).collect();
    let outcome = profiles.persist_batch(job.id, &rerun).await.unwrap();

    assert_eq!(outcome.inserted, 15);
    assert_eq!(outcome.updated, 20);
    assert_eq!(outcome.leads_found, 35);

    let rows = profiles.find_by_job(job.id).await.unwrap();
    assert_eq!(rows.len(), 35);

    let stored = jobs.find_by_id(job.id).await.unwrap().unwrap();
    assert_eq!(stored.leads_found, 35);
}

#[tokio::test]
async fn test_leads_found_tracks_distinct_urls() {
    let db = test_db().await;
    let jobs = ScrapeJobRepositoryImpl::new(db.clone());
    let profiles = ProfileRecordRepositoryImpl::new(db);
    let job = started_job(&jobs).await;

    let mut batch: Vec<_> = (0..10).map(|n| record(job.id, n)).collect();
    batch.push(record(job.id, 3));
    batch.push(record(job.id, 7));
    profiles.persist_batch(job.id, &batch).await.unwrap();

    let stored = jobs.find_by_id(job.id).await.unwrap().unwrap();
    assert_eq!(stored.leads_found, 10);
    assert_eq!(profiles.count_by_job(job.id).await.unwrap(), 10);
}

#[tokio::test]
async fn test_rescrape_updates_fields_in_place() {
    let db = test_db().await;
    let jobs = ScrapeJobRepositoryImpl::new(db.clone());
    let profiles = ProfileRecordRepositoryImpl::new(db);
    let job = started_job(&jobs).await;

    let mut original = record(job.id, 1);
    original.company = Some("Old Brokerage".to_string());
    original.email = Some("agent1@old.example".to_string());
    profiles.persist_batch(job.id, &[original]).await.unwrap();

    let mut newer = record(job.id, 1);
    newer.company = Some("Summit Realty Group".to_string());
    newer.email = None;
    profiles.persist_batch(job.id, &[newer]).await.unwrap();

    let stored = profiles.find_by_job(job.id).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].company.as_deref(), Some("Summit Realty Group"));
    // Fields missing from the newer scrape keep their previous value
    assert_eq!(stored[0].email.as_deref(), Some("agent1@old.example"));
}

#[tokio::test]
async fn test_each_flush_advances_updated_at() {
    let db = test_db().await;
    let jobs = ScrapeJobRepositoryImpl::new(db.clone());
    let profiles = ProfileRecordRepositoryImpl::new(db);
    let job = started_job(&jobs).await;

    let mut last = job.updated_at;
    for chunk in 0..3 {
        let batch: Vec<_> = (chunk * 5..chunk * 5 + 5)
            .map(|n| record(job.id, n))
            .collect();
        profiles.persist_batch(job.id, &batch).await.unwrap();

        let stored = jobs.find_by_id(job.id).await.unwrap().unwrap();
        assert!(stored.updated_at > last);
        last = stored.updated_at;
    }
}

#[tokio::test]
async fn test_terminal_status_never_regresses() {
    let db = test_db().await;
    let jobs = Arc::new(ScrapeJobRepositoryImpl::new(db));
    let tracker = JobTracker::new(jobs.clone());
    let job = started_job(&jobs).await;

    tracker.mark_completed(job.id, 0).await.unwrap();

    let err = tracker.mark_failed(job.id, "late failure").await.unwrap_err();
    assert!(matches!(
        err,
        RepositoryError::StatusConflict {
            expected: JobStatus::InProgress,
            ..
        }
    ));
    let err = tracker.mark_in_progress(job.id).await.unwrap_err();
    assert!(matches!(err, RepositoryError::StatusConflict { .. }));

    let stored = jobs.find_by_id(job.id).await.unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Completed);
    assert!(stored.error_message.is_none());
}

#[tokio::test]
async fn test_stale_jobs_are_only_the_silent_ones() {
    let db = test_db().await;
    let jobs = ScrapeJobRepositoryImpl::new(db);
    let job = started_job(&jobs).await;

    let cutoff = (Utc::now() - Duration::minutes(15)).into();
    assert!(jobs.find_stale(cutoff).await.unwrap().is_empty());

    let future_cutoff = (Utc::now() + Duration::minutes(1)).into();
    let stale = jobs.find_stale(future_cutoff).await.unwrap();
    assert_eq!(stale.len(), 1);
    assert_eq!(stale[0].id, job.id);
}

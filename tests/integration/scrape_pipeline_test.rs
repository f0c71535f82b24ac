// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::helpers::target_site::{spawn_site, SiteState, TargetSite};
use crate::helpers::test_db;
use leadcrawl::config::settings::Settings;
use leadcrawl::domain::models::scrape_job::{JobStatus, ScrapeJob};
use leadcrawl::domain::models::site_profile::SiteProfile;
use leadcrawl::domain::repositories::profile_record_repository::ProfileRecordRepository;
use leadcrawl::domain::repositories::scrape_job_repository::ScrapeJobRepository;
use leadcrawl::engines::http_fetcher::HttpFetcher;
use leadcrawl::engines::router::FetcherChain;
use leadcrawl::engines::stealth::HumanPacer;
use leadcrawl::infrastructure::repositories::profile_record_repo_impl::ProfileRecordRepositoryImpl;
use leadcrawl::infrastructure::repositories::scrape_job_repo_impl::ScrapeJobRepositoryImpl;
use leadcrawl::workers::scrape_worker::{JobError, ScrapeWorker};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    worker: ScrapeWorker<ScrapeJobRepositoryImpl, ProfileRecordRepositoryImpl>,
    jobs: Arc<ScrapeJobRepositoryImpl>,
    profiles: Arc<ProfileRecordRepositoryImpl>,
}

async fn harness(threshold: usize) -> Harness {
    let db = test_db().await;
    let jobs = Arc::new(ScrapeJobRepositoryImpl::new(db.clone()));
    let profiles = Arc::new(ProfileRecordRepositoryImpl::new(db));

    let mut settings = Settings::defaults().unwrap().scraper;
    settings.batch_threshold = threshold;
    settings.request_timeout_secs = 5;

    let http = HttpFetcher::new(None, "en-US").unwrap();
    let chain = FetcherChain::new(vec![Arc::new(http)]);

    let worker = ScrapeWorker::new(
        jobs.clone(),
        profiles.clone(),
        Arc::new(chain),
        settings,
        SiteProfile::realtor(),
    )
    .with_pacer(HumanPacer::disabled());

    Harness {
        worker,
        jobs,
        profiles,
    }
}

async fn create_job(jobs: &ScrapeJobRepositoryImpl, site: &TargetSite) -> ScrapeJob {
    jobs.create(&ScrapeJob::new(site.listing_url(), "realtor".to_string()))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_paginated_directory_is_scraped_end_to_end() {
    let site = spawn_site(SiteState {
        agents: 45,
        ..Default::default()
    })
    .await;
    let h = harness(20).await;
    let job = create_job(&h.jobs, &site).await;

    let summary = h.worker.run_job(job.clone()).await.unwrap();

    assert_eq!(summary.listing_pages, 3);
    assert_eq!(summary.links_found, 45);
    assert_eq!(summary.extracted, 45);
    assert_eq!(summary.batches, 3);
    assert_eq!(summary.leads_found, 45);

    let stored = h.jobs.find_by_id(job.id).await.unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Completed);
    assert_eq!(stored.leads_found, 45);
    assert!(stored.error_message.is_none());
    assert!(stored.updated_at > stored.created_at);

    assert_eq!(h.profiles.count_by_job(job.id).await.unwrap(), 45);
    assert_eq!(site.profile_hits(), 45);
}

#[tokio::test]
async fn test_profile_fields_are_extracted() {
    let site = spawn_site(SiteState {
        agents: 3,
        ..Default::default()
    })
    .await;
    let h = harness(20).await;
    let job = create_job(&h.jobs, &site).await;

    h.worker.run_job(job.clone()).await.unwrap();

    let profiles = h.profiles.find_by_job(job.id).await.unwrap();
    let agent = profiles
        .iter()
        .find(|p| p.profile_url == site.profile_url(2))
        .expect("agent 2 persisted");

    assert_eq!(agent.full_name, "Casey Agent2");
    assert_eq!(agent.first_name.as_deref(), Some("Casey"));
    assert_eq!(agent.last_name.as_deref(), Some("Agent2"));
    assert_eq!(agent.company.as_deref(), Some("Summit Realty Group"));
    assert_eq!(agent.city.as_deref(), Some("Seattle"));
    assert_eq!(agent.state.as_deref(), Some("WA"));
    // tel: link wins over the office number in body text
    assert_eq!(agent.phone.as_deref(), Some("+12065550002"));
    assert_eq!(agent.phones, vec!["+12065550002".to_string()]);
    assert_eq!(agent.email.as_deref(), Some("agent2@summitrealty.example"));
    assert_eq!(agent.years_experience, Some(5));
    assert_eq!(agent.deals_closed, Some(30));
    assert_eq!(agent.source_site, "realtor");
}

#[tokio::test]
async fn test_requests_carry_browser_user_agent() {
    let site = spawn_site(SiteState {
        agents: 2,
        ..Default::default()
    })
    .await;
    let h = harness(20).await;
    let job = create_job(&h.jobs, &site).await;

    h.worker.run_job(job).await.unwrap();

    let agents = site.state.user_agents.lock().clone();
    assert_eq!(agents.len(), 3);
    assert!(agents.iter().all(|ua| ua.starts_with("Mozilla/5.0")));
}

#[tokio::test]
async fn test_block_page_fails_job_and_keeps_collected_profiles() {
    let site = spawn_site(SiteState {
        agents: 30,
        block_after: Some(12),
        ..Default::default()
    })
    .await;
    let h = harness(10).await;
    let job = create_job(&h.jobs, &site).await;

    let err = h.worker.run_job(job.clone()).await.unwrap_err();
    assert!(matches!(err, JobError::Blocked { .. }));

    let stored = h.jobs.find_by_id(job.id).await.unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Failed);
    assert!(stored.error_message.unwrap().contains("blocked"));

    // Twelve pages made it through before the wall; nothing after it was requested
    assert_eq!(h.profiles.count_by_job(job.id).await.unwrap(), 12);
    assert_eq!(site.profile_hits(), 13);
}

#[tokio::test]
async fn test_server_errors_on_profiles_are_skipped() {
    let site = spawn_site(SiteState {
        agents: 6,
        broken: vec![1, 4],
        ..Default::default()
    })
    .await;
    let h = harness(20).await;
    let job = create_job(&h.jobs, &site).await;

    let summary = h.worker.run_job(job.clone()).await.unwrap();

    assert_eq!(summary.fetch_failures, 2);
    assert_eq!(summary.leads_found, 4);
    let urls: Vec<String> = h
        .profiles
        .find_by_job(job.id)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.profile_url)
        .collect();
    assert!(!urls.contains(&site.profile_url(1)));
    assert!(!urls.contains(&site.profile_url(4)));
}

#[tokio::test]
async fn test_unreachable_target_fails_job() {
    let h = harness(20).await;
    let job = h
        .jobs
        .create(&ScrapeJob::new(
            "http://127.0.0.1:9/realestateagents/seattle_wa".to_string(),
            "realtor".to_string(),
        ))
        .await
        .unwrap();

    let err = h.worker.run_job(job.clone()).await.unwrap_err();
    assert!(matches!(err, JobError::ListingUnavailable { .. }));

    let stored = h.jobs.find_by_id(job.id).await.unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Failed);
    assert_eq!(stored.leads_found, 0);
}

#[tokio::test]
async fn test_interrupted_job_resumes_without_duplicates() {
    let site = spawn_site(SiteState {
        agents: 45,
        stall_after: Mutex::new(Some(25)),
        ..Default::default()
    })
    .await;
    let h = harness(20).await;
    let job = create_job(&h.jobs, &site).await;

    // The 26th profile hangs; drop the run there as a crash would
    let cut = tokio::time::timeout(Duration::from_secs(2), h.worker.run_job(job.clone())).await;
    assert!(cut.is_err());

    let orphaned = h.jobs.find_by_id(job.id).await.unwrap().unwrap();
    assert_eq!(orphaned.status, JobStatus::InProgress);
    assert_eq!(h.profiles.count_by_job(job.id).await.unwrap(), 20);

    *site.state.stall_after.lock() = None;
    let reclaimed = h.worker.reclaim_orphaned().await.unwrap();
    assert_eq!(reclaimed.len(), 1);
    assert_eq!(reclaimed[0].id, job.id);
    assert_eq!(h.worker.resume_jobs(reclaimed).await, 1);

    let stored = h.jobs.find_by_id(job.id).await.unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Completed);
    assert_eq!(stored.leads_found, 45);

    let urls: HashSet<String> = h
        .profiles
        .find_by_job(job.id)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.profile_url)
        .collect();
    assert_eq!(urls.len(), 45);
    assert_eq!(h.profiles.count_by_job(job.id).await.unwrap(), 45);
}

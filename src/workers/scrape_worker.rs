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

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Duration;
use metrics::counter;
use serde::Serialize;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::config::settings::ScraperSettings;
use crate::domain::models::scrape_job::{JobStatus, ScrapeJob};
use crate::domain::models::site_profile::{SiteProfile, SiteProfileError};
use crate::domain::repositories::profile_record_repository::ProfileRecordRepository;
use crate::domain::repositories::scrape_job_repository::{RepositoryError, ScrapeJobRepository};
use crate::domain::services::block_detector::{BlockDetector, BlockSignal};
use crate::domain::services::field_extractor::FieldExtractor;
use crate::domain::services::link_collector::ProfileLinkCollector;
use crate::engines::stealth::HumanPacer;
use crate::engines::traits::{FetchError, FetchRequest, FetchedPage, PageFetcher};
use crate::infrastructure::metrics::{FETCH_FAILURES, PROFILES_EXTRACTED, PROFILES_SKIPPED};
use crate::utils::retry_policy::RetryPolicy;
use crate::workers::batch_accumulator::{BatchAccumulator, FlushError};
use crate::workers::job_tracker::JobTracker;

/// 每处理这么多个档案页发送一次心跳
const HEARTBEAT_EVERY: usize = 10;

/// 作业运行错误
#[derive(Error, Debug)]
pub enum JobError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    SiteProfile(#[from] SiteProfileError),
    #[error("Invalid target URL {0}")]
    InvalidTargetUrl(String),
    #[error("Listing page {url} unavailable: {source}")]
    ListingUnavailable {
        url: String,
        #[source]
        source: FetchError,
    },
    #[error("{signal} at {url}")]
    Blocked { url: String, signal: BlockSignal },
    #[error(transparent)]
    Flush(#[from] FlushError),
    #[error("All {attempted} profile fetches failed")]
    NothingFetched { attempted: usize },
}

/// 一次作业运行的统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobSummary {
    /// 抓取过的列表页数
    pub listing_pages: u32,
    /// 发现的不同档案URL数
    pub links_found: usize,
    /// 成功获取的档案页数
    pub fetched: usize,
    /// 获取失败的档案页数
    pub fetch_failures: usize,
    /// 提取出的档案数
    pub extracted: usize,
    /// 因缺少姓名被丢弃的档案页数
    pub skipped: usize,
    /// 落库批次数
    pub batches: u32,
    /// 作业下持久化的档案总数
    pub leads_found: i64,
}

/// 抓取工作器
///
/// 一次只运行一个作业；同一作业内的请求严格串行，
/// 每次请求前按人工节奏随机等待。
pub struct ScrapeWorker<R, P>
where
    R: ScrapeJobRepository + 'static,
    P: ProfileRecordRepository + 'static,
{
    jobs: Arc<R>,
    profiles: Arc<P>,
    tracker: JobTracker<R>,
    fetcher: Arc<dyn PageFetcher>,
    settings: ScraperSettings,
    default_profile: SiteProfile,
    pacer: HumanPacer,
    flush_retry: RetryPolicy,
}

impl<R, P> ScrapeWorker<R, P>
where
    R: ScrapeJobRepository + 'static,
    P: ProfileRecordRepository + 'static,
{
    /// 创建新的抓取工作器实例
    ///
    /// # 参数
    ///
    /// * `jobs` - 作业仓库
    /// * `profiles` - 档案仓库
    /// * `fetcher` - 页面获取器（通常是传输回退链）
    /// * `settings` - 抓取配置
    /// * `default_profile` - `settings.site` 对应的站点配置
    pub fn new(
        jobs: Arc<R>,
        profiles: Arc<P>,
        fetcher: Arc<dyn PageFetcher>,
        settings: ScraperSettings,
        default_profile: SiteProfile,
    ) -> Self {
        let pacer = HumanPacer::new(
            Duration::from_millis(settings.min_delay_ms),
            Duration::from_millis(settings.max_delay_ms),
        );
        Self {
            tracker: JobTracker::new(jobs.clone()),
            jobs,
            profiles,
            fetcher,
            settings,
            default_profile,
            pacer,
            flush_retry: RetryPolicy::flush(),
        }
    }

    pub fn with_pacer(mut self, pacer: HumanPacer) -> Self {
        self.pacer = pacer;
        self
    }

    pub fn with_flush_retry(mut self, policy: RetryPolicy) -> Self {
        self.flush_retry = policy;
        self
    }

    /// 运行抓取工作器
    ///
    /// 按轮询间隔领取待处理作业，逐个执行。
    pub async fn run(&self) {
        info!(
            "Scrape worker started, polling every {}s",
            self.settings.poll_interval_secs
        );

        loop {
            match self.run_next().await {
                Ok(true) => {}
                Ok(false) => sleep(self.settings.poll_interval()).await,
                Err(e) => {
                    error!("Error polling for jobs: {}", e);
                    sleep(self.settings.poll_interval()).await;
                }
            }
        }
    }

    /// 领取并执行一个待处理作业，没有作业时返回 `false`
    pub async fn run_next(&self) -> Result<bool, RepositoryError> {
        let Some(job) = self.jobs.next_pending().await? else {
            return Ok(false);
        };

        // Other failures were already recorded on the job row
        if let Err(JobError::Repository(RepositoryError::StatusConflict { id, .. })) =
            self.run_job(job).await
        {
            debug!("Job {} was claimed elsewhere", id);
        }
        Ok(true)
    }

    /// 执行一个作业
    ///
    /// 认领作业后收集档案链接、逐个抓取提取并分批落库，
    /// 最后把作业标记为完成或失败。失败时已落库的数据保留。
    #[instrument(skip(self, job), fields(job_id = %job.id, target = %job.target_url))]
    pub async fn run_job(&self, job: ScrapeJob) -> Result<JobSummary, JobError> {
        let job = self.tracker.mark_in_progress(job.id).await?;
        let outcome = self.scrape(&job).await;
        self.finish(&job, outcome).await
    }

    /// 认领上一个进程遗留的进行中作业
    ///
    /// 只有一个抓取进程时，启动时仍处于 `in_progress` 的作业都属于已崩溃的运行。
    /// 认领时推进 `updated_at`，停滞清理不会在恢复前把它们判为失败。
    pub async fn reclaim_orphaned(&self) -> Result<Vec<ScrapeJob>, RepositoryError> {
        let orphaned = self.jobs.find_in_progress().await?;
        let mut reclaimed = Vec::with_capacity(orphaned.len());
        for job in orphaned {
            self.jobs.touch(job.id).await?;
            info!("Reclaimed interrupted job {}", job.id);
            reclaimed.push(job);
        }
        Ok(reclaimed)
    }

    /// 依次恢复被认领的作业，返回恢复的数量
    pub async fn resume_jobs(&self, jobs: Vec<ScrapeJob>) -> usize {
        let mut resumed = 0;
        for job in jobs {
            match self.resume_job(job).await {
                Ok(_) => resumed += 1,
                Err(JobError::Repository(RepositoryError::StatusConflict { id, .. })) => {
                    debug!("Job {} left in_progress before it could be resumed", id);
                }
                Err(_) => resumed += 1,
            }
        }
        resumed
    }

    /// 在同一作业ID下重新运行中断的作业
    ///
    /// 不做状态转换；已落库的档案按URL合并，重新发现时不会重复。
    #[instrument(skip(self, job), fields(job_id = %job.id, target = %job.target_url))]
    pub async fn resume_job(&self, job: ScrapeJob) -> Result<JobSummary, JobError> {
        let job = self
            .jobs
            .find_by_id(job.id)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        if job.status != JobStatus::InProgress {
            return Err(RepositoryError::StatusConflict {
                id: job.id,
                expected: JobStatus::InProgress,
            }
            .into());
        }

        info!(
            "Resuming job {} with {} profiles already stored",
            job.id, job.leads_found
        );
        let outcome = self.scrape(&job).await;
        self.finish(&job, outcome).await
    }

    async fn finish(
        &self,
        job: &ScrapeJob,
        outcome: Result<JobSummary, JobError>,
    ) -> Result<JobSummary, JobError> {
        match outcome {
            Ok(mut summary) => {
                let leads_found = self.profiles.count_by_job(job.id).await?;
                self.tracker.mark_completed(job.id, leads_found).await?;
                summary.leads_found = leads_found;
                info!(
                    "Job {} finished: {} links, {} extracted, {} skipped, {} fetch failures",
                    job.id,
                    summary.links_found,
                    summary.extracted,
                    summary.skipped,
                    summary.fetch_failures
                );
                Ok(summary)
            }
            Err(e) => {
                error!("Job {} aborted: {}", job.id, e);
                if let Err(mark_err) = self.tracker.mark_failed(job.id, e.to_string()).await {
                    warn!("Could not mark job {} failed: {}", job.id, mark_err);
                }
                Err(e)
            }
        }
    }

    fn site_profile(&self, site: &str) -> Result<SiteProfile, SiteProfileError> {
        if site == self.default_profile.name {
            Ok(self.default_profile.clone())
        } else {
            SiteProfile::builtin(site)
        }
    }

    async fn scrape(&self, job: &ScrapeJob) -> Result<JobSummary, JobError> {
        let profile = self.site_profile(&job.site)?;
        let collector = ProfileLinkCollector::new(&profile)?;
        let extractor = FieldExtractor::new(&profile);
        let detector = BlockDetector::new(&profile);
        let start_url = Url::parse(&job.target_url)
            .map_err(|_| JobError::InvalidTargetUrl(job.target_url.clone()))?;

        let mut summary = JobSummary::default();
        let links = self
            .collect_links(&collector, &detector, start_url, &mut summary)
            .await?;
        summary.links_found = links.len();
        if links.is_empty() {
            warn!(
                "No profile links found on {}; the listing layout may have changed",
                job.target_url
            );
        }

        let mut accumulator =
            BatchAccumulator::new(self.profiles.clone(), job.id, self.settings.batch_threshold)
                .with_retry_policy(self.flush_retry.clone());

        for (index, url) in links.into_iter().enumerate() {
            if index > 0 && index % HEARTBEAT_EVERY == 0 {
                self.heartbeat(job).await;
            }
            self.pacer.pause().await;

            let page = match self.fetch(&url).await {
                Ok(page) => page,
                Err(e) => {
                    warn!("Skipping {}: {}", url, e);
                    counter!(FETCH_FAILURES).increment(1);
                    summary.fetch_failures += 1;
                    continue;
                }
            };
            summary.fetched += 1;

            if let Some(signal) = detector.detect(&page.html) {
                // Keep what was scraped before the wall
                if let Err(flush_err) = accumulator.finish().await {
                    warn!("Could not flush before aborting: {}", flush_err);
                }
                return Err(JobError::Blocked { url, signal });
            }

            match extractor
                .extract(&page.html)
                .into_record(job.id, url.clone(), &profile.name)
            {
                Some(record) => {
                    counter!(PROFILES_EXTRACTED).increment(1);
                    summary.extracted += 1;
                    accumulator.add(record).await?;
                }
                None => {
                    warn!("No agent name on {}, skipping", url);
                    counter!(PROFILES_SKIPPED).increment(1);
                    summary.skipped += 1;
                }
            }
        }

        accumulator.finish().await?;
        summary.batches = accumulator.flushed_batches();

        if summary.links_found > 0 && summary.fetched == 0 {
            return Err(JobError::NothingFetched {
                attempted: summary.links_found,
            });
        }
        Ok(summary)
    }

    /// 推进作业的 `updated_at`，让长时间没有落库的运行不被判为停滞
    async fn heartbeat(&self, job: &ScrapeJob) {
        if let Err(e) = self.jobs.touch(job.id).await {
            warn!("Heartbeat for job {} failed: {}", job.id, e);
        }
    }

    /// 收集所有列表页中的档案链接
    ///
    /// 第一页获取失败即作业失败；后续页面失败只结束翻页。
    async fn collect_links(
        &self,
        collector: &ProfileLinkCollector,
        detector: &BlockDetector,
        start_url: Url,
        summary: &mut JobSummary,
    ) -> Result<Vec<String>, JobError> {
        let mut links = BTreeSet::new();
        let mut visited = HashSet::new();
        let mut page_url = start_url;

        for page_no in 1..=self.settings.max_listing_pages.max(1) {
            if !visited.insert(page_url.to_string()) {
                break;
            }
            if page_no > 1 {
                self.pacer.pause().await;
            }

            let page = match self.fetch(page_url.as_str()).await {
                Ok(page) => page,
                Err(e) if page_no == 1 => {
                    return Err(JobError::ListingUnavailable {
                        url: page_url.to_string(),
                        source: e,
                    });
                }
                Err(e) => {
                    warn!("Stopping pagination at {}: {}", page_url, e);
                    break;
                }
            };
            summary.listing_pages += 1;

            if let Some(signal) = detector.detect(&page.html) {
                return Err(JobError::Blocked {
                    url: page_url.to_string(),
                    signal,
                });
            }

            let base = Url::parse(&page.url).unwrap_or_else(|_| page_url.clone());
            let found = collector.collect(&page.html, &base);
            info!("Listing page {} yielded {} profile links", page_no, found.len());
            links.extend(found);

            match collector.next_page(&page.html, &base) {
                Some(next) => page_url = next,
                None => break,
            }
        }

        Ok(links.into_iter().collect())
    }

    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let request = FetchRequest::new(url, self.settings.request_timeout());
        self.fetcher.fetch(&request).await
    }
}

#[cfg(test)]
#[path = "scrape_worker_test.rs"]
mod tests;

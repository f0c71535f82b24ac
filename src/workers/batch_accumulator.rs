// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::profile_record::ProfileRecord;
use crate::domain::repositories::profile_record_repository::{BatchOutcome, ProfileStore};
use crate::domain::repositories::scrape_job_repository::RepositoryError;
use crate::infrastructure::metrics::{BATCH_FLUSHES, BATCH_FLUSH_FAILURES, BUFFERED_PROFILES};
use crate::utils::retry_policy::RetryPolicy;
use metrics::{counter, gauge};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 批量落库失败
///
/// 重试用尽后返回，缓冲区中的档案保持不变。
#[derive(Error, Debug)]
#[error("Failed to flush {records} profiles after {attempts} attempts: {source}")]
pub struct FlushError {
    pub records: usize,
    pub attempts: u32,
    #[source]
    pub source: RepositoryError,
}

/// 批量累积器
///
/// 在内存中缓存已提取的档案，达到阈值时整批落库。
/// 进程崩溃最多丢失一个未满批次的数据。
pub struct BatchAccumulator<S>
where
    S: ProfileStore + 'static,
{
    store: Arc<S>,
    job_id: Uuid,
    threshold: usize,
    buffer: Vec<ProfileRecord>,
    flushed_batches: u32,
    retry_policy: RetryPolicy,
}

impl<S> BatchAccumulator<S>
where
    S: ProfileStore + 'static,
{
    /// 创建累积器
    ///
    /// # 参数
    ///
    /// * `store` - 档案存储
    /// * `job_id` - 所属作业
    /// * `threshold` - 触发落库的缓冲数量，小于1时按1处理
    pub fn new(store: Arc<S>, job_id: Uuid, threshold: usize) -> Self {
        let threshold = threshold.max(1);
        Self {
            store,
            job_id,
            threshold,
            buffer: Vec::with_capacity(threshold),
            flushed_batches: 0,
            retry_policy: RetryPolicy::flush(),
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// 缓冲中尚未落库的档案数
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// 已成功落库的批次数
    pub fn flushed_batches(&self) -> u32 {
        self.flushed_batches
    }

    /// 加入一条档案，缓冲达到阈值时立即落库
    pub async fn add(&mut self, record: ProfileRecord) -> Result<Option<BatchOutcome>, FlushError> {
        self.buffer.push(record);
        gauge!(BUFFERED_PROFILES).set(self.buffer.len() as f64);

        if self.buffer.len() >= self.threshold {
            self.flush().await
        } else {
            Ok(None)
        }
    }

    /// 落库当前缓冲
    ///
    /// 缓冲为空时不访问存储。失败按重试策略重试，全部失败时保留缓冲。
    pub async fn flush(&mut self) -> Result<Option<BatchOutcome>, FlushError> {
        if self.buffer.is_empty() {
            return Ok(None);
        }

        let mut retries = 0;
        loop {
            match self.store.persist_batch(self.job_id, &self.buffer).await {
                Ok(outcome) => {
                    self.flushed_batches += 1;
                    info!(
                        "Flushed batch {} for job {}: {} profiles ({} new, {} updated), {} total",
                        self.flushed_batches,
                        self.job_id,
                        self.buffer.len(),
                        outcome.inserted,
                        outcome.updated,
                        outcome.leads_found
                    );
                    self.buffer.clear();
                    counter!(BATCH_FLUSHES).increment(1);
                    gauge!(BUFFERED_PROFILES).set(0.0);
                    return Ok(Some(outcome));
                }
                Err(e) => {
                    counter!(BATCH_FLUSH_FAILURES).increment(1);
                    if !self.retry_policy.should_retry(retries) {
                        return Err(FlushError {
                            records: self.buffer.len(),
                            attempts: retries + 1,
                            source: e,
                        });
                    }
                    retries += 1;
                    let backoff = self.retry_policy.calculate_backoff(retries);
                    warn!(
                        "Flush for job {} failed: {}; retrying in {}ms",
                        self.job_id,
                        e,
                        backoff.as_millis()
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    /// 作业结束时落库剩余的部分批次
    pub async fn finish(&mut self) -> Result<Option<BatchOutcome>, FlushError> {
        debug!(
            "Finishing accumulator for job {} with {} buffered",
            self.job_id,
            self.buffer.len()
        );
        self.flush().await
    }
}

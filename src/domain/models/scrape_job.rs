// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Duration, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// 抓取作业实体
///
/// 表示一次抓取运行。作业由调用方创建，由抓取进程推进状态，
/// 并在每次批量落库后刷新 `updated_at`，外部监控据此判断进程是否存活。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeJob {
    /// 作业唯一标识符
    pub id: Uuid,
    /// 目标列表页URL
    pub target_url: String,
    /// 站点配置名称
    pub site: String,
    /// 作业状态
    pub status: JobStatus,
    /// 创建时间
    pub created_at: DateTime<FixedOffset>,
    /// 最后更新时间，每次落库都会推进
    pub updated_at: DateTime<FixedOffset>,
    /// 失败原因
    pub error_message: Option<String>,
    /// 已持久化的不同档案URL数量
    pub leads_found: i64,
}

/// 作业状态枚举
///
/// 状态转换是单调的：
/// Pending → InProgress → Completed/Failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// 已创建，尚未开始
    #[default]
    Pending,
    /// 正在抓取
    InProgress,
    /// 成功完成
    Completed,
    /// 已失败
    Failed,
}

impl JobStatus {
    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// 判断是否允许从当前状态转换到目标状态
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::InProgress)
                | (JobStatus::InProgress, JobStatus::Completed)
                | (JobStatus::InProgress, JobStatus::Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::InProgress => write!(f, "in_progress"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for JobStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "in_progress" => Ok(JobStatus::InProgress),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            _ => Err(()),
        }
    }
}

/// 领域错误类型
#[derive(Error, Debug, PartialEq)]
pub enum DomainError {
    /// 无效的状态转换
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: JobStatus, to: JobStatus },
}

impl ScrapeJob {
    /// 创建一个新的待处理作业
    pub fn new(target_url: String, site: String) -> Self {
        let now: DateTime<FixedOffset> = Utc::now().into();
        Self {
            id: Uuid::new_v4(),
            target_url,
            site,
            status: JobStatus::Pending,
            created_at: now,
            updated_at: now,
            error_message: None,
            leads_found: 0,
        }
    }

    fn transition(&mut self, next: JobStatus) -> Result<(), DomainError> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidStateTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.touch();
        Ok(())
    }

    /// 开始作业
    pub fn start(mut self) -> Result<Self, DomainError> {
        self.transition(JobStatus::InProgress)?;
        Ok(self)
    }

    /// 完成作业并记录档案数
    pub fn complete(mut self, leads_found: i64) -> Result<Self, DomainError> {
        self.transition(JobStatus::Completed)?;
        self.leads_found = leads_found;
        Ok(self)
    }

    /// 标记作业失败
    pub fn fail(mut self, error: impl Into<String>) -> Result<Self, DomainError> {
        self.transition(JobStatus::Failed)?;
        self.error_message = Some(error.into());
        Ok(self)
    }

    /// 推进最后更新时间
    pub fn touch(&mut self) {
        self.updated_at = next_timestamp(self.updated_at);
    }
}

/// 计算严格晚于 `previous` 的时间戳
///
/// 时钟回拨或同一毫秒内的多次写入都不能让 `updated_at` 停滞。
pub fn next_timestamp(previous: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    let now: DateTime<FixedOffset> = Utc::now().into();
    let floor = previous + Duration::milliseconds(1);
    if now >= floor {
        now
    } else {
        floor
    }
}

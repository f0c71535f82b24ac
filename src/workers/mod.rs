// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工作器模块
///
/// - 批量累积（batch_accumulator）：档案缓冲与阈值落库
/// - 作业跟踪（job_tracker）：作业状态的条件更新
/// - 抓取工作器（scrape_worker）：作业执行与轮询
/// - 停滞清理（stale_job_worker）：标记长时间无进度的作业
pub mod batch_accumulator;
pub mod job_tracker;
pub mod scrape_worker;
pub mod stale_job_worker;

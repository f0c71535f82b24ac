// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库接口模块
///
/// 领域层只依赖这里的抽象契约，具体实现由基础设施层提供：
/// - 抓取作业仓库（scrape_job_repository）
/// - 档案记录仓库（profile_record_repository）
pub mod profile_record_repository;
pub mod scrape_job_repository;

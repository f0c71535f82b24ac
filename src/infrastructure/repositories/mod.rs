// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库实现模块
///
/// 领域仓库接口基于SeaORM的具体实现
pub mod profile_record_repo_impl;
pub mod scrape_job_repo_impl;

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// - 抓取作业（scrape_job）：一次目录抓取运行及其状态机
/// - 档案记录（profile_record）：抓取到的经纪人档案
/// - 站点配置（site_profile）：目标站点的选择器和路径约定
pub mod profile_record;
pub mod scrape_job;
pub mod site_profile;

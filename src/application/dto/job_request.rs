// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// 创建抓取作业请求
#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct CreateJobRequestDto {
    /// 列表页URL
    #[validate(url)]
    pub target_url: String,
    /// 站点配置名称，缺省使用服务配置的站点
    #[validate(length(min = 1, max = 64))]
    pub site: Option<String>,
}

/// 运维手动终止作业请求
#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct FailJobRequestDto {
    #[validate(length(min = 1, max = 2000))]
    pub reason: String,
}

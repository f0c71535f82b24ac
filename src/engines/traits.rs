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

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// 页面获取错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// 超时
    #[error("Timeout")]
    Timeout,
    /// 非 2xx 状态码
    #[error("Unexpected HTTP status {0}")]
    Status(u16),
    /// 连接失败
    #[error("Connection failed: {0}")]
    Connection(String),
    /// 浏览器启动、连接或导航失败
    #[error("Browser error: {0}")]
    Browser(String),
    /// URL 无法解析
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    /// 所有传输方式都失败
    #[error("All transports failed: {}", format_failures(.0))]
    AllTransportsFailed(Vec<(String, String)>),
}

fn format_failures(failures: &[(String, String)]) -> String {
    failures
        .iter()
        .map(|(name, message)| format!("{name}: {message}"))
        .collect::<Vec<_>>()
        .join("; ")
}

impl FetchError {
    /// 判断是否应尝试下一个传输方式
    ///
    /// URL 本身无效时换传输方式也无济于事。
    pub fn allows_fallback(&self) -> bool {
        !matches!(self, FetchError::InvalidUrl(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if let Some(status) = e.status() {
            FetchError::Status(status.as_u16())
        } else if e.is_builder() {
            FetchError::InvalidUrl(e.to_string())
        } else {
            FetchError::Connection(e.to_string())
        }
    }
}

/// 页面获取请求
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// 目标URL
    pub url: String,
    /// 额外请求头
    pub headers: HashMap<String, String>,
    /// 超时时间
    pub timeout: Duration,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            headers: HashMap::new(),
            timeout,
        }
    }
}

/// 获取到的页面
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// 最终URL
    pub url: String,
    /// HTTP状态码，浏览器传输固定为 200
    pub status_code: u16,
    /// 页面HTML
    pub html: String,
    /// 实际使用的传输方式
    pub transport: &'static str,
    /// 耗时（毫秒）
    pub elapsed_ms: u64,
}

/// 页面获取特质
///
/// 给定URL返回完整渲染后的HTML。
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// 获取页面
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchedPage, FetchError>;

    /// 传输方式名称
    fn name(&self) -> &'static str;
}

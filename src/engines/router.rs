// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::TransportSettings;
use crate::engines::browser_fetcher::BrowserFetcher;
use crate::engines::http_fetcher::HttpFetcher;
use crate::engines::traits::{FetchError, FetchRequest, FetchedPage, PageFetcher};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 传输回退链
///
/// 按配置顺序依次尝试每个传输方式，返回第一个成功的结果。
/// 回退顺序和失败条件都集中在这里。
pub struct FetcherChain {
    fetchers: Vec<Arc<dyn PageFetcher>>,
}

impl FetcherChain {
    /// 创建回退链
    ///
    /// # 参数
    ///
    /// * `fetchers` - 按优先级排列的传输方式
    pub fn new(fetchers: Vec<Arc<dyn PageFetcher>>) -> Self {
        Self { fetchers }
    }

    /// 根据传输配置构建回退链
    ///
    /// - 配置了远程浏览器端点：远程浏览器 → HTTP
    /// - 否则启用了本地浏览器：本地浏览器 → HTTP
    /// - 否则只用 HTTP
    ///
    /// 配置了代理时 HTTP 传输经过代理。
    pub fn from_settings(settings: &TransportSettings) -> Result<Self, FetchError> {
        let mut fetchers: Vec<Arc<dyn PageFetcher>> = Vec::new();

        let remote = settings
            .remote_browser_ws
            .as_deref()
            .map(str::trim)
            .filter(|ws| !ws.is_empty());

        if let Some(ws_url) = remote {
            fetchers.push(Arc::new(BrowserFetcher::remote(ws_url, &settings.locale)));
        } else if settings.local_browser {
            fetchers.push(Arc::new(BrowserFetcher::local(
                settings.chrome_executable.clone(),
                (settings.viewport_width, settings.viewport_height),
                &settings.locale,
            )));
        }

        let proxy = settings
            .proxy_url
            .as_deref()
            .map(str::trim)
            .filter(|proxy| !proxy.is_empty());
        fetchers.push(Arc::new(HttpFetcher::new(proxy, &settings.locale)?));

        let chain = Self::new(fetchers);
        info!("Transport chain: {}", chain.names().join(" -> "));
        Ok(chain)
    }

    /// 回退链中的传输方式名称
    pub fn names(&self) -> Vec<&'static str> {
        self.fetchers.iter().map(|f| f.name()).collect()
    }
}

#[async_trait]
impl PageFetcher for FetcherChain {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchedPage, FetchError> {
        let mut failures = Vec::new();

        for fetcher in &self.fetchers {
            match fetcher.fetch(request).await {
                Ok(page) => {
                    debug!(
                        "{} fetched {} in {}ms",
                        fetcher.name(),
                        request.url,
                        page.elapsed_ms
                    );
                    return Ok(page);
                }
                Err(e) if !e.allows_fallback() => return Err(e),
                Err(e) => {
                    warn!("{} failed for {}: {}", fetcher.name(), request.url, e);
                    failures.push((fetcher.name().to_string(), e.to_string()));
                }
            }
        }

        Err(FetchError::AllTransportsFailed(failures))
    }

    fn name(&self) -> &'static str {
        "chain"
    }
}

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

use crate::engines::stealth::{default_headers, random_user_agent};
use crate::engines::traits::{FetchError, FetchRequest, FetchedPage, PageFetcher};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use std::collections::HashMap;
use std::time::Instant;
use tracing::debug;

/// HTTP 传输
///
/// 基于 reqwest 的普通 HTTP 获取，可选经过代理。同一实例内复用 Cookie，
/// 像一个真实浏览会话；每个请求轮换 User-Agent。
pub struct HttpFetcher {
    client: reqwest::Client,
    base_headers: HashMap<String, String>,
    proxied: bool,
}

impl HttpFetcher {
    /// 创建 HTTP 传输
    ///
    /// # 参数
    ///
    /// * `proxy_url` - 代理地址，`None` 表示直连
    /// * `locale` - 用于 `Accept-Language` 的区域设置
    ///
    /// # 返回值
    ///
    /// * `Ok(HttpFetcher)` - 创建成功
    /// * `Err(FetchError)` - 代理地址无效或客户端构建失败
    pub fn new(proxy_url: Option<&str>, locale: &str) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder()
            .cookie_store(true)
            .gzip(true)
            .brotli(true);

        if let Some(proxy_url) = proxy_url {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| FetchError::Connection(format!("Invalid proxy: {}", e)))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| FetchError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            base_headers: default_headers(locale),
            proxied: proxy_url.is_some(),
        })
    }

    fn headers_for(&self, request: &FetchRequest) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (k, v) in self.base_headers.iter().chain(request.headers.iter()) {
            if let (Ok(k), Ok(v)) = (
                HeaderName::from_bytes(k.as_bytes()),
                HeaderValue::from_str(v),
            ) {
                headers.insert(k, v);
            }
        }
        if !headers.contains_key(USER_AGENT) {
            headers.insert(USER_AGENT, HeaderValue::from_static(random_user_agent()));
        }
        headers
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchedPage, FetchError> {
        let url = url::Url::parse(&request.url)
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", request.url, e)))?;

        let start = Instant::now();
        let response = self
            .client
            .get(url)
            .headers(self.headers_for(request))
            .timeout(request.timeout)
            .send()
            .await?;

        let status_code = response.status().as_u16();
        if !response.status().is_success() {
            debug!("{} answered {} for {}", self.name(), status_code, request.url);
            return Err(FetchError::Status(status_code));
        }

        let final_url = response.url().to_string();
        let html = response.text().await?;

        Ok(FetchedPage {
            url: final_url,
            status_code,
            html,
            transport: self.name(),
            elapsed_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn name(&self) -> &'static str {
        if self.proxied {
            "http_proxy"
        } else {
            "http"
        }
    }
}

#[cfg(test)]
#[path = "http_fetcher_test.rs"]
mod tests;

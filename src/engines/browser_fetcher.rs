// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::engines::stealth::{default_headers, random_user_agent, NAVIGATOR_MASK_SCRIPT};
use crate::engines::traits::{FetchError, FetchRequest, FetchedPage, PageFetcher};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::{Headers, SetExtraHttpHeadersParams};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// 浏览器来源
#[derive(Debug, Clone)]
pub enum BrowserMode {
    /// 本地启动 Chrome
    Local {
        chrome_executable: Option<String>,
        viewport: (u32, u32),
        locale: String,
    },
    /// 连接远程托管浏览器的 WebSocket 端点
    Remote { ws_url: String, locale: String },
}

impl BrowserMode {
    fn locale(&self) -> &str {
        match self {
            BrowserMode::Local { locale, .. } | BrowserMode::Remote { locale, .. } => locale,
        }
    }
}

struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

/// 浏览器传输
///
/// 基于 chromiumoxide 的浏览器自动化获取。浏览器在第一次请求时才启动或连接，
/// 之后由该实例复用；每个页面在导航前注入 User-Agent、请求头和掩盖脚本。
pub struct BrowserFetcher {
    mode: BrowserMode,
    session: OnceCell<BrowserSession>,
}

impl BrowserFetcher {
    pub fn new(mode: BrowserMode) -> Self {
        Self {
            mode,
            session: OnceCell::new(),
        }
    }

    pub fn local(chrome_executable: Option<String>, viewport: (u32, u32), locale: &str) -> Self {
        Self::new(BrowserMode::Local {
            chrome_executable,
            viewport,
            locale: locale.to_string(),
        })
    }

    pub fn remote(ws_url: &str, locale: &str) -> Self {
        Self::new(BrowserMode::Remote {
            ws_url: ws_url.to_string(),
            locale: locale.to_string(),
        })
    }

    async fn browser(&self) -> Result<&Browser, FetchError> {
        let session = self
            .session
            .get_or_try_init(|| async { self.open().await })
            .await?;
        Ok(&session.browser)
    }

    async fn open(&self) -> Result<BrowserSession, FetchError> {
        let (browser, mut handler) = match &self.mode {
            BrowserMode::Remote { ws_url, .. } => {
                info!("Connecting to remote browser at {}", ws_url);
                Browser::connect(ws_url.as_str())
                    .await
                    .map_err(|e| FetchError::Browser(format!("remote connect failed: {}", e)))?
            }
            BrowserMode::Local {
                chrome_executable,
                viewport,
                locale,
            } => {
                let mut builder = BrowserConfig::builder()
                    .no_sandbox()
                    .window_size(viewport.0, viewport.1)
                    .arg(format!("--lang={}", locale))
                    .arg("--disable-blink-features=AutomationControlled")
                    .arg("--disable-gpu")
                    .arg("--disable-dev-shm-usage");
                if let Some(path) = chrome_executable {
                    builder = builder.chrome_executable(path);
                }
                let config = builder.build().map_err(FetchError::Browser)?;
                info!("Launching local browser");
                Browser::launch(config)
                    .await
                    .map_err(|e| FetchError::Browser(format!("launch failed: {}", e)))?
            }
        };

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler stopped: {}", e);
                    break;
                }
            }
        });

        Ok(BrowserSession { browser, handler })
    }

    async fn prepare_page(&self, page: &Page, request: &FetchRequest) -> Result<(), FetchError> {
        page.set_user_agent(random_user_agent())
            .await
            .map_err(browser_err)?;

        let mut headers = default_headers(self.mode.locale());
        headers.extend(request.headers.clone());
        // Chrome sets these itself for navigations
        headers.retain(|name, _| !name.starts_with("Sec-Fetch"));
        let headers = serde_json::to_value(headers)
            .map_err(|e| FetchError::Browser(e.to_string()))?;
        page.execute(SetExtraHttpHeadersParams::new(Headers::new(headers)))
            .await
            .map_err(browser_err)?;

        page.evaluate_on_new_document(NAVIGATOR_MASK_SCRIPT)
            .await
            .map_err(browser_err)?;
        Ok(())
    }

    async fn render(&self, request: &FetchRequest) -> Result<RenderedPage, FetchError> {
        let browser = self.browser().await?;
        let page = browser.new_page("about:blank").await.map_err(browser_err)?;

        let result = async {
            self.prepare_page(&page, request).await?;
            page.goto(request.url.as_str()).await.map_err(browser_err)?;
            let response = page
                .wait_for_navigation_response()
                .await
                .map_err(browser_err)?;
            let status_code = navigation_status(
                response
                    .as_ref()
                    .and_then(|req| req.response.as_ref())
                    .map(|resp| resp.status),
            )?;
            let html = page.content().await.map_err(browser_err)?;
            let url = page
                .url()
                .await
                .map_err(browser_err)?
                .unwrap_or_else(|| request.url.clone());
            Ok(RenderedPage {
                url,
                status_code,
                html,
            })
        }
        .await;

        if let Err(e) = page.close().await {
            warn!("Failed to close browser page: {}", e);
        }
        result
    }
}

struct RenderedPage {
    url: String,
    status_code: u16,
    html: String,
}

/// 把导航响应状态映射为获取结果
///
/// 非 2xx 状态返回 `FetchError::Status`，交给回退链处理；
/// 浏览器没有报告响应（例如命中缓存）时按 200 处理。
fn navigation_status(status: Option<i64>) -> Result<u16, FetchError> {
    let Some(status) = status else {
        return Ok(200);
    };
    let code = u16::try_from(status).unwrap_or(0);
    if (200..300).contains(&code) {
        Ok(code)
    } else {
        Err(FetchError::Status(code))
    }
}

fn browser_err(e: impl std::fmt::Display) -> FetchError {
    FetchError::Browser(e.to_string())
}

#[async_trait]
impl PageFetcher for BrowserFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchedPage, FetchError> {
        url::Url::parse(&request.url)
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", request.url, e)))?;

        let start = Instant::now();
        let page = tokio::time::timeout(request.timeout, self.render(request))
            .await
            .map_err(|_| FetchError::Timeout)??;

        Ok(FetchedPage {
            url: page.url,
            status_code: page.status_code,
            html: page.html,
            transport: self.name(),
            elapsed_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn name(&self) -> &'static str {
        match self.mode {
            BrowserMode::Local { .. } => "local_browser",
            BrowserMode::Remote { .. } => "remote_browser",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_names() {
        let local = BrowserFetcher::local(None, (1366, 768), "en-US");
        let remote = BrowserFetcher::remote("ws://127.0.0.1:9222/devtools/browser/x", "en-US");
        assert_eq!(local.name(), "local_browser");
        assert_eq!(remote.name(), "remote_browser");
    }

    #[test]
    fn test_navigation_status_mapping() {
        assert_eq!(navigation_status(Some(200)).unwrap(), 200);
        assert_eq!(navigation_status(Some(204)).unwrap(), 204);
        assert_eq!(navigation_status(None).unwrap(), 200);

        let err = navigation_status(Some(503)).unwrap_err();
        assert_eq!(err, FetchError::Status(503));
        assert!(err.allows_fallback());
        assert_eq!(
            navigation_status(Some(404)).unwrap_err(),
            FetchError::Status(404)
        );
        assert_eq!(
            navigation_status(Some(302)).unwrap_err(),
            FetchError::Status(302)
        );
    }

    #[tokio::test]
    async fn test_invalid_url_fails_before_browser_start() {
        let fetcher = BrowserFetcher::local(None, (1366, 768), "en-US");
        let err = fetcher
            .fetch(&FetchRequest::new("::nope::", Duration::from_secs(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_unreachable_remote_endpoint_is_a_browser_error() {
        let fetcher = BrowserFetcher::remote("ws://127.0.0.1:1/devtools/browser/none", "en-US");
        let err = fetcher
            .fetch(&FetchRequest::new(
                "https://example.com/",
                Duration::from_secs(5),
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Browser(_) | FetchError::Timeout));
        assert!(err.allows_fallback());
    }
}

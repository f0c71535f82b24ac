// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

pub const LISTING_PATH: &str = "/realestateagents/seattle_wa";
pub const PAGE_SIZE: usize = 15;

const WALL: &str = r#"<html><body><h1>Pardon Our Interruption</h1>
<p>As you were browsing something about your browser made us think you were a bot.
Please complete the CAPTCHA to continue.</p></body></html>"#;

/// 目标站点的可调行为
#[derive(Default)]
pub struct SiteState {
    /// 经纪人总数，按每页 `PAGE_SIZE` 分页
    pub agents: usize,
    /// 第 N 次档案请求起返回验证页面
    pub block_after: Option<usize>,
    /// 返回 500 的经纪人编号
    pub broken: Vec<usize>,
    /// 第 N 次档案请求起挂起不响应，运行中可以解除
    pub stall_after: Mutex<Option<usize>>,
    pub profile_hits: AtomicUsize,
    pub user_agents: Mutex<Vec<String>>,
}

/// 运行中的模拟站点
pub struct TargetSite {
    pub base_url: String,
    pub state: Arc<SiteState>,
}

impl TargetSite {
    pub fn listing_url(&self) -> String {
        format!("{}{}", self.base_url, LISTING_PATH)
    }

    pub fn profile_url(&self, n: usize) -> String {
        format!("{}{}", self.base_url, agent_path(n))
    }

    pub fn profile_hits(&self) -> usize {
        self.state.profile_hits.load(Ordering::SeqCst)
    }
}

pub fn agent_path(n: usize) -> String {
    format!("/realestateagents/{:024x}", n + 1)
}

/// 示例档案页：名字、公司、地址、tel 链接，以及正文里的另一个号码
pub fn agent_html(n: usize) -> String {
    format!(
        r#"<html><head><title>Agent</title></head><body>
        <div class="profile-details">
          <h1 data-testid="agent-name">Casey Agent{n}</h1>
          <div data-testid="office-name">Summit Realty Group</div>
          <div data-testid="agent-address">1200 Pine St, Seattle, WA</div>
          <a data-testid="agent-phone" href="tel:+1-206-555-{n:04}">Call</a>
          <p>Office line (425) 555-9999. {years} years of experience, {deals} closed transactions.</p>
          <a href="mailto:agent{n}@summitrealty.example">Email me</a>
        </div></body></html>"#,
        years = 3 + n % 20,
        deals = 10 * (n + 1),
    )
}

fn listing_html(state: &SiteState, page: usize) -> String {
    let start = (page - 1) * PAGE_SIZE;
    let end = (start + PAGE_SIZE).min(state.agents);
    let cards: String = (start..end)
        .map(|n| {
            format!(
                r#"<div data-testid="component-agentCard"><a href="{}">Agent {}</a></div>"#,
                agent_path(n),
                n
            )
        })
        .collect();
    let next = if end < state.agents {
        format!(
            r#"<a aria-label="Go to next page" href="{}/pg-{}">Next</a>"#,
            LISTING_PATH,
            page + 1
        )
    } else {
        String::new()
    };
    format!("<html><body><h1>Find an agent</h1>{cards}{next}</body></html>")
}

fn record_agent(state: &SiteState, headers: &HeaderMap) {
    let ua = headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    state.user_agents.lock().push(ua);
}

async fn first_page(State(state): State<Arc<SiteState>>, headers: HeaderMap) -> Html<String> {
    record_agent(&state, &headers);
    Html(listing_html(&state, 1))
}

async fn later_page(
    State(state): State<Arc<SiteState>>,
    Path(page): Path<String>,
) -> Response {
    match page.strip_prefix("pg-").and_then(|p| p.parse::<usize>().ok()) {
        Some(page) if page >= 2 => Html(listing_html(&state, page)).into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn profile(
    State(state): State<Arc<SiteState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    record_agent(&state, &headers);
    let hit = state.profile_hits.fetch_add(1, Ordering::SeqCst) + 1;
    let stall_after = *state.stall_after.lock();
    if stall_after.is_some_and(|limit| hit > limit) {
        tokio::time::sleep(Duration::from_secs(60)).await;
    }
    if state.block_after.is_some_and(|limit| hit > limit) {
        return Html(WALL.to_string()).into_response();
    }
    let Some(n) = usize::from_str_radix(&id, 16).ok().and_then(|v| v.checked_sub(1)) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    if n >= state.agents {
        return StatusCode::NOT_FOUND.into_response();
    }
    if state.broken.contains(&n) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    Html(agent_html(n)).into_response()
}

/// 在随机端口启动模拟站点
pub async fn spawn_site(state: SiteState) -> TargetSite {
    let state = Arc::new(state);
    let app = Router::new()
        .route(LISTING_PATH, get(first_page))
        .route("/realestateagents/seattle_wa/{page}", get(later_page))
        .route("/realestateagents/{id}", get(profile))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TargetSite {
        base_url: format!("http://{}", addr),
        state,
    }
}

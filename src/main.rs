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

use leadcrawl::config::settings::Settings;
use leadcrawl::domain::models::site_profile::SiteProfile;
use leadcrawl::engines::router::FetcherChain;
use leadcrawl::engines::traits::PageFetcher;
use leadcrawl::infrastructure::database::connection;
use leadcrawl::infrastructure::metrics;
use leadcrawl::infrastructure::repositories::profile_record_repo_impl::ProfileRecordRepositoryImpl;
use leadcrawl::infrastructure::repositories::scrape_job_repo_impl::ScrapeJobRepositoryImpl;
use leadcrawl::presentation::routes;
use leadcrawl::utils::telemetry;
use leadcrawl::workers::scrape_worker::ScrapeWorker;
use leadcrawl::workers::stale_job_worker::StaleJobSweeper;
use migration::{Migrator, MigratorTrait};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

/// 主函数
///
/// 应用程序入口点，负责初始化所有组件并启动服务
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize logging
    telemetry::init_telemetry();
    info!("Starting leadcrawl...");

    // 2. Load configuration
    let settings = Arc::new(Settings::new()?);
    info!("Configuration loaded");

    metrics::init_metrics(&settings.metrics);

    // 3. Connect to database
    let db = Arc::new(connection::create_pool(&settings.database).await?);
    info!("Database connection established");

    info!("Running database migrations...");
    Migrator::up(db.as_ref(), None).await?;
    info!("Database migrations applied");

    // 4. Site profile and transport chain
    let site_profile = SiteProfile::resolve(
        &settings.scraper.site,
        settings.scraper.site_profile_path.as_deref(),
    )?;
    let fetcher: Arc<dyn PageFetcher> = Arc::new(FetcherChain::from_settings(&settings.transport)?);

    let job_repo = Arc::new(ScrapeJobRepositoryImpl::new(db.clone()));
    let profile_repo = Arc::new(ProfileRecordRepositoryImpl::new(db.clone()));

    // 5. Start workers
    let worker = ScrapeWorker::new(
        job_repo.clone(),
        profile_repo.clone(),
        fetcher,
        settings.scraper.clone(),
        site_profile.clone(),
    );
    // Claim interrupted jobs before the sweeper can see them as stale
    let orphaned = worker.reclaim_orphaned().await?;
    tokio::spawn(async move {
        if !orphaned.is_empty() {
            let resumed = worker.resume_jobs(orphaned).await;
            info!("Resumed {} interrupted jobs", resumed);
        }
        worker.run().await;
    });

    if settings.monitor.enabled {
        StaleJobSweeper::new(job_repo.clone(), &settings.monitor).start();
    }

    // 6. Start HTTP server
    let app = routes::app(job_repo, profile_repo, site_profile.name.clone());

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            if let Err(e) = result {
                error!("Server error: {}", e);
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    Ok(())
}

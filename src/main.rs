// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use news_crawler::application::use_cases::crawl_use_case::CrawlUseCase;
use news_crawler::config::settings::Settings;
use news_crawler::domain::repositories::crawl_run_repository::CrawlRunRepository;
use news_crawler::domain::services::crawl_orchestrator::CrawlOrchestrator;
use news_crawler::domain::services::source_registry::SourceRegistry;
use news_crawler::engines::reqwest_engine::ReqwestEngine;
use news_crawler::engines::traits::ScraperEngine;
use news_crawler::infrastructure::database::connection;
use news_crawler::infrastructure::repositories::article_repo_impl::ArticleRepositoryImpl;
use news_crawler::infrastructure::repositories::crawl_run_repo_impl::CrawlRunRepositoryImpl;
use news_crawler::infrastructure::repositories::source_repo_impl::SourceRepositoryImpl;
use news_crawler::infrastructure::{metrics, source_loader};
use news_crawler::presentation::routes;
use news_crawler::utils::robots::{RobotsChecker, RobotsCheckerTrait};
use news_crawler::utils::telemetry;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use migration::{Migrator, MigratorTrait};

/// 主函数
///
/// 应用程序入口点，负责初始化所有组件并启动服务
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load configuration and initialize logging
    let settings = Settings::new()?;
    telemetry::init_telemetry(&settings.logging);
    info!("Starting news-crawler {}...", env!("CARGO_PKG_VERSION"));

    metrics::init_metrics(&settings.metrics);

    // 2. Connect to database
    let db = Arc::new(connection::create_pool(&settings.database).await?);
    info!("Database connection established");

    info!("Running database migrations...");
    Migrator::up(db.as_ref(), None).await?;
    info!("Database migrations applied");

    // 3. Repositories
    let source_repo = Arc::new(SourceRepositoryImpl::new(db.clone()));
    let run_repo = Arc::new(CrawlRunRepositoryImpl::new(db.clone()));
    let article_repo = Arc::new(ArticleRepositoryImpl::new(db.clone()));

    // Runs left running by a previous process can never finish
    run_repo
        .fail_orphaned_runs(json!({
            "kind": "interrupted",
            "message": "process restarted before the run finished",
        }))
        .await?;

    if let Some(path) = settings.crawler.sources_file.as_deref() {
        let seeded = source_loader::seed_sources(source_repo.as_ref(), Path::new(path)).await?;
        info!("Seeded {} sources from {}", seeded, path);
    }

    // 4. Engine and orchestrator
    let engine = ReqwestEngine::new(
        &settings.crawler.user_agent,
        settings.crawler.block_private_networks,
    )?;
    let robots: Arc<dyn RobotsCheckerTrait> = Arc::new(RobotsChecker::new(
        engine.client(),
        settings.crawler.block_private_networks,
    ));
    let engine: Arc<dyn ScraperEngine> = Arc::new(engine);

    let orchestrator = Arc::new(CrawlOrchestrator::new(
        Arc::new(SourceRegistry::new(source_repo)),
        run_repo.clone(),
        article_repo,
        engine,
        robots,
        settings.crawler.clone(),
    ));
    let use_case = Arc::new(CrawlUseCase::new(orchestrator, run_repo));

    // 5. Start HTTP server
    let app = routes::routes(use_case, &settings.auth);

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

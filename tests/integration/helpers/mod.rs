// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

#![allow(dead_code)]

use axum_test::TestServer;
use migration::{Migrator, MigratorTrait};
use news_crawler::application::use_cases::crawl_use_case::CrawlUseCase;
use news_crawler::config::settings::{AuthSettings, CrawlerSettings, DatabaseSettings, Settings};
use news_crawler::domain::models::source::Source;
use news_crawler::domain::repositories::source_repository::SourceRepository;
use news_crawler::domain::services::crawl_orchestrator::CrawlOrchestrator;
use news_crawler::domain::services::source_registry::SourceRegistry;
use news_crawler::engines::reqwest_engine::ReqwestEngine;
use news_crawler::infrastructure::database::connection;
use news_crawler::infrastructure::repositories::article_repo_impl::ArticleRepositoryImpl;
use news_crawler::infrastructure::repositories::crawl_run_repo_impl::CrawlRunRepositoryImpl;
use news_crawler::infrastructure::repositories::source_repo_impl::SourceRepositoryImpl;
use news_crawler::presentation::routes;
use news_crawler::utils::robots::RobotsChecker;
use sea_orm::DatabaseConnection;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub type AppOrchestrator =
    CrawlOrchestrator<SourceRepositoryImpl, CrawlRunRepositoryImpl, ArticleRepositoryImpl>;

/// 创建已迁移的内存数据库
///
/// 只使用一个连接，保证所有查询看到同一个内存库
pub async fn create_test_db() -> Arc<DatabaseConnection> {
    let settings = DatabaseSettings {
        url: "sqlite::memory:".to_string(),
        max_connections: Some(1),
        min_connections: Some(1),
        connect_timeout: Some(10),
        idle_timeout: None,
    };
    let db = connection::create_pool(&settings)
        .await
        .expect("Failed to connect to sqlite");
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    Arc::new(db)
}

/// 测试用爬虫配置：允许访问本地模拟站点，退避很短
pub fn crawler_settings() -> CrawlerSettings {
    let mut settings = Settings::builder()
        .unwrap()
        .build()
        .unwrap()
        .try_deserialize::<Settings>()
        .unwrap()
        .crawler;
    settings.block_private_networks = false;
    settings.retry_initial_backoff_ms = 1;
    settings.retry_max_backoff_ms = 10;
    settings.progress_flush_interval = 1;
    settings.sources_file = None;
    settings
}

pub fn test_source(name: &str, origin: &MockServer, extra: Value) -> Source {
    let mut value = json!({
        "name": name,
        "url": format!("{}/", origin.uri()),
        "rate_limit": 50,
        "retry_count": 1,
        "timeout": 5,
    });
    if let (Some(base), Some(extra)) = (value.as_object_mut(), extra.as_object()) {
        for (key, field) in extra {
            base.insert(key.clone(), field.clone());
        }
    }
    serde_json::from_value(value).unwrap()
}

pub struct TestApp {
    pub server: TestServer,
    pub db: Arc<DatabaseConnection>,
    pub origin: MockServer,
    pub source_repo: Arc<SourceRepositoryImpl>,
    pub run_repo: Arc<CrawlRunRepositoryImpl>,
    pub article_repo: Arc<ArticleRepositoryImpl>,
    pub orchestrator: Arc<AppOrchestrator>,
}

pub async fn create_test_app() -> TestApp {
    create_test_app_with_auth(AuthSettings::default()).await
}

pub async fn create_test_app_with_auth(auth: AuthSettings) -> TestApp {
    let db = create_test_db().await;
    let origin = MockServer::start().await;

    let source_repo = Arc::new(SourceRepositoryImpl::new(db.clone()));
    let run_repo = Arc::new(CrawlRunRepositoryImpl::new(db.clone()));
    let article_repo = Arc::new(ArticleRepositoryImpl::new(db.clone()));

    let settings = crawler_settings();
    let engine = ReqwestEngine::new(&settings.user_agent, false).unwrap();
    let robots = Arc::new(RobotsChecker::new(engine.client(), false));

    let orchestrator = Arc::new(CrawlOrchestrator::new(
        Arc::new(SourceRegistry::new(source_repo.clone())),
        run_repo.clone(),
        article_repo.clone(),
        Arc::new(engine),
        robots,
        settings,
    ));
    let use_case = Arc::new(CrawlUseCase::new(orchestrator.clone(), run_repo.clone()));
    let server = TestServer::new(routes::routes(use_case, &auth)).unwrap();

    TestApp {
        server,
        db,
        origin,
        source_repo,
        run_repo,
        article_repo,
        orchestrator,
    }
}

impl TestApp {
    pub async fn add_source(&self, name: &str, extra: Value) -> Source {
        let source = test_source(name, &self.origin, extra);
        self.source_repo.upsert_by_name(&source).await.unwrap()
    }

    /// 轮询运行日志直到进入终态
    pub async fn wait_for_run(&self, log_id: i64) -> Value {
        for _ in 0..200 {
            let response = self.server.get(&format!("/crawler/logs/{}", log_id)).await;
            let body = response.json::<Value>();
            if body["status"] != "running" {
                return body;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("crawl run {} did not finish in time", log_id);
    }
}

/// 在模拟站点上挂载一个页面
pub async fn mount_page(origin: &MockServer, route: &str, content_type: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(body, content_type),
        )
        .mount(origin)
        .await;
}

pub fn rss_feed(origin: &MockServer, items: &[(&str, Option<&str>)]) -> String {
    let items: String = items
        .iter()
        .map(|(link, date)| {
            let date = date
                .map(|d| format!("<pubDate>{}</pubDate>", d))
                .unwrap_or_default();
            format!(
                "<item><title>t</title><link>{}{}</link>{}</item>",
                origin.uri(),
                link,
                date
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><rss version="2.0"><channel><title>Feed</title>{}</channel></rss>"#,
        items
    )
}

pub fn article_html(title: &str, body: &str) -> String {
    format!(
        r#"<html><head><title>{title} | Example</title>
        <meta name="author" content="Desk Reporter">
        <meta property="article:published_time" content="2024-03-05T07:30:00Z">
        </head><body><h1 class="headline">{title}</h1>
        <div class="body"><p>{body}</p><p>Second paragraph for {title}.</p></div>
        </body></html>"#
    )
}

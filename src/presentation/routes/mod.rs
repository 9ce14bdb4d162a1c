// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::application::use_cases::crawl_use_case::CrawlUseCase;
use crate::config::settings::AuthSettings;
use crate::infrastructure::repositories::article_repo_impl::ArticleRepositoryImpl;
use crate::infrastructure::repositories::crawl_run_repo_impl::CrawlRunRepositoryImpl;
use crate::infrastructure::repositories::source_repo_impl::SourceRepositoryImpl;
use crate::presentation::handlers::crawler_handler;
use crate::presentation::middleware::auth_middleware::{auth_middleware, AuthState};
use axum::{
    extract::Extension,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// 生产环境使用的用例类型
pub type AppCrawlUseCase =
    CrawlUseCase<SourceRepositoryImpl, CrawlRunRepositoryImpl, ArticleRepositoryImpl>;

/// 创建应用路由
///
/// `/crawler/*` 在配置了 API 密钥时需要认证，`/health` 和 `/version` 始终公开
///
/// # 参数
///
/// * `use_case` - 爬虫用例
/// * `auth` - 认证配置
///
/// # 返回值
///
/// 返回配置好的路由
pub fn routes(use_case: Arc<AppCrawlUseCase>, auth: &AuthSettings) -> Router {
    type SR = SourceRepositoryImpl;
    type RR = CrawlRunRepositoryImpl;
    type AR = ArticleRepositoryImpl;

    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/version", get(version));

    let protected_routes = Router::new()
        .route("/crawler/start", post(crawler_handler::start_crawl::<SR, RR, AR>))
        .route("/crawler/logs", get(crawler_handler::list_crawl_logs::<SR, RR, AR>))
        .route(
            "/crawler/logs/{log_id}",
            get(crawler_handler::get_crawl_log::<SR, RR, AR>),
        )
        .route(
            "/crawler/sources/reload",
            post(crawler_handler::reload_sources::<SR, RR, AR>),
        )
        .route_layer(middleware::from_fn_with_state(
            AuthState::new(auth.api_key.clone()),
            auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(Extension(use_case))
        .layer(TraceLayer::new_for_http())
}

/// 健康检查端点
///
/// # 返回值
///
/// 返回"OK"字符串
pub async fn health_check() -> &'static str {
    "OK"
}

/// 版本信息端点
///
/// # 返回值
///
/// 返回应用版本号
pub async fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Extension, Path, Query,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;

use crate::{
    application::{
        dto::{crawl_log_query::CrawlLogQueryDto, crawl_request::StartCrawlRequestDto},
        use_cases::crawl_use_case::CrawlUseCase,
    },
    domain::repositories::{
        article_repository::ArticleRepository, crawl_run_repository::CrawlRunRepository,
        source_repository::SourceRepository,
    },
    presentation::errors::ApiError,
};

/// POST /crawler/start
///
/// 运行记录创建后返回 202，爬取在后台继续
pub async fn start_crawl<SR, RR, AR>(
    Extension(use_case): Extension<Arc<CrawlUseCase<SR, RR, AR>>>,
    payload: Result<Json<StartCrawlRequestDto>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
    SR: SourceRepository + 'static,
    RR: CrawlRunRepository + 'static,
    AR: ArticleRepository + 'static,
{
    let Json(payload) = payload?;
    let response = use_case.start_crawl(payload).await?;
    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// GET /crawler/logs/{log_id}
pub async fn get_crawl_log<SR, RR, AR>(
    Extension(use_case): Extension<Arc<CrawlUseCase<SR, RR, AR>>>,
    log_id: Result<Path<i32>, PathRejection>,
) -> Result<impl IntoResponse, ApiError>
where
    SR: SourceRepository + 'static,
    RR: CrawlRunRepository + 'static,
    AR: ArticleRepository + 'static,
{
    let Path(log_id) = log_id?;
    let run = use_case.get_log(log_id).await?;
    Ok(Json(run))
}

/// GET /crawler/logs?source_name=&limit=
pub async fn list_crawl_logs<SR, RR, AR>(
    Extension(use_case): Extension<Arc<CrawlUseCase<SR, RR, AR>>>,
    query: Result<Query<CrawlLogQueryDto>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError>
where
    SR: SourceRepository + 'static,
    RR: CrawlRunRepository + 'static,
    AR: ArticleRepository + 'static,
{
    let Query(query) = query?;
    let runs = use_case.list_logs(query).await?;
    Ok(Json(runs))
}

/// POST /crawler/sources/reload
pub async fn reload_sources<SR, RR, AR>(
    Extension(use_case): Extension<Arc<CrawlUseCase<SR, RR, AR>>>,
) -> impl IntoResponse
where
    SR: SourceRepository + 'static,
    RR: CrawlRunRepository + 'static,
    AR: ArticleRepository + 'static,
{
    use_case.reload_sources();
    Json(json!({ "status": "reloaded" }))
}

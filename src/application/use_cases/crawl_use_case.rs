// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::{
    application::dto::{
        crawl_log_query::CrawlLogQueryDto,
        crawl_request::{StartCrawlRequestDto, StartCrawlResponseDto},
    },
    domain::{
        models::crawl_run::CrawlRun,
        repositories::{
            article_repository::ArticleRepository, crawl_run_repository::CrawlRunRepository,
            source_repository::SourceRepository, RepositoryError,
        },
        services::crawl_orchestrator::{CrawlError, CrawlOrchestrator},
    },
};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use validator::Validate;

#[derive(Error, Debug)]
pub enum CrawlUseCaseError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("{0}")]
    SourceUnavailable(String),
    #[error("Crawl log with ID {0} not found")]
    NotFound(i32),
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<CrawlError> for CrawlUseCaseError {
    fn from(err: CrawlError) -> Self {
        match err {
            CrawlError::SourceUnavailable(_) => CrawlUseCaseError::SourceUnavailable(err.to_string()),
            CrawlError::Repository(e) => CrawlUseCaseError::Repository(e),
        }
    }
}

/// 爬虫API用例
///
/// 启动爬取、查询运行日志和刷新新闻源缓存
pub struct CrawlUseCase<SR, RR, AR> {
    orchestrator: Arc<CrawlOrchestrator<SR, RR, AR>>,
    run_repo: Arc<RR>,
}

impl<SR, RR, AR> CrawlUseCase<SR, RR, AR>
where
    SR: SourceRepository + 'static,
    RR: CrawlRunRepository + 'static,
    AR: ArticleRepository + 'static,
{
    pub fn new(orchestrator: Arc<CrawlOrchestrator<SR, RR, AR>>, run_repo: Arc<RR>) -> Self {
        Self {
            orchestrator,
            run_repo,
        }
    }

    /// 启动爬取
    ///
    /// 运行记录创建后立即返回，不等待爬取完成
    pub async fn start_crawl(
        &self,
        dto: StartCrawlRequestDto,
    ) -> Result<StartCrawlResponseDto, CrawlUseCaseError> {
        dto.validate()
            .map_err(|e| CrawlUseCaseError::ValidationError(e.to_string()))?;

        let job = self
            .orchestrator
            .start_crawl(&dto.source_name, dto.mode)
            .await?;

        Ok(StartCrawlResponseDto {
            status: "started".to_string(),
            log_id: job.run.id,
            source_name: job.run.source_name.clone(),
            mode: dto.mode,
            message: format!(
                "Crawl started for source '{}' in {} mode",
                job.run.source_name, dto.mode
            ),
            started_at: job.run.started_at,
        })
    }

    pub async fn get_log(&self, log_id: i32) -> Result<CrawlRun, CrawlUseCaseError> {
        self.run_repo
            .get_run(log_id)
            .await?
            .ok_or(CrawlUseCaseError::NotFound(log_id))
    }

    pub async fn list_logs(
        &self,
        query: CrawlLogQueryDto,
    ) -> Result<Vec<CrawlRun>, CrawlUseCaseError> {
        query
            .validate()
            .map_err(|e| CrawlUseCaseError::ValidationError(e.to_string()))?;

        let source_name = query.source_name.as_deref().filter(|s| !s.is_empty());
        Ok(self.run_repo.list_runs(source_name, query.limit()).await?)
    }

    /// 清空新闻源缓存，之后的读取以数据库为准
    pub fn reload_sources(&self) {
        let dropped = self.orchestrator.registry().cached_len();
        self.orchestrator.registry().reload();
        info!("Source cache cleared ({} entries)", dropped);
    }
}

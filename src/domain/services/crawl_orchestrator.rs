// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::Utc;
use futures::{stream, StreamExt};
use metrics::{counter, gauge, histogram};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::config::settings::CrawlerSettings;
use crate::domain::models::article::{Article, ArticleStatus, UpsertOutcome};
use crate::domain::models::crawl_run::{CrawlMode, CrawlRun, CrawlRunStatus, RunCounts};
use crate::domain::models::source::Source;
use crate::domain::repositories::article_repository::ArticleRepository;
use crate::domain::repositories::crawl_run_repository::CrawlRunRepository;
use crate::domain::repositories::source_repository::SourceRepository;
use crate::domain::repositories::RepositoryError;
use crate::domain::services::extraction_service::{ExtractedArticle, ExtractionPlan};
use crate::domain::services::frontier_service::{FrontierBuilder, FrontierError, FrontierRequest};
use crate::domain::services::source_registry::SourceRegistry;
use crate::engines::polite_engine::PoliteEngine;
use crate::engines::traits::{ScrapeRequest, ScraperEngine};
use crate::utils::retry_policy::RetryPolicy;
use crate::utils::robots::RobotsCheckerTrait;

/// `error_details` 中保留的最大错误样本数
pub const MAX_ERROR_SAMPLES: usize = 50;

/// 编排器错误
///
/// 只在 `start_crawl` 的同步阶段返回；运行开始后的失败都记录在运行日志中。
#[derive(Error, Debug)]
pub enum CrawlError {
    /// 新闻源不存在或已禁用
    #[error("Source '{0}' not found or disabled")]
    SourceUnavailable(String),
    /// 仓库错误
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// 已启动的爬取任务
///
/// `run` 是刚创建的 `running` 记录；`handle` 可以等待任务结束，丢弃它不会取消任务。
pub struct CrawlJob {
    pub run: CrawlRun,
    pub handle: JoinHandle<()>,
}

/// 单个URL失败的样本
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorSample {
    pub url: String,
    pub kind: &'static str,
    pub message: String,
}

/// 运行中累计的计数和错误样本
#[derive(Debug, Default)]
struct RunTally {
    counts: RunCounts,
    samples: Vec<ErrorSample>,
    truncated: bool,
}

impl RunTally {
    fn record_stored(&mut self, outcome: UpsertOutcome) {
        self.counts.found += 1;
        match outcome {
            UpsertOutcome::Inserted => self.counts.new += 1,
            UpsertOutcome::Updated => self.counts.updated += 1,
        }
    }

    fn record_failure(&mut self, sample: ErrorSample) {
        self.counts.found += 1;
        self.counts.errors += 1;
        if self.samples.len() < MAX_ERROR_SAMPLES {
            self.samples.push(sample);
        } else {
            self.truncated = true;
        }
    }

    /// 生成 `error_details`；没有任何错误时为空
    fn error_details(&self, fatal: Option<(&str, String)>) -> Option<serde_json::Value> {
        if fatal.is_none() && self.samples.is_empty() {
            return None;
        }
        let mut details = json!({
            "errors": self.samples,
            "truncated": self.truncated,
        });
        if let Some((kind, message)) = fatal {
            details["kind"] = json!(kind);
            details["message"] = json!(message);
        }
        Some(details)
    }
}

/// 中止整个运行的失败
enum JobFailure {
    /// 候选URL无法枚举
    Frontier(FrontierError),
    /// 持久化失败
    Infrastructure(RepositoryError),
}

impl JobFailure {
    fn kind(&self) -> &'static str {
        match self {
            JobFailure::Frontier(_) => "frontier",
            JobFailure::Infrastructure(_) => "infrastructure",
        }
    }

    fn message(&self) -> String {
        match self {
            JobFailure::Frontier(e) => e.to_string(),
            JobFailure::Infrastructure(e) => e.to_string(),
        }
    }
}

/// 单个URL的处理结果
enum UrlOutcome {
    Stored(UpsertOutcome),
    Failed(ErrorSample),
}

/// 爬取编排器
///
/// 接受 `start_crawl` 请求，同步校验新闻源并创建运行记录，然后在后台任务中
/// 执行 枚举 → 限速抓取 → 提取 → 按URL写入 的流水线，并持续更新运行日志。
pub struct CrawlOrchestrator<SR, RR, AR> {
    registry: Arc<SourceRegistry<SR>>,
    run_repo: Arc<RR>,
    article_repo: Arc<AR>,
    engine: Arc<dyn ScraperEngine>,
    robots: Arc<dyn RobotsCheckerTrait>,
    settings: CrawlerSettings,
    run_slots: Arc<Semaphore>,
}

impl<SR, RR, AR> CrawlOrchestrator<SR, RR, AR>
where
    SR: SourceRepository + 'static,
    RR: CrawlRunRepository + 'static,
    AR: ArticleRepository + 'static,
{
    /// 创建爬取编排器
    ///
    /// # 参数
    ///
    /// * `registry` - 新闻源注册表
    /// * `run_repo` - 运行日志仓库
    /// * `article_repo` - 文章仓库
    /// * `engine` - 抓取引擎
    /// * `robots` - robots.txt 检查器
    /// * `settings` - 爬虫配置
    pub fn new(
        registry: Arc<SourceRegistry<SR>>,
        run_repo: Arc<RR>,
        article_repo: Arc<AR>,
        engine: Arc<dyn ScraperEngine>,
        robots: Arc<dyn RobotsCheckerTrait>,
        settings: CrawlerSettings,
    ) -> Self {
        let run_slots = Arc::new(Semaphore::new(settings.max_concurrent_runs.max(1)));
        Self {
            registry,
            run_repo,
            article_repo,
            engine,
            robots,
            settings,
            run_slots,
        }
    }

    /// 新闻源注册表
    pub fn registry(&self) -> &Arc<SourceRegistry<SR>> {
        &self.registry
    }

    /// 启动一次爬取
    ///
    /// # 参数
    ///
    /// * `source_name` - 新闻源名称
    /// * `mode` - 爬取模式
    ///
    /// # 返回值
    ///
    /// * `Ok(CrawlJob)` - 运行记录已创建，后台任务已启动
    /// * `Err(CrawlError::SourceUnavailable)` - 新闻源不存在或已禁用，不创建运行记录
    /// * `Err(CrawlError::Repository)` - 读取新闻源或创建运行记录失败
    pub async fn start_crawl(
        self: &Arc<Self>,
        source_name: &str,
        mode: CrawlMode,
    ) -> Result<CrawlJob, CrawlError> {
        let source = self
            .registry
            .get_enabled_source(source_name)
            .await?
            .ok_or_else(|| CrawlError::SourceUnavailable(source_name.to_string()))?;

        let run = self.run_repo.create_run(&source.name).await?;
        counter!("crawler_runs_started_total", "mode" => mode.to_string()).increment(1);
        info!(
            "Created crawl run {} for source {} ({})",
            run.id, source.name, mode
        );

        let handle = tokio::spawn(Arc::clone(self).execute(run.clone(), source, mode));
        Ok(CrawlJob { run, handle })
    }

    /// 模式对应的条目上限，配置值不能超过模式的硬上限
    fn limit_for(&self, mode: CrawlMode) -> usize {
        let configured = match mode {
            CrawlMode::Incremental => self.settings.incremental_limit,
            CrawlMode::Full => self.settings.full_limit,
        };
        configured.min(mode.max_items())
    }

    #[instrument(skip_all, fields(run_id = run.id, source = %source.name, mode = %mode))]
    async fn execute(self: Arc<Self>, run: CrawlRun, source: Source, mode: CrawlMode) {
        let _permit = match Arc::clone(&self.run_slots).acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                error!("Run slots unavailable: {}", e);
                self.finalize(
                    &run,
                    CrawlRunStatus::Failed,
                    RunCounts::default(),
                    Some(json!({ "kind": "infrastructure", "message": e.to_string() })),
                )
                .await;
                return;
            }
        };

        gauge!("crawler_active_runs").increment(1.0);
        let started = Instant::now();
        let mut tally = RunTally::default();

        let result = self.crawl(&run, &source, mode, &mut tally).await;

        let (status, details) = match result {
            Ok(()) => (CrawlRunStatus::from_counts(&tally.counts), tally.error_details(None)),
            Err(failure) => {
                error!("Crawl run aborted ({}): {}", failure.kind(), failure.message());
                let details = tally.error_details(Some((failure.kind(), failure.message())));
                (CrawlRunStatus::Failed, details)
            }
        };

        self.finalize(&run, status, tally.counts, details).await;

        gauge!("crawler_active_runs").decrement(1.0);
        histogram!("crawler_run_duration_seconds").record(started.elapsed().as_secs_f64());
        counter!("crawler_runs_finished_total", "status" => status.to_string()).increment(1);
    }

    async fn finalize(
        &self,
        run: &CrawlRun,
        status: CrawlRunStatus,
        counts: RunCounts,
        details: Option<serde_json::Value>,
    ) {
        match self.run_repo.finalize(run.id, status, counts, details).await {
            Ok(finished) => info!(
                "Crawl run {} finished: {} (found={}, new={}, updated={}, errors={})",
                finished.id,
                finished.status,
                finished.articles_found,
                finished.articles_new,
                finished.articles_updated,
                finished.errors
            ),
            Err(e) => error!("Failed to finalize crawl run {}: {}", run.id, e),
        }
    }

    async fn crawl(
        &self,
        run: &CrawlRun,
        source: &Source,
        mode: CrawlMode,
        tally: &mut RunTally,
    ) -> Result<(), JobFailure> {
        // 选择器在创建新闻源时已校验，编译失败说明配置被绕过，按整体失败处理
        let plan = ExtractionPlan::compile(&source.selectors).map_err(|e| {
            JobFailure::Frontier(FrontierError::Parse {
                url: source.url.clone(),
                message: e.to_string(),
            })
        })?;

        let user_agent = self.settings.user_agent.as_str();
        let mut min_interval = source.min_request_interval();
        if self.settings.respect_robots {
            match self.robots.get_crawl_delay(&source.url, user_agent).await {
                Ok(Some(delay)) if delay > min_interval => {
                    debug!("Using robots.txt crawl-delay {:?}", delay);
                    min_interval = delay;
                }
                Ok(_) => {}
                Err(e) => warn!("Failed to read crawl-delay for {}: {}", source.url, e),
            }
        }

        let polite: Arc<dyn ScraperEngine> = Arc::new(PoliteEngine::new(
            Arc::clone(&self.engine),
            min_interval,
            RetryPolicy::for_source(&self.settings, source.max_retries()),
        ));

        let since = match mode {
            CrawlMode::Incremental => self
                .run_repo
                .latest_successful(&source.name)
                .await
                .map_err(JobFailure::Infrastructure)?
                .map(|previous| previous.started_at),
            CrawlMode::Full => None,
        };

        let limit = self.limit_for(mode);
        let mut builder = FrontierBuilder::new(Arc::clone(&polite), source.request_timeout());
        if self.settings.respect_robots {
            builder = builder.with_robots(Arc::clone(&self.robots), user_agent);
        }
        let frontier = builder
            .build(&FrontierRequest {
                source,
                mode,
                since,
                plan: &plan,
                limit,
            })
            .await
            .map_err(JobFailure::Frontier)?;

        let urls = self.apply_robots(frontier, limit).await;
        info!("Crawling {} urls (interval {:?})", urls.len(), min_interval);

        let concurrency = (source.rate_limit.max(1) as usize)
            .min(self.settings.max_in_flight_per_run)
            .max(1);
        let flush_every = self.settings.progress_flush_interval.max(1) as i32;

        let mut results = stream::iter(urls)
            .map(|url| self.process_url(source, &plan, Arc::clone(&polite), url))
            .buffer_unordered(concurrency);

        while let Some(result) = results.next().await {
            match result.map_err(JobFailure::Infrastructure)? {
                UrlOutcome::Stored(outcome) => {
                    counter!("crawler_articles_total", "outcome" => outcome_label(outcome))
                        .increment(1);
                    tally.record_stored(outcome);
                }
                UrlOutcome::Failed(sample) => {
                    debug!("Failed {} ({}): {}", sample.url, sample.kind, sample.message);
                    tally.record_failure(sample);
                }
            }

            if tally.counts.found % flush_every == 0 {
                self.run_repo
                    .update_counts(run.id, tally.counts)
                    .await
                    .map_err(JobFailure::Infrastructure)?;
            }
        }

        Ok(())
    }

    /// 去掉 robots.txt 禁止的URL，并截断到上限
    async fn apply_robots(&self, frontier: Vec<Url>, limit: usize) -> Vec<Url> {
        if !self.settings.respect_robots {
            return frontier.into_iter().take(limit).collect();
        }

        let mut allowed = Vec::with_capacity(frontier.len().min(limit));
        let mut disallowed = 0usize;
        for url in frontier {
            if allowed.len() >= limit {
                break;
            }
            match self
                .robots
                .is_allowed(url.as_str(), &self.settings.user_agent)
                .await
            {
                Ok(false) => disallowed += 1,
                Ok(true) => allowed.push(url),
                Err(e) => {
                    warn!("robots.txt check failed for {}: {}", url, e);
                    allowed.push(url);
                }
            }
        }
        if disallowed > 0 {
            info!("Skipped {} urls disallowed by robots.txt", disallowed);
        }
        allowed
    }

    /// 抓取、提取并写入单个URL
    ///
    /// 抓取和解析失败返回 `UrlOutcome::Failed`；只有持久化失败才返回错误
    async fn process_url(
        &self,
        source: &Source,
        plan: &ExtractionPlan,
        engine: Arc<dyn ScraperEngine>,
        url: Url,
    ) -> Result<UrlOutcome, RepositoryError> {
        let request = ScrapeRequest::new(url.as_str(), source.request_timeout());
        let response = match engine.scrape(&request).await {
            Ok(response) => response,
            Err(e) => {
                counter!("crawler_fetch_errors_total", "reason" => e.kind()).increment(1);
                return Ok(UrlOutcome::Failed(ErrorSample {
                    url: url.to_string(),
                    kind: "fetch",
                    message: e.to_string(),
                }));
            }
        };

        if !response.is_html() {
            return Ok(UrlOutcome::Failed(ErrorSample {
                url: url.to_string(),
                kind: "fetch",
                message: format!("unsupported content type '{}'", response.content_type),
            }));
        }

        let extracted = match plan.extract(&response.content, &url) {
            Ok(extracted) => extracted,
            Err(e) => {
                return Ok(UrlOutcome::Failed(ErrorSample {
                    url: url.to_string(),
                    kind: "parse",
                    message: e.to_string(),
                }))
            }
        };

        let article = build_article(source, &url, extracted);
        let outcome = self.article_repo.upsert_by_url(&article).await?;
        Ok(UrlOutcome::Stored(outcome))
    }
}

fn build_article(source: &Source, url: &Url, extracted: ExtractedArticle) -> Article {
    let now = Utc::now();
    Article {
        id: 0,
        title: extracted.title,
        content: extracted.content,
        summary: extracted.summary,
        url: url.to_string(),
        source_name: source.name.clone(),
        author: extracted.author,
        published_at: extracted.published_at,
        crawled_at: now,
        updated_at: now,
        category: extracted.category,
        tags: extracted.tags,
        image_url: extracted.image_url,
        status: ArticleStatus::Active,
    }
}

fn outcome_label(outcome: UpsertOutcome) -> &'static str {
    match outcome {
        UpsertOutcome::Inserted => "inserted",
        UpsertOutcome::Updated => "updated",
    }
}

#[cfg(test)]
#[path = "crawl_orchestrator_test.rs"]
mod tests;

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::crawl_run::{CrawlRun, CrawlRunStatus, RunCounts};
use crate::domain::repositories::crawl_run_repository::CrawlRunRepository;
use crate::domain::repositories::RepositoryError;
use crate::infrastructure::database::entities::crawl_log as crawl_log_entity;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use std::sync::Arc;
use tracing::warn;

/// 运行日志仓库实现
///
/// 状态转换通过带 `status = 'running'` 条件的更新完成，已终结的运行不会被再次修改
#[derive(Clone)]
pub struct CrawlRunRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl CrawlRunRepositoryImpl {
    /// 创建新的运行日志仓库实例
    ///
    /// # 参数
    ///
    /// * `db` - 数据库连接
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// 条件更新未命中时区分"不存在"和"已终结"
    async fn transition_error(&self, run_id: i32, action: &str) -> RepositoryError {
        match crawl_log_entity::Entity::find_by_id(run_id)
            .one(self.db.as_ref())
            .await
        {
            Ok(Some(model)) => RepositoryError::InvalidState(format!(
                "cannot {} run {} in status {}",
                action, run_id, model.status
            )),
            Ok(None) => RepositoryError::NotFound,
            Err(e) => e.into(),
        }
    }
}

impl TryFrom<crawl_log_entity::Model> for CrawlRun {
    type Error = RepositoryError;

    fn try_from(model: crawl_log_entity::Model) -> Result<Self, Self::Error> {
        let status = model.status.parse().map_err(|_| {
            RepositoryError::InvalidState(format!("unknown crawl status '{}'", model.status))
        })?;
        Ok(Self {
            id: model.id,
            source_name: model.source_name,
            started_at: model.started_at.into(),
            finished_at: model.finished_at.map(Into::into),
            articles_found: model.articles_found,
            articles_new: model.articles_new,
            articles_updated: model.articles_updated,
            errors: model.errors,
            status,
            error_details: model.error_details,
        })
    }
}

fn counts_model(counts: RunCounts) -> crawl_log_entity::ActiveModel {
    crawl_log_entity::ActiveModel {
        articles_found: Set(counts.found),
        articles_new: Set(counts.new),
        articles_updated: Set(counts.updated),
        errors: Set(counts.errors),
        ..Default::default()
    }
}

fn running() -> String {
    CrawlRunStatus::Running.to_string()
}

#[async_trait]
impl CrawlRunRepository for CrawlRunRepositoryImpl {
    async fn create_run(&self, source_name: &str) -> Result<CrawlRun, RepositoryError> {
        let model = crawl_log_entity::ActiveModel {
            source_name: Set(source_name.to_string()),
            started_at: Set(Utc::now().into()),
            finished_at: Set(None),
            articles_found: Set(0),
            articles_new: Set(0),
            articles_updated: Set(0),
            errors: Set(0),
            status: Set(running()),
            error_details: Set(None),
            ..Default::default()
        };

        CrawlRun::try_from(model.insert(self.db.as_ref()).await?)
    }

    async fn update_counts(&self, run_id: i32, counts: RunCounts) -> Result<(), RepositoryError> {
        let result = crawl_log_entity::Entity::update_many()
            .set(counts_model(counts))
            .filter(crawl_log_entity::Column::Id.eq(run_id))
            .filter(crawl_log_entity::Column::Status.eq(running()))
            .exec(self.db.as_ref())
            .await?;

        if result.rows_affected == 0 {
            return Err(self.transition_error(run_id, "update counts of").await);
        }
        Ok(())
    }

    async fn finalize(
        &self,
        run_id: i32,
        status: CrawlRunStatus,
        counts: RunCounts,
        error_details: Option<serde_json::Value>,
    ) -> Result<CrawlRun, RepositoryError> {
        if !status.is_terminal() {
            return Err(RepositoryError::InvalidState(format!(
                "{} is not a terminal status",
                status
            )));
        }

        let mut changes = counts_model(counts);
        changes.status = Set(status.to_string());
        changes.finished_at = Set(Some(Utc::now().into()));
        changes.error_details = Set(error_details);

        let result = crawl_log_entity::Entity::update_many()
            .set(changes)
            .filter(crawl_log_entity::Column::Id.eq(run_id))
            .filter(crawl_log_entity::Column::Status.eq(running()))
            .exec(self.db.as_ref())
            .await?;

        if result.rows_affected == 0 {
            return Err(self.transition_error(run_id, "finalize").await);
        }

        self.get_run(run_id).await?.ok_or(RepositoryError::NotFound)
    }

    async fn get_run(&self, run_id: i32) -> Result<Option<CrawlRun>, RepositoryError> {
        crawl_log_entity::Entity::find_by_id(run_id)
            .one(self.db.as_ref())
            .await?
            .map(CrawlRun::try_from)
            .transpose()
    }

    async fn list_runs(
        &self,
        source_name: Option<&str>,
        limit: u64,
    ) -> Result<Vec<CrawlRun>, RepositoryError> {
        let mut query = crawl_log_entity::Entity::find();
        if let Some(name) = source_name {
            query = query.filter(crawl_log_entity::Column::SourceName.eq(name));
        }

        query
            .order_by_desc(crawl_log_entity::Column::StartedAt)
            .order_by_desc(crawl_log_entity::Column::Id)
            .limit(limit)
            .all(self.db.as_ref())
            .await?
            .into_iter()
            .map(CrawlRun::try_from)
            .collect()
    }

    async fn latest_successful(&self, source_name: &str) -> Result<Option<CrawlRun>, RepositoryError> {
        crawl_log_entity::Entity::find()
            .filter(crawl_log_entity::Column::SourceName.eq(source_name))
            .filter(crawl_log_entity::Column::Status.is_in([
                CrawlRunStatus::Completed.to_string(),
                CrawlRunStatus::Partial.to_string(),
            ]))
            .order_by_desc(crawl_log_entity::Column::StartedAt)
            .order_by_desc(crawl_log_entity::Column::Id)
            .one(self.db.as_ref())
            .await?
            .map(CrawlRun::try_from)
            .transpose()
    }

    async fn fail_orphaned_runs(
        &self,
        error_details: serde_json::Value,
    ) -> Result<u64, RepositoryError> {
        let changes = crawl_log_entity::ActiveModel {
            status: Set(CrawlRunStatus::Failed.to_string()),
            finished_at: Set(Some(Utc::now().into())),
            error_details: Set(Some(error_details)),
            ..Default::default()
        };

        let result = crawl_log_entity::Entity::update_many()
            .set(changes)
            .filter(crawl_log_entity::Column::Status.eq(running()))
            .exec(self.db.as_ref())
            .await?;

        if result.rows_affected > 0 {
            warn!("Marked {} interrupted crawl runs as failed", result.rows_affected);
        }
        Ok(result.rows_affected)
    }
}

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::article::{Article, UpsertOutcome};
use crate::domain::repositories::article_repository::ArticleRepository;
use crate::domain::repositories::RepositoryError;
use crate::infrastructure::database::entities::article as article_entity;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set, SqlErr,
};
use std::sync::Arc;
use tracing::debug;

/// 文章仓库实现
#[derive(Clone)]
pub struct ArticleRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl ArticleRepositoryImpl {
    /// 创建新的文章仓库实例
    ///
    /// # 参数
    ///
    /// * `db` - 数据库连接
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    async fn find_model(&self, url: &str) -> Result<Option<article_entity::Model>, RepositoryError> {
        Ok(article_entity::Entity::find()
            .filter(article_entity::Column::Url.eq(url))
            .one(self.db.as_ref())
            .await?)
    }

    /// 覆盖已有文章，保留主键
    async fn overwrite(
        &self,
        existing: article_entity::Model,
        article: &Article,
    ) -> Result<(), RepositoryError> {
        let mut active: article_entity::ActiveModel = existing.into();
        apply_fields(&mut active, article)?;
        active.update(self.db.as_ref()).await?;
        Ok(())
    }
}

impl TryFrom<article_entity::Model> for Article {
    type Error = RepositoryError;

    fn try_from(model: article_entity::Model) -> Result<Self, Self::Error> {
        let tags = match model.tags {
            Some(value) if !value.is_null() => serde_json::from_value(value)?,
            _ => Vec::new(),
        };
        let status = model.status.parse().map_err(|_| {
            RepositoryError::InvalidState(format!("unknown article status '{}'", model.status))
        })?;
        Ok(Self {
            id: model.id,
            title: model.title,
            content: model.content,
            summary: model.summary,
            url: model.url,
            source_name: model.source_name,
            author: model.author,
            published_at: model.published_at.map(Into::into),
            crawled_at: model.crawled_at.into(),
            updated_at: model.updated_at.into(),
            category: model.category,
            tags,
            image_url: model.image_url,
            status,
        })
    }
}

/// 写入除主键和URL外的全部字段，并刷新抓取时间
fn apply_fields(
    model: &mut article_entity::ActiveModel,
    article: &Article,
) -> Result<(), RepositoryError> {
    let now = Utc::now();
    model.title = Set(article.title.clone());
    model.content = Set(article.content.clone());
    model.summary = Set(article.summary.clone());
    model.source_name = Set(article.source_name.clone());
    model.author = Set(article.author.clone());
    model.published_at = Set(article.published_at.map(Into::into));
    model.crawled_at = Set(now.into());
    model.updated_at = Set(now.into());
    model.category = Set(article.category.clone());
    model.tags = Set(Some(serde_json::to_value(&article.tags)?));
    model.image_url = Set(article.image_url.clone());
    model.status = Set(article.status.to_string());
    Ok(())
}

#[async_trait]
impl ArticleRepository for ArticleRepositoryImpl {
    async fn upsert_by_url(&self, article: &Article) -> Result<UpsertOutcome, RepositoryError> {
        if let Some(existing) = self.find_model(&article.url).await? {
            self.overwrite(existing, article).await?;
            return Ok(UpsertOutcome::Updated);
        }

        let mut active = article_entity::ActiveModel {
            url: Set(article.url.clone()),
            ..Default::default()
        };
        apply_fields(&mut active, article)?;

        match active.insert(self.db.as_ref()).await {
            Ok(_) => Ok(UpsertOutcome::Inserted),
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                // 并发写入者先插入了同一URL
                debug!("Concurrent insert for {}, updating instead", article.url);
                let existing = self
                    .find_model(&article.url)
                    .await?
                    .ok_or(RepositoryError::NotFound)?;
                self.overwrite(existing, article).await?;
                Ok(UpsertOutcome::Updated)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_url(&self, url: &str) -> Result<Option<Article>, RepositoryError> {
        self.find_model(url).await?.map(Article::try_from).transpose()
    }

    async fn count_by_source(&self, source_name: &str) -> Result<u64, RepositoryError> {
        Ok(article_entity::Entity::find()
            .filter(article_entity::Column::SourceName.eq(source_name))
            .count(self.db.as_ref())
            .await?)
    }
}

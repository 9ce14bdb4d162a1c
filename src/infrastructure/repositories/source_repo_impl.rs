// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::selector::SelectorMap;
use crate::domain::models::source::Source;
use crate::domain::repositories::source_repository::SourceRepository;
use crate::domain::repositories::RepositoryError;
use crate::infrastructure::database::entities::source as source_entity;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;

/// 新闻源仓库实现
#[derive(Clone)]
pub struct SourceRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl SourceRepositoryImpl {
    /// 创建新的新闻源仓库实例
    ///
    /// # 参数
    ///
    /// * `db` - 数据库连接
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl TryFrom<source_entity::Model> for Source {
    type Error = RepositoryError;

    fn try_from(model: source_entity::Model) -> Result<Self, Self::Error> {
        let selectors = match model.selectors {
            Some(value) if !value.is_null() => serde_json::from_value(value)?,
            _ => SelectorMap::new(),
        };
        Ok(Self {
            id: model.id,
            name: model.name,
            url: model.url,
            enabled: model.enabled,
            rate_limit: model.rate_limit,
            retry_count: model.retry_count,
            timeout: model.timeout,
            selectors,
            rss_url: model.rss_url,
            sitemap_url: model.sitemap_url,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        })
    }
}

/// 把新闻源的可变字段写入实体
fn apply_fields(
    model: &mut source_entity::ActiveModel,
    source: &Source,
) -> Result<(), RepositoryError> {
    model.url = Set(source.url.clone());
    model.enabled = Set(source.enabled);
    model.rate_limit = Set(source.rate_limit);
    model.retry_count = Set(source.retry_count);
    model.timeout = Set(source.timeout);
    model.selectors = Set(Some(serde_json::to_value(&source.selectors)?));
    model.rss_url = Set(source.rss_url.clone());
    model.sitemap_url = Set(source.sitemap_url.clone());
    model.updated_at = Set(Utc::now().into());
    Ok(())
}

#[async_trait]
impl SourceRepository for SourceRepositoryImpl {
    async fn find_by_name(&self, name: &str) -> Result<Option<Source>, RepositoryError> {
        source_entity::Entity::find()
            .filter(source_entity::Column::Name.eq(name))
            .one(self.db.as_ref())
            .await?
            .map(Source::try_from)
            .transpose()
    }

    async fn upsert_by_name(&self, source: &Source) -> Result<Source, RepositoryError> {
        let existing = source_entity::Entity::find()
            .filter(source_entity::Column::Name.eq(source.name.as_str()))
            .one(self.db.as_ref())
            .await?;

        let saved = match existing {
            Some(model) => {
                let mut active: source_entity::ActiveModel = model.into();
                apply_fields(&mut active, source)?;
                active.update(self.db.as_ref()).await?
            }
            None => {
                let mut active = source_entity::ActiveModel {
                    name: Set(source.name.clone()),
                    created_at: Set(Utc::now().into()),
                    ..Default::default()
                };
                apply_fields(&mut active, source)?;
                active.insert(self.db.as_ref()).await?
            }
        };

        Source::try_from(saved)
    }

    async fn list(&self) -> Result<Vec<Source>, RepositoryError> {
        source_entity::Entity::find()
            .order_by_asc(source_entity::Column::Name)
            .all(self.db.as_ref())
            .await?
            .into_iter()
            .map(Source::try_from)
            .collect()
    }
}

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::RepositoryError;
use crate::domain::models::article::{Article, UpsertOutcome};
use async_trait::async_trait;

/// 文章仓库特质
#[async_trait]
pub trait ArticleRepository: Send + Sync {
    /// 按URL插入或更新文章
    ///
    /// 同一URL已存在时整体覆盖（后写者胜），并刷新 `crawled_at` 和 `updated_at`。
    ///
    /// # 参数
    ///
    /// * `article` - 提取得到的文章
    ///
    /// # 返回值
    ///
    /// * `Ok(UpsertOutcome::Inserted)` - 新插入
    /// * `Ok(UpsertOutcome::Updated)` - 覆盖了已有记录
    /// * `Err(RepositoryError)` - 写入失败
    async fn upsert_by_url(&self, article: &Article) -> Result<UpsertOutcome, RepositoryError>;

    /// 根据URL查找文章
    async fn find_by_url(&self, url: &str) -> Result<Option<Article>, RepositoryError>;

    /// 统计某新闻源的文章数
    async fn count_by_source(&self, source_name: &str) -> Result<u64, RepositoryError>;
}

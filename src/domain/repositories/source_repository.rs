// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::RepositoryError;
use crate::domain::models::source::Source;
use async_trait::async_trait;

/// 新闻源仓库特质
///
/// 编排器只通过 `find_by_name` 读取新闻源；`upsert_by_name` 仅供启动时的种子加载使用。
#[async_trait]
pub trait SourceRepository: Send + Sync {
    /// 根据名称查找新闻源
    ///
    /// # 参数
    ///
    /// * `name` - 新闻源唯一名称
    ///
    /// # 返回值
    ///
    /// * `Ok(Some(Source))` - 找到时返回新闻源（无论是否启用）
    /// * `Ok(None)` - 未找到
    /// * `Err(RepositoryError)` - 查询失败
    async fn find_by_name(&self, name: &str) -> Result<Option<Source>, RepositoryError>;

    /// 按名称插入或更新新闻源
    ///
    /// # 参数
    ///
    /// * `source` - 已通过校验的新闻源
    ///
    /// # 返回值
    ///
    /// * `Ok(Source)` - 写入后的新闻源（含数据库ID）
    /// * `Err(RepositoryError)` - 写入失败
    async fn upsert_by_name(&self, source: &Source) -> Result<Source, RepositoryError>;

    /// 列出全部新闻源
    async fn list(&self) -> Result<Vec<Source>, RepositoryError>;
}

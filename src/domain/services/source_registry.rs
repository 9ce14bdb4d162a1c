// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

use crate::domain::models::source::Source;
use crate::domain::repositories::source_repository::SourceRepository;
use crate::domain::repositories::RepositoryError;

/// 新闻源注册表
///
/// 以仓库为准、带并发内存缓存的新闻源读取入口。缓存同时保存已禁用的新闻源，
/// 是否启用在读取时判断。
pub struct SourceRegistry<SR> {
    repo: Arc<SR>,
    cache: DashMap<String, Source>,
}

impl<SR> SourceRegistry<SR>
where
    SR: SourceRepository + 'static,
{
    pub fn new(repo: Arc<SR>) -> Self {
        Self {
            repo,
            cache: DashMap::new(),
        }
    }

    /// 获取已启用的新闻源
    ///
    /// # 参数
    ///
    /// * `name` - 新闻源名称
    ///
    /// # 返回值
    ///
    /// * `Ok(Some(Source))` - 存在且已启用
    /// * `Ok(None)` - 不存在或已禁用
    /// * `Err(RepositoryError)` - 读取失败
    pub async fn get_enabled_source(&self, name: &str) -> Result<Option<Source>, RepositoryError> {
        if let Some(cached) = self.cache.get(name) {
            return Ok(Some(cached.clone()).filter(|s| s.enabled));
        }

        let Some(source) = self.repo.find_by_name(name).await? else {
            return Ok(None);
        };
        debug!("Caching source {}", name);
        self.cache.insert(name.to_string(), source.clone());
        Ok(Some(source).filter(|s| s.enabled))
    }

    /// 使单个新闻源的缓存失效
    pub fn invalidate(&self, name: &str) {
        self.cache.remove(name);
    }

    /// 清空缓存，下次读取时从仓库重新加载
    pub fn reload(&self) {
        self.cache.clear();
    }

    /// 当前缓存的新闻源数量
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}

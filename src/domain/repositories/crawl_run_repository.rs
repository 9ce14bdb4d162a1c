// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::RepositoryError;
use crate::domain::models::crawl_run::{CrawlRun, CrawlRunStatus, RunCounts};
use async_trait::async_trait;

/// 爬取运行仓库特质
///
/// 对应 `crawl_logs` 表。记录只追加和更新，从不删除。
#[async_trait]
pub trait CrawlRunRepository: Send + Sync {
    /// 创建一条状态为 `running` 的运行记录
    ///
    /// # 参数
    ///
    /// * `source_name` - 新闻源名称
    ///
    /// # 返回值
    ///
    /// * `Ok(CrawlRun)` - 带有生成ID和 `started_at` 的运行记录
    /// * `Err(RepositoryError)` - 创建失败
    async fn create_run(&self, source_name: &str) -> Result<CrawlRun, RepositoryError>;

    /// 刷新运行计数
    ///
    /// # 参数
    ///
    /// * `run_id` - 运行ID
    /// * `counts` - 当前累计计数（整体覆盖，非增量）
    ///
    /// # 返回值
    ///
    /// * `Ok(())` - 刷新成功
    /// * `Err(RepositoryError::NotFound)` - 运行不存在
    async fn update_counts(&self, run_id: i32, counts: RunCounts) -> Result<(), RepositoryError>;

    /// 终结运行
    ///
    /// 只有 `running` 状态的运行可以被终结；写入终态、`finished_at`、最终计数和错误详情。
    ///
    /// # 参数
    ///
    /// * `run_id` - 运行ID
    /// * `status` - 终态
    /// * `counts` - 最终计数
    /// * `error_details` - 结构化错误详情
    ///
    /// # 返回值
    ///
    /// * `Ok(CrawlRun)` - 终结后的运行记录
    /// * `Err(RepositoryError::InvalidState)` - 运行已处于终态或目标状态不是终态
    /// * `Err(RepositoryError::NotFound)` - 运行不存在
    async fn finalize(
        &self,
        run_id: i32,
        status: CrawlRunStatus,
        counts: RunCounts,
        error_details: Option<serde_json::Value>,
    ) -> Result<CrawlRun, RepositoryError>;

    /// 根据ID查找运行
    async fn get_run(&self, run_id: i32) -> Result<Option<CrawlRun>, RepositoryError>;

    /// 按开始时间倒序列出运行
    ///
    /// # 参数
    ///
    /// * `source_name` - 可选的新闻源过滤
    /// * `limit` - 最大返回条数
    async fn list_runs(
        &self,
        source_name: Option<&str>,
        limit: u64,
    ) -> Result<Vec<CrawlRun>, RepositoryError>;

    /// 某新闻源最近一次 `completed` 或 `partial` 的运行，增量模式用它确定时间下限
    ///
    /// `failed` 的运行没有写入任何文章，不能推进时间下限
    async fn latest_successful(&self, source_name: &str)
        -> Result<Option<CrawlRun>, RepositoryError>;

    /// 将所有遗留的 `running` 运行标记为失败
    ///
    /// # 参数
    ///
    /// * `error_details` - 写入每条遗留运行的错误详情
    ///
    /// # 返回值
    ///
    /// * `Ok(u64)` - 被标记的运行数量
    async fn fail_orphaned_runs(
        &self,
        error_details: serde_json::Value,
    ) -> Result<u64, RepositoryError>;
}

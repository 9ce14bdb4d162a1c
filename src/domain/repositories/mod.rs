// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm::DbErr;
use thiserror::Error;

/// 仓库接口模块
///
/// 该模块定义了领域层的仓库接口，具体实现由基础设施层提供。
///
/// 包含的仓库接口：
/// - 新闻源仓库（source_repository）：读取与按名称写入新闻源配置
/// - 爬取运行仓库（crawl_run_repository）：爬取运行日志的创建、计数刷新与终结
/// - 文章仓库（article_repository）：按URL去重写入文章
pub mod article_repository;
pub mod crawl_run_repository;
pub mod source_repository;

/// 仓库操作错误
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// 数据库错误
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    /// 记录未找到
    #[error("Record not found")]
    NotFound,
    /// 状态不允许该操作
    #[error("Invalid state: {0}")]
    InvalidState(String),
    /// 数据序列化错误
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 爬取运行记录
///
/// 对某个新闻源的一次爬取尝试，既是审计日志，也是调用方轮询的唯一状态来源。
/// 状态为 `running` 时 `finished_at` 必为空；一旦设置，状态必为终态。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlRun {
    /// 运行ID
    pub id: i32,
    /// 新闻源名称（弱引用）
    pub source_name: String,
    /// 开始时间
    pub started_at: DateTime<Utc>,
    /// 结束时间
    pub finished_at: Option<DateTime<Utc>>,
    /// 已处理的候选文章数
    pub articles_found: i32,
    /// 新插入的文章数
    pub articles_new: i32,
    /// 已更新的文章数
    pub articles_updated: i32,
    /// 失败的URL数
    pub errors: i32,
    /// 运行状态
    pub status: CrawlRunStatus,
    /// 结构化错误详情
    pub error_details: Option<serde_json::Value>,
}

impl CrawlRun {
    /// 当前计数快照
    pub fn counts(&self) -> RunCounts {
        RunCounts {
            found: self.articles_found,
            new: self.articles_new,
            updated: self.articles_updated,
            errors: self.errors,
        }
    }
}

/// 爬取运行状态
///
/// 状态转换: Running → Completed/Partial/Failed，终态之间不可再转换
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CrawlRunStatus {
    /// 运行中
    #[default]
    Running,
    /// 全部成功
    Completed,
    /// 全部失败或基础设施故障
    Failed,
    /// 部分失败
    Partial,
}

impl CrawlRunStatus {
    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CrawlRunStatus::Running)
    }

    /// 根据计数推导终态
    ///
    /// errors == 0 → completed；0 < errors < found → partial；
    /// errors >= found 且 found > 0 → failed
    pub fn from_counts(counts: &RunCounts) -> Self {
        if counts.errors == 0 {
            CrawlRunStatus::Completed
        } else if counts.errors < counts.found {
            CrawlRunStatus::Partial
        } else {
            CrawlRunStatus::Failed
        }
    }
}

impl fmt::Display for CrawlRunStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CrawlRunStatus::Running => write!(f, "running"),
            CrawlRunStatus::Completed => write!(f, "completed"),
            CrawlRunStatus::Failed => write!(f, "failed"),
            CrawlRunStatus::Partial => write!(f, "partial"),
        }
    }
}

impl FromStr for CrawlRunStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(CrawlRunStatus::Running),
            "completed" => Ok(CrawlRunStatus::Completed),
            "failed" => Ok(CrawlRunStatus::Failed),
            "partial" => Ok(CrawlRunStatus::Partial),
            _ => Err(()),
        }
    }
}

/// 运行计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounts {
    pub found: i32,
    pub new: i32,
    pub updated: i32,
    pub errors: i32,
}

/// 爬取模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CrawlMode {
    /// 只抓取最近的条目
    #[default]
    Incremental,
    /// 抓取全部可枚举的条目
    Full,
}

impl CrawlMode {
    /// 单次运行处理的条目数硬上限，配置只能调低
    pub fn max_items(self) -> usize {
        match self {
            CrawlMode::Incremental => 1000,
            CrawlMode::Full => 10_000,
        }
    }
}

impl fmt::Display for CrawlMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CrawlMode::Incremental => write!(f, "incremental"),
            CrawlMode::Full => write!(f, "full"),
        }
    }
}

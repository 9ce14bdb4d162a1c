// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::Deserialize;
use validator::Validate;

/// 未指定时返回的运行日志条数
pub const DEFAULT_LOG_LIMIT: u64 = 20;

/// 运行日志列表查询参数
#[derive(Debug, Default, Deserialize, Validate)]
pub struct CrawlLogQueryDto {
    /// 按新闻源过滤
    pub source_name: Option<String>,
    /// 返回条数，1..=100
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<u64>,
}

impl CrawlLogQueryDto {
    pub fn limit(&self) -> u64 {
        self.limit.unwrap_or(DEFAULT_LOG_LIMIT)
    }
}

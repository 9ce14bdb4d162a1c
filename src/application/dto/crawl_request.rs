// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::models::crawl_run::CrawlMode;

/// 启动爬取请求
#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct StartCrawlRequestDto {
    #[validate(length(min = 1, max = 100))]
    pub source_name: String,
    #[serde(default)]
    pub mode: CrawlMode,
}

/// 启动爬取响应
#[derive(Debug, Serialize, Deserialize)]
pub struct StartCrawlResponseDto {
    pub status: String,
    pub log_id: i32,
    pub source_name: String,
    pub mode: CrawlMode,
    pub message: String,
    pub started_at: DateTime<Utc>,
}

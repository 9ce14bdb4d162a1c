// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 文章实体
///
/// 从新闻源抓取并提取得到的文章，以 URL 作为去重键。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// 数据库主键，新建时为0
    pub id: i32,
    /// 标题
    pub title: String,
    /// 正文
    pub content: String,
    /// 摘要
    pub summary: Option<String>,
    /// 规范化后的文章URL，全局唯一
    pub url: String,
    /// 来源新闻源名称
    pub source_name: String,
    /// 作者
    pub author: Option<String>,
    /// 发布时间
    pub published_at: Option<DateTime<Utc>>,
    /// 最近一次抓取时间
    pub crawled_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// 分类
    pub category: Option<String>,
    /// 标签
    pub tags: Vec<String>,
    /// 封面图
    pub image_url: Option<String>,
    pub status: ArticleStatus,
}

/// 文章状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ArticleStatus {
    #[default]
    Active,
    Archived,
}

impl fmt::Display for ArticleStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ArticleStatus::Active => write!(f, "active"),
            ArticleStatus::Archived => write!(f, "archived"),
        }
    }
}

impl FromStr for ArticleStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ArticleStatus::Active),
            "archived" => Ok(ArticleStatus::Archived),
            _ => Err(()),
        }
    }
}

/// 按URL写入文章的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// 新插入
    Inserted,
    /// 覆盖了已有记录
    Updated,
}

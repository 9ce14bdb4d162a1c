// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use super::selector::{validate_selectors, SelectorError, SelectorMap};

/// 新闻源配置校验错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceValidationError {
    #[error("source name must not be empty")]
    EmptyName,
    #[error("source '{name}': {field} must be a positive integer")]
    NonPositive { name: String, field: &'static str },
    #[error("source '{name}': invalid url '{url}'")]
    InvalidUrl { name: String, url: String },
    #[error("source '{name}': {source}")]
    Selector {
        name: String,
        #[source]
        source: SelectorError,
    },
}

/// 新闻源实体
///
/// 一个带有抓取策略（速率、重试、超时、选择器）的新闻来源。
/// 对爬取编排器只读。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    /// 数据库主键，新建时为0
    #[serde(default)]
    pub id: i32,
    /// 唯一名称
    pub name: String,
    /// 站点首页
    pub url: String,
    /// 是否启用
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// 每秒请求数
    #[serde(default = "default_rate_limit")]
    pub rate_limit: i32,
    /// 单个URL的重试次数
    #[serde(default = "default_retry_count")]
    pub retry_count: i32,
    /// 单次请求超时（秒）
    #[serde(default = "default_timeout")]
    pub timeout: i32,
    /// 字段提取规则
    #[serde(default)]
    pub selectors: SelectorMap,
    /// RSS/Atom 地址
    #[serde(default)]
    pub rss_url: Option<String>,
    /// Sitemap 地址
    #[serde(default)]
    pub sitemap_url: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

fn default_enabled() -> bool {
    true
}

fn default_rate_limit() -> i32 {
    1
}

fn default_retry_count() -> i32 {
    3
}

fn default_timeout() -> i32 {
    30
}

impl Source {
    /// 校验新闻源配置
    ///
    /// 在新闻源创建或更新时调用，保证进入注册表的配置都可直接用于爬取
    pub fn validate(&self) -> Result<(), SourceValidationError> {
        if self.name.trim().is_empty() {
            return Err(SourceValidationError::EmptyName);
        }

        for (field, value) in [
            ("rate_limit", self.rate_limit),
            ("retry_count", self.retry_count),
            ("timeout", self.timeout),
        ] {
            if value <= 0 {
                return Err(SourceValidationError::NonPositive {
                    name: self.name.clone(),
                    field,
                });
            }
        }

        let urls = std::iter::once(&self.url)
            .chain(self.rss_url.iter())
            .chain(self.sitemap_url.iter());
        for url in urls {
            match Url::parse(url) {
                Ok(parsed) if parsed.scheme() == "http" || parsed.scheme() == "https" => {}
                _ => {
                    return Err(SourceValidationError::InvalidUrl {
                        name: self.name.clone(),
                        url: url.clone(),
                    })
                }
            }
        }

        validate_selectors(&self.selectors).map_err(|source| SourceValidationError::Selector {
            name: self.name.clone(),
            source,
        })
    }

    /// 两次请求之间的最小间隔 = 1 / rate_limit
    pub fn min_request_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.rate_limit.max(1)))
    }

    /// 单次请求超时
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout.max(1) as u64)
    }

    /// 单个URL的最大重试次数
    pub fn max_retries(&self) -> u32 {
        self.retry_count.max(0) as u32
    }
}

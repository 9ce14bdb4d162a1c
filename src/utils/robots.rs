// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use robotstxt::DefaultMatcher;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

use crate::utils::retry_policy::RetryPolicy;

/// robots.txt 缓存有效期
const ROBOTS_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Robots.txt检查器接口
#[async_trait]
pub trait RobotsCheckerTrait: Send + Sync {
    /// 检查URL是否被允许访问
    async fn is_allowed(&self, url_str: &str, user_agent: &str) -> Result<bool>;
    /// 获取爬取延迟
    async fn get_crawl_delay(&self, url_str: &str, user_agent: &str) -> Result<Option<Duration>>;
}

/// 缓存的Robots.txt内容
#[derive(Clone)]
struct CachedRobots {
    content: String,
    expires_at: Instant,
}

/// Robots.txt检查器
///
/// 按来源（scheme + host + port）缓存 robots.txt 内容。抓取失败或非 2xx 响应时视为允许全部。
#[derive(Clone)]
pub struct RobotsChecker {
    /// HTTP客户端
    client: Client,
    /// 内存缓存
    memory_cache: Arc<Mutex<HashMap<String, CachedRobots>>>,
    /// 重试策略
    retry_policy: RetryPolicy,
    /// 是否拒绝访问私有网络地址
    block_private_networks: bool,
}

#[async_trait]
impl RobotsCheckerTrait for RobotsChecker {
    async fn is_allowed(&self, url_str: &str, user_agent: &str) -> Result<bool> {
        let content = self.get_robots_content(url_str, user_agent).await?;
        let mut matcher = DefaultMatcher::default();
        Ok(matcher.one_agent_allowed_by_robots(&content, product_token(user_agent), url_str))
    }

    async fn get_crawl_delay(&self, url_str: &str, user_agent: &str) -> Result<Option<Duration>> {
        let content = self.get_robots_content(url_str, user_agent).await?;
        Ok(parse_crawl_delay(&content, product_token(user_agent)))
    }
}

impl RobotsChecker {
    /// 创建新的Robots检查器实例
    ///
    /// # 参数
    ///
    /// * `client` - 共享的HTTP客户端
    /// * `block_private_networks` - 是否对 robots.txt 地址执行私有网络校验
    pub fn new(client: Client, block_private_networks: bool) -> Self {
        Self {
            client,
            memory_cache: Arc::new(Mutex::new(HashMap::new())),
            retry_policy: RetryPolicy {
                max_retries: 2,
                initial_backoff: Duration::from_millis(500),
                max_backoff: Duration::from_secs(5),
                ..Default::default()
            },
            block_private_networks,
        }
    }

    /// 获取Robots.txt内容（带缓存）
    async fn get_robots_content(&self, url_str: &str, user_agent: &str) -> Result<String> {
        let url = Url::parse(url_str)?;
        let host = url
            .host_str()
            .ok_or_else(|| anyhow::anyhow!("Invalid URL: {}", url_str))?;
        let port = url.port_or_known_default().unwrap_or(80);
        let robots_url = format!("{}://{}:{}/robots.txt", url.scheme(), host, port);

        {
            let mut cache = self.memory_cache.lock();
            if let Some(cached) = cache.get(&robots_url) {
                if cached.expires_at > Instant::now() {
                    return Ok(cached.content.clone());
                }
                cache.remove(&robots_url);
            }
        }

        if self.block_private_networks {
            crate::engines::validators::validate_url(&robots_url).await?;
        }

        let mut attempt = 0;
        let mut content = String::new();
        loop {
            let response = self
                .client
                .get(&robots_url)
                .header(reqwest::header::USER_AGENT, user_agent)
                .timeout(Duration::from_secs(10))
                .send()
                .await;

            let retryable = match response {
                Ok(resp) if resp.status().is_success() => {
                    content = resp.text().await.unwrap_or_default();
                    break;
                }
                Ok(resp) => {
                    // 4xx 表示没有可用的 robots.txt
                    if !resp.status().is_server_error() {
                        break;
                    }
                    tracing::debug!("robots.txt {} returned {}", robots_url, resp.status());
                    true
                }
                Err(e) => {
                    tracing::debug!("robots.txt {} request failed: {}", robots_url, e);
                    true
                }
            };

            if !retryable || !self.retry_policy.should_retry(attempt) {
                tracing::warn!("Failed to fetch {}, allowing all paths", robots_url);
                break;
            }
            attempt += 1;
            tokio::time::sleep(self.retry_policy.calculate_backoff(attempt)).await;
        }

        self.memory_cache.lock().insert(
            robots_url,
            CachedRobots {
                content: content.clone(),
                expires_at: Instant::now() + ROBOTS_CACHE_TTL,
            },
        );

        Ok(content)
    }
}

/// 从 User-Agent 中取出产品标识，例如 `news-crawler/0.1 (...)` → `news-crawler`
fn product_token(user_agent: &str) -> &str {
    user_agent
        .split(|c: char| c == '/' || c.is_whitespace())
        .next()
        .filter(|token| !token.is_empty())
        .unwrap_or(user_agent)
}

/// 解析Crawl-delay指令
///
/// 优先使用与 User-Agent 匹配的分组，否则使用 `*` 分组
fn parse_crawl_delay(content: &str, user_agent: &str) -> Option<Duration> {
    let agent_lower = user_agent.to_lowercase();
    let mut current_agent_matched = false;
    let mut specific_agent_found = false;
    let mut delay: Option<f64> = None;

    for line in content.lines() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }

        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_lowercase();
        let value = value.trim();

        if key == "user-agent" {
            if value == "*" {
                current_agent_matched = !specific_agent_found;
            } else if agent_lower.contains(&value.to_lowercase()) {
                if !specific_agent_found {
                    delay = None;
                }
                current_agent_matched = true;
                specific_agent_found = true;
            } else {
                current_agent_matched = false;
            }
        } else if key == "crawl-delay" && current_agent_matched {
            if let Ok(d) = value.parse::<f64>() {
                if d.is_finite() && d >= 0.0 {
                    delay = Some(d);
                }
            }
        }
    }

    delay.map(Duration::from_secs_f64)
}

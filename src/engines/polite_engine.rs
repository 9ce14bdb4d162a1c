// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::engines::traits::{EngineError, ScrapeRequest, ScrapeResponse, ScraperEngine};
use crate::utils::retry_policy::RetryPolicy;

/// 带限速和重试的抓取引擎包装
///
/// 每次请求（包括重试）都先等待限速器放行；可重试的错误按退避策略重试，
/// 重试耗尽后返回最后一次的错误。
pub struct PoliteEngine {
    inner: Arc<dyn ScraperEngine>,
    limiter: DefaultDirectRateLimiter,
    retry_policy: RetryPolicy,
}

impl PoliteEngine {
    /// 创建包装引擎
    ///
    /// # 参数
    ///
    /// * `inner` - 实际执行请求的引擎
    /// * `min_interval` - 两次请求之间的最小间隔，突发量为1
    /// * `retry_policy` - 重试策略
    pub fn new(
        inner: Arc<dyn ScraperEngine>,
        min_interval: Duration,
        retry_policy: RetryPolicy,
    ) -> Self {
        let quota = Quota::with_period(min_interval)
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::MAX));
        Self {
            inner,
            limiter: RateLimiter::direct(quota),
            retry_policy,
        }
    }

    /// 等待限速器放行
    async fn wait_for_permit(&self) {
        self.limiter.until_ready().await;
    }
}

#[async_trait]
impl ScraperEngine for PoliteEngine {
    async fn scrape(&self, request: &ScrapeRequest) -> Result<ScrapeResponse, EngineError> {
        let mut attempt = 0;
        loop {
            self.wait_for_permit().await;

            match self.inner.scrape(request).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && self.retry_policy.should_retry(attempt) => {
                    attempt += 1;
                    let backoff = self.retry_policy.calculate_backoff(attempt);
                    debug!(
                        "Retrying {} ({}/{}) in {:?} after: {}",
                        request.url, attempt, self.retry_policy.max_retries, backoff, e
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => {
                    if attempt > 0 {
                        warn!(
                            "Giving up on {} after {} retries: {}",
                            request.url, attempt, e
                        );
                    }
                    return Err(e);
                }
            }
        }
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

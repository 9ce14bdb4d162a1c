// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::time::Duration;

use crate::config::settings::CrawlerSettings;

/// 重试策略配置
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 最大重试次数（不含首次请求）
    pub max_retries: u32,
    /// 初始退避时间
    pub initial_backoff: Duration,
    /// 最大退避时间
    pub max_backoff: Duration,
    /// 退避乘数
    pub backoff_multiplier: f64,
    /// 抖动因子 (0.0-1.0)
    pub jitter_factor: f64,
    /// 是否启用抖动
    pub enable_jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
            enable_jitter: true,
        }
    }
}

impl RetryPolicy {
    /// 根据爬虫配置和新闻源的重试次数创建策略
    ///
    /// # 参数
    ///
    /// * `settings` - 爬虫配置，提供退避时间范围
    /// * `max_retries` - 新闻源配置的重试次数
    pub fn for_source(settings: &CrawlerSettings, max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_backoff: Duration::from_millis(settings.retry_initial_backoff_ms),
            max_backoff: Duration::from_millis(settings.retry_max_backoff_ms),
            ..Self::default()
        }
    }

    /// 计算第 `attempt` 次重试前的退避时间（attempt 从1开始）
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        // 计算指数退避
        let backoff_secs = self.initial_backoff.as_secs_f64()
            * self.backoff_multiplier.powi(attempt.max(1) as i32 - 1);

        // 限制最大退避时间
        let capped_backoff = backoff_secs.min(self.max_backoff.as_secs_f64());

        // 添加抖动
        let final_backoff = if self.enable_jitter && self.jitter_factor > 0.0 && capped_backoff > 0.0
        {
            let jitter_range = capped_backoff * self.jitter_factor;
            let jitter = rand::random_range(-jitter_range..jitter_range);
            (capped_backoff + jitter).max(0.0)
        } else {
            capped_backoff
        };

        Duration::from_secs_f64(final_backoff)
    }

    /// 是否应该重试
    ///
    /// # 参数
    ///
    /// * `attempt` - 已经进行过的重试次数
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }
}

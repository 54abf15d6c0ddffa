// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::time::Duration;

/// 重试策略配置
///
/// 退避时间只依赖于重试次数：`delay(n) = min(initial * multiplier^(n-1), max)`。
/// 抖动作为独立的一步施加，抖动样本由调用方提供，便于测试。
/// 重试次数上限由 `FetchOptions::max_retries` 决定。
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// 初始退避时间
    pub initial_backoff: Duration,
    /// 最大退避时间
    pub max_backoff: Duration,
    /// 退避乘数
    pub backoff_multiplier: f64,
    /// 抖动因子 (0.0-1.0)
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

impl RetryPolicy {
    /// 创建标准重试策略
    pub fn standard() -> Self {
        Self::default()
    }

    /// 创建快速重试策略（测试与本地调试使用）
    pub fn fast() -> Self {
        Self {
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(100),
            backoff_multiplier: 2.0,
            jitter_factor: 0.0,
        }
    }

    /// 第 `attempt` 次重试前的退避时间（不含抖动）
    ///
    /// `attempt` 从 1 开始；0 视为 1。
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.max(1) - 1;
        let backoff_secs = self.initial_backoff.as_secs_f64()
            * self.backoff_multiplier.powi(exponent.min(i32::MAX as u32) as i32);

        // 限制最大退避时间
        let capped = backoff_secs.min(self.max_backoff.as_secs_f64());
        Duration::from_secs_f64(capped.max(0.0))
    }

    /// 施加抖动后的退避时间
    ///
    /// `sample` 取值范围 [-1.0, 1.0]，超出范围会被截断。
    pub fn jittered_delay(&self, attempt: u32, sample: f64) -> Duration {
        let base = self.delay(attempt).as_secs_f64();
        let jitter = base * self.jitter_factor * sample.clamp(-1.0, 1.0);
        Duration::from_secs_f64((base + jitter).max(0.0))
    }

    /// 计算下次重试的退避时间（使用随机抖动）
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        if self.jitter_factor <= 0.0 {
            return self.delay(attempt);
        }
        self.jittered_delay(attempt, rand::random_range(-1.0..=1.0))
    }
}

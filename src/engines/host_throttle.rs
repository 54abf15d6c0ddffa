// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::utils::errors::FetchError;
use dashmap::DashMap;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// 单个主机的闸门：并发信号量 + 最小请求间隔
struct HostGate {
    semaphore: Arc<Semaphore>,
    limiter: Option<DefaultDirectRateLimiter>,
}

/// 每主机并发与速率限制器
///
/// 为每个主机提供一个独立的并发信号量与令牌桶，限制同时进行的请求数
/// 以及相邻请求的最小间隔。状态属于单次运行。
#[derive(Clone)]
pub struct HostThrottle {
    gates: Arc<DashMap<String, Arc<HostGate>>>,
    /// 每个主机的并发许可数
    permits_per_host: usize,
}

impl HostThrottle {
    /// 创建一个新的HostThrottle实例
    ///
    /// # 参数
    ///
    /// * `permits_per_host` - 每个主机的并发许可数（至少为1）
    pub fn new(permits_per_host: usize) -> Self {
        Self {
            gates: Arc::new(DashMap::new()),
            permits_per_host: permits_per_host.max(1),
        }
    }

    /// 获取指定主机的请求许可
    ///
    /// 先占用并发许可，再等待速率限制。主机的最小间隔在首次请求时确定。
    ///
    /// # 参数
    ///
    /// * `host` - 主机键
    /// * `min_interval` - 同一主机相邻请求的最小间隔，为0时不限速
    ///
    /// # 返回值
    ///
    /// 返回一个信号量许可，释放后其他请求才能继续
    pub async fn acquire(
        &self,
        host: &str,
        min_interval: Duration,
    ) -> Result<OwnedSemaphorePermit, FetchError> {
        let gate = self.get_or_create(host, min_interval);
        let permit = Arc::clone(&gate.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| FetchError::Network(format!("host throttle closed for {}", host)))?;
        if let Some(limiter) = &gate.limiter {
            limiter.until_ready().await;
        }
        Ok(permit)
    }

    /// 当前可用的并发许可数（未知主机返回满额）
    pub fn available_permits(&self, host: &str) -> usize {
        self.gates
            .get(host)
            .map(|gate| gate.semaphore.available_permits())
            .unwrap_or(self.permits_per_host)
    }

    fn get_or_create(&self, host: &str, min_interval: Duration) -> Arc<HostGate> {
        self.gates
            .entry(host.to_string())
            .or_insert_with(|| {
                Arc::new(HostGate {
                    semaphore: Arc::new(Semaphore::new(self.permits_per_host)),
                    limiter: Quota::with_period(min_interval).map(RateLimiter::direct),
                })
            })
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_permits_are_per_host() {
        let throttle = HostThrottle::new(1);

        let _a = throttle.acquire("a.example", Duration::ZERO).await.unwrap();
        assert_eq!(throttle.available_permits("a.example"), 0);
        assert_eq!(throttle.available_permits("b.example"), 1);

        let _b = throttle.acquire("b.example", Duration::ZERO).await.unwrap();
        assert_eq!(throttle.available_permits("b.example"), 0);
    }

    #[tokio::test]
    async fn test_permit_released_on_drop() {
        let throttle = HostThrottle::new(2);
        {
            let _p = throttle.acquire("a.example", Duration::ZERO).await.unwrap();
            assert_eq!(throttle.available_permits("a.example"), 1);
        }
        assert_eq!(throttle.available_permits("a.example"), 2);
    }

    #[tokio::test]
    async fn test_min_interval_is_enforced() {
        let throttle = HostThrottle::new(4);
        let interval = Duration::from_millis(60);

        let start = Instant::now();
        for _ in 0..3 {
            let _p = throttle.acquire("a.example", interval).await.unwrap();
        }

        // first request is immediate, the next two wait one interval each
        assert!(start.elapsed() >= Duration::from_millis(110));
    }
}

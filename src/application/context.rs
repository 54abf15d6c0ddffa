// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::repositories::alias_repository::AliasTable;
use crate::domain::services::normalizer::Normalizer;
use crate::engines::host_throttle::HostThrottle;
use crate::utils::racing_formats::uk_local_time;
use chrono::{NaiveDateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// 运行级取消信号
///
/// 可以在运行开始前交给信号处理器，克隆后共享同一个标志。
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// 停止调度新的抓取，已在进行的抓取会完成或超时
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// 单次运行的全部状态
///
/// 抓取序号、取消标志、当前时间、别名缓存与限速状态都属于一次运行，
/// 不存在进程级的全局状态。
pub struct RunContext {
    pub run_id: Uuid,
    cancel: CancelHandle,
    seq: AtomicU64,
    as_of: Option<NaiveDateTime>,
    pub throttle: HostThrottle,
    pub normalizer: Normalizer,
}

impl RunContext {
    /// 创建运行上下文
    ///
    /// # 参数
    ///
    /// * `aliases` - 别名表协作者
    /// * `per_host_concurrency` - 每个主机的并发请求数
    /// * `as_of` - 固定的英国本地时间，`None` 时使用系统时钟
    /// * `cancel` - 取消信号
    pub fn new(
        aliases: Arc<dyn AliasTable>,
        per_host_concurrency: usize,
        as_of: Option<NaiveDateTime>,
        cancel: CancelHandle,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            cancel,
            seq: AtomicU64::new(0),
            as_of,
            throttle: HostThrottle::new(per_host_concurrency),
            normalizer: Normalizer::new(aliases),
        }
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// 下一个页面抓取序号，从1开始
    pub fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// 当前英国本地时间
    pub fn as_of(&self) -> NaiveDateTime {
        self.as_of.unwrap_or_else(|| uk_local_time(Utc::now()))
    }
}

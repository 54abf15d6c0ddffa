// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 错误分类标签
///
/// 写入运行报告与指标标签时使用的稳定短名称。
pub trait ErrorKind {
    fn kind(&self) -> &'static str;
}

/// 页面抓取错误
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchError {
    #[error("请求超时 ({timeout_ms}ms)")]
    Timeout { timeout_ms: u64 },

    #[error("HTTP状态码异常: {0}")]
    HttpStatus(u16),

    #[error("请求被拦截: {0}")]
    Blocked(String),

    #[error("网络错误: {0}")]
    Network(String),

    #[error("无效URL: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// 是否值得重试
    ///
    /// 429/503、被拦截、超时和连接层错误可以重试；其余状态码与无效URL不重试。
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::HttpStatus(status) => matches!(status, 429 | 503),
            FetchError::Blocked(_) | FetchError::Timeout { .. } | FetchError::Network(_) => true,
            FetchError::InvalidUrl(_) => false,
        }
    }
}

impl ErrorKind for FetchError {
    fn kind(&self) -> &'static str {
        match self {
            FetchError::Timeout { .. } => "timeout",
            FetchError::HttpStatus(_) => "http_status",
            FetchError::Blocked(_) => "blocked",
            FetchError::Network(_) => "network",
            FetchError::InvalidUrl(_) => "invalid_url",
        }
    }
}

/// 页面解析错误
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseError {
    #[error("缺少必需字段: {0}")]
    MissingField(String),

    #[error("页面结构不符合预期: {0}")]
    UnexpectedLayout(String),
}

impl ErrorKind for ParseError {
    fn kind(&self) -> &'static str {
        match self {
            ParseError::MissingField(_) => "missing_field",
            ParseError::UnexpectedLayout(_) => "unexpected_layout",
        }
    }
}

/// 存储层错误
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageError {
    #[error("存储冲突: {0}")]
    Conflict(String),

    #[error("存储不可用: {0}")]
    Unavailable(String),
}

impl ErrorKind for StorageError {
    fn kind(&self) -> &'static str {
        match self {
            StorageError::Conflict(_) => "conflict",
            StorageError::Unavailable(_) => "unavailable",
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Unavailable(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Unavailable(format!("文档序列化失败: {}", err))
    }
}

/// 对账拒绝原因
///
/// 被拒绝的记录会写入计划的拒绝列表，不会被应用。
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReconcileError {
    #[error("赛果引用了未知参赛马: {0}")]
    UnknownRunner(String),

    #[error("记录所属的赛会既未存储也未写入: {0}")]
    UnknownMeeting(String),

    #[error("赛事尚未开赛，不能写入赛果: {0}")]
    ResultBeforeOff(String),

    #[error("赛事已开赛，不能新增参赛马: {0}")]
    RunnerAfterOff(String),
}

impl ErrorKind for ReconcileError {
    fn kind(&self) -> &'static str {
        match self {
            ReconcileError::UnknownRunner(_) => "unknown_runner",
            ReconcileError::UnknownMeeting(_) => "unknown_meeting",
            ReconcileError::ResultBeforeOff(_) => "result_before_off",
            ReconcileError::RunnerAfterOff(_) => "runner_after_off",
        }
    }
}

/// 编排层错误（整次运行失败）
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrchestrationError {
    #[error("没有任何赛程页面被成功抓取和解析")]
    NoSchedule,

    #[error("无效的日期范围: {start} > {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
}

impl ErrorKind for OrchestrationError {
    fn kind(&self) -> &'static str {
        match self {
            OrchestrationError::NoSchedule => "no_schedule",
            OrchestrationError::InvalidDateRange { .. } => "invalid_date_range",
        }
    }
}

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::utils::errors::ErrorKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// 运行状态
///
/// 状态转换遵循以下流程：
/// Scheduled → FetchingSchedule → FetchingMeetings → FetchingRaces → Reconciling → Completed
///
/// `Failed` 只会因编排层错误产生。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    #[default]
    Scheduled,
    FetchingSchedule,
    FetchingMeetings,
    FetchingRaces,
    Reconciling,
    Completed,
    Failed,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed | RunState::Failed)
    }

    /// 检查状态转换是否合法
    pub fn can_transition_to(&self, next: RunState) -> bool {
        use RunState::*;
        match (self, next) {
            (Scheduled, FetchingSchedule)
            | (FetchingSchedule, FetchingMeetings)
            | (FetchingMeetings, FetchingRaces)
            | (FetchingRaces, Reconciling)
            | (Reconciling, Completed) => true,
            (current, Failed) => !current.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let label = match self {
            RunState::Scheduled => "scheduled",
            RunState::FetchingSchedule => "fetching_schedule",
            RunState::FetchingMeetings => "fetching_meetings",
            RunState::FetchingRaces => "fetching_races",
            RunState::Reconciling => "reconciling",
            RunState::Completed => "completed",
            RunState::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// 失败发生的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Fetch,
    Parse,
    Reconcile,
    Storage,
}

/// 单条失败记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub url: String,
    pub stage: FailureStage,
    pub kind: String,
    pub message: String,
}

impl FailureRecord {
    pub fn new<E>(url: impl Into<String>, stage: FailureStage, error: &E) -> Self
    where
        E: ErrorKind + fmt::Display,
    {
        Self {
            url: url.into(),
            stage,
            kind: error.kind().to_string(),
            message: error.to_string(),
        }
    }
}

/// 运行计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounts {
    pub fetched: usize,
    pub parsed: usize,
    pub upserted: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// 一次流水线运行的报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeRun {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub state: RunState,
    pub counts: RunCounts,
    /// 计划已应用且所有页面成功的赛会数
    pub meetings_reconciled: usize,
    /// 计划已应用但至少一个页面失败的赛会数
    pub meetings_partial: usize,
    pub cancelled: bool,
    /// 仅 `Failed` 状态下存在
    pub fatal_error: Option<String>,
    pub failures: Vec<FailureRecord>,
}

impl ScrapeRun {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
            ended_at: None,
            state: RunState::Scheduled,
            counts: RunCounts::default(),
            meetings_reconciled: 0,
            meetings_partial: 0,
            cancelled: false,
            fatal_error: None,
            failures: Vec::new(),
        }
    }

    /// 推进到下一个状态，非法转换会被忽略并返回 `false`
    pub fn advance(&mut self, next: RunState) -> bool {
        if !self.state.can_transition_to(next) {
            return false;
        }
        self.state = next;
        if next.is_terminal() {
            self.ended_at = Some(Utc::now());
        }
        true
    }

    pub fn record_failure(&mut self, failure: FailureRecord) {
        self.counts.failed += 1;
        self.failures.push(failure);
    }

    pub fn fail(&mut self, error: &impl fmt::Display) {
        self.fatal_error = Some(error.to_string());
        self.advance(RunState::Failed);
    }
}

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::keys::MeetingKey;
use super::meeting::Meeting;
use super::observed::FieldChange;
use super::race::Race;
use super::race_result::RaceResult;
use super::runner::Runner;
use crate::utils::errors::ReconcileError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 写入动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertAction {
    Insert,
    Update,
    Skip,
}

impl fmt::Display for UpsertAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            UpsertAction::Insert => write!(f, "insert"),
            UpsertAction::Update => write!(f, "update"),
            UpsertAction::Skip => write!(f, "skip"),
        }
    }
}

/// 计划中携带的实体（写入后的完整值）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "entity", content = "record", rename_all = "snake_case")]
pub enum EntityRecord {
    Meeting(Meeting),
    Race(Race),
    Runner(Runner),
    Result(RaceResult),
}

impl EntityRecord {
    pub fn entity_name(&self) -> &'static str {
        match self {
            EntityRecord::Meeting(_) => "meeting",
            EntityRecord::Race(_) => "race",
            EntityRecord::Runner(_) => "runner",
            EntityRecord::Result(_) => "result",
        }
    }

    /// 身份键的可读形式
    pub fn identity(&self) -> String {
        match self {
            EntityRecord::Meeting(m) => m.key.to_string(),
            EntityRecord::Race(r) => r.key.to_string(),
            EntityRecord::Runner(r) => r.key.to_string(),
            EntityRecord::Result(r) => format!("{}#result", r.runner),
        }
    }
}

/// 单条写入操作
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertOp {
    pub action: UpsertAction,
    pub record: EntityRecord,
    /// 字段级变更日志，仅 `Update` 非空
    pub changes: Vec<FieldChange>,
}

impl UpsertOp {
    pub fn insert(record: EntityRecord) -> Self {
        Self {
            action: UpsertAction::Insert,
            record,
            changes: Vec::new(),
        }
    }

    pub fn skip(record: EntityRecord) -> Self {
        Self {
            action: UpsertAction::Skip,
            record,
            changes: Vec::new(),
        }
    }

    /// 有变更时为 `Update`，否则为 `Skip`
    pub fn diffed(record: EntityRecord, changes: Vec<FieldChange>) -> Self {
        let action = if changes.is_empty() {
            UpsertAction::Skip
        } else {
            UpsertAction::Update
        };
        Self {
            action,
            record,
            changes,
        }
    }

    pub fn is_write(&self) -> bool {
        self.action != UpsertAction::Skip
    }
}

/// 同一次运行中同一身份出现的冲突值（后抓取的页面胜出）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictNote {
    pub identity: String,
    pub change: FieldChange,
    /// 胜出值所在的页面
    pub winner_url: String,
}

/// 被拒绝的记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub identity: String,
    pub source_url: String,
    pub error: ReconcileError,
}

/// 单个赛会的幂等写入计划
///
/// 操作顺序：赛会，然后按开赛时间排列的赛事，每场赛事之后紧跟其参赛马与赛果。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertPlan {
    pub meeting_key: MeetingKey,
    pub operations: Vec<UpsertOp>,
    pub conflicts: Vec<ConflictNote>,
    pub rejections: Vec<Rejection>,
    /// 赛会已定稿，计划中的全部操作都是 `Skip`
    pub frozen: bool,
}

impl UpsertPlan {
    pub fn new(meeting_key: MeetingKey) -> Self {
        Self {
            meeting_key,
            operations: Vec::new(),
            conflicts: Vec::new(),
            rejections: Vec::new(),
            frozen: false,
        }
    }

    pub fn count(&self, action: UpsertAction) -> usize {
        self.operations.iter().filter(|op| op.action == action).count()
    }

    pub fn writes(&self) -> impl Iterator<Item = &UpsertOp> {
        self.operations.iter().filter(|op| op.is_write())
    }

    /// 全部为 `Skip`（或为空）
    pub fn is_noop(&self) -> bool {
        self.writes().next().is_none()
    }

    pub fn actions(&self) -> Vec<(UpsertAction, &'static str)> {
        self.operations
            .iter()
            .map(|op| (op.action, op.record.entity_name()))
            .collect()
    }
}

/// 存储层应用计划后的计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedCounts {
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
}

impl AppliedCounts {
    pub fn upserted(&self) -> usize {
        self.inserted + self.updated
    }
}

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::{
    AppliedCounts, Meeting, MeetingKey, Race, RaceResult, Runner, RunnerKey, UpsertPlan,
};
use crate::utils::errors::StorageError;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 单个赛会在存储中的当前状态
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StorageSnapshot {
    pub meeting_key: Option<MeetingKey>,
    pub meeting: Option<Meeting>,
    pub races: BTreeMap<NaiveTime, Race>,
    pub runners: BTreeMap<RunnerKey, Runner>,
    pub results: BTreeMap<RunnerKey, RaceResult>,
}

impl StorageSnapshot {
    /// 空快照（该赛会尚未存储）
    pub fn empty(meeting_key: MeetingKey) -> Self {
        Self {
            meeting_key: Some(meeting_key),
            ..Default::default()
        }
    }

    pub fn has_runners(&self, off_time: NaiveTime) -> bool {
        self.runners.keys().any(|k| k.race.off_time == off_time)
    }

    pub fn has_results(&self, off_time: NaiveTime) -> bool {
        self.results.keys().any(|k| k.race.off_time == off_time)
    }

    /// 赛会是否已定稿
    ///
    /// 日期已过去，且存储中的每场赛事至少有一条赛果。
    pub fn is_final(&self, today: NaiveDate) -> bool {
        let Some(meeting) = &self.meeting else {
            return false;
        };
        meeting.key.date < today
            && !self.races.is_empty()
            && self.races.keys().all(|off| self.has_results(*off))
    }

    /// 把计划中的写入应用到快照上，返回计数
    ///
    /// 各存储实现共享这一逻辑，自身只负责原子地替换状态。
    pub fn apply_plan(&mut self, plan: &UpsertPlan) -> AppliedCounts {
        use crate::domain::models::{EntityRecord, UpsertAction};

        let mut counts = AppliedCounts::default();
        if self.meeting_key.is_none() {
            self.meeting_key = Some(plan.meeting_key.clone());
        }
        for op in &plan.operations {
            match op.action {
                UpsertAction::Insert => counts.inserted += 1,
                UpsertAction::Update => counts.updated += 1,
                UpsertAction::Skip => {
                    counts.skipped += 1;
                    continue;
                }
            }
            match &op.record {
                EntityRecord::Meeting(m) => self.meeting = Some(m.clone()),
                EntityRecord::Race(r) => {
                    self.races.insert(r.key.off_time, r.clone());
                }
                EntityRecord::Runner(r) => {
                    self.runners.insert(r.key.clone(), r.clone());
                }
                EntityRecord::Result(r) => {
                    self.results.insert(r.runner.clone(), r.clone());
                }
            }
        }
        counts
    }
}

/// 赛马数据存储接口
///
/// 按赛会原子地读取与写入。跨运行的同一赛会互斥由实现保证。
#[async_trait]
pub trait RacingStorage: Send + Sync {
    /// 读取指定赛会的当前快照，不存在时返回空快照
    async fn read_snapshot(&self, meeting_key: &MeetingKey)
        -> Result<StorageSnapshot, StorageError>;

    /// 原子地应用一个赛会的写入计划
    async fn apply(&self, plan: &UpsertPlan) -> Result<AppliedCounts, StorageError>;
}

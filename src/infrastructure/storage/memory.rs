// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::{AppliedCounts, MeetingKey, UpsertPlan};
use crate::domain::repositories::racing_repository::{RacingStorage, StorageSnapshot};
use crate::utils::errors::StorageError;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

/// 内存存储实现
///
/// 用于测试与试运行。写入先在副本上应用，成功后整体替换，
/// 因此每个赛会的写入是原子的。
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    meetings: RwLock<HashMap<MeetingKey, StorageSnapshot>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置一个赛会的快照
    pub fn seed(&self, snapshot: StorageSnapshot) {
        if let Some(key) = snapshot.meeting_key.clone() {
            self.meetings.write().insert(key, snapshot);
        }
    }

    pub fn snapshot(&self, meeting_key: &MeetingKey) -> Option<StorageSnapshot> {
        self.meetings.read().get(meeting_key).cloned()
    }

    pub fn meeting_count(&self) -> usize {
        self.meetings.read().len()
    }
}

#[async_trait]
impl RacingStorage for InMemoryStorage {
    async fn read_snapshot(
        &self,
        meeting_key: &MeetingKey,
    ) -> Result<StorageSnapshot, StorageError> {
        Ok(self
            .snapshot(meeting_key)
            .unwrap_or_else(|| StorageSnapshot::empty(meeting_key.clone())))
    }

    async fn apply(&self, plan: &UpsertPlan) -> Result<AppliedCounts, StorageError> {
        let mut meetings = self.meetings.write();
        let mut next = meetings
            .get(&plan.meeting_key)
            .cloned()
            .unwrap_or_else(|| StorageSnapshot::empty(plan.meeting_key.clone()));
        let counts = next.apply_plan(plan);
        meetings.insert(plan.meeting_key.clone(), next);
        Ok(counts)
    }
}

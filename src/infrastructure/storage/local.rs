// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::{AppliedCounts, Meeting, MeetingKey, Race, RaceResult, Runner, UpsertPlan};
use crate::domain::repositories::racing_repository::{RacingStorage, StorageSnapshot};
use crate::utils::errors::StorageError;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// 单个赛会的磁盘文档
#[derive(Debug, Clone, Serialize, Deserialize)]
struct MeetingDocument {
    meeting_key: MeetingKey,
    meeting: Option<Meeting>,
    races: Vec<Race>,
    runners: Vec<Runner>,
    results: Vec<RaceResult>,
}

impl MeetingDocument {
    fn from_snapshot(meeting_key: &MeetingKey, snapshot: &StorageSnapshot) -> Self {
        Self {
            meeting_key: meeting_key.clone(),
            meeting: snapshot.meeting.clone(),
            races: snapshot.races.values().cloned().collect(),
            runners: snapshot.runners.values().cloned().collect(),
            results: snapshot.results.values().cloned().collect(),
        }
    }

    fn into_snapshot(self) -> StorageSnapshot {
        StorageSnapshot {
            meeting_key: Some(self.meeting_key),
            meeting: self.meeting,
            races: self.races.into_iter().map(|r| (r.key.off_time, r)).collect(),
            runners: self.runners.into_iter().map(|r| (r.key.clone(), r)).collect(),
            results: self
                .results
                .into_iter()
                .map(|r| (r.runner.clone(), r))
                .collect(),
        }
    }
}

/// 本地文件系统存储实现
///
/// 每个赛会一个JSON文档 `{course}_{date}.json`，
/// 先写临时文件再重命名，读者永远看不到写了一半的文档。
pub struct LocalJsonStorage {
    base_path: PathBuf,
    locks: DashMap<MeetingKey, Arc<Mutex<()>>>,
}

impl LocalJsonStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            locks: DashMap::new(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// 赛会文档的完整路径
    pub fn document_path(&self, meeting_key: &MeetingKey) -> PathBuf {
        let course: String = meeting_key
            .course
            .as_str()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.base_path
            .join(format!("{}_{}.json", course, meeting_key.date.format("%Y-%m-%d")))
    }

    fn lock_for(&self, meeting_key: &MeetingKey) -> Arc<Mutex<()>> {
        self.locks
            .entry(meeting_key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn load(&self, meeting_key: &MeetingKey) -> Result<StorageSnapshot, StorageError> {
        let path = self.document_path(meeting_key);
        let data = match fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(StorageSnapshot::empty(meeting_key.clone()));
            }
            Err(e) => return Err(StorageError::from(e)),
        };

        let document: MeetingDocument = serde_json::from_slice(&data)?;
        if &document.meeting_key != meeting_key {
            return Err(StorageError::Conflict(format!(
                "{} 中存储的是 {}，而不是 {}",
                path.display(),
                document.meeting_key,
                meeting_key
            )));
        }
        Ok(document.into_snapshot())
    }

    async fn save(&self, meeting_key: &MeetingKey, snapshot: &StorageSnapshot) -> Result<(), StorageError> {
        let path = self.document_path(meeting_key);
        // 确保目录存在
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let data = serde_json::to_vec_pretty(&MeetingDocument::from_snapshot(meeting_key, snapshot))?;
        let tmp_path = path.with_extension("json.tmp");
        let mut file = fs::File::create(&tmp_path).await?;
        file.write_all(&data).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&tmp_path, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl RacingStorage for LocalJsonStorage {
    async fn read_snapshot(
        &self,
        meeting_key: &MeetingKey,
    ) -> Result<StorageSnapshot, StorageError> {
        let lock = self.lock_for(meeting_key);
        let _guard = lock.lock().await;
        self.load(meeting_key).await
    }

    async fn apply(&self, plan: &UpsertPlan) -> Result<AppliedCounts, StorageError> {
        let lock = self.lock_for(&plan.meeting_key);
        let _guard = lock.lock().await;

        let mut snapshot = self.load(&plan.meeting_key).await?;
        let counts = snapshot.apply_plan(plan);
        if counts.upserted() > 0 {
            self.save(&plan.meeting_key, &snapshot).await?;
        }
        tracing::debug!(
            meeting = %plan.meeting_key,
            inserted = counts.inserted,
            updated = counts.updated,
            skipped = counts.skipped,
            "Meeting document written"
        );
        Ok(counts)
    }
}

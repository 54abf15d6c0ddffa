// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::*;
use async_trait::async_trait;
use mockall::mock;
use racecrawl::application::{CancelHandle, CollectRacingRequest};
use racecrawl::domain::models::{
    AppliedCounts, EntityRecord, FailureStage, Meeting, MeetingKey, Race, RaceKey, UpsertAction,
    UpsertOp, UpsertPlan,
};
use racecrawl::domain::repositories::racing_repository::{RacingStorage, StorageSnapshot};
use racecrawl::infrastructure::storage::local::LocalJsonStorage;
use racecrawl::utils::errors::StorageError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use wiremock::MockServer;

mock! {
    pub Storage {}

    #[async_trait]
    impl RacingStorage for Storage {
        async fn read_snapshot(&self, meeting_key: &MeetingKey) -> Result<StorageSnapshot, StorageError>;
        async fn apply(&self, plan: &UpsertPlan) -> Result<AppliedCounts, StorageError>;
    }
}

fn ascot() -> MeetingKey {
    MeetingKey::new("ascot", race_day())
}

fn insert_plan() -> UpsertPlan {
    let key = ascot();
    let off = chrono::NaiveTime::from_hms_opt(13, 30, 0).unwrap();
    let mut plan = UpsertPlan::new(key.clone());
    plan.operations.push(UpsertOp::insert(EntityRecord::Meeting(Meeting::new(
        key.clone(),
        "Ascot",
    ))));
    plan.operations
        .push(UpsertOp::insert(EntityRecord::Race(Race::new(RaceKey::new(key, off)))));
    plan
}

#[tokio::test]
async fn test_local_storage_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let storage = LocalJsonStorage::new(dir.path());

    let empty = storage.read_snapshot(&ascot()).await.unwrap();
    assert!(empty.meeting.is_none());

    let counts = storage.apply(&insert_plan()).await.unwrap();
    assert_eq!(counts.inserted, 2);

    let snapshot = storage.read_snapshot(&ascot()).await.unwrap();
    assert_eq!(snapshot.meeting.unwrap().course_name, "Ascot");
    assert_eq!(snapshot.races.len(), 1);

    let path = storage.document_path(&ascot());
    assert!(path.exists());
    assert!(!path.with_extension("json.tmp").exists());
}

#[tokio::test]
async fn test_local_storage_skip_only_plan_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let storage = LocalJsonStorage::new(dir.path());

    let mut plan = insert_plan();
    for op in &mut plan.operations {
        op.action = UpsertAction::Skip;
    }
    let counts = storage.apply(&plan).await.unwrap();

    assert_eq!(counts.skipped, 2);
    assert!(!storage.document_path(&ascot()).exists());
}

#[tokio::test]
async fn test_local_storage_rejects_mismatched_document() {
    let dir = tempfile::tempdir().unwrap();
    let storage = LocalJsonStorage::new(dir.path());
    storage.apply(&insert_plan()).await.unwrap();

    // Ascot's document placed where Bath's should be
    let imposter = MeetingKey::new("bath", race_day());
    std::fs::copy(storage.document_path(&ascot()), storage.document_path(&imposter)).unwrap();
    let result = storage.read_snapshot(&imposter).await;

    assert!(matches!(result, Err(StorageError::Conflict(_))));
}

async fn single_meeting_server() -> MockServer {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_html(
        &server,
        &format!("/racecards/{RACE_DAY}"),
        schedule_html(&base, &[("Ascot", false)]),
    )
    .await;
    mount_meeting(&server, "Ascot", &[("Quiet Storm", "W Buick")]).await;
    server
}

#[tokio::test]
async fn test_storage_failure_is_retried_once() {
    let server = single_meeting_server().await;

    let mut storage = MockStorage::new();
    storage
        .expect_read_snapshot()
        .times(1)
        .returning(|key| Ok(StorageSnapshot::empty(key.clone())));
    let calls = AtomicUsize::new(0);
    storage.expect_apply().times(2).returning(move |plan| {
        if calls.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(StorageError::Unavailable("connection reset".to_string()));
        }
        Ok(AppliedCounts {
            inserted: plan.count(UpsertAction::Insert),
            ..AppliedCounts::default()
        })
    });

    let run = use_case(test_settings(&server), Arc::new(storage))
        .run(CollectRacingRequest::single_day(race_day()), CancelHandle::new())
        .await
        .unwrap();

    assert!(run.failures.is_empty(), "{:?}", run.failures);
    assert_eq!(run.meetings_reconciled, 1);
    // meeting, race, one runner
    assert_eq!(run.counts.upserted, 3);
}

#[tokio::test]
async fn test_persistent_storage_failure_is_recorded() {
    let server = single_meeting_server().await;

    let mut storage = MockStorage::new();
    storage
        .expect_read_snapshot()
        .times(2)
        .returning(|_| Err(StorageError::Unavailable("disk full".to_string())));
    storage.expect_apply().never();

    let run = use_case(test_settings(&server), Arc::new(storage))
        .run(CollectRacingRequest::single_day(race_day()), CancelHandle::new())
        .await
        .unwrap();

    assert_eq!(run.meetings_reconciled, 0);
    assert_eq!(run.failures.len(), 1);
    assert_eq!(run.failures[0].stage, FailureStage::Storage);
    assert_eq!(run.failures[0].kind, "unavailable");
    assert_eq!(run.failures[0].url, ascot().to_string());
}

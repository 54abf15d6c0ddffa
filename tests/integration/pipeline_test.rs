// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::*;
use racecrawl::application::{CancelHandle, CollectRacingRequest};
use racecrawl::domain::models::{FailureStage, MeetingKey, Outcome, RunState};
use racecrawl::infrastructure::storage::memory::InMemoryStorage;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const COURSES: [&str; 5] = ["Ascot", "Ayr", "Bath", "Chester", "York"];

#[tokio::test]
async fn test_one_race_page_timeout_leaves_meeting_partial() {
    let server = MockServer::start().await;
    let base = server.uri();
    let schedule: Vec<(&str, bool)> = COURSES.iter().map(|c| (*c, false)).collect();
    mount_html(&server, &format!("/racecards/{RACE_DAY}"), schedule_html(&base, &schedule)).await;

    for course in &COURSES[..4] {
        mount_meeting(&server, course, &[("Bold Venture (IRE)", "Ryan Moore"), ("Quiet Storm", "W Buick")])
            .await;
    }
    mount_html(&server, "/meetings/york", meeting_card_html(&base, "York", false)).await;
    Mock::given(method("GET"))
        .and(path("/racecard/york/1330"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(race_card_html("York", &[("Late Show", "R Moore")]), "text/html")
                .set_delay(Duration::from_millis(1_500)),
        )
        .mount(&server)
        .await;

    let storage = Arc::new(InMemoryStorage::new());
    let run = use_case(test_settings(&server), storage.clone())
        .run(CollectRacingRequest::single_day(race_day()), CancelHandle::new())
        .await
        .unwrap();

    assert_eq!(run.state, RunState::Completed);
    assert!(!run.cancelled);
    assert_eq!(run.meetings_reconciled, 4);
    assert_eq!(run.meetings_partial, 1);
    assert_eq!(run.failures.len(), 1);
    assert_eq!(run.failures[0].stage, FailureStage::Fetch);
    assert_eq!(run.failures[0].kind, "timeout");
    assert!(run.failures[0].url.ends_with("/racecard/york/1330"));
    // schedule + 5 meeting cards + 4 race cards
    assert_eq!(run.counts.fetched, 10);
    assert_eq!(run.counts.parsed, 10);

    let ascot = storage
        .snapshot(&MeetingKey::new("ascot", race_day()))
        .unwrap();
    assert_eq!(ascot.races.len(), 1);
    assert_eq!(ascot.runners.len(), 2);

    // the partial meeting still has what its meeting card carried
    let york = storage.snapshot(&MeetingKey::new("york", race_day())).unwrap();
    assert_eq!(york.races.len(), 1);
    assert!(york.runners.is_empty());
}

#[tokio::test]
async fn test_results_are_reconciled_and_replay_is_idempotent() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_html(&server, &format!("/racecards/{RACE_DAY}"), schedule_html(&base, &[("Ascot", false)])).await;
    mount_html(&server, "/meetings/ascot", meeting_card_html(&base, "Ascot", true)).await;
    mount_html(
        &server,
        "/racecard/ascot/1330",
        race_card_html("Ascot", &[("Bold Venture (IRE)", "Ryan Moore"), ("Quiet Storm", "W Buick")]),
    )
    .await;
    mount_html(
        &server,
        "/results/ascot/1330",
        results_html("Ascot", &[("1", "Quiet Storm"), ("2", "Bold Venture")]),
    )
    .await;

    let storage = Arc::new(InMemoryStorage::new());
    let settings = test_settings(&server);
    let first = use_case(settings.clone(), storage.clone())
        .run(CollectRacingRequest::single_day(race_day()), CancelHandle::new())
        .await
        .unwrap();

    assert_eq!(first.state, RunState::Completed);
    assert!(first.failures.is_empty(), "{:?}", first.failures);
    // meeting, race, two runners, two results
    assert_eq!(first.counts.upserted, 6);
    assert_eq!(first.meetings_reconciled, 1);

    let snapshot = storage
        .snapshot(&MeetingKey::new("ascot", race_day()))
        .unwrap();
    let winner = snapshot
        .results
        .values()
        .find(|r| r.outcome == Outcome::Finished { position: 1 })
        .unwrap();
    assert_eq!(winner.runner.horse.0, "quiet-storm");
    assert!(winner.time_ms.is_some());

    let second = use_case(settings, storage.clone())
        .run(CollectRacingRequest::single_day(race_day()), CancelHandle::new())
        .await
        .unwrap();
    assert_eq!(second.counts.upserted, 0);
    assert_eq!(second.counts.skipped, first.counts.upserted);
}

#[tokio::test]
async fn test_abandoned_meeting_is_recorded_without_fetching_cards() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_html(
        &server,
        &format!("/racecards/{RACE_DAY}"),
        schedule_html(&base, &[("Ascot", false), ("Ayr", true)]),
    )
    .await;
    mount_meeting(&server, "Ascot", &[("Quiet Storm", "W Buick")]).await;
    Mock::given(method("GET"))
        .and(path("/meetings/ayr"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let storage = Arc::new(InMemoryStorage::new());
    let run = use_case(test_settings(&server), storage.clone())
        .run(CollectRacingRequest::single_day(race_day()), CancelHandle::new())
        .await
        .unwrap();

    assert_eq!(run.state, RunState::Completed);
    assert!(run.failures.is_empty());
    let ayr = storage.snapshot(&MeetingKey::new("ayr", race_day())).unwrap();
    assert!(ayr.meeting.unwrap().is_abandoned());
    assert!(ayr.races.is_empty());
}

#[tokio::test]
async fn test_unreachable_schedule_fails_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let run = use_case(test_settings(&server), Arc::new(InMemoryStorage::new()))
        .run(CollectRacingRequest::single_day(race_day()), CancelHandle::new())
        .await
        .unwrap();

    assert_eq!(run.state, RunState::Failed);
    assert!(run.fatal_error.is_some());
    assert_eq!(run.failures.len(), 1);
    assert!(run.ended_at.is_some());
}

#[tokio::test]
async fn test_cancelled_before_start_completes_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let cancel = CancelHandle::new();
    cancel.cancel();
    let run = use_case(test_settings(&server), Arc::new(InMemoryStorage::new()))
        .run(CollectRacingRequest::single_day(race_day()), cancel)
        .await
        .unwrap();

    assert_eq!(run.state, RunState::Completed);
    assert!(run.cancelled);
    assert_eq!(run.counts.fetched, 0);
}

#[tokio::test]
async fn test_cancel_during_meeting_stage_keeps_fetched_work() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_html(&server, &format!("/racecards/{RACE_DAY}"), schedule_html(&base, &[("Ascot", false)])).await;
    Mock::given(method("GET"))
        .and(path("/meetings/ascot"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(meeting_card_html(&base, "Ascot", false), "text/html")
                .set_delay(Duration::from_millis(250)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/racecard/ascot/1330"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let cancel = CancelHandle::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let storage = Arc::new(InMemoryStorage::new());
    let run = use_case(test_settings(&server), storage.clone())
        .run(CollectRacingRequest::single_day(race_day()), cancel)
        .await
        .unwrap();

    assert_eq!(run.state, RunState::Completed);
    assert!(run.cancelled);
    assert!(run.failures.is_empty(), "{:?}", run.failures);
    // schedule + the in-flight meeting card
    assert_eq!(run.counts.fetched, 2);

    let ascot = storage
        .snapshot(&MeetingKey::new("ascot", race_day()))
        .unwrap();
    assert_eq!(ascot.meeting.unwrap().course_name, "Ascot");
    assert_eq!(ascot.races.len(), 1);
    assert!(ascot.runners.is_empty());
}

#[tokio::test]
async fn test_inverted_range_is_rejected_before_run() {
    let server = MockServer::start().await;
    let start = race_day();
    let end = start.pred_opt().unwrap();

    let result = use_case(test_settings(&server), Arc::new(InMemoryStorage::new()))
        .run(CollectRacingRequest::new(start, end), CancelHandle::new())
        .await;
    assert!(result.is_err());
}

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::*;
use crate::domain::models::{
    CanonicalMeeting, CanonicalRace, HorseKey, Outcome, PageSource, RaceKey, UpsertAction,
};
use chrono::NaiveDate;

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

fn at(hour: u32, minute: u32) -> NaiveDateTime {
    date().and_hms_opt(hour, minute, 0).unwrap()
}

fn meeting_key() -> MeetingKey {
    MeetingKey::new("ascot", date())
}

fn race_key(hour: u32, minute: u32) -> RaceKey {
    RaceKey::new(meeting_key(), NaiveTime::from_hms_opt(hour, minute, 0).unwrap())
}

fn runner(race: &RaceKey, horse: &str) -> Runner {
    Runner::new(
        RunnerKey::new(race.clone(), HorseKey(horse.to_string())),
        horse,
    )
}

fn result(race: &RaceKey, horse: &str, position: u8) -> RaceResult {
    RaceResult::new(
        RunnerKey::new(race.clone(), HorseKey(horse.to_string())),
        Outcome::Finished { position },
    )
}

fn page(seq: u64, races: Vec<CanonicalRace>) -> CanonicalRecords {
    let mut meeting = Meeting::new(meeting_key(), "Ascot");
    meeting.going = Some("Good".to_string());
    CanonicalRecords {
        source: PageSource {
            url: format!("http://example.com/page/{}", seq),
            seq,
        },
        meetings: vec![CanonicalMeeting { meeting, races }],
    }
}

fn card(race: &RaceKey, horses: &[&str]) -> CanonicalRace {
    let mut canonical = CanonicalRace::new(Race::new(race.clone()));
    canonical.runners = horses.iter().map(|h| runner(race, h)).collect();
    canonical
}

fn apply(snapshot: &StorageSnapshot, plan: &UpsertPlan) -> StorageSnapshot {
    let mut next = snapshot.clone();
    next.apply_plan(plan);
    next
}

#[test]
fn test_fresh_insert() {
    let r1 = race_key(13, 30);
    let r2 = race_key(14, 5);
    let records = page(1, vec![card(&r1, &["bold-venture", "quiet-storm"]), card(&r2, &["late-show"])]);

    let plan = Reconciler::new().reconcile(&records, &StorageSnapshot::empty(meeting_key()), at(9, 0));

    assert_eq!(
        plan.actions(),
        vec![
            (UpsertAction::Insert, "meeting"),
            (UpsertAction::Insert, "race"),
            (UpsertAction::Insert, "runner"),
            (UpsertAction::Insert, "runner"),
            (UpsertAction::Insert, "race"),
            (UpsertAction::Insert, "runner"),
        ]
    );
    assert!(plan.rejections.is_empty());
    assert!(!plan.frozen);
}

#[test]
fn test_result_added_to_stored_runner() {
    let race = race_key(13, 30);
    let first = page(1, vec![card(&race, &["bold-venture"])]);
    let reconciler = Reconciler::new();

    let stored = apply(
        &StorageSnapshot::empty(meeting_key()),
        &reconciler.reconcile(&first, &StorageSnapshot::empty(meeting_key()), at(9, 0)),
    );

    let mut with_result = card(&race, &["bold-venture"]);
    with_result.results.push(result(&race, "bold-venture", 3));
    let plan = reconciler.reconcile(&page(2, vec![with_result]), &stored, at(15, 0));

    assert_eq!(
        plan.actions(),
        vec![
            (UpsertAction::Skip, "meeting"),
            (UpsertAction::Skip, "race"),
            (UpsertAction::Skip, "runner"),
            (UpsertAction::Insert, "result"),
        ]
    );
    match &plan.operations[3].record {
        EntityRecord::Result(r) => assert_eq!(r.outcome.position(), Some(3)),
        other => panic!("unexpected record {:?}", other),
    }
}

#[test]
fn test_replay_after_apply_is_all_skip() {
    let race = race_key(13, 30);
    let mut canonical = card(&race, &["bold-venture", "quiet-storm"]);
    canonical.results.push(result(&race, "quiet-storm", 1));
    let records = page(1, vec![canonical]);
    let reconciler = Reconciler::new();

    let empty = StorageSnapshot::empty(meeting_key());
    let plan = reconciler.reconcile(&records, &empty, at(15, 0));
    assert_eq!(plan.count(UpsertAction::Insert), 5);

    let stored = apply(&empty, &plan);
    let replay = reconciler.reconcile(&records, &stored, at(15, 0));

    assert!(replay.is_noop());
    assert_eq!(replay.operations.len(), 5);
    assert!(replay.rejections.is_empty());
}

#[test]
fn test_update_carries_field_changes() {
    let race = race_key(13, 30);
    let reconciler = Reconciler::new();
    let empty = StorageSnapshot::empty(meeting_key());
    let stored = apply(
        &empty,
        &reconciler.reconcile(&page(1, vec![card(&race, &["bold-venture"])]), &empty, at(9, 0)),
    );

    let mut changed = page(2, vec![card(&race, &["bold-venture"])]);
    changed.meetings[0].meeting.going = Some("Soft".to_string());
    let plan = reconciler.reconcile(&changed, &stored, at(10, 0));

    assert_eq!(plan.operations[0].action, UpsertAction::Update);
    assert_eq!(plan.operations[0].changes[0].field, "going");
    assert_eq!(plan.operations[0].changes[0].before.as_deref(), Some("Good"));
    assert_eq!(plan.operations[0].changes[0].after.as_deref(), Some("Soft"));
}

#[test]
fn test_runners_of_earlier_race_precede_results_of_later_race() {
    let early = race_key(13, 30);
    let late = race_key(14, 5);

    let mut late_race = card(&late, &["late-show"]);
    late_race.results.push(result(&late, "late-show", 1));
    // later race listed first on the page
    let records = page(1, vec![late_race, card(&early, &["bold-venture"])]);

    let plan = Reconciler::new().reconcile(&records, &StorageSnapshot::empty(meeting_key()), at(16, 0));
    let position = |entity: &str, off: &RaceKey| {
        plan.operations
            .iter()
            .position(|op| match &op.record {
                EntityRecord::Runner(r) => entity == "runner" && &r.key.race == off,
                EntityRecord::Result(r) => entity == "result" && &r.runner.race == off,
                _ => false,
            })
            .unwrap()
    };

    assert!(position("runner", &early) < position("result", &late));
}

#[test]
fn test_result_for_unknown_runner_is_rejected() {
    let race = race_key(13, 30);
    let mut canonical = card(&race, &["bold-venture"]);
    canonical.results.push(result(&race, "ghost-horse", 1));

    let plan = Reconciler::new().reconcile(
        &page(1, vec![canonical]),
        &StorageSnapshot::empty(meeting_key()),
        at(15, 0),
    );

    assert_eq!(plan.rejections.len(), 1);
    assert!(matches!(plan.rejections[0].error, ReconcileError::UnknownRunner(_)));
    assert_eq!(plan.rejections[0].source_url, "http://example.com/page/1");
    assert!(plan
        .operations
        .iter()
        .all(|op| !matches!(&op.record, EntityRecord::Runner(r) if r.key.horse.0 == "ghost-horse")));
}

#[test]
fn test_result_before_off_is_rejected() {
    let race = race_key(13, 30);
    let mut canonical = card(&race, &["bold-venture"]);
    canonical.results.push(result(&race, "bold-venture", 1));

    let plan = Reconciler::new().reconcile(
        &page(1, vec![canonical]),
        &StorageSnapshot::empty(meeting_key()),
        at(13, 0),
    );

    assert_eq!(plan.count(UpsertAction::Insert), 3);
    assert!(matches!(plan.rejections[0].error, ReconcileError::ResultBeforeOff(_)));
}

#[test]
fn test_new_runner_after_off_is_rejected() {
    let race = race_key(13, 30);
    let reconciler = Reconciler::new();
    let empty = StorageSnapshot::empty(meeting_key());
    let stored = apply(
        &empty,
        &reconciler.reconcile(&page(1, vec![card(&race, &["bold-venture"])]), &empty, at(9, 0)),
    );

    let plan = reconciler.reconcile(
        &page(2, vec![card(&race, &["bold-venture", "late-entry"])]),
        &stored,
        at(14, 0),
    );

    assert_eq!(plan.rejections.len(), 1);
    assert!(matches!(plan.rejections[0].error, ReconcileError::RunnerAfterOff(_)));
    assert!(plan.is_noop());

    // before the off a new runner is still accepted
    let early = reconciler.reconcile(
        &page(3, vec![card(&race, &["bold-venture", "late-entry"])]),
        &stored,
        at(12, 0),
    );
    assert_eq!(early.count(UpsertAction::Insert), 1);
}

#[test]
fn test_conflicting_pages_last_fetch_wins() {
    let race = race_key(13, 30);
    let mut first = page(1, vec![card(&race, &[])]);
    first.meetings[0].meeting.going = Some("Good".to_string());
    let mut second = page(2, vec![card(&race, &[])]);
    second.meetings[0].meeting.going = Some("Soft".to_string());

    // fetch order, not slice order, decides the winner
    let plan = Reconciler::new().reconcile_pages(
        &[second, first],
        &StorageSnapshot::empty(meeting_key()),
        at(9, 0),
    );

    match &plan.operations[0].record {
        EntityRecord::Meeting(m) => assert_eq!(m.going.as_deref(), Some("Soft")),
        other => panic!("unexpected record {:?}", other),
    }
    assert_eq!(plan.conflicts.len(), 1);
    assert_eq!(plan.conflicts[0].winner_url, "http://example.com/page/2");
    assert_eq!(plan.conflicts[0].change.before.as_deref(), Some("Good"));
}

#[test]
fn test_final_meeting_is_frozen() {
    let race = race_key(13, 30);
    let mut canonical = card(&race, &["bold-venture"]);
    canonical.results.push(result(&race, "bold-venture", 1));
    let reconciler = Reconciler::new();
    let empty = StorageSnapshot::empty(meeting_key());
    let stored = apply(&empty, &reconciler.reconcile(&page(1, vec![canonical]), &empty, at(15, 0)));

    let mut changed = card(&race, &["bold-venture", "new-horse"]);
    changed.results.push(result(&race, "bold-venture", 2));
    let next_day = date().succ_opt().unwrap().and_hms_opt(9, 0, 0).unwrap();
    let plan = reconciler.reconcile(&page(2, vec![changed]), &stored, next_day);

    assert!(plan.frozen);
    assert!(plan.is_noop());
    assert_eq!(plan.operations.len(), 5);
    assert!(plan.rejections.is_empty());
}

#[test]
fn test_other_meetings_are_ignored() {
    let race = race_key(13, 30);
    let mut records = page(1, vec![card(&race, &["bold-venture"])]);
    records.meetings.push(CanonicalMeeting {
        meeting: Meeting::new(MeetingKey::new("ayr", date()), "Ayr"),
        races: Vec::new(),
    });

    let plan = Reconciler::new().reconcile(&records, &StorageSnapshot::empty(meeting_key()), at(9, 0));

    assert_eq!(plan.operations.len(), 3);
    assert_eq!(plan.meeting_key, meeting_key());
}

#[test]
fn test_race_under_another_meeting_is_rejected() {
    let york_race = RaceKey::new(
        MeetingKey::new("york", date()),
        NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
    );
    let records = page(1, vec![card(&race_key(13, 30), &["bold-venture"]), card(&york_race, &["late-show"])]);

    let plan = Reconciler::new().reconcile(&records, &StorageSnapshot::empty(meeting_key()), at(9, 0));

    assert_eq!(plan.rejections.len(), 1);
    assert!(matches!(plan.rejections[0].error, ReconcileError::UnknownMeeting(_)));
    assert_eq!(plan.rejections[0].identity, york_race.to_string());
    assert_eq!(
        plan.actions(),
        vec![
            (UpsertAction::Insert, "meeting"),
            (UpsertAction::Insert, "race"),
            (UpsertAction::Insert, "runner"),
        ]
    );
}

#[test]
fn test_runner_keyed_to_another_race_is_rejected() {
    let race = race_key(13, 30);
    let mut canonical = card(&race, &["bold-venture"]);
    canonical.runners.push(runner(&race_key(14, 5), "late-show"));

    let plan = Reconciler::new().reconcile(
        &page(1, vec![canonical]),
        &StorageSnapshot::empty(meeting_key()),
        at(9, 0),
    );

    assert_eq!(plan.rejections.len(), 1);
    assert!(matches!(plan.rejections[0].error, ReconcileError::UnknownMeeting(_)));
    assert!(!plan
        .operations
        .iter()
        .any(|op| op.record.identity().contains("late-show")));
}

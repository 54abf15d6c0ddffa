// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::integration::helpers::{
    evening, meeting_card_html, race_card_html, race_day, results_html,
};
use chrono::{NaiveDateTime, NaiveTime};
use racecrawl::domain::models::{
    CanonicalRecords, EntityRecord, MeetingKey, Outcome, PageSource, UpsertAction,
};
use racecrawl::domain::repositories::racing_repository::StorageSnapshot;
use racecrawl::domain::services::{Normalizer, Reconciler};
use racecrawl::engines::traits::RawPage;
use racecrawl::infrastructure::alias_table::StaticAliasTable;
use racecrawl::parsers::{self, PageKind};
use std::sync::Arc;

const BASE: &str = "http://racing.test";

struct Scenario {
    normalizer: Normalizer,
    seq: u64,
}

impl Scenario {
    fn new() -> Self {
        Self {
            normalizer: Normalizer::new(Arc::new(StaticAliasTable::new())),
            seq: 0,
        }
    }

    fn page(&mut self, url: &str, kind: PageKind, html: String) -> CanonicalRecords {
        self.seq += 1;
        let raw = RawPage {
            url: url.to_string(),
            status: 200,
            content: html,
            content_type: "text/html".to_string(),
            elapsed_ms: 1,
        };
        let parsed = parsers::parse(&raw, kind).unwrap();
        self.normalizer.normalize(
            &parsed,
            PageSource {
                url: url.to_string(),
                seq: self.seq,
            },
        )
    }
}

fn morning() -> NaiveDateTime {
    race_day().and_hms_opt(9, 0, 0).unwrap()
}

fn apply(snapshot: &mut StorageSnapshot, pages: &[CanonicalRecords], as_of: NaiveDateTime) {
    let plan = Reconciler::new().reconcile_pages(pages, snapshot, as_of);
    snapshot.apply_plan(&plan);
}

#[test]
fn test_fresh_meeting_pages_insert_in_order() {
    let mut scenario = Scenario::new();
    let pages = vec![
        scenario.page(
            "http://racing.test/meetings/ascot",
            PageKind::MeetingCard,
            meeting_card_html(BASE, "Ascot", false),
        ),
        scenario.page(
            "http://racing.test/racecard/ascot/1330",
            PageKind::RaceCard,
            race_card_html("Ascot", &[("Bold Venture (IRE)", "Ryan Moore"), ("Quiet Storm", "W Buick")]),
        ),
    ];

    let existing = StorageSnapshot::empty(MeetingKey::new("ascot", race_day()));
    let plan = Reconciler::new().reconcile_pages(&pages, &existing, morning());

    assert_eq!(
        plan.actions(),
        vec![
            (UpsertAction::Insert, "meeting"),
            (UpsertAction::Insert, "race"),
            (UpsertAction::Insert, "runner"),
            (UpsertAction::Insert, "runner"),
        ]
    );
    assert!(plan.rejections.is_empty());
}

#[test]
fn test_results_page_matches_reformatted_card_name() {
    let mut scenario = Scenario::new();
    let card = scenario.page(
        "http://racing.test/racecard/ascot/1330",
        PageKind::RaceCard,
        race_card_html("Ascot", &[("Bold Venture", "Ryan Moore")]),
    );
    let mut snapshot = StorageSnapshot::empty(MeetingKey::new("ascot", race_day()));
    apply(&mut snapshot, &[card.clone()], morning());

    let results = scenario.page(
        "http://racing.test/results/ascot/1330",
        PageKind::ResultsPage,
        results_html("Ascot", &[("3", "BOLD VENTURE (IRE)")]),
    );
    let plan = Reconciler::new().reconcile_pages(&[card, results], &snapshot, evening());

    let runner_op = plan
        .operations
        .iter()
        .find(|op| matches!(op.record, EntityRecord::Runner(_)))
        .unwrap();
    let result_op = plan
        .operations
        .iter()
        .find(|op| matches!(op.record, EntityRecord::Result(_)))
        .unwrap();

    assert_eq!(runner_op.action, UpsertAction::Skip);
    assert_eq!(result_op.action, UpsertAction::Insert);
    match &result_op.record {
        EntityRecord::Result(result) => {
            assert_eq!(result.outcome, Outcome::Finished { position: 3 });
        }
        other => panic!("unexpected record {:?}", other),
    }
}

#[test]
fn test_unchanged_page_rescrape_is_all_skip() {
    let mut scenario = Scenario::new();
    let mut pages = vec![
        scenario.page(
            "http://racing.test/meetings/ascot",
            PageKind::MeetingCard,
            meeting_card_html(BASE, "Ascot", true),
        ),
        scenario.page(
            "http://racing.test/racecard/ascot/1330",
            PageKind::RaceCard,
            race_card_html("Ascot", &[("Quiet Storm", "W Buick")]),
        ),
    ];
    pages.push(scenario.page(
        "http://racing.test/results/ascot/1330",
        PageKind::ResultsPage,
        results_html("Ascot", &[("1", "Quiet Storm")]),
    ));

    let mut snapshot = StorageSnapshot::empty(MeetingKey::new("ascot", race_day()));
    apply(&mut snapshot, &pages, evening());
    let replay = Reconciler::new().reconcile_pages(&pages, &snapshot, evening());

    assert!(!replay.operations.is_empty());
    assert!(replay.is_noop());
}

#[test]
fn test_pages_out_of_order_still_plan_by_off_time() {
    let mut scenario = Scenario::new();
    let early = scenario.page(
        "http://racing.test/racecard/ascot/1330",
        PageKind::RaceCard,
        race_card_html("Ascot", &[("Quiet Storm", "W Buick")]),
    );
    let late_card = r#"<div class="racecard" data-course="Ascot" data-date="2024-06-01" data-off-time="14:05">
        <table class="runners"><tr class="runner"><td class="horse-name">Late Show</td></tr></table></div>"#;
    let late_result = r#"<div class="result" data-course="Ascot" data-date="2024-06-01" data-off-time="14:05">
        <table class="results"><tr class="result-row"><td class="position">1</td>
        <td class="horse-name">Late Show</td></tr></table></div>"#;
    let late = scenario.page(
        "http://racing.test/racecard/ascot/1405",
        PageKind::RaceCard,
        late_card.to_string(),
    );
    let results = scenario.page(
        "http://racing.test/results/ascot/1405",
        PageKind::ResultsPage,
        late_result.to_string(),
    );

    let existing = StorageSnapshot::empty(MeetingKey::new("ascot", race_day()));
    let plan = Reconciler::new().reconcile_pages(&[results, late, early], &existing, evening());

    let position = |predicate: &dyn Fn(&EntityRecord) -> bool| {
        plan.operations
            .iter()
            .position(|op| predicate(&op.record))
            .unwrap()
    };
    let early_off = NaiveTime::from_hms_opt(13, 30, 0).unwrap();
    let early_runner = position(&|r| {
        matches!(r, EntityRecord::Runner(runner) if runner.key.race.off_time == early_off)
    });
    let late_result_at = position(&|r| matches!(r, EntityRecord::Result(_)));

    assert!(early_runner < late_result_at);
}

#[test]
fn test_results_row_missing_from_card_is_rejected() {
    let mut scenario = Scenario::new();
    let card = scenario.page(
        "http://racing.test/racecard/ascot/1330",
        PageKind::RaceCard,
        race_card_html("Ascot", &[("Quiet Storm", "W Buick")]),
    );
    let results = scenario.page(
        "http://racing.test/results/ascot/1330",
        PageKind::ResultsPage,
        results_html("Ascot", &[("1", "Quiet Storm"), ("2", "Phantom Entry")]),
    );

    let existing = StorageSnapshot::empty(MeetingKey::new("ascot", race_day()));
    let plan = Reconciler::new().reconcile_pages(&[card, results], &existing, evening());

    assert_eq!(plan.rejections.len(), 1);
    assert_eq!(plan.rejections[0].source_url, "http://racing.test/results/ascot/1330");
    assert_eq!(
        plan.operations
            .iter()
            .filter(|op| matches!(op.record, EntityRecord::Result(_)))
            .count(),
        1
    );
}

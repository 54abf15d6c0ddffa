// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::engines::traits::RawPage;
use crate::parsers::markup::{self, attr, field, flag, required, required_date};
use crate::parsers::meeting_card::{parse_race_summary, COURSE, DATE};
use crate::parsers::records::{PageKind, ParsedMeeting, ParsedRecords, ParsedRunner};
use crate::utils::errors::ParseError;
use scraper::{ElementRef, Html};

const RACE_ROOT: &[&str] = &["[data-racecard]", ".racecard", ".race-card", "body"];
const RUNNER: &[&str] = &[
    "[data-runner]",
    "tr.runner",
    ".runners .runner",
    "table.racecard tbody tr",
];
const HORSE: &[&str] = &[".horse-name", ".horse", "a.horse"];
const JOCKEY: &[&str] = &[".jockey", ".jockey-name"];
const TRAINER: &[&str] = &[".trainer", ".trainer-name"];
const WEIGHT: &[&str] = &[".weight", ".wgt"];
const DRAW: &[&str] = &[".draw", ".stall"];
const PRICE: &[&str] = &[".sp", ".odds", ".price"];
const NON_RUNNER: &[&str] = &[".non-runner", ".nr"];
const VOID: &[&str] = &[".void-race", ".race-void"];

/// 解析单场赛事的排位表（参赛马列表）
pub fn parse_race_card(page: &RawPage) -> Result<ParsedRecords, ParseError> {
    if markup::is_blank(&page.content) {
        return Ok(ParsedRecords::empty(PageKind::RaceCard));
    }

    let document = Html::parse_document(&page.content);
    let root = markup::select_variants(&document, RACE_ROOT)?
        .into_iter()
        .next()
        .ok_or_else(|| ParseError::UnexpectedLayout("race card has no body".to_string()))?;

    let course = required(field(root, &["data-course"], COURSE)?, "course")?;
    let date = required_date(attr(root, &["data-date"]).or(field(root, &[], DATE)?))?;
    let mut race = parse_race_summary(root)?;

    let void = flag(root, &["data-void"], VOID)?.unwrap_or(false);
    let rows = markup::select_within(root, RUNNER)?;
    if rows.is_empty() && !void {
        return Err(ParseError::UnexpectedLayout(format!(
            "no runners found on race card for {} {} {}",
            course, date, race.off_time
        )));
    }

    for row in rows {
        if let Some(runner) = parse_runner(row)? {
            race.runners.push(runner);
        }
    }

    let mut meeting = ParsedMeeting::new(course, date);
    meeting.races.push(race);

    let mut records = ParsedRecords::empty(PageKind::RaceCard);
    records.meetings.push(meeting);
    Ok(records)
}

fn parse_runner(row: ElementRef<'_>) -> Result<Option<ParsedRunner>, ParseError> {
    // header rows carry no horse cell
    if !markup::select_within(row, &["th"])?.is_empty()
        && markup::select_within(row, &["td"])?.is_empty()
    {
        return Ok(None);
    }
    if markup::has_class(row, &["non-runner", "nr"])
        || flag(row, &["data-non-runner"], NON_RUNNER)?.unwrap_or(false)
    {
        return Ok(None);
    }

    let horse_name = required(field(row, &["data-horse"], HORSE)?, "horse_name")?;
    Ok(Some(ParsedRunner {
        horse_name,
        jockey: field(row, &["data-jockey"], JOCKEY)?,
        trainer: field(row, &["data-trainer"], TRAINER)?,
        weight: field(row, &["data-weight"], WEIGHT)?,
        draw: field(row, &["data-draw"], DRAW)?,
        starting_price: field(row, &["data-sp"], PRICE)?,
    }))
}

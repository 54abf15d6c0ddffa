// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::Outcome;
use crate::engines::traits::RawPage;
use crate::parsers::markup::{self, attr, field, flag, required, required_date};
use crate::parsers::meeting_card::{parse_race_summary, COURSE, DATE};
use crate::parsers::records::{PageKind, ParsedMeeting, ParsedRecords, ParsedResult};
use crate::utils::errors::ParseError;
use scraper::{ElementRef, Html};

const RESULT_ROOT: &[&str] = &["[data-result]", ".result", ".race-result", "body"];
const ROW: &[&str] = &[
    "[data-result-row]",
    "tr.result-row",
    ".results .finisher",
    "table.results tbody tr",
];
const POSITION: &[&str] = &[".position", ".pos", ".placing"];
const HORSE: &[&str] = &[".horse-name", ".horse", "a.horse"];
const TIME: &[&str] = &[".time", ".race-time"];
const WINNING_TIME: &[&str] = &[".winning-time", ".winner-time"];
const PRICE: &[&str] = &[".sp", ".odds", ".price"];
const BEATEN: &[&str] = &[".distance-beaten", ".btn", ".beaten"];
const VOID: &[&str] = &[".void-race", ".race-void"];

/// 非参赛（退出）标记
const NON_RUNNER_CODES: &[&str] = &["NR", "N/R", "NON-RUNNER"];

/// 解析单场赛事的赛果页
pub fn parse_results(page: &RawPage) -> Result<ParsedRecords, ParseError> {
    if markup::is_blank(&page.content) {
        return Ok(ParsedRecords::empty(PageKind::ResultsPage));
    }

    let document = Html::parse_document(&page.content);
    let root = markup::select_variants(&document, RESULT_ROOT)?
        .into_iter()
        .next()
        .ok_or_else(|| ParseError::UnexpectedLayout("results page has no body".to_string()))?;

    let course = required(field(root, &["data-course"], COURSE)?, "course")?;
    let date = required_date(attr(root, &["data-date"]).or(field(root, &[], DATE)?))?;
    let mut race = parse_race_summary(root)?;

    let void = flag(root, &["data-void"], VOID)?.unwrap_or(false);
    let rows = markup::select_within(root, ROW)?;
    if rows.is_empty() && !void {
        return Err(ParseError::UnexpectedLayout(format!(
            "no result rows found for {} {} {}",
            course, date, race.off_time
        )));
    }

    let winning_time = field(root, &["data-winning-time"], WINNING_TIME)?;
    for row in rows {
        if let Some(mut result) = parse_row(row)? {
            if result.time.is_none() && is_winner(&result.position) {
                result.time = winning_time.clone();
            }
            race.results.push(result);
        }
    }

    let mut meeting = ParsedMeeting::new(course, date);
    meeting.races.push(race);

    let mut records = ParsedRecords::empty(PageKind::ResultsPage);
    records.meetings.push(meeting);
    Ok(records)
}

fn parse_row(row: ElementRef<'_>) -> Result<Option<ParsedResult>, ParseError> {
    if !markup::select_within(row, &["th"])?.is_empty()
        && markup::select_within(row, &["td"])?.is_empty()
    {
        return Ok(None);
    }
    if markup::has_class(row, &["non-runner", "nr"]) {
        return Ok(None);
    }

    let position = field(row, &["data-position"], POSITION)?;
    if position
        .as_deref()
        .is_some_and(|p| NON_RUNNER_CODES.contains(&p.trim().to_ascii_uppercase().as_str()))
    {
        return Ok(None);
    }

    let horse_name = required(field(row, &["data-horse"], HORSE)?, "horse_name")?;
    let position = required(position, "position")?;
    if Outcome::parse(&position).is_none() {
        return Err(ParseError::UnexpectedLayout(format!(
            "unreadable position {:?} for {}",
            position, horse_name
        )));
    }

    Ok(Some(ParsedResult {
        horse_name,
        position,
        time: field(row, &["data-time"], TIME)?,
        starting_price: field(row, &["data-sp"], PRICE)?,
        distance_beaten: field(row, &["data-beaten"], BEATEN)?,
    }))
}

fn is_winner(position: &str) -> bool {
    let digits: String = position.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
    digits == "1"
}

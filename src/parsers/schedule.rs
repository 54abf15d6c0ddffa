// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::engines::traits::RawPage;
use crate::parsers::markup::{self, attr, field, flag, link_in, required, required_date};
use crate::parsers::records::{LinkTarget, PageKind, PageLink, ParsedMeeting, ParsedRecords};
use crate::utils::errors::ParseError;
use crate::utils::racing_formats::parse_race_date;
use chrono::Datelike;
use scraper::Html;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

const CONTAINER: &[&str] = &["[data-fixtures]", ".fixtures", ".fixture-list", "ul.meetings"];
const FIXTURE: &[&str] = &[
    "[data-fixture]",
    ".fixtures .fixture",
    ".fixture-list .fixture",
    "ul.meetings li.meeting",
];
const COURSE: &[&str] = &[".course-name", ".course", "a"];
const DATE: &[&str] = &[".fixture-date", ".date", "time"];
const MEETING_LINK: &[&str] = &["a.meeting-link[href]", "a[href]"];
const ABANDONED: &[&str] = &[".abandoned"];

/// 解析赛程页面（HTML赛程列表或JSON赛程数据）
pub fn parse_schedule(page: &RawPage) -> Result<ParsedRecords, ParseError> {
    if markup::is_blank(&page.content) {
        return Ok(ParsedRecords::empty(PageKind::Schedule));
    }
    if page.is_json() {
        return parse_fixture_feed(&page.content);
    }

    let document = Html::parse_document(&page.content);
    let base = Url::parse(&page.url).ok();
    let fixtures = markup::select_variants(&document, FIXTURE)?;

    if fixtures.is_empty() {
        // an empty fixture list container is a legitimately empty schedule
        if markup::exists(&document, CONTAINER)? {
            return Ok(ParsedRecords::empty(PageKind::Schedule));
        }
        return Err(ParseError::UnexpectedLayout(
            "no fixture list found on schedule page".to_string(),
        ));
    }

    let mut records = ParsedRecords::empty(PageKind::Schedule);
    for fixture in fixtures {
        let course = required(field(fixture, &["data-course"], COURSE)?, "course")?;
        let date = required_date(
            attr(fixture, &["data-date"]).or(field(fixture, &[], DATE)?),
        )?;
        let abandoned = flag(fixture, &["data-abandoned"], ABANDONED)?.unwrap_or(false);

        let mut meeting = ParsedMeeting::new(course.clone(), date);
        meeting.abandoned = Some(abandoned);
        records.meetings.push(meeting);

        if let Some(url) = link_in(fixture, MEETING_LINK, base.as_ref())? {
            let mut link = markup::url_link(PageKind::MeetingCard, url, &course, date, None);
            link.abandoned = abandoned;
            records.links.push(link);
        }
    }
    Ok(records)
}

#[derive(Debug, Deserialize)]
struct FixtureFeed {
    data: Vec<FixtureEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FixtureEntry {
    fixture_id: Option<Value>,
    course_name: Option<String>,
    fixture_date: Option<String>,
    abandoned_reason_code: Option<Value>,
}

/// 解析JSON赛程数据：`{"data":[{"fixtureId","courseName","fixtureDate","abandonedReasonCode"}]}`
fn parse_fixture_feed(content: &str) -> Result<ParsedRecords, ParseError> {
    let feed: FixtureFeed = serde_json::from_str(content)
        .map_err(|e| ParseError::UnexpectedLayout(format!("fixture feed: {}", e)))?;

    let mut records = ParsedRecords::empty(PageKind::Schedule);
    for entry in feed.data {
        let course = required(
            entry.course_name.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()),
            "courseName",
        )?;
        let raw_date = required(entry.fixture_date, "fixtureDate")?;
        let date = parse_race_date(&raw_date)
            .ok_or_else(|| ParseError::MissingField("fixtureDate".to_string()))?;
        let fixture_id = entry
            .fixture_id
            .as_ref()
            .and_then(json_scalar)
            .ok_or_else(|| ParseError::MissingField("fixtureId".to_string()))?;
        let abandoned = entry
            .abandoned_reason_code
            .as_ref()
            .and_then(json_scalar)
            .is_some_and(|code| code != "0");

        let mut meeting = ParsedMeeting::new(course.clone(), date);
        meeting.abandoned = Some(abandoned);
        records.meetings.push(meeting);
        records.links.push(PageLink {
            kind: PageKind::MeetingCard,
            target: LinkTarget::Fixture {
                year: date.year(),
                fixture_id,
            },
            course,
            date,
            off_time: None,
            abandoned,
        });
    }
    Ok(records)
}

fn json_scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

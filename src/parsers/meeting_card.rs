// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::engines::traits::RawPage;
use crate::parsers::markup::{
    self, attr, field, flag, link_in, required, required_date, required_off_time,
};
use crate::parsers::records::{PageKind, ParsedMeeting, ParsedRace, ParsedRecords};
use crate::utils::errors::ParseError;
use scraper::{ElementRef, Html};
use url::Url;

pub(crate) const MEETING_ROOT: &[&str] = &["[data-meeting]", ".meeting", "main.meeting-card", "body"];
pub(crate) const COURSE: &[&str] = &[".course-name", "h1.course", "h1"];
pub(crate) const DATE: &[&str] = &[".meeting-date", "time.date", ".date"];
const GOING: &[&str] = &[".going", ".going-description", "[itemprop=going]"];
const WEATHER: &[&str] = &[".weather", ".weather-description"];
const ABANDONED: &[&str] = &[".abandoned", ".meeting-abandoned"];
const RACE: &[&str] = &["[data-race]", ".race", ".races li", ".race-list .race-row"];
const OFF_TIME: &[&str] = &[".off-time", ".race-time", "time"];
const RACECARD_LINK: &[&str] = &["a.racecard-link[href]", "a[data-link=racecard]"];
const RESULT_LINK: &[&str] = &["a.result-link[href]", "a[data-link=result]"];

pub(crate) const RACE_NAME: &[&str] = &[".race-name", "h2", "h3"];
pub(crate) const RACE_CLASS: &[&str] = &[".race-class", ".class"];
pub(crate) const DISTANCE: &[&str] = &[".distance", ".race-distance"];
pub(crate) const SURFACE: &[&str] = &[".surface", ".track-surface"];
pub(crate) const PRIZE: &[&str] = &[".prize", ".prize-money"];

/// 解析赛会页（当天的赛事列表）
pub fn parse_meeting_card(page: &RawPage) -> Result<ParsedRecords, ParseError> {
    if markup::is_blank(&page.content) {
        return Ok(ParsedRecords::empty(PageKind::MeetingCard));
    }

    let document = Html::parse_document(&page.content);
    let base = Url::parse(&page.url).ok();
    let root = markup::select_variants(&document, MEETING_ROOT)?
        .into_iter()
        .next()
        .ok_or_else(|| ParseError::UnexpectedLayout("meeting card has no body".to_string()))?;

    let course = required(field(root, &["data-course"], COURSE)?, "course")?;
    let date = required_date(attr(root, &["data-date"]).or(field(root, &[], DATE)?))?;

    let mut meeting = ParsedMeeting::new(course.clone(), date);
    meeting.going = field(root, &["data-going"], GOING)?;
    meeting.weather = field(root, &["data-weather"], WEATHER)?;
    meeting.abandoned = flag(root, &["data-abandoned"], ABANDONED)?;

    let mut records = ParsedRecords::empty(PageKind::MeetingCard);
    let race_elements = markup::select_within(root, RACE)?;

    if race_elements.is_empty() && !meeting.abandoned.unwrap_or(false) {
        return Err(ParseError::UnexpectedLayout(format!(
            "no races found for {} on {}",
            course, date
        )));
    }

    for element in race_elements {
        let race = parse_race_summary(element)?;
        let off_time = race.off_time;
        if let Some(url) = link_in(element, RACECARD_LINK, base.as_ref())? {
            records.links.push(markup::url_link(
                PageKind::RaceCard,
                url,
                &course,
                date,
                Some(off_time),
            ));
        }
        if let Some(url) = link_in(element, RESULT_LINK, base.as_ref())? {
            records.links.push(markup::url_link(
                PageKind::ResultsPage,
                url,
                &course,
                date,
                Some(off_time),
            ));
        }
        meeting.races.push(race);
    }

    records.meetings.push(meeting);
    Ok(records)
}

/// 赛事摘要字段（赛会页与排位表页共用）
pub(crate) fn parse_race_summary(element: ElementRef<'_>) -> Result<ParsedRace, ParseError> {
    let off_time = required_off_time(field(element, &["data-off-time", "data-time"], OFF_TIME)?)?;
    let mut race = ParsedRace::new(off_time);
    race.name = field(element, &["data-race-name"], RACE_NAME)?;
    race.race_class = field(element, &["data-class"], RACE_CLASS)?;
    race.distance = field(element, &["data-distance"], DISTANCE)?;
    race.surface = field(element, &["data-surface"], SURFACE)?;
    race.prize = field(element, &["data-prize"], PRIZE)?;
    Ok(race)
}

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 页面类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageKind {
    Schedule,
    MeetingCard,
    RaceCard,
    ResultsPage,
}

impl fmt::Display for PageKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PageKind::Schedule => write!(f, "schedule"),
            PageKind::MeetingCard => write!(f, "meeting_card"),
            PageKind::RaceCard => write!(f, "race_card"),
            PageKind::ResultsPage => write!(f, "results_page"),
        }
    }
}

/// 解析出的参赛马（原始字符串）
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParsedRunner {
    /// 马名，可能带国家后缀 "(IRE)"
    pub horse_name: String,
    pub jockey: Option<String>,
    pub trainer: Option<String>,
    pub weight: Option<String>,
    pub draw: Option<String>,
    pub starting_price: Option<String>,
}

/// 解析出的赛果行（原始字符串）
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParsedResult {
    pub horse_name: String,
    /// 名次或未完赛代码（PU、UR、F...）
    pub position: String,
    pub time: Option<String>,
    pub starting_price: Option<String>,
    pub distance_beaten: Option<String>,
}

/// 解析出的赛事
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedRace {
    pub off_time: NaiveTime,
    pub name: Option<String>,
    pub race_class: Option<String>,
    pub distance: Option<String>,
    pub surface: Option<String>,
    pub prize: Option<String>,
    pub runners: Vec<ParsedRunner>,
    pub results: Vec<ParsedResult>,
}

impl ParsedRace {
    pub fn new(off_time: NaiveTime) -> Self {
        Self {
            off_time,
            name: None,
            race_class: None,
            distance: None,
            surface: None,
            prize: None,
            runners: Vec::new(),
            results: Vec::new(),
        }
    }
}

/// 解析出的赛会
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedMeeting {
    pub course: String,
    pub date: NaiveDate,
    pub going: Option<String>,
    pub weather: Option<String>,
    pub abandoned: Option<bool>,
    pub races: Vec<ParsedRace>,
}

impl ParsedMeeting {
    pub fn new(course: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            course: course.into(),
            date,
            going: None,
            weather: None,
            abandoned: None,
            races: Vec::new(),
        }
    }
}

/// 链接目标
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkTarget {
    /// 已解析为绝对地址的URL
    Url(String),
    /// JSON赛程中的赛程ID，由编排器通过模板展开
    Fixture { year: i32, fixture_id: String },
}

/// 页面中指向下一级页面的链接
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLink {
    pub kind: PageKind,
    pub target: LinkTarget,
    /// 链接所属赛会（原始赛场名, 日期）
    pub course: String,
    pub date: NaiveDate,
    /// 指向赛事页面时的开赛时间
    pub off_time: Option<NaiveTime>,
    /// 赛程中标记为取消的赛会
    pub abandoned: bool,
}

/// 解析结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedRecords {
    pub page_kind: PageKind,
    pub meetings: Vec<ParsedMeeting>,
    pub links: Vec<PageLink>,
}

impl ParsedRecords {
    pub fn empty(page_kind: PageKind) -> Self {
        Self {
            page_kind,
            meetings: Vec::new(),
            links: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.meetings.is_empty() && self.links.is_empty()
    }
}

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 规范实体标识符
///
/// 由别名表解析得到的稳定标识（例如 `john-smith`、`ascot`）。
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalId(pub String);

impl CanonicalId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 赛马身份键（规范化后的马名）
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HorseKey(pub String);

impl fmt::Display for HorseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 赛会身份键：(赛场, 日期)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MeetingKey {
    /// 规范化赛场标识
    pub course: CanonicalId,
    /// 比赛日期
    pub date: NaiveDate,
}

impl MeetingKey {
    pub fn new(course: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            course: CanonicalId(course.into()),
            date,
        }
    }
}

impl fmt::Display for MeetingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.course, self.date)
    }
}

/// 赛事身份键：(赛会, 开赛时间)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RaceKey {
    pub meeting: MeetingKey,
    pub off_time: NaiveTime,
}

impl RaceKey {
    pub fn new(meeting: MeetingKey, off_time: NaiveTime) -> Self {
        Self { meeting, off_time }
    }

    /// 开赛的本地（英国）时间点
    pub fn off_at(&self) -> NaiveDateTime {
        NaiveDateTime::new(self.meeting.date, self.off_time)
    }
}

impl fmt::Display for RaceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.meeting, self.off_time.format("%H:%M"))
    }
}

/// 参赛马身份键：(赛事, 马名)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RunnerKey {
    pub race: RaceKey,
    pub horse: HorseKey,
}

impl RunnerKey {
    pub fn new(race: RaceKey, horse: HorseKey) -> Self {
        Self { race, horse }
    }
}

impl fmt::Display for RunnerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.race, self.horse)
    }
}

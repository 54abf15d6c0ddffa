// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::keys::MeetingKey;
use super::meeting::Meeting;
use super::race::Race;
use super::race_result::RaceResult;
use super::runner::Runner;
use serde::{Deserialize, Serialize};

/// 记录来源页面
///
/// `seq` 是本次运行内的抓取完成序号，同一身份的冲突值按它决定先后。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSource {
    pub url: String,
    pub seq: u64,
}

/// 规范化后的单场赛事及其参赛马、赛果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRace {
    pub race: Race,
    pub runners: Vec<Runner>,
    pub results: Vec<RaceResult>,
}

impl CanonicalRace {
    pub fn new(race: Race) -> Self {
        Self {
            race,
            runners: Vec::new(),
            results: Vec::new(),
        }
    }
}

/// 规范化后的赛会
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalMeeting {
    pub meeting: Meeting,
    pub races: Vec<CanonicalRace>,
}

/// 规范化记录
///
/// 一个页面经解析、规范化后的输出，所有身份键均已解析为规范标识。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRecords {
    pub source: PageSource,
    pub meetings: Vec<CanonicalMeeting>,
}

impl CanonicalRecords {
    pub fn meeting_keys(&self) -> Vec<MeetingKey> {
        self.meetings.iter().map(|m| m.meeting.key.clone()).collect()
    }

    /// 只保留指定赛会的记录
    pub fn for_meeting(&self, key: &MeetingKey) -> Option<CanonicalRecords> {
        let meetings: Vec<CanonicalMeeting> = self
            .meetings
            .iter()
            .filter(|m| &m.meeting.key == key)
            .cloned()
            .collect();
        if meetings.is_empty() {
            return None;
        }
        Some(CanonicalRecords {
            source: self.source.clone(),
            meetings,
        })
    }

    pub fn record_count(&self) -> usize {
        self.meetings
            .iter()
            .map(|m| {
                1 + m
                    .races
                    .iter()
                    .map(|r| 1 + r.runners.len() + r.results.len())
                    .sum::<usize>()
            })
            .sum()
    }
}

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::keys::RunnerKey;
use super::odds::Odds;
use super::observed::{overlay_field, overlay_required, FieldChange, Observed};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 完赛结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// 完赛名次
    Finished { position: u8 },
    /// 中途被拉停
    PulledUp,
    /// 骑师落马
    Unseated,
    /// 被取消资格
    Disqualified,
    /// 其他未完赛（摔倒、被绊倒、跑出赛道等）
    DidNotFinish,
}

impl Outcome {
    /// 解析名次或未完赛代码，无法识别的文本返回 `None`
    ///
    /// 无法识别的非空代码按未完赛处理；空字符串返回 `None`。
    pub fn parse(raw: &str) -> Option<Self> {
        let code = raw.trim().to_ascii_uppercase();
        if code.is_empty() {
            return None;
        }

        let digits: String = code.chars().take_while(|c| c.is_ascii_digit()).collect();
        if !digits.is_empty() {
            let suffix = &code[digits.len()..];
            if matches!(suffix, "" | "ST" | "ND" | "RD" | "TH" | "=") {
                if let Ok(position) = digits.parse::<u8>() {
                    if position > 0 {
                        return Some(Outcome::Finished { position });
                    }
                }
            }
        }

        Some(match code.as_str() {
            "PU" | "P" => Outcome::PulledUp,
            "UR" | "U" => Outcome::Unseated,
            "DSQ" | "DQ" | "D" => Outcome::Disqualified,
            "F" | "BD" | "B" | "RO" | "R" | "REF" | "RR" | "SU" | "S" | "CO" | "C" | "LFT"
            | "DNF" | "0" => Outcome::DidNotFinish,
            _ => return None,
        })
    }

    pub fn position(&self) -> Option<u8> {
        match self {
            Outcome::Finished { position } => Some(*position),
            _ => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Finished { position } => write!(f, "{}", position),
            Outcome::PulledUp => write!(f, "PU"),
            Outcome::Unseated => write!(f, "UR"),
            Outcome::Disqualified => write!(f, "DSQ"),
            Outcome::DidNotFinish => write!(f, "DNF"),
        }
    }
}

/// 落后距离（百分之一马身）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BeatenDistance(pub u32);

impl BeatenDistance {
    pub fn lengths(&self) -> f64 {
        f64::from(self.0) / 100.0
    }
}

impl fmt::Display for BeatenDistance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}L", self.lengths())
    }
}

/// 赛果实体
///
/// 总是引用且只引用一个参赛马；仅在赛事开赛后创建。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceResult {
    /// 所属参赛马
    pub runner: RunnerKey,
    /// 名次或未完赛代码
    pub outcome: Outcome,
    /// 完赛用时（毫秒）
    pub time_ms: Option<u32>,
    /// 实际返还的起步价
    pub starting_price: Option<Odds>,
    /// 落后距离
    pub distance_beaten: Option<BeatenDistance>,
}

impl RaceResult {
    pub fn new(runner: RunnerKey, outcome: Outcome) -> Self {
        Self {
            runner,
            outcome,
            time_ms: None,
            starting_price: None,
            distance_beaten: None,
        }
    }
}

impl Observed for RaceResult {
    fn overlay(&mut self, observed: &Self) -> Vec<FieldChange> {
        let mut changes = Vec::new();
        overlay_required("outcome", &mut self.outcome, &observed.outcome, &mut changes);
        overlay_field("time_ms", &mut self.time_ms, &observed.time_ms, &mut changes);
        overlay_field(
            "starting_price",
            &mut self.starting_price,
            &observed.starting_price,
            &mut changes,
        );
        overlay_field(
            "distance_beaten",
            &mut self.distance_beaten,
            &observed.distance_beaten,
            &mut changes,
        );
        changes
    }
}

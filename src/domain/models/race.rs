// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::keys::RaceKey;
use super::observed::{overlay_field, FieldChange, Observed};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 赛道表面
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Surface {
    /// 草地
    Turf,
    /// 全天候（Polytrack、Tapeta、Fibresand）
    AllWeather,
}

impl Surface {
    pub fn parse(raw: &str) -> Option<Self> {
        let lowered = raw.trim().to_ascii_lowercase();
        if lowered.is_empty() {
            return None;
        }
        if lowered.contains("turf") || lowered == "grass" {
            return Some(Surface::Turf);
        }
        let all_weather = ["aw", "all weather", "all-weather", "polytrack", "tapeta", "fibresand"];
        if all_weather.iter().any(|m| lowered.contains(m)) {
            return Some(Surface::AllWeather);
        }
        None
    }
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Surface::Turf => write!(f, "turf"),
            Surface::AllWeather => write!(f, "all_weather"),
        }
    }
}

/// 赛事实体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Race {
    /// 身份键 (赛会, 开赛时间)
    pub key: RaceKey,
    /// 赛事名称
    pub name: Option<String>,
    /// 赛事等级 (1-7)
    pub race_class: Option<u8>,
    /// 距离（码）
    pub distance_yards: Option<u32>,
    /// 赛道表面
    pub surface: Option<Surface>,
    /// 奖金（英镑）
    pub prize_money: Option<u64>,
}

impl Race {
    pub fn new(key: RaceKey) -> Self {
        Self {
            key,
            name: None,
            race_class: None,
            distance_yards: None,
            surface: None,
            prize_money: None,
        }
    }
}

impl Observed for Race {
    fn overlay(&mut self, observed: &Self) -> Vec<FieldChange> {
        let mut changes = Vec::new();
        overlay_field("name", &mut self.name, &observed.name, &mut changes);
        overlay_field(
            "race_class",
            &mut self.race_class,
            &observed.race_class,
            &mut changes,
        );
        overlay_field(
            "distance_yards",
            &mut self.distance_yards,
            &observed.distance_yards,
            &mut changes,
        );
        overlay_field("surface", &mut self.surface, &observed.surface, &mut changes);
        overlay_field(
            "prize_money",
            &mut self.prize_money,
            &observed.prize_money,
            &mut changes,
        );
        changes
    }
}

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::keys::MeetingKey;
use super::observed::{overlay_field, FieldChange, Observed};
use serde::{Deserialize, Serialize};

/// 赛会实体
///
/// 某赛场在某一天的赛事安排。身份键为 (赛场, 日期)；
/// 场地状况与天气在开赛前可能变化，日期过去且成绩确定后不再变更。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meeting {
    /// 身份键
    pub key: MeetingKey,
    /// 赛场名称（展示用，不参与比较）
    pub course_name: String,
    /// 场地状况描述，例如 "Good to Firm"
    pub going: Option<String>,
    /// 天气
    pub weather: Option<String>,
    /// 是否已取消
    pub abandoned: Option<bool>,
}

impl Meeting {
    pub fn new(key: MeetingKey, course_name: impl Into<String>) -> Self {
        Self {
            key,
            course_name: course_name.into(),
            going: None,
            weather: None,
            abandoned: None,
        }
    }

    pub fn is_abandoned(&self) -> bool {
        self.abandoned.unwrap_or(false)
    }
}

impl Observed for Meeting {
    fn overlay(&mut self, observed: &Self) -> Vec<FieldChange> {
        let mut changes = Vec::new();
        overlay_field("going", &mut self.going, &observed.going, &mut changes);
        overlay_field("weather", &mut self.weather, &observed.weather, &mut changes);
        overlay_field(
            "abandoned",
            &mut self.abandoned,
            &observed.abandoned,
            &mut changes,
        );
        changes
    }
}

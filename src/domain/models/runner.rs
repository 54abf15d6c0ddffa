// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::keys::{CanonicalId, RunnerKey};
use super::odds::Odds;
use super::observed::{overlay_field, FieldChange, Observed};
use serde::{Deserialize, Serialize};

/// 参赛马实体
///
/// 赛前已知的某匹马在某场赛事中的报名信息。身份键为 (赛事, 规范化马名)。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Runner {
    /// 身份键
    pub key: RunnerKey,
    /// 马名（展示用，去除国家后缀）
    pub horse_name: String,
    /// 国家代码，例如 "IRE"
    pub country: Option<String>,
    /// 骑师规范标识
    pub jockey: Option<CanonicalId>,
    /// 见习骑师减磅
    pub jockey_allowance_lbs: Option<u8>,
    /// 练马师规范标识
    pub trainer: Option<CanonicalId>,
    /// 负磅（磅）
    pub weight_lbs: Option<u16>,
    /// 闸位
    pub draw: Option<u8>,
    /// 赛前公布的起步价，未公布时为空
    pub starting_price: Option<Odds>,
}

impl Runner {
    pub fn new(key: RunnerKey, horse_name: impl Into<String>) -> Self {
        Self {
            key,
            horse_name: horse_name.into(),
            country: None,
            jockey: None,
            jockey_allowance_lbs: None,
            trainer: None,
            weight_lbs: None,
            draw: None,
            starting_price: None,
        }
    }
}

impl Observed for Runner {
    fn overlay(&mut self, observed: &Self) -> Vec<FieldChange> {
        let mut changes = Vec::new();
        overlay_field("country", &mut self.country, &observed.country, &mut changes);
        overlay_field("jockey", &mut self.jockey, &observed.jockey, &mut changes);
        overlay_field(
            "jockey_allowance_lbs",
            &mut self.jockey_allowance_lbs,
            &observed.jockey_allowance_lbs,
            &mut changes,
        );
        overlay_field("trainer", &mut self.trainer, &observed.trainer, &mut changes);
        overlay_field(
            "weight_lbs",
            &mut self.weight_lbs,
            &observed.weight_lbs,
            &mut changes,
        );
        overlay_field("draw", &mut self.draw, &observed.draw, &mut changes);
        overlay_field(
            "starting_price",
            &mut self.starting_price,
            &observed.starting_price,
            &mut changes,
        );
        changes
    }
}

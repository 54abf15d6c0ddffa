// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::{
    CanonicalId, CanonicalMeeting, CanonicalRace, CanonicalRecords, HorseKey, Meeting, MeetingKey,
    Odds, Outcome, PageSource, Race, RaceKey, RaceResult, Runner, RunnerKey, Surface,
};
use crate::domain::repositories::alias_repository::{AliasTable, EntityCategory};
use crate::parsers::records::{ParsedMeeting, ParsedRace, ParsedRecords, ParsedResult, ParsedRunner};
use crate::utils::racing_formats::{
    collapse_whitespace, normalize_name, parse_beaten_distance, parse_distance_yards, parse_prize,
    parse_race_time_ms, parse_weight_lbs, slugify, split_allowance, split_country,
};
use dashmap::DashMap;
use std::sync::Arc;

/// 规范化服务
///
/// 把解析器输出的原始字符串转换为规范记录，并解析跨页面的实体身份。
/// 别名解析结果按运行缓存，同一运行内同一原始名称总是得到同一标识。
pub struct Normalizer {
    aliases: Arc<dyn AliasTable>,
    memo: DashMap<(EntityCategory, String), CanonicalId>,
}

impl Normalizer {
    /// 创建规范化服务
    ///
    /// # 参数
    ///
    /// * `aliases` - 别名表协作者
    pub fn new(aliases: Arc<dyn AliasTable>) -> Self {
        Self {
            aliases,
            memo: DashMap::new(),
        }
    }

    /// 规范化一个页面的解析结果
    ///
    /// # 参数
    ///
    /// * `parsed` - 解析器输出
    /// * `source` - 页面地址与抓取序号
    ///
    /// # 返回值
    ///
    /// 规范记录。该过程没有失败路径：无法识别的可选字段被视为未观测。
    pub fn normalize(&self, parsed: &ParsedRecords, source: PageSource) -> CanonicalRecords {
        let meetings = parsed
            .meetings
            .iter()
            .map(|meeting| self.normalize_meeting(meeting))
            .collect();
        CanonicalRecords { source, meetings }
    }

    /// 赛会身份键
    pub fn meeting_key(&self, course: &str, date: chrono::NaiveDate) -> MeetingKey {
        MeetingKey {
            course: self.resolve(course, EntityCategory::Course),
            date,
        }
    }

    /// 马名身份键：去掉国家后缀后规范化
    ///
    /// `"Bold Venture (IRE)"`、`" bold  VENTURE "` 得到同一个键。
    pub fn horse_key(&self, raw: &str) -> (HorseKey, String, Option<String>) {
        let (name, country) = split_country(raw);
        let key = HorseKey(slugify(&normalize_name(&name)));
        (key, name, country)
    }

    /// 通过别名表解析骑师、练马师或赛场名称
    pub fn resolve(&self, raw: &str, category: EntityCategory) -> CanonicalId {
        let memo_key = (category, normalize_name(raw));
        if let Some(id) = self.memo.get(&memo_key) {
            return id.value().clone();
        }
        let id = self.aliases.resolve(&memo_key.1, category);
        self.memo.entry(memo_key).or_insert(id).value().clone()
    }

    /// 本次运行已缓存的别名解析数
    pub fn memo_len(&self) -> usize {
        self.memo.len()
    }

    fn resolve_optional(&self, raw: Option<&str>, category: EntityCategory) -> Option<CanonicalId> {
        raw.filter(|r| !normalize_name(r).is_empty())
            .map(|r| self.resolve(r, category))
    }

    fn normalize_meeting(&self, parsed: &ParsedMeeting) -> CanonicalMeeting {
        let key = self.meeting_key(&parsed.course, parsed.date);
        let mut meeting = Meeting::new(key.clone(), collapse_whitespace(&parsed.course));
        meeting.going = non_empty(parsed.going.as_deref());
        meeting.weather = non_empty(parsed.weather.as_deref());
        meeting.abandoned = parsed.abandoned;

        let races = parsed
            .races
            .iter()
            .map(|race| self.normalize_race(&key, race))
            .collect();
        CanonicalMeeting { meeting, races }
    }

    fn normalize_race(&self, meeting: &MeetingKey, parsed: &ParsedRace) -> CanonicalRace {
        let key = RaceKey::new(meeting.clone(), parsed.off_time);
        let mut race = Race::new(key.clone());
        race.name = non_empty(parsed.name.as_deref());
        race.race_class = parsed.race_class.as_deref().and_then(parse_race_class);
        race.distance_yards = parsed.distance.as_deref().and_then(parse_distance_yards);
        race.surface = parsed.surface.as_deref().and_then(Surface::parse);
        race.prize_money = parsed.prize.as_deref().and_then(parse_prize);

        let mut canonical = CanonicalRace::new(race);
        canonical.runners = parsed
            .runners
            .iter()
            .map(|runner| self.normalize_runner(&key, runner))
            .collect();
        canonical.results = parsed
            .results
            .iter()
            .filter_map(|result| self.normalize_result(&key, result))
            .collect();
        canonical
    }

    fn normalize_runner(&self, race: &RaceKey, parsed: &ParsedRunner) -> Runner {
        let (horse, name, country) = self.horse_key(&parsed.horse_name);
        let mut runner = Runner::new(RunnerKey::new(race.clone(), horse), name);
        runner.country = country;

        if let Some(raw) = parsed.jockey.as_deref() {
            let (jockey, allowance) = split_allowance(raw);
            runner.jockey = self.resolve_optional(Some(jockey.as_str()), EntityCategory::Jockey);
            runner.jockey_allowance_lbs = allowance;
        }
        runner.trainer = self.resolve_optional(parsed.trainer.as_deref(), EntityCategory::Trainer);
        runner.weight_lbs = parsed.weight.as_deref().and_then(parse_weight_lbs);
        runner.draw = parsed.draw.as_deref().and_then(|d| d.trim().parse().ok());
        runner.starting_price = parsed.starting_price.as_deref().and_then(Odds::parse);
        runner
    }

    fn normalize_result(&self, race: &RaceKey, parsed: &ParsedResult) -> Option<RaceResult> {
        let Some(outcome) = Outcome::parse(&parsed.position) else {
            tracing::debug!(race = %race, horse = %parsed.horse_name, "Result row without outcome dropped");
            return None;
        };
        let (horse, _, _) = self.horse_key(&parsed.horse_name);
        let mut result = RaceResult::new(RunnerKey::new(race.clone(), horse), outcome);
        result.time_ms = parsed.time.as_deref().and_then(parse_race_time_ms);
        result.starting_price = parsed.starting_price.as_deref().and_then(Odds::parse);
        result.distance_beaten = parsed.distance_beaten.as_deref().and_then(parse_beaten_distance);
        Some(result)
    }
}

fn non_empty(raw: Option<&str>) -> Option<String> {
    raw.map(collapse_whitespace).filter(|v| !v.is_empty())
}

/// "Class 2" → 2
fn parse_race_class(raw: &str) -> Option<u8> {
    let digits: String = raw
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok().filter(|class| (1..=7).contains(class))
}

#[cfg(test)]
#[path = "normalizer_test.rs"]
mod tests;

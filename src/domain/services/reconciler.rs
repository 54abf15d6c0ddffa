// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::{
    CanonicalRecords, ConflictNote, EntityRecord, Meeting, MeetingKey, Observed, Race, RaceResult,
    Rejection, Runner, RunnerKey, UpsertOp, UpsertPlan,
};
use crate::domain::repositories::racing_repository::StorageSnapshot;
use crate::utils::errors::ReconcileError;
use chrono::{NaiveDateTime, NaiveTime};
use std::collections::{BTreeMap, BTreeSet};

/// 一条观测记录及其来源页面
#[derive(Debug, Clone)]
struct Observation<T> {
    value: T,
    url: String,
}

/// 一个赛会在本次运行中合并后的观测
#[derive(Debug, Default)]
struct MergedMeeting {
    meeting: Option<Observation<Meeting>>,
    races: BTreeMap<NaiveTime, Observation<Race>>,
    runners: BTreeMap<RunnerKey, Observation<Runner>>,
    results: BTreeMap<RunnerKey, Observation<RaceResult>>,
    conflicts: Vec<ConflictNote>,
    /// 父实体不在本赛会内的记录：(身份, 来源URL)
    orphans: Vec<(String, String)>,
}

impl MergedMeeting {
    fn runners_of(&self, off: NaiveTime) -> impl Iterator<Item = &Observation<Runner>> {
        self.runners
            .iter()
            .filter(move |(key, _)| key.race.off_time == off)
            .map(|(_, obs)| obs)
    }

    fn results_of(&self, off: NaiveTime) -> impl Iterator<Item = &Observation<RaceResult>> {
        self.results
            .iter()
            .filter(move |(key, _)| key.race.off_time == off)
            .map(|(_, obs)| obs)
    }
}

/// 合并同一身份的多次观测，后抓取的页面胜出
///
/// 与已观测值不同的新值记录为冲突。
fn merge<K, T>(
    slot: &mut BTreeMap<K, Observation<T>>,
    key: K,
    value: &T,
    url: &str,
    identity: String,
    conflicts: &mut Vec<ConflictNote>,
) where
    K: Ord,
    T: Observed + Clone,
{
    match slot.get_mut(&key) {
        Some(existing) => {
            for change in existing.value.overlay(value) {
                if change.before.is_some() {
                    conflicts.push(ConflictNote {
                        identity: identity.clone(),
                        change,
                        winner_url: url.to_string(),
                    });
                }
            }
            existing.url = url.to_string();
        }
        None => {
            slot.insert(
                key,
                Observation {
                    value: value.clone(),
                    url: url.to_string(),
                },
            );
        }
    }
}

/// 对账服务
///
/// 把一个赛会的规范记录与存储快照比较，生成幂等的写入计划。
#[derive(Debug, Clone, Copy, Default)]
pub struct Reconciler;

impl Reconciler {
    pub fn new() -> Self {
        Self
    }

    /// 单页面对账
    pub fn reconcile(
        &self,
        records: &CanonicalRecords,
        existing: &StorageSnapshot,
        as_of: NaiveDateTime,
    ) -> UpsertPlan {
        self.reconcile_pages(std::slice::from_ref(records), existing, as_of)
    }

    /// 把一个赛会在本次运行中的全部页面与快照对账
    ///
    /// # 参数
    ///
    /// * `pages` - 规范记录，按抓取序号合并（后抓取者胜出）
    /// * `existing` - 该赛会的存储快照
    /// * `as_of` - 英国本地时间，用于判断赛事是否已开赛
    ///
    /// # 返回值
    ///
    /// 写入计划：赛会、按开赛时间排序的赛事，每场赛事后跟其参赛马与赛果。
    /// 被拒绝的记录进入 `rejections`，不会被应用。
    pub fn reconcile_pages(
        &self,
        pages: &[CanonicalRecords],
        existing: &StorageSnapshot,
        as_of: NaiveDateTime,
    ) -> UpsertPlan {
        let Some(meeting_key) = existing
            .meeting_key
            .clone()
            .or_else(|| pages.iter().flat_map(|p| p.meeting_keys()).next())
        else {
            return UpsertPlan::new(MeetingKey::new("", as_of.date()));
        };

        let merged = merge_pages(pages, &meeting_key);
        let mut plan = UpsertPlan::new(meeting_key);
        plan.conflicts = merged.conflicts.clone();
        for (identity, url) in &merged.orphans {
            reject(
                &mut plan,
                identity.clone(),
                url,
                ReconcileError::UnknownMeeting(identity.clone()),
            );
        }

        if merged.meeting.is_none() && existing.meeting.is_none() {
            for race in merged.races.values() {
                let identity = race.value.key.to_string();
                reject(
                    &mut plan,
                    identity.clone(),
                    &race.url,
                    ReconcileError::UnknownMeeting(identity),
                );
            }
            return plan;
        }

        if existing.is_final(as_of.date()) {
            plan.frozen = true;
            plan.operations = frozen_operations(&merged);
            tracing::debug!(meeting = %plan.meeting_key, "Meeting is final, every operation skipped");
            return plan;
        }

        if let Some(obs) = &merged.meeting {
            plan.operations
                .push(diff(existing.meeting.as_ref(), &obs.value, EntityRecord::Meeting));
        }

        for (off, race_obs) in &merged.races {
            let race = &race_obs.value;
            plan.operations
                .push(diff(existing.races.get(off), race, EntityRecord::Race));

            let is_off = race.key.off_at() <= as_of;
            let runners_locked = is_off && existing.has_runners(*off);
            let mut inserted: BTreeSet<&RunnerKey> = BTreeSet::new();

            for obs in merged.runners_of(*off) {
                let runner = &obs.value;
                match existing.runners.get(&runner.key) {
                    Some(stored) => {
                        plan.operations
                            .push(diff(Some(stored), runner, EntityRecord::Runner));
                    }
                    None if runners_locked => reject(
                        &mut plan,
                        runner.key.to_string(),
                        &obs.url,
                        ReconcileError::RunnerAfterOff(runner.key.to_string()),
                    ),
                    None => {
                        inserted.insert(&runner.key);
                        plan.operations
                            .push(UpsertOp::insert(EntityRecord::Runner(runner.clone())));
                    }
                }
            }

            for obs in merged.results_of(*off) {
                let result = &obs.value;
                let identity = format!("{}#result", result.runner);
                if !is_off {
                    reject(
                        &mut plan,
                        identity,
                        &obs.url,
                        ReconcileError::ResultBeforeOff(race.key.to_string()),
                    );
                    continue;
                }
                if !existing.runners.contains_key(&result.runner)
                    && !inserted.contains(&result.runner)
                {
                    reject(
                        &mut plan,
                        identity,
                        &obs.url,
                        ReconcileError::UnknownRunner(result.runner.to_string()),
                    );
                    continue;
                }
                plan.operations.push(diff(
                    existing.results.get(&result.runner),
                    result,
                    EntityRecord::Result,
                ));
            }
        }

        plan
    }
}

fn merge_pages(pages: &[CanonicalRecords], meeting_key: &MeetingKey) -> MergedMeeting {
    let mut ordered: Vec<&CanonicalRecords> = pages.iter().collect();
    ordered.sort_by_key(|page| page.source.seq);

    let mut merged = MergedMeeting::default();
    for page in ordered {
        let url = page.source.url.as_str();
        for meeting in page.meetings.iter().filter(|m| &m.meeting.key == meeting_key) {
            match merged.meeting.as_mut() {
                Some(existing) => {
                    for change in existing.value.overlay(&meeting.meeting) {
                        if change.before.is_some() {
                            merged.conflicts.push(ConflictNote {
                                identity: meeting_key.to_string(),
                                change,
                                winner_url: url.to_string(),
                            });
                        }
                    }
                    existing.url = url.to_string();
                }
                None => {
                    merged.meeting = Some(Observation {
                        value: meeting.meeting.clone(),
                        url: url.to_string(),
                    });
                }
            }

            for race in &meeting.races {
                if &race.race.key.meeting != meeting_key {
                    merged
                        .orphans
                        .push((race.race.key.to_string(), url.to_string()));
                    continue;
                }
                let (runners, stray_runners): (Vec<&Runner>, Vec<&Runner>) = race
                    .runners
                    .iter()
                    .partition(|runner| runner.key.race == race.race.key);
                let (results, stray_results): (Vec<&RaceResult>, Vec<&RaceResult>) = race
                    .results
                    .iter()
                    .partition(|result| result.runner.race == race.race.key);
                merged.orphans.extend(
                    stray_runners
                        .iter()
                        .map(|runner| (runner.key.to_string(), url.to_string()))
                        .chain(
                            stray_results
                                .iter()
                                .map(|result| (format!("{}#result", result.runner), url.to_string())),
                        ),
                );

                merge(
                    &mut merged.races,
                    race.race.key.off_time,
                    &race.race,
                    url,
                    race.race.key.to_string(),
                    &mut merged.conflicts,
                );
                for runner in runners {
                    merge(
                        &mut merged.runners,
                        runner.key.clone(),
                        runner,
                        url,
                        runner.key.to_string(),
                        &mut merged.conflicts,
                    );
                }
                for result in results {
                    merge(
                        &mut merged.results,
                        result.runner.clone(),
                        result,
                        url,
                        format!("{}#result", result.runner),
                        &mut merged.conflicts,
                    );
                }
            }
        }
    }
    merged
}

/// 存储中没有该实体时插入；否则把观测值叠加到存储值上比较
fn diff<T>(stored: Option<&T>, observed: &T, wrap: fn(T) -> EntityRecord) -> UpsertOp
where
    T: Observed + Clone,
{
    match stored {
        None => UpsertOp::insert(wrap(observed.clone())),
        Some(stored) => {
            let mut updated = stored.clone();
            let changes = updated.overlay(observed);
            UpsertOp::diffed(wrap(updated), changes)
        }
    }
}

fn reject(plan: &mut UpsertPlan, identity: String, url: &str, error: ReconcileError) {
    tracing::debug!(identity = %identity, source = %url, error = %error, "Record rejected");
    plan.rejections.push(Rejection {
        identity,
        source_url: url.to_string(),
        error,
    });
}

fn frozen_operations(merged: &MergedMeeting) -> Vec<UpsertOp> {
    let mut operations = Vec::new();
    if let Some(obs) = &merged.meeting {
        operations.push(UpsertOp::skip(EntityRecord::Meeting(obs.value.clone())));
    }
    for (off, race) in &merged.races {
        operations.push(UpsertOp::skip(EntityRecord::Race(race.value.clone())));
        operations.extend(
            merged
                .runners_of(*off)
                .map(|obs| UpsertOp::skip(EntityRecord::Runner(obs.value.clone()))),
        );
        operations.extend(
            merged
                .results_of(*off)
                .map(|obs| UpsertOp::skip(EntityRecord::Result(obs.value.clone()))),
        );
    }
    operations
}

#[cfg(test)]
#[path = "reconciler_test.rs"]
mod tests;

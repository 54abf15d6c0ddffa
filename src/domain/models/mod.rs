// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 该模块定义了系统的核心业务实体，包括：
/// - 赛会（meeting）、赛事（race）、参赛马（runner）、赛果（race_result）
/// - 身份键（keys）与规范化赔率（odds）
/// - 规范化记录（records）、写入计划（upsert_plan）与运行报告（scrape_run）
///
/// 实体之间构成严格的树：赛会 → 赛事 → 参赛马 → 赛果。
pub mod keys;
pub mod meeting;
pub mod observed;
pub mod odds;
pub mod race;
pub mod race_result;
pub mod records;
pub mod runner;
pub mod scrape_run;
pub mod upsert_plan;

pub use keys::{CanonicalId, HorseKey, MeetingKey, RaceKey, RunnerKey};
pub use meeting::Meeting;
pub use observed::{FieldChange, Observed};
pub use odds::Odds;
pub use race::{Race, Surface};
pub use race_result::{BeatenDistance, Outcome, RaceResult};
pub use records::{CanonicalMeeting, CanonicalRace, CanonicalRecords, PageSource};
pub use runner::Runner;
pub use scrape_run::{FailureRecord, FailureStage, RunCounts, RunState, ScrapeRun};
pub use upsert_plan::{
    AppliedCounts, ConflictNote, EntityRecord, Rejection, UpsertAction, UpsertOp, UpsertPlan,
};

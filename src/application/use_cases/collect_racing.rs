// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::application::context::{CancelHandle, RunContext};
use crate::config::settings::Settings;
use crate::domain::models::{
    AppliedCounts, CanonicalRecords, FailureRecord, FailureStage, MeetingKey, RunState,
    ScrapeRun, UpsertAction, UpsertPlan,
};
use crate::domain::repositories::alias_repository::AliasTable;
use crate::domain::repositories::racing_repository::RacingStorage;
use crate::domain::services::reconciler::Reconciler;
use crate::engines::fetcher::Fetcher;
use crate::engines::traits::PageEngine;
use crate::parsers::{LinkTarget, PageKind, PageLink};
use crate::utils::errors::{OrchestrationError, StorageError};
use crate::utils::url_utils::{expand_date_template, expand_fixture_template};
use crate::workers::page_worker::{PageOutcome, PageTask, PageWorker};
use chrono::{NaiveDate, NaiveDateTime};
use dashmap::DashMap;
use futures::stream::{self, StreamExt};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// 采集请求：闭区间日期范围
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectRacingRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl CollectRacingRequest {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
        }
    }

    pub fn single_day(date: NaiveDate) -> Self {
        Self::new(date, date)
    }

    fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

/// 一次运行中累积的页面数据
#[derive(Default)]
struct Harvest {
    /// 成功规范化的页面
    pages: Vec<CanonicalRecords>,
    /// 尚未调度的链接
    links: Vec<PageLink>,
    /// 至少一个页面失败的赛会
    failed_meetings: HashSet<MeetingKey>,
    /// 已调度过的URL
    seen_urls: HashSet<String>,
}

impl Harvest {
    fn abandoned_meetings(&self) -> HashSet<MeetingKey> {
        self.pages
            .iter()
            .flat_map(|page| page.meetings.iter())
            .filter(|m| m.meeting.is_abandoned())
            .map(|m| m.meeting.key.clone())
            .collect()
    }

    /// 按赛会分组，每组内保持抓取顺序
    fn by_meeting(&self) -> BTreeMap<MeetingKey, Vec<CanonicalRecords>> {
        let mut grouped: BTreeMap<MeetingKey, Vec<CanonicalRecords>> = BTreeMap::new();
        for page in &self.pages {
            let keys: BTreeSet<MeetingKey> = page.meeting_keys().into_iter().collect();
            for key in keys {
                if let Some(slice) = page.for_meeting(&key) {
                    grouped.entry(key).or_default().push(slice);
                }
            }
        }
        grouped
    }
}

/// 采集赛马数据用例
///
/// 驱动一次完整的流水线运行：赛程 → 赛会页 → 赛事页/赛果页 → 对账写入。
/// 单个页面或记录的失败只会被记录，不会中断运行。
pub struct CollectRacingUseCase {
    schedule_engine: Arc<dyn PageEngine>,
    page_engine: Arc<dyn PageEngine>,
    storage: Arc<dyn RacingStorage>,
    aliases: Arc<dyn AliasTable>,
    settings: Arc<Settings>,
    meeting_locks: DashMap<MeetingKey, Arc<Mutex<()>>>,
}

impl CollectRacingUseCase {
    /// 创建用例
    ///
    /// # 参数
    ///
    /// * `schedule_engine` - 抓取赛程页的引擎
    /// * `page_engine` - 抓取赛会页、赛事页与赛果页的引擎
    /// * `storage` - 存储协作者
    /// * `aliases` - 别名表协作者
    /// * `settings` - 应用配置
    pub fn new(
        schedule_engine: Arc<dyn PageEngine>,
        page_engine: Arc<dyn PageEngine>,
        storage: Arc<dyn RacingStorage>,
        aliases: Arc<dyn AliasTable>,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            schedule_engine,
            page_engine,
            storage,
            aliases,
            settings,
            meeting_locks: DashMap::new(),
        }
    }

    /// 执行一次运行
    ///
    /// # 参数
    ///
    /// * `request` - 日期范围
    /// * `cancel` - 取消信号，触发后不再调度新的抓取，已完成的工作仍会对账
    ///
    /// # 返回值
    ///
    /// 仅在日期范围非法时返回错误（此时运行尚未开始）。
    /// 其余情况总是返回运行报告，状态为 `Completed` 或 `Failed`。
    pub async fn run(
        &self,
        request: CollectRacingRequest,
        cancel: CancelHandle,
    ) -> Result<ScrapeRun, OrchestrationError> {
        let dates = daily_dates(request.start_date, request.end_date)?;
        let ctx = RunContext::new(
            self.aliases.clone(),
            self.settings.fetcher.per_host_concurrency,
            self.settings.run.as_of,
            cancel,
        );
        let mut run = ScrapeRun::new(ctx.run_id);
        let mut harvest = Harvest::default();

        let fetcher_settings = Arc::new(self.settings.fetcher.clone());
        let schedule_worker = PageWorker::new(
            Fetcher::new(self.schedule_engine.clone(), ctx.throttle.clone()),
            fetcher_settings.clone(),
        );
        let page_worker = PageWorker::new(
            Fetcher::new(self.page_engine.clone(), ctx.throttle.clone()),
            fetcher_settings,
        );
        let concurrency = self.settings.pipeline.worker_concurrency;

        info!(
            run_id = %ctx.run_id,
            start = %request.start_date,
            end = %request.end_date,
            "Starting racing collection"
        );

        run.advance(RunState::FetchingSchedule);
        let tasks: Vec<PageTask> =
            schedule_urls(&self.settings.sources.schedule_url_template, &dates)
                .into_iter()
                .map(|url| PageTask::new(url, PageKind::Schedule, None))
                .collect();
        let outcomes = schedule_worker.process_all(&ctx, tasks, concurrency).await;
        let schedule_pages = absorb(&mut run, &mut harvest, outcomes);

        if schedule_pages == 0 && !ctx.is_cancelled() {
            let err = OrchestrationError::NoSchedule;
            error!(run_id = %ctx.run_id, "{}", err);
            run.fail(&err);
            metrics::counter!("racecrawl_runs_total", "state" => run.state.to_string())
                .increment(1);
            return Ok(run);
        }

        // schedule feeds are monthly, keep only the requested days
        for page in &mut harvest.pages {
            page.meetings
                .retain(|m| request.contains(m.meeting.key.date));
        }
        harvest.links.retain(|link| request.contains(link.date));

        run.advance(RunState::FetchingMeetings);
        let tasks = self.next_tasks(&ctx, &mut harvest, &[PageKind::MeetingCard]);
        info!(meetings = tasks.len(), "Fetching meeting cards");
        let outcomes = page_worker.process_all(&ctx, tasks, concurrency).await;
        absorb(&mut run, &mut harvest, outcomes);

        run.advance(RunState::FetchingRaces);
        let tasks = self.next_tasks(
            &ctx,
            &mut harvest,
            &[PageKind::RaceCard, PageKind::ResultsPage],
        );
        info!(pages = tasks.len(), "Fetching race cards and results");
        let outcomes = page_worker.process_all(&ctx, tasks, concurrency).await;
        absorb(&mut run, &mut harvest, outcomes);

        run.advance(RunState::Reconciling);
        self.reconcile_all(&ctx, &mut run, &harvest).await;

        run.cancelled = ctx.is_cancelled();
        run.advance(RunState::Completed);
        metrics::counter!("racecrawl_runs_total", "state" => run.state.to_string()).increment(1);

        info!(
            run_id = %run.run_id,
            fetched = run.counts.fetched,
            parsed = run.counts.parsed,
            upserted = run.counts.upserted,
            skipped = run.counts.skipped,
            failed = run.counts.failed,
            reconciled = run.meetings_reconciled,
            partial = run.meetings_partial,
            cancelled = run.cancelled,
            "Racing collection finished"
        );
        Ok(run)
    }

    /// 取出指定类型的待调度链接并转换为任务
    fn next_tasks(
        &self,
        ctx: &RunContext,
        harvest: &mut Harvest,
        kinds: &[PageKind],
    ) -> Vec<PageTask> {
        let (selected, rest): (Vec<PageLink>, Vec<PageLink>) = std::mem::take(&mut harvest.links)
            .into_iter()
            .partition(|link| kinds.contains(&link.kind));
        harvest.links = rest;

        let abandoned = harvest.abandoned_meetings();
        let as_of = ctx.as_of();
        let mut tasks = Vec::new();
        for link in selected {
            let meeting = ctx.normalizer.meeting_key(&link.course, link.date);
            if link.abandoned || abandoned.contains(&meeting) {
                debug!(%meeting, "Meeting abandoned, not fetching its pages");
                continue;
            }
            if link.kind == PageKind::ResultsPage && !off_time_passed(&link, as_of) {
                debug!(%meeting, off = ?link.off_time, "Race not yet off, results not fetched");
                continue;
            }

            let url = match &link.target {
                LinkTarget::Url(url) => url.clone(),
                LinkTarget::Fixture { year, fixture_id } => expand_fixture_template(
                    &self.settings.sources.fixture_url_template,
                    *year,
                    fixture_id,
                ),
            };
            if !harvest.seen_urls.insert(url.clone()) {
                continue;
            }
            tasks.push(PageTask::new(url, link.kind, Some(meeting)));
        }
        tasks
    }

    async fn reconcile_all(&self, ctx: &RunContext, run: &mut ScrapeRun, harvest: &Harvest) {
        let as_of = ctx.as_of();
        let grouped = harvest.by_meeting();
        info!(meetings = grouped.len(), "Reconciling meetings");

        let outcomes: Vec<(MeetingKey, Result<(UpsertPlan, AppliedCounts), StorageError>)> =
            stream::iter(grouped)
                .map(|(key, pages)| async move {
                    let outcome = self.reconcile_meeting(&key, &pages, as_of).await;
                    (key, outcome)
                })
                .buffer_unordered(self.settings.pipeline.reconcile_concurrency.max(1))
                .collect()
                .await;

        for (key, outcome) in outcomes {
            match outcome {
                Ok((plan, counts)) => {
                    run.counts.upserted += counts.upserted();
                    run.counts.skipped += counts.skipped;
                    record_upsert_metrics(&plan);

                    for conflict in &plan.conflicts {
                        debug!(
                            identity = %conflict.identity,
                            field = %conflict.change.field,
                            winner = %conflict.winner_url,
                            "Conflicting values in one run, later page wins"
                        );
                    }
                    for rejection in plan.rejections {
                        run.record_failure(FailureRecord::new(
                            rejection.source_url,
                            FailureStage::Reconcile,
                            &rejection.error,
                        ));
                    }

                    if harvest.failed_meetings.contains(&key) {
                        run.meetings_partial += 1;
                    } else {
                        run.meetings_reconciled += 1;
                    }
                }
                Err(e) => {
                    error!(meeting = %key, "Meeting upserts failed: {}", e);
                    run.record_failure(FailureRecord::new(
                        key.to_string(),
                        FailureStage::Storage,
                        &e,
                    ));
                }
            }
        }
    }

    /// 在赛会锁内读取快照、生成计划并写入
    async fn reconcile_meeting(
        &self,
        key: &MeetingKey,
        pages: &[CanonicalRecords],
        as_of: NaiveDateTime,
    ) -> Result<(UpsertPlan, AppliedCounts), StorageError> {
        let lock = self
            .meeting_locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        let existing = retry_once("read_snapshot", key, || self.storage.read_snapshot(key)).await?;
        let plan = Reconciler::new().reconcile_pages(pages, &existing, as_of);
        debug!(
            meeting = %key,
            operations = plan.operations.len(),
            inserts = plan.count(UpsertAction::Insert),
            updates = plan.count(UpsertAction::Update),
            frozen = plan.frozen,
            "Upsert plan built"
        );
        let counts = retry_once("apply", key, || self.storage.apply(&plan)).await?;
        Ok((plan, counts))
    }
}

/// 汇总一批页面结果，返回成功解析的页面数
fn absorb(run: &mut ScrapeRun, harvest: &mut Harvest, outcomes: Vec<PageOutcome>) -> usize {
    let mut parsed_pages = 0;
    for outcome in outcomes {
        if outcome.was_fetched() {
            run.counts.fetched += 1;
        }
        match outcome {
            PageOutcome::Parsed {
                parsed, canonical, ..
            } => {
                run.counts.parsed += 1;
                parsed_pages += 1;
                harvest.links.extend(parsed.links);
                harvest.pages.push(canonical);
            }
            PageOutcome::Failed { task, failure } => {
                if let Some(meeting) = task.meeting {
                    harvest.failed_meetings.insert(meeting);
                }
                run.record_failure(failure);
            }
            PageOutcome::Cancelled(task) => {
                debug!(url = %task.url, "Page dropped after cancellation");
            }
        }
    }
    parsed_pages
}

fn record_upsert_metrics(plan: &UpsertPlan) {
    for action in [UpsertAction::Insert, UpsertAction::Update, UpsertAction::Skip] {
        let count = plan.count(action);
        if count > 0 {
            metrics::counter!("racecrawl_upserts_total", "action" => action.to_string())
                .increment(count as u64);
        }
    }
}

/// 存储调用失败时重试一次
async fn retry_once<T, F, Fut>(
    operation: &'static str,
    meeting: &MeetingKey,
    mut call: F,
) -> Result<T, StorageError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StorageError>>,
{
    match call().await {
        Ok(value) => Ok(value),
        Err(e) => {
            warn!(%meeting, operation, "Storage call failed, retrying once: {}", e);
            call().await
        }
    }
}

/// 开赛时间是否已过；没有开赛时间时按日期判断
fn off_time_passed(link: &PageLink, as_of: NaiveDateTime) -> bool {
    match link.off_time {
        Some(off) => link.date.and_time(off) <= as_of,
        None => link.date < as_of.date(),
    }
}

/// 按天展开日期范围（含两端）
///
/// # 返回值
///
/// 起始日期晚于结束日期时返回 `InvalidDateRange`
pub fn daily_dates(
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<NaiveDate>, OrchestrationError> {
    if start > end {
        return Err(OrchestrationError::InvalidDateRange { start, end });
    }
    Ok(start.iter_days().take_while(|d| *d <= end).collect())
}

/// 为每一天展开赛程URL，去重并保持首次出现的顺序
///
/// 按月的模板在一个月内只会产生一个URL。
pub fn schedule_urls(template: &str, dates: &[NaiveDate]) -> Vec<String> {
    let mut seen = HashSet::new();
    dates
        .iter()
        .map(|date| expand_date_template(template, *date))
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

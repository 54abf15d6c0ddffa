// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::application::context::RunContext;
use crate::config::settings::FetcherSettings;
use crate::domain::models::{
    CanonicalRecords, FailureRecord, FailureStage, MeetingKey, PageSource,
};
use crate::engines::fetcher::Fetcher;
use crate::parsers::{self, PageKind, ParsedRecords};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// 一个待处理的页面
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTask {
    pub url: String,
    pub kind: PageKind,
    /// 页面所属的赛会（赛程页为空）
    pub meeting: Option<MeetingKey>,
}

impl PageTask {
    pub fn new(url: impl Into<String>, kind: PageKind, meeting: Option<MeetingKey>) -> Self {
        Self {
            url: url.into(),
            kind,
            meeting,
        }
    }
}

/// 页面处理结果
#[derive(Debug)]
pub enum PageOutcome {
    /// 抓取、解析与规范化全部成功
    Parsed {
        task: PageTask,
        parsed: ParsedRecords,
        canonical: CanonicalRecords,
    },
    /// 抓取或解析失败，页面被跳过
    Failed {
        task: PageTask,
        failure: FailureRecord,
    },
    /// 运行已取消，页面未被调度
    Cancelled(PageTask),
}

impl PageOutcome {
    /// 页面内容是否已取回（解析失败也算已取回）
    pub fn was_fetched(&self) -> bool {
        match self {
            PageOutcome::Parsed { .. } => true,
            PageOutcome::Failed { failure, .. } => failure.stage != FailureStage::Fetch,
            PageOutcome::Cancelled(_) => false,
        }
    }
}

/// 页面工作器
///
/// 对单个URL执行 抓取 → 解析 → 规范化，失败被转换为失败记录而不是错误。
#[derive(Clone)]
pub struct PageWorker {
    fetcher: Fetcher,
    settings: Arc<FetcherSettings>,
}

impl PageWorker {
    pub fn new(fetcher: Fetcher, settings: Arc<FetcherSettings>) -> Self {
        Self { fetcher, settings }
    }

    /// 处理单个页面
    #[instrument(skip(self, ctx, task), fields(url = %task.url, page_kind = %task.kind, engine = self.fetcher.engine_name()))]
    pub async fn process(&self, ctx: &RunContext, task: PageTask) -> PageOutcome {
        if ctx.is_cancelled() {
            debug!("Run cancelled, page not scheduled");
            return PageOutcome::Cancelled(task);
        }

        let options = self.settings.fetch_options(task.kind);
        let page = match self.fetcher.fetch(&task.url, &options).await {
            Ok(page) => page,
            Err(e) => {
                warn!("Fetch failed: {}", e);
                let failure = FailureRecord::new(task.url.clone(), FailureStage::Fetch, &e);
                return PageOutcome::Failed { task, failure };
            }
        };
        let seq = ctx.next_seq();

        let parsed = match parsers::parse(&page, task.kind) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Parse failed: {}", e);
                let failure = FailureRecord::new(task.url.clone(), FailureStage::Parse, &e);
                return PageOutcome::Failed { task, failure };
            }
        };

        let canonical = ctx.normalizer.normalize(
            &parsed,
            PageSource {
                url: task.url.clone(),
                seq,
            },
        );
        debug!(
            seq,
            meetings = canonical.meetings.len(),
            records = canonical.record_count(),
            links = parsed.links.len(),
            "Page processed"
        );
        PageOutcome::Parsed {
            task,
            parsed,
            canonical,
        }
    }

    /// 以有界并发处理一批页面
    ///
    /// # 参数
    ///
    /// * `ctx` - 运行上下文
    /// * `tasks` - 待处理页面
    /// * `concurrency` - 同时处理的页面数上限
    ///
    /// # 返回值
    ///
    /// 每个任务一个结果，顺序为完成顺序
    pub async fn process_all(
        &self,
        ctx: &RunContext,
        tasks: Vec<PageTask>,
        concurrency: usize,
    ) -> Vec<PageOutcome> {
        stream::iter(tasks)
            .map(|task| self.process(ctx, task))
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await
    }
}

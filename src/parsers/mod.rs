// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 页面解析器
//!
//! 每种页面类型一个纯函数：`&RawPage -> Result<ParsedRecords, ParseError>`。
//! 解析器只提取原始字符串，不做规范化。

pub mod markup;
pub mod meeting_card;
pub mod race_card;
pub mod records;
pub mod results;
pub mod schedule;

pub use meeting_card::parse_meeting_card;
pub use race_card::parse_race_card;
pub use records::{
    LinkTarget, PageKind, PageLink, ParsedMeeting, ParsedRace, ParsedRecords, ParsedResult,
    ParsedRunner,
};
pub use results::parse_results;
pub use schedule::parse_schedule;

use crate::engines::traits::RawPage;
use crate::utils::errors::ParseError;

/// 按页面类型分派到对应解析器
///
/// # 参数
///
/// * `page` - 抓取到的原始页面
/// * `kind` - 页面类型
///
/// # 返回值
///
/// 页面中的原始记录与下一级链接
pub fn parse(page: &RawPage, kind: PageKind) -> Result<ParsedRecords, ParseError> {
    let result = match kind {
        PageKind::Schedule => parse_schedule(page),
        PageKind::MeetingCard => parse_meeting_card(page),
        PageKind::RaceCard => parse_race_card(page),
        PageKind::ResultsPage => parse_results(page),
    };
    if let Err(ref e) = result {
        tracing::debug!(url = %page.url, page_kind = %kind, error = %e, "Page parse failed");
    }
    result
}

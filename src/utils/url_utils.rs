// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{Datelike, NaiveDate};
use url::{ParseError, Url};

/// 将可能为相对路径的URL转换为绝对路径URL
pub fn resolve_url(base_url: &Url, path: &str) -> Result<Url, ParseError> {
    base_url.join(path)
}

/// 取URL的主机部分（含端口），用于按主机限流
pub fn host_key(url: &Url) -> String {
    match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        (Some(host), None) => host.to_string(),
        (None, _) => url.as_str().to_string(),
    }
}

/// 展开日期模板
///
/// 支持占位符 `{date}`（YYYY-MM-DD）、`{year}`、`{month}`（两位）、`{day}`（两位）。
pub fn expand_date_template(template: &str, date: NaiveDate) -> String {
    template
        .replace("{date}", &date.format("%Y-%m-%d").to_string())
        .replace("{year}", &date.year().to_string())
        .replace("{month}", &format!("{:02}", date.month()))
        .replace("{day}", &format!("{:02}", date.day()))
}

/// 展开赛程ID模板，占位符 `{year}`、`{fixture_id}`
pub fn expand_fixture_template(template: &str, year: i32, fixture_id: &str) -> String {
    template
        .replace("{year}", &year.to_string())
        .replace("{fixture_id}", &urlencoding::encode(fixture_id))
}

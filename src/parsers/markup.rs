// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! HTML提取辅助函数
//!
//! 每个字段按顺序尝试一组选择器变体：先数据属性，再类名与结构回退。

use crate::parsers::records::{LinkTarget, PageKind, PageLink};
use crate::utils::errors::ParseError;
use crate::utils::racing_formats::{collapse_whitespace, parse_off_time, parse_race_date};
use crate::utils::url_utils::resolve_url;
use chrono::{NaiveDate, NaiveTime};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// 编译CSS选择器
pub fn selector(css: &str) -> Result<Selector, ParseError> {
    Selector::parse(css)
        .map_err(|e| ParseError::UnexpectedLayout(format!("invalid selector '{}': {:?}", css, e)))
}

/// 返回第一个命中的选择器变体的全部元素
pub fn select_variants<'a>(
    document: &'a Html,
    variants: &[&str],
) -> Result<Vec<ElementRef<'a>>, ParseError> {
    for css in variants {
        let sel = selector(css)?;
        let found: Vec<_> = document.select(&sel).collect();
        if !found.is_empty() {
            return Ok(found);
        }
    }
    Ok(Vec::new())
}

/// 在元素内部按变体查找子元素
pub fn select_within<'a>(
    element: ElementRef<'a>,
    variants: &[&str],
) -> Result<Vec<ElementRef<'a>>, ParseError> {
    for css in variants {
        let sel = selector(css)?;
        let found: Vec<_> = element.select(&sel).collect();
        if !found.is_empty() {
            return Ok(found);
        }
    }
    Ok(Vec::new())
}

/// 文档中是否存在任一选择器
pub fn exists(document: &Html, variants: &[&str]) -> Result<bool, ParseError> {
    Ok(!select_variants(document, variants)?.is_empty())
}

/// 元素的可见文本（折叠空白），为空时返回 `None`
pub fn element_text(element: ElementRef<'_>) -> Option<String> {
    let text = collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "));
    (!text.is_empty()).then_some(text)
}

/// 字段查找：先数据属性（元素自身），再子元素选择器变体
pub fn field(
    element: ElementRef<'_>,
    attrs: &[&str],
    variants: &[&str],
) -> Result<Option<String>, ParseError> {
    if let Some(value) = attr(element, attrs) {
        return Ok(Some(value));
    }
    for css in variants {
        let sel = selector(css)?;
        if let Some(text) = element.select(&sel).find_map(element_text) {
            return Ok(Some(text));
        }
    }
    Ok(None)
}

/// 第一个非空属性值
pub fn attr(element: ElementRef<'_>, attrs: &[&str]) -> Option<String> {
    attrs.iter().find_map(|name| {
        element
            .value()
            .attr(name)
            .map(collapse_whitespace)
            .filter(|v| !v.is_empty())
    })
}

/// 布尔型数据属性或标记元素
pub fn flag(element: ElementRef<'_>, attrs: &[&str], markers: &[&str]) -> Result<Option<bool>, ParseError> {
    if let Some(value) = attr(element, attrs) {
        return Ok(Some(matches!(
            value.to_ascii_lowercase().as_str(),
            "true" | "1" | "yes" | "abandoned" | "void"
        )));
    }
    if !select_within(element, markers)?.is_empty() {
        return Ok(Some(true));
    }
    Ok(None)
}

/// 元素自身是否带有任一类名
pub fn has_class(element: ElementRef<'_>, classes: &[&str]) -> bool {
    element.value().classes().any(|c| classes.contains(&c))
}

/// 必需字段：缺失时返回 `MissingField`
pub fn required(value: Option<String>, name: &str) -> Result<String, ParseError> {
    value.ok_or_else(|| ParseError::MissingField(name.to_string()))
}

pub fn required_date(value: Option<String>) -> Result<NaiveDate, ParseError> {
    let raw = required(value, "date")?;
    parse_race_date(&raw).ok_or_else(|| ParseError::MissingField("date".to_string()))
}

pub fn required_off_time(value: Option<String>) -> Result<NaiveTime, ParseError> {
    let raw = required(value, "off_time")?;
    parse_off_time(&raw).ok_or_else(|| ParseError::MissingField("off_time".to_string()))
}

/// 页面是否只有空白内容
pub fn is_blank(content: &str) -> bool {
    content.trim().is_empty()
}

/// 元素内第一个链接，解析为相对页面URL的绝对地址
pub fn link_in(
    element: ElementRef<'_>,
    variants: &[&str],
    base: Option<&Url>,
) -> Result<Option<String>, ParseError> {
    for css in variants {
        let sel = selector(css)?;
        let href = element
            .select(&sel)
            .find_map(|a| a.value().attr("href").map(str::trim).filter(|h| !h.is_empty()));
        if let Some(href) = href {
            return Ok(Some(absolute(href, base)?));
        }
    }
    Ok(None)
}

fn absolute(href: &str, base: Option<&Url>) -> Result<String, ParseError> {
    if let Ok(url) = Url::parse(href) {
        return Ok(url.to_string());
    }
    let base = base.ok_or_else(|| {
        ParseError::UnexpectedLayout(format!("relative link '{}' on page without base URL", href))
    })?;
    resolve_url(base, href)
        .map(|u| u.to_string())
        .map_err(|e| ParseError::UnexpectedLayout(format!("bad link '{}': {}", href, e)))
}

pub fn url_link(
    kind: PageKind,
    url: String,
    course: &str,
    date: NaiveDate,
    off_time: Option<NaiveTime>,
) -> PageLink {
    PageLink {
        kind,
        target: LinkTarget::Url(url),
        course: course.to_string(),
        date,
        off_time,
        abandoned: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_prefers_data_attribute() {
        let html = Html::parse_fragment(
            r#"<div class="m" data-going="Soft"><span class="going">Good</span></div>"#,
        );
        let root = html.select(&selector(".m").unwrap()).next().unwrap();

        assert_eq!(
            field(root, &["data-going"], &[".going"]).unwrap().as_deref(),
            Some("Soft")
        );
        assert_eq!(
            field(root, &["data-missing"], &[".nothing", ".going"])
                .unwrap()
                .as_deref(),
            Some("Good")
        );
        assert_eq!(field(root, &[], &[".nothing"]).unwrap(), None);
    }

    #[test]
    fn test_invalid_selector_is_layout_error() {
        assert!(matches!(selector("div[["), Err(ParseError::UnexpectedLayout(_))));
    }

    #[test]
    fn test_relative_links_resolve_against_page() {
        let html = Html::parse_fragment(r#"<div class="r"><a href="/racecard/1330">card</a></div>"#);
        let root = html.select(&selector(".r").unwrap()).next().unwrap();
        let base = Url::parse("http://example.com/racecards/ascot").unwrap();

        assert_eq!(
            link_in(root, &["a[href]"], Some(&base)).unwrap().as_deref(),
            Some("http://example.com/racecard/1330")
        );
    }
}

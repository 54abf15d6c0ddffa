// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 赛马数据格式解析
//!
//! 负重、距离、奖金、用时、落后距离、日期与开赛时间的规范化。
//! 所有函数都是纯函数，无法识别的输入返回 `None`。

use crate::domain::models::BeatenDistance;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;

static COUNTRY_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\(\s*([A-Za-z]{2,3})\s*\)\s*$").expect("Failed to compile country regex")
});

static ALLOWANCE_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\(\s*(\d{1,2})\s*\)\s*$").expect("Failed to compile allowance regex")
});

static DISTANCE_PART: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+)\s*(½)?\s*(m|f|y)").expect("Failed to compile distance regex")
});

static WEIGHT_STONES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})\s*(?:-|st)\s*(\d{1,2})\s*(?:lbs?)?$")
        .expect("Failed to compile weight regex")
});

static RACE_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(\d+)\s*(?:m|min|:)\s*)?(\d+(?:\.\d+)?)\s*s?$")
        .expect("Failed to compile race time regex")
});

static ORDINAL_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,2})(?:st|nd|rd|th)\b").expect("Failed to compile ordinal regex")
});

/// 名称规范化：去重音、小写、去除标点、折叠空白
pub fn normalize_name(raw: &str) -> String {
    let folded = deunicode::deunicode(raw).to_lowercase();
    let cleaned: String = folded
        .chars()
        .filter(|c| !matches!(c, '\'' | '.' | '`'))
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { ' ' })
        .collect();
    collapse_whitespace(&cleaned)
}

/// 折叠连续空白并去除首尾空白
pub fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 规范名称转为标识符，例如 `ryan moore` → `ryan-moore`
pub fn slugify(normalized: &str) -> String {
    normalized
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// 拆分马名后缀中的国家代码
///
/// `"Bold Venture (IRE)"` → `("Bold Venture", Some("IRE"))`
pub fn split_country(raw: &str) -> (String, Option<String>) {
    match COUNTRY_SUFFIX.captures(raw) {
        Some(caps) => {
            let name = raw[..caps.get(0).map_or(raw.len(), |m| m.start())].trim();
            let country = caps.get(1).map(|m| m.as_str().to_ascii_uppercase());
            (collapse_whitespace(name), country)
        }
        None => (collapse_whitespace(raw), None),
    }
}

/// 拆分骑师名后缀中的见习减磅，例如 `"T. Marquand (3)"`
pub fn split_allowance(raw: &str) -> (String, Option<u8>) {
    match ALLOWANCE_SUFFIX.captures(raw) {
        Some(caps) => {
            let name = raw[..caps.get(0).map_or(raw.len(), |m| m.start())].trim();
            let allowance = caps.get(1).and_then(|m| m.as_str().parse().ok());
            (collapse_whitespace(name), allowance)
        }
        None => (collapse_whitespace(raw), None),
    }
}

/// 负磅 `"9-7"`、`"9st 7lb"` 或纯磅数 `"133"` → 磅
pub fn parse_weight_lbs(raw: &str) -> Option<u16> {
    let cleaned = raw.trim().to_ascii_lowercase();
    if cleaned.is_empty() {
        return None;
    }
    if let Some(caps) = WEIGHT_STONES.captures(&cleaned) {
        let stones: u16 = caps.get(1)?.as_str().parse().ok()?;
        let pounds: u16 = caps.get(2)?.as_str().parse().ok()?;
        if pounds >= 14 {
            return None;
        }
        return stones.checked_mul(14)?.checked_add(pounds);
    }
    cleaned
        .trim_end_matches("lbs")
        .trim_end_matches("lb")
        .trim()
        .parse()
        .ok()
}

/// 距离 `"1m 2f 110y"`、`"2m4½f"`、`"5f"` → 码
pub fn parse_distance_yards(raw: &str) -> Option<u32> {
    let cleaned = raw.trim().to_ascii_lowercase();
    let mut total = 0u32;
    let mut matched = false;
    for caps in DISTANCE_PART.captures_iter(&cleaned) {
        let value: u32 = caps.get(1)?.as_str().parse().ok()?;
        let unit = caps.get(3)?.as_str();
        let unit_yards = match unit {
            "m" => 1760,
            "f" => 220,
            _ => 1,
        };
        total = total.checked_add(value.checked_mul(unit_yards)?)?;
        if caps.get(2).is_some() {
            total = total.checked_add(unit_yards / 2)?;
        }
        matched = true;
    }
    matched.then_some(total)
}

/// 奖金 `"£12,450"`、`"£3,245.60"` → 英镑（舍去便士）
pub fn parse_prize(raw: &str) -> Option<u64> {
    let whole = raw.trim().split('.').next()?;
    let digits: String = whole.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// 完赛用时 `"1m 42.35s"`、`"1:42.35"`、`"59.8s"` → 毫秒
pub fn parse_race_time_ms(raw: &str) -> Option<u32> {
    let cleaned = raw.trim().to_ascii_lowercase();
    let caps = RACE_TIME.captures(&cleaned)?;
    let minutes: u32 = match caps.get(1) {
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };
    let seconds: f64 = caps.get(2)?.as_str().parse().ok()?;
    let millis = checked_scale(seconds, 1000.0)?;
    minutes.checked_mul(60_000)?.checked_add(millis)
}

/// 落后距离 → 百分之一马身
///
/// 支持 `"1 1/2"`、`"1½"`、`"3/4"`、`"7"`、`"nse"`、`"shd"`、`"hd"`、`"nk"`、
/// `"dist"`、`"dht"`。
pub fn parse_beaten_distance(raw: &str) -> Option<BeatenDistance> {
    let cleaned = raw.trim().to_ascii_lowercase();
    let cleaned = cleaned
        .trim_end_matches("lengths")
        .trim_end_matches("length")
        .trim_end_matches("len")
        .trim_end_matches('l')
        .trim();
    if cleaned.is_empty() {
        return None;
    }

    let named = match cleaned {
        "dht" => Some(0),
        "nse" | "nose" => Some(5),
        "shd" | "sh" | "short head" | "s.h" => Some(10),
        "hd" | "head" => Some(20),
        "snk" | "short neck" => Some(25),
        "nk" | "neck" => Some(30),
        "dist" | "distance" => Some(3000),
        _ => None,
    };
    if let Some(hundredths) = named {
        return Some(BeatenDistance(hundredths));
    }

    let mut total = 0u32;
    for part in cleaned.split_whitespace() {
        total = total.checked_add(parse_length_part(part)?)?;
    }
    Some(BeatenDistance(total))
}

fn parse_length_part(part: &str) -> Option<u32> {
    if let Some((num, den)) = part.split_once('/') {
        let num: u32 = num.parse().ok()?;
        let den: u32 = den.parse().ok()?;
        if den == 0 {
            return None;
        }
        return Some(num.checked_mul(100)? / den);
    }

    let (whole, fraction) = match part.char_indices().last() {
        Some((idx, '½')) => (&part[..idx], 50),
        Some((idx, '¼')) => (&part[..idx], 25),
        Some((idx, '¾')) => (&part[..idx], 75),
        _ => (part, 0),
    };
    let whole: u32 = if whole.is_empty() {
        0
    } else {
        let value: f64 = whole.parse().ok()?;
        checked_scale(value, 100.0)?
    };
    whole.checked_add(fraction)
}

/// 小数乘以倍率后取整，超出 `u32` 范围或非有限值时返回 `None`
fn checked_scale(value: f64, factor: f64) -> Option<u32> {
    let scaled = (value * factor).round();
    (scaled.is_finite() && scaled >= 0.0 && scaled <= f64::from(u32::MAX)).then_some(scaled as u32)
}

/// 解析页面中常见的日期写法
pub fn parse_race_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = collapse_whitespace(raw.trim());
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(&trimmed) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(&trimmed, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.date());
    }
    let without_ordinal = ORDINAL_SUFFIX.replace_all(&trimmed, "$1");
    let candidate = without_ordinal.trim_end_matches(',').replace(',', "");
    for format in [
        "%Y-%m-%d",
        "%d/%m/%Y",
        "%d-%m-%Y",
        "%d %B %Y",
        "%d %b %Y",
        "%A %d %B %Y",
        "%a %d %b %Y",
        "%B %d %Y",
    ] {
        if let Ok(date) = NaiveDate::parse_from_str(&candidate, format) {
            return Some(date);
        }
    }
    None
}

/// 解析开赛时间
///
/// 接受 `"13:30"`、`"1:30"`、`"1.30"`、`"1:30pm"`。不带上下午标记且小时为
/// 1-9 的时间按下午处理（英国赛事不在清晨开赛）。
pub fn parse_off_time(raw: &str) -> Option<NaiveTime> {
    let cleaned = raw.trim().to_ascii_lowercase().replace(' ', "");
    if cleaned.is_empty() {
        return None;
    }
    let (clock, meridiem) = if let Some(rest) = cleaned.strip_suffix("pm") {
        (rest, Some(true))
    } else if let Some(rest) = cleaned.strip_suffix("am") {
        (rest, Some(false))
    } else {
        (cleaned.as_str(), None)
    };

    let (hours, minutes) = clock.split_once([':', '.'])?;
    let mut hours: u32 = hours.parse().ok()?;
    let minutes: u32 = minutes.parse().ok()?;
    if minutes > 59 || hours > 23 {
        return None;
    }

    match meridiem {
        Some(true) if hours < 12 => hours += 12,
        Some(false) if hours == 12 => hours = 0,
        None if (1..=9).contains(&hours) => hours += 12,
        _ => {}
    }
    NaiveTime::from_hms_opt(hours, minutes, 0)
}

/// 把 UTC 时间换算为英国本地时间（夏令时：三月最后一个周日至十月最后一个周日，01:00 UTC 切换）
pub fn uk_local_time(utc: DateTime<Utc>) -> NaiveDateTime {
    let naive = utc.naive_utc();
    let year = naive.year();
    let switch_time = NaiveTime::from_hms_opt(1, 0, 0).unwrap_or(NaiveTime::MIN);
    let bst_start = last_sunday(year, 3).map(|d| NaiveDateTime::new(d, switch_time));
    let bst_end = last_sunday(year, 10).map(|d| NaiveDateTime::new(d, switch_time));
    match (bst_start, bst_end) {
        (Some(start), Some(end)) if naive >= start && naive < end => naive + Duration::hours(1),
        _ => naive,
    }
}

fn last_sunday(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let mut day = NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()?;
    while day.weekday() != Weekday::Sun {
        day = day.pred_opt()?;
    }
    Some(day)
}

#[cfg(test)]
#[path = "racing_formats_test.rs"]
mod tests;

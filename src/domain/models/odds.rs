// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 赔率（规范表示：约分后的分数赔率）
///
/// 分数赔率 `5/2`、`11-4`，`Evens`，以及小数赔率 `3.5` 都会被转换为
/// 同一种表示，便于跨页面比较。小数赔率按分母 100 换算后约分。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Odds {
    /// 分子
    pub numerator: u32,
    /// 分母
    pub denominator: u32,
}

impl Odds {
    /// 创建约分后的赔率，分母为 0 时返回 `None`
    pub fn new(numerator: u32, denominator: u32) -> Option<Self> {
        if denominator == 0 {
            return None;
        }
        let divisor = gcd(numerator, denominator).max(1);
        Some(Self {
            numerator: numerator / divisor,
            denominator: denominator / divisor,
        })
    }

    pub fn evens() -> Self {
        Self {
            numerator: 1,
            denominator: 1,
        }
    }

    /// 解析任意常见赔率写法
    ///
    /// 支持：`5/2`、`11-4`、`100/30`、`Evens`/`EVS`/`evs`、`3.5`（小数赔率），
    /// 以及热门标记后缀 `F`、`JF`、`CF`（会被忽略）。
    pub fn parse(raw: &str) -> Option<Self> {
        let cleaned = strip_favourite_marker(&raw.trim().to_ascii_lowercase());
        if cleaned.is_empty() {
            return None;
        }

        if matches!(cleaned.as_str(), "evens" | "evs" | "even" | "evn") {
            return Some(Self::evens());
        }

        if let Some((num, den)) = cleaned.split_once(['/', '-']) {
            let num = num.trim().parse::<u32>().ok()?;
            let den = den.trim().parse::<u32>().ok()?;
            return Self::new(num, den);
        }

        Self::from_decimal(&cleaned)
    }

    /// 从小数赔率（含本金）转换
    fn from_decimal(raw: &str) -> Option<Self> {
        let (whole, fraction) = match raw.split_once('.') {
            Some((w, f)) => (w, f),
            None => (raw, ""),
        };
        if fraction.len() > 2 || !fraction.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let whole = whole.parse::<u32>().ok()?;
        let hundredths = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<u32>().ok()? * 10,
            _ => fraction.parse::<u32>().ok()?,
        };
        let total = whole.checked_mul(100)?.checked_add(hundredths)?;
        // decimal odds include the returned stake
        let profit = total.checked_sub(100)?;
        if profit == 0 {
            return None;
        }
        Self::new(profit, 100)
    }

    /// 转为小数赔率（含本金）
    pub fn to_decimal(&self) -> f64 {
        1.0 + f64::from(self.numerator) / f64::from(self.denominator)
    }
}

impl fmt::Display for Odds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.numerator == self.denominator {
            write!(f, "evens")
        } else {
            write!(f, "{}/{}", self.numerator, self.denominator)
        }
    }
}

fn strip_favourite_marker(raw: &str) -> String {
    let trimmed = raw.trim_end();
    for marker in ["jf", "cf", "f"] {
        if let Some(rest) = trimmed.strip_suffix(marker) {
            // "evs" must not lose its trailing letter, only digits precede markers
            if rest.ends_with(|c: char| c.is_ascii_digit()) || rest.ends_with("evens") {
                return rest.trim_end().to_string();
            }
        }
    }
    trimmed.to_string()
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

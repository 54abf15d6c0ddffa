// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::engines::traits::RawPage;
use crate::utils::errors::FetchError;

/// 反爬拦截页的特征文本（小写）
const INTERSTITIAL_MARKERS: &[&str] = &[
    "cf-challenge",
    "cf-browser-verification",
    "attention required! | cloudflare",
    "just a moment...",
    "px-captcha",
    "g-recaptcha",
    "h-captcha",
    "are you a robot",
    "access denied</title>",
    "request unsuccessful. incapsula",
];

/// 对引擎返回的原始页面做分类
///
/// 403 与拦截页视为 `Blocked`；其余非2xx状态码视为 `HttpStatus`。
pub fn classify(page: RawPage) -> Result<RawPage, FetchError> {
    match page.status {
        200..=299 => {}
        403 => return Err(FetchError::Blocked(format!("HTTP 403 from {}", page.url))),
        status => return Err(FetchError::HttpStatus(status)),
    }

    if let Some(marker) = interstitial_marker(&page.content) {
        return Err(FetchError::Blocked(format!(
            "anti-bot interstitial ({}) at {}",
            marker, page.url
        )));
    }

    Ok(page)
}

fn interstitial_marker(content: &str) -> Option<&'static str> {
    // interstitials are small; large pages are real content
    if content.len() > 64 * 1024 {
        return None;
    }
    let lowered = content.to_ascii_lowercase();
    INTERSTITIAL_MARKERS
        .iter()
        .copied()
        .find(|marker| lowered.contains(marker))
}

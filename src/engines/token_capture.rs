// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use parking_lot::Mutex;
use serde_json::Value;

/// Bearer令牌捕获器
///
/// 监听页面发出的请求，记录第一个发往目标API域名、且携带有效
/// `Authorization: Bearer ...` 请求头的令牌。捕获后忽略后续请求。
#[derive(Debug)]
pub struct TokenCapture {
    target_domain: String,
    captured: Mutex<Option<String>>,
}

impl TokenCapture {
    pub fn new(target_domain: impl Into<String>) -> Self {
        Self {
            target_domain: target_domain.into(),
            captured: Mutex::new(None),
        }
    }

    /// 处理一次请求事件
    ///
    /// # 参数
    ///
    /// * `url` - 请求URL
    /// * `headers` - CDP请求头对象（JSON对象，键大小写不定）
    ///
    /// # 返回值
    ///
    /// 本次调用捕获到令牌时返回 `true`
    pub fn observe(&self, url: &str, headers: &Value) -> bool {
        let mut captured = self.captured.lock();
        if captured.is_some() || !url.contains(&self.target_domain) {
            return false;
        }

        let Some(auth_header) = authorization_header(headers) else {
            return false;
        };
        if !is_valid_bearer_token(auth_header) {
            return false;
        }

        *captured = Some(auth_header.trim().to_string());
        true
    }

    /// 已捕获的完整请求头值（含 `Bearer ` 前缀）
    pub fn token(&self) -> Option<String> {
        self.captured.lock().clone()
    }
}

fn authorization_header(headers: &Value) -> Option<&str> {
    headers
        .as_object()?
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("authorization"))
        .and_then(|(_, value)| value.as_str())
}

/// 校验 `Bearer <token>` 格式
pub fn is_valid_bearer_token(auth_header: &str) -> bool {
    let trimmed = auth_header.trim();
    let Some((scheme, token)) = trimmed.split_once(' ') else {
        return false;
    };
    let token = token.trim();
    scheme.eq_ignore_ascii_case("bearer")
        && !token.is_empty()
        && !token.chars().any(char::is_whitespace)
        && !token.eq_ignore_ascii_case("null")
        && !token.eq_ignore_ascii_case("undefined")
}

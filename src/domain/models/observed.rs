// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 字段级变更
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    /// 字段名
    pub field: String,
    /// 变更前的值
    pub before: Option<String>,
    /// 变更后的值
    pub after: Option<String>,
}

/// 可观测实体
///
/// 非身份属性均为可选：`None` 表示"本页面未观测到"，而不是"已清空"。
/// `overlay` 把另一份观测中出现的属性覆盖到自身，并返回实际发生变化的字段。
pub trait Observed {
    fn overlay(&mut self, observed: &Self) -> Vec<FieldChange>;
}

pub(crate) fn overlay_field<T>(
    field: &str,
    current: &mut Option<T>,
    observed: &Option<T>,
    changes: &mut Vec<FieldChange>,
) where
    T: Clone + PartialEq + fmt::Display,
{
    let Some(new_value) = observed else {
        return;
    };
    if current.as_ref() == Some(new_value) {
        return;
    }
    changes.push(FieldChange {
        field: field.to_string(),
        before: current.as_ref().map(ToString::to_string),
        after: Some(new_value.to_string()),
    });
    *current = Some(new_value.clone());
}

pub(crate) fn overlay_required<T>(
    field: &str,
    current: &mut T,
    observed: &T,
    changes: &mut Vec<FieldChange>,
) where
    T: Clone + PartialEq + fmt::Display,
{
    if current == observed {
        return;
    }
    changes.push(FieldChange {
        field: field.to_string(),
        before: Some(current.to_string()),
        after: Some(observed.to_string()),
    });
    *current = observed.clone();
}

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::CanonicalId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 需要做身份解析的实体类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityCategory {
    Jockey,
    Trainer,
    Course,
}

impl fmt::Display for EntityCategory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EntityCategory::Jockey => write!(f, "jockey"),
            EntityCategory::Trainer => write!(f, "trainer"),
            EntityCategory::Course => write!(f, "course"),
        }
    }
}

/// 别名表接口
///
/// 输入为已规范化（小写、去重音、折叠空白）的名称，输出稳定的规范标识。
/// 实现必须是确定性的；不做模糊匹配。
pub trait AliasTable: Send + Sync {
    fn resolve(&self, normalized_name: &str, category: EntityCategory) -> CanonicalId;
}

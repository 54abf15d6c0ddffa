// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::CanonicalId;
use crate::domain::repositories::alias_repository::{AliasTable, EntityCategory};
use crate::utils::racing_formats::{normalize_name, slugify};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use thiserror::Error;

/// 别名表加载错误
#[derive(Error, Debug)]
pub enum AliasTableError {
    #[error("读取别名表失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("别名表格式错误: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("别名 '{alias}' 同时指向 {first} 与 {second}")]
    Ambiguous {
        alias: String,
        first: CanonicalId,
        second: CanonicalId,
    },
}

/// YAML文档：类别 → 规范标识 → 别名列表
#[derive(Debug, Default, Deserialize)]
struct AliasDocument {
    #[serde(default)]
    jockey: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    trainer: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    course: BTreeMap<String, Vec<String>>,
}

/// 静态别名表
///
/// 先按规范化后的名称精确查找手工别名，未命中时使用名称本身的标识形式。
/// 不做模糊匹配。
#[derive(Debug, Default, Clone)]
pub struct StaticAliasTable {
    entries: HashMap<(EntityCategory, String), CanonicalId>,
}

impl StaticAliasTable {
    /// 空表：只做精确匹配
    pub fn new() -> Self {
        Self::default()
    }

    /// 从YAML文件加载
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AliasTableError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// 从YAML文本加载
    ///
    /// # 参数
    ///
    /// * `content` - 形如 `jockey: { ryan-moore: ["R Moore"] }` 的YAML文档
    ///
    /// # 返回值
    ///
    /// 同一类别内一个别名指向两个不同标识时返回 `Ambiguous`
    pub fn from_yaml(content: &str) -> Result<Self, AliasTableError> {
        let document: AliasDocument = if content.trim().is_empty() {
            AliasDocument::default()
        } else {
            serde_yaml::from_str(content)?
        };

        let mut table = Self::new();
        for (category, section) in [
            (EntityCategory::Jockey, document.jockey),
            (EntityCategory::Trainer, document.trainer),
            (EntityCategory::Course, document.course),
        ] {
            for (canonical, aliases) in section {
                let id = CanonicalId(slugify(&normalize_name(&canonical)));
                // the canonical spelling is an alias of itself
                let spellings = std::iter::once(canonical.replace('-', " ")).chain(aliases);
                for alias in spellings {
                    table.insert(category, &alias, id.clone())?;
                }
            }
        }
        Ok(table)
    }

    /// 添加一条别名
    pub fn insert(
        &mut self,
        category: EntityCategory,
        alias: &str,
        id: CanonicalId,
    ) -> Result<(), AliasTableError> {
        let key = (category, normalize_name(alias));
        if let Some(existing) = self.entries.get(&key) {
            if existing != &id {
                return Err(AliasTableError::Ambiguous {
                    alias: alias.to_string(),
                    first: existing.clone(),
                    second: id,
                });
            }
            return Ok(());
        }
        self.entries.insert(key, id);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl AliasTable for StaticAliasTable {
    fn resolve(&self, normalized_name: &str, category: EntityCategory) -> CanonicalId {
        self.entries
            .get(&(category, normalized_name.to_string()))
            .cloned()
            .unwrap_or_else(|| CanonicalId(slugify(normalized_name)))
    }
}

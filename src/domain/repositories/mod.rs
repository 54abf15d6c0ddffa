// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库接口模块
///
/// 该模块定义了领域层的协作者接口，具体实现由基础设施层提供：
/// - 赛马数据存储（racing_repository）：按赛会读取快照、原子应用写入计划
/// - 别名表（alias_repository）：骑师、练马师、赛场名称的身份解析
pub mod alias_repository;
pub mod racing_repository;

pub use alias_repository::{AliasTable, EntityCategory};
pub use racing_repository::{RacingStorage, StorageSnapshot};

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 基础设施层模块
///
/// 该模块包含系统的技术实现细节，负责与外部系统的交互。
///
/// 包含的子模块：
/// - 别名表（alias_table）：从YAML加载的骑师、练马师与赛场别名
/// - 指标（metrics）：Prometheus 指标导出
/// - 存储（storage）：存储协作者的内存与本地JSON实现
///
/// 基础设施层依赖于领域层的抽象接口，领域层不依赖这里的任何实现。
pub mod alias_table;
pub mod metrics;
pub mod storage;

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// 包含的服务：
/// - 规范化服务（normalizer）：名称、赔率、负重、距离等的规范化与身份解析
/// - 对账服务（reconciler）：与存储快照比较并生成幂等的写入计划
///
/// 两者都是纯逻辑，不做网络或存储访问。
pub mod normalizer;
pub mod reconciler;

pub use normalizer::Normalizer;
pub use reconciler::Reconciler;

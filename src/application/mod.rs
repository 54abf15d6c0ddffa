// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 应用程序模块
///
/// 包含运行上下文与采集用例，负责把抓取、解析、规范化与对账串成一次运行
pub mod context;
pub mod use_cases;

pub use context::{CancelHandle, RunContext};
pub use use_cases::collect_racing::{CollectRacingRequest, CollectRacingUseCase};

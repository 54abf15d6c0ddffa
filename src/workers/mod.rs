// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工作器模块
///
/// 以有界并发对单个页面执行抓取、解析与规范化
pub mod page_worker;

pub use page_worker::{PageOutcome, PageTask, PageWorker};

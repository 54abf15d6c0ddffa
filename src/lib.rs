// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 应用程序模块
///
/// 包含运行上下文与采集用例
pub mod application;

/// 配置模块
///
/// 处理应用程序的配置设置和环境变量
pub mod config;

/// 领域模块
///
/// 包含赛马实体、对账服务和存储接口
pub mod domain;

/// 引擎模块
///
/// 实现页面抓取引擎与抓取器
pub mod engines;

/// 基础设施模块
///
/// 提供存储、别名表与指标导出
pub mod infrastructure;

/// 解析模块
///
/// 每种页面类型一个提取器
pub mod parsers;

/// 工具模块
///
/// 提供通用的工具函数和辅助功能
pub mod utils;

/// 工作器模块
///
/// 实现页面处理工作器
pub mod workers;

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工作器模块
///
/// 提供站点抓取器和运行编排：
/// 检查运行状态、抓取、按分类提交和标记完成
pub mod manager;
pub mod site_worker;
pub mod worker;

pub use worker::SiteScraper;

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// 包含的服务：
/// - 分类抓取（category_scraper）：一次会话内按顺序抓取分类并规范化记录
/// - 运行状态存储（run_state_store）：判定抓取器今天是否需要运行
pub mod category_scraper;
pub mod run_state_store;

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库接口模块
///
/// 定义领域层依赖的外部协作者：
/// - 商品提交（listing_sink）：把分类批次交给后端存储服务
/// - 运行状态仓库（run_state_repository）：持久化每个抓取器的上次运行日期
///
/// 具体实现由基础设施层提供。
pub mod listing_sink;
pub mod run_state_repository;

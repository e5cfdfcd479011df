// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 配置模块
///
/// 处理应用程序的配置设置和环境变量
pub mod config;

/// 领域模块
///
/// 包含商品列表、运行状态等核心实体以及分类抓取服务
pub mod domain;

/// 引擎模块
///
/// 基于无头浏览器的页面渲染与商品列表提取
pub mod engines;

/// 基础设施模块
///
/// 提供运行状态持久化和后端提交等外部集成
pub mod infrastructure;

/// 调度模块
///
/// 实现每日定时调度状态机和时钟抽象
pub mod scheduler;

/// 工具模块
///
/// 提供错误类型、重试策略、价格解析和日志初始化
pub mod utils;

/// 工作器模块
///
/// 实现站点抓取器和单次运行编排
pub mod workers;

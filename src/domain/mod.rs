// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域层模块
///
/// 该模块包含系统的核心业务逻辑，包括：
/// - 领域模型（models）：商品记录、运行状态和站点画像
/// - 仓库接口（repositories）：运行状态持久化与后端提交的抽象接口
/// - 服务（services）：运行状态判定和分类抓取
///
/// 领域层不依赖具体的浏览器或存储实现，便于在测试中替换。
pub mod models;
pub mod repositories;
pub mod services;

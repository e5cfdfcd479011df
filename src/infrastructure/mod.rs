// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 基础设施层模块
///
/// 包含的子模块：
/// - 后端客户端（backend_client）：把分类批次 POST 到后端存储服务
/// - 可观测性（observability）：指标描述注册
/// - 存储（storage）：运行状态的 JSON 文件和内存实现
///
/// 基础设施层依赖领域层的抽象接口，领域层不感知具体技术实现。
pub mod backend_client;
pub mod observability;
pub mod storage;

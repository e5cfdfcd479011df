// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 配置模块
///
/// 处理后端、调度、浏览器、重试和抓取器等配置
pub mod settings;

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 调度模块
///
/// 时钟抽象和每日调度循环
pub mod clock;
pub mod daily_scheduler;

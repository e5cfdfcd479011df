// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 商品列表与价格记录
pub mod listing;
/// 运行状态
pub mod run_state;
/// 站点画像
pub mod site;

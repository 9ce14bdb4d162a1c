// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 表现层模块
///
/// HTTP 路由、处理器、中间件和错误响应
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod routes;

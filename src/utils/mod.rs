// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工具模块
///
/// 提供通用的工具函数和辅助功能
/// 包括 robots.txt 检查、重试策略、日志初始化以及URL、文本和日期处理
pub mod date_utils;
pub mod retry_policy;
pub mod robots;
pub mod telemetry;
pub mod text_utils;
pub mod url_utils;

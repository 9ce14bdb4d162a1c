// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 应用程序模块
///
/// 包含请求/响应对象和用例实现，负责把HTTP层的输入转换为领域操作
pub mod dto;
pub mod use_cases;

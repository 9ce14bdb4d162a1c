// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// 包含的服务：
/// - 爬取编排（crawl_orchestrator）：运行生命周期、限速抓取和计数
/// - 提取服务（extraction_service）：按选择器从页面提取文章字段
/// - 抓取边界（frontier_service）：从订阅源、sitemap 和落地页枚举文章URL
/// - 新闻源注册表（source_registry）：带缓存的新闻源查询
pub mod crawl_orchestrator;
pub mod extraction_service;
pub mod frontier_service;
pub mod source_registry;

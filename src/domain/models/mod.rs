// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 该模块定义了系统的核心业务实体，包括：
/// - 新闻源（source）：带抓取策略的新闻来源配置
/// - 选择器（selector）：字段提取规则
/// - 爬取运行（crawl_run）：一次爬取尝试的审计记录
/// - 文章（article）：按URL去重的文章
pub mod article;
pub mod crawl_run;
pub mod selector;
pub mod source;

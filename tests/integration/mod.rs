// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod article_repository_test;
pub mod crawl_run_repository_test;
pub mod crawler_api_test;
pub mod helpers;
pub mod orchestrator_test;
pub mod source_loader_test;

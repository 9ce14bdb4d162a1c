// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm_migration::prelude::*;

/// 爬取运行日志表迁移
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CrawlLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CrawlLogs::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CrawlLogs::SourceName)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CrawlLogs::StartedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CrawlLogs::FinishedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(CrawlLogs::ArticlesFound)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(CrawlLogs::ArticlesNew)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(CrawlLogs::ArticlesUpdated)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(CrawlLogs::Errors)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(CrawlLogs::Status).string_len(50).not_null())
                    .col(ColumnDef::new(CrawlLogs::ErrorDetails).json())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("ix_crawl_logs_source_name")
                    .table(CrawlLogs::Table)
                    .col(CrawlLogs::SourceName)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("ix_crawl_logs_status")
                    .table(CrawlLogs::Table)
                    .col(CrawlLogs::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CrawlLogs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum CrawlLogs {
    Table,
    Id,
    SourceName,
    StartedAt,
    FinishedAt,
    ArticlesFound,
    ArticlesNew,
    ArticlesUpdated,
    Errors,
    Status,
    ErrorDetails,
}

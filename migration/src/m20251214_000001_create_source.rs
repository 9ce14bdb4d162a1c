// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm_migration::prelude::*;

/// 新闻源配置表迁移
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Source::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Source::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Source::Name).string_len(100).not_null())
                    .col(ColumnDef::new(Source::Url).string_len(500).not_null())
                    .col(
                        ColumnDef::new(Source::Enabled)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Source::RateLimit)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(Source::RetryCount)
                            .integer()
                            .not_null()
                            .default(3),
                    )
                    .col(
                        ColumnDef::new(Source::Timeout)
                            .integer()
                            .not_null()
                            .default(30),
                    )
                    .col(ColumnDef::new(Source::Selectors).json())
                    .col(ColumnDef::new(Source::RssUrl).string_len(500))
                    .col(ColumnDef::new(Source::SitemapUrl).string_len(500))
                    .col(
                        ColumnDef::new(Source::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Source::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("ix_source_name")
                    .table(Source::Table)
                    .col(Source::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("ix_source_enabled")
                    .table(Source::Table)
                    .col(Source::Enabled)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Source::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Source {
    Table,
    Id,
    Name,
    Url,
    Enabled,
    RateLimit,
    RetryCount,
    Timeout,
    Selectors,
    RssUrl,
    SitemapUrl,
    CreatedAt,
    UpdatedAt,
}

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm_migration::prelude::*;

/// 文章表迁移
///
/// URL 唯一索引是文章去重的依据
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Articles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Articles::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Articles::Title).string_len(500).not_null())
                    .col(ColumnDef::new(Articles::Content).text().not_null())
                    .col(ColumnDef::new(Articles::Summary).text())
                    .col(ColumnDef::new(Articles::Url).string_len(1000).not_null())
                    .col(
                        ColumnDef::new(Articles::SourceName)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Articles::Author).string_len(200))
                    .col(ColumnDef::new(Articles::PublishedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Articles::CrawledAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Articles::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Articles::Category).string_len(100))
                    .col(ColumnDef::new(Articles::Tags).json())
                    .col(ColumnDef::new(Articles::ImageUrl).string_len(1000))
                    .col(
                        ColumnDef::new(Articles::Status)
                            .string_len(50)
                            .not_null()
                            .default("active"),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("ix_articles_url")
                    .table(Articles::Table)
                    .col(Articles::Url)
                    .unique()
                    .to_owned(),
            )
            .await?;

        for (name, column) in [
            ("ix_articles_source_name", Articles::SourceName),
            ("ix_articles_published_at", Articles::PublishedAt),
            ("ix_articles_status", Articles::Status),
        ] {
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name(name)
                        .table(Articles::Table)
                        .col(column)
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Articles::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Articles {
    Table,
    Id,
    Title,
    Content,
    Summary,
    Url,
    SourceName,
    Author,
    PublishedAt,
    CrawledAt,
    UpdatedAt,
    Category,
    Tags,
    ImageUrl,
    Status,
}

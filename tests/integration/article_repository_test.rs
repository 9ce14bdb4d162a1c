// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::create_test_db;
use chrono::{TimeZone, Utc};
use news_crawler::domain::models::article::{Article, ArticleStatus, UpsertOutcome};
use news_crawler::domain::repositories::article_repository::ArticleRepository;
use news_crawler::infrastructure::repositories::article_repo_impl::ArticleRepositoryImpl;
use std::sync::Arc;

fn article(url: &str, title: &str) -> Article {
    let now = Utc::now();
    Article {
        id: 0,
        title: title.to_string(),
        content: "Body".to_string(),
        summary: Some("Summary".to_string()),
        url: url.to_string(),
        source_name: "kompas".to_string(),
        author: None,
        published_at: Some(Utc.with_ymd_and_hms(2024, 3, 5, 7, 30, 0).unwrap()),
        crawled_at: now,
        updated_at: now,
        category: Some("news".to_string()),
        tags: vec!["flood".to_string(), "jakarta".to_string()],
        image_url: None,
        status: ArticleStatus::Active,
    }
}

#[tokio::test]
async fn test_upsert_inserts_then_updates() {
    let repo = ArticleRepositoryImpl::new(create_test_db().await);
    let url = "https://news.example.com/read/1";

    let outcome = repo.upsert_by_url(&article(url, "First title")).await.unwrap();
    assert_eq!(outcome, UpsertOutcome::Inserted);
    let stored = repo.find_by_url(url).await.unwrap().unwrap();
    assert_eq!(stored.tags, vec!["flood", "jakarta"]);
    assert_eq!(
        stored.published_at,
        Some(Utc.with_ymd_and_hms(2024, 3, 5, 7, 30, 0).unwrap())
    );

    let outcome = repo.upsert_by_url(&article(url, "Corrected title")).await.unwrap();
    assert_eq!(outcome, UpsertOutcome::Updated);

    let updated = repo.find_by_url(url).await.unwrap().unwrap();
    assert_eq!(updated.id, stored.id);
    assert_eq!(updated.title, "Corrected title");
    assert!(updated.crawled_at >= stored.crawled_at);
    assert_eq!(repo.count_by_source("kompas").await.unwrap(), 1);
    assert_eq!(repo.count_by_source("detik").await.unwrap(), 0);
}

#[tokio::test]
async fn test_concurrent_upserts_keep_one_row() {
    let repo = Arc::new(ArticleRepositoryImpl::new(create_test_db().await));
    let url = "https://news.example.com/read/race";

    let handles: Vec<_> = (0..5)
        .map(|i| {
            let repo = repo.clone();
            tokio::spawn(async move {
                repo.upsert_by_url(&article(url, &format!("Writer {}", i)))
                    .await
                    .unwrap()
            })
        })
        .collect();

    let mut inserted = 0;
    for handle in handles {
        if handle.await.unwrap() == UpsertOutcome::Inserted {
            inserted += 1;
        }
    }
    assert_eq!(inserted, 1);
    assert_eq!(repo.count_by_source("kompas").await.unwrap(), 1);
}

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::create_test_db;
use news_crawler::domain::repositories::source_repository::SourceRepository;
use news_crawler::infrastructure::repositories::source_repo_impl::SourceRepositoryImpl;
use news_crawler::infrastructure::source_loader::{seed_sources, SourceLoadError};
use sea_orm::{ConnectionTrait, DbBackend, Statement};
use std::io::Write;
use tempfile::NamedTempFile;

fn write_yaml(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[tokio::test]
async fn test_seed_sources_upserts_by_name() {
    let repo = SourceRepositoryImpl::new(create_test_db().await);

    let file = write_yaml(
        r#"
- name: kompas
  url: https://www.kompas.com/
  rss_url: https://www.kompas.com/rss
  rate_limit: 2
  selectors:
    title: h1.read__title
- name: tempo
  url: https://www.tempo.co/
  enabled: false
"#,
    );
    assert_eq!(seed_sources(&repo, file.path()).await.unwrap(), 2);

    let kompas = repo.find_by_name("kompas").await.unwrap().unwrap();
    assert!(kompas.id > 0);
    assert_eq!(kompas.rate_limit, 2);
    assert_eq!(kompas.rss_url.as_deref(), Some("https://www.kompas.com/rss"));
    assert!(kompas.selectors.contains_key("title"));
    assert!(!repo.find_by_name("tempo").await.unwrap().unwrap().enabled);

    // 再次加载时按名称更新，不产生重复
    let file = write_yaml("- name: kompas\n  url: https://www.kompas.com/\n  rate_limit: 5\n");
    seed_sources(&repo, file.path()).await.unwrap();
    let sources = repo.list().await.unwrap();
    assert_eq!(sources.len(), 2);
    let kompas = repo.find_by_name("kompas").await.unwrap().unwrap();
    assert_eq!(kompas.rate_limit, 5);
    assert!(kompas.selectors.is_empty());
}

#[tokio::test]
async fn test_invalid_file_aborts_seeding() {
    let repo = SourceRepositoryImpl::new(create_test_db().await);
    let file = write_yaml(
        "- name: good\n  url: https://good.example.com/\n- name: bad\n  url: ftp://bad.example.com/\n",
    );

    let err = seed_sources(&repo, file.path()).await.unwrap_err();
    assert!(matches!(err, SourceLoadError::Invalid(_)));
    assert!(repo.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_file_is_skipped() {
    let repo = SourceRepositoryImpl::new(create_test_db().await);
    let dir = tempfile::tempdir().unwrap();

    let seeded = seed_sources(&repo, &dir.path().join("sources.yaml"))
        .await
        .unwrap();
    assert_eq!(seeded, 0);
}

#[tokio::test]
async fn test_sources_are_stored_in_source_table() {
    let db = create_test_db().await;
    let repo = SourceRepositoryImpl::new(db.clone());
    let file = write_yaml("- name: detik\n  url: https://www.detik.com/\n");
    seed_sources(&repo, file.path()).await.unwrap();

    let row = db
        .query_one(Statement::from_string(
            DbBackend::Sqlite,
            "SELECT COUNT(*) AS total FROM source WHERE name = 'detik'",
        ))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.try_get::<i64>("", "total").unwrap(), 1);
}

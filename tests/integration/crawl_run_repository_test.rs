// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::create_test_db;
use news_crawler::domain::models::crawl_run::{CrawlRunStatus, RunCounts};
use news_crawler::domain::repositories::crawl_run_repository::CrawlRunRepository;
use news_crawler::domain::repositories::RepositoryError;
use news_crawler::infrastructure::repositories::crawl_run_repo_impl::CrawlRunRepositoryImpl;
use serde_json::json;

#[tokio::test]
async fn test_run_lifecycle() {
    let repo = CrawlRunRepositoryImpl::new(create_test_db().await);

    let run = repo.create_run("kompas").await.unwrap();
    assert_eq!(run.status, CrawlRunStatus::Running);
    assert!(run.finished_at.is_none());
    assert_eq!(run.counts(), RunCounts::default());

    let progress = RunCounts { found: 3, new: 2, updated: 0, errors: 1 };
    repo.update_counts(run.id, progress).await.unwrap();
    let current = repo.get_run(run.id).await.unwrap().unwrap();
    assert_eq!(current.counts(), progress);
    assert_eq!(current.status, CrawlRunStatus::Running);

    let done = RunCounts { found: 4, new: 2, updated: 1, errors: 1 };
    let details = json!({ "errors": [{ "url": "https://x/1", "kind": "fetch", "message": "HTTP status 500" }], "truncated": false });
    let finished = repo
        .finalize(run.id, CrawlRunStatus::Partial, done, Some(details.clone()))
        .await
        .unwrap();
    assert_eq!(finished.status, CrawlRunStatus::Partial);
    assert!(finished.finished_at.is_some());
    assert_eq!(finished.counts(), done);
    assert_eq!(finished.error_details, Some(details));
}

#[tokio::test]
async fn test_terminal_runs_are_immutable() {
    let repo = CrawlRunRepositoryImpl::new(create_test_db().await);
    let run = repo.create_run("kompas").await.unwrap();

    let err = repo
        .finalize(run.id, CrawlRunStatus::Running, RunCounts::default(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::InvalidState(_)));

    repo.finalize(run.id, CrawlRunStatus::Completed, RunCounts::default(), None)
        .await
        .unwrap();

    let err = repo
        .finalize(run.id, CrawlRunStatus::Failed, RunCounts::default(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::InvalidState(_)));

    let err = repo
        .update_counts(run.id, RunCounts { found: 1, ..Default::default() })
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::InvalidState(_)));

    let err = repo
        .finalize(4242, CrawlRunStatus::Completed, RunCounts::default(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound));
    assert!(repo.get_run(4242).await.unwrap().is_none());
}

#[tokio::test]
async fn test_list_and_latest_successful() {
    let repo = CrawlRunRepositoryImpl::new(create_test_db().await);

    let first = repo.create_run("kompas").await.unwrap();
    repo.finalize(first.id, CrawlRunStatus::Completed, RunCounts::default(), None)
        .await
        .unwrap();
    repo.create_run("detik").await.unwrap();
    let failed = repo.create_run("kompas").await.unwrap();
    repo.finalize(failed.id, CrawlRunStatus::Failed, RunCounts::default(), None)
        .await
        .unwrap();
    let running = repo.create_run("kompas").await.unwrap();

    // 失败和仍在运行的记录都不算
    let latest = repo.latest_successful("kompas").await.unwrap().unwrap();
    assert_eq!(latest.id, first.id);
    assert!(repo.latest_successful("tempo").await.unwrap().is_none());

    let kompas: Vec<i32> = repo
        .list_runs(Some("kompas"), 10)
        .await
        .unwrap()
        .iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(kompas, vec![running.id, failed.id, first.id]);

    let all = repo.list_runs(None, 2).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id, running.id);
    assert_eq!(all[1].id, failed.id);
}

#[tokio::test]
async fn test_fail_orphaned_runs() {
    let repo = CrawlRunRepositoryImpl::new(create_test_db().await);
    let finished = repo.create_run("kompas").await.unwrap();
    repo.finalize(finished.id, CrawlRunStatus::Completed, RunCounts::default(), None)
        .await
        .unwrap();
    let orphan = repo.create_run("kompas").await.unwrap();

    let marked = repo
        .fail_orphaned_runs(json!({ "kind": "interrupted" }))
        .await
        .unwrap();
    assert_eq!(marked, 1);

    let orphan = repo.get_run(orphan.id).await.unwrap().unwrap();
    assert_eq!(orphan.status, CrawlRunStatus::Failed);
    assert!(orphan.finished_at.is_some());
    assert_eq!(orphan.error_details, Some(json!({ "kind": "interrupted" })));

    let finished = repo.get_run(finished.id).await.unwrap().unwrap();
    assert_eq!(finished.status, CrawlRunStatus::Completed);
}

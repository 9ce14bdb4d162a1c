// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{article_html, create_test_app, mount_page, rss_feed};
use news_crawler::domain::models::crawl_run::{CrawlMode, CrawlRunStatus};
use news_crawler::domain::repositories::article_repository::ArticleRepository;
use news_crawler::domain::repositories::crawl_run_repository::CrawlRunRepository;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_landing_page_with_article_link_selector() {
    let app = create_test_app().await;
    let base = app.origin.uri();
    mount_page(
        &app.origin,
        "/",
        "text/html",
        format!(
            r#"<html><body>
                <h3 class="teaser"><a href="/story/a">A</a></h3>
                <h3 class="teaser"><a href="{base}/story/b">B</a></h3>
                <a href="/about">About us</a>
                <a href="https://elsewhere.example.org/story/c">Offsite</a>
            </body></html>"#
        ),
    )
    .await;
    mount_page(&app.origin, "/story/a", "text/html", article_html("Story A", "Alpha.")).await;
    mount_page(&app.origin, "/story/b", "text/html", article_html("Story B", "Beta.")).await;
    app.add_source(
        "landing",
        json!({ "selectors": { "article_link": { "type": "attribute", "selector": "h3.teaser a", "attribute": "href", "multiple": true } } }),
    )
    .await;

    let job = app
        .orchestrator
        .start_crawl("landing", CrawlMode::Incremental)
        .await
        .unwrap();
    job.handle.await.unwrap();

    let run = app.run_repo.get_run(job.run.id).await.unwrap().unwrap();
    assert_eq!(run.status, CrawlRunStatus::Completed);
    assert_eq!(run.articles_found, 2);
    assert_eq!(app.article_repo.count_by_source("landing").await.unwrap(), 2);
}

#[tokio::test]
async fn test_incremental_skips_entries_older_than_last_run() {
    let app = create_test_app().await;
    let feed = rss_feed(
        &app.origin,
        &[
            ("/news/fresh", Some("Tue, 05 Mar 2099 07:30:00 GMT")),
            ("/news/stale", Some("Mon, 01 Jan 2001 00:00:00 GMT")),
        ],
    );
    mount_page(&app.origin, "/rss", "application/rss+xml", feed).await;
    mount_page(&app.origin, "/news/fresh", "text/html", article_html("Fresh", "New.")).await;
    mount_page(&app.origin, "/news/stale", "text/html", article_html("Stale", "Old.")).await;
    app.add_source("dated", json!({ "rss_url": format!("{}/rss", app.origin.uri()) }))
        .await;

    // 第一次运行没有历史记录，全部抓取
    let first = app
        .orchestrator
        .start_crawl("dated", CrawlMode::Incremental)
        .await
        .unwrap();
    first.handle.await.unwrap();
    let first = app.run_repo.get_run(first.run.id).await.unwrap().unwrap();
    assert_eq!(first.articles_found, 2);

    let second = app
        .orchestrator
        .start_crawl("dated", CrawlMode::Incremental)
        .await
        .unwrap();
    second.handle.await.unwrap();
    let second = app.run_repo.get_run(second.run.id).await.unwrap().unwrap();
    assert_eq!(second.status, CrawlRunStatus::Completed);
    assert_eq!(second.articles_found, 1);
    assert_eq!(second.articles_updated, 1);

    // 全量模式不做时间过滤
    let full = app
        .orchestrator
        .start_crawl("dated", CrawlMode::Full)
        .await
        .unwrap();
    full.handle.await.unwrap();
    let full = app.run_repo.get_run(full.run.id).await.unwrap().unwrap();
    assert_eq!(full.articles_found, 2);
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let app = create_test_app().await;
    let feed = rss_feed(&app.origin, &[("/news/flaky", None)]);
    mount_page(&app.origin, "/rss", "application/rss+xml", feed).await;
    Mock::given(method("GET"))
        .and(path("/news/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&app.origin)
        .await;
    mount_page(&app.origin, "/news/flaky", "text/html", article_html("Recovered", "Back.")).await;
    app.add_source("flaky", json!({ "rss_url": format!("{}/rss", app.origin.uri()), "retry_count": 2 }))
        .await;

    let job = app
        .orchestrator
        .start_crawl("flaky", CrawlMode::Incremental)
        .await
        .unwrap();
    job.handle.await.unwrap();

    let run = app.run_repo.get_run(job.run.id).await.unwrap().unwrap();
    assert_eq!(run.status, CrawlRunStatus::Completed);
    assert_eq!(run.articles_new, 1);
    assert_eq!(run.errors, 0);
}

#[tokio::test]
async fn test_robots_txt_disallow_is_respected() {
    let app = create_test_app().await;
    mount_page(
        &app.origin,
        "/robots.txt",
        "text/plain",
        "User-agent: *\nDisallow: /members/\n".to_string(),
    )
    .await;
    let feed = rss_feed(&app.origin, &[("/news/open", None), ("/members/closed", None)]);
    mount_page(&app.origin, "/rss", "application/rss+xml", feed).await;
    mount_page(&app.origin, "/news/open", "text/html", article_html("Open", "Public.")).await;
    mount_page(&app.origin, "/members/closed", "text/html", article_html("Closed", "Paywalled.")).await;
    app.add_source("polite", json!({ "rss_url": format!("{}/rss", app.origin.uri()) }))
        .await;

    let job = app
        .orchestrator
        .start_crawl("polite", CrawlMode::Incremental)
        .await
        .unwrap();
    job.handle.await.unwrap();

    let run = app.run_repo.get_run(job.run.id).await.unwrap().unwrap();
    assert_eq!(run.status, CrawlRunStatus::Completed);
    assert_eq!(run.articles_found, 1);
    assert!(app
        .article_repo
        .find_by_url(&format!("{}/members/closed", app.origin.uri()))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_frontier_failure_fails_the_run() {
    let app = create_test_app().await;
    app.add_source("broken", json!({ "rss_url": format!("{}/rss", app.origin.uri()) }))
        .await;

    let job = app
        .orchestrator
        .start_crawl("broken", CrawlMode::Incremental)
        .await
        .unwrap();
    job.handle.await.unwrap();

    let run = app.run_repo.get_run(job.run.id).await.unwrap().unwrap();
    assert_eq!(run.status, CrawlRunStatus::Failed);
    assert_eq!(run.articles_found, 0);
    assert_eq!(run.error_details.unwrap()["kind"], "frontier");
}

#[tokio::test]
async fn test_failed_run_does_not_advance_incremental_cutoff() {
    let app = create_test_app().await;
    let rss_url = format!("{}/rss", app.origin.uri());
    mount_page(&app.origin, "/rss", "application/rss+xml", rss_feed(&app.origin, &[])).await;
    app.add_source("cutoff", json!({ "rss_url": rss_url })).await;

    let first = app
        .orchestrator
        .start_crawl("cutoff", CrawlMode::Incremental)
        .await
        .unwrap();
    first.handle.await.unwrap();
    let first = app.run_repo.get_run(first.run.id).await.unwrap().unwrap();
    assert_eq!(first.status, CrawlRunStatus::Completed);

    tokio::time::sleep(Duration::from_secs(2)).await;

    // 订阅源暂时不可用，第二次运行失败
    app.origin.reset().await;
    Mock::given(method("GET"))
        .and(path("/rss"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&app.origin)
        .await;
    let second = app
        .orchestrator
        .start_crawl("cutoff", CrawlMode::Incremental)
        .await
        .unwrap();
    second.handle.await.unwrap();
    let second = app.run_repo.get_run(second.run.id).await.unwrap().unwrap();
    assert_eq!(second.status, CrawlRunStatus::Failed);

    // 发布于两次运行之间的条目仍要被第三次运行抓取
    let published = (first.started_at + chrono::Duration::seconds(1)).to_rfc2822();
    assert!(first.started_at + chrono::Duration::seconds(1) < second.started_at);
    app.origin.reset().await;
    mount_page(
        &app.origin,
        "/rss",
        "application/rss+xml",
        rss_feed(&app.origin, &[("/news/between", Some(published.as_str()))]),
    )
    .await;
    mount_page(&app.origin, "/news/between", "text/html", article_html("Between", "Missed.")).await;

    let third = app
        .orchestrator
        .start_crawl("cutoff", CrawlMode::Incremental)
        .await
        .unwrap();
    third.handle.await.unwrap();
    let third = app.run_repo.get_run(third.run.id).await.unwrap().unwrap();
    assert_eq!(third.status, CrawlRunStatus::Completed);
    assert_eq!(third.articles_found, 1);
    assert_eq!(third.articles_new, 1);
}

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{article_html, create_test_app, create_test_app_with_auth, mount_page, rss_feed};
use axum::http::StatusCode;
use news_crawler::config::settings::AuthSettings;
use news_crawler::domain::repositories::article_repository::ArticleRepository;
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_health_and_version() {
    let app = create_test_app().await;

    let response = app.server.get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.text(), "OK");

    let response = app.server.get("/version").await;
    assert_eq!(response.text(), env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_start_crawl_runs_to_completion() {
    let app = create_test_app().await;
    let feed = rss_feed(&app.origin, &[("/news/1", None), ("/news/2", None)]);
    mount_page(&app.origin, "/rss", "application/rss+xml", feed).await;
    mount_page(&app.origin, "/news/1", "text/html", article_html("Harbor reopens", "Ships are back.")).await;
    mount_page(&app.origin, "/news/2", "text/html", article_html("Rain warning", "Heavy rain expected.")).await;
    app.add_source(
        "harbor",
        json!({
            "rss_url": format!("{}/rss", app.origin.uri()),
            "selectors": { "title": "h1.headline", "content": { "type": "css", "selector": "div.body p", "multiple": true } }
        }),
    )
    .await;

    let response = app
        .server
        .post("/crawler/start")
        .json(&json!({ "source_name": "harbor" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::ACCEPTED);
    let body = response.json::<Value>();
    assert_eq!(body["status"], "started");
    assert_eq!(body["source_name"], "harbor");
    assert_eq!(body["mode"], "incremental");
    assert!(body["started_at"].is_string());
    let log_id = body["log_id"].as_i64().unwrap();

    let run = app.wait_for_run(log_id).await;
    assert_eq!(run["status"], "completed");
    assert_eq!(run["articles_found"], 2);
    assert_eq!(run["articles_new"], 2);
    assert_eq!(run["articles_updated"], 0);
    assert_eq!(run["errors"], 0);
    assert!(run["finished_at"].is_string());

    let article = app
        .article_repo
        .find_by_url(&format!("{}/news/1", app.origin.uri()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(article.title, "Harbor reopens");
    assert_eq!(article.content, "Ships are back.\n\nSecond paragraph for Harbor reopens.");
    assert_eq!(article.author.as_deref(), Some("Desk Reporter"));

    // 同一URL再次爬取计为更新
    let response = app
        .server
        .post("/crawler/start")
        .json(&json!({ "source_name": "harbor", "mode": "full" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::ACCEPTED);
    let log_id = response.json::<Value>()["log_id"].as_i64().unwrap();
    let run = app.wait_for_run(log_id).await;
    assert_eq!(run["status"], "completed");
    assert_eq!(run["articles_new"], 0);
    assert_eq!(run["articles_updated"], 2);
    assert_eq!(app.article_repo.count_by_source("harbor").await.unwrap(), 2);
}

#[tokio::test]
async fn test_partial_run_reports_failed_urls() {
    let app = create_test_app().await;
    let feed = rss_feed(&app.origin, &[("/news/ok", None), ("/news/missing", None)]);
    mount_page(&app.origin, "/rss", "application/rss+xml", feed).await;
    mount_page(&app.origin, "/news/ok", "text/html", article_html("Fine", "All good.")).await;
    app.add_source("mixed", json!({ "rss_url": format!("{}/rss", app.origin.uri()) }))
        .await;

    let response = app
        .server
        .post("/crawler/start")
        .json(&json!({ "source_name": "mixed" }))
        .await;
    let log_id = response.json::<Value>()["log_id"].as_i64().unwrap();

    let run = app.wait_for_run(log_id).await;
    assert_eq!(run["status"], "partial");
    assert_eq!(run["articles_found"], 2);
    assert_eq!(run["errors"], 1);
    let errors = run["error_details"]["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0]["url"].as_str().unwrap().ends_with("/news/missing"));
    assert_eq!(errors[0]["kind"], "fetch");
}

#[tokio::test]
async fn test_unknown_and_disabled_sources_are_rejected() {
    let app = create_test_app().await;
    app.add_source("paused", json!({ "enabled": false })).await;

    for name in ["nowhere", "paused"] {
        let response = app
            .server
            .post("/crawler/start")
            .json(&json!({ "source_name": name }))
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.json::<Value>(),
            json!({ "detail": format!("Source '{}' not found or disabled", name) })
        );
    }

    let response = app.server.get("/crawler/logs").await;
    assert_eq!(response.json::<Value>(), json!([]));
}

#[tokio::test]
async fn test_malformed_start_requests() {
    let app = create_test_app().await;

    let response = app
        .server
        .post("/crawler/start")
        .json(&json!({ "source_name": "" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = app
        .server
        .post("/crawler/start")
        .json(&json!({ "source_name": "harbor", "mode": "deep" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.json::<Value>()["detail"].is_string());
}

#[tokio::test]
async fn test_missing_log_is_not_found() {
    let app = create_test_app().await;

    let response = app.server.get("/crawler/logs/999").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(
        response.json::<Value>(),
        json!({ "detail": "Crawl log with ID 999 not found" })
    );
}

#[tokio::test]
async fn test_non_numeric_log_id_is_rejected_with_detail() {
    let app = create_test_app().await;

    let response = app.server.get("/crawler/logs/latest").await;
    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.json::<Value>()["detail"].is_string());
}

#[tokio::test]
async fn test_log_shows_running_before_completion() {
    let app = create_test_app().await;
    let feed = rss_feed(&app.origin, &[("/news/slow", None)]);
    Mock::given(method("GET"))
        .and(path("/rss"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(feed, "application/rss+xml")
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&app.origin)
        .await;
    mount_page(&app.origin, "/news/slow", "text/html", article_html("Slow", "Eventually.")).await;
    app.add_source("slow", json!({ "rss_url": format!("{}/rss", app.origin.uri()) }))
        .await;

    let response = app
        .server
        .post("/crawler/start")
        .json(&json!({ "source_name": "slow" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::ACCEPTED);
    let log_id = response.json::<Value>()["log_id"].as_i64().unwrap();

    let response = app.server.get(&format!("/crawler/logs/{}", log_id)).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let run = response.json::<Value>();
    assert_eq!(run["status"], "running");
    assert!(run["finished_at"].is_null());
    assert_eq!(run["articles_found"], 0);

    let run = app.wait_for_run(log_id).await;
    assert_eq!(run["status"], "completed");
    assert_eq!(run["articles_new"], 1);
    assert!(run["finished_at"].is_string());
}

#[tokio::test]
async fn test_list_logs_filters_and_limits() {
    let app = create_test_app().await;
    mount_page(&app.origin, "/rss", "application/rss+xml", rss_feed(&app.origin, &[])).await;
    let rss = json!({ "rss_url": format!("{}/rss", app.origin.uri()) });
    app.add_source("alpha", rss.clone()).await;
    app.add_source("beta", rss).await;

    for name in ["alpha", "beta", "alpha"] {
        let response = app
            .server
            .post("/crawler/start")
            .json(&json!({ "source_name": name }))
            .await;
        let log_id = response.json::<Value>()["log_id"].as_i64().unwrap();
        app.wait_for_run(log_id).await;
    }

    let all = app.server.get("/crawler/logs").await.json::<Value>();
    assert_eq!(all.as_array().unwrap().len(), 3);

    let alpha = app
        .server
        .get("/crawler/logs")
        .add_query_param("source_name", "alpha")
        .await
        .json::<Value>();
    let alpha = alpha.as_array().unwrap();
    assert_eq!(alpha.len(), 2);
    // 最新的在前
    assert!(alpha[0]["id"].as_i64() > alpha[1]["id"].as_i64());

    let limited = app
        .server
        .get("/crawler/logs")
        .add_query_param("limit", 1)
        .await
        .json::<Value>();
    assert_eq!(limited.as_array().unwrap().len(), 1);

    let response = app
        .server
        .get("/crawler/logs")
        .add_query_param("limit", 0)
        .await;
    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_reload_sources_picks_up_changes() {
    let app = create_test_app().await;
    app.add_source("flip", json!({ "enabled": false })).await;

    let response = app
        .server
        .post("/crawler/start")
        .json(&json!({ "source_name": "flip" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    // 数据库中启用后，缓存仍是旧值，直到 reload
    mount_page(&app.origin, "/rss", "application/rss+xml", rss_feed(&app.origin, &[])).await;
    app.add_source("flip", json!({ "rss_url": format!("{}/rss", app.origin.uri()) }))
        .await;
    let response = app
        .server
        .post("/crawler/start")
        .json(&json!({ "source_name": "flip" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = app.server.post("/crawler/sources/reload").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>(), json!({ "status": "reloaded" }));

    let response = app
        .server
        .post("/crawler/start")
        .json(&json!({ "source_name": "flip" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::ACCEPTED);
    let log_id = response.json::<Value>()["log_id"].as_i64().unwrap();
    assert_eq!(app.wait_for_run(log_id).await["status"], "completed");
}

#[tokio::test]
async fn test_api_key_protects_crawler_routes() {
    let app = create_test_app_with_auth(AuthSettings {
        api_key: Some("secret".to_string()),
    })
    .await;

    let response = app.server.get("/crawler/logs").await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    assert_eq!(response.json::<Value>(), json!({ "detail": "No API key provided" }));

    let response = app
        .server
        .get("/crawler/logs")
        .add_header("X-API-Key", "wrong")
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    assert_eq!(response.json::<Value>(), json!({ "detail": "Invalid API key" }));

    let response = app
        .server
        .get("/crawler/logs")
        .add_header("X-API-Key", "secret")
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    // 健康检查不需要认证
    assert_eq!(app.server.get("/health").await.status_code(), StatusCode::OK);
}

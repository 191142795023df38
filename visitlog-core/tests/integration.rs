//! Integration tests for visit reporting
//!
//! These tests drive the reporter end to end: real HTTP against a `wiremock`
//! server and real SQLite files under a temp dir.

use std::sync::Arc;

use tempfile::TempDir;
use visitlog_core::buffer::VisitBuffer;
use visitlog_core::config::ReporterConfig;
use visitlog_core::context::PageSnapshot;
use visitlog_core::delivery::DeliveryTarget;
use visitlog_core::lifecycle::{report_on_load, PageLifecycle, ReadyState};
use visitlog_core::storage::{origin_scope, tab_scope, Database, MemoryStore, ScopedStore};
use visitlog_core::{ReportOutcome, VisitReporter};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn about_page() -> PageSnapshot {
    PageSnapshot::new("https://blog.example.org/about")
        .title("About")
        .referrer("https://example.com")
        .user_agent("Mozilla/5.0 (X11; Linux x86_64)")
        .language("en-US")
        .screen(1920, 1080)
        .viewport(1280, 720)
}

fn open_db(dir: &TempDir) -> Arc<Database> {
    let db = Database::open(&dir.path().join("visits.db")).expect("open db");
    db.migrate().expect("migrate db");
    Arc::new(db)
}

fn origin_store(db: &Arc<Database>) -> Arc<ScopedStore> {
    let url = reqwest::Url::parse("https://blog.example.org/about").unwrap();
    Arc::new(ScopedStore::new(db.clone(), origin_scope(&url)))
}

// ============================================
// Remote delivery
// ============================================

#[tokio::test]
async fn remote_strategy_posts_envelope_with_bearer_token() {
    visitlog_core::logging::init_test();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .and(header("authorization", "Bearer abc"))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(serde_json::json!({
            "level": "info",
            "message": "Page visit",
            "path": "/about",
            "referrer": "https://example.com",
            "screen": {"width": 1920, "height": 1080}
        })))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let config = ReporterConfig {
        logtail_source_token: Some("abc".to_string()),
        logtail_endpoint: format!("{}/", server.uri()),
        ..Default::default()
    };
    let origin = Arc::new(MemoryStore::new());
    let reporter = VisitReporter::new(
        config,
        Arc::new(about_page()),
        Arc::new(MemoryStore::new()),
        origin.clone(),
    )
    .unwrap();

    let outcome = reporter.report_current_page().await.unwrap();

    assert_eq!(
        outcome,
        ReportOutcome::Delivered {
            target: DeliveryTarget::Remote,
            status: 202
        }
    );
    assert!(origin.is_empty());
}

#[tokio::test]
async fn custom_endpoint_receives_bare_record_without_auth() {
    visitlog_core::logging::init_test();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/log"))
        .and(body_partial_json(serde_json::json!({
            "url": "https://blog.example.org/about",
            "title": "About",
            "userAgent": "Mozilla/5.0 (X11; Linux x86_64)"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = ReporterConfig {
        custom_api_url: Some(format!("{}/api/log", server.uri())),
        ..Default::default()
    };
    let reporter = VisitReporter::new(
        config,
        Arc::new(about_page()),
        Arc::new(MemoryStore::new()),
        Arc::new(MemoryStore::new()),
    )
    .unwrap();

    let outcome = reporter.report_current_page().await.unwrap();
    assert!(matches!(
        outcome,
        ReportOutcome::Delivered {
            target: DeliveryTarget::CustomEndpoint,
            status: 200
        }
    ));

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    assert!(received[0].headers.get("authorization").is_none());
    let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
    assert!(body.get("dt").is_none());
    assert!(body["sessionId"].as_str().unwrap().starts_with("sess_"));
}

#[tokio::test]
async fn unreachable_remote_falls_back_to_sqlite_buffer() {
    visitlog_core::logging::init_test();
    // Bind to learn a free port, then release it so connections are refused
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let dead_endpoint = format!("http://{}/", listener.local_addr().unwrap());
    drop(listener);

    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);
    let origin = origin_store(&db);

    let config = ReporterConfig {
        logtail_source_token: Some("abc".to_string()),
        logtail_endpoint: dead_endpoint,
        timeout_secs: Some(5),
        ..Default::default()
    };
    let reporter = VisitReporter::new(
        config,
        Arc::new(about_page()),
        Arc::new(MemoryStore::new()),
        origin.clone(),
    )
    .unwrap();
    let record = reporter.capture_context();

    let outcome = reporter.report(record.clone()).await.unwrap();

    assert!(matches!(
        outcome,
        ReportOutcome::Buffered {
            fallback_from: Some(DeliveryTarget::Remote),
            len: 1,
            ..
        }
    ));
    let buffered = VisitBuffer::new(origin).records().unwrap();
    assert_eq!(buffered, vec![record]);
}

// ============================================
// Local buffering
// ============================================

#[tokio::test]
async fn unconfigured_page_load_buffers_one_record() {
    visitlog_core::logging::init_test();
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);
    let origin = origin_store(&db);

    let reporter = VisitReporter::new(
        ReporterConfig::default(),
        Arc::new(about_page()),
        Arc::new(MemoryStore::new()),
        origin.clone(),
    )
    .unwrap();
    let lifecycle = PageLifecycle::new(ReadyState::Loading);
    let handle = report_on_load(reporter, lifecycle.subscribe());
    lifecycle.mark_complete();
    handle.await.unwrap().unwrap();

    let records = VisitBuffer::new(origin.clone()).records().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].path, "/about");
    assert_eq!(records[0].referrer, "https://example.com");
    assert!(!records[0].session_id.is_empty());
    assert!(VisitBuffer::new(origin).last_updated().unwrap().is_some());
}

#[tokio::test]
async fn buffer_and_session_survive_reopening_the_database() {
    visitlog_core::logging::init_test();
    let dir = TempDir::new().unwrap();

    let first_session = {
        let db = open_db(&dir);
        let tab = Arc::new(ScopedStore::new(db.clone(), tab_scope("main")));
        let reporter = VisitReporter::new(
            ReporterConfig::default(),
            Arc::new(about_page()),
            tab,
            origin_store(&db),
        )
        .unwrap();
        reporter.report_current_page().await.unwrap();
        reporter.session_id()
    };

    let db = open_db(&dir);
    let tab = Arc::new(ScopedStore::new(db.clone(), tab_scope("main")));
    let reporter = VisitReporter::new(
        ReporterConfig::default(),
        Arc::new(PageSnapshot::new("https://blog.example.org/posts/1")),
        tab,
        origin_store(&db),
    )
    .unwrap();
    let outcome = reporter.report_current_page().await.unwrap();

    assert!(matches!(outcome, ReportOutcome::Buffered { len: 2, .. }));
    let records = reporter.buffer().records().unwrap();
    assert_eq!(records[0].path, "/about");
    assert_eq!(records[1].path, "/posts/1");
    assert!(records.iter().all(|r| r.session_id == first_session));
}

#[tokio::test]
async fn origins_do_not_share_buffers() {
    visitlog_core::logging::init_test();
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);
    let other = Arc::new(ScopedStore::new(
        db.clone(),
        origin_scope(&reqwest::Url::parse("https://docs.example.org/").unwrap()),
    ));

    let reporter = VisitReporter::new(
        ReporterConfig::default(),
        Arc::new(about_page()),
        Arc::new(MemoryStore::new()),
        origin_store(&db),
    )
    .unwrap();
    reporter.report_current_page().await.unwrap();

    assert_eq!(reporter.buffer().len().unwrap(), 1);
    assert!(VisitBuffer::new(other).is_empty().unwrap());
}

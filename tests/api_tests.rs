//! HTTP API tests
//!
//! Drives the full route table against a temp-dir journal and a
//! counting GeoIP provider, so no network access is needed.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use actix_web::http::StatusCode;
use actix_web::test::{self, TestRequest};
use actix_web::{App, web};
use async_trait::async_trait;
use serde_json::Value;
use tempfile::TempDir;

use visitlog::api::configure_routes;
use visitlog::api::services::PageSettings;
use visitlog::api::services::frontend::SIMULATOR_FILE;
use visitlog::journal::VisitJournal;
use visitlog::services::geoip::{GeoIpLookup, GeoIpProvider, GeoRecord, LookupOutcome};
use visitlog::services::{GeoCache, QueryService};

// =============================================================================
// Test Setup
// =============================================================================

/// 计数 provider：每个公网 IP 返回固定记录
struct CountingLookup {
    calls: AtomicUsize,
}

impl CountingLookup {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GeoIpLookup for CountingLookup {
    async fn lookup(&self, _ip: &str) -> LookupOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        LookupOutcome::Found(GeoRecord {
            country: "Australia".into(),
            city: "Brisbane".into(),
            org: "APNIC".into(),
        })
    }

    fn name(&self) -> &'static str {
        "Counting"
    }
}

struct TestContext {
    dir: TempDir,
    journal: Arc<VisitJournal>,
    geo: Arc<GeoCache>,
    query: Arc<QueryService>,
    pages: PageSettings,
}

impl TestContext {
    fn new(provider: GeoIpProvider) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let journal = Arc::new(VisitJournal::new(dir.path().join("ip_log.txt"), false));
        let geo = Arc::new(GeoCache::new(dir.path().join("geo_cache.json"), provider));
        let query = Arc::new(QueryService::new(Arc::clone(&journal), Arc::clone(&geo)));
        let pages = PageSettings::new(dir.path());
        Self {
            dir,
            journal,
            geo,
            query,
            pages,
        }
    }

    fn with_limits(mut self, display_limit: usize, export_ceiling: usize) -> Self {
        self.query = Arc::new(
            QueryService::new(Arc::clone(&self.journal), Arc::clone(&self.geo))
                .with_limits(display_limit, export_ceiling),
        );
        self
    }
}

macro_rules! init_app {
    ($ctx:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($ctx.journal.clone()))
                .app_data(web::Data::new($ctx.query.clone()))
                .app_data(web::Data::new($ctx.pages.clone()))
                .configure(configure_routes),
        )
        .await
    };
}

/// 写入 `count` 行记录，直接拼接文件内容
fn seed_journal(ctx: &TestContext, count: usize) {
    let mut body = String::new();
    for i in 0..count {
        body.push_str(&format!(
            "{{\"ts\":\"2025-01-01T00:00:00.{:06}+00:00\",\"ip\":\"1.2.3.4\",\"method\":\"GET\",\"path\":\"/get_ip\",\"origin\":\"\",\"referer\":\"\",\"ua\":\"seed-{}\"}}\n",
            i % 1_000_000,
            i
        ));
    }
    std::fs::write(ctx.journal.path(), body).expect("Failed to seed journal");
}

// =============================================================================
// /get_ip + /logs.json
// =============================================================================

#[actix_rt::test]
async fn test_visits_are_recorded_in_order() {
    let lookup = CountingLookup::new();
    let ctx = TestContext::new(GeoIpProvider::with_lookup(lookup.clone()));
    let app = init_app!(ctx);

    let first = TestRequest::get()
        .uri("/get_ip")
        .insert_header(("X-Forwarded-For", "1.2.3.4"))
        .insert_header(("User-Agent", "first"))
        .to_request();
    let resp = test::call_service(&app, first).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["ip"], "1.2.3.4");
    assert!(body["ts"].as_str().is_some_and(|ts| !ts.is_empty()));

    let second = TestRequest::get()
        .uri("/get_ip")
        .peer_addr("10.0.0.1:40000".parse().unwrap())
        .insert_header(("User-Agent", "second"))
        .to_request();
    let resp = test::call_service(&app, second).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let third = TestRequest::get()
        .uri("/get_ip")
        .insert_header(("X-Forwarded-For", "1.2.3.4, 172.16.0.1"))
        .insert_header(("User-Agent", "third"))
        .to_request();
    let resp = test::call_service(&app, third).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = TestRequest::get().uri("/logs.json").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let logs: Vec<Value> = test::read_body_json(resp).await;

    assert_eq!(logs.len(), 3);
    let ips: Vec<&str> = logs.iter().filter_map(|l| l["ip"].as_str()).collect();
    assert_eq!(ips, ["1.2.3.4", "10.0.0.1", "1.2.3.4"]);
    let uas: Vec<&str> = logs.iter().filter_map(|l| l["ua"].as_str()).collect();
    assert_eq!(uas, ["first", "second", "third"]);
    assert_eq!(logs[0]["method"], "GET");
    assert_eq!(logs[0]["path"], "/get_ip");

    // 记录访问不触发 GeoIP 查询
    assert_eq!(lookup.calls(), 0);
}

#[actix_rt::test]
async fn test_logs_json_limit() {
    let ctx = TestContext::new(GeoIpProvider::disabled());
    seed_journal(&ctx, 20);
    let app = init_app!(ctx);

    let req = TestRequest::get().uri("/logs.json?limit=5").to_request();
    let logs: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(logs.len(), 5);
    assert_eq!(logs[0]["ua"], "seed-15");
    assert_eq!(logs[4]["ua"], "seed-19");

    let req = TestRequest::get().uri("/logs.json?limit=abc").to_request();
    let logs: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(logs.len(), 20);
}

#[actix_rt::test]
async fn test_logs_json_skips_corrupt_lines() {
    let ctx = TestContext::new(GeoIpProvider::disabled());
    seed_journal(&ctx, 2);
    {
        use std::io::Write;
        let mut file = std::fs::OpenOptions::new()
            .append(true)
            .open(ctx.journal.path())
            .unwrap();
        file.write_all(b"{not json\n\n{\"ip\":\"5.6.7.8\"}\n").unwrap();
    }
    let app = init_app!(ctx);

    let req = TestRequest::get().uri("/logs.json").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let logs: Vec<Value> = test::read_body_json(resp).await;
    assert_eq!(logs.len(), 2);
}

#[actix_rt::test]
async fn test_logs_json_missing_journal_is_empty() {
    let ctx = TestContext::new(GeoIpProvider::disabled());
    let app = init_app!(ctx);

    let req = TestRequest::get().uri("/logs.json").to_request();
    let logs: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    assert!(logs.is_empty());
    assert!(!ctx.journal.path().exists());
}

// =============================================================================
// /logs.csv
// =============================================================================

#[actix_rt::test]
async fn test_logs_csv_caps_at_export_ceiling() {
    let ctx = TestContext::new(GeoIpProvider::disabled());
    seed_journal(&ctx, 5003);
    let app = init_app!(ctx);

    let req = TestRequest::get().uri("/logs.csv?n=10000").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let content_type = resp.headers().get("content-type").unwrap().to_str().unwrap();
    assert!(content_type.starts_with("text/csv"));
    let disposition = resp
        .headers()
        .get("content-disposition")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("attachment"));
    assert!(disposition.contains("logs_last_5000.csv"));

    let body = test::read_body(resp).await;
    let text = std::str::from_utf8(&body).unwrap();
    assert_eq!(text.lines().count(), 5001);
    assert_eq!(text.lines().next().unwrap(), "ts,ip,method,path,origin,referer,ua");
    assert!(text.lines().last().unwrap().ends_with("seed-5002"));
}

#[actix_rt::test]
async fn test_logs_csv_fewer_rows_than_requested() {
    let ctx = TestContext::new(GeoIpProvider::disabled()).with_limits(3, 10);
    seed_journal(&ctx, 4);
    let app = init_app!(ctx);

    let req = TestRequest::get().uri("/logs.csv?n=8").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let disposition = resp.headers().get("content-disposition").unwrap();
    assert!(disposition.to_str().unwrap().contains("logs_last_8.csv"));

    let body = test::read_body(resp).await;
    assert_eq!(std::str::from_utf8(&body).unwrap().lines().count(), 5);
}

#[actix_rt::test]
async fn test_logs_csv_overflowing_number_uses_ceiling() {
    let ctx = TestContext::new(GeoIpProvider::disabled());
    seed_journal(&ctx, 600);
    let app = init_app!(ctx);

    let req = TestRequest::get()
        .uri("/logs.csv?n=10000000000000000000000")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let disposition = resp.headers().get("content-disposition").unwrap();
    assert!(disposition.to_str().unwrap().contains("logs_last_5000.csv"));

    let body = test::read_body(resp).await;
    assert_eq!(std::str::from_utf8(&body).unwrap().lines().count(), 601);
}

#[actix_rt::test]
async fn test_logs_csv_bad_number_uses_default() {
    let ctx = TestContext::new(GeoIpProvider::disabled());
    seed_journal(&ctx, 600);
    let app = init_app!(ctx);

    let req = TestRequest::get().uri("/logs.csv?n=not-a-number").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let disposition = resp.headers().get("content-disposition").unwrap();
    assert!(disposition.to_str().unwrap().contains("logs_last_500.csv"));

    let body = test::read_body(resp).await;
    assert_eq!(std::str::from_utf8(&body).unwrap().lines().count(), 501);
}

#[actix_rt::test]
async fn test_logs_csv_empty_journal_has_header() {
    let ctx = TestContext::new(GeoIpProvider::disabled());
    let app = init_app!(ctx);

    let req = TestRequest::get().uri("/logs.csv").to_request();
    let body = test::call_and_read_body(&app, req).await;
    assert_eq!(
        std::str::from_utf8(&body).unwrap(),
        "ts,ip,method,path,origin,referer,ua\n"
    );
}

// =============================================================================
// /geo
// =============================================================================

#[actix_rt::test]
async fn test_geo_private_ip_skips_provider() {
    let lookup = CountingLookup::new();
    let ctx = TestContext::new(GeoIpProvider::with_lookup(lookup.clone()));
    let app = init_app!(ctx);

    let req = TestRequest::get().uri("/geo?ip=10.0.0.1").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;

    assert_eq!(body["ip"], "10.0.0.1");
    assert_eq!(body["country"], "(private)");
    assert_eq!(body["city"], "");
    assert_eq!(body["org"], "");
    assert_eq!(lookup.calls(), 0);
    assert!(ctx.geo.is_empty());
}

#[actix_rt::test]
async fn test_geo_public_ip_looked_up_once() {
    let lookup = CountingLookup::new();
    let ctx = TestContext::new(GeoIpProvider::with_lookup(lookup.clone()));
    let app = init_app!(ctx);

    for _ in 0..2 {
        let req = TestRequest::get().uri("/geo?ip=1.2.3.4").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["ip"], "1.2.3.4");
        assert_eq!(body["country"], "Australia");
        assert_eq!(body["city"], "Brisbane");
        assert_eq!(body["org"], "APNIC");
    }

    assert_eq!(lookup.calls(), 1);

    // 新的记录已经落盘
    let saved: Value =
        serde_json::from_slice(&std::fs::read(ctx.dir.path().join("geo_cache.json")).unwrap())
            .unwrap();
    assert_eq!(saved["1.2.3.4"]["country"], "Australia");
}

#[actix_rt::test]
async fn test_geo_missing_ip_is_bad_request() {
    let ctx = TestContext::new(GeoIpProvider::disabled());
    let app = init_app!(ctx);

    for uri in ["/geo", "/geo?ip="] {
        let req = TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "uri: {}", uri);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["code"], "E003");
    }
}

#[actix_rt::test]
async fn test_geo_disabled_provider_returns_empty_record() {
    let ctx = TestContext::new(GeoIpProvider::disabled());
    let app = init_app!(ctx);

    let req = TestRequest::get().uri("/geo?ip=8.8.8.8").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["ip"], "8.8.8.8");
    assert_eq!(body["country"], "");
    assert_eq!(body["city"], "");
    assert_eq!(body["org"], "");

    // 私有地址不受开关影响
    let req = TestRequest::get().uri("/geo?ip=127.0.0.1").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["country"], "(private)");
}

#[actix_rt::test]
async fn test_geo_invalid_ip_not_cached() {
    let lookup = CountingLookup::new();
    let ctx = TestContext::new(GeoIpProvider::with_lookup(lookup.clone()));
    let app = init_app!(ctx);

    let req = TestRequest::get().uri("/geo?ip=not-an-ip").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["country"], "");

    assert_eq!(lookup.calls(), 0);
    assert!(ctx.geo.is_empty());
}

// =============================================================================
// Pages + health
// =============================================================================

#[actix_rt::test]
async fn test_health() {
    let ctx = TestContext::new(GeoIpProvider::disabled());
    let app = init_app!(ctx);

    let req = TestRequest::get().uri("/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["ok"], true);

    let req = TestRequest::default()
        .method(actix_web::http::Method::HEAD)
        .uri("/health")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_rt::test]
async fn test_pages_are_served() {
    let ctx = TestContext::new(GeoIpProvider::disabled());
    let app = init_app!(ctx);

    for uri in ["/", "/logs"] {
        let req = TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK, "uri: {}", uri);
        let content_type = resp.headers().get("content-type").unwrap().to_str().unwrap();
        assert!(content_type.starts_with("text/html"));
    }

    // 页面本身不写访问日志
    assert!(!ctx.journal.path().exists());
}

#[actix_rt::test]
async fn test_simulator_missing_shows_placeholder() {
    let ctx = TestContext::new(GeoIpProvider::disabled());
    let app = init_app!(ctx);

    let req = TestRequest::get().uri("/simulator").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let content_type = resp.headers().get("content-type").unwrap().to_str().unwrap();
    assert!(content_type.starts_with("text/html"));

    let body = test::read_body(resp).await;
    let html = std::str::from_utf8(&body).unwrap();
    assert!(html.contains("Simulator not found"));
    assert!(html.contains(SIMULATOR_FILE));
}

#[actix_rt::test]
async fn test_simulator_served_from_static_dir() {
    let ctx = TestContext::new(GeoIpProvider::disabled());
    let page = "<html><body>simulator ready</body></html>";
    std::fs::write(ctx.dir.path().join(SIMULATOR_FILE), page).unwrap();
    let app = init_app!(ctx);

    let req = TestRequest::get().uri("/simulator").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let content_type = resp.headers().get("content-type").unwrap().to_str().unwrap();
    assert!(content_type.starts_with("text/html"));

    let body = test::read_body(resp).await;
    assert_eq!(std::str::from_utf8(&body).unwrap(), page);

    // 模拟器页面不写访问日志
    assert!(!ctx.journal.path().exists());
}

//! Integration tests for the crawler
//!
//! These tests use wiremock to serve a small table-style legal code and run
//! the full crawl cycle end-to-end over HTTP.

use statute_crawler::config::{parse_config, Config, StrategyKind};
use statute_crawler::crawler::{run_crawl, Coordinator};
use statute_crawler::store::{CONTENT_NOT_AVAILABLE, FAILED_TO_FETCH};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn listing(header: &str, rows: &[(&str, &str)]) -> String {
    let rows: String = rows
        .iter()
        .map(|(label, href)| format!(r#"<tr><td><a href="{}">{}</a></td></tr>"#, href, label))
        .collect();
    format!(
        r#"<html><body>
        <table><tr><th>Quick links</th></tr><tr><td><a href="/help">Help</a></td></tr></table>
        <table><tr><th>{}</th></tr>{}</table>
        </body></html>"#,
        header, rows
    )
}

async fn mount_html(server: &MockServer, route: &str, status: u16, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(status)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

/// Serves one title, one chapter and three sections: one with text, one
/// without a body, one missing entirely
async fn mount_ohio_site(server: &MockServer) {
    mount_html(
        server,
        "/ohio",
        200,
        listing("Title", &[("Title 1 | State Government", "/ohio/title-1")]),
    )
    .await;

    mount_html(
        server,
        "/ohio/title-1",
        200,
        listing(
            "Chapter",
            &[("Chapter 101 | General Assembly", "/ohio/chapter-101")],
        ),
    )
    .await;

    mount_html(
        server,
        "/ohio/chapter-101",
        200,
        listing(
            "Section",
            &[
                ("Section 101.01 | Definitions. Effective 2021.", "/ohio/section-101.01"),
                ("Section 101.02 | Sessions.", "/ohio/section-101.02"),
                ("Section 101.03 | Journal.", "/ohio/section-101.03"),
            ],
        ),
    )
    .await;

    mount_html(
        server,
        "/ohio/section-101.01",
        200,
        r#"<html><body><section class="laws-body">
            <p> As used in the Revised Code: </p>
            <p>(A) "Person" includes an individual.</p>
        </section></body></html>"#
            .to_string(),
    )
    .await;

    mount_html(
        server,
        "/ohio/section-101.02",
        200,
        "<html><body><p>This section has been renumbered.</p></body></html>".to_string(),
    )
    .await;

    mount_html(server, "/ohio/section-101.03", 404, "Not Found".to_string()).await;
}

fn create_test_config(server_uri: &str, output: &str, extra_crawler: &str, format: &str) -> Config {
    parse_config(&format!(
        r#"
[crawler]
concurrency = 2
request-delay = 0
expansion-delay = 0
content-timeout = 5000
listing-timeout = 5000
{extra_crawler}

[user-agent]
crawler-name = "TestCrawler"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "admin@example.com"

[site]
name = "ohio"
root-url = "{server_uri}/ohio"
base-url = "{server_uri}"
strategy = "table"
levels = ["title", "chapter", "section"]

[output]
path = "{output}"
format = "{format}"
"#
    ))
    .expect("test config should be valid")
}

fn read_json(path: &std::path::Path) -> serde_json::Value {
    let content = std::fs::read_to_string(path).expect("output file should exist");
    serde_json::from_str(&content).expect("output should be valid JSON")
}

#[tokio::test]
async fn test_full_crawl_flat_output() {
    let server = MockServer::start().await;
    mount_ohio_site(&server).await;

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("ohio.json");
    let config = create_test_config(&server.uri(), &output.to_string_lossy(), "", "flat");

    let stats = run_crawl(config, "test-hash".to_string())
        .await
        .expect("crawl should succeed");

    assert_eq!(stats.total_sections, 3);
    assert_eq!(stats.extracted, 1);
    assert_eq!(stats.content_missing, 1);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.chapters, 1);

    let json = read_json(&output);
    assert_eq!(json["metadata"]["site"], "ohio");
    assert_eq!(json["metadata"]["config_hash"], "test-hash");

    let sections = json["sections"].as_object().unwrap();
    assert_eq!(sections.len(), 3);

    let first = &sections["chapter101_section101.01"];
    assert_eq!(
        first["text"],
        "As used in the Revised Code:\n(A) \"Person\" includes an individual."
    );
    assert_eq!(first["section_label"], "Definitions");
    assert_eq!(first["status"], "extracted");

    assert_eq!(sections["chapter101_section101.02"]["text"], CONTENT_NOT_AVAILABLE);
    assert_eq!(sections["chapter101_section101.03"]["text"], FAILED_TO_FETCH);
    assert_eq!(sections["chapter101_section101.03"]["status"], "failed");
}

#[tokio::test]
async fn test_full_crawl_tree_output() {
    let server = MockServer::start().await;
    mount_ohio_site(&server).await;

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("nested").join("ohio-tree.json");
    let config = create_test_config(&server.uri(), &output.to_string_lossy(), "", "tree");

    run_crawl(config, "test-hash".to_string())
        .await
        .expect("crawl should succeed");

    let json = read_json(&output);
    let title = &json["hierarchy"][0];
    assert_eq!(title["kind"], "title");
    assert_eq!(title["number"], "1");
    assert_eq!(title["label"], "State Government");

    let chapter = &title["children"][0];
    assert_eq!(chapter["number"], "101");

    let sections = chapter["children"].as_array().unwrap();
    let numbers: Vec<&str> = sections
        .iter()
        .map(|s| s["number"].as_str().unwrap())
        .collect();
    assert_eq!(numbers, vec!["101.01", "101.02", "101.03"]);
    assert_eq!(sections[2]["text"], FAILED_TO_FETCH);
}

#[tokio::test]
async fn test_worker_discovery_matches_expander_discovery() {
    let server = MockServer::start().await;
    mount_ohio_site(&server).await;

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("ohio.json");
    let config = create_test_config(
        &server.uri(),
        &output.to_string_lossy(),
        r#"section-discovery = "worker""#,
        "flat",
    );

    let stats = run_crawl(config, "test-hash".to_string())
        .await
        .expect("crawl should succeed");

    assert_eq!(stats.total_sections, 3);
    assert_eq!(stats.extracted, 1);

    let json = read_json(&output);
    let sections = json["sections"].as_object().unwrap();
    assert!(sections.contains_key("chapter101_section101.01"));
    assert!(sections.contains_key("chapter101_section101.03"));
}

#[tokio::test]
async fn test_robots_disallowed_sections_are_skipped() {
    let server = MockServer::start().await;
    mount_ohio_site(&server).await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("User-agent: *\nDisallow: /ohio/section-101.02\n"),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("ohio.json");
    let config = create_test_config(
        &server.uri(),
        &output.to_string_lossy(),
        "respect-robots = true",
        "flat",
    );

    let coordinator = Coordinator::new(config, "test-hash".to_string()).unwrap();
    let plan = coordinator.plan().await.expect("plan should succeed");

    assert!(plan.robots.is_some());
    assert_eq!(plan.leaf_count(), 2);
}

#[tokio::test]
async fn test_unreachable_root_produces_empty_document() {
    let server = MockServer::start().await;
    mount_html(&server, "/ohio", 503, "Service Unavailable".to_string()).await;

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("ohio.json");
    let config = create_test_config(&server.uri(), &output.to_string_lossy(), "", "flat");

    let stats = run_crawl(config, "test-hash".to_string())
        .await
        .expect("an empty crawl is not an error");

    assert_eq!(stats.total_sections, 0);
    let json = read_json(&output);
    assert!(json["sections"].as_object().unwrap().is_empty());
}

#[tokio::test]
async fn test_sqlite_output_records_run() {
    let server = MockServer::start().await;
    mount_ohio_site(&server).await;

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("ohio.db");
    let config = create_test_config(&server.uri(), &output.to_string_lossy(), "", "sqlite");

    run_crawl(config, "test-hash".to_string())
        .await
        .expect("crawl should succeed");

    let conn = rusqlite::Connection::open(&output).unwrap();
    let runs: i64 = conn
        .query_row("SELECT COUNT(*) FROM runs", [], |row| row.get(0))
        .unwrap();
    let sections: i64 = conn
        .query_row("SELECT COUNT(*) FROM sections", [], |row| row.get(0))
        .unwrap();
    assert_eq!(runs, 1);
    assert_eq!(sections, 3);
}

#[tokio::test]
async fn test_texas_crawl_strips_section_heading() {
    let server = MockServer::start().await;
    mount_html(
        &server,
        "/ohio",
        200,
        listing("Title", &[("Title 1 | General Provisions", "/ohio/title-1")]),
    )
    .await;
    mount_html(
        &server,
        "/ohio/title-1",
        200,
        listing("Chapter", &[("Chapter 1 | General Provisions", "/ohio/chapter-1")]),
    )
    .await;
    mount_html(
        &server,
        "/ohio/chapter-1",
        200,
        listing("Section", &[("Section 1.001 | Short Title.", "/ohio/section-1.001")]),
    )
    .await;
    mount_html(
        &server,
        "/ohio/section-1.001",
        200,
        r#"<html><body>
            <p class="center">CHAPTER 1. GENERAL PROVISIONS</p>
            <p>Sec. 1.001. SHORT TITLE. This code may be cited as the Business Code.</p>
            <p>Added by Acts 2003.</p>
        </body></html>"#
            .to_string(),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("texas.json");
    let mut config = create_test_config(&server.uri(), &output.to_string_lossy(), "", "flat");
    config.site.strategy = StrategyKind::TexasTable;

    let stats = run_crawl(config, "test-hash".to_string())
        .await
        .expect("crawl should succeed");
    assert_eq!(stats.extracted, 1);

    let json = read_json(&output);
    let section = &json["sections"]["chapter1_section1.001"];
    assert_eq!(
        section["text"],
        "This code may be cited as the Business Code.\nAdded by Acts 2003."
    );
    assert_eq!(section["heading_number"], "1.001");
    assert_eq!(section["heading_name"], "SHORT TITLE");
    assert!(section.get("last_updated").is_none());
}

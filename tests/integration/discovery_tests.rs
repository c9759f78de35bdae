//! Integration tests for sitemap and feed discovery
//!
//! These tests use wiremock to serve publication endpoints and check the
//! source fallback order and keyword exclusion end-to-end.

use press_harvest::config::DiscoveryConfig;
use press_harvest::discovery::{build_http_client, discover};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_test_config(feed_limit: usize) -> DiscoveryConfig {
    DiscoveryConfig {
        timeout_secs: 2,
        feed_limit,
    }
}

fn keywords() -> Vec<String> {
    vec!["about".to_string(), "archive".to_string(), "podcast".to_string()]
}

fn sitemap(urls: &[String]) -> String {
    let entries: String = urls
        .iter()
        .map(|u| format!("<url><loc>{}</loc><lastmod>2024-01-01</lastmod></url>", u))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{}</urlset>"#,
        entries
    )
}

fn feed(urls: &[String]) -> String {
    let items: String = urls
        .iter()
        .map(|u| format!("<item><title>t</title><link>{}</link></item>", u))
        .collect();
    format!(
        r#"<?xml version="1.0"?><rss version="2.0"><channel><title>Pub</title><link>https://pub.test</link>{}</channel></rss>"#,
        items
    )
}

#[tokio::test]
async fn test_sitemap_urls_are_filtered_in_order() {
    let server = MockServer::start().await;
    let base = server.uri();
    let urls = vec![
        format!("{}/p/first", base),
        format!("{}/about", base),
        format!("{}/p/second", base),
        format!("{}/archive", base),
        format!("{}/podcast/episode-1", base),
    ];
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(sitemap(&urls)))
        .mount(&server)
        .await;

    let client = build_http_client(Duration::from_secs(2), None).unwrap();
    let found = discover(&client, &format!("{}/", base), &create_test_config(22), &keywords()).await;

    assert_eq!(
        found,
        vec![format!("{}/p/first", base), format!("{}/p/second", base)]
    );
}

#[tokio::test]
async fn test_falls_back_to_feed_when_sitemap_missing() {
    let server = MockServer::start().await;
    let base = server.uri();
    let urls: Vec<String> = (0..30).map(|i| format!("{}/p/post-{}", base, i)).collect();
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(feed(&urls)))
        .mount(&server)
        .await;

    let client = build_http_client(Duration::from_secs(2), None).unwrap();
    let found = discover(&client, &base, &create_test_config(22), &keywords()).await;

    assert_eq!(found.len(), 22);
    assert_eq!(found[0], format!("{}/p/post-0", base));
}

#[tokio::test]
async fn test_falls_back_to_feed_when_sitemap_malformed() {
    let server = MockServer::start().await;
    let base = server.uri();
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not xml at all"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(feed(&[format!("{}/p/only", base)])),
        )
        .mount(&server)
        .await;

    let client = build_http_client(Duration::from_secs(2), None).unwrap();
    let found = discover(&client, &base, &create_test_config(22), &keywords()).await;

    assert_eq!(found, vec![format!("{}/p/only", base)]);
}

#[tokio::test]
async fn test_both_sources_failing_yields_empty_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = build_http_client(Duration::from_secs(2), None).unwrap();
    let found = discover(&client, &server.uri(), &create_test_config(22), &keywords()).await;

    assert!(found.is_empty());
}

#[tokio::test]
async fn test_slow_sitemap_times_out_to_feed() {
    let server = MockServer::start().await;
    let base = server.uri();
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(sitemap(&[format!("{}/p/late", base)]))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(feed(&[format!("{}/p/quick", base)])),
        )
        .mount(&server)
        .await;

    let client = build_http_client(Duration::from_millis(500), None).unwrap();
    let found = discover(&client, &base, &create_test_config(22), &keywords()).await;

    assert_eq!(found, vec![format!("{}/p/quick", base)]);
}

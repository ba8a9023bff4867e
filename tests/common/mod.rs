//! Shared fixtures for integration tests: mock sites served by wiremock.

use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;
use std::io::Write;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use bluedetect::config::HttpConfig;

/// HTTP config pointed at plain-HTTP mock servers.
pub fn test_http_config() -> HttpConfig {
    HttpConfig {
        timeout_secs: 5,
        max_redirects: 5,
        probe_path: "/umbraco/".to_string(),
        schemes: vec!["http".to_string()],
        user_agent: "bluedetect-test/1.0".to_string(),
    }
}

/// The `host:port` a mock server listens on, usable as a probe domain.
pub fn host(server: &MockServer) -> String {
    server
        .uri()
        .strip_prefix("http://")
        .expect("mock server uri is http")
        .to_string()
}

/// A convincing Umbraco backoffice login page.
pub fn umbraco_login_body() -> String {
    r#"<!DOCTYPE html>
<html>
<head>
    <title>Login | Northwind Traders</title>
    <link rel="stylesheet" href="/umbraco_client/ui/ui.css">
    <script src="/umbraco/lib/umbraco.min.js"></script>
</head>
<body class="umbraco-login">
    <div id="umbraco-dashboard"></div>
    <form action="/umbraco/login.aspx"></form>
</body>
</html>"#
        .to_string()
}

/// Serve an Umbraco-looking page at `/umbraco/` with ASP.NET headers.
pub async fn mount_umbraco_site(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/umbraco/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-aspnet-version", "4.0.30319")
                .set_body_raw(umbraco_login_body(), "text/html"),
        )
        .mount(server)
        .await;
}

/// Serve a page declaring a non-Umbraco generator at `/umbraco/`.
pub async fn mount_generator_site(server: &MockServer, generator: &str) {
    let body = format!(
        r#"<html><head><meta name="generator" content="{}"></head>
        <body>umbraco umbraco.aspx /App_Plugins/</body></html>"#,
        generator
    );
    Mock::given(method("GET"))
        .and(path("/umbraco/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html"))
        .mount(server)
        .await;
}

/// Serve a plain page with no CMS signals at `/umbraco/`.
pub async fn mount_plain_site(server: &MockServer, status: u16) {
    Mock::given(method("GET"))
        .and(path("/umbraco/"))
        .respond_with(
            ResponseTemplate::new(status)
                .set_body_raw("<html><body>nothing here</body></html>", "text/html"),
        )
        .mount(server)
        .await;
}

/// Mount a chain of `hops` 302 redirects starting at `/r1`, ending in a 200
/// page at `/final`.
pub async fn mount_redirect_chain(server: &MockServer, hops: u32, final_body: &str) {
    for i in 1..=hops {
        let target = if i == hops {
            "/final".to_string()
        } else {
            format!("/r{}", i + 1)
        };
        Mock::given(method("GET"))
            .and(path(format!("/r{}", i)))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", target))
            .mount(server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/final"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(final_body.to_string(), "text/html"))
        .mount(server)
        .await;
}

/// Gzip-compress a payload.
pub fn gzip(payload: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(payload).expect("gzip write");
    encoder.finish().expect("gzip finish")
}

/// Zlib-compress a payload, as sent under `Content-Encoding: deflate`.
pub fn deflate(payload: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(payload).expect("deflate write");
    encoder.finish().expect("deflate finish")
}

mod common;

use wiremock::matchers::{header, headers, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use bluedetect::probe::Prober;
use common::{deflate, gzip, mount_redirect_chain, test_http_config};

#[tokio::test]
async fn follows_redirect_chain_up_to_the_cap() {
    let server = MockServer::start().await;
    mount_redirect_chain(&server, 5, "<html>arrived</html>").await;

    let prober = Prober::new(&test_http_config()).unwrap();
    let result = prober.fetch(&format!("{}/r1", server.uri())).await.unwrap();

    assert_eq!(result.status, 200);
    assert_eq!(result.body, "<html>arrived</html>");
    assert!(result.final_url.ends_with("/final"));
}

#[tokio::test]
async fn redirect_chain_beyond_the_cap_is_an_error() {
    let server = MockServer::start().await;
    mount_redirect_chain(&server, 6, "<html>never reached</html>").await;

    let prober = Prober::new(&test_http_config()).unwrap();
    let err = prober
        .fetch(&format!("{}/r1", server.uri()))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("Too many redirects"));
}

#[tokio::test]
async fn relative_location_resolves_against_host_root() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/umbraco/"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "landing"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/landing"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("ok", "text/html"))
        .mount(&server)
        .await;

    let prober = Prober::new(&test_http_config()).unwrap();
    let result = prober
        .fetch(&format!("{}/umbraco/", server.uri()))
        .await
        .unwrap();

    assert_eq!(result.status, 200);
    assert!(result.final_url.ends_with("/landing"));
}

#[tokio::test]
async fn gzip_body_is_decompressed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/umbraco/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-encoding", "gzip")
                .set_body_raw(gzip(b"<html>umbraco inside</html>"), "text/html"),
        )
        .mount(&server)
        .await;

    let prober = Prober::new(&test_http_config()).unwrap();
    let result = prober
        .fetch(&format!("{}/umbraco/", server.uri()))
        .await
        .unwrap();

    assert_eq!(result.body, "<html>umbraco inside</html>");
}

#[tokio::test]
async fn deflate_body_is_decompressed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/umbraco/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-encoding", "deflate")
                .set_body_raw(deflate(b"<html>umbraco inside</html>"), "text/html"),
        )
        .mount(&server)
        .await;

    let prober = Prober::new(&test_http_config()).unwrap();
    let result = prober
        .fetch(&format!("{}/umbraco/", server.uri()))
        .await
        .unwrap();

    assert_eq!(result.body, "<html>umbraco inside</html>");
}

#[tokio::test]
async fn non_success_status_is_returned_not_raised() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/umbraco/"))
        .respond_with(ResponseTemplate::new(404).set_body_raw("gone", "text/html"))
        .mount(&server)
        .await;

    let prober = Prober::new(&test_http_config()).unwrap();
    let result = prober
        .fetch(&format!("{}/umbraco/", server.uri()))
        .await
        .unwrap();

    assert_eq!(result.status, 404);
    assert_eq!(result.body, "gone");
}

#[tokio::test]
async fn header_names_are_lowercased() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/umbraco/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-AspNet-Version", "4.0.30319")
                .set_body_raw("", "text/html"),
        )
        .mount(&server)
        .await;

    let prober = Prober::new(&test_http_config()).unwrap();
    let result = prober
        .fetch(&format!("{}/umbraco/", server.uri()))
        .await
        .unwrap();

    assert_eq!(
        result.headers.get("x-aspnet-version").map(String::as_str),
        Some("4.0.30319")
    );
}

#[tokio::test]
async fn browser_headers_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/umbraco/"))
        .and(header("user-agent", "bluedetect-test/1.0"))
        .and(headers("accept-encoding", vec!["gzip", "deflate"]))
        .respond_with(ResponseTemplate::new(200).set_body_raw("ok", "text/html"))
        .mount(&server)
        .await;

    let prober = Prober::new(&test_http_config()).unwrap();
    let result = prober
        .fetch(&format!("{}/umbraco/", server.uri()))
        .await
        .unwrap();

    assert_eq!(result.status, 200);
}

#[tokio::test]
async fn unreachable_host_is_an_error() {
    // Nothing listens here; the connect fails fast
    let prober = Prober::new(&test_http_config()).unwrap();
    assert!(prober.fetch("http://127.0.0.1:1/umbraco/").await.is_err());
}

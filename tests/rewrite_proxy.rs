//! End-to-end tests for API rewriting.

use std::time::Duration;

use api_rewrite_proxy::config::{ProxyConfig, RewriteConfig};
use reqwest::StatusCode;
use serde_json::Value;

mod common;

#[tokio::test]
async fn test_api_request_forwarded_with_query() {
    let backend = common::start_echo_backend().await;
    let mut config = ProxyConfig::default();
    config.api.origin = Some(format!("http://{backend}"));
    let (proxy, _shutdown) = common::start_proxy(config).await;

    let res = common::client()
        .get(format!("http://{proxy}/api/users/42?active=true"))
        .send()
        .await
        .expect("Proxy unreachable");

    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));

    let echo: Value = res.json().await.unwrap();
    assert_eq!(echo["method"], "GET");
    assert_eq!(echo["path"], "/users/42");
    assert_eq!(echo["query"], "active=true");
    assert_eq!(echo["host"], backend.to_string());
    assert_eq!(echo["x_forwarded_host"], proxy.to_string());
    assert_eq!(echo["x_forwarded_for"], "127.0.0.1");
    assert!(echo["x_request_id"].is_string());
}

#[tokio::test]
async fn test_method_and_body_preserved() {
    let backend = common::start_echo_backend().await;
    let mut config = ProxyConfig::default();
    config.api.origin = Some(format!("http://{backend}/"));
    let (proxy, _shutdown) = common::start_proxy(config).await;

    let res = common::client()
        .post(format!("http://{proxy}/api/orders"))
        .body(r#"{"item":"book"}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let echo: Value = res.json().await.unwrap();
    assert_eq!(echo["method"], "POST");
    assert_eq!(echo["path"], "/orders");
    assert_eq!(echo["body"], r#"{"item":"book"}"#);
    assert_eq!(echo["content_length"], "15");
}

#[tokio::test]
async fn test_empty_post_keeps_zero_content_length() {
    let backend = common::start_echo_backend().await;
    let mut config = ProxyConfig::default();
    config.api.origin = Some(format!("http://{backend}"));
    let (proxy, _shutdown) = common::start_proxy(config).await;

    for method in [reqwest::Method::POST, reqwest::Method::PUT] {
        let res = common::client()
            .request(method.clone(), format!("http://{proxy}/api/ping"))
            .header("content-length", "0")
            .send()
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        let echo: Value = res.json().await.unwrap();
        assert_eq!(echo["method"], method.as_str());
        assert_eq!(echo["content_length"], "0");
        assert_eq!(echo["body"], "");
    }
}

#[tokio::test]
async fn test_slow_backend_returns_504() {
    let backend = common::start_slow_backend(Duration::from_secs(3)).await;
    let mut config = ProxyConfig::default();
    config.api.origin = Some(format!("http://{backend}"));
    config.timeouts.upstream_secs = 1;
    config.timeouts.request_secs = 10;
    let (proxy, _shutdown) = common::start_proxy(config).await;

    let res = common::client()
        .get(format!("http://{proxy}/api/slow"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::GATEWAY_TIMEOUT);
}

#[tokio::test]
async fn test_request_deadline_returns_408() {
    let backend = common::start_slow_backend(Duration::from_secs(3)).await;
    let mut config = ProxyConfig::default();
    config.api.origin = Some(format!("http://{backend}"));
    config.timeouts.request_secs = 1;
    config.timeouts.upstream_secs = 10;
    let (proxy, _shutdown) = common::start_proxy(config).await;

    let res = common::client()
        .get(format!("http://{proxy}/api/slow"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::REQUEST_TIMEOUT);
}

#[tokio::test]
async fn test_origin_path_prefix_kept() {
    let backend = common::start_echo_backend().await;
    let mut config = ProxyConfig::default();
    config.api.origin = Some(format!("http://{backend}/v2"));
    let (proxy, _shutdown) = common::start_proxy(config).await;

    let echo: Value = common::client()
        .delete(format!("http://{proxy}/api/sessions/7"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(echo["method"], "DELETE");
    assert_eq!(echo["path"], "/v2/sessions/7");
}

#[tokio::test]
async fn test_non_api_path_not_rewritten() {
    let backend = common::start_echo_backend().await;
    let mut config = ProxyConfig::default();
    config.api.origin = Some(format!("http://{backend}"));
    let (proxy, _shutdown) = common::start_proxy(config).await;

    let client = common::client();
    for path in ["/", "/about", "/apix/users"] {
        let res = client
            .get(format!("http://{proxy}{path}"))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND, "path {path}");
    }
}

#[tokio::test]
async fn test_extra_rewrite_rule() {
    let backend = common::start_echo_backend().await;
    let mut config = ProxyConfig::default();
    config.api.origin = Some(format!("http://{backend}"));
    config.rewrites.push(RewriteConfig {
        name: "assets".into(),
        source: "/static/:file+".into(),
        destination: format!("http://{backend}/assets/:file+"),
    });
    let (proxy, _shutdown) = common::start_proxy(config).await;

    let echo: Value = common::client()
        .get(format!("http://{proxy}/static/css/site.css?v=3"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(echo["path"], "/assets/css/site.css");
    assert_eq!(echo["query"], "v=3");
}

#[tokio::test]
async fn test_unreachable_backend_returns_502() {
    let closed = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let mut config = ProxyConfig::default();
    config.api.origin = Some(format!("http://{closed}"));
    let (proxy, _shutdown) = common::start_proxy(config).await;

    let res = common::client()
        .get(format!("http://{proxy}/api/orders"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_oversized_body_rejected() {
    let backend = common::start_echo_backend().await;
    let mut config = ProxyConfig::default();
    config.api.origin = Some(format!("http://{backend}"));
    config.security.max_body_size = 16;
    let (proxy, _shutdown) = common::start_proxy(config).await;

    let res = common::client()
        .post(format!("http://{proxy}/api/upload"))
        .body(vec![b'x'; 1024])
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_shutdown_stops_accepting() {
    let backend = common::start_echo_backend().await;
    let mut config = ProxyConfig::default();
    config.api.origin = Some(format!("http://{backend}"));
    let (proxy, shutdown) = common::start_proxy(config).await;

    shutdown.trigger();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let result = common::client()
        .get(format!("http://{proxy}/api/orders"))
        .timeout(Duration::from_secs(2))
        .send()
        .await;
    assert!(result.is_err(), "proxy should no longer accept connections");
}

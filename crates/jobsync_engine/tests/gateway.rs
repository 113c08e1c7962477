mod common;

use std::sync::Arc;

use jobsync_core::ErrorKind;
use jobsync_engine::{
    ApiRequest, AuthGateway, ClientSettings, CredentialStore, MemoryCredentials, ReqwestGateway,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn gateway_for(
    server: &MockServer,
    credentials: Arc<MemoryCredentials>,
    trailing_slash: bool,
) -> ReqwestGateway {
    common::init_logging();
    let settings = ClientSettings {
        base_url: format!("{}/api", server.uri()),
        trailing_slash,
        ..ClientSettings::default()
    };
    ReqwestGateway::new(&settings, credentials).expect("client builds")
}

fn credentials(access: &str, refresh: Option<&str>) -> Arc<MemoryCredentials> {
    Arc::new(MemoryCredentials::new(
        Some(access.to_string()),
        refresh.map(ToOwned::to_owned),
    ))
}

#[tokio::test]
async fn bearer_token_is_attached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/scraping/jobs/active"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"active_jobs": []})))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway_for(&server, credentials("tok-1", None), false);
    let response = gateway
        .call(&ApiRequest::get("/scraping/jobs/active"))
        .await
        .expect("call succeeds");

    assert_eq!(response.status, 200);
    assert_eq!(response.body, json!({"active_jobs": []}));
}

#[tokio::test]
async fn unauthorized_request_is_refreshed_and_replayed_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/scraping/workers/activity"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/jwt/refresh"))
        .and(body_json(json!({"refresh": "r-1"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"access": "fresh", "refresh": "r-2"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/scraping/workers/activity"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    let store = credentials("stale", Some("r-1"));
    let gateway = gateway_for(&server, store.clone(), false);
    let response = gateway
        .call(&ApiRequest::get("/scraping/workers/activity"))
        .await
        .expect("replay succeeds");

    assert_eq!(response.status, 200);
    assert_eq!(store.access_token().as_deref(), Some("fresh"));
    assert_eq!(store.refresh_token().as_deref(), Some("r-2"));
}

#[tokio::test]
async fn repeated_unauthorized_surfaces_auth_required() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/scraping/jobs/active"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/jwt/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "fresh"})))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway_for(&server, credentials("stale", Some("r-1")), false);
    let err = gateway
        .call(&ApiRequest::get("/scraping/jobs/active"))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::AuthRequired);
}

#[tokio::test]
async fn missing_refresh_token_fails_without_refresh_call() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/scraping/jobs/active"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/jwt/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let gateway = gateway_for(&server, credentials("stale", None), false);
    let err = gateway
        .call(&ApiRequest::get("/scraping/jobs/active"))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::AuthRequired);
}

#[tokio::test]
async fn rejected_refresh_surfaces_auth_required() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/scraping/jobs/active"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/jwt/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway_for(&server, credentials("stale", Some("expired")), false);
    let err = gateway
        .call(&ApiRequest::get("/scraping/jobs/active"))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::AuthRequired);
}

#[tokio::test]
async fn trailing_slash_and_query_are_applied() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/scraping/jobs/history/"))
        .and(query_param("status", "failed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"jobs": []})))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway_for(&server, credentials("tok", None), true);
    let response = gateway
        .call(&ApiRequest::get("/scraping/jobs/history").with_query("status", "failed"))
        .await
        .expect("call succeeds");

    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn post_body_is_sent_as_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/scraping/jobs/3/control"))
        .and(body_json(json!({"action": "pause"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway_for(&server, credentials("tok", None), false);
    let response = gateway
        .call(&ApiRequest::post(
            "/scraping/jobs/3/control",
            json!({"action": "pause"}),
        ))
        .await
        .expect("call succeeds");

    assert_eq!(response.body, json!({"success": true}));
}

#[tokio::test]
async fn unreachable_server_is_a_network_error() {
    common::init_logging();
    let settings = ClientSettings {
        base_url: "http://127.0.0.1:9/api".to_string(),
        ..ClientSettings::default()
    };
    let gateway = ReqwestGateway::new(&settings, credentials("tok", None)).unwrap();

    let err = gateway
        .call(&ApiRequest::get("/scraping/jobs/active"))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Network);
}

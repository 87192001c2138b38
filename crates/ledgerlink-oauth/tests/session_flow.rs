//! Token lifecycle tests against a mock identity platform and accounting API.

use std::sync::Arc;

use chrono::{Duration, Utc};
use ledgerlink_oauth::{ApiRequest, OAuthConfig, OAuthError, SessionSnapshot, TokenSession};
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN_PATH: &str = "/oauth2/v1/tokens/bearer";
const QUERY_PATH: &str = "/v3/company/realm-1/query";
// base64("client-id:client-secret")
const BASIC_AUTH: &str = "Basic Y2xpZW50LWlkOmNsaWVudC1zZWNyZXQ=";

fn session_for(server: &MockServer) -> TokenSession {
    let config = OAuthConfig::new("client-id", "client-secret", "https://example.com/callback")
        .with_token_url(format!("{}{}", server.uri(), TOKEN_PATH));
    TokenSession::new(config)
}

fn query_request(server: &MockServer) -> ApiRequest {
    let url = Url::parse(&format!("{}{}", server.uri(), QUERY_PATH)).unwrap();
    ApiRequest::get(url).with_query("query", "SELECT * FROM Customer")
}

fn auth_fault(message: &str) -> serde_json::Value {
    json!({
        "Fault": {
            "Error": [{ "Message": message, "Detail": "Token expired", "code": "3200" }],
            "type": "AUTHENTICATION"
        }
    })
}

fn refresh_response(access_token: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "access_token": access_token,
        "expires_in": 3600,
        "token_type": "bearer"
    }))
}

async fn mount_refresh(server: &MockServer, access_token: &str, times: u64) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(refresh_response(access_token))
        .expect(times)
        .mount(server)
        .await;
}

async fn mount_query(server: &MockServer, bearer: &str, response: ResponseTemplate, times: u64) {
    Mock::given(method("GET"))
        .and(path(QUERY_PATH))
        .and(header("authorization", format!("Bearer {}", bearer).as_str()))
        .respond_with(response)
        .expect(times)
        .mount(server)
        .await;
}

fn ok_query() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "QueryResponse": {} }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Code exchange and refresh
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_exchange_code_authenticates_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(header("authorization", BASIC_AUTH))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=validcode"))
        .and(body_string_contains("redirect_uri="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-1",
            "refresh_token": "refresh-1",
            "expires_in": 3600,
            "x_refresh_token_expires_in": 8726400,
            "token_type": "bearer",
            "realmId": "9130350"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session = session_for(&server);
    let tokens = session
        .exchange_authorization_code("validcode", None)
        .await
        .unwrap();
    assert_eq!(tokens.access_token, "access-1");

    let status = session.status().await;
    assert!(status.authenticated);
    assert_eq!(status.tenant_id.as_deref(), Some("9130350"));
    assert!(status.has_refresh_token);
    assert!(status.access_token_expiry.is_some());
    assert!(status.refresh_token_expiry.is_some());
}

#[tokio::test]
async fn test_exchange_code_realm_override() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-1",
            "refresh_token": "refresh-1",
            "expires_in": 3600,
            "realmId": "from-vendor"
        })))
        .mount(&server)
        .await;

    let session = session_for(&server);
    session
        .exchange_authorization_code("validcode", Some("from-redirect"))
        .await
        .unwrap();

    assert_eq!(
        session.status().await.tenant_id.as_deref(),
        Some("from-redirect")
    );
}

#[tokio::test]
async fn test_exchange_failure_is_generic() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Authorization code is invalid"
        })))
        .mount(&server)
        .await;

    let session = session_for(&server);
    let err = session
        .exchange_authorization_code("badcode", None)
        .await
        .unwrap_err();

    assert!(matches!(err, OAuthError::CodeExchange(_)));
    assert!(!err.to_string().contains("invalid_grant"));
    assert!(!session.status().await.authenticated);
}

#[tokio::test]
async fn test_refresh_without_new_refresh_token_keeps_old_one() {
    let server = MockServer::start().await;
    mount_refresh(&server, "access-2", 1).await;

    let session = session_for(&server);
    session
        .set_credentials("access-1", "realm-1", Some("refresh-1".to_string()), Some(3600))
        .await;

    let tokens = session.refresh("refresh-1").await.unwrap();
    assert_eq!(tokens.refresh_token.as_deref(), Some("refresh-1"));

    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.access_token.as_deref(), Some("access-2"));
    assert_eq!(snapshot.refresh_token.as_deref(), Some("refresh-1"));
    assert_eq!(snapshot.tenant_id.as_deref(), Some("realm-1"));
}

#[tokio::test]
async fn test_refresh_rotates_refresh_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("refresh_token=refresh-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-2",
            "refresh_token": "refresh-2",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session = session_for(&server);
    session
        .set_credentials("access-1", "realm-1", Some("refresh-1".to_string()), None)
        .await;
    session.refresh("refresh-1").await.unwrap();

    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.refresh_token.as_deref(), Some("refresh-2"));
}

#[tokio::test]
async fn test_set_credentials_clears_refresh_token_expiry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-1",
            "refresh_token": "refresh-1",
            "expires_in": 3600,
            "x_refresh_token_expires_in": 8726400,
            "realmId": "realm-1"
        })))
        .mount(&server)
        .await;

    let session = session_for(&server);
    session
        .exchange_authorization_code("validcode", None)
        .await
        .unwrap();
    assert!(session.status().await.refresh_token_expiry.is_some());

    session.set_credentials("manual", "realm-2", None, None).await;
    let status = session.status().await;
    assert!(!status.has_refresh_token);
    assert_eq!(status.refresh_token_expiry, None);

    session
        .set_credentials("manual", "realm-2", Some("refresh-new".to_string()), None)
        .await;
    assert_eq!(session.status().await.refresh_token_expiry, None);
}

#[tokio::test]
async fn test_refresh_keeps_expiry_of_kept_refresh_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=authorization_code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-1",
            "refresh_token": "refresh-1",
            "expires_in": 3600,
            "x_refresh_token_expires_in": 8726400,
            "realmId": "realm-1"
        })))
        .mount(&server)
        .await;
    mount_refresh(&server, "access-2", 1).await;

    let session = session_for(&server);
    session
        .exchange_authorization_code("validcode", None)
        .await
        .unwrap();
    let before = session.status().await.refresh_token_expiry;
    assert!(before.is_some());

    session.refresh("refresh-1").await.unwrap();
    let status = session.status().await;
    assert_eq!(session.snapshot().await.access_token.as_deref(), Some("access-2"));
    assert_eq!(status.refresh_token_expiry, before);
}

#[tokio::test]
async fn test_rotated_refresh_token_drops_old_expiry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-2",
            "refresh_token": "refresh-2",
            "expires_in": 3600
        })))
        .mount(&server)
        .await;

    let session = session_for(&server);
    session
        .restore(SessionSnapshot {
            access_token: Some("access-1".to_string()),
            refresh_token: Some("refresh-1".to_string()),
            tenant_id: Some("realm-1".to_string()),
            access_token_expiry: None,
            refresh_token_expiry: Some(Utc::now() + Duration::days(90)),
        })
        .await;

    session.refresh("refresh-1").await.unwrap();
    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.refresh_token.as_deref(), Some("refresh-2"));
    assert_eq!(snapshot.refresh_token_expiry, None);
}

#[tokio::test]
async fn test_refresh_failure_is_classified() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})))
        .mount(&server)
        .await;

    let session = session_for(&server);
    let err = session.refresh("refresh-1").await.unwrap_err();
    assert!(matches!(
        err,
        OAuthError::RefreshFailed {
            status: Some(400),
            ..
        }
    ));
}

// ─────────────────────────────────────────────────────────────────────────────
// Authenticated calls
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_stale_token_refreshed_once_before_call() {
    let server = MockServer::start().await;
    mount_refresh(&server, "access-new", 1).await;
    mount_query(&server, "access-old", ok_query(), 0).await;
    mount_query(&server, "access-new", ok_query(), 1).await;

    let session = session_for(&server);
    session
        .restore(SessionSnapshot {
            access_token: Some("access-old".to_string()),
            refresh_token: Some("refresh-1".to_string()),
            tenant_id: Some("realm-1".to_string()),
            access_token_expiry: Some(Utc::now() - Duration::seconds(1)),
            refresh_token_expiry: None,
        })
        .await;

    let response = session
        .authenticated_call(&query_request(&server))
        .await
        .unwrap();
    assert_eq!(response.status, 200);
    assert!(!session.is_expired().await);
}

#[tokio::test]
async fn test_missing_access_token_triggers_refresh() {
    let server = MockServer::start().await;
    mount_refresh(&server, "access-new", 1).await;
    mount_query(&server, "access-new", ok_query(), 1).await;

    let session = session_for(&server);
    session
        .restore(SessionSnapshot {
            refresh_token: Some("refresh-1".to_string()),
            tenant_id: Some("realm-1".to_string()),
            ..Default::default()
        })
        .await;

    session
        .authenticated_call(&query_request(&server))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_stale_token_without_refresh_token_is_sent() {
    let server = MockServer::start().await;
    mount_refresh(&server, "unused", 0).await;
    mount_query(&server, "access-stale", ok_query(), 1).await;

    let session = session_for(&server);
    session
        .restore(SessionSnapshot {
            access_token: Some("access-stale".to_string()),
            tenant_id: Some("realm-1".to_string()),
            access_token_expiry: Some(Utc::now() - Duration::hours(2)),
            ..Default::default()
        })
        .await;

    assert!(session.is_expired().await);
    session
        .authenticated_call(&query_request(&server))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_unauthorized_triggers_single_refresh_and_retry() {
    let server = MockServer::start().await;
    mount_refresh(&server, "access-new", 1).await;
    mount_query(
        &server,
        "access-old",
        ResponseTemplate::new(401).set_body_json(auth_fault("AuthenticationFailed")),
        1,
    )
    .await;
    mount_query(&server, "access-new", ok_query(), 1).await;

    let session = session_for(&server);
    session
        .set_credentials("access-old", "realm-1", Some("refresh-1".to_string()), None)
        .await;

    let response = session
        .authenticated_call(&query_request(&server))
        .await
        .unwrap();
    assert_eq!(response.body, json!({ "QueryResponse": {} }));
}

#[tokio::test]
async fn test_second_unauthorized_surfaces_retry_error() {
    let server = MockServer::start().await;
    mount_refresh(&server, "access-new", 1).await;
    mount_query(
        &server,
        "access-old",
        ResponseTemplate::new(401).set_body_json(auth_fault("first failure")),
        1,
    )
    .await;
    mount_query(
        &server,
        "access-new",
        ResponseTemplate::new(401).set_body_json(auth_fault("second failure")),
        1,
    )
    .await;

    let session = session_for(&server);
    session
        .set_credentials("access-old", "realm-1", Some("refresh-1".to_string()), None)
        .await;

    let err = session
        .authenticated_call(&query_request(&server))
        .await
        .unwrap_err();
    let fault = err.fault().expect("upstream fault");
    assert_eq!(fault.status, 401);
    assert_eq!(fault.message, "second failure");
}

#[tokio::test]
async fn test_fault_code_3200_triggers_retry() {
    let server = MockServer::start().await;
    mount_refresh(&server, "access-new", 1).await;
    mount_query(
        &server,
        "access-old",
        ResponseTemplate::new(403).set_body_json(auth_fault("AuthorizationFailure")),
        1,
    )
    .await;
    mount_query(&server, "access-new", ok_query(), 1).await;

    let session = session_for(&server);
    session
        .set_credentials("access-old", "realm-1", Some("refresh-1".to_string()), None)
        .await;

    session
        .authenticated_call(&query_request(&server))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_unauthorized_without_refresh_token_is_not_retried() {
    let server = MockServer::start().await;
    mount_refresh(&server, "unused", 0).await;
    mount_query(
        &server,
        "access-old",
        ResponseTemplate::new(401).set_body_json(auth_fault("AuthenticationFailed")),
        1,
    )
    .await;

    let session = session_for(&server);
    session
        .set_credentials("access-old", "realm-1", None, None)
        .await;

    let err = session
        .authenticated_call(&query_request(&server))
        .await
        .unwrap_err();
    assert!(err.is_auth_failure());
}

#[tokio::test]
async fn test_other_failures_are_not_retried() {
    let server = MockServer::start().await;
    mount_refresh(&server, "unused", 0).await;
    mount_query(
        &server,
        "access-1",
        ResponseTemplate::new(500).set_body_string("Internal Server Error"),
        1,
    )
    .await;

    let session = session_for(&server);
    session
        .set_credentials("access-1", "realm-1", Some("refresh-1".to_string()), None)
        .await;

    let err = session
        .authenticated_call(&query_request(&server))
        .await
        .unwrap_err();
    let fault = err.fault().expect("upstream fault");
    assert_eq!(fault.status, 500);
    assert_eq!(fault.message, "Internal Server Error");
}

#[tokio::test]
async fn test_rejected_refresh_requires_reauthentication() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})))
        .expect(1)
        .mount(&server)
        .await;
    mount_query(&server, "access-old", ok_query(), 0).await;

    let session = session_for(&server);
    session
        .restore(SessionSnapshot {
            access_token: Some("access-old".to_string()),
            refresh_token: Some("refresh-revoked".to_string()),
            tenant_id: Some("realm-1".to_string()),
            access_token_expiry: Some(Utc::now() - Duration::minutes(10)),
            refresh_token_expiry: None,
        })
        .await;

    let err = session
        .authenticated_call(&query_request(&server))
        .await
        .unwrap_err();
    assert!(matches!(err, OAuthError::AuthExpired(_)));

    // Last known tokens stay in memory.
    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.access_token.as_deref(), Some("access-old"));
}

#[tokio::test]
async fn test_refresh_outage_propagates_unchanged() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let session = session_for(&server);
    session
        .restore(SessionSnapshot {
            access_token: Some("access-old".to_string()),
            refresh_token: Some("refresh-1".to_string()),
            tenant_id: Some("realm-1".to_string()),
            access_token_expiry: Some(Utc::now()),
            refresh_token_expiry: None,
        })
        .await;

    let err = session.ensure_fresh().await.unwrap_err();
    assert!(matches!(
        err,
        OAuthError::RefreshFailed {
            status: Some(503),
            ..
        }
    ));
}

#[tokio::test]
async fn test_rejected_refresh_after_unauthorized_requires_reauthentication() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})))
        .expect(1)
        .mount(&server)
        .await;
    mount_query(
        &server,
        "access-old",
        ResponseTemplate::new(401).set_body_json(auth_fault("AuthenticationFailed")),
        1,
    )
    .await;

    let session = session_for(&server);
    session
        .set_credentials("access-old", "realm-1", Some("refresh-revoked".to_string()), None)
        .await;

    let err = session
        .authenticated_call(&query_request(&server))
        .await
        .unwrap_err();
    assert!(matches!(err, OAuthError::AuthExpired(_)));
}

#[tokio::test]
async fn test_refresh_outage_after_unauthorized_surfaces_original_fault() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;
    mount_query(
        &server,
        "access-old",
        ResponseTemplate::new(401).set_body_json(auth_fault("original 401")),
        1,
    )
    .await;

    let session = session_for(&server);
    session
        .set_credentials("access-old", "realm-1", Some("refresh-1".to_string()), None)
        .await;

    let err = session
        .authenticated_call(&query_request(&server))
        .await
        .unwrap_err();
    let fault = err.fault().expect("upstream fault");
    assert_eq!(fault.status, 401);
    assert_eq!(fault.message, "original 401");
}

#[tokio::test]
async fn test_unauthorized_after_concurrent_rotation_retries_without_refresh() {
    let server = MockServer::start().await;
    // Only the explicit refresh below reaches the token endpoint.
    mount_refresh(&server, "access-new", 1).await;
    mount_query(
        &server,
        "access-old",
        ResponseTemplate::new(401)
            .set_body_json(auth_fault("AuthenticationFailed"))
            .set_delay(std::time::Duration::from_millis(500)),
        1,
    )
    .await;
    mount_query(&server, "access-new", ok_query(), 1).await;

    let session = session_for(&server);
    session
        .set_credentials("access-old", "realm-1", Some("refresh-1".to_string()), None)
        .await;

    let request = query_request(&server);
    let (call, refreshed) = tokio::join!(session.authenticated_call(&request), async {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        session.refresh("refresh-1").await
    });
    refreshed.unwrap();
    call.unwrap();
}

#[tokio::test]
async fn test_concurrent_stale_calls_share_one_refresh() {
    let server = MockServer::start().await;
    mount_refresh(&server, "access-new", 1).await;
    mount_query(&server, "access-new", ok_query(), 2).await;

    let session = Arc::new(session_for(&server));
    session
        .restore(SessionSnapshot {
            access_token: Some("access-old".to_string()),
            refresh_token: Some("refresh-1".to_string()),
            tenant_id: Some("realm-1".to_string()),
            access_token_expiry: Some(Utc::now() - Duration::seconds(30)),
            refresh_token_expiry: None,
        })
        .await;

    let request = query_request(&server);
    let (first, second) = tokio::join!(
        session.authenticated_call(&request),
        session.authenticated_call(&request)
    );
    first.unwrap();
    second.unwrap();
}

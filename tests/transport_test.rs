mod common;

use common::{application_wire, error, ok, unsuccessful, TestPortal, TOKEN};
use dev_portal::models::{Environment, NewApplication};
use dev_portal::session::MemorySessionStore;
use dev_portal::{ErrorKind, PortalError};
use reqwest::StatusCode;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

// ─── Envelope decoding ───────────────────────────────────────────────────────

#[tokio::test]
async fn success_false_is_a_shape_error() {
    let t = TestPortal::standard().await;
    Mock::given(method("GET"))
        .and(path("/auth/oauth2/client/client-1"))
        .respond_with(unsuccessful("Client disabled"))
        .mount(&t.server)
        .await;

    let err = t.portal.application("client-1").await.unwrap_err();
    assert!(
        matches!(&err, PortalError::InvalidResponseShape(msg) if msg == "Client disabled"),
        "unexpected error: {err:?}"
    );
    assert_eq!(err.kind(), ErrorKind::Shape);
}

#[tokio::test]
async fn success_without_data_is_a_shape_error() {
    let t = TestPortal::standard().await;
    Mock::given(method("GET"))
        .and(path("/auth/oauth2/client/client-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .mount(&t.server)
        .await;

    let err = t.portal.application("client-1").await.unwrap_err();
    assert!(matches!(err, PortalError::InvalidResponseShape(_)));
}

#[tokio::test]
async fn non_json_body_is_a_shape_error() {
    let t = TestPortal::standard().await;
    Mock::given(method("GET"))
        .and(path("/auth/oauth2/client/client-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&t.server)
        .await;

    let err = t.portal.application("client-1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Shape);
}

#[tokio::test]
async fn non_2xx_carries_status_and_server_message() {
    let t = TestPortal::standard().await;
    Mock::given(method("GET"))
        .and(path("/auth/oauth2/client/missing"))
        .respond_with(error(404, "Client not found"))
        .mount(&t.server)
        .await;

    let err = t.portal.application("missing").await.unwrap_err();
    match err {
        PortalError::RequestFailed { status, message } => {
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(message, "Client not found");
        }
        other => panic!("expected RequestFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn non_2xx_without_message_uses_status_text() {
    let t = TestPortal::standard().await;
    Mock::given(method("GET"))
        .and(path("/auth/oauth2/client/client-1"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&t.server)
        .await;

    let err = t.portal.application("client-1").await.unwrap_err();
    match err {
        PortalError::RequestFailed { status, message } => {
            assert_eq!(status, StatusCode::FORBIDDEN);
            assert_eq!(message, "Forbidden");
        }
        other => panic!("expected RequestFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn wire_records_map_to_view_models() {
    let t = TestPortal::standard().await;
    Mock::given(method("GET"))
        .and(path("/auth/oauth2/client/client-1"))
        .respond_with(ok(application_wire(9, "client-1", "Payments")))
        .mount(&t.server)
        .await;

    let app = t.portal.application("client-1").await.unwrap();
    assert_eq!(app.id, "9");
    assert_eq!(app.client_id, "client-1");
    assert_eq!(app.name, "Payments");
    assert_eq!(app.description, "No description provided");
    assert_eq!(app.client_secret, "hidden");
    assert_eq!(app.environment, Environment::Uat);
    assert_eq!(app.user_account_id, "42");
    assert!(app.created_at.is_some());
}

// ─── Retries ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn configured_reads_retry_on_server_errors() {
    let t = TestPortal::build(
        MemorySessionStore::with_raw(common::session_json("42", 1)),
        |c| c.with_read_retries(2),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/auth/oauth2/client/client-1"))
        .respond_with(ResponseTemplate::new(502))
        .expect(3)
        .mount(&t.server)
        .await;

    let err = t.portal.application("client-1").await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::BAD_GATEWAY));
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let t = TestPortal::build(
        MemorySessionStore::with_raw(common::session_json("42", 1)),
        |c| c.with_read_retries(2),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/auth/oauth2/client/client-1"))
        .respond_with(error(400, "Bad client id"))
        .expect(1)
        .mount(&t.server)
        .await;

    assert!(t.portal.application("client-1").await.is_err());
}

#[tokio::test]
async fn writes_are_never_retried() {
    let t = TestPortal::build(
        MemorySessionStore::with_raw(common::session_json("42", 1)),
        |c| c.with_read_retries(3),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/auth/oauth2/client"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&t.server)
        .await;

    let input = NewApplication {
        name: "Payments".to_string(),
        description: None,
        redirect_uri: "https://example.com/callback".to_string(),
        environment: Environment::Qa,
    };
    let mut dialog = dev_portal::disclosure::SecretDisclosure::new();
    let err = t
        .portal
        .create_application(&input, &mut dialog)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
}

// ─── Session headers and 401 ─────────────────────────────────────────────────

#[tokio::test]
async fn requests_carry_the_bearer_token() {
    let t = TestPortal::standard().await;
    Mock::given(method("GET"))
        .and(path("/auth/oauth2/client/client-1"))
        .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
        .and(header("content-type", "application/json"))
        .respond_with(ok(application_wire(9, "client-1", "Payments")))
        .expect(1)
        .mount(&t.server)
        .await;

    t.portal.application("client-1").await.unwrap();
}

#[tokio::test]
async fn anonymous_requests_omit_authorization() {
    let t = TestPortal::anonymous().await;
    Mock::given(method("GET"))
        .and(path("/opcos/active"))
        .respond_with(ok(json!([])))
        .mount(&t.server)
        .await;

    t.portal.list_countries().await.unwrap();

    let requests = t.requests().await;
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].headers.contains_key("authorization"));
}

#[tokio::test]
async fn unauthorized_response_clears_the_session() {
    let t = TestPortal::standard().await;
    Mock::given(method("GET"))
        .and(path("/auth/oauth2/client/byuser/42"))
        .respond_with(error(401, "Token expired"))
        .mount(&t.server)
        .await;

    let err = t.portal.list_applications().await.unwrap_err();
    assert!(err.is_unauthorized());
    assert!(!t.portal.session().is_authenticated());
    assert!(t.store.raw().is_none());
}

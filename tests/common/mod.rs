#![allow(dead_code)]

use std::sync::Arc;

use dev_portal::config::Config;
use dev_portal::models::ProductPairing;
use dev_portal::session::{MemorySessionStore, SessionStore};
use dev_portal::Portal;
use serde_json::{json, Value};
use wiremock::{MockServer, Request, ResponseTemplate};

pub const STANDARD_USER_ID: &str = "42";
pub const ADMIN_USER_ID: &str = "7";
pub const TOKEN: &str = "test-token-abc";

// ─── Envelopes ───────────────────────────────────────────────────────────────

pub fn ok(data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "success": true,
        "data": data,
        "resp_msg": "OK",
    }))
}

pub fn unsuccessful(message: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "success": false,
        "data": null,
        "resp_msg": message,
    }))
}

pub fn error(status: u16, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({
        "success": false,
        "resp_msg": message,
    }))
}

pub fn body_json(request: &Request) -> Value {
    serde_json::from_slice(&request.body).unwrap_or_else(|e| {
        panic!(
            "Request body is not JSON: {e}\nBody: {}",
            String::from_utf8_lossy(&request.body)
        )
    })
}

// ─── Fixtures ────────────────────────────────────────────────────────────────

pub fn session_json(user_id: &str, access_level: u8) -> String {
    json!({
        "token": TOKEN,
        "user": {
            "id": user_id,
            "name": "Test User",
            "email": "user@example.com",
            "accessLevel": access_level,
        }
    })
    .to_string()
}

pub fn application_wire(id: u64, client_id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "client_id": client_id,
        "client_secret": "should-never-surface",
        "client_name": name,
        "description": "",
        "redirect_uri": "https://example.com/callback",
        "environment": "UAT",
        "client_status": "active",
        "user_account_id": 42,
        "created_at": "2024-03-01T10:00:00Z",
    })
}

pub fn pairing_wire(record_id: u64, client_id: &str, status: &str) -> Value {
    json!({
        "record_id": record_id,
        "client_id": client_id,
        "scope_group_id": 3,
        "country_id": 1,
        "call_back_url": "https://example.com/hook",
        "assignment_status": status,
        "product_name": "KYC",
        "country_name": "Rwanda",
        "country_alpha3": "RWA",
    })
}

pub fn pairing(record_id: &str, client_id: &str, status: &str) -> ProductPairing {
    serde_json::from_value(json!({
        "recordId": record_id,
        "clientId": client_id,
        "productId": "3",
        "countryId": "1",
        "callBackUrl": "https://example.com/hook",
        "pin": null,
        "assignmentStatus": status,
        "productName": "KYC",
        "countryName": "Rwanda",
        "countryAlpha3": "RWA",
    }))
    .unwrap()
}

// ─── TestPortal ──────────────────────────────────────────────────────────────

pub struct TestPortal {
    pub server: MockServer,
    pub store: Arc<MemorySessionStore>,
    pub portal: Portal,
}

impl TestPortal {
    pub async fn anonymous() -> Self {
        Self::build(MemorySessionStore::new(), |c| c).await
    }

    pub async fn standard() -> Self {
        Self::build(
            MemorySessionStore::with_raw(session_json(STANDARD_USER_ID, 1)),
            |c| c,
        )
        .await
    }

    pub async fn admin() -> Self {
        Self::build(
            MemorySessionStore::with_raw(session_json(ADMIN_USER_ID, 2)),
            |c| c,
        )
        .await
    }

    pub async fn build(store: MemorySessionStore, configure: impl FnOnce(Config) -> Config) -> Self {
        let server = MockServer::start().await;
        let config = configure(Config::new(server.uri()).with_read_retries(0));
        let store = Arc::new(store);
        let portal = Portal::with_store(config, store.clone() as Arc<dyn SessionStore>)
            .await
            .expect("portal should build against the mock server");

        Self {
            server,
            store,
            portal,
        }
    }

    pub async fn requests(&self) -> Vec<Request> {
        self.server.received_requests().await.unwrap_or_default()
    }

    pub async fn request_count(&self) -> usize {
        self.requests().await.len()
    }
}

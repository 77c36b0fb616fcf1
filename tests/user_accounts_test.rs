mod common;

use common::{ok, TestPortal};
use dev_portal::access::{AccessLevel, Operation};
use dev_portal::models::{AccountStatus, UserAccountUpdate};
use dev_portal::{ErrorKind, PortalError};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::Mock;

#[tokio::test]
async fn admins_list_user_accounts() {
    let t = TestPortal::admin().await;
    Mock::given(method("GET"))
        .and(path("/useraccounts"))
        .respond_with(ok(json!([
            {
                "user_account_id": 5,
                "full_name": "Grace Hopper",
                "email": "grace@example.com",
                "access_level": 2,
                "status": "active",
                "created_at": "2024-01-01 09:30:00",
            },
            {
                "id": "6",
                "email": "new@example.com",
            }
        ])))
        .expect(1)
        .mount(&t.server)
        .await;

    let accounts = t.portal.list_user_accounts().await.unwrap();
    assert_eq!(accounts[0].id, "5");
    assert_eq!(accounts[0].name, "Grace Hopper");
    assert_eq!(accounts[0].access_level, AccessLevel::Admin);
    assert_eq!(accounts[0].status, AccountStatus::Active);
    assert!(accounts[0].created_at.is_some());

    assert_eq!(accounts[1].name, "new@example.com");
    assert_eq!(accounts[1].access_level, AccessLevel::Standard);
    assert_eq!(accounts[1].status, AccountStatus::New);
}

#[tokio::test]
async fn standard_users_cannot_list_accounts() {
    let t = TestPortal::standard().await;

    let err = t.portal.list_user_accounts().await.unwrap_err();
    assert!(matches!(err, PortalError::Forbidden(Operation::ListUserAccounts)));
    assert_eq!(t.request_count().await, 0);
}

#[tokio::test]
async fn update_sends_only_changed_fields() {
    let t = TestPortal::admin().await;
    Mock::given(method("PUT"))
        .and(path("/useraccounts/5"))
        .and(body_json(json!({ "status": "inactive" })))
        .respond_with(ok(json!({
            "id": 5, "email": "grace@example.com", "access_level": 1, "status": "inactive"
        })))
        .expect(1)
        .mount(&t.server)
        .await;

    let changes = UserAccountUpdate {
        status: Some(AccountStatus::Inactive),
        ..Default::default()
    };
    let updated = t.portal.update_user_account("5", &changes).await.unwrap();
    assert_eq!(updated.status, AccountStatus::Inactive);
}

#[tokio::test]
async fn empty_update_is_rejected_locally() {
    let t = TestPortal::admin().await;

    let err = t
        .portal
        .update_user_account("5", &UserAccountUpdate::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(t.request_count().await, 0);
}

#[tokio::test]
async fn create_and_delete_are_unsupported() {
    let t = TestPortal::admin().await;

    let err = t.portal.create_user_account().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unsupported);
    assert!(err.to_string().contains("signing up"));

    let err = t.portal.delete_user_account("5").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unsupported);
    assert!(err.is_local());

    assert_eq!(t.request_count().await, 0);
}

#[tokio::test]
async fn lookups_by_status_and_email() {
    let t = TestPortal::admin().await;
    Mock::given(method("GET"))
        .and(path("/useraccounts/bystatus/new"))
        .respond_with(ok(json!([{ "id": 6, "email": "new@example.com", "status": "new" }])))
        .expect(1)
        .mount(&t.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/useraccounts/byemail/grace@example.com"))
        .respond_with(ok(json!({ "id": 5, "email": "grace@example.com" })))
        .expect(1)
        .mount(&t.server)
        .await;

    let accounts = t.portal.user_accounts();
    let pending = accounts.by_status(AccountStatus::New).await.unwrap();
    assert_eq!(pending.len(), 1);

    let grace = accounts.by_email(" grace@example.com ").await.unwrap();
    assert_eq!(grace.id, "5");
}

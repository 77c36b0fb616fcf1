use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use dev_portal::cache::{QueryCache, QueryKey, QueryScope, Scope};
use dev_portal::disclosure::{
    Disclosure, Provenance, Secret, SecretDisclosure, CLIENT_ID, CLIENT_SECRET,
};
use dev_portal::mutation::{ActionKey, MutationOrchestrator};
use dev_portal::resources::FailurePolicy;
use dev_portal::PortalError;
use reqwest::StatusCode;

fn failure() -> PortalError {
    PortalError::RequestFailed {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: "boom".to_string(),
    }
}

// ─── Disclosure state machine ────────────────────────────────────────────────

#[test]
fn disclosure_lifecycle() {
    let mut dialog = SecretDisclosure::new();
    assert!(dialog.is_idle());

    dialog.begin().unwrap();
    assert!(dialog.is_requesting());
    assert!(matches!(dialog.begin(), Err(PortalError::DisclosureBusy)));

    dialog.disclose(
        Disclosure::issued("client-1").with_field(CLIENT_SECRET, Secret::new("value")),
    );
    assert!(matches!(dialog.begin(), Err(PortalError::DisclosureBusy)));
    assert_eq!(
        dialog.current().unwrap().field(CLIENT_SECRET).unwrap().expose(),
        "value"
    );

    dialog.close();
    assert!(dialog.is_idle());
    assert!(dialog.current().is_none());
}

#[test]
fn fail_only_resets_a_pending_request() {
    let mut dialog = SecretDisclosure::new();
    dialog.begin().unwrap();
    dialog.fail();
    assert!(dialog.is_idle());

    dialog.begin().unwrap();
    dialog.disclose(Disclosure::issued("client-1"));
    dialog.fail();
    assert!(dialog.current().is_some());
}

#[test]
fn copy_acknowledgement_is_per_field_and_expires() {
    let mut disclosure = Disclosure::issued("client-1")
        .with_field(CLIENT_ID, Secret::new("client-1"))
        .with_field(CLIENT_SECRET, Secret::new("value"));
    let now = Instant::now();

    assert_eq!(disclosure.copy(CLIENT_ID, now), Some("client-1"));
    assert!(disclosure.is_copied(CLIENT_ID, now + Duration::from_millis(1999)));
    assert!(!disclosure.is_copied(CLIENT_ID, now + Duration::from_secs(2)));
    assert!(!disclosure.is_copied(CLIENT_SECRET, now));
    assert_eq!(disclosure.copy("unknown", now), None);
}

#[test]
fn placeholders_are_marked_and_unique() {
    let a = Disclosure::placeholder("client-1");
    let b = Disclosure::placeholder("client-1");

    assert_eq!(a.provenance, Provenance::Placeholder);
    assert!(!a.is_authoritative());
    assert_ne!(
        a.field(CLIENT_SECRET).unwrap().expose(),
        b.field(CLIENT_SECRET).unwrap().expose()
    );
}

#[test]
fn secrets_are_redacted_in_debug_output() {
    let secret = Secret::new("top-secret");
    assert_eq!(format!("{secret:?}"), "Secret(***)");
}

// ─── Query cache ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn cache_reads_through_once() {
    let cache = QueryCache::new();
    let key = QueryKey::Countries { scope: Scope::All };
    let counter = AtomicUsize::new(0);
    let calls = &counter;

    let fetch = move || async move {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec!["RW".to_string()])
    };
    let first: Vec<String> = cache.get_or_fetch(key.clone(), fetch).await.unwrap();
    let second: Vec<String> = cache.get_or_fetch(key.clone(), fetch).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert!(cache.fetched_at(&key).await.is_some());
}

#[tokio::test]
async fn failed_fetch_is_not_cached() {
    let cache = QueryCache::new();
    let key = QueryKey::UserAccounts;

    let result: Result<Vec<String>, _> = cache
        .get_or_fetch(key.clone(), || async { Err(failure()) })
        .await;
    assert!(result.is_err());
    assert!(!cache.contains(&key).await);
}

#[tokio::test]
async fn invalidation_respects_scope() {
    let cache = QueryCache::new();
    let keys = [
        QueryKey::Applications { user_id: None },
        QueryKey::Application { client_id: "a".to_string() },
        QueryKey::AppKeys { client_id: "b".to_string() },
        QueryKey::Pairings { client_id: "a".to_string() },
        QueryKey::Pairings { client_id: "b".to_string() },
        QueryKey::Products { scope: Scope::Active },
    ];
    for key in &keys {
        cache
            .get_or_fetch(key.clone(), || async { Ok(1u32) })
            .await
            .unwrap();
    }

    assert_eq!(cache.invalidate(&QueryScope::Pairings("a".to_string())).await, 1);
    assert!(cache.contains(&keys[4]).await);

    // An application write drops its own entries and every listing.
    assert_eq!(cache.invalidate(&QueryScope::Application("a".to_string())).await, 2);
    assert!(cache.contains(&keys[2]).await);

    assert_eq!(cache.invalidate(&QueryScope::Everything).await, 3);
}

// ─── Mutation orchestration ──────────────────────────────────────────────────

#[tokio::test]
async fn one_mutation_in_flight_per_action() {
    let orchestrator = MutationOrchestrator::new(QueryCache::new());
    let key = ActionKey::on("delete-application", "9");
    let (release, wait) = tokio::sync::oneshot::channel::<()>();

    let background = {
        let orchestrator = orchestrator.clone();
        let key = key.clone();
        tokio::spawn(async move {
            let scopes = vec![QueryScope::Applications];
            orchestrator
                .run(key, &scopes, async move {
                    wait.await.ok();
                    Ok::<_, PortalError>(1)
                })
                .await
        })
    };

    while !orchestrator.is_pending(&key) {
        tokio::task::yield_now().await;
    }

    let duplicate = orchestrator
        .run(key.clone(), &[], async { Ok::<_, PortalError>(2) })
        .await;
    assert!(matches!(duplicate, Err(PortalError::MutationPending(ref k)) if *k == key));

    // A different target is a different control.
    let other = orchestrator
        .run(ActionKey::on("delete-application", "10"), &[], async {
            Ok::<_, PortalError>(3)
        })
        .await;
    assert_eq!(other.unwrap(), 3);

    release.send(()).unwrap();
    assert_eq!(background.await.unwrap().unwrap(), 1);
    assert!(!orchestrator.is_pending(&key));
}

#[tokio::test]
async fn failed_mutation_keeps_the_cache_and_releases_the_control() {
    let cache = QueryCache::new();
    let orchestrator = MutationOrchestrator::new(cache.clone());
    let key = QueryKey::Applications { user_id: Some("42".to_string()) };
    cache
        .get_or_fetch(key.clone(), || async { Ok(vec!["app".to_string()]) })
        .await
        .unwrap();

    let action = ActionKey::on("update-application", "1");
    let result = orchestrator
        .run(action.clone(), &[QueryScope::Applications], async {
            Err::<(), _>(failure())
        })
        .await;

    assert!(result.is_err());
    assert!(cache.contains(&key).await);
    assert!(!orchestrator.is_pending(&action));

    orchestrator
        .run(action, &[QueryScope::Applications], async { Ok::<_, PortalError>(()) })
        .await
        .unwrap();
    assert!(!cache.contains(&key).await);
}

#[test]
fn action_keys_display_their_target() {
    assert_eq!(
        ActionKey::on("rotate-secret", "client-1").to_string(),
        "rotate-secret(client-1)"
    );
    assert_eq!(ActionKey::new("create-country").to_string(), "create-country");
}

// ─── Failure policy ──────────────────────────────────────────────────────────

#[test]
fn degrade_substitutes_only_for_network_and_shape_errors() {
    let policy = FailurePolicy::degrade("test.list");

    let network = policy.apply(Err(failure()), || vec![1]);
    assert_eq!(network.unwrap(), vec![1]);

    let shape = policy.apply(
        Err(PortalError::InvalidResponseShape("x".to_string())),
        || vec![2],
    );
    assert_eq!(shape.unwrap(), vec![2]);

    let local = policy.apply(
        Err::<Vec<i32>, _>(PortalError::validation("name", "required")),
        || vec![3],
    );
    assert!(matches!(local, Err(PortalError::Validation { .. })));

    assert_eq!(policy.apply(Ok(vec![4]), Vec::new).unwrap(), vec![4]);
}

#[test]
fn propagate_passes_errors_through() {
    let policy = FailurePolicy::propagate("test.create");
    let result = policy.apply(Err::<u8, _>(failure()), || 0);
    assert!(matches!(result, Err(PortalError::RequestFailed { .. })));
}

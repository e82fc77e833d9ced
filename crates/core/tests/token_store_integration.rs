//! Integration tests for the token store
//!
//! Covers the fresh path, buffered refresh, single-flight refresh under
//! concurrency and the delete-on-rejection policy.

mod support;

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use hubsync_domain::{ConnectionStatus, ErrorKind, HubSyncError};
use support::providers::grant;
use support::{Harness, PORTAL, USER};

/// Validates that a token outside the refresh buffer is served from storage.
///
/// # Test Steps
/// 1. Store a token expiring in one hour
/// 2. Request it
/// 3. Verify the stored token is returned and the provider was never called
#[tokio::test(flavor = "multi_thread")]
async fn test_fresh_token_makes_no_network_calls() {
    let h = Harness::new();
    h.connect(Duration::hours(1));

    let token = h.token_store.get_access_token(PORTAL).await.unwrap();

    assert_eq!(token, "access-1");
    assert_eq!(h.provider.refresh_calls(), 0);
}

/// Validates that a token inside the 60 s buffer is refreshed exactly once.
///
/// # Test Steps
/// 1. Store a token expiring in 30 seconds
/// 2. Request it
/// 3. Verify the refreshed token is returned and persisted
/// 4. Verify exactly one provider call was made
#[tokio::test(flavor = "multi_thread")]
async fn test_stale_token_refreshes_once_and_persists() {
    let h = Harness::new();
    h.connect(Duration::seconds(30));

    let token = h.token_store.get_access_token(PORTAL).await.unwrap();

    assert_eq!(token, "access-2");
    assert_eq!(h.provider.refresh_calls(), 1);
    let stored = h.tokens_repo.snapshot(PORTAL).unwrap();
    assert_eq!(stored.access_token, "access-2");
    assert_eq!(stored.refresh_token.as_deref(), Some("refresh-2"));
    assert_eq!(stored.expires_at, h.now() + Duration::seconds(1800));

    // Second call is served from the refreshed record.
    assert_eq!(h.token_store.get_access_token(PORTAL).await.unwrap(), "access-2");
    assert_eq!(h.provider.refresh_calls(), 1);
}

/// Validates single-flight refresh.
///
/// # Test Steps
/// 1. Store an expired token and slow the provider down
/// 2. Request the token from 16 concurrent tasks
/// 3. Verify every task got the new token
/// 4. Verify the provider saw exactly one refresh
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_refresh_is_single_flight() {
    let h = Harness::new();
    h.connect(Duration::seconds(-10));
    h.provider.set_delay(StdDuration::from_millis(50));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let store = Arc::clone(&h.token_store);
            tokio::spawn(async move { store.get_access_token(PORTAL).await })
        })
        .collect();

    for result in futures::future::join_all(handles).await {
        assert_eq!(result.unwrap().unwrap(), "access-2");
    }
    assert_eq!(h.provider.refresh_calls(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_refresh_keeps_refresh_token_when_not_rotated() {
    let h = Harness::new();
    h.connect(Duration::hours(1));
    h.provider.set_refresh_result(Ok(grant("access-3", None, 600)));

    let token = h.token_store.refresh(PORTAL).await.unwrap();

    assert_eq!(token, "access-3");
    let stored = h.tokens_repo.snapshot(PORTAL).unwrap();
    assert_eq!(stored.refresh_token.as_deref(), Some("refresh-1"));
}

/// Validates that a rejected refresh disconnects the portal.
///
/// # Test Steps
/// 1. Store an expired token; script the provider to reject the refresh
/// 2. Request the token
/// 3. Verify a `Refresh` error that requires reconnecting
/// 4. Verify the record is gone and status reads disconnected
#[tokio::test(flavor = "multi_thread")]
async fn test_rejected_refresh_deletes_credentials() {
    let h = Harness::new();
    h.connect(Duration::seconds(-1));
    h.provider.set_refresh_result(Err(HubSyncError::Refresh("invalid_grant".to_string())));

    let err = h.token_store.get_access_token(PORTAL).await.unwrap_err();

    assert!(matches!(err, HubSyncError::Refresh(_)));
    assert_eq!(err.kind(), ErrorKind::RefreshFailed);
    assert!(h.tokens_repo.snapshot(PORTAL).is_none());
    assert_eq!(h.token_store.status(PORTAL).await.unwrap(), ConnectionStatus::Disconnected);

    let err = h.token_store.get_access_token(PORTAL).await.unwrap_err();
    assert!(matches!(err, HubSyncError::TokenFetch(_)));
}

/// Validates that transient provider failures keep credentials.
#[tokio::test(flavor = "multi_thread")]
async fn test_provider_outage_keeps_credentials() {
    let h = Harness::new();
    h.connect(Duration::seconds(-1));
    h.provider
        .set_refresh_result(Err(HubSyncError::ProviderUnavailable("502 Bad Gateway".to_string())));

    let err = h.token_store.get_access_token(PORTAL).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ProviderUnavailable);
    assert!(h.tokens_repo.snapshot(PORTAL).is_some());
}

/// Validates that an unusable grant lifetime is an error, not a crash.
///
/// # Test Steps
/// 1. Store an expired token; script refresh grants with absurd `expires_in`
/// 2. Request the token
/// 3. Verify a `ProviderUnavailable` error and the stored record is unchanged
#[tokio::test(flavor = "multi_thread")]
async fn test_out_of_range_lifetime_is_rejected() {
    let h = Harness::new();
    let before = h.connect(Duration::seconds(-10));

    for expires_in in [i64::MAX, -600] {
        h.provider.set_refresh_result(Ok(grant("access-x", Some("refresh-x"), expires_in)));

        let err = h.token_store.get_access_token(PORTAL).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ProviderUnavailable);
        assert_eq!(h.tokens_repo.snapshot(PORTAL).unwrap(), before);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_missing_refresh_token_disconnects() {
    let h = Harness::new();
    let mut record = h.connect(Duration::seconds(-1));
    record.refresh_token = None;
    h.tokens_repo.insert(record);

    let err = h.token_store.get_access_token(PORTAL).await.unwrap_err();

    assert!(matches!(err, HubSyncError::Refresh(_)));
    assert_eq!(h.provider.refresh_calls(), 0);
    assert!(h.tokens_repo.snapshot(PORTAL).is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unknown_portal_is_not_connected() {
    let h = Harness::new();

    let err = h.token_store.get_access_token("404").await.unwrap_err();

    assert!(matches!(err, HubSyncError::TokenFetch(_)));
    assert_eq!(err.kind(), ErrorKind::NotConnected);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_revoke_and_user_lookup() {
    let h = Harness::new();
    h.connect(Duration::hours(1));

    assert_eq!(h.token_store.portal_for_user(USER).await.unwrap().as_deref(), Some(PORTAL));
    assert_eq!(h.token_store.status(PORTAL).await.unwrap(), ConnectionStatus::Connected);
    assert_eq!(h.token_store.connected_portals().await.unwrap(), vec![PORTAL.to_string()]);

    assert!(h.token_store.revoke(PORTAL).await.unwrap());
    assert!(!h.token_store.revoke(PORTAL).await.unwrap());
    assert_eq!(h.token_store.portal_for_user(USER).await.unwrap(), None);
}

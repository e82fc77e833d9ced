//! PostgresStore against a live database
//!
//! Requires `HUBSYNC_TEST_DATABASE_URL`; run with `cargo test -- --ignored`.

use chrono::{Duration, Utc};
use hubsync_core::{
    ContactCacheRepository, OAuthStateRepository, PropertyChangeRepository, SyncCursorRepository,
};
use hubsync_domain::{
    ContactRecord, DatabaseConfig, OAuthStateRecord, PropertyChangeRecord, SyncCursor,
};
use hubsync_infra::PostgresStore;
use serde_json::{json, Map, Value};

async fn store() -> PostgresStore {
    let url = std::env::var("HUBSYNC_TEST_DATABASE_URL")
        .expect("HUBSYNC_TEST_DATABASE_URL must be set for ignored tests");
    let store = PostgresStore::connect(&DatabaseConfig { url: Some(url), tls: false })
        .await
        .expect("connect");
    store.migrate().await.expect("migrate");
    store
}

/// Keeps runs against a shared database from seeing each other's rows.
fn unique_portal() -> String {
    format!("test-{}", Utc::now().timestamp_nanos_opt().unwrap_or_default())
}

fn properties(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

#[tokio::test]
#[ignore = "requires HUBSYNC_TEST_DATABASE_URL"]
async fn contact_merge_and_full_text_search() {
    let store = store().await;
    let portal = unique_portal();
    let now = Utc::now();

    let ada = ContactRecord {
        portal_id: portal.clone(),
        id: "1".into(),
        properties: properties(json!({ "firstname": "Ada", "email": "ada@example.com" })),
        updated_at: now,
    };
    assert_eq!(store.upsert_many(vec![ada]).await.unwrap(), 1);

    let stale = ContactRecord {
        portal_id: portal.clone(),
        id: "1".into(),
        properties: properties(json!({ "firstname": "Old" })),
        updated_at: now - Duration::hours(1),
    };
    assert_eq!(store.upsert_many(vec![stale]).await.unwrap(), 0);

    let hits = store.search(&portal, "ad", 10).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].properties["firstname"], "Ada");
}

#[tokio::test]
#[ignore = "requires HUBSYNC_TEST_DATABASE_URL"]
async fn property_change_updates_cached_contact() {
    let store = store().await;
    let portal = unique_portal();
    let now = Utc::now();

    store
        .upsert_change(PropertyChangeRecord {
            portal_id: portal.clone(),
            hubspot_id: "7".into(),
            property_name: "email".into(),
            property_value: "new@example.com".into(),
            change_source: "CRM_UI".into(),
            occurred_at: now,
        })
        .await
        .unwrap();

    let contact =
        ContactCacheRepository::get(&store, &portal, "7").await.unwrap().unwrap();
    assert_eq!(contact.properties["email"], "new@example.com");
}

#[tokio::test]
#[ignore = "requires HUBSYNC_TEST_DATABASE_URL"]
async fn state_consume_is_single_use() {
    let store = store().await;
    let value = unique_portal();
    let now = Utc::now();
    store
        .insert(OAuthStateRecord {
            state: value.clone(),
            user_id: "user-1".into(),
            expires_at: now + Duration::minutes(10),
            created_at: now,
        })
        .await
        .unwrap();

    assert!(store.consume(&value).await.unwrap().is_some());
    assert!(store.consume(&value).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires HUBSYNC_TEST_DATABASE_URL"]
async fn cursor_never_moves_backwards() {
    let store = store().await;
    let portal = unique_portal();
    let now = Utc::now();
    let cursor = |hs_timestamp| SyncCursor {
        portal_id: portal.clone(),
        object_type: "contacts".into(),
        hs_timestamp,
    };

    store.advance(cursor(now)).await.unwrap();
    let saved = store.advance(cursor(now - Duration::hours(1))).await.unwrap();

    assert_eq!(saved.hs_timestamp.timestamp_micros(), now.timestamp_micros());
    let fetched = SyncCursorRepository::get(&store, &portal, "contacts").await.unwrap().unwrap();
    assert_eq!(fetched.hs_timestamp.timestamp_micros(), now.timestamp_micros());
}

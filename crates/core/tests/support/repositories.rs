//! In-memory port implementations for tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hubsync_core::{
    ContactCacheRepository, OAuthStateRepository, PropertyChangeRepository, SyncCursorRepository,
    TokenRepository,
};
use hubsync_domain::{
    ContactRecord, HubSyncError, OAuthStateRecord, PropertyChangeRecord, Result as DomainResult,
    SyncCursor, TokenRecord,
};
use parking_lot::Mutex;
use serde_json::{Map, Value};

#[derive(Default)]
pub struct InMemoryTokenRepository {
    records: Mutex<HashMap<String, TokenRecord>>,
}

impl InMemoryTokenRepository {
    pub fn insert(&self, record: TokenRecord) {
        self.records.lock().insert(record.portal_id.clone(), record);
    }

    pub fn snapshot(&self, portal_id: &str) -> Option<TokenRecord> {
        self.records.lock().get(portal_id).cloned()
    }
}

#[async_trait]
impl TokenRepository for InMemoryTokenRepository {
    async fn get(&self, portal_id: &str) -> DomainResult<Option<TokenRecord>> {
        Ok(self.snapshot(portal_id))
    }

    async fn upsert(&self, record: TokenRecord) -> DomainResult<()> {
        self.insert(record);
        Ok(())
    }

    async fn delete(&self, portal_id: &str) -> DomainResult<bool> {
        Ok(self.records.lock().remove(portal_id).is_some())
    }

    async fn find_by_user(&self, user_id: &str) -> DomainResult<Option<TokenRecord>> {
        Ok(self
            .records
            .lock()
            .values()
            .filter(|record| record.user_id == user_id)
            .max_by_key(|record| record.updated_at)
            .cloned())
    }

    async fn list_portals(&self) -> DomainResult<Vec<String>> {
        let mut portals: Vec<String> = self.records.lock().keys().cloned().collect();
        portals.sort();
        Ok(portals)
    }
}

#[derive(Default)]
pub struct InMemoryStateRepository {
    records: Mutex<HashMap<String, OAuthStateRecord>>,
}

impl InMemoryStateRepository {
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn contains(&self, state: &str) -> bool {
        self.records.lock().contains_key(state)
    }
}

#[async_trait]
impl OAuthStateRepository for InMemoryStateRepository {
    async fn insert(&self, record: OAuthStateRecord) -> DomainResult<()> {
        self.records.lock().insert(record.state.clone(), record);
        Ok(())
    }

    async fn consume(&self, state: &str) -> DomainResult<Option<OAuthStateRecord>> {
        Ok(self.records.lock().remove(state))
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> DomainResult<usize> {
        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|_, record| !record.is_expired(now));
        Ok(before - records.len())
    }
}

/// Contact cache plus webhook projection, sharing one contact table.
#[derive(Default)]
pub struct InMemoryContactCache {
    contacts: Mutex<HashMap<(String, String), ContactRecord>>,
    changes: Mutex<HashMap<(String, String, String), PropertyChangeRecord>>,
    fail_writes: AtomicBool,
}

impl InMemoryContactCache {
    pub fn seed(&self, records: impl IntoIterator<Item = ContactRecord>) {
        let mut contacts = self.contacts.lock();
        for record in records {
            contacts.insert((record.portal_id.clone(), record.id.clone()), record);
        }
    }

    pub fn len(&self) -> usize {
        self.contacts.lock().len()
    }

    pub fn contact(&self, portal_id: &str, id: &str) -> Option<ContactRecord> {
        self.contacts.lock().get(&(portal_id.to_string(), id.to_string())).cloned()
    }

    pub fn changes(&self) -> Vec<PropertyChangeRecord> {
        self.changes.lock().values().cloned().collect()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> DomainResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(HubSyncError::Database("write refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ContactCacheRepository for InMemoryContactCache {
    async fn search(
        &self,
        portal_id: &str,
        query: &str,
        limit: usize,
    ) -> DomainResult<Vec<ContactRecord>> {
        let mut hits: Vec<ContactRecord> = self
            .contacts
            .lock()
            .values()
            .filter(|record| record.portal_id == portal_id && record.matches(query))
            .cloned()
            .collect();
        hits.sort_by(|a, b| a.id.cmp(&b.id));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn upsert_many(&self, records: Vec<ContactRecord>) -> DomainResult<usize> {
        self.check_writable()?;
        let mut contacts = self.contacts.lock();
        let mut written = 0;
        for record in records {
            let key = (record.portal_id.clone(), record.id.clone());
            match contacts.get_mut(&key) {
                Some(existing) => {
                    if existing.merge_from(record) {
                        written += 1;
                    }
                }
                None => {
                    contacts.insert(key, record);
                    written += 1;
                }
            }
        }
        Ok(written)
    }

    async fn get(&self, portal_id: &str, id: &str) -> DomainResult<Option<ContactRecord>> {
        Ok(self.contact(portal_id, id))
    }
}

#[async_trait]
impl PropertyChangeRepository for InMemoryContactCache {
    async fn upsert_change(&self, change: PropertyChangeRecord) -> DomainResult<()> {
        self.check_writable()?;
        let value = Value::String(change.property_value.clone());
        let key = (change.portal_id.clone(), change.hubspot_id.clone());
        {
            let mut contacts = self.contacts.lock();
            match contacts.get_mut(&key) {
                Some(existing) => {
                    existing.apply_property(&change.property_name, value, change.occurred_at);
                }
                None => {
                    let mut properties = Map::new();
                    properties.insert(change.property_name.clone(), value);
                    contacts.insert(
                        key,
                        ContactRecord::new(
                            &change.portal_id,
                            &change.hubspot_id,
                            properties,
                            change.occurred_at,
                        ),
                    );
                }
            }
        }
        self.changes.lock().insert(
            (change.portal_id.clone(), change.hubspot_id.clone(), change.property_name.clone()),
            change,
        );
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryCursorRepository {
    cursors: Mutex<HashMap<(String, String), SyncCursor>>,
}

impl InMemoryCursorRepository {
    pub fn insert(&self, cursor: SyncCursor) {
        self.cursors
            .lock()
            .insert((cursor.portal_id.clone(), cursor.object_type.clone()), cursor);
    }
}

#[async_trait]
impl SyncCursorRepository for InMemoryCursorRepository {
    async fn get(&self, portal_id: &str, object_type: &str) -> DomainResult<Option<SyncCursor>> {
        Ok(self.cursors.lock().get(&(portal_id.to_string(), object_type.to_string())).cloned())
    }

    async fn advance(&self, cursor: SyncCursor) -> DomainResult<SyncCursor> {
        let mut cursors = self.cursors.lock();
        let key = (cursor.portal_id.clone(), cursor.object_type.clone());
        let stored = cursors.entry(key).or_insert_with(|| cursor.clone());
        stored.advance(cursor.hs_timestamp);
        Ok(stored.clone())
    }
}

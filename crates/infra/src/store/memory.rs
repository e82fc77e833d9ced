//! Process-local store
//!
//! Backs every repository port with `DashMap`s. Used when no database URL is
//! configured and by the API tests. Nothing survives a restart.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use hubsync_core::{
    ContactCacheRepository, OAuthStateRepository, PropertyChangeRepository, SyncCursorRepository,
    TokenRepository,
};
use hubsync_domain::{
    ContactRecord, OAuthStateRecord, PropertyChangeRecord, Result, SyncCursor, TokenRecord,
};
use serde_json::{Map, Value};

type ContactKey = (String, String);
type ChangeKey = (String, String, String);

/// In-process store implementing every repository port
#[derive(Default)]
pub struct MemoryStore {
    tokens: DashMap<String, TokenRecord>,
    states: DashMap<String, OAuthStateRecord>,
    contacts: DashMap<ContactKey, ContactRecord>,
    changes: DashMap<ChangeKey, PropertyChangeRecord>,
    cursors: DashMap<ContactKey, SyncCursor>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached contacts across portals
    pub fn contact_count(&self) -> usize {
        self.contacts.len()
    }

    /// Number of OAuth states not yet consumed
    pub fn pending_states(&self) -> usize {
        self.states.len()
    }

    fn merge_contact(&self, record: ContactRecord) -> bool {
        match self.contacts.entry((record.portal_id.clone(), record.id.clone())) {
            Entry::Occupied(mut existing) => existing.get_mut().merge_from(record),
            Entry::Vacant(slot) => {
                slot.insert(record);
                true
            }
        }
    }
}

#[async_trait]
impl TokenRepository for MemoryStore {
    async fn get(&self, portal_id: &str) -> Result<Option<TokenRecord>> {
        Ok(self.tokens.get(portal_id).map(|entry| entry.value().clone()))
    }

    async fn upsert(&self, record: TokenRecord) -> Result<()> {
        self.tokens.insert(record.portal_id.clone(), record);
        Ok(())
    }

    async fn delete(&self, portal_id: &str) -> Result<bool> {
        Ok(self.tokens.remove(portal_id).is_some())
    }

    async fn find_by_user(&self, user_id: &str) -> Result<Option<TokenRecord>> {
        Ok(self
            .tokens
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .max_by_key(|entry| entry.updated_at)
            .map(|entry| entry.value().clone()))
    }

    async fn list_portals(&self) -> Result<Vec<String>> {
        let mut portals: Vec<String> = self.tokens.iter().map(|entry| entry.key().clone()).collect();
        portals.sort();
        Ok(portals)
    }
}

#[async_trait]
impl OAuthStateRepository for MemoryStore {
    async fn insert(&self, record: OAuthStateRecord) -> Result<()> {
        self.states.insert(record.state.clone(), record);
        Ok(())
    }

    async fn consume(&self, state: &str) -> Result<Option<OAuthStateRecord>> {
        Ok(self.states.remove(state).map(|(_, record)| record))
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let before = self.states.len();
        self.states.retain(|_, record| !record.is_expired(now));
        Ok(before.saturating_sub(self.states.len()))
    }
}

#[async_trait]
impl ContactCacheRepository for MemoryStore {
    async fn search(&self, portal_id: &str, query: &str, limit: usize) -> Result<Vec<ContactRecord>> {
        let mut hits: Vec<(u32, ContactRecord)> = self
            .contacts
            .iter()
            .filter(|entry| entry.portal_id == portal_id && entry.matches(query))
            .map(|entry| (entry.relevance(query), entry.value().clone()))
            .collect();
        // Best match first, then most recently updated.
        hits.sort_by(|(rank_a, a), (rank_b, b)| {
            rank_b
                .cmp(rank_a)
                .then_with(|| b.updated_at.cmp(&a.updated_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(hits.into_iter().take(limit).map(|(_, record)| record).collect())
    }

    async fn upsert_many(&self, records: Vec<ContactRecord>) -> Result<usize> {
        Ok(records.into_iter().map(|record| self.merge_contact(record)).filter(|written| *written).count())
    }

    async fn get(&self, portal_id: &str, id: &str) -> Result<Option<ContactRecord>> {
        Ok(self
            .contacts
            .get(&(portal_id.to_string(), id.to_string()))
            .map(|entry| entry.value().clone()))
    }
}

#[async_trait]
impl PropertyChangeRepository for MemoryStore {
    async fn upsert_change(&self, change: PropertyChangeRecord) -> Result<()> {
        let mut properties = Map::new();
        properties
            .insert(change.property_name.clone(), Value::String(change.property_value.clone()));
        self.merge_contact(ContactRecord::new(
            &change.portal_id,
            &change.hubspot_id,
            properties,
            change.occurred_at,
        ));

        let key =
            (change.portal_id.clone(), change.hubspot_id.clone(), change.property_name.clone());
        match self.changes.entry(key) {
            Entry::Occupied(mut existing) => {
                if change.occurred_at >= existing.get().occurred_at {
                    existing.insert(change);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(change);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl SyncCursorRepository for MemoryStore {
    async fn get(&self, portal_id: &str, object_type: &str) -> Result<Option<SyncCursor>> {
        Ok(self
            .cursors
            .get(&(portal_id.to_string(), object_type.to_string()))
            .map(|entry| entry.value().clone()))
    }

    async fn advance(&self, cursor: SyncCursor) -> Result<SyncCursor> {
        let mut stored = self
            .cursors
            .entry((cursor.portal_id.clone(), cursor.object_type.clone()))
            .or_insert_with(|| cursor.clone());
        stored.advance(cursor.hs_timestamp);
        Ok(stored.clone())
    }
}

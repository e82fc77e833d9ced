//! Postgres-backed repositories
//!
//! One shared `tokio_postgres::Client` behind an async mutex. Every
//! last-write-wins rule is enforced in SQL (`ON CONFLICT ... WHERE`), so
//! concurrent writers from several processes cannot regress a row.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hubsync_core::{
    ContactCacheRepository, OAuthStateRepository, PropertyChangeRepository, SyncCursorRepository,
    TokenRepository,
};
use hubsync_domain::{
    ContactRecord, DatabaseConfig, HubSyncError, OAuthStateRecord, PropertyChangeRecord, Result,
    SyncCursor, TokenRecord,
};
use postgres_native_tls::MakeTlsConnector;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tokio_postgres::{Client, NoTls, Row};
use tracing::{error, info, instrument};

use crate::errors::into_domain;

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS hubspot_tokens (
    portal_id     TEXT PRIMARY KEY,
    user_id       TEXT NOT NULL,
    access_token  TEXT NOT NULL,
    refresh_token TEXT,
    expires_at    TIMESTAMPTZ NOT NULL,
    scope         TEXT[] NOT NULL DEFAULT '{}',
    updated_at    TIMESTAMPTZ NOT NULL
);
CREATE INDEX IF NOT EXISTS hubspot_tokens_user_idx
    ON hubspot_tokens (user_id, updated_at DESC);

CREATE TABLE IF NOT EXISTS hubspot_oauth_states (
    state      TEXT PRIMARY KEY,
    user_id    TEXT NOT NULL,
    expires_at TIMESTAMPTZ NOT NULL,
    created_at TIMESTAMPTZ NOT NULL
);
CREATE INDEX IF NOT EXISTS hubspot_oauth_states_expiry_idx
    ON hubspot_oauth_states (expires_at);

CREATE TABLE IF NOT EXISTS hubspot_contacts_cache (
    portal_id     TEXT NOT NULL,
    id            TEXT NOT NULL,
    properties    JSONB NOT NULL DEFAULT '{}'::jsonb,
    updated_at    TIMESTAMPTZ NOT NULL,
    search_vector TSVECTOR GENERATED ALWAYS AS (
        to_tsvector('simple'::regconfig,
            coalesce(properties->>'firstname', '') || ' ' ||
            coalesce(properties->>'lastname', '') || ' ' ||
            coalesce(properties->>'email', '') || ' ' ||
            coalesce(properties->>'company', ''))
    ) STORED,
    PRIMARY KEY (portal_id, id)
);
CREATE INDEX IF NOT EXISTS hubspot_contacts_cache_search_idx
    ON hubspot_contacts_cache USING GIN (search_vector);

CREATE TABLE IF NOT EXISTS hubspot_contact_property_changes (
    portal_id      TEXT NOT NULL,
    hubspot_id     TEXT NOT NULL,
    property_name  TEXT NOT NULL,
    property_value TEXT NOT NULL,
    change_source  TEXT NOT NULL,
    occurred_at    TIMESTAMPTZ NOT NULL,
    PRIMARY KEY (portal_id, hubspot_id, property_name)
);

CREATE TABLE IF NOT EXISTS hubspot_sync_cursors (
    portal_id    TEXT NOT NULL,
    object_type  TEXT NOT NULL,
    hs_timestamp TIMESTAMPTZ NOT NULL,
    PRIMARY KEY (portal_id, object_type)
);
";

const MERGE_CONTACT: &str = "
INSERT INTO hubspot_contacts_cache (portal_id, id, properties, updated_at)
VALUES ($1, $2, $3, $4)
ON CONFLICT (portal_id, id) DO UPDATE
    SET properties = hubspot_contacts_cache.properties || excluded.properties,
        updated_at = excluded.updated_at
    WHERE excluded.updated_at >= hubspot_contacts_cache.updated_at";

#[derive(Clone)]
pub struct PostgresStore {
    client: Arc<Mutex<Client>>,
}

impl PostgresStore {
    /// Connect using `config.url`, with TLS when `config.tls` is set.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| HubSyncError::Config("database.url is not set".into()))?;

        let client = if config.tls {
            let connector = native_tls::TlsConnector::builder().build().map_err(into_domain)?;
            let (client, connection) = tokio_postgres::connect(url, MakeTlsConnector::new(connector))
                .await
                .map_err(into_domain)?;
            tokio::spawn(async move {
                if let Err(err) = connection.await {
                    error!(reason = %err, "postgres connection error");
                }
            });
            client
        } else {
            let (client, connection) =
                tokio_postgres::connect(url, NoTls).await.map_err(into_domain)?;
            tokio::spawn(async move {
                if let Err(err) = connection.await {
                    error!(reason = %err, "postgres connection error");
                }
            });
            client
        };

        info!(tls = config.tls, "connected to postgres");
        Ok(Self { client: Arc::new(Mutex::new(client)) })
    }

    /// Create tables and indexes when missing.
    pub async fn migrate(&self) -> Result<()> {
        self.client.lock().await.batch_execute(SCHEMA).await.map_err(into_domain)?;
        info!("database schema ready");
        Ok(())
    }
}

/// Prefix query over the sanitized terms, e.g. `ada:* & love:*`.
fn prefix_tsquery(query: &str) -> Option<String> {
    let terms: Vec<String> = query
        .split_whitespace()
        .map(|term| {
            term.chars()
                .filter(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '_'))
                .collect::<String>()
                .to_lowercase()
        })
        .filter(|term| !term.is_empty())
        .map(|term| format!("{term}:*"))
        .collect();

    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" & "))
    }
}

fn properties_from(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn token_from_row(row: &Row) -> std::result::Result<TokenRecord, tokio_postgres::Error> {
    let scope: Vec<String> = row.try_get("scope")?;
    Ok(TokenRecord {
        portal_id: row.try_get("portal_id")?,
        user_id: row.try_get("user_id")?,
        access_token: row.try_get("access_token")?,
        refresh_token: row.try_get("refresh_token")?,
        expires_at: row.try_get("expires_at")?,
        scope: scope.into_iter().collect(),
        updated_at: row.try_get("updated_at")?,
    })
}

fn state_from_row(row: &Row) -> std::result::Result<OAuthStateRecord, tokio_postgres::Error> {
    Ok(OAuthStateRecord {
        state: row.try_get("state")?,
        user_id: row.try_get("user_id")?,
        expires_at: row.try_get("expires_at")?,
        created_at: row.try_get("created_at")?,
    })
}

fn contact_from_row(row: &Row) -> std::result::Result<ContactRecord, tokio_postgres::Error> {
    let properties: Value = row.try_get("properties")?;
    Ok(ContactRecord {
        portal_id: row.try_get("portal_id")?,
        id: row.try_get("id")?,
        properties: properties_from(properties),
        updated_at: row.try_get("updated_at")?,
    })
}

fn cursor_from_row(row: &Row) -> std::result::Result<SyncCursor, tokio_postgres::Error> {
    Ok(SyncCursor {
        portal_id: row.try_get("portal_id")?,
        object_type: row.try_get("object_type")?,
        hs_timestamp: row.try_get("hs_timestamp")?,
    })
}

#[async_trait]
impl TokenRepository for PostgresStore {
    #[instrument(skip(self))]
    async fn get(&self, portal_id: &str) -> Result<Option<TokenRecord>> {
        let client = self.client.lock().await;
        let row = client
            .query_opt("SELECT * FROM hubspot_tokens WHERE portal_id = $1", &[&portal_id])
            .await
            .map_err(into_domain)?;
        row.as_ref().map(token_from_row).transpose().map_err(into_domain)
    }

    #[instrument(skip_all, fields(portal_id = %record.portal_id))]
    async fn upsert(&self, record: TokenRecord) -> Result<()> {
        let scope: Vec<String> = record.scope.into_iter().collect();
        let client = self.client.lock().await;
        client
            .execute(
                "INSERT INTO hubspot_tokens
                    (portal_id, user_id, access_token, refresh_token, expires_at, scope, updated_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)
                 ON CONFLICT (portal_id) DO UPDATE SET
                    user_id = excluded.user_id,
                    access_token = excluded.access_token,
                    refresh_token = excluded.refresh_token,
                    expires_at = excluded.expires_at,
                    scope = excluded.scope,
                    updated_at = excluded.updated_at",
                &[
                    &record.portal_id,
                    &record.user_id,
                    &record.access_token,
                    &record.refresh_token,
                    &record.expires_at,
                    &scope,
                    &record.updated_at,
                ],
            )
            .await
            .map_err(into_domain)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, portal_id: &str) -> Result<bool> {
        let client = self.client.lock().await;
        let removed = client
            .execute("DELETE FROM hubspot_tokens WHERE portal_id = $1", &[&portal_id])
            .await
            .map_err(into_domain)?;
        Ok(removed > 0)
    }

    #[instrument(skip(self))]
    async fn find_by_user(&self, user_id: &str) -> Result<Option<TokenRecord>> {
        let client = self.client.lock().await;
        let row = client
            .query_opt(
                "SELECT * FROM hubspot_tokens WHERE user_id = $1
                 ORDER BY updated_at DESC LIMIT 1",
                &[&user_id],
            )
            .await
            .map_err(into_domain)?;
        row.as_ref().map(token_from_row).transpose().map_err(into_domain)
    }

    async fn list_portals(&self) -> Result<Vec<String>> {
        let client = self.client.lock().await;
        let rows = client
            .query("SELECT portal_id FROM hubspot_tokens ORDER BY portal_id", &[])
            .await
            .map_err(into_domain)?;
        rows.iter()
            .map(|row| row.try_get("portal_id"))
            .collect::<std::result::Result<_, _>>()
            .map_err(into_domain)
    }
}

#[async_trait]
impl OAuthStateRepository for PostgresStore {
    async fn insert(&self, record: OAuthStateRecord) -> Result<()> {
        let client = self.client.lock().await;
        client
            .execute(
                "INSERT INTO hubspot_oauth_states (state, user_id, expires_at, created_at)
                 VALUES ($1, $2, $3, $4)",
                &[&record.state, &record.user_id, &record.expires_at, &record.created_at],
            )
            .await
            .map_err(into_domain)?;
        Ok(())
    }

    async fn consume(&self, state: &str) -> Result<Option<OAuthStateRecord>> {
        let client = self.client.lock().await;
        let row = client
            .query_opt("DELETE FROM hubspot_oauth_states WHERE state = $1 RETURNING *", &[&state])
            .await
            .map_err(into_domain)?;
        row.as_ref().map(state_from_row).transpose().map_err(into_domain)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let client = self.client.lock().await;
        let removed = client
            .execute("DELETE FROM hubspot_oauth_states WHERE expires_at <= $1", &[&now])
            .await
            .map_err(into_domain)?;
        Ok(usize::try_from(removed).unwrap_or(usize::MAX))
    }
}

#[async_trait]
impl ContactCacheRepository for PostgresStore {
    #[instrument(skip(self, query), fields(query_len = query.len()))]
    async fn search(&self, portal_id: &str, query: &str, limit: usize) -> Result<Vec<ContactRecord>> {
        let Some(tsquery) = prefix_tsquery(query) else {
            return Ok(Vec::new());
        };
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let client = self.client.lock().await;
        let rows = client
            .query(
                "SELECT portal_id, id, properties, updated_at
                 FROM hubspot_contacts_cache, to_tsquery('simple', $2) AS q
                 WHERE portal_id = $1 AND search_vector @@ q
                 ORDER BY ts_rank(search_vector, q) DESC, updated_at DESC, id
                 LIMIT $3",
                &[&portal_id, &tsquery, &limit],
            )
            .await
            .map_err(into_domain)?;
        rows.iter()
            .map(contact_from_row)
            .collect::<std::result::Result<_, _>>()
            .map_err(into_domain)
    }

    #[instrument(skip_all, fields(count = records.len()))]
    async fn upsert_many(&self, records: Vec<ContactRecord>) -> Result<usize> {
        let mut client = self.client.lock().await;
        let tx = client.transaction().await.map_err(into_domain)?;
        let statement = tx.prepare(MERGE_CONTACT).await.map_err(into_domain)?;

        let mut written = 0u64;
        for record in records {
            let properties = Value::Object(record.properties);
            written += tx
                .execute(
                    &statement,
                    &[&record.portal_id, &record.id, &properties, &record.updated_at],
                )
                .await
                .map_err(into_domain)?;
        }

        tx.commit().await.map_err(into_domain)?;
        Ok(usize::try_from(written).unwrap_or(usize::MAX))
    }

    async fn get(&self, portal_id: &str, id: &str) -> Result<Option<ContactRecord>> {
        let client = self.client.lock().await;
        let row = client
            .query_opt(
                "SELECT portal_id, id, properties, updated_at FROM hubspot_contacts_cache
                 WHERE portal_id = $1 AND id = $2",
                &[&portal_id, &id],
            )
            .await
            .map_err(into_domain)?;
        row.as_ref().map(contact_from_row).transpose().map_err(into_domain)
    }
}

#[async_trait]
impl PropertyChangeRepository for PostgresStore {
    #[instrument(skip_all, fields(portal_id = %change.portal_id, object_id = %change.hubspot_id))]
    async fn upsert_change(&self, change: PropertyChangeRecord) -> Result<()> {
        let mut properties = Map::new();
        properties
            .insert(change.property_name.clone(), Value::String(change.property_value.clone()));
        let properties = Value::Object(properties);

        let mut client = self.client.lock().await;
        let tx = client.transaction().await.map_err(into_domain)?;
        tx.execute(
            "INSERT INTO hubspot_contact_property_changes
                (portal_id, hubspot_id, property_name, property_value, change_source, occurred_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (portal_id, hubspot_id, property_name) DO UPDATE SET
                property_value = excluded.property_value,
                change_source = excluded.change_source,
                occurred_at = excluded.occurred_at
             WHERE excluded.occurred_at >= hubspot_contact_property_changes.occurred_at",
            &[
                &change.portal_id,
                &change.hubspot_id,
                &change.property_name,
                &change.property_value,
                &change.change_source,
                &change.occurred_at,
            ],
        )
        .await
        .map_err(into_domain)?;
        tx.execute(
            MERGE_CONTACT,
            &[&change.portal_id, &change.hubspot_id, &properties, &change.occurred_at],
        )
        .await
        .map_err(into_domain)?;
        tx.commit().await.map_err(into_domain)
    }
}

#[async_trait]
impl SyncCursorRepository for PostgresStore {
    async fn get(&self, portal_id: &str, object_type: &str) -> Result<Option<SyncCursor>> {
        let client = self.client.lock().await;
        let row = client
            .query_opt(
                "SELECT * FROM hubspot_sync_cursors WHERE portal_id = $1 AND object_type = $2",
                &[&portal_id, &object_type],
            )
            .await
            .map_err(into_domain)?;
        row.as_ref().map(cursor_from_row).transpose().map_err(into_domain)
    }

    async fn advance(&self, cursor: SyncCursor) -> Result<SyncCursor> {
        let client = self.client.lock().await;
        let row = client
            .query_one(
                "INSERT INTO hubspot_sync_cursors (portal_id, object_type, hs_timestamp)
                 VALUES ($1, $2, $3)
                 ON CONFLICT (portal_id, object_type) DO UPDATE SET
                    hs_timestamp = GREATEST(hubspot_sync_cursors.hs_timestamp, excluded.hs_timestamp)
                 RETURNING *",
                &[&cursor.portal_id, &cursor.object_type, &cursor.hs_timestamp],
            )
            .await
            .map_err(into_domain)?;
        cursor_from_row(&row).map_err(into_domain)
    }
}

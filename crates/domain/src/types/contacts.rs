//! Contact cache records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::SEARCHABLE_PROPERTIES;
use crate::impl_status_conversions;

const NAME_PROPERTIES: &[&str] = &["firstname", "lastname"];

fn term_hit(value: &str, term: &str) -> u32 {
    let mut words = value.split(|c: char| !c.is_alphanumeric()).filter(|word| !word.is_empty());
    if words.clone().any(|word| word == term) {
        3
    } else if words.any(|word| word.starts_with(term)) {
        2
    } else if value.contains(term) {
        1
    } else {
        0
    }
}

/// A cached CRM contact.
///
/// Unique on `(portal_id, id)`. `updated_at` only moves forward: writes
/// carrying an older timestamp than the stored row are dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactRecord {
    pub portal_id: String,
    /// Remote object id.
    pub id: String,
    pub properties: Map<String, Value>,
    pub updated_at: DateTime<Utc>,
}

impl ContactRecord {
    pub fn new(
        portal_id: impl Into<String>,
        id: impl Into<String>,
        properties: Map<String, Value>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self { portal_id: portal_id.into(), id: id.into(), properties, updated_at }
    }

    /// Lowercased concatenation of the indexed properties.
    pub fn search_text(&self) -> String {
        SEARCHABLE_PROPERTIES
            .iter()
            .filter_map(|key| self.properties.get(*key))
            .filter_map(Value::as_str)
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Every whitespace-separated term of `query` occurs in the indexed text.
    pub fn matches(&self, query: &str) -> bool {
        let haystack = self.search_text();
        let mut terms = query.split_whitespace().peekable();
        if terms.peek().is_none() {
            return false;
        }
        terms.all(|term| haystack.contains(&term.to_lowercase()))
    }

    /// How well `query` matches, higher is better. Each term scores its best
    /// hit: a whole word beats a word prefix, which beats a bare substring.
    /// Name properties count double.
    pub fn relevance(&self, query: &str) -> u32 {
        query
            .split_whitespace()
            .map(str::to_lowercase)
            .map(|term| {
                SEARCHABLE_PROPERTIES
                    .iter()
                    .filter_map(|key| {
                        let value = self.properties.get(*key)?.as_str()?.to_lowercase();
                        let weight = if NAME_PROPERTIES.contains(key) { 2 } else { 1 };
                        Some(term_hit(&value, &term) * weight)
                    })
                    .max()
                    .unwrap_or(0)
            })
            .sum()
    }

    /// Merges `incoming` into this row under last-write-wins.
    ///
    /// Returns `false` (and changes nothing) when `incoming` is older.
    pub fn merge_from(&mut self, incoming: Self) -> bool {
        if incoming.updated_at < self.updated_at {
            return false;
        }
        self.properties.extend(incoming.properties);
        self.updated_at = incoming.updated_at;
        true
    }

    /// Sets one property under last-write-wins.
    pub fn apply_property(
        &mut self,
        name: &str,
        value: Value,
        occurred_at: DateTime<Utc>,
    ) -> bool {
        if occurred_at < self.updated_at {
            return false;
        }
        self.properties.insert(name.to_string(), value);
        self.updated_at = occurred_at;
        true
    }
}

/// Where search results came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchSource {
    /// Local cache satisfied the query, or the remote call failed.
    Local,
    /// Local hits followed by remote hits.
    Merged,
}

impl_status_conversions!(SearchSource {
    Local => "local",
    Merged => "merged",
});

//! Persisted article metadata.

use serde::{Deserialize, Serialize};

use super::category::Category;

/// Metadata row for an ingested article.
///
/// The embedding itself lives in the language's vector index under `vector_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Identifier of the embedding in the language's vector index
    pub vector_id: u64,
    /// Position of the language in the configuration
    pub lang_id: u8,
    pub category: Category,
    /// Unique article name
    pub name: String,
    pub title: String,
    pub site: String,
    /// Publication time, seconds since epoch
    pub published: u64,
    /// Time to live, seconds
    pub ttl: u64,
}

impl Record {
    /// Whether the record falls out of its time to live relative to the newest
    /// publication time of its language.
    ///
    /// Equivalent to `published < max_published - ttl` without underflow: a record
    /// published exactly `ttl` seconds before the newest one is kept.
    pub fn is_expired(&self, max_published: u64) -> bool {
        (self.published as u128) + (self.ttl as u128) < max_published as u128
    }
}

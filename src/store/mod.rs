//! Storage abstraction for the trend pipeline.
//!
//! The [`TrendStore`] trait defines every persistence operation the cache,
//! janitor, and server need, enabling pluggable backends: SQLite in
//! production, in-memory for tests. All writes are upserts or appends keyed
//! by a natural key, so concurrent refreshes resolve as last-write-wins.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{CacheMetadata, KeywordAnalysis, Region, TrendSnapshot, VideoRecord};

/// Abstract storage backend.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`insert_batch`](TrendStore::insert_batch) | Append one refresh batch of records |
/// | [`latest_batch`](TrendStore::latest_batch) | Records of the newest batch for a region, rank order |
/// | [`get_cache_metadata`](TrendStore::get_cache_metadata) | Freshness row for a cache key |
/// | [`upsert_cache_metadata`](TrendStore::upsert_cache_metadata) | Replace the freshness row |
/// | [`get_keyword_analysis`](TrendStore::get_keyword_analysis) | Unexpired analysis for (keyword, region) |
/// | [`upsert_keyword_analysis`](TrendStore::upsert_keyword_analysis) | Replace the analysis in place |
/// | [`delete_expired_analyses`](TrendStore::delete_expired_analyses) | Drop analyses past their expiry |
/// | [`purge_records_before`](TrendStore::purge_records_before) | Drop records older than the retention cutoff |
/// | [`upsert_snapshot`](TrendStore::upsert_snapshot) | Replace the daily rollup for (region, date) |
#[async_trait]
pub trait TrendStore: Send + Sync {
    /// Append a batch of records. Batches are never mutated afterwards.
    async fn insert_batch(&self, records: &[VideoRecord]) -> Result<()>;

    /// Records of the most recent batch for `region`, ordered by rank.
    ///
    /// "Most recent" is an explicit contract: the batch with the greatest
    /// `fetched_at`, never insertion order. Returns an empty vec when the
    /// region has no batches at all.
    async fn latest_batch(&self, region: Region) -> Result<Vec<VideoRecord>>;

    async fn get_cache_metadata(&self, cache_key: &str) -> Result<Option<CacheMetadata>>;

    async fn upsert_cache_metadata(&self, meta: &CacheMetadata) -> Result<()>;

    /// Look up an analysis that is still live at `now`. Expired rows are
    /// logically absent even if not yet physically deleted.
    async fn get_keyword_analysis(
        &self,
        keyword: &str,
        region: Region,
        now: DateTime<Utc>,
    ) -> Result<Option<KeywordAnalysis>>;

    async fn upsert_keyword_analysis(&self, analysis: &KeywordAnalysis) -> Result<()>;

    /// Delete analyses with `expires_at < now`. Returns the rows removed.
    async fn delete_expired_analyses(&self, now: DateTime<Utc>) -> Result<u64>;

    /// Delete records with `fetched_at` before `cutoff`. Returns the rows removed.
    async fn purge_records_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;

    async fn upsert_snapshot(&self, snapshot: &TrendSnapshot) -> Result<()>;
}

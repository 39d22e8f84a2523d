//! In-memory [`TrendStore`] implementation for tests.
//!
//! Uses `Vec` and `HashMap` behind `std::sync::RwLock` for thread safety.
//! Batch selection is the same logical query the SQLite store runs: greatest
//! `fetched_at` wins, then rank order.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::models::{CacheMetadata, KeywordAnalysis, Region, TrendSnapshot, VideoRecord};

use super::TrendStore;

/// In-memory store for tests and ephemeral runs.
#[derive(Default)]
pub struct InMemoryStore {
    records: RwLock<Vec<VideoRecord>>,
    metadata: RwLock<HashMap<String, CacheMetadata>>,
    analyses: RwLock<HashMap<(String, Region), KeywordAnalysis>>,
    snapshots: RwLock<HashMap<(Region, NaiveDate), TrendSnapshot>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keyword analyses, live or expired. Test helper.
    pub fn analysis_count(&self) -> usize {
        self.analyses.read().unwrap().len()
    }

    /// Number of stored video records across all batches. Test helper.
    pub fn record_count(&self) -> usize {
        self.records.read().unwrap().len()
    }

    /// Stored snapshot for (region, date), if any. Test helper.
    pub fn snapshot(&self, region: Region, date: NaiveDate) -> Option<TrendSnapshot> {
        self.snapshots.read().unwrap().get(&(region, date)).cloned()
    }
}

#[async_trait]
impl TrendStore for InMemoryStore {
    async fn insert_batch(&self, records: &[VideoRecord]) -> Result<()> {
        self.records.write().unwrap().extend_from_slice(records);
        Ok(())
    }

    async fn latest_batch(&self, region: Region) -> Result<Vec<VideoRecord>> {
        let records = self.records.read().unwrap();

        let latest = records
            .iter()
            .filter(|r| r.region_code == region)
            .map(|r| r.fetched_at)
            .max();

        let Some(latest) = latest else {
            return Ok(Vec::new());
        };

        let mut batch: Vec<VideoRecord> = records
            .iter()
            .filter(|r| r.region_code == region && r.fetched_at == latest)
            .cloned()
            .collect();
        batch.sort_by_key(|r| r.rank.unwrap_or(0));

        Ok(batch)
    }

    async fn get_cache_metadata(&self, cache_key: &str) -> Result<Option<CacheMetadata>> {
        Ok(self.metadata.read().unwrap().get(cache_key).cloned())
    }

    async fn upsert_cache_metadata(&self, meta: &CacheMetadata) -> Result<()> {
        self.metadata
            .write()
            .unwrap()
            .insert(meta.cache_key.clone(), meta.clone());
        Ok(())
    }

    async fn get_keyword_analysis(
        &self,
        keyword: &str,
        region: Region,
        now: DateTime<Utc>,
    ) -> Result<Option<KeywordAnalysis>> {
        let analyses = self.analyses.read().unwrap();
        Ok(analyses
            .get(&(keyword.to_string(), region))
            .filter(|a| a.expires_at > now)
            .cloned())
    }

    async fn upsert_keyword_analysis(&self, analysis: &KeywordAnalysis) -> Result<()> {
        self.analyses.write().unwrap().insert(
            (analysis.keyword.clone(), analysis.region_code),
            analysis.clone(),
        );
        Ok(())
    }

    async fn delete_expired_analyses(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut analyses = self.analyses.write().unwrap();
        let before = analyses.len();
        analyses.retain(|_, a| a.expires_at >= now);
        Ok((before - analyses.len()) as u64)
    }

    async fn purge_records_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut records = self.records.write().unwrap();
        let before = records.len();
        records.retain(|r| r.fetched_at >= cutoff);
        Ok((before - records.len()) as u64)
    }

    async fn upsert_snapshot(&self, snapshot: &TrendSnapshot) -> Result<()> {
        self.snapshots.write().unwrap().insert(
            (snapshot.region_code, snapshot.snapshot_date),
            snapshot.clone(),
        );
        Ok(())
    }
}

//! Trend cache orchestration.
//!
//! [`TrendCache`] owns the refresh-and-serve pipeline behind both endpoints.
//! Staleness is computed lazily at read time from [`CacheMetadata`]; there is
//! no background timer. The two paths deliberately fail differently:
//!
//! - **Trending chart**: a failed refresh is logged and the last persisted
//!   batch is served instead. Stale-but-available beats unavailable.
//! - **Keyword analysis**: upstream failures propagate, because a cache miss
//!   has no prior data to degrade to.
//!
//! No per-key lock guards concurrent refreshes of the same region: two
//! overlapping refreshes both write a batch and the later `fetched_at` wins
//! at read time.

use chrono::{Duration, Utc};
use std::sync::Arc;

use crate::aggregate;
use crate::annotate::AnnotationService;
use crate::config::CacheConfig;
use crate::error::TrendError;
use crate::models::{
    AnalysisResponse, CacheMetadata, CacheStatus, KeywordAnalysis, Region, TrendItem,
    TrendsResponse,
};
use crate::store::TrendStore;
use crate::youtube::VideoSource;

pub struct TrendCache {
    store: Arc<dyn TrendStore>,
    source: Arc<dyn VideoSource>,
    annotator: AnnotationService,
    trends_ttl: Duration,
    keyword_ttl: Duration,
}

impl TrendCache {
    pub fn new(
        store: Arc<dyn TrendStore>,
        source: Arc<dyn VideoSource>,
        annotator: AnnotationService,
        config: &CacheConfig,
    ) -> Self {
        Self {
            store,
            source,
            annotator,
            trends_ttl: Duration::minutes(config.trends_ttl_minutes),
            keyword_ttl: Duration::hours(config.keyword_ttl_hours),
        }
    }

    /// Serve the trending chart for a region, refreshing first when stale.
    pub async fn trending_for_region(&self, region: Region) -> Result<TrendsResponse, TrendError> {
        let now = Utc::now();

        let stale = match self.store.get_cache_metadata(&region.cache_key()).await {
            Ok(Some(meta)) => now - meta.last_refreshed > self.trends_ttl,
            Ok(None) => true,
            Err(e) => {
                tracing::warn!(region = region.code(), "metadata read failed, treating as stale: {e}");
                true
            }
        };

        if stale {
            if let Err(e) = self.refresh_region(region).await {
                tracing::warn!(region = region.code(), "refresh failed, serving cached data: {e}");
            }
        }

        let batch = self
            .store
            .latest_batch(region)
            .await
            .map_err(TrendError::store)?;

        if batch.is_empty() {
            return Ok(TrendsResponse {
                trends: Vec::new(),
                global_insight: format!("No YouTube trend data for {} yet.", region.label()),
            });
        }

        Ok(TrendsResponse {
            trends: batch.iter().map(TrendItem::from_record).collect(),
            global_insight: format!(
                "The most popular videos on YouTube in {} right now.",
                region.label()
            ),
        })
    }

    /// Fetch a fresh batch and mark the region fresh. Metadata is only
    /// updated after the batch is persisted.
    async fn refresh_region(&self, region: Region) -> Result<(), TrendError> {
        let records = self.source.fetch_trending_chart(region).await?;
        let fetched_at = records
            .first()
            .map(|r| r.fetched_at)
            .unwrap_or_else(Utc::now);

        self.store
            .insert_batch(&records)
            .await
            .map_err(TrendError::store)?;

        let meta = CacheMetadata {
            cache_key: region.cache_key(),
            last_refreshed: fetched_at,
            next_refresh: fetched_at + self.trends_ttl,
            status: CacheStatus::Ok,
        };
        self.store
            .upsert_cache_metadata(&meta)
            .await
            .map_err(TrendError::store)?;

        tracing::info!(region = region.code(), count = records.len(), "trending chart refreshed");
        Ok(())
    }

    /// Analyze a keyword, serving a cached analysis when one is still live.
    pub async fn keyword_analysis(
        &self,
        keyword: &str,
        region: Region,
    ) -> Result<AnalysisResponse, TrendError> {
        let keyword = keyword.trim().to_lowercase();
        if keyword.is_empty() {
            return Err(TrendError::Validation(
                "keyword is required and must be a string.".to_string(),
            ));
        }

        let now = Utc::now();

        match self.store.get_keyword_analysis(&keyword, region, now).await {
            Ok(Some(cached)) => {
                return Ok(AnalysisResponse::from_analysis(cached, true));
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(keyword = %keyword, "analysis cache read failed, treating as miss: {e}");
            }
        }

        let ids = self.source.search_by_keyword(&keyword, region).await?;

        if ids.is_empty() {
            // A transient zero-hit search must not pin an empty result for
            // the full TTL, so this response is not cached.
            return Ok(AnalysisResponse {
                summary: format!("No search results for \"{keyword}\"."),
                keyword,
                region_code: region,
                vibe_score: 0,
                insights: Vec::new(),
                opportunities: Vec::new(),
                risks: Vec::new(),
                aggregated_data: None,
                videos: Vec::new(),
                from_cache: false,
            });
        }

        let videos = self.source.fetch_video_details(&ids, region).await?;
        let stats = aggregate::reduce(&videos, now);
        let annotation = self.annotator.annotate(&keyword, region, &stats).await;

        let analysis = KeywordAnalysis {
            keyword,
            region_code: region,
            vibe_score: annotation.vibe_score,
            summary: annotation.summary,
            insights: annotation.insights,
            opportunities: annotation.opportunities,
            risks: annotation.risks,
            aggregated_data: Some(stats),
            videos,
            analyzed_at: now,
            expires_at: now + self.keyword_ttl,
        };

        // A failed cache write must not fail the user-facing response.
        if let Err(e) = self.store.upsert_keyword_analysis(&analysis).await {
            tracing::warn!(keyword = %analysis.keyword, "analysis cache write failed, serving uncached result: {e}");
        }

        Ok(AnalysisResponse::from_analysis(analysis, false))
    }
}

//! End-to-end pipeline tests over the in-memory store.
//!
//! A scripted [`VideoSource`] stands in for the YouTube API and the
//! annotation service runs with the model disabled, so every path through
//! the cache is deterministic and offline.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};

use vibescope::annotate::AnnotationService;
use vibescope::cache::TrendCache;
use vibescope::config::{CacheConfig, ModelConfig, RetentionConfig};
use vibescope::error::TrendError;
use vibescope::janitor::RetentionJanitor;
use vibescope::models::{CacheMetadata, CacheStatus, KeywordAnalysis, Region, VideoRecord};
use vibescope::store::memory::InMemoryStore;
use vibescope::store::TrendStore;
use vibescope::youtube::VideoSource;

fn video(id: &str, views: u64, rank: Option<u32>) -> VideoRecord {
    let now = Utc::now();
    VideoRecord {
        video_id: id.to_string(),
        region_code: Region::KR,
        title: format!("video {id}"),
        description: String::new(),
        channel_title: format!("channel {id}"),
        published_at: now - Duration::days(2),
        thumbnail_url: String::new(),
        category_id: "24".to_string(),
        category_name: "Entertainment".to_string(),
        tags: Vec::new(),
        view_count: views,
        like_count: views / 50,
        comment_count: views / 500,
        rank,
        vibe_score: 10,
        fetched_at: now,
    }
}

/// Scripted video source: fixed chart/search/detail payloads, call counters,
/// and a switchable upstream failure.
#[derive(Default)]
struct ScriptedSource {
    chart: Mutex<Vec<VideoRecord>>,
    search_ids: Mutex<Vec<String>>,
    details: Mutex<Vec<VideoRecord>>,
    fail_upstream: AtomicBool,
    chart_calls: AtomicUsize,
    search_calls: AtomicUsize,
    detail_calls: AtomicUsize,
}

impl ScriptedSource {
    fn upstream_error() -> TrendError {
        TrendError::Upstream {
            status: 503,
            body: "service unavailable".to_string(),
        }
    }
}

#[async_trait]
impl VideoSource for ScriptedSource {
    async fn fetch_trending_chart(&self, region: Region) -> Result<Vec<VideoRecord>, TrendError> {
        self.chart_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_upstream.load(Ordering::SeqCst) {
            return Err(Self::upstream_error());
        }

        let fetched_at = Utc::now();
        Ok(self
            .chart
            .lock()
            .unwrap()
            .iter()
            .cloned()
            .map(|mut r| {
                r.region_code = region;
                r.fetched_at = fetched_at;
                r
            })
            .collect())
    }

    async fn search_by_keyword(
        &self,
        _keyword: &str,
        _region: Region,
    ) -> Result<Vec<String>, TrendError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_upstream.load(Ordering::SeqCst) {
            return Err(Self::upstream_error());
        }
        Ok(self.search_ids.lock().unwrap().clone())
    }

    async fn fetch_video_details(
        &self,
        _ids: &[String],
        region: Region,
    ) -> Result<Vec<VideoRecord>, TrendError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_upstream.load(Ordering::SeqCst) {
            return Err(Self::upstream_error());
        }

        let fetched_at = Utc::now();
        Ok(self
            .details
            .lock()
            .unwrap()
            .iter()
            .cloned()
            .map(|mut r| {
                r.region_code = region;
                r.fetched_at = fetched_at;
                r
            })
            .collect())
    }
}

fn cache_with(
    store: Arc<InMemoryStore>,
    source: Arc<ScriptedSource>,
) -> TrendCache {
    TrendCache::new(
        store,
        source,
        AnnotationService::disabled(&ModelConfig::default()),
        &CacheConfig::default(),
    )
}

async fn seed_batch(store: &InMemoryStore, region: Region, ids: &[&str], age: Duration) {
    let fetched_at = Utc::now() - age;
    let batch: Vec<VideoRecord> = ids
        .iter()
        .enumerate()
        .map(|(rank, id)| {
            let mut r = video(id, 1_000, Some(rank as u32));
            r.region_code = region;
            r.fetched_at = fetched_at;
            r
        })
        .collect();
    store.insert_batch(&batch).await.unwrap();
}

async fn seed_metadata(store: &InMemoryStore, region: Region, age: Duration) {
    let last_refreshed = Utc::now() - age;
    store
        .upsert_cache_metadata(&CacheMetadata {
            cache_key: region.cache_key(),
            last_refreshed,
            next_refresh: last_refreshed + Duration::minutes(30),
            status: CacheStatus::Ok,
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn stale_cache_triggers_refresh() {
    let store = Arc::new(InMemoryStore::new());
    let source = Arc::new(ScriptedSource::default());
    *source.chart.lock().unwrap() = vec![video("fresh1", 500_000, Some(0))];

    seed_batch(&store, Region::KR, &["old1"], Duration::minutes(40)).await;
    seed_metadata(&store, Region::KR, Duration::minutes(31)).await;

    let cache = cache_with(store.clone(), source.clone());
    let response = cache.trending_for_region(Region::KR).await.unwrap();

    assert_eq!(source.chart_calls.load(Ordering::SeqCst), 1);
    assert_eq!(response.trends.len(), 1);
    assert_eq!(response.trends[0].id, "fresh1");
}

#[tokio::test]
async fn fresh_cache_skips_refresh() {
    let store = Arc::new(InMemoryStore::new());
    let source = Arc::new(ScriptedSource::default());

    seed_batch(&store, Region::KR, &["cached1", "cached2"], Duration::minutes(10)).await;
    seed_metadata(&store, Region::KR, Duration::minutes(10)).await;

    let cache = cache_with(store, source.clone());
    let response = cache.trending_for_region(Region::KR).await.unwrap();

    assert_eq!(source.chart_calls.load(Ordering::SeqCst), 0);
    let ids: Vec<&str> = response.trends.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["cached1", "cached2"]);
}

#[tokio::test]
async fn failed_refresh_serves_stale_batch() {
    let store = Arc::new(InMemoryStore::new());
    let source = Arc::new(ScriptedSource::default());
    source.fail_upstream.store(true, Ordering::SeqCst);

    seed_batch(&store, Region::KR, &["stale1"], Duration::hours(2)).await;
    seed_metadata(&store, Region::KR, Duration::hours(2)).await;

    let cache = cache_with(store, source.clone());
    let response = cache.trending_for_region(Region::KR).await.unwrap();

    assert_eq!(source.chart_calls.load(Ordering::SeqCst), 1);
    assert_eq!(response.trends.len(), 1);
    assert_eq!(response.trends[0].id, "stale1");
}

#[tokio::test]
async fn first_call_with_failed_refresh_returns_empty() {
    let store = Arc::new(InMemoryStore::new());
    let source = Arc::new(ScriptedSource::default());
    source.fail_upstream.store(true, Ordering::SeqCst);

    let cache = cache_with(store, source);
    let response = cache.trending_for_region(Region::JP).await.unwrap();

    assert!(response.trends.is_empty());
    assert!(response.global_insight.contains("No YouTube trend data"));
}

#[tokio::test]
async fn trending_serves_only_the_latest_batch() {
    let store = Arc::new(InMemoryStore::new());
    let source = Arc::new(ScriptedSource::default());

    seed_batch(&store, Region::US, &["old1", "old2"], Duration::minutes(25)).await;
    seed_batch(&store, Region::US, &["new1", "new2", "new3"], Duration::minutes(5)).await;
    seed_metadata(&store, Region::US, Duration::minutes(5)).await;

    let cache = cache_with(store, source);
    let response = cache.trending_for_region(Region::US).await.unwrap();

    let ids: Vec<&str> = response.trends.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["new1", "new2", "new3"]);
}

#[tokio::test]
async fn keyword_analysis_round_trip_hits_cache() {
    let store = Arc::new(InMemoryStore::new());
    let source = Arc::new(ScriptedSource::default());
    *source.search_ids.lock().unwrap() = vec!["a".to_string(), "b".to_string()];
    *source.details.lock().unwrap() = vec![video("a", 120_000, None), video("b", 80_000, None)];

    let cache = cache_with(store, source.clone());

    let first = cache.keyword_analysis("Lofi Beats", Region::KR).await.unwrap();
    assert!(!first.from_cache);
    assert_eq!(first.keyword, "lofi beats");
    assert!(first.vibe_score <= 100);
    assert!(!first.insights.is_empty());
    assert_eq!(first.videos.len(), 2);
    assert_eq!(source.search_calls.load(Ordering::SeqCst), 1);
    assert_eq!(source.detail_calls.load(Ordering::SeqCst), 1);

    let second = cache.keyword_analysis("lofi beats", Region::KR).await.unwrap();
    assert!(second.from_cache);
    assert_eq!(second.vibe_score, first.vibe_score);
    assert_eq!(second.summary, first.summary);
    // No further upstream traffic for the cached answer.
    assert_eq!(source.search_calls.load(Ordering::SeqCst), 1);
    assert_eq!(source.detail_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn zero_search_results_are_not_cached() {
    let store = Arc::new(InMemoryStore::new());
    let source = Arc::new(ScriptedSource::default());

    let cache = cache_with(store.clone(), source.clone());

    let response = cache.keyword_analysis("nothing", Region::KR).await.unwrap();
    assert_eq!(response.vibe_score, 0);
    assert!(response.insights.is_empty());
    assert!(response.opportunities.is_empty());
    assert!(response.risks.is_empty());
    assert!(response.videos.is_empty());
    assert!(response.aggregated_data.is_none());
    assert_eq!(store.analysis_count(), 0);

    // The next request searches again instead of pinning the empty result.
    cache.keyword_analysis("nothing", Region::KR).await.unwrap();
    assert_eq!(source.search_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn keyword_upstream_failure_propagates() {
    let store = Arc::new(InMemoryStore::new());
    let source = Arc::new(ScriptedSource::default());
    source.fail_upstream.store(true, Ordering::SeqCst);

    let cache = cache_with(store, source);
    let err = cache.keyword_analysis("anything", Region::KR).await.unwrap_err();
    assert!(matches!(err, TrendError::Upstream { status: 503, .. }));
}

#[tokio::test]
async fn blank_keyword_is_rejected() {
    let store = Arc::new(InMemoryStore::new());
    let source = Arc::new(ScriptedSource::default());

    let cache = cache_with(store, source.clone());
    let err = cache.keyword_analysis("   ", Region::KR).await.unwrap_err();
    assert!(matches!(err, TrendError::Validation(_)));
    assert_eq!(source.search_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn janitor_cleans_up_and_snapshots() {
    let store = Arc::new(InMemoryStore::new());
    let now = Utc::now();

    // One live and one expired analysis.
    for (keyword, offset) in [("live", Duration::hours(1)), ("dead", -Duration::hours(1))] {
        store
            .upsert_keyword_analysis(&KeywordAnalysis {
                keyword: keyword.to_string(),
                region_code: Region::KR,
                vibe_score: 10,
                summary: "s".to_string(),
                insights: Vec::new(),
                opportunities: Vec::new(),
                risks: Vec::new(),
                aggregated_data: None,
                videos: Vec::new(),
                analyzed_at: now - Duration::hours(6),
                expires_at: now + offset,
            })
            .await
            .unwrap();
    }

    // One recent batch for KR and one batch past the retention window.
    seed_batch(&store, Region::KR, &["recent1", "recent2"], Duration::minutes(5)).await;
    seed_batch(&store, Region::US, &["ancient"], Duration::days(120)).await;

    let janitor = RetentionJanitor::new(store.clone(), &RetentionConfig::default());
    let results = janitor.run().await;

    // 3 region snapshot lines + keyword cleanup + purge.
    assert_eq!(results.len(), 5);
    assert!(results[0].starts_with("KR: Snapshot saved."));
    assert!(results[1].contains("No cached data") || results[1].contains("Snapshot"));
    assert!(results.iter().any(|r| r.contains("Expired keyword analyses cleaned: 1")));
    assert!(results.iter().any(|r| r.contains("purged") && r.contains("1")));

    assert_eq!(store.analysis_count(), 1);
    assert_eq!(store.record_count(), 2);

    let snapshot = store.snapshot(Region::KR, now.date_naive()).unwrap();
    assert_eq!(snapshot.video_count, 2);
    assert_eq!(snapshot.top_video_id.as_deref(), Some("recent1"));
}

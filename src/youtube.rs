//! YouTube Data API client.
//!
//! Thin adapter over the `videos.list` (mostPopular chart, detail lookup)
//! and `search.list` endpoints. Raw items are normalized into
//! [`VideoRecord`]s here; missing optional fields (statistics, thumbnails,
//! tags) become defined defaults so one sparse item never fails a batch.
//!
//! The [`VideoSource`] trait is the seam the cache layer depends on, so
//! tests can substitute a scripted source for the real API.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;

use crate::config::{self, YoutubeConfig};
use crate::error::TrendError;
use crate::models::{category_name, Region, VideoRecord};
use crate::score::chart_vibe_score;

/// The `videos.list` endpoint accepts at most this many ids per call.
const MAX_IDS_PER_CALL: usize = 50;

const MAX_TAGS: usize = 5;

/// Abstract source of trending and keyword-search video data.
#[async_trait]
pub trait VideoSource: Send + Sync {
    /// Fetch the trending chart for a region as normalized, rank-scored
    /// records sharing one `fetched_at` instant.
    async fn fetch_trending_chart(&self, region: Region) -> Result<Vec<VideoRecord>, TrendError>;

    /// Search videos by keyword. An empty result is a valid zero-match
    /// outcome, not an error.
    async fn search_by_keyword(
        &self,
        keyword: &str,
        region: Region,
    ) -> Result<Vec<String>, TrendError>;

    /// Fetch full details for a set of video ids, batching as needed.
    async fn fetch_video_details(
        &self,
        ids: &[String],
        region: Region,
    ) -> Result<Vec<VideoRecord>, TrendError>;
}

/// Production [`VideoSource`] backed by the YouTube Data API v3.
pub struct VideoRankingClient {
    client: reqwest::Client,
    api_base: String,
    api_key: Option<String>,
    chart_size: u32,
    search_size: u32,
}

impl VideoRankingClient {
    /// Build a client from configuration. The API key is read from the
    /// environment; a missing key defers to a per-request error so the
    /// server can still start and report the condition via `/health`.
    pub fn new(config: &YoutubeConfig) -> Result<Self, TrendError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.clone(),
            api_key: config::youtube_api_key(),
            chart_size: config.chart_size,
            search_size: config.search_size,
        })
    }

    fn key(&self) -> Result<&str, TrendError> {
        self.api_key
            .as_deref()
            .ok_or(TrendError::MissingCredential {
                name: "YOUTUBE_API_KEY",
            })
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, TrendError> {
        let url = format!("{}/{}", self.api_base, path);
        let response = self.client.get(&url).query(query).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TrendError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl VideoSource for VideoRankingClient {
    async fn fetch_trending_chart(&self, region: Region) -> Result<Vec<VideoRecord>, TrendError> {
        let key = self.key()?.to_string();
        let max_results = self.chart_size.to_string();

        let data: VideoListResponse = self
            .get(
                "videos",
                &[
                    ("part", "snippet,statistics"),
                    ("chart", "mostPopular"),
                    ("regionCode", region.code()),
                    ("maxResults", &max_results),
                    ("key", &key),
                ],
            )
            .await?;

        let fetched_at = Utc::now();
        let records = data
            .items
            .into_iter()
            .enumerate()
            .map(|(rank, item)| normalize_item(item, region, Some(rank as u32), fetched_at))
            .collect();

        Ok(records)
    }

    async fn search_by_keyword(
        &self,
        keyword: &str,
        region: Region,
    ) -> Result<Vec<String>, TrendError> {
        let key = self.key()?.to_string();
        let max_results = self.search_size.to_string();

        let data: SearchListResponse = self
            .get(
                "search",
                &[
                    ("part", "snippet"),
                    ("q", keyword),
                    ("type", "video"),
                    ("regionCode", region.code()),
                    ("maxResults", &max_results),
                    ("order", "relevance"),
                    ("key", &key),
                ],
            )
            .await?;

        Ok(data
            .items
            .into_iter()
            .filter_map(|item| item.id.video_id)
            .filter(|id| !id.is_empty())
            .collect())
    }

    async fn fetch_video_details(
        &self,
        ids: &[String],
        region: Region,
    ) -> Result<Vec<VideoRecord>, TrendError> {
        let key = self.key()?.to_string();
        let fetched_at = Utc::now();

        let mut records = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(MAX_IDS_PER_CALL) {
            let joined = chunk.join(",");
            let data: VideoListResponse = self
                .get(
                    "videos",
                    &[
                        ("part", "snippet,statistics"),
                        ("id", &joined),
                        ("key", &key),
                    ],
                )
                .await?;

            records.extend(
                data.items
                    .into_iter()
                    .map(|item| normalize_item(item, region, None, fetched_at)),
            );
        }

        Ok(records)
    }
}

// ============ Raw API shapes ============

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<RawVideoItem>,
}

#[derive(Debug, Deserialize)]
struct RawVideoItem {
    #[serde(default)]
    id: String,
    #[serde(default)]
    snippet: RawSnippet,
    #[serde(default)]
    statistics: RawStatistics,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSnippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    channel_title: String,
    #[serde(default)]
    published_at: String,
    #[serde(default)]
    category_id: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    thumbnails: RawThumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct RawThumbnails {
    high: Option<RawThumbnail>,
    #[serde(rename = "default")]
    fallback: Option<RawThumbnail>,
}

#[derive(Debug, Deserialize)]
struct RawThumbnail {
    #[serde(default)]
    url: String,
}

/// Statistics values arrive as decimal strings; anything absent or
/// unparsable counts as 0.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStatistics {
    view_count: Option<String>,
    like_count: Option<String>,
    comment_count: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchListResponse {
    #[serde(default)]
    items: Vec<RawSearchItem>,
}

#[derive(Debug, Deserialize)]
struct RawSearchItem {
    #[serde(default)]
    id: RawSearchId,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSearchId {
    video_id: Option<String>,
}

fn parse_stat(value: &Option<String>) -> u64 {
    value
        .as_deref()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}

fn normalize_item(
    item: RawVideoItem,
    region: Region,
    rank: Option<u32>,
    fetched_at: DateTime<Utc>,
) -> VideoRecord {
    let view_count = parse_stat(&item.statistics.view_count);

    let published_at = DateTime::parse_from_rfc3339(&item.snippet.published_at)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(fetched_at);

    let thumbnail_url = item
        .snippet
        .thumbnails
        .high
        .or(item.snippet.thumbnails.fallback)
        .map(|t| t.url)
        .unwrap_or_default();

    let mut tags = item.snippet.tags;
    tags.truncate(MAX_TAGS);

    let vibe_score = rank.map(|r| chart_vibe_score(view_count, r)).unwrap_or(0);

    VideoRecord {
        video_id: item.id,
        region_code: region,
        title: item.snippet.title,
        description: item.snippet.description,
        channel_title: item.snippet.channel_title,
        published_at,
        thumbnail_url,
        category_name: category_name(&item.snippet.category_id).to_string(),
        category_id: item.snippet.category_id,
        tags,
        view_count,
        like_count: parse_stat(&item.statistics.like_count),
        comment_count: parse_stat(&item.statistics.comment_count),
        rank,
        vibe_score,
        fetched_at,
    }
}

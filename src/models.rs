//! Core data models used throughout vibescope.
//!
//! These types represent the video observations, cached analyses, and
//! aggregates that flow through the refresh-and-cache pipeline, plus the
//! wire shapes served by the HTTP API.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Supported trending regions. The set is closed; anything else is a 400.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    KR,
    US,
    JP,
}

impl Region {
    pub const ALL: [Region; 3] = [Region::KR, Region::US, Region::JP];

    /// Parse a region code, case-insensitively. Returns `None` for unknown codes.
    pub fn parse(code: &str) -> Option<Region> {
        match code.to_ascii_uppercase().as_str() {
            "KR" => Some(Region::KR),
            "US" => Some(Region::US),
            "JP" => Some(Region::JP),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Region::KR => "KR",
            Region::US => "US",
            Region::JP => "JP",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Region::KR => "Korea",
            Region::US => "United States",
            Region::JP => "Japan",
        }
    }

    pub fn flag(&self) -> &'static str {
        match self {
            Region::KR => "🇰🇷",
            Region::US => "🇺🇸",
            Region::JP => "🇯🇵",
        }
    }

    /// Cache-metadata key for this region's trending chart.
    pub fn cache_key(&self) -> String {
        format!("trends:{}", self.code())
    }
}

/// Map a YouTube category id to a display name. Unmapped ids become "Other".
pub fn category_name(id: &str) -> &'static str {
    match id {
        "1" => "Film & Animation",
        "2" => "Autos & Vehicles",
        "10" => "Music",
        "15" => "Pets & Animals",
        "17" => "Sports",
        "19" => "Travel & Events",
        "20" => "Gaming",
        "22" => "People & Blogs",
        "23" => "Comedy",
        "24" => "Entertainment",
        "25" => "News & Politics",
        "26" => "Howto & Style",
        "27" => "Education",
        "28" => "Science & Technology",
        _ => "Other",
    }
}

/// One upstream video observation. Immutable once created: a refresh never
/// mutates a record, it appends a new batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
    pub video_id: String,
    pub region_code: Region,
    pub title: String,
    pub description: String,
    pub channel_title: String,
    pub published_at: DateTime<Utc>,
    pub thumbnail_url: String,
    pub category_id: String,
    pub category_name: String,
    /// Capped at 5 entries at normalization time.
    pub tags: Vec<String>,
    pub view_count: u64,
    pub like_count: u64,
    pub comment_count: u64,
    /// 0-based chart position. `None` for keyword-search fetches, where the
    /// upstream order carries no ranking meaning.
    pub rank: Option<u32>,
    pub vibe_score: u32,
    pub fetched_at: DateTime<Utc>,
}

/// Freshness bookkeeping for one cache key (`trends:<region>`).
/// Absence of a row is treated as stale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheMetadata {
    pub cache_key: String,
    pub last_refreshed: DateTime<Utc>,
    pub next_refresh: DateTime<Utc>,
    pub status: CacheStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    Ok,
    Error,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Ok => "ok",
            CacheStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> CacheStatus {
        match s {
            "error" => CacheStatus::Error,
            _ => CacheStatus::Ok,
        }
    }
}

/// Per-channel rollup inside [`AggregatedStats`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStat {
    pub name: String,
    pub video_count: u64,
    pub total_views: u64,
}

/// Summary statistics reduced from a list of [`VideoRecord`]s.
///
/// Averages are rounded half away from zero. `recent_upload_rate` is the
/// integer percentage of videos published within the last 7 days.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedStats {
    pub total_videos: u64,
    pub total_views: u64,
    pub total_likes: u64,
    pub total_comments: u64,
    pub avg_views: u64,
    pub avg_likes: u64,
    pub avg_comments: u64,
    pub max_views: u64,
    pub min_views: u64,
    /// At most 5, sorted by total views descending, first-seen order on ties.
    pub top_channels: Vec<ChannelStat>,
    /// At most 10, sorted by view count descending, input order on ties.
    pub top_videos: Vec<VideoRecord>,
    pub recent_upload_rate: u32,
}

/// Narrative annotation for a keyword analysis, produced by the model or by
/// the deterministic heuristic fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub vibe_score: u32,
    pub summary: String,
    pub insights: Vec<String>,
    pub opportunities: Vec<String>,
    pub risks: Vec<String>,
}

/// Cached keyword analysis, unique per (keyword, region). The keyword is
/// stored case-folded. A row is logically absent once `expires_at` has passed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordAnalysis {
    pub keyword: String,
    pub region_code: Region,
    pub vibe_score: u32,
    pub summary: String,
    pub insights: Vec<String>,
    pub opportunities: Vec<String>,
    pub risks: Vec<String>,
    pub aggregated_data: Option<AggregatedStats>,
    pub videos: Vec<VideoRecord>,
    pub analyzed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Daily rollup of a region's latest trending batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendSnapshot {
    pub region_code: Region,
    pub snapshot_date: NaiveDate,
    pub total_views: u64,
    pub avg_views: u64,
    pub top_category: String,
    pub top_video_id: Option<String>,
    pub top_video_title: Option<String>,
    pub video_count: u64,
    pub category_breakdown: Vec<CategoryShare>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryShare {
    pub category: String,
    pub count: u64,
    pub percentage: u32,
}

// ============ Wire shapes ============

/// One entry in the `GET /trends` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub platform: String,
    pub category: String,
    pub image_url: String,
    pub stats: String,
    pub volume: u32,
    pub link: String,
    pub tags: Vec<String>,
    pub video_category: String,
    pub view_count: u64,
    pub country_flag: String,
}

impl TrendItem {
    pub fn from_record(record: &VideoRecord) -> TrendItem {
        TrendItem {
            id: record.video_id.clone(),
            title: record.title.clone(),
            description: record.description.clone(),
            platform: "YouTube".to_string(),
            category: record.region_code.label().to_string(),
            image_url: record.thumbnail_url.clone(),
            stats: format!("{} views", format_views(record.view_count)),
            volume: record.vibe_score,
            link: format!("https://www.youtube.com/watch?v={}", record.video_id),
            tags: record.tags.clone(),
            video_category: record.category_name.clone(),
            view_count: record.view_count,
            country_flag: record.region_code.flag().to_string(),
        }
    }
}

/// `GET /trends` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendsResponse {
    pub trends: Vec<TrendItem>,
    pub global_insight: String,
}

/// `POST /analyze-keyword` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    pub keyword: String,
    pub region_code: Region,
    pub vibe_score: u32,
    pub summary: String,
    pub insights: Vec<String>,
    pub opportunities: Vec<String>,
    pub risks: Vec<String>,
    pub aggregated_data: Option<AggregatedStats>,
    pub videos: Vec<VideoRecord>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub from_cache: bool,
}

fn is_false(b: &bool) -> bool {
    !b
}

impl AnalysisResponse {
    pub fn from_analysis(analysis: KeywordAnalysis, from_cache: bool) -> AnalysisResponse {
        AnalysisResponse {
            keyword: analysis.keyword,
            region_code: analysis.region_code,
            vibe_score: analysis.vibe_score,
            summary: analysis.summary,
            insights: analysis.insights,
            opportunities: analysis.opportunities,
            risks: analysis.risks,
            aggregated_data: analysis.aggregated_data,
            videos: analysis.videos,
            from_cache,
        }
    }
}

/// Format a view count for display: `1.2B`, `3.4M`, `12.5K`, or plain.
pub fn format_views(views: u64) -> String {
    if views >= 1_000_000_000 {
        format!("{:.1}B", views as f64 / 1_000_000_000.0)
    } else if views >= 1_000_000 {
        format!("{:.1}M", views as f64 / 1_000_000.0)
    } else if views >= 1_000 {
        format!("{:.1}K", views as f64 / 1_000.0)
    } else {
        views.to_string()
    }
}

/// Format an integer with thousands separators, e.g. `1,234,567`.
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

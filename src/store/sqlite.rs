//! SQLite-backed [`TrendStore`] implementation.
//!
//! Timestamps are stored as unix milliseconds, list and object fields as
//! JSON text columns. Every write is an append or a natural-key upsert.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::models::{
    CacheMetadata, CacheStatus, KeywordAnalysis, Region, TrendSnapshot, VideoRecord,
};

use super::TrendStore;

/// SQLite implementation of the [`TrendStore`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn to_millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| anyhow!("timestamp out of range: {ms}"))
}

fn row_to_record(row: &SqliteRow) -> Result<VideoRecord> {
    let region_code: String = row.get("region_code");
    let region = Region::parse(&region_code)
        .ok_or_else(|| anyhow!("unknown region code in store: {region_code}"))?;

    let tags: Vec<String> =
        serde_json::from_str(row.get::<&str, _>("tags")).unwrap_or_default();

    Ok(VideoRecord {
        video_id: row.get("video_id"),
        region_code: region,
        title: row.get("title"),
        description: row.get("description"),
        channel_title: row.get("channel_title"),
        published_at: from_millis(row.get("published_at"))?,
        thumbnail_url: row.get("thumbnail_url"),
        category_id: row.get("video_category_id"),
        category_name: row.get("video_category_name"),
        tags,
        view_count: row.get::<i64, _>("view_count") as u64,
        like_count: row.get::<i64, _>("like_count") as u64,
        comment_count: row.get::<i64, _>("comment_count") as u64,
        rank: row
            .get::<Option<i64>, _>("trending_rank")
            .map(|r| r as u32),
        vibe_score: row.get::<i64, _>("vibe_score") as u32,
        fetched_at: from_millis(row.get("fetched_at"))?,
    })
}

fn row_to_analysis(row: &SqliteRow) -> Result<KeywordAnalysis> {
    let region_code: String = row.get("region_code");
    let region = Region::parse(&region_code)
        .ok_or_else(|| anyhow!("unknown region code in store: {region_code}"))?;

    Ok(KeywordAnalysis {
        keyword: row.get("keyword"),
        region_code: region,
        vibe_score: row.get::<i64, _>("vibe_score") as u32,
        summary: row.get("summary"),
        insights: serde_json::from_str(row.get::<&str, _>("insights")).unwrap_or_default(),
        opportunities: serde_json::from_str(row.get::<&str, _>("opportunities"))
            .unwrap_or_default(),
        risks: serde_json::from_str(row.get::<&str, _>("risks")).unwrap_or_default(),
        aggregated_data: row
            .get::<Option<&str>, _>("aggregated_data")
            .and_then(|json| serde_json::from_str(json).ok()),
        videos: serde_json::from_str(row.get::<&str, _>("videos")).unwrap_or_default(),
        analyzed_at: from_millis(row.get("analyzed_at"))?,
        expires_at: from_millis(row.get("expires_at"))?,
    })
}

#[async_trait]
impl TrendStore for SqliteStore {
    async fn insert_batch(&self, records: &[VideoRecord]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for record in records {
            sqlx::query(
                r#"
                INSERT INTO trending_videos
                    (video_id, region_code, title, description, channel_title,
                     published_at, thumbnail_url, video_category_id, video_category_name,
                     tags, view_count, like_count, comment_count,
                     trending_rank, vibe_score, fetched_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&record.video_id)
            .bind(record.region_code.code())
            .bind(&record.title)
            .bind(&record.description)
            .bind(&record.channel_title)
            .bind(to_millis(record.published_at))
            .bind(&record.thumbnail_url)
            .bind(&record.category_id)
            .bind(&record.category_name)
            .bind(serde_json::to_string(&record.tags)?)
            .bind(record.view_count as i64)
            .bind(record.like_count as i64)
            .bind(record.comment_count as i64)
            .bind(record.rank.map(|r| r as i64))
            .bind(record.vibe_score as i64)
            .bind(to_millis(record.fetched_at))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn latest_batch(&self, region: Region) -> Result<Vec<VideoRecord>> {
        let latest: Option<i64> = sqlx::query_scalar(
            "SELECT MAX(fetched_at) FROM trending_videos WHERE region_code = ?",
        )
        .bind(region.code())
        .fetch_one(&self.pool)
        .await?;

        let Some(latest) = latest else {
            return Ok(Vec::new());
        };

        let rows = sqlx::query(
            r#"
            SELECT * FROM trending_videos
            WHERE region_code = ? AND fetched_at = ?
            ORDER BY trending_rank ASC
            "#,
        )
        .bind(region.code())
        .bind(latest)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_record).collect()
    }

    async fn get_cache_metadata(&self, cache_key: &str) -> Result<Option<CacheMetadata>> {
        let row = sqlx::query("SELECT * FROM cache_metadata WHERE cache_key = ?")
            .bind(cache_key)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| {
            Ok(CacheMetadata {
                cache_key: row.get("cache_key"),
                last_refreshed: from_millis(row.get("last_refreshed"))?,
                next_refresh: from_millis(row.get("next_refresh"))?,
                status: CacheStatus::parse(row.get::<&str, _>("status")),
            })
        })
        .transpose()
    }

    async fn upsert_cache_metadata(&self, meta: &CacheMetadata) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO cache_metadata (cache_key, last_refreshed, next_refresh, status)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(cache_key) DO UPDATE SET
                last_refreshed = excluded.last_refreshed,
                next_refresh = excluded.next_refresh,
                status = excluded.status
            "#,
        )
        .bind(&meta.cache_key)
        .bind(to_millis(meta.last_refreshed))
        .bind(to_millis(meta.next_refresh))
        .bind(meta.status.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_keyword_analysis(
        &self,
        keyword: &str,
        region: Region,
        now: DateTime<Utc>,
    ) -> Result<Option<KeywordAnalysis>> {
        let row = sqlx::query(
            r#"
            SELECT * FROM keyword_analyses
            WHERE keyword = ? AND region_code = ? AND expires_at > ?
            "#,
        )
        .bind(keyword)
        .bind(region.code())
        .bind(to_millis(now))
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_analysis).transpose()
    }

    async fn upsert_keyword_analysis(&self, analysis: &KeywordAnalysis) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO keyword_analyses
                (keyword, region_code, vibe_score, summary, insights, opportunities,
                 risks, aggregated_data, videos, analyzed_at, expires_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(keyword, region_code) DO UPDATE SET
                vibe_score = excluded.vibe_score,
                summary = excluded.summary,
                insights = excluded.insights,
                opportunities = excluded.opportunities,
                risks = excluded.risks,
                aggregated_data = excluded.aggregated_data,
                videos = excluded.videos,
                analyzed_at = excluded.analyzed_at,
                expires_at = excluded.expires_at
            "#,
        )
        .bind(&analysis.keyword)
        .bind(analysis.region_code.code())
        .bind(analysis.vibe_score as i64)
        .bind(&analysis.summary)
        .bind(serde_json::to_string(&analysis.insights)?)
        .bind(serde_json::to_string(&analysis.opportunities)?)
        .bind(serde_json::to_string(&analysis.risks)?)
        .bind(
            analysis
                .aggregated_data
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?,
        )
        .bind(serde_json::to_string(&analysis.videos)?)
        .bind(to_millis(analysis.analyzed_at))
        .bind(to_millis(analysis.expires_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_expired_analyses(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM keyword_analyses WHERE expires_at < ?")
            .bind(to_millis(now))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn purge_records_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM trending_videos WHERE fetched_at < ?")
            .bind(to_millis(cutoff))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn upsert_snapshot(&self, snapshot: &TrendSnapshot) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO trend_snapshots
                (region_code, snapshot_date, total_views, avg_views, top_category,
                 top_video_id, top_video_title, video_count, category_breakdown)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(region_code, snapshot_date) DO UPDATE SET
                total_views = excluded.total_views,
                avg_views = excluded.avg_views,
                top_category = excluded.top_category,
                top_video_id = excluded.top_video_id,
                top_video_title = excluded.top_video_title,
                video_count = excluded.video_count,
                category_breakdown = excluded.category_breakdown
            "#,
        )
        .bind(snapshot.region_code.code())
        .bind(snapshot.snapshot_date.format("%Y-%m-%d").to_string())
        .bind(snapshot.total_views as i64)
        .bind(snapshot.avg_views as i64)
        .bind(&snapshot.top_category)
        .bind(&snapshot.top_video_id)
        .bind(&snapshot.top_video_title)
        .bind(snapshot.video_count as i64)
        .bind(serde_json::to_string(&snapshot.category_breakdown)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

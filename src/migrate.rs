use anyhow::Result;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    // Append-only trending observations; one batch per (region, fetched_at)
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS trending_videos (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            video_id TEXT NOT NULL,
            region_code TEXT NOT NULL,
            title TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT '',
            channel_title TEXT NOT NULL DEFAULT '',
            published_at INTEGER NOT NULL,
            thumbnail_url TEXT NOT NULL DEFAULT '',
            video_category_id TEXT NOT NULL DEFAULT '',
            video_category_name TEXT NOT NULL DEFAULT '',
            tags TEXT NOT NULL DEFAULT '[]',
            view_count INTEGER NOT NULL DEFAULT 0,
            like_count INTEGER NOT NULL DEFAULT 0,
            comment_count INTEGER NOT NULL DEFAULT 0,
            trending_rank INTEGER,
            vibe_score INTEGER NOT NULL DEFAULT 0,
            fetched_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(&pool)
    .await?;

    // Freshness bookkeeping, one row per cache key
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS cache_metadata (
            cache_key TEXT PRIMARY KEY,
            last_refreshed INTEGER NOT NULL,
            next_refresh INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'ok'
        )
        "#,
    )
    .execute(&pool)
    .await?;

    // Keyword analyses, upserted per (keyword, region)
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS keyword_analyses (
            keyword TEXT NOT NULL,
            region_code TEXT NOT NULL,
            vibe_score INTEGER NOT NULL DEFAULT 0,
            summary TEXT NOT NULL DEFAULT '',
            insights TEXT NOT NULL DEFAULT '[]',
            opportunities TEXT NOT NULL DEFAULT '[]',
            risks TEXT NOT NULL DEFAULT '[]',
            aggregated_data TEXT,
            videos TEXT NOT NULL DEFAULT '[]',
            analyzed_at INTEGER NOT NULL,
            expires_at INTEGER NOT NULL,
            PRIMARY KEY (keyword, region_code)
        )
        "#,
    )
    .execute(&pool)
    .await?;

    // Daily rollups, upserted per (region, date)
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS trend_snapshots (
            region_code TEXT NOT NULL,
            snapshot_date TEXT NOT NULL,
            total_views INTEGER NOT NULL DEFAULT 0,
            avg_views INTEGER NOT NULL DEFAULT 0,
            top_category TEXT NOT NULL DEFAULT '',
            top_video_id TEXT,
            top_video_title TEXT,
            video_count INTEGER NOT NULL DEFAULT 0,
            category_breakdown TEXT NOT NULL DEFAULT '[]',
            PRIMARY KEY (region_code, snapshot_date)
        )
        "#,
    )
    .execute(&pool)
    .await?;

    // Create indexes
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_trending_region_fetched ON trending_videos(region_code, fetched_at DESC, trending_rank)",
    )
    .execute(&pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_keyword_analyses_expires ON keyword_analyses(expires_at)",
    )
    .execute(&pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_trending_fetched ON trending_videos(fetched_at)")
        .execute(&pool)
        .await?;

    pool.close().await;
    Ok(())
}

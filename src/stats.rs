//! Database statistics and health overview.
//!
//! Provides a quick summary of what's cached: record and analysis counts,
//! per-region batch freshness, and snapshot coverage. Used by
//! `vibescope stats` to give confidence that refreshes and the janitor are
//! working as expected.

use anyhow::Result;
use sqlx::Row;

use crate::config::Config;
use crate::db;
use crate::models::Region;

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    let total_records: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM trending_videos")
        .fetch_one(&pool)
        .await?;

    let total_analyses: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM keyword_analyses")
        .fetch_one(&pool)
        .await?;

    let total_snapshots: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM trend_snapshots")
        .fetch_one(&pool)
        .await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("vibescope — Database Stats");
    println!("==========================");
    println!();
    println!("  Database:   {}", config.db.path.display());
    println!("  Size:       {}", format_bytes(db_size));
    println!();
    println!("  Records:    {}", total_records);
    println!("  Analyses:   {}", total_analyses);
    println!("  Snapshots:  {}", total_snapshots);

    // Per-region freshness from cache_metadata
    let meta_rows = sqlx::query("SELECT cache_key, last_refreshed, status FROM cache_metadata")
        .fetch_all(&pool)
        .await?;

    println!();
    println!("  By region:");
    println!("  {:<8} {:>8} {:<8} {}", "REGION", "RECORDS", "STATUS", "LAST REFRESH");
    println!("  {}", "-".repeat(52));

    for region in Region::ALL {
        let record_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM trending_videos WHERE region_code = ?")
                .bind(region.code())
                .fetch_one(&pool)
                .await?;

        let meta = meta_rows.iter().find(|row| {
            let key: String = row.get("cache_key");
            key == region.cache_key()
        });

        let (status, refreshed) = match meta {
            Some(row) => (
                row.get::<String, _>("status"),
                format_ts_relative(row.get::<i64, _>("last_refreshed") / 1000),
            ),
            None => ("-".to_string(), "never".to_string()),
        };

        println!(
            "  {:<8} {:>8} {:<8} {}",
            region.code(),
            record_count,
            status,
            refreshed
        );
    }

    println!();

    pool.close().await;
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Format a Unix timestamp as a relative time string (e.g. "3 hours ago").
fn format_ts_relative(ts: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let delta = now - ts;

    if delta < 0 {
        return format_ts_iso(ts);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        format_ts_iso(ts)
    }
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}

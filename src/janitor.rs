//! Retention janitor.
//!
//! Runs three independent, best-effort steps on each externally scheduled
//! invocation: roll the latest batch of every region into a daily snapshot,
//! drop expired keyword analyses, and purge raw records past the retention
//! window. A failing step is recorded in the report and never blocks the
//! others.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use crate::config::RetentionConfig;
use crate::models::{CategoryShare, Region, TrendSnapshot, VideoRecord};
use crate::store::TrendStore;

pub struct RetentionJanitor {
    store: Arc<dyn TrendStore>,
    purge_after: Duration,
}

impl RetentionJanitor {
    pub fn new(store: Arc<dyn TrendStore>, config: &RetentionConfig) -> Self {
        Self {
            store,
            purge_after: Duration::days(config.purge_after_days),
        }
    }

    /// Run all steps once, collecting one outcome line per step.
    pub async fn run(&self) -> Vec<String> {
        let now = Utc::now();
        let mut results = Vec::new();

        for region in Region::ALL {
            results.push(self.snapshot_region(region, now).await);
        }

        match self.store.delete_expired_analyses(now).await {
            Ok(removed) => results.push(format!("Expired keyword analyses cleaned: {removed}.")),
            Err(e) => results.push(format!("Keyword cleanup error: {e}")),
        }

        let cutoff = now - self.purge_after;
        match self.store.purge_records_before(cutoff).await {
            Ok(removed) => results.push(format!(
                "Old trending videos purged ({}+ days): {removed}.",
                self.purge_after.num_days()
            )),
            Err(e) => results.push(format!("Purge error: {e}")),
        }

        tracing::info!(steps = results.len(), "retention run finished");
        results
    }

    async fn snapshot_region(&self, region: Region, now: DateTime<Utc>) -> String {
        let batch = match self.store.latest_batch(region).await {
            Ok(batch) => batch,
            Err(e) => return format!("{}: Snapshot error - {e}", region.code()),
        };

        if batch.is_empty() {
            return format!("{}: No cached data, skipped snapshot.", region.code());
        }

        let snapshot = build_snapshot(region, now.date_naive(), &batch);
        match self.store.upsert_snapshot(&snapshot).await {
            Ok(()) => format!("{}: Snapshot saved.", region.code()),
            Err(e) => format!("{}: Snapshot error - {e}", region.code()),
        }
    }
}

/// Roll one batch into a daily snapshot. The batch is rank-ordered, so its
/// first record is the chart leader.
fn build_snapshot(
    region: Region,
    date: chrono::NaiveDate,
    batch: &[VideoRecord],
) -> TrendSnapshot {
    let video_count = batch.len() as u64;
    let total_views: u64 = batch.iter().map(|v| v.view_count).sum();
    let avg_views = (total_views as f64 / video_count as f64).round() as u64;

    // Category counts in first-seen order; stable sort keeps that order on ties.
    let mut categories: Vec<CategoryShare> = Vec::new();
    for video in batch {
        match categories
            .iter_mut()
            .find(|c| c.category == video.category_name)
        {
            Some(c) => c.count += 1,
            None => categories.push(CategoryShare {
                category: video.category_name.clone(),
                count: 1,
                percentage: 0,
            }),
        }
    }
    categories.sort_by(|a, b| b.count.cmp(&a.count));
    for share in &mut categories {
        share.percentage = ((share.count as f64 / video_count as f64) * 100.0).round() as u32;
    }

    let top_category = categories
        .first()
        .map(|c| c.category.clone())
        .unwrap_or_else(|| "Other".to_string());
    let top_video = batch.first();

    TrendSnapshot {
        region_code: region,
        snapshot_date: date,
        total_views,
        avg_views,
        top_category,
        top_video_id: top_video.map(|v| v.video_id.clone()),
        top_video_title: top_video.map(|v| v.title.clone()),
        video_count,
        category_breakdown: categories,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn video(id: &str, category: &str, views: u64) -> VideoRecord {
        let now = Utc::now();
        VideoRecord {
            video_id: id.to_string(),
            region_code: Region::KR,
            title: format!("video {id}"),
            description: String::new(),
            channel_title: "ch".to_string(),
            published_at: now,
            thumbnail_url: String::new(),
            category_id: String::new(),
            category_name: category.to_string(),
            tags: Vec::new(),
            view_count: views,
            like_count: 0,
            comment_count: 0,
            rank: Some(0),
            vibe_score: 0,
            fetched_at: now,
        }
    }

    #[test]
    fn test_snapshot_rollup() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 7).unwrap();
        let batch = vec![
            video("a", "Music", 300),
            video("b", "Gaming", 100),
            video("c", "Music", 200),
        ];

        let snapshot = build_snapshot(Region::KR, date, &batch);
        assert_eq!(snapshot.video_count, 3);
        assert_eq!(snapshot.total_views, 600);
        assert_eq!(snapshot.avg_views, 200);
        assert_eq!(snapshot.top_category, "Music");
        assert_eq!(snapshot.top_video_id.as_deref(), Some("a"));

        assert_eq!(snapshot.category_breakdown.len(), 2);
        assert_eq!(snapshot.category_breakdown[0].category, "Music");
        assert_eq!(snapshot.category_breakdown[0].count, 2);
        // 2/3 -> 66.7 rounds to 67, 1/3 -> 33.
        assert_eq!(snapshot.category_breakdown[0].percentage, 67);
        assert_eq!(snapshot.category_breakdown[1].percentage, 33);
    }

    #[test]
    fn test_snapshot_category_tie_keeps_first_seen_order() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 7).unwrap();
        let batch = vec![video("a", "Comedy", 1), video("b", "Sports", 1)];

        let snapshot = build_snapshot(Region::JP, date, &batch);
        assert_eq!(snapshot.top_category, "Comedy");
        assert_eq!(snapshot.category_breakdown[1].category, "Sports");
    }
}

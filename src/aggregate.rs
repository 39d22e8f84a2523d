//! Reduction of a video list into [`AggregatedStats`].
//!
//! `reduce` is a pure function of its inputs (the record list and the
//! reference instant), so the same multiset of records always produces the
//! same output regardless of arrival order, modulo the documented tie-breaks.

use chrono::{DateTime, Duration, Utc};

use crate::models::{AggregatedStats, ChannelStat, VideoRecord};

/// Window for the recent-upload rate.
const RECENT_WINDOW_DAYS: i64 = 7;

const TOP_CHANNELS: usize = 5;
const TOP_VIDEOS: usize = 10;

/// Reduce a list of records into summary statistics.
///
/// Empty input yields the all-zero value: no division by zero, `max_views`
/// and `min_views` both 0, empty top lists.
pub fn reduce(videos: &[VideoRecord], now: DateTime<Utc>) -> AggregatedStats {
    let total_videos = videos.len() as u64;
    let total_views: u64 = videos.iter().map(|v| v.view_count).sum();
    let total_likes: u64 = videos.iter().map(|v| v.like_count).sum();
    let total_comments: u64 = videos.iter().map(|v| v.comment_count).sum();

    let avg_views = rounded_avg(total_views, total_videos);
    let avg_likes = rounded_avg(total_likes, total_videos);
    let avg_comments = rounded_avg(total_comments, total_videos);

    let max_views = videos.iter().map(|v| v.view_count).max().unwrap_or(0);
    let min_views = videos.iter().map(|v| v.view_count).min().unwrap_or(0);

    // Channel rollup in first-seen order; the stable sort keeps that order
    // among equal totals.
    let mut channels: Vec<ChannelStat> = Vec::new();
    for video in videos {
        match channels.iter_mut().find(|c| c.name == video.channel_title) {
            Some(c) => {
                c.video_count += 1;
                c.total_views += video.view_count;
            }
            None => channels.push(ChannelStat {
                name: video.channel_title.clone(),
                video_count: 1,
                total_views: video.view_count,
            }),
        }
    }
    channels.sort_by(|a, b| b.total_views.cmp(&a.total_views));
    channels.truncate(TOP_CHANNELS);

    let mut top_videos: Vec<VideoRecord> = videos.to_vec();
    top_videos.sort_by(|a, b| b.view_count.cmp(&a.view_count));
    top_videos.truncate(TOP_VIDEOS);

    let cutoff = now - Duration::days(RECENT_WINDOW_DAYS);
    let recent = videos.iter().filter(|v| v.published_at > cutoff).count() as u64;
    let recent_upload_rate = if total_videos > 0 {
        ((recent as f64 / total_videos as f64) * 100.0).round() as u32
    } else {
        0
    };

    AggregatedStats {
        total_videos,
        total_views,
        total_likes,
        total_comments,
        avg_views,
        avg_likes,
        avg_comments,
        max_views,
        min_views,
        top_channels: channels,
        top_videos,
        recent_upload_rate,
    }
}

/// Integer average, rounded half away from zero.
fn rounded_avg(total: u64, count: u64) -> u64 {
    if count == 0 {
        0
    } else {
        (total as f64 / count as f64).round() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Region;

    fn video(id: &str, channel: &str, views: u64, days_old: i64) -> VideoRecord {
        let now = Utc::now();
        VideoRecord {
            video_id: id.to_string(),
            region_code: Region::KR,
            title: format!("video {id}"),
            description: String::new(),
            channel_title: channel.to_string(),
            published_at: now - Duration::days(days_old),
            thumbnail_url: String::new(),
            category_id: "24".to_string(),
            category_name: "Entertainment".to_string(),
            tags: Vec::new(),
            view_count: views,
            like_count: views / 100,
            comment_count: views / 1000,
            rank: None,
            vibe_score: 0,
            fetched_at: now,
        }
    }

    #[test]
    fn test_empty_input_is_all_zero() {
        let stats = reduce(&[], Utc::now());
        assert_eq!(stats.total_videos, 0);
        assert_eq!(stats.total_views, 0);
        assert_eq!(stats.avg_views, 0);
        assert_eq!(stats.max_views, 0);
        assert_eq!(stats.min_views, 0);
        assert_eq!(stats.recent_upload_rate, 0);
        assert!(stats.top_channels.is_empty());
        assert!(stats.top_videos.is_empty());
    }

    #[test]
    fn test_totals_and_rounded_averages() {
        let videos = vec![
            video("a", "ch1", 100, 1),
            video("b", "ch1", 101, 1),
        ];
        let stats = reduce(&videos, Utc::now());
        assert_eq!(stats.total_videos, 2);
        assert_eq!(stats.total_views, 201);
        // 100.5 rounds half away from zero to 101.
        assert_eq!(stats.avg_views, 101);
        assert_eq!(stats.max_views, 101);
        assert_eq!(stats.min_views, 100);
    }

    #[test]
    fn test_top_channels_sorted_by_total_views() {
        let videos = vec![
            video("a", "small", 10, 1),
            video("b", "big", 500, 1),
            video("c", "big", 500, 1),
            video("d", "mid", 300, 1),
        ];
        let stats = reduce(&videos, Utc::now());
        let names: Vec<&str> = stats.top_channels.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["big", "mid", "small"]);
        assert_eq!(stats.top_channels[0].video_count, 2);
        assert_eq!(stats.top_channels[0].total_views, 1000);
    }

    #[test]
    fn test_top_channels_tie_break_is_first_seen_order() {
        let videos = vec![
            video("a", "first", 100, 1),
            video("b", "second", 100, 1),
            video("c", "third", 100, 1),
        ];
        let stats = reduce(&videos, Utc::now());
        let names: Vec<&str> = stats.top_channels.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_top_channels_capped_at_five() {
        let videos: Vec<VideoRecord> = (0..8)
            .map(|i| video(&format!("v{i}"), &format!("ch{i}"), 1000 - i as u64, 1))
            .collect();
        let stats = reduce(&videos, Utc::now());
        assert_eq!(stats.top_channels.len(), 5);
        assert_eq!(stats.top_channels[0].name, "ch0");
    }

    #[test]
    fn test_top_videos_stable_order_on_ties() {
        let videos = vec![
            video("a", "ch", 200, 1),
            video("b", "ch", 500, 1),
            video("c", "ch", 200, 1),
        ];
        let stats = reduce(&videos, Utc::now());
        let ids: Vec<&str> = stats.top_videos.iter().map(|v| v.video_id.as_str()).collect();
        // b first, then a and c in input order.
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_top_videos_capped_at_ten() {
        let videos: Vec<VideoRecord> = (0..15)
            .map(|i| video(&format!("v{i}"), "ch", i as u64, 1))
            .collect();
        let stats = reduce(&videos, Utc::now());
        assert_eq!(stats.top_videos.len(), 10);
        assert_eq!(stats.top_videos[0].video_id, "v14");
    }

    #[test]
    fn test_permutation_determinism() {
        let a = video("a", "ch1", 500, 1);
        let b = video("b", "ch2", 300, 10);
        let c = video("c", "ch1", 301, 2);
        let now = Utc::now();

        let forward = reduce(&[a.clone(), b.clone(), c.clone()], now);
        let backward = reduce(&[c, b, a], now);

        assert_eq!(forward.total_views, backward.total_views);
        assert_eq!(forward.avg_views, backward.avg_views);
        assert_eq!(forward.recent_upload_rate, backward.recent_upload_rate);
        let f_ids: Vec<&str> = forward.top_videos.iter().map(|v| v.video_id.as_str()).collect();
        let b_ids: Vec<&str> = backward.top_videos.iter().map(|v| v.video_id.as_str()).collect();
        // No view-count ties, so ordering is identical across permutations.
        assert_eq!(f_ids, b_ids);
    }

    #[test]
    fn test_recent_upload_rate() {
        let videos = vec![
            video("a", "ch", 1, 1),
            video("b", "ch", 1, 2),
            video("c", "ch", 1, 30),
        ];
        let stats = reduce(&videos, Utc::now());
        // 2 of 3 within the last 7 days -> 66.7 rounds to 67.
        assert_eq!(stats.recent_upload_rate, 67);
    }
}

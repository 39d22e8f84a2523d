//! Narrative annotation of aggregated keyword statistics.
//!
//! [`AnnotationService::annotate`] asks the configured text-generation model
//! for a structured JSON annotation (score, summary, insight lists). The
//! fallback boundary lives here and nowhere else: a missing credential, a
//! failed call, or an unparsable reply all degrade to the deterministic
//! heuristic built from [`keyword_vibe_score`] and templated strings, so the
//! endpoint keeps answering when the model does not.
//!
//! Models tend to wrap JSON in prose or code fences, so the reply is scanned
//! for the first balanced `{...}` span before parsing.

use serde::Deserialize;
use std::time::Duration;

use crate::config::{self, ModelConfig};
use crate::error::TrendError;
use crate::models::{format_count, AggregatedStats, Annotation, Region};
use crate::score::keyword_vibe_score;

pub struct AnnotationService {
    client: reqwest::Client,
    config: ModelConfig,
    api_key: Option<String>,
}

impl AnnotationService {
    /// Build the service from configuration, reading `GEMINI_API_KEY` from
    /// the environment. An absent key is not an error: it selects the
    /// fallback path.
    pub fn new(config: &ModelConfig) -> Result<Self, TrendError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            config: config.clone(),
            api_key: config::model_api_key(),
        })
    }

    /// A service that never calls the model. Used in tests and by
    /// deployments that opt out of the model entirely.
    pub fn disabled(config: &ModelConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config: config.clone(),
            api_key: None,
        }
    }

    /// Annotate aggregated stats. Never fails: every model problem degrades
    /// to the heuristic annotation.
    pub async fn annotate(
        &self,
        keyword: &str,
        region: Region,
        stats: &AggregatedStats,
    ) -> Annotation {
        let Some(key) = self.api_key.clone() else {
            return fallback_annotation(keyword, stats);
        };

        match self.annotate_with_model(&key, keyword, region, stats).await {
            Ok(annotation) => annotation,
            Err(e) => {
                tracing::warn!(keyword, "model annotation failed, using heuristic fallback: {e}");
                fallback_annotation(keyword, stats)
            }
        }
    }

    async fn annotate_with_model(
        &self,
        key: &str,
        keyword: &str,
        region: Region,
        stats: &AggregatedStats,
    ) -> Result<Annotation, TrendError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.api_base, self.config.model
        );

        let body = serde_json::json!({
            "contents": [{"parts": [{"text": build_prompt(keyword, region, stats)}]}],
            "generationConfig": {
                "temperature": self.config.temperature,
                "maxOutputTokens": self.config.max_output_tokens,
            },
        });

        let response = self
            .client
            .post(&url)
            .query(&[("key", key)])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TrendError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let json: serde_json::Value = response.json().await?;
        let text = json
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(|v| v.as_str())
            .ok_or_else(|| TrendError::ModelParse {
                reason: "response carried no candidate text".to_string(),
            })?;

        parse_model_reply(text)
    }
}

/// Parse a model reply into a clamped [`Annotation`].
fn parse_model_reply(text: &str) -> Result<Annotation, TrendError> {
    let span = extract_json_object(text).ok_or_else(|| TrendError::ModelParse {
        reason: "no balanced JSON object in reply".to_string(),
    })?;

    let raw: RawAnnotation =
        serde_json::from_str(span).map_err(|e| TrendError::ModelParse {
            reason: e.to_string(),
        })?;

    Ok(Annotation {
        vibe_score: raw.vibe_score.clamp(0.0, 100.0).round() as u32,
        summary: raw.summary,
        insights: raw.insights,
        opportunities: raw.opportunities,
        risks: raw.risks,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAnnotation {
    vibe_score: f64,
    summary: String,
    #[serde(default)]
    insights: Vec<String>,
    #[serde(default)]
    opportunities: Vec<String>,
    #[serde(default)]
    risks: Vec<String>,
}

/// Locate the first balanced `{...}` span, skipping braces inside strings.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

fn build_prompt(keyword: &str, region: Region, stats: &AggregatedStats) -> String {
    let channels = stats
        .top_channels
        .iter()
        .map(|c| {
            format!(
                "{} ({} videos, {} views)",
                c.name,
                c.video_count,
                format_count(c.total_views)
            )
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"You are a YouTube trend analyst. Analyze the following YouTube search data for the keyword "{keyword}" in region "{region}".

Data:
- Total videos analyzed: {total}
- Total views: {total_views}
- Average views per video: {avg_views}
- Average likes per video: {avg_likes}
- Average comments per video: {avg_comments}
- Max views on a single video: {max_views}
- Min views: {min_views}
- Recent upload rate (last 7 days): {recent}%
- Top channels: {channels}

Respond with a JSON object (no markdown, no code blocks, just raw JSON):
{{
  "vibeScore": <number 0-100, representing how trendy/viral this keyword is>,
  "summary": "<1-2 sentence summary of the trend>",
  "insights": ["<insight 1>", "<insight 2>", "<insight 3>"],
  "opportunities": ["<opportunity 1>", "<opportunity 2>"],
  "risks": ["<risk 1>", "<risk 2>"]
}}

Scoring guide:
- 80-100: Extremely viral, massive engagement
- 60-79: Strong trend, good engagement
- 40-59: Moderate interest
- 20-39: Low interest
- 0-19: Very niche or declining"#,
        keyword = keyword,
        region = region.code(),
        total = stats.total_videos,
        total_views = format_count(stats.total_views),
        avg_views = format_count(stats.avg_views),
        avg_likes = format_count(stats.avg_likes),
        avg_comments = format_count(stats.avg_comments),
        max_views = format_count(stats.max_views),
        min_views = format_count(stats.min_views),
        recent = stats.recent_upload_rate,
        channels = channels,
    )
}

/// Deterministic annotation from the heuristic score and templated strings.
pub fn fallback_annotation(keyword: &str, stats: &AggregatedStats) -> Annotation {
    let score = keyword_vibe_score(stats);

    let level = if score >= 80 {
        "very high"
    } else if score >= 60 {
        "high"
    } else if score >= 40 {
        "moderate"
    } else if score >= 20 {
        "low"
    } else {
        "very low"
    };

    let summary = format!(
        "\"{}\" is currently drawing {} interest. Average views {} per video, {}% of videos uploaded in the last 7 days.",
        keyword,
        level,
        format_count(stats.avg_views),
        stats.recent_upload_rate,
    );

    let top_channels = if stats.top_channels.is_empty() {
        "no channel data".to_string()
    } else {
        stats
            .top_channels
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };

    let insights = vec![
        format!("Average views: {}", format_count(stats.avg_views)),
        format!("Average likes: {}", format_count(stats.avg_likes)),
        format!("Top channels: {top_channels}"),
    ];

    let opportunities = vec![if stats.recent_upload_rate > 20 {
        "Uploads are active right now, so it is a good moment to join the trend.".to_string()
    } else {
        "Competition is light, leaving room to claim the topic early.".to_string()
    }];

    let risks = vec![if stats.avg_views < 10_000 {
        "Overall interest is low, so growth may be slow.".to_string()
    } else {
        "Competition is heavy; a differentiation angle is needed.".to_string()
    }];

    Annotation {
        vibe_score: score,
        summary,
        insights,
        opportunities,
        risks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(avg_views: u64, recent_rate: u32) -> AggregatedStats {
        AggregatedStats {
            total_videos: 10,
            total_views: avg_views * 10,
            total_likes: 0,
            total_comments: 0,
            avg_views,
            avg_likes: 0,
            avg_comments: 0,
            max_views: avg_views,
            min_views: 0,
            top_channels: Vec::new(),
            top_videos: Vec::new(),
            recent_upload_rate: recent_rate,
        }
    }

    #[test]
    fn test_extract_plain_object() {
        assert_eq!(extract_json_object(r#"{"a": 1}"#), Some(r#"{"a": 1}"#));
    }

    #[test]
    fn test_extract_skips_surrounding_prose_and_fences() {
        let reply = "Sure! Here is the analysis:\n```json\n{\"vibeScore\": 72}\n```\nHope it helps.";
        assert_eq!(extract_json_object(reply), Some("{\"vibeScore\": 72}"));
    }

    #[test]
    fn test_extract_handles_nested_and_string_braces() {
        let reply = r#"prefix {"a": {"b": "}"}, "c": 2} suffix {"d": 3}"#;
        assert_eq!(extract_json_object(reply), Some(r#"{"a": {"b": "}"}, "c": 2}"#));
    }

    #[test]
    fn test_extract_rejects_unbalanced() {
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object(r#"{"a": 1"#), None);
    }

    #[test]
    fn test_parse_model_reply_clamps_score() {
        let annotation =
            parse_model_reply(r#"{"vibeScore": 250, "summary": "s"}"#).unwrap();
        assert_eq!(annotation.vibe_score, 100);

        let annotation =
            parse_model_reply(r#"{"vibeScore": -3.2, "summary": "s"}"#).unwrap();
        assert_eq!(annotation.vibe_score, 0);
    }

    #[test]
    fn test_parse_model_reply_missing_fields_is_parse_error() {
        let err = parse_model_reply(r#"{"score": 10}"#).unwrap_err();
        assert!(matches!(err, TrendError::ModelParse { .. }));
    }

    #[test]
    fn test_fallback_is_well_formed() {
        let annotation = fallback_annotation("lofi beats", &stats(120_000, 40));
        assert!(annotation.vibe_score <= 100);
        assert!(!annotation.insights.is_empty());
        assert!(!annotation.opportunities.is_empty());
        assert!(!annotation.risks.is_empty());
        assert!(annotation.summary.contains("lofi beats"));
    }

    #[test]
    fn test_fallback_summary_reflects_score_band() {
        // avg 120K (28) + engagement 0 (5) + recent 40 (24) = 57 -> "moderate".
        let annotation = fallback_annotation("k", &stats(120_000, 40));
        assert!(annotation.summary.contains("moderate interest"));
        assert!(annotation.summary.contains("120,000"));

        // avg 0 (5) + 5 + 3 = 13 -> "very low".
        let annotation = fallback_annotation("k", &stats(0, 0));
        assert!(annotation.summary.contains("very low interest"));
    }

    #[test]
    fn test_fallback_is_deterministic() {
        let a = fallback_annotation("k", &stats(50_000, 10));
        let b = fallback_annotation("k", &stats(50_000, 10));
        assert_eq!(a.vibe_score, b.vibe_score);
        assert_eq!(a.summary, b.summary);
        assert_eq!(a.insights, b.insights);
    }
}

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use super::SearchResult;
use crate::embed::{Embedder, EmbeddingError};
use crate::repository::RawCandidate;

pub const DEFAULT_TITLE: &str = "Untitled";
pub const DEFAULT_SOURCE: &str = "Unknown Court";
pub const DEFAULT_URL: &str = "";
pub const DEFAULT_JURISDICTION: &str = "Unknown";
/// 2000-01-01T00:00:00Z
const DEFAULT_PUBLISHED_SECS: i64 = 946_684_800;
const PREVIEW_CHARS: usize = 500;

pub fn default_published() -> DateTime<Utc> {
    DateTime::from_timestamp(DEFAULT_PUBLISHED_SECS, 0).unwrap_or_default()
}

/// Cosine of the angle between `a` and `b`.
///
/// Returns 0 for zero-magnitude, empty or mismatched vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        (dot / denom).clamp(-1.0, 1.0) as f32
    }
}

/// Score one candidate against the query vector.
///
/// `Ok(None)` means the candidate has no text or fell below `threshold`.
/// Only an embedding failure is an error.
pub fn score<E: Embedder + ?Sized>(
    embedder: &E,
    candidate: RawCandidate,
    query_vector: &[f32],
    threshold: f32,
) -> Result<Option<SearchResult>, EmbeddingError> {
    let Some(text) = present(candidate.text.as_deref()) else {
        return Ok(None);
    };

    let candidate_vector = embedder.embed(text)?;
    let similarity = cosine_similarity(query_vector, &candidate_vector);
    if similarity.is_nan() || similarity < threshold {
        return Ok(None);
    }

    Ok(Some(normalize(candidate, similarity)))
}

/// Build a result from a scored candidate, filling every missing field with
/// its named default.
pub fn normalize(candidate: RawCandidate, similarity_score: f32) -> SearchResult {
    let content = present(candidate.text.as_deref())
        .map(preview)
        .unwrap_or_default();
    let date_published = present(candidate.date.as_deref())
        .and_then(parse_date)
        .unwrap_or_else(default_published);

    SearchResult {
        title: or_default(candidate.title, DEFAULT_TITLE),
        content,
        source: or_default(candidate.court, DEFAULT_SOURCE),
        url: or_default(candidate.url, DEFAULT_URL),
        similarity_score,
        jurisdiction: or_default(candidate.jurisdiction, DEFAULT_JURISDICTION),
        date_published,
        repository: candidate.repository,
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn or_default(value: Option<String>, default: &str) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}

/// Accepts RFC 3339, `YYYY-MM-DD[T| ]HH:MM:SS` (as UTC) and `YYYY-MM-DD`.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

use serde_json::Value;

use super::FetchError;
use super::types::{FieldMapping, RawCandidate};

/// Pull the records out of a repository response body.
///
/// Fails only when the results array itself is missing; individual records
/// with absent or odd-typed fields still produce a candidate.
pub(super) fn extract_candidates(
    repository: &str,
    fields: &FieldMapping,
    body: &Value,
) -> Result<Vec<RawCandidate>, FetchError> {
    let records = body
        .pointer(&fields.results)
        .and_then(Value::as_array)
        .ok_or_else(|| FetchError::MissingResults(fields.results.clone()))?;

    Ok(records
        .iter()
        .map(|record| RawCandidate {
            repository: repository.to_string(),
            title: text_at(record, &fields.title),
            text: text_at(record, &fields.text),
            court: text_at(record, &fields.court),
            url: text_at(record, &fields.url),
            jurisdiction: text_at(record, &fields.jurisdiction),
            date: text_at(record, &fields.date),
        })
        .collect())
}

fn text_at(record: &Value, pointer: &str) -> Option<String> {
    match record.pointer(pointer)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

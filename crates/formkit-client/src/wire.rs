//! Response bodies and answer normalization
//!
//! The service stores answers as loose JSON. Controllers work with string
//! values only, so remote maps are normalized on the way in.

use crate::service::SubmissionRecord;
use chrono::{DateTime, Utc};
use formkit_core::Answers;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Keys the service keeps next to the answers
const BOOKKEEPING_KEYS: [&str; 5] = ["submissionId", "formId", "createdAt", "updatedAt", "id"];

/// `{ form: { id } }` returned by create
#[derive(Debug, Deserialize)]
pub(crate) struct CreatedEnvelope {
    pub(crate) form: CreatedForm,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreatedForm {
    #[serde(alias = "formId")]
    pub(crate) id: String,
}

/// Convert one JSON value to its stored string form
///
/// Arrays become comma-joined strings (multi-select), scalars are
/// stringified, `null` and nested objects are dropped.
fn value_to_answer(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(value_to_answer)
                .collect::<Vec<_>>()
                .join(","),
        ),
        Value::Null | Value::Object(_) => None,
    }
}

/// Normalize a remote answer object
#[must_use]
pub fn normalize_answers(object: &Map<String, Value>) -> Answers {
    object
        .iter()
        .filter(|(key, _)| !BOOKKEEPING_KEYS.contains(&key.as_str()))
        .filter_map(|(key, value)| value_to_answer(value).map(|v| (key.clone(), v)))
        .collect()
}

/// Normalize the body of a get-submission response
///
/// Accepts the answers either at the top level or under `values`. A body
/// that is `null` means the submission has no saved answers.
#[must_use]
pub fn answers_from_body(body: &Value) -> Answers {
    match body {
        Value::Object(object) => match object.get("values") {
            Some(Value::Object(values)) => normalize_answers(values),
            _ => normalize_answers(object),
        },
        _ => Answers::new(),
    }
}

/// Decode one entry of a list-submissions response
#[must_use]
pub fn record_from_value(value: &Value) -> Option<SubmissionRecord> {
    let object = value.as_object()?;
    let submission_id = object
        .get("submissionId")
        .or_else(|| object.get("id"))
        .and_then(Value::as_str)
        .map(str::to_string);
    let created_at = object
        .get("createdAt")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    Some(SubmissionRecord {
        submission_id,
        created_at,
        values: answers_from_body(value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn normalizes_loose_values() {
        let body = json!({
            "submissionId": "s1",
            "name": "Alice",
            "age": 30,
            "subscribe": true,
            "colors": ["red", "blue"],
            "missing": null
        });
        let answers = answers_from_body(&body);
        let expected: Answers = [
            ("name", "Alice"),
            ("age", "30"),
            ("subscribe", "true"),
            ("colors", "red,blue"),
        ]
        .into_iter()
        .collect();
        assert_eq!(answers, expected);
    }

    #[test]
    fn nested_values_are_accepted() {
        let body = json!({ "submissionId": "s1", "values": { "a": "1" } });
        let answers = answers_from_body(&body);
        assert_eq!(answers.get("a"), Some("1"));
        assert_eq!(answers.len(), 1);
    }

    #[test]
    fn null_body_is_empty() {
        assert!(answers_from_body(&Value::Null).is_empty());
    }

    #[test]
    fn record_reads_metadata() {
        let value = json!({
            "submissionId": "s9",
            "createdAt": "2025-03-01T10:00:00Z",
            "email": "a@b.c"
        });
        let record = record_from_value(&value).unwrap();
        assert_eq!(record.submission_id.as_deref(), Some("s9"));
        assert!(record.created_at.is_some());
        assert_eq!(record.values.get("email"), Some("a@b.c"));
        assert!(record.values.get("createdAt").is_none());
    }
}

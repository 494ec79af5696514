//! crates/trustme_core/src/normalize.rs
//!
//! Maps whatever JSON the analysis service returned into a `Verdict`.
//! The service renamed its fields several times (`score`/`trust_score`,
//! `comment`/`details.comment`, `text`/`report`), so every known shape is
//! accepted. The mapping is pure and total.

use serde_json::{Map, Value};

/// Shown under a score when the service did not send any comment.
pub const PLACEHOLDER_COMMENT: &str = "No comment available.";

/// The renderable form of one analysis response.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// A numeric trust score (nominally 0-100).
    Scored {
        score: f64,
        comment: String,
        /// Free-text details sent as a plain string next to the score.
        details: Option<String>,
    },
    /// A legacy narrative report with no score.
    Narrative { text: String, comment: Option<String> },
    /// Only a comment came back.
    Comment { comment: String },
    /// Nothing recognizable; the body pretty-printed for diagnosis.
    Raw { json: String },
}

/// Normalizes a response body. First match wins at every step.
pub fn normalize(body: &Value) -> Verdict {
    let Some(fields) = body.as_object() else {
        return raw(body);
    };

    let score = number_field(fields, "score").or_else(|| number_field(fields, "trust_score"));
    let comment = comment_of(fields);
    let text = truthy_field(fields, "text").or_else(|| truthy_field(fields, "report"));

    match (score, text, comment) {
        (Some(score), _, comment) => Verdict::Scored {
            score,
            comment: comment.unwrap_or_else(|| PLACEHOLDER_COMMENT.to_string()),
            details: fields
                .get("details")
                .and_then(Value::as_str)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
        },
        (None, Some(text), comment) => Verdict::Narrative { text, comment },
        (None, None, Some(comment)) => Verdict::Comment { comment },
        (None, None, None) => raw(body),
    }
}

fn number_field(fields: &Map<String, Value>, key: &str) -> Option<f64> {
    fields.get(key).and_then(Value::as_f64)
}

/// `comment`, else `details.comment` when `details` is an object.
fn comment_of(fields: &Map<String, Value>) -> Option<String> {
    truthy_field(fields, "comment").or_else(|| {
        fields
            .get("details")
            .and_then(Value::as_object)
            .and_then(|details| truthy_field(details, "comment"))
    })
}

/// Text of a field that would count as "present": a non-empty string, a
/// non-zero number or `true`.
fn truthy_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

fn raw(body: &Value) -> Verdict {
    let json = serde_json::to_string_pretty(body).unwrap_or_else(|_| body.to_string());
    Verdict::Raw { json }
}

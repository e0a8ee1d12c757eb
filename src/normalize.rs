//! Response normalisation: classify raw backend payloads.
//!
//! The backend is loose about what it returns. A submission may answer with a
//! job id or with a finished summary inline; a status poll may answer with a
//! bare status, a status plus summary, or an `error: …` status; and the
//! summary itself may be an object or a string holding JSON text (sometimes
//! wrapped in Markdown code fences by the language model that produced it).
//!
//! [`normalize`] turns all of that into one tagged [`NormalizedResult`] so the
//! state machine can `match` exhaustively instead of probing fields. It is a
//! pure function: no I/O, no timers, no logging.

use crate::model::Summary;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

/// Which backend call produced the payload.
///
/// The backend echoes `job_id` on every status response, so "a job id means a
/// pending job" only holds for submission responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// `POST /upload` or `POST /transcribe`.
    Submission,
    /// `GET /status/{job_id}`.
    Poll,
}

/// Typed classification of a backend payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedResult {
    /// Submission accepted; poll this job id.
    Pending { job_id: String },
    /// Submission answered with the finished summary inline.
    Direct { summary: Summary },
    /// Poll: still processing.
    InFlight,
    /// Poll: completed. `None` when the completed job carried no summary.
    Done { summary: Option<Summary> },
    /// Poll: the backend reported a failure.
    ErrorStatus { message: String },
    /// Anything else.
    Malformed(Malformed),
}

/// Why a payload could not be classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Malformed {
    /// No payload at all (`null` or empty body).
    Absent,
    /// A payload whose shape matches nothing we know (not an object, no
    /// status, a submission without job id or result).
    UnexpectedShape,
    /// A `status` string we do not recognise.
    UnrecognizedStatus(String),
    /// A summary that was present but failed to decode; carries the decoder
    /// message for logging.
    UndecodableSummary(String),
}

const STATUS_COMPLETED: &str = "completed";
const STATUS_PROCESSING: &str = "processing";
const ERROR_PREFIX: &str = "error:";

/// Classify a raw backend payload.
///
/// Rules, in order:
/// 1. `null` → [`Malformed::Absent`]; a non-object → [`Malformed::UnexpectedShape`].
/// 2. Submission with a non-empty `job_id` → [`NormalizedResult::Pending`],
///    whatever else the payload carries.
/// 3. `status == "completed"` → `Direct` (submission) or `Done` (poll).
/// 4. `status == "processing"` → `InFlight` (poll only).
/// 5. `status` starting with `error:` → `ErrorStatus` (poll only).
/// 6. Anything else is `Malformed`.
pub fn normalize(raw: &Value, origin: Origin) -> NormalizedResult {
    let obj = match raw {
        Value::Null => return NormalizedResult::Malformed(Malformed::Absent),
        Value::Object(obj) => obj,
        _ => return NormalizedResult::Malformed(Malformed::UnexpectedShape),
    };

    match origin {
        Origin::Submission => classify_submission(obj),
        Origin::Poll => classify_poll(obj),
    }
}

fn classify_submission(obj: &Map<String, Value>) -> NormalizedResult {
    if let Some(job_id) = job_id(obj) {
        return NormalizedResult::Pending { job_id };
    }

    if status(obj) == Some(STATUS_COMPLETED) {
        if let Some(raw) = present_summary(obj) {
            return match decode_summary(raw) {
                Ok(SummaryPayload::Summary(summary)) => NormalizedResult::Direct { summary },
                Ok(SummaryPayload::ErrorReport(_)) => {
                    NormalizedResult::Malformed(Malformed::UnexpectedShape)
                }
                Err(detail) => NormalizedResult::Malformed(Malformed::UndecodableSummary(detail)),
            };
        }
    }

    NormalizedResult::Malformed(Malformed::UnexpectedShape)
}

fn classify_poll(obj: &Map<String, Value>) -> NormalizedResult {
    let Some(status) = status(obj) else {
        return NormalizedResult::Malformed(Malformed::UnexpectedShape);
    };

    if status == STATUS_COMPLETED {
        let Some(raw) = present_summary(obj) else {
            return NormalizedResult::Done { summary: None };
        };
        return match decode_summary(raw) {
            Ok(SummaryPayload::Summary(summary)) => NormalizedResult::Done {
                summary: Some(summary),
            },
            Ok(SummaryPayload::ErrorReport(message)) => NormalizedResult::ErrorStatus { message },
            Err(detail) => NormalizedResult::Malformed(Malformed::UndecodableSummary(detail)),
        };
    }

    if status == STATUS_PROCESSING {
        return NormalizedResult::InFlight;
    }

    if let Some(rest) = status.strip_prefix(ERROR_PREFIX) {
        return NormalizedResult::ErrorStatus {
            message: rest.trim().to_string(),
        };
    }

    NormalizedResult::Malformed(Malformed::UnrecognizedStatus(status.to_string()))
}

fn job_id(obj: &Map<String, Value>) -> Option<String> {
    obj.get("job_id")
        .and_then(Value::as_str)
        .filter(|id| !id.trim().is_empty())
        .map(str::to_string)
}

fn status(obj: &Map<String, Value>) -> Option<&str> {
    obj.get("status").and_then(Value::as_str)
}

/// The summary field, unless it is missing, `null` or an empty string.
fn present_summary(obj: &Map<String, Value>) -> Option<&Value> {
    match obj.get("summary") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(v) => Some(v),
    }
}

// ── Summary decoding ─────────────────────────────────────────────────────────

/// What a decoded summary field turned out to hold.
#[derive(Debug)]
enum SummaryPayload {
    Summary(Summary),
    /// The backend stores `{"error": "..."}` in place of the summary when its
    /// summariser fails.
    ErrorReport(String),
}

/// Decode a summary given either as an object or as JSON text.
///
/// Returns `Err` with the decoder's message on failure; a string that is not
/// valid JSON never produces a partial summary.
fn decode_summary(raw: &Value) -> Result<SummaryPayload, String> {
    match raw {
        Value::String(text) => {
            let inner: Value = serde_json::from_str(unwrap_fences(text))
                .map_err(|e| format!("summary string is not JSON: {e}"))?;
            decode_summary_value(&inner)
        }
        other => decode_summary_value(other),
    }
}

fn decode_summary_value(value: &Value) -> Result<SummaryPayload, String> {
    let Value::Object(obj) = value else {
        return Err(format!("summary must be an object, got {}", kind(value)));
    };

    if let Some(message) = error_report(obj) {
        return Ok(SummaryPayload::ErrorReport(message));
    }

    serde_json::from_value::<Summary>(value.clone())
        .map(SummaryPayload::Summary)
        .map_err(|e| format!("summary has the wrong shape: {e}"))
}

/// `{"error": "..."}` with none of the summary keys.
fn error_report(obj: &Map<String, Value>) -> Option<String> {
    const SUMMARY_KEYS: [&str; 5] = [
        "title",
        "summary",
        "key_takeaways",
        "bulleted_notes",
        "flashcards",
    ];
    if SUMMARY_KEYS.iter().any(|k| obj.contains_key(*k)) {
        return None;
    }
    obj.get("error")
        .and_then(Value::as_str)
        .map(|m| m.trim().to_string())
}

static RE_JSON_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*\s*\n?(.*?)\n?```$").unwrap());

/// Strip one outer ```` ```json … ``` ```` fence pair, if present.
fn unwrap_fences(text: &str) -> &str {
    let trimmed = text.trim();
    match RE_JSON_FENCES.captures(trimmed).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str().trim(),
        None => trimmed,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

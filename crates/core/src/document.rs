//! Storage-boundary codec for the `statistic` document field.
//!
//! Stored shape:
//!
//! ```json
//! { "sessions": [ { "date": "YYYY-MM-DD", "stages": [0, 2] } ] }
//! ```
//!
//! Older clients sometimes stored the document as a JSON string literal
//! (an extra layer of quoting with escaped inner quotes); decoding unwraps it.

use std::borrow::Cow;

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::model::{Session, SessionLog, StageSlot};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DocumentError {
    #[error("statistic document is empty")]
    Empty,

    #[error("statistic document is null")]
    Null,

    #[error("malformed statistic document: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("invalid session date: {raw}")]
    InvalidDate { raw: String },
}

#[derive(Debug, Deserialize)]
struct StatisticDocument {
    sessions: Vec<SessionDocument>,
}

#[derive(Debug, Deserialize)]
struct SessionDocument {
    date: String,
    #[serde(default)]
    stages: Vec<StageSlot>,
}

/// Decode a stored `statistic` field into a typed log.
///
/// # Errors
///
/// Returns `DocumentError` for empty, null, non-JSON, or structurally invalid
/// documents, and for session dates that are not `YYYY-MM-DD`.
pub fn decode_session_log(raw: &str) -> Result<SessionLog, DocumentError> {
    let text = unwrap_quoted(raw.trim());
    let text = text.trim();
    if text.is_empty() {
        return Err(DocumentError::Empty);
    }
    if text == "null" {
        return Err(DocumentError::Null);
    }

    let document: StatisticDocument = serde_json::from_str(text)?;
    let sessions = document
        .sessions
        .into_iter()
        .map(|session| {
            let date = parse_date(&session.date)?;
            Ok(Session::from_persisted(date, session.stages))
        })
        .collect::<Result<Vec<_>, DocumentError>>()?;

    Ok(SessionLog::from_sessions(sessions))
}

/// Encode a typed log into the stored `statistic` form.
#[must_use]
pub fn encode_session_log(log: &SessionLog) -> String {
    let sessions: Vec<_> = log
        .sessions()
        .map(|session| {
            json!({
                "date": format_date(session.date()),
                "stages": session.stages().map(|stage| stage.value()).collect::<Vec<_>>(),
            })
        })
        .collect();
    json!({ "sessions": sessions }).to_string()
}

#[must_use]
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_date(raw: &str) -> Result<NaiveDate, DocumentError> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| DocumentError::InvalidDate {
        raw: raw.to_string(),
    })
}

fn unwrap_quoted(text: &str) -> Cow<'_, str> {
    if text.len() < 2 || !text.starts_with('"') || !text.ends_with('"') {
        return Cow::Borrowed(text);
    }
    match serde_json::from_str::<String>(text) {
        Ok(inner) => Cow::Owned(inner),
        // Not a valid string literal; strip the quotes and unescape inner quotes by hand.
        Err(_) => Cow::Owned(text[1..text.len() - 1].replace("\\\"", "\"")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn decodes_plain_document() {
        let log =
            decode_session_log(r#"{"sessions":[{"date":"2024-01-01","stages":[0,2]}]}"#).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log.stage_count_on(day(1)), 2);
    }

    #[test]
    fn decodes_double_encoded_document() {
        let raw = r#""{\"sessions\":[{\"date\":\"2024-01-02\",\"stages\":[1,1,3]}]}""#;
        let log = decode_session_log(raw).unwrap();
        assert_eq!(log.stage_count_on(day(2)), 2);
    }

    #[test]
    fn rejects_degenerate_inputs() {
        assert!(matches!(decode_session_log(""), Err(DocumentError::Empty)));
        assert!(matches!(decode_session_log("  "), Err(DocumentError::Empty)));
        assert!(matches!(decode_session_log("null"), Err(DocumentError::Null)));
        assert!(matches!(
            decode_session_log("{}"),
            Err(DocumentError::Malformed(_))
        ));
        assert!(matches!(
            decode_session_log("not json"),
            Err(DocumentError::Malformed(_))
        ));
    }

    #[test]
    fn rejects_bad_dates() {
        let err = decode_session_log(r#"{"sessions":[{"date":"01/02/2024","stages":[]}]}"#)
            .unwrap_err();
        assert!(matches!(err, DocumentError::InvalidDate { raw } if raw == "01/02/2024"));
    }

    #[test]
    fn encodes_sessions_in_append_order() {
        let mut log = SessionLog::starting_with(day(5), StageSlot::new(3));
        log.record_visit(StageSlot::new(1), day(5));
        log.record_visit(StageSlot::new(0), day(6));

        assert_eq!(
            encode_session_log(&log),
            r#"{"sessions":[{"date":"2024-01-05","stages":[1,3]},{"date":"2024-01-06","stages":[0]}]}"#
        );
    }
}

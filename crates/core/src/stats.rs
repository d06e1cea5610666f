//! Session statistics: recording stage visits and building the weekly chart.
//!
//! Both entry points take the stored `statistic` text and never fail. A document
//! that cannot be decoded is treated as an empty log.

use chrono::{Days, NaiveDate};

use crate::document::{DocumentError, decode_session_log, encode_session_log};
use crate::model::{SessionLog, StageSlot};
use crate::time::day_month_label;

/// Number of trailing calendar days covered by the chart.
pub const CHART_DAYS: usize = 7;

/// Aligned chart columns for the trailing week, oldest first, ending at today.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartSeries {
    pub dates: Vec<NaiveDate>,
    pub labels: Vec<String>,
    pub counts: Vec<usize>,
}

impl ChartSeries {
    /// Build the chart columns for the week ending at `today` from a typed log.
    ///
    /// Days before the first representable date are left out, so the series is
    /// shorter than a week only at the calendar floor.
    #[must_use]
    pub fn from_log(log: &SessionLog, today: NaiveDate) -> Self {
        let dates: Vec<NaiveDate> = (0..CHART_DAYS as u64)
            .rev()
            .filter_map(|offset| today.checked_sub_days(Days::new(offset)))
            .collect();
        let labels = dates.iter().copied().map(day_month_label).collect();
        let counts = dates.iter().map(|date| log.stage_count_on(*date)).collect();
        Self {
            dates,
            labels,
            counts,
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    #[must_use]
    pub fn max_count(&self) -> usize {
        self.counts.iter().copied().max().unwrap_or(0)
    }
}

/// Result of applying a visit to a stored document.
#[derive(Debug)]
pub struct VisitUpdate {
    /// The re-encoded document to store.
    pub document: String,
    /// Why the stored document was discarded, if it was.
    pub reset: Option<DocumentError>,
}

/// Record a visit to `stage` on `today` and return the document to store.
#[must_use]
pub fn record_visit(document: &str, stage: StageSlot, today: NaiveDate) -> String {
    apply_visit(document, stage, today).document
}

/// Like [`record_visit`], also reporting whether the stored document was discarded.
#[must_use]
pub fn apply_visit(document: &str, stage: StageSlot, today: NaiveDate) -> VisitUpdate {
    let (log, reset) = match decode_session_log(document) {
        Ok(mut log) => {
            log.record_visit(stage, today);
            (log, None)
        }
        Err(err) => (SessionLog::starting_with(today, stage), Some(err)),
    };
    VisitUpdate {
        document: encode_session_log(&log),
        reset,
    }
}

/// Chart columns for the 7 days ending at `today`. Unreadable documents count as empty.
#[must_use]
pub fn chart_series(document: &str, today: NaiveDate) -> ChartSeries {
    let log = decode_session_log(document).unwrap_or_default();
    ChartSeries::from_log(&log, today)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MAX_SESSIONS;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn decoded(document: &str) -> SessionLog {
        decode_session_log(document).unwrap()
    }

    #[test]
    fn malformed_documents_start_a_fresh_log() {
        for raw in ["", "not json", "null", "{}", r#"{"sessions":"nope"}"#] {
            let document = record_visit(raw, StageSlot::new(3), day(4));
            assert_eq!(
                document,
                r#"{"sessions":[{"date":"2024-01-04","stages":[3]}]}"#,
                "input {raw:?}"
            );
        }
    }

    #[test]
    fn reset_reason_is_reported() {
        let update = apply_visit("not json", StageSlot::new(1), day(1));
        assert!(matches!(update.reset, Some(DocumentError::Malformed(_))));

        let update = apply_visit(&update.document, StageSlot::new(2), day(1));
        assert!(update.reset.is_none());
    }

    #[test]
    fn re_recording_the_same_stage_is_idempotent() {
        let once = record_visit("", StageSlot::new(2), day(3));
        let twice = record_visit(&once, StageSlot::new(2), day(3));
        assert_eq!(once, twice);
        assert_eq!(decoded(&twice).stage_count_on(day(3)), 1);
    }

    #[test]
    fn appending_an_eighth_date_keeps_seven_sessions() {
        let mut document = String::new();
        for d in 1..=7 {
            document = record_visit(&document, StageSlot::new(1), day(d));
        }
        assert_eq!(decoded(&document).len(), MAX_SESSIONS);

        let document = record_visit(&document, StageSlot::new(5), day(8));
        let log = decoded(&document);
        assert_eq!(log.len(), MAX_SESSIONS);
        assert!(log.session_on(day(1)).is_none());
        assert_eq!(log.stage_count_on(day(8)), 1);
    }

    #[test]
    fn double_encoded_document_is_unwrapped_before_recording() {
        let raw = r#""{\"sessions\":[{\"date\":\"2024-01-02\",\"stages\":[4]}]}""#;
        let document = record_visit(raw, StageSlot::new(5), day(2));
        assert_eq!(
            document,
            r#"{"sessions":[{"date":"2024-01-02","stages":[4,5]}]}"#
        );
    }

    #[test]
    fn chart_covers_trailing_week_ending_today() {
        let chart = chart_series(
            r#"{"sessions":[{"date":"2024-01-01","stages":[0,2]}]}"#,
            day(7),
        );

        assert_eq!(chart.labels, vec!["1.1", "2.1", "3.1", "4.1", "5.1", "6.1", "7.1"]);
        assert_eq!(chart.counts, vec![2, 0, 0, 0, 0, 0, 0]);
        assert_eq!(chart.dates.last(), Some(&day(7)));
    }

    #[test]
    fn chart_of_empty_document_is_all_zeros() {
        let chart = chart_series("", day(3));
        assert_eq!(chart.counts, vec![0; CHART_DAYS]);
        assert_eq!(chart.labels.len(), CHART_DAYS);
        assert_eq!(chart.labels.first().map(String::as_str), Some("28.12"));
        assert_eq!(chart.labels.last().map(String::as_str), Some("3.1"));
    }

    #[test]
    fn chart_ignores_sessions_outside_the_window_without_deleting_them() {
        let document = r#"{"sessions":[{"date":"2023-12-20","stages":[1,2,3]},{"date":"2024-01-06","stages":[1,1]}]}"#;
        let chart = chart_series(document, day(7));
        assert_eq!(chart.counts, vec![0, 0, 0, 0, 0, 1, 0]);
        assert_eq!(chart.total(), 1);
        assert_eq!(decoded(document).len(), 2);
    }

    #[test]
    fn chart_dates_strictly_increase() {
        let chart = chart_series("", day(1));
        assert!(chart.dates.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn chart_near_the_calendar_floor_has_no_repeated_dates() {
        let today = NaiveDate::MIN.checked_add_days(Days::new(2)).unwrap();
        let chart = chart_series("", today);
        assert_eq!(chart.dates.len(), 3);
        assert_eq!(chart.dates.first(), Some(&NaiveDate::MIN));
        assert!(chart.dates.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(chart.labels.len(), chart.counts.len());
    }

    #[test]
    fn recorded_visits_show_up_in_chart() {
        let mut document = String::new();
        for (d, stage) in [(5, 1), (5, 2), (6, 2), (7, 0), (7, 1), (7, 7)] {
            document = record_visit(&document, StageSlot::new(stage), day(d));
        }
        let chart = chart_series(&document, day(7));
        assert_eq!(chart.counts, vec![0, 0, 0, 0, 2, 1, 3]);
        assert_eq!(chart.max_count(), 3);
    }
}

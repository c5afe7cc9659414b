//! Monthly aggregation of calendar events.
//!
//! Events are bucketed by the month of their start (local calendar) and then
//! by title. Each bucket keeps the total elapsed minutes and the number of
//! contributing events.
//!
//! Month order and task order both follow first appearance in the input, so
//! the output is stable for a given event list. The aggregation state lives
//! only for the duration of one call.

use std::collections::HashMap;

use chrono::{Datelike, Local, TimeZone};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use tracing::{debug, trace, warn};

use crate::event::CalendarEvent;
use crate::span::{elapsed_minutes_in, parse_boundary_in, parse_date};

/// Accumulated time for one task within one month.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskTotals {
    /// Total elapsed minutes.
    pub total_time: f64,
    /// Number of events that contributed.
    pub count: u32,
}

impl TaskTotals {
    fn record(&mut self, minutes: f64) {
        self.total_time += minutes;
        self.count += 1;
    }
}

/// Task totals keyed by title, in first-seen order.
///
/// Serializes as a JSON object whose keys keep that order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskTable {
    entries: Vec<(String, TaskTotals)>,
    index: HashMap<String, usize>,
}

impl TaskTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the totals for a task title.
    pub fn get(&self, title: &str) -> Option<&TaskTotals> {
        self.index.get(title).map(|&i| &self.entries[i].1)
    }

    /// Returns the number of distinct tasks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the table has no tasks.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(title, totals)` in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TaskTotals)> {
        self.entries.iter().map(|(title, totals)| (title.as_str(), totals))
    }

    fn entry(&mut self, title: &str) -> &mut TaskTotals {
        let i = match self.index.get(title) {
            Some(&i) => i,
            None => {
                self.entries.push((title.to_string(), TaskTotals::default()));
                self.index.insert(title.to_string(), self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        &mut self.entries[i].1
    }
}

impl Serialize for TaskTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (title, totals) in &self.entries {
            map.serialize_entry(title, totals)?;
        }
        map.end()
    }
}

/// All task totals for one `YYYY-MM` month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthSummary {
    /// Month key, e.g. `"2024-03"`.
    pub month: String,
    /// Totals per task title.
    pub tasks: TaskTable,
}

impl MonthSummary {
    fn new(month: String) -> Self {
        Self {
            month,
            tasks: TaskTable::new(),
        }
    }
}

/// Aggregates events by month and task using the local timezone.
pub fn monthly_summary(events: &[CalendarEvent]) -> Vec<MonthSummary> {
    monthly_summary_in(events, &Local)
}

/// Aggregates events by month and task, deriving months in `tz`.
///
/// Events whose start cannot be parsed are skipped without contributing to
/// any bucket.
pub fn monthly_summary_in<Tz: TimeZone>(events: &[CalendarEvent], tz: &Tz) -> Vec<MonthSummary> {
    events
        .iter()
        .fold(SummaryBuilder::new(tz), SummaryBuilder::add)
        .finish()
}

/// Aggregates an untyped JSON event list using the local timezone.
///
/// Anything other than an array produces an empty summary. Array elements
/// that do not look like events are skipped.
pub fn monthly_summary_from_json(value: &serde_json::Value) -> Vec<MonthSummary> {
    monthly_summary_from_json_in(value, &Local)
}

/// Aggregates an untyped JSON event list, deriving months in `tz`.
pub fn monthly_summary_from_json_in<Tz: TimeZone>(
    value: &serde_json::Value,
    tz: &Tz,
) -> Vec<MonthSummary> {
    let Some(items) = value.as_array() else {
        debug!("event list is not an array, returning an empty summary");
        return Vec::new();
    };

    let events: Vec<CalendarEvent> = items
        .iter()
        .filter_map(|item| match CalendarEvent::deserialize(item) {
            Ok(event) => Some(event),
            Err(e) => {
                warn!("skipping malformed event: {}", e);
                None
            }
        })
        .collect();

    monthly_summary_in(&events, tz)
}

struct SummaryBuilder<'a, Tz: TimeZone> {
    tz: &'a Tz,
    months: Vec<MonthSummary>,
    index: HashMap<String, usize>,
}

impl<'a, Tz: TimeZone> SummaryBuilder<'a, Tz> {
    fn new(tz: &'a Tz) -> Self {
        Self {
            tz,
            months: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn add(mut self, event: &CalendarEvent) -> Self {
        let start = event.start.effective();
        let Some(month) = start.and_then(|s| month_key_in(s, self.tz)) else {
            trace!("skipping event {:?}: unusable start", event.id);
            return self;
        };

        let minutes = elapsed_minutes_in(start, event.end.effective(), self.tz);

        let i = match self.index.get(&month) {
            Some(&i) => i,
            None => {
                self.index.insert(month.clone(), self.months.len());
                self.months.push(MonthSummary::new(month));
                self.months.len() - 1
            }
        };
        self.months[i].tasks.entry(&event.summary).record(minutes);

        self
    }

    fn finish(self) -> Vec<MonthSummary> {
        self.months
    }
}

/// Derives the `YYYY-MM` key for a start boundary.
///
/// All-day dates use their own calendar month; timestamps are converted to
/// `tz` first.
fn month_key_in<Tz: TimeZone>(value: &str, tz: &Tz) -> Option<String> {
    if let Some(date) = parse_date(value) {
        return Some(format_month(date.year(), date.month()));
    }
    let local = parse_boundary_in(value, tz)?.with_timezone(tz);
    Some(format_month(local.year(), local.month()))
}

fn format_month(year: i32, month: u32) -> String {
    format!("{year:04}-{month:02}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventBoundary;
    use chrono::{FixedOffset, Utc};
    use serde_json::json;

    fn timed(id: &str, title: &str, start: &str, end: &str) -> CalendarEvent {
        CalendarEvent::new(id, title, EventBoundary::at(start), EventBoundary::at(end))
    }

    #[test]
    fn empty_input() {
        assert!(monthly_summary_in(&[], &Utc).is_empty());
        assert!(monthly_summary(&[]).is_empty());
    }

    #[test]
    fn non_array_json_is_empty() {
        assert!(monthly_summary_from_json(&json!({"items": []})).is_empty());
        assert!(monthly_summary_from_json(&json!("events")).is_empty());
        assert!(monthly_summary_from_json(&json!(null)).is_empty());
        assert!(monthly_summary_from_json(&json!(42)).is_empty());
    }

    #[test]
    fn same_month_same_title_merges() {
        let events = vec![
            timed("1", "Coding", "2024-03-01T10:00:00Z", "2024-03-01T11:30:00Z"),
            timed("2", "Coding", "2024-03-15T09:00:00Z", "2024-03-15T09:30:00Z"),
        ];

        let summary = monthly_summary_in(&events, &Utc);
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].month, "2024-03");
        assert_eq!(
            summary[0].tasks.get("Coding"),
            Some(&TaskTotals {
                total_time: 120.0,
                count: 2
            })
        );
    }

    #[test]
    fn output_contract_shape() {
        let input = json!([
            {"id": "1", "summary": "Coding",
             "start": {"dateTime": "2024-03-01T10:00:00Z"},
             "end": {"dateTime": "2024-03-01T11:30:00Z"}},
            {"id": "2", "summary": "Coding",
             "start": {"dateTime": "2024-03-15T09:00:00Z"},
             "end": {"dateTime": "2024-03-15T09:30:00Z"}}
        ]);

        let summary = monthly_summary_from_json_in(&input, &Utc);
        assert_eq!(
            serde_json::to_string(&summary).unwrap(),
            r#"[{"month":"2024-03","tasks":{"Coding":{"totalTime":120.0,"count":2}}}]"#
        );
    }

    #[test]
    fn all_day_without_end_counts_zero_minutes() {
        let events = vec![CalendarEvent::new(
            "1",
            "Holiday",
            EventBoundary::on("2024-05-01"),
            EventBoundary::default(),
        )];

        let summary = monthly_summary(&events);
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].month, "2024-05");
        assert_eq!(
            summary[0].tasks.get("Holiday"),
            Some(&TaskTotals {
                total_time: 0.0,
                count: 1
            })
        );
    }

    #[test]
    fn all_day_month_ignores_timezone() {
        let events = vec![CalendarEvent::new(
            "1",
            "Holiday",
            EventBoundary::on("2024-05-01"),
            EventBoundary::on("2024-05-02"),
        )];
        let west = FixedOffset::west_opt(8 * 3600).unwrap();

        let summary = monthly_summary_in(&events, &west);
        assert_eq!(summary[0].month, "2024-05");
        assert_eq!(summary[0].tasks.get("Holiday").unwrap().total_time, 1440.0);
    }

    #[test]
    fn malformed_start_is_dropped_not_defaulted() {
        let events = vec![
            timed("1", "Broken", "not-a-date", "2024-03-01T11:00:00Z"),
            CalendarEvent::new("2", "Missing", EventBoundary::default(), EventBoundary::default()),
            timed("3", "Coding", "2024-03-01T10:00:00Z", "2024-03-01T11:00:00Z"),
        ];

        let summary = monthly_summary_in(&events, &Utc);
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].month, "2024-03");
        assert_eq!(summary[0].tasks.len(), 1);
        assert!(summary[0].tasks.get("Broken").is_none());
        assert!(summary[0].tasks.get("Missing").is_none());
    }

    #[test]
    fn malformed_end_contributes_zero() {
        let events = vec![timed("1", "Coding", "2024-03-01T10:00:00Z", "whenever")];

        let summary = monthly_summary_in(&events, &Utc);
        assert_eq!(
            summary[0].tasks.get("Coding"),
            Some(&TaskTotals {
                total_time: 0.0,
                count: 1
            })
        );
    }

    #[test]
    fn empty_title_is_its_own_bucket() {
        let events = vec![
            timed("1", "", "2024-03-01T10:00:00Z", "2024-03-01T10:30:00Z"),
            timed("2", "", "2024-03-02T10:00:00Z", "2024-03-02T10:15:00Z"),
            timed("3", "untitled", "2024-03-03T10:00:00Z", "2024-03-03T10:15:00Z"),
        ];

        let summary = monthly_summary_in(&events, &Utc);
        let tasks = &summary[0].tasks;
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks.get("").unwrap().count, 2);
        assert_eq!(tasks.get("").unwrap().total_time, 45.0);
        assert_eq!(tasks.get("untitled").unwrap().count, 1);
    }

    #[test]
    fn titles_are_not_normalized() {
        let events = vec![
            timed("1", "Coding", "2024-03-01T10:00:00Z", "2024-03-01T11:00:00Z"),
            timed("2", "coding ", "2024-03-02T10:00:00Z", "2024-03-02T11:00:00Z"),
        ];

        let summary = monthly_summary_in(&events, &Utc);
        assert_eq!(summary[0].tasks.len(), 2);
    }

    #[test]
    fn duplicate_ids_are_not_deduplicated() {
        let events = vec![
            timed("same", "Coding", "2024-03-01T10:00:00Z", "2024-03-01T11:00:00Z"),
            timed("same", "Coding", "2024-03-01T10:00:00Z", "2024-03-01T11:00:00Z"),
        ];

        let summary = monthly_summary_in(&events, &Utc);
        assert_eq!(summary[0].tasks.get("Coding").unwrap().count, 2);
        assert_eq!(summary[0].tasks.get("Coding").unwrap().total_time, 120.0);
    }

    #[test]
    fn months_follow_first_appearance() {
        let events = vec![
            timed("1", "Review", "2024-04-02T10:00:00Z", "2024-04-02T11:00:00Z"),
            timed("2", "Coding", "2024-03-01T10:00:00Z", "2024-03-01T11:00:00Z"),
            timed("3", "Review", "2024-04-20T10:00:00Z", "2024-04-20T10:30:00Z"),
            timed("4", "Coding", "2023-12-24T10:00:00Z", "2023-12-24T10:30:00Z"),
        ];

        let summary = monthly_summary_in(&events, &Utc);
        let months: Vec<&str> = summary.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(months, vec!["2024-04", "2024-03", "2023-12"]);
        assert_eq!(summary[0].tasks.get("Review").unwrap().total_time, 90.0);
    }

    #[test]
    fn tasks_serialize_in_first_seen_order() {
        let events = vec![
            timed("1", "Zeta", "2024-03-01T10:00:00Z", "2024-03-01T10:10:00Z"),
            timed("2", "Alpha", "2024-03-01T11:00:00Z", "2024-03-01T11:10:00Z"),
            timed("3", "Mid", "2024-03-01T12:00:00Z", "2024-03-01T12:10:00Z"),
        ];

        let summary = monthly_summary_in(&events, &Utc);
        let titles: Vec<&str> = summary[0].tasks.iter().map(|(t, _)| t).collect();
        assert_eq!(titles, vec!["Zeta", "Alpha", "Mid"]);

        let json = serde_json::to_string(&summary[0].tasks).unwrap();
        let zeta = json.find("Zeta").unwrap();
        let alpha = json.find("Alpha").unwrap();
        let mid = json.find("Mid").unwrap();
        assert!(zeta < alpha && alpha < mid);
    }

    #[test]
    fn month_uses_local_calendar() {
        let events = vec![timed(
            "1",
            "Late",
            "2024-03-31T23:30:00Z",
            "2024-04-01T00:30:00Z",
        )];

        let utc_summary = monthly_summary_in(&events, &Utc);
        assert_eq!(utc_summary[0].month, "2024-03");

        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let local_summary = monthly_summary_in(&events, &plus_two);
        assert_eq!(local_summary[0].month, "2024-04");
        assert_eq!(local_summary[0].tasks.get("Late").unwrap().total_time, 60.0);
    }

    #[test]
    fn negative_durations_are_summed() {
        let events = vec![
            timed("1", "Odd", "2024-03-01T11:00:00Z", "2024-03-01T10:00:00Z"),
            timed("2", "Odd", "2024-03-02T10:00:00Z", "2024-03-02T10:30:00Z"),
        ];

        let summary = monthly_summary_in(&events, &Utc);
        assert_eq!(
            summary[0].tasks.get("Odd"),
            Some(&TaskTotals {
                total_time: -30.0,
                count: 2
            })
        );
    }

    #[test]
    fn json_input_skips_non_event_elements() {
        let input = json!([
            "garbage",
            {"id": "1", "summary": "Coding",
             "start": {"dateTime": "2024-03-01T10:00:00Z"},
             "end": {"dateTime": "2024-03-01T10:45:00Z"}},
            {"id": "2", "summary": 7, "start": {}, "end": {}}
        ]);

        let summary = monthly_summary_from_json_in(&input, &Utc);
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].tasks.get("Coding").unwrap().total_time, 45.0);
    }
}

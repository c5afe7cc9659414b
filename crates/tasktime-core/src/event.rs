//! Calendar event types.
//!
//! [`CalendarEvent`] mirrors the shape the Google Calendar API returns for
//! `events.list` items, reduced to the fields the summary needs. Boundaries
//! stay as raw strings: parsing is deferred to [`crate::span`] so that a bad
//! date on one event never fails the whole list.

use serde::{Deserialize, Serialize};

/// The start or end of a calendar event.
///
/// Timed events carry `dateTime`, all-day events carry `date`. Providers
/// populate at most one of them, but both are optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBoundary {
    /// RFC 3339 timestamp for timed events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    /// `YYYY-MM-DD` date for all-day events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl EventBoundary {
    /// Creates a timed boundary.
    pub fn at(date_time: impl Into<String>) -> Self {
        Self {
            date_time: Some(date_time.into()),
            date: None,
        }
    }

    /// Creates an all-day boundary.
    pub fn on(date: impl Into<String>) -> Self {
        Self {
            date_time: None,
            date: Some(date.into()),
        }
    }

    /// Returns the boundary value to use: `dateTime` first, then `date`.
    ///
    /// Empty strings count as absent.
    pub fn effective(&self) -> Option<&str> {
        self.date_time
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.date.as_deref().filter(|s| !s.is_empty()))
    }
}

/// A calendar event as delivered by the event source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// Provider identifier. Display only; never used for grouping.
    #[serde(default)]
    pub id: String,
    /// Event title, used verbatim as the task key.
    #[serde(default)]
    pub summary: String,
    /// Start boundary.
    #[serde(default)]
    pub start: EventBoundary,
    /// End boundary.
    #[serde(default)]
    pub end: EventBoundary,
}

impl CalendarEvent {
    /// Creates a new event.
    pub fn new(
        id: impl Into<String>,
        summary: impl Into<String>,
        start: EventBoundary,
        end: EventBoundary,
    ) -> Self {
        Self {
            id: id.into(),
            summary: summary.into(),
            start,
            end,
        }
    }
}

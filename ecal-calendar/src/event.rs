//! Calendar event records.
//!
//! [`RawEvent`] is the shape calendar exports use (Google Calendar API
//! `events` items). [`CalendarEvent`] is the flattened record the calendar
//! page renders and the change detector hashes.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Title used when an event has no summary.
pub const DEFAULT_TITLE: &str = "No Title";

/// Start or end of an exported event: a whole day or an instant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(
        default,
        rename = "dateTime",
        skip_serializing_if = "Option::is_none"
    )]
    pub date_time: Option<String>,
}

/// An event as found in a calendar export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub start: RawTime,
    #[serde(default)]
    pub end: RawTime,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

impl RawEvent {
    /// Flatten into a [`CalendarEvent`] belonging to `calendar_id`.
    ///
    /// Returns `None` when start or end carries neither a date nor a time.
    pub fn into_event(self, calendar_id: &str) -> Option<CalendarEvent> {
        let all_day = self.start.date.is_some() && self.end.date.is_some();
        let (start, end) = if all_day {
            (self.start.date?, self.end.date?)
        } else {
            (
                self.start.date_time.or(self.start.date)?,
                self.end.date_time.or(self.end.date)?,
            )
        };

        Some(CalendarEvent {
            title: self.summary.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            start,
            end,
            all_day,
            background_color: None,
            border_color: None,
            description: self.description.unwrap_or_default(),
            location: self.location.unwrap_or_default(),
            calendar_id: calendar_id.to_string(),
        })
    }
}

/// A display-ready event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub title: String,
    /// ISO date (all-day) or RFC 3339 timestamp.
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub all_day: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_color: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub calendar_id: String,
}

impl CalendarEvent {
    /// Set both fill and border colour.
    pub fn set_color(&mut self, color: impl Into<String>) {
        let color = color.into();
        self.border_color = Some(color.clone());
        self.background_color = Some(color);
    }

    /// First and last calendar day the event touches.
    ///
    /// All-day ends are exclusive in exports, so the last day is the one
    /// before `end`.
    pub fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = parse_day(&self.start)?;
        let end = parse_day(&self.end)?;
        let last = if self.all_day {
            end.pred_opt().unwrap_or(end).max(first)
        } else {
            end.max(first)
        };
        Some((first, last))
    }
}

/// Calendar day of an ISO date or timestamp.
fn parse_day(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(day) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(day);
    }
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Some(instant.date_naive());
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|t| t.date())
}

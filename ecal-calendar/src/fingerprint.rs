//! Change detection over event lists and rendered images.
//!
//! A fingerprint is a BLAKE3 hex digest. For events it covers a canonical,
//! order-independent serialization of the fields that change what the page
//! shows as text: title, start, end, description, location and calendar id.
//! Colours are display metadata and are left out.

use crate::event::CalendarEvent;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;

/// The hashed subset of an event.
#[derive(Serialize)]
struct HashedFields<'a> {
    title: &'a str,
    start: &'a str,
    end: &'a str,
    description: &'a str,
    location: &'a str,
    calendar_id: &'a str,
}

impl<'a> From<&'a CalendarEvent> for HashedFields<'a> {
    fn from(event: &'a CalendarEvent) -> Self {
        Self {
            title: &event.title,
            start: &event.start,
            end: &event.end,
            description: &event.description,
            location: &event.location,
            calendar_id: &event.calendar_id,
        }
    }
}

/// Canonical order: start, then title, with the remaining hashed fields as
/// tie-breakers.
fn canonical_cmp(a: &CalendarEvent, b: &CalendarEvent) -> Ordering {
    a.start
        .cmp(&b.start)
        .then_with(|| a.title.cmp(&b.title))
        .then_with(|| a.end.cmp(&b.end))
        .then_with(|| a.description.cmp(&b.description))
        .then_with(|| a.location.cmp(&b.location))
        .then_with(|| a.calendar_id.cmp(&b.calendar_id))
}

/// Identity used for duplicate removal: trimmed lower-cased title, start, end.
fn dedup_key(event: &CalendarEvent) -> (String, String, String) {
    (
        event.title.trim().to_lowercase(),
        event.start.clone(),
        event.end.clone(),
    )
}

/// Sort events canonically and drop duplicates.
///
/// Sorting comes first so the surviving copy of a duplicate does not depend
/// on input order. The same event shared by two calendars keeps the copy
/// from the calendar id that sorts first.
pub fn normalize(mut events: Vec<CalendarEvent>) -> Vec<CalendarEvent> {
    events.sort_by(canonical_cmp);
    let mut seen = HashSet::new();
    events.retain(|event| seen.insert(dedup_key(event)));
    events
}

/// Fingerprint of an event list, independent of input order.
pub fn fingerprint(events: &[CalendarEvent]) -> String {
    let normalized = normalize(events.to_vec());
    let hashed: Vec<HashedFields<'_>> = normalized.iter().map(HashedFields::from).collect();
    let canonical = serde_json::to_vec(&hashed).unwrap_or_default();
    blake3::hash(&canonical).to_hex().to_string()
}

/// Fingerprint of encoded image bytes.
pub fn image_fingerprint(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// True when there is no baseline yet or the fingerprint moved.
pub fn has_changed(previous: Option<&str>, current: &str) -> bool {
    previous != Some(current)
}

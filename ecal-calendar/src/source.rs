//! Where events come from.

use crate::errors::{CalendarError, Result};
use crate::event::{CalendarEvent, RawEvent};
use crate::fingerprint::normalize;
use crate::settings::Settings;
use crate::window::TimeWindow;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Per-calendar cap, matching the page size of the calendar API.
pub const DEFAULT_MAX_PER_CALENDAR: usize = 50;

/// A backend that lists events of several calendars within a window.
///
/// Implementations may block; async callers run them on a blocking thread.
pub trait EventSource: Send + Sync {
    /// Events of `calendar_ids` that touch `window`, uncoloured.
    fn fetch(&self, window: &TimeWindow, calendar_ids: &[String]) -> Result<Vec<CalendarEvent>>;

    /// Calendars this source can serve, for the settings page.
    fn calendars(&self) -> Result<Vec<CalendarInfo>>;
}

/// A calendar the source knows about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarInfo {
    pub id: String,
    pub summary: String,
}

/// Calendar export file: calendar id to its raw events.
#[derive(Debug, Default, Deserialize)]
pub struct CalendarExport {
    #[serde(default)]
    pub calendars: HashMap<String, Vec<RawEvent>>,
    /// Display names by calendar id; the id is used when absent.
    #[serde(default)]
    pub names: HashMap<String, String>,
}

/// Reads events from a JSON export on every fetch.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
    max_per_calendar: usize,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_per_calendar: DEFAULT_MAX_PER_CALENDAR,
        }
    }

    pub fn with_max_per_calendar(mut self, max: usize) -> Self {
        self.max_per_calendar = max;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<CalendarExport> {
        let text = std::fs::read_to_string(&self.path)
            .map_err(|e| CalendarError::io(&self.path, e))?;
        Ok(serde_json::from_str(&text)?)
    }
}

impl EventSource for JsonFileSource {
    fn fetch(&self, window: &TimeWindow, calendar_ids: &[String]) -> Result<Vec<CalendarEvent>> {
        let mut export = self.load()?;
        let mut events = Vec::new();

        for calendar_id in calendar_ids {
            let Some(raw_events) = export.calendars.remove(calendar_id) else {
                warn!("Calendar '{}' not found in {}", calendar_id, self.path.display());
                continue;
            };

            let mut in_window: Vec<CalendarEvent> = raw_events
                .into_iter()
                .filter_map(|raw| raw.into_event(calendar_id))
                .filter(|event| match event.date_span() {
                    Some((first, last)) => window.overlaps(first, last),
                    None => {
                        warn!("Skipping event '{}' with unparseable dates", event.title);
                        false
                    }
                })
                .collect();
            in_window.sort_by(|a, b| a.start.cmp(&b.start));
            in_window.truncate(self.max_per_calendar);

            debug!("Calendar '{}': {} events in {}", calendar_id, in_window.len(), window);
            events.extend(in_window);
        }

        Ok(events)
    }

    fn calendars(&self) -> Result<Vec<CalendarInfo>> {
        let export = self.load()?;
        let mut calendars: Vec<CalendarInfo> = export
            .calendars
            .keys()
            .map(|id| CalendarInfo {
                id: id.clone(),
                summary: export.names.get(id).cloned().unwrap_or_else(|| id.clone()),
            })
            .collect();
        calendars.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(calendars)
    }
}

/// Fetch, colour and normalize the events the settings ask for.
///
/// # Errors
///
/// [`CalendarError::NoCalendars`] if no calendar id is configured, otherwise
/// whatever the source reports.
pub fn collect_events(
    source: &dyn EventSource,
    settings: &Settings,
    today: NaiveDate,
) -> Result<Vec<CalendarEvent>> {
    let calendar_ids = settings.calendar_id_list();
    if calendar_ids.is_empty() {
        return Err(CalendarError::NoCalendars);
    }

    let window = TimeWindow::six_weeks(today, settings.week_start());
    let mut events = source.fetch(&window, &calendar_ids)?;
    settings.palette().apply(&mut events);
    Ok(normalize(events))
}

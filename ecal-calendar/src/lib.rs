//! # ecal-calendar: events, settings and change detection
//!
//! - [`event`]: export records and display-ready events
//! - [`window`]: the six-week date range
//! - [`source`]: the [`EventSource`] seam and the JSON export reader
//! - [`fingerprint`]: deduplication and content/image fingerprints
//! - [`palette`]: per-calendar colours
//! - [`settings`]: persisted page preferences

pub mod errors;
pub mod event;
pub mod fingerprint;
pub mod palette;
pub mod settings;
pub mod source;
pub mod window;

pub use errors::{CalendarError, Result};
pub use event::{CalendarEvent, RawEvent, RawTime};
pub use fingerprint::{fingerprint, has_changed, image_fingerprint, normalize};
pub use palette::{Palette, Theme};
pub use settings::{parse_calendar_ids, Settings};
pub use source::{collect_events, CalendarInfo, EventSource, JsonFileSource};
pub use window::{TimeWindow, WeekStart};

//! Settings file with a single lock around read-modify-write.

use crate::errors::{Result, ServerError};
use ecal_calendar::{CalendarError, Settings};
use parking_lot::Mutex;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info};

struct Loaded {
    settings: Settings,
    modified: Option<SystemTime>,
}

/// The persisted user settings.
///
/// The file is re-read when its modification time changes, so hand edits
/// take effect without a restart.
pub struct SettingsStore {
    path: PathBuf,
    inner: Mutex<Loaded>,
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

fn write_settings(path: &Path, settings: &Settings) -> Result<()> {
    let text = serde_json::to_string_pretty(settings).map_err(CalendarError::from)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, text).map_err(|e| CalendarError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| CalendarError::io(path, e))?;
    Ok(())
}

fn read_settings(path: &Path) -> Result<Settings> {
    let text = fs::read_to_string(path).map_err(|e| CalendarError::io(path, e))?;
    let (settings, migrated) = Settings::from_json(&text)?;
    if migrated {
        write_settings(path, &settings)?;
    }
    Ok(settings)
}

impl SettingsStore {
    /// Open `path`, creating it with defaults if missing.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let settings = if path.exists() {
            read_settings(&path)?
        } else {
            info!(
                "Creating default settings file {}; add calendar ids to it",
                path.display()
            );
            let settings = Settings::default();
            write_settings(&path, &settings)?;
            settings
        };

        Ok(Self {
            inner: Mutex::new(Loaded {
                settings,
                modified: modified(&path),
            }),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn refresh(&self, loaded: &mut Loaded) -> Result<()> {
        let current = modified(&self.path);
        if current.is_some() && current != loaded.modified {
            debug!("Settings file changed on disk, reloading");
            loaded.settings = read_settings(&self.path)?;
            loaded.modified = modified(&self.path);
        }
        Ok(())
    }

    /// Current settings.
    pub fn get(&self) -> Result<Settings> {
        let mut loaded = self.inner.lock();
        self.refresh(&mut loaded)?;
        Ok(loaded.settings.clone())
    }

    /// Merge the known keys of `update` and persist the result.
    ///
    /// # Errors
    ///
    /// [`ServerError::BadRequest`] if a value has the wrong type; the stored
    /// settings are unchanged in that case.
    pub fn update(&self, update: &Value) -> Result<Settings> {
        let mut loaded = self.inner.lock();
        self.refresh(&mut loaded)?;

        let mut next = loaded.settings.clone();
        next.merge(update).map_err(|e| match e {
            CalendarError::InvalidSetting { .. } => ServerError::BadRequest(e.to_string()),
            other => other.into(),
        })?;

        write_settings(&self.path, &next)?;
        loaded.modified = modified(&self.path);
        loaded.settings = next.clone();
        info!("Settings updated");
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_missing_file_written_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::open(&path).unwrap();

        assert!(path.exists());
        assert_eq!(store.get().unwrap(), Settings::default());
        let on_disk: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk["theme"], "spectra6");
        assert_eq!(on_disk["zoom"], 150);
    }

    #[test]
    fn test_legacy_key_migrated_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"max_rows": 5, "zoom": 120, "custom": "kept"}"#).unwrap();

        let store = SettingsStore::open(&path).unwrap();
        let settings = store.get().unwrap();
        assert_eq!(settings.zoom, 120);
        assert!(!settings.extra.contains_key("max_rows"));

        let on_disk: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert!(on_disk.get("max_rows").is_none());
        assert_eq!(on_disk["custom"], "kept");
    }

    #[test]
    fn test_update_persists_known_keys_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::open(&path).unwrap();

        let updated = store
            .update(&json!({
                "calendar_ids": "family,work",
                "calendar_colors": "{\"family\": \"red\"}",
                "not_a_setting": 1
            }))
            .unwrap();
        assert_eq!(updated.calendar_id_list(), vec!["family", "work"]);
        assert_eq!(updated.calendar_colors["family"], "red");
        assert!(!updated.extra.contains_key("not_a_setting"));

        let reopened = SettingsStore::open(&path).unwrap();
        assert_eq!(reopened.get().unwrap(), updated);
    }

    #[test]
    fn test_invalid_update_is_bad_request_and_keeps_settings() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::open(dir.path().join("settings.json")).unwrap();

        let err = store.update(&json!({"zoom": "big"})).unwrap_err();
        assert!(matches!(err, ServerError::BadRequest(_)));
        assert_eq!(store.get().unwrap().zoom, 150);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            SettingsStore::open(&path),
            Err(ServerError::Calendar(CalendarError::Parse(_)))
        ));
    }
}

use crate::models::settings::{AppState, Settings};
use crate::services::message_bus::BusMessage;
use anyhow::{Context, Result};
use log::{debug, info};
use std::fs;
use std::path::Path;

const SETTINGS_FILE_NAME: &str = "settings.json";

/// Load settings from `settings.json` in the app data directory.
/// A missing file means defaults.
pub fn load_settings_from_file(app_dir: &Path) -> Result<Settings> {
    let settings_path = app_dir.join(SETTINGS_FILE_NAME);
    if !settings_path.exists() {
        debug!("[Settings] No settings file at {}, using defaults", settings_path.display());
        return Ok(Settings::default());
    }

    let json = fs::read_to_string(&settings_path)
        .with_context(|| format!("Failed to read {}", settings_path.display()))?;
    let settings: Settings = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse {}", settings_path.display()))?;
    Ok(settings)
}

/// Persists a new poll interval and tells a running monitor to pick it up.
/// Returns the interval actually stored, after clamping.
pub fn set_check_interval(state: &AppState, secs: u64) -> Result<u64> {
    let stored = state.streamers.set_check_interval(secs)?;
    let listeners = state.bus.publish(BusMessage::IntervalChanged {
        interval_secs: stored,
    });

    info!(
        "[Settings] Check interval set to {}s ({} listener(s) notified)",
        stored, listeners
    );
    Ok(stored)
}

pub fn check_interval(state: &AppState) -> Result<u64> {
    state
        .streamers
        .check_interval(state.settings.default_check_interval_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::settings::{MAX_CHECK_INTERVAL_SECS, MIN_CHECK_INTERVAL_SECS};
    use crate::services::live_notification_service::testing::RecordingSink;
    use crate::services::storage_service::MemoryStore;
    use crate::services::twitch_service::testing::ScriptedSource;
    use std::sync::Arc;

    fn state() -> AppState {
        AppState::new(
            Settings::default(),
            Arc::new(MemoryStore::default()),
            Arc::new(ScriptedSource::default()),
            Arc::new(RecordingSink::default()),
        )
    }

    #[test]
    fn test_missing_settings_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings_from_file(dir.path()).unwrap();
        assert_eq!(settings.default_check_interval_secs, 30);
    }

    #[test]
    fn test_settings_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(SETTINGS_FILE_NAME),
            r#"{"helix":{"access_token":"abc"},"default_check_interval_secs":60}"#,
        )
        .unwrap();

        let settings = load_settings_from_file(dir.path()).unwrap();
        assert_eq!(settings.default_check_interval_secs, 60);
        assert_eq!(settings.helix.access_token.as_deref(), Some("abc"));
        assert_eq!(settings.helix.api_base, "https://api.twitch.tv/helix");
    }

    #[test]
    fn test_broken_settings_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(SETTINGS_FILE_NAME), "{not json").unwrap();
        assert!(load_settings_from_file(dir.path()).is_err());
    }

    #[tokio::test]
    async fn test_interval_is_clamped_persisted_and_published() {
        let state = state();
        let mut rx = state.bus.subscribe();

        assert_eq!(check_interval(&state).unwrap(), 30);
        assert_eq!(set_check_interval(&state, 3).unwrap(), MIN_CHECK_INTERVAL_SECS);
        assert_eq!(check_interval(&state).unwrap(), MIN_CHECK_INTERVAL_SECS);
        assert_eq!(
            rx.recv().await.unwrap(),
            BusMessage::IntervalChanged {
                interval_secs: MIN_CHECK_INTERVAL_SECS
            }
        );

        assert_eq!(
            set_check_interval(&state, u64::MAX).unwrap(),
            MAX_CHECK_INTERVAL_SECS
        );
    }
}

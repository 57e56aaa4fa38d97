use crate::models::settings::AppState;
use crate::models::streamer::{normalize_channel, Streamer};
use crate::services::reconcile_service::ReconcileOutcome;
use crate::utils::text::{escape_control, format_number};
use log::info;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Please enter a channel name")]
    EmptyChannel,
    #[error("Channel '{0}' was not found on Twitch")]
    NotFound(String),
    #[error("'{0}' is already being tracked")]
    AlreadyTracked(String),
    #[error("'{0}' is not being tracked")]
    NotTracked(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Looks the channel up and starts tracking it.
///
/// A duplicate or unknown channel leaves the store untouched.
pub async fn add_streamer(state: &AppState, raw: &str) -> Result<Streamer, TrackerError> {
    let channel = normalize_channel(raw);
    if channel.is_empty() {
        return Err(TrackerError::EmptyChannel);
    }
    if state.streamers.find(&channel)?.is_some() {
        return Err(TrackerError::AlreadyTracked(channel));
    }

    let identity = state
        .source
        .lookup_channel(&channel)
        .await?
        .ok_or_else(|| TrackerError::NotFound(channel.clone()))?;

    // The lookup awaited, so re-read under the lock before writing
    let _write = state.streamers.write_lock().await;
    let mut streamers = state.streamers.load()?;
    if streamers.iter().any(|s| s.username == channel) {
        return Err(TrackerError::AlreadyTracked(channel));
    }

    let display_name = if identity.display_name.is_empty() {
        channel.clone()
    } else {
        identity.display_name
    };
    let streamer = Streamer::new(&channel, &display_name, identity.followers);
    streamers.push(streamer.clone());
    state.streamers.replace(&streamers)?;

    info!("[Tracker] Now tracking {} ({})", streamer.username, streamer.display_name);
    Ok(streamer)
}

pub async fn remove_streamer(state: &AppState, raw: &str) -> Result<Streamer, TrackerError> {
    let channel = normalize_channel(raw);
    if channel.is_empty() {
        return Err(TrackerError::EmptyChannel);
    }

    let _write = state.streamers.write_lock().await;
    let mut streamers = state.streamers.load()?;
    let index = streamers
        .iter()
        .position(|s| s.username == channel)
        .ok_or_else(|| TrackerError::NotTracked(channel.clone()))?;
    let removed = streamers.remove(index);
    state.streamers.replace(&streamers)?;

    info!("[Tracker] Stopped tracking {}", removed.username);
    Ok(removed)
}

/// One line per streamer, live ones first.
pub fn render_streamer_list(streamers: &[Streamer]) -> Vec<String> {
    let mut ordered: Vec<&Streamer> = streamers.iter().collect();
    ordered.sort_by_key(|s| !s.is_live);

    ordered
        .into_iter()
        .map(|s| {
            let name = escape_control(&s.display_name);
            let followers = format_number(s.followers);
            if s.is_live {
                format!(
                    "🔴 {} ({} followers) - {} viewers - {}: {}",
                    name,
                    followers,
                    format_number(s.viewers),
                    escape_control(&s.game),
                    escape_control(&s.title)
                )
            } else {
                format!("⚫ {} ({} followers) - offline", name, followers)
            }
        })
        .collect()
}

pub fn describe_outcome(outcome: &ReconcileOutcome) -> String {
    match outcome {
        ReconcileOutcome::Idle => "No streamers tracked yet".to_string(),
        ReconcileOutcome::Skipped => "Status check failed, showing last known state".to_string(),
        ReconcileOutcome::Completed {
            checked,
            live,
            went_live,
            ..
        } => format!(
            "Checked {} streamer(s): {} live, {} just went live",
            checked, live, went_live
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::settings::Settings;
    use crate::services::live_notification_service::testing::RecordingSink;
    use crate::services::storage_service::{JsonFileStore, KeyValueStore, MemoryStore};
    use crate::services::twitch_service::testing::{stream, ScriptedSource};
    use std::sync::Arc;
    use std::time::Duration;

    fn state_with(source: Arc<ScriptedSource>, store: Arc<dyn KeyValueStore>) -> AppState {
        AppState::new(
            Settings::default(),
            store,
            source,
            Arc::new(RecordingSink::default()),
        )
    }

    #[tokio::test]
    async fn test_add_uses_looked_up_identity() {
        let source = Arc::new(ScriptedSource::default());
        source.add_identity("alice", "Alice", 1_500);
        let state = state_with(source, Arc::new(MemoryStore::default()));

        let added = add_streamer(&state, "  #Alice ").await.unwrap();

        assert_eq!(added.username, "alice");
        assert_eq!(added.display_name, "Alice");
        assert_eq!(added.followers, 1_500);
        assert!(!added.is_live);
        assert_eq!(state.streamers.load().unwrap(), vec![added]);
    }

    #[tokio::test]
    async fn test_add_unknown_channel_mutates_nothing() {
        let store = Arc::new(MemoryStore::default());
        let state = state_with(Arc::new(ScriptedSource::default()), store.clone());

        let err = add_streamer(&state, "ghost").await.unwrap_err();

        assert!(matches!(err, TrackerError::NotFound(ref c) if c == "ghost"));
        assert!(store.keys().is_empty());
    }

    #[tokio::test]
    async fn test_add_empty_channel() {
        let state = state_with(
            Arc::new(ScriptedSource::default()),
            Arc::new(MemoryStore::default()),
        );
        assert!(matches!(
            add_streamer(&state, " # ").await,
            Err(TrackerError::EmptyChannel)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_add_leaves_file_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonFileStore::open(dir.path()).unwrap());
        let source = Arc::new(ScriptedSource::default());
        source.add_identity("alice", "Alice", 10);
        let state = state_with(source.clone(), store.clone());

        add_streamer(&state, "alice").await.unwrap();
        let before = std::fs::read(store.path()).unwrap();

        let err = add_streamer(&state, "ALICE").await.unwrap_err();

        assert!(matches!(err, TrackerError::AlreadyTracked(ref c) if c == "alice"));
        assert_eq!(std::fs::read(store.path()).unwrap(), before);
    }

    #[tokio::test]
    async fn test_remove_streamer() {
        let source = Arc::new(ScriptedSource::default());
        source.add_identity("alice", "Alice", 10);
        source.add_identity("bob", "Bob", 20);
        let state = state_with(source, Arc::new(MemoryStore::default()));
        add_streamer(&state, "alice").await.unwrap();
        add_streamer(&state, "bob").await.unwrap();

        let removed = remove_streamer(&state, "Alice").await.unwrap();

        assert_eq!(removed.username, "alice");
        let remaining: Vec<String> = state
            .streamers
            .load()
            .unwrap()
            .into_iter()
            .map(|s| s.username)
            .collect();
        assert_eq!(remaining, vec!["bob".to_string()]);
        assert!(matches!(
            remove_streamer(&state, "alice").await,
            Err(TrackerError::NotTracked(_))
        ));
    }

    fn tracked(state: &AppState) -> Vec<String> {
        state
            .streamers
            .load()
            .unwrap()
            .into_iter()
            .map(|s| s.username)
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_during_slow_pass_survives_write_back() {
        let source = Arc::new(ScriptedSource::default());
        source.add_identity("alice", "Alice", 10);
        source.set_delay(Duration::from_millis(100));
        let state = state_with(source, Arc::new(MemoryStore::default()));
        state
            .streamers
            .replace(&[Streamer::new("bob", "Bob", 0)])
            .unwrap();

        let reconciler = state.on_demand_reconciler();
        let pass = tokio::spawn(async move { reconciler.reconcile().await });
        tokio::time::sleep(Duration::from_millis(10)).await;

        add_streamer(&state, "alice").await.unwrap();
        pass.await.unwrap().unwrap();

        assert_eq!(tracked(&state), vec!["bob", "alice"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_during_slow_pass_stays_removed() {
        let source = Arc::new(ScriptedSource::default());
        source.set_delay(Duration::from_millis(100));
        let state = state_with(source, Arc::new(MemoryStore::default()));
        state
            .streamers
            .replace(&[Streamer::new("bob", "Bob", 0), Streamer::new("carl", "Carl", 0)])
            .unwrap();

        let reconciler = state.on_demand_reconciler();
        let pass = tokio::spawn(async move { reconciler.reconcile().await });
        tokio::time::sleep(Duration::from_millis(10)).await;

        remove_streamer(&state, "bob").await.unwrap();
        pass.await.unwrap().unwrap();

        assert_eq!(tracked(&state), vec!["carl"]);
    }

    #[test]
    fn test_render_lists_live_first() {
        let offline = Streamer::new("alice", "Alice", 999);
        let mut live = Streamer::new("bob", "Bob", 1_260_000);
        live.mark_live(&stream("bob", "speedrun\u{1b}[2J"));

        let lines = render_streamer_list(&[offline, live]);

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("🔴 Bob (1.3M followers) - 100 viewers - Just Chatting"));
        assert!(!lines[0].contains('\u{1b}'));
        assert_eq!(lines[1], "⚫ Alice (999 followers) - offline");
    }

    #[test]
    fn test_describe_outcome() {
        assert_eq!(describe_outcome(&ReconcileOutcome::Idle), "No streamers tracked yet");
        assert_eq!(
            describe_outcome(&ReconcileOutcome::Completed {
                checked: 4,
                live: 2,
                went_live: 1,
                notified: 1
            }),
            "Checked 4 streamer(s): 2 live, 1 just went live"
        );
    }
}

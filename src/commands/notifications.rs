use crate::models::settings::AppState;
use crate::models::streamer::channel_url;
use anyhow::Result;
use log::{info, warn};

/// Handles a click on a live notification: resolves it to the channel page
/// and opens it in the default browser when settings allow.
///
/// Returns the page URL, or `None` when the id is unknown or was already used.
pub fn open_notification(state: &AppState, notification_id: &str) -> Result<Option<String>> {
    let Some(channel) = state.alerts.resolve_click(notification_id)? else {
        return Ok(None);
    };
    let url = channel_url(&channel);

    if state.settings.live_notifications.open_browser_on_click {
        match open::that(&url) {
            Ok(()) => info!("[Notify] Opened {}", url),
            Err(e) => warn!("[Notify] Could not open browser for {}: {}", url, e),
        }
    }
    Ok(Some(url))
}

use crate::models::streamer::channel_url;
use crate::services::storage_service::KeyValueStore;
use anyhow::Result;
use async_trait::async_trait;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

const NOTIFICATION_KEY_PREFIX: &str = "notification_";

/// Platform alert surface. Returns an opaque id for the emitted alert.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn emit(&self, title: &str, body: &str) -> Result<String>;
}

/// Prints alerts to the terminal; the id is what `streamwatch open <id>` takes.
pub struct ConsoleSink;

#[async_trait]
impl NotificationSink for ConsoleSink {
    async fn emit(&self, title: &str, body: &str) -> Result<String> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        println!("🔴 {}\n   {}\n   (open {})", title, body, id);
        Ok(id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveNotification {
    pub id: String,
    pub streamer_name: String,
    pub streamer_login: String,
    pub stream_title: Option<String>,
    pub stream_url: String,
}

/// Emits "went live" alerts and remembers which channel each alert belongs to.
pub struct LiveAlerts {
    sink: Arc<dyn NotificationSink>,
    store: Arc<dyn KeyValueStore>,
    enabled: bool,
}

impl LiveAlerts {
    pub fn new(sink: Arc<dyn NotificationSink>, store: Arc<dyn KeyValueStore>, enabled: bool) -> Self {
        Self {
            sink,
            store,
            enabled,
        }
    }

    /// Returns `None` when live notifications are switched off in settings.
    pub async fn announce(
        &self,
        display_name: &str,
        channel: &str,
        title: &str,
    ) -> Result<Option<LiveNotification>> {
        if !self.enabled {
            debug!("[Notify] Live notifications disabled, skipping {}", channel);
            return Ok(None);
        }

        let heading = format!("{} is now LIVE!", display_name);
        let body = if title.is_empty() {
            "Click to watch the stream"
        } else {
            title
        };

        let id = self.sink.emit(&heading, body).await?;
        self.store.set(&notification_key(&id), json!(channel))?;
        info!("[Notify] {} went live (notification {})", channel, id);

        Ok(Some(LiveNotification {
            id,
            streamer_name: display_name.to_string(),
            streamer_login: channel.to_string(),
            stream_title: (!title.is_empty()).then(|| title.to_string()),
            stream_url: channel_url(channel),
        }))
    }

    /// Resolve a clicked notification to its channel. Each id resolves once;
    /// later clicks on the same id return `None`.
    pub fn resolve_click(&self, notification_id: &str) -> Result<Option<String>> {
        let key = notification_key(notification_id);
        let Some(value) = self.store.get(&key)? else {
            debug!("[Notify] Notification {} already handled", notification_id);
            return Ok(None);
        };
        self.store.remove(&key)?;

        Ok(value.as_str().map(str::to_string))
    }
}

fn notification_key(notification_id: &str) -> String {
    format!("{}{}", NOTIFICATION_KEY_PREFIX, notification_id)
}

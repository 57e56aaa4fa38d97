use crate::services::live_notification_service::{LiveAlerts, NotificationSink};
use crate::services::message_bus::MessageBus;
use crate::services::reconcile_service::{AlertRoute, LivenessMonitor, NotificationCap, Reconciler};
use crate::services::storage_service::KeyValueStore;
use crate::services::streamer_store::StreamerStore;
use crate::services::twitch_service::StatusSource;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 30;
pub const MIN_CHECK_INTERVAL_SECS: u64 = 10;
pub const MAX_CHECK_INTERVAL_SECS: u64 = 86_400;
pub const BACKGROUND_NOTIFICATION_CAP: usize = 3;

/// Poll intervals are clamped here, at the configuration boundary.
pub fn clamp_check_interval(secs: u64) -> u64 {
    secs.clamp(MIN_CHECK_INTERVAL_SECS, MAX_CHECK_INTERVAL_SECS)
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct HelixSettings {
    pub api_base: String,
    pub client_id: String,
    /// Optional app/user token; anonymous requests only carry the client id.
    pub access_token: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for HelixSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.twitch.tv/helix".to_string(),
            client_id: "kimne78kx3ncx6brgo4mv6wki5h1ko".to_string(),
            access_token: None,
            request_timeout_secs: 15,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct ChatSettings {
    pub server_url: String,
    /// Fixed anonymous nickname; a random `justinfanNNNNN` is used when unset.
    pub nickname: Option<String>,
    pub capabilities: String,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            server_url: "wss://irc-ws.chat.twitch.tv:443".to_string(),
            nickname: None,
            capabilities: "twitch.tv/tags twitch.tv/commands".to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct LiveNotificationSettings {
    pub enabled: bool,
    /// Max notifications per background pass; `null` means unbounded.
    pub background_cap: Option<usize>,
    pub open_browser_on_click: bool,
}

impl Default for LiveNotificationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            background_cap: Some(BACKGROUND_NOTIFICATION_CAP),
            open_browser_on_click: true,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct Settings {
    pub helix: HelixSettings,
    pub chat: ChatSettings,
    pub live_notifications: LiveNotificationSettings,
    /// Used until an interval has been stored with `streamwatch interval`.
    pub default_check_interval_secs: u64,
    pub diagnostics_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            helix: HelixSettings::default(),
            chat: ChatSettings::default(),
            live_notifications: LiveNotificationSettings::default(),
            default_check_interval_secs: DEFAULT_CHECK_INTERVAL_SECS,
            diagnostics_enabled: false,
        }
    }
}

/// Everything the commands need, built once in `main`.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub streamers: StreamerStore,
    pub source: Arc<dyn StatusSource>,
    pub alerts: Arc<LiveAlerts>,
    pub bus: MessageBus,
    reconciler: Reconciler,
}

impl AppState {
    pub fn new(
        settings: Settings,
        store: Arc<dyn KeyValueStore>,
        source: Arc<dyn StatusSource>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        let streamers = StreamerStore::new(store.clone());
        let alerts = Arc::new(LiveAlerts::new(
            sink,
            store,
            settings.live_notifications.enabled,
        ));
        let reconciler = Reconciler::new(
            streamers.clone(),
            source.clone(),
            AlertRoute::Direct(alerts.clone()),
        );

        Self {
            settings: Arc::new(settings),
            streamers,
            source,
            alerts,
            bus: MessageBus::default(),
            reconciler,
        }
    }

    /// Uncapped pass that notifies directly; for one-shot CLI use.
    pub fn on_demand_reconciler(&self) -> Reconciler {
        self.reconciler.clone()
    }

    /// Uncapped pass that relays transitions to the running monitor over the bus
    /// instead of notifying itself, so a transition is announced only once.
    pub fn relaying_reconciler(&self) -> Reconciler {
        self.reconciler
            .sibling(NotificationCap::Unbounded, AlertRoute::Relay(self.bus.clone()))
    }

    pub fn background_monitor(&self) -> Result<LivenessMonitor> {
        let cap = NotificationCap::from_setting(self.settings.live_notifications.background_cap);
        let interval_secs = self
            .streamers
            .check_interval(self.settings.default_check_interval_secs)?;
        let reconciler = self
            .reconciler
            .sibling(cap, AlertRoute::Direct(self.alerts.clone()));

        Ok(LivenessMonitor::new(
            reconciler,
            self.alerts.clone(),
            self.bus.clone(),
            interval_secs,
        ))
    }
}

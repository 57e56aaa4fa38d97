use crate::models::stream::TwitchStream;
use serde::{Deserialize, Serialize};

/// A tracked channel, persisted under the `streamers` key.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Streamer {
    pub username: String,
    pub display_name: String,
    #[serde(default)]
    pub followers: u64,
    #[serde(default)]
    pub is_live: bool,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub game: String,
    #[serde(default)]
    pub viewers: u64,
}

impl Streamer {
    pub fn new(username: &str, display_name: &str, followers: u64) -> Self {
        Self {
            username: normalize_channel(username),
            display_name: display_name.to_string(),
            followers,
            is_live: false,
            title: String::new(),
            game: String::new(),
            viewers: 0,
        }
    }

    pub fn mark_live(&mut self, stream: &TwitchStream) {
        self.is_live = true;
        self.title = stream.title.clone();
        self.game = stream.game_name.clone();
        self.viewers = stream.viewer_count;
    }

    /// Offline always clears the live-only fields in the same update.
    pub fn mark_offline(&mut self) {
        self.is_live = false;
        self.title.clear();
        self.game.clear();
        self.viewers = 0;
    }

    pub fn channel_url(&self) -> String {
        channel_url(&self.username)
    }
}

/// A streamer's status change observed during one reconciliation pass.
#[derive(Clone, Debug)]
pub struct LivenessTransition {
    pub streamer: Streamer,
    pub was_live: bool,
    pub is_live: bool,
}

impl LivenessTransition {
    pub fn went_live(&self) -> bool {
        !self.was_live && self.is_live
    }
}

/// Channel identifiers are compared lowercased, without a leading `#`.
pub fn normalize_channel(raw: &str) -> String {
    raw.trim().trim_start_matches('#').to_lowercase()
}

pub fn channel_url(channel: &str) -> String {
    format!("https://www.twitch.tv/{}", channel)
}

use serde::{Deserialize, Serialize};

/// One entry of the Helix `streams` response. Only live channels appear.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct TwitchStream {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
    pub user_login: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub viewer_count: u64,
    #[serde(default)]
    pub game_name: String,
    #[serde(default)]
    pub started_at: String,
}

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct UserInfo {
    pub id: String,
    pub login: String,
    pub display_name: String,
}

/// What the identity lookup hands back when a channel is added.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelIdentity {
    pub login: String,
    pub display_name: String,
    pub followers: u64,
}

use crate::models::settings::HelixSettings;
use crate::models::stream::TwitchStream;
use crate::models::user::{ChannelIdentity, UserInfo};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

/// Where live status and channel identities come from.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Live streams among `logins`, fetched in one batch request.
    /// Channels that are offline are simply absent from the result.
    async fn live_streams(&self, logins: &[String]) -> Result<Vec<TwitchStream>>;

    /// Display name and follower count for a login, `None` if no such channel.
    async fn lookup_channel(&self, login: &str) -> Result<Option<ChannelIdentity>>;
}

#[derive(Deserialize)]
struct HelixPage<T> {
    data: Vec<T>,
}

#[derive(Deserialize)]
struct FollowersPage {
    #[serde(default)]
    total: u64,
}

pub struct HelixClient {
    client: Client,
    api_base: String,
    client_id: String,
    access_token: Option<String>,
}

impl HelixClient {
    pub fn new(settings: &HelixSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            client_id: settings.client_id.clone(),
            access_token: settings.access_token.clone(),
        })
    }

    fn get(&self, path: &str) -> RequestBuilder {
        let request = self
            .client
            .get(format!("{}/{}", self.api_base, path))
            .header("Client-Id", &self.client_id);

        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            bail!("Helix request failed with status {}", status);
        }

        response
            .json::<T>()
            .await
            .context("Malformed Helix response")
    }

    async fn follower_count(&self, broadcaster_id: &str) -> Result<u64> {
        let page: FollowersPage = self
            .fetch(
                self.get("channels/followers")
                    .query(&[("broadcaster_id", broadcaster_id)]),
            )
            .await?;
        Ok(page.total)
    }
}

#[async_trait]
impl StatusSource for HelixClient {
    async fn live_streams(&self, logins: &[String]) -> Result<Vec<TwitchStream>> {
        let query: Vec<(&str, &str)> = logins
            .iter()
            .map(|login| ("user_login", login.as_str()))
            .collect();

        let page: HelixPage<TwitchStream> = self.fetch(self.get("streams").query(&query)).await?;
        debug!(
            "[Helix] {} of {} tracked channels are live",
            page.data.len(),
            logins.len()
        );
        Ok(page.data)
    }

    async fn lookup_channel(&self, login: &str) -> Result<Option<ChannelIdentity>> {
        let page: HelixPage<UserInfo> = self
            .fetch(self.get("users").query(&[("login", login)]))
            .await?;

        let Some(user) = page.data.into_iter().next() else {
            return Ok(None);
        };

        // A missing follower total is not worth refusing the add over
        let followers = match self.follower_count(&user.id).await {
            Ok(total) => total,
            Err(e) => {
                warn!("[Helix] Could not fetch followers for {}: {:#}", user.login, e);
                0
            }
        };

        Ok(Some(ChannelIdentity {
            login: user.login.to_lowercase(),
            display_name: user.display_name,
            followers,
        }))
    }
}

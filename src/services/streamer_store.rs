use crate::models::settings::clamp_check_interval;
use crate::models::streamer::Streamer;
use crate::services::storage_service::KeyValueStore;
use anyhow::{Context, Result};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

const STREAMERS_KEY: &str = "streamers";
const CHECK_INTERVAL_KEY: &str = "checkInterval";

/// Typed view over the key/value store for the tracked list and poll interval.
///
/// The collection is always read and written whole. Every read-modify-write
/// of it runs under [`StreamerStore::write_lock`], which clones share.
#[derive(Clone)]
pub struct StreamerStore {
    kv: Arc<dyn KeyValueStore>,
    write_lock: Arc<Mutex<()>>,
}

impl StreamerStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Held from the read to the write of any update to the tracked list.
    pub async fn write_lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().await
    }

    pub fn load(&self) -> Result<Vec<Streamer>> {
        match self.kv.get(STREAMERS_KEY)? {
            Some(value) => {
                serde_json::from_value(value).context("Stored streamer list is malformed")
            }
            None => Ok(Vec::new()),
        }
    }

    pub fn replace(&self, streamers: &[Streamer]) -> Result<()> {
        self.kv.set(STREAMERS_KEY, serde_json::to_value(streamers)?)
    }

    pub fn find(&self, channel: &str) -> Result<Option<Streamer>> {
        Ok(self.load()?.into_iter().find(|s| s.username == channel))
    }

    /// Stored poll interval in seconds, clamped to the allowed range.
    pub fn check_interval(&self, default_secs: u64) -> Result<u64> {
        let stored = self
            .kv
            .get(CHECK_INTERVAL_KEY)?
            .and_then(|value| value.as_u64())
            .unwrap_or(default_secs);
        Ok(clamp_check_interval(stored))
    }

    pub fn set_check_interval(&self, secs: u64) -> Result<u64> {
        let secs = clamp_check_interval(secs);
        self.kv.set(CHECK_INTERVAL_KEY, json!(secs))?;
        Ok(secs)
    }
}

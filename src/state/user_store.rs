use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use super::user_data::UserData;
use crate::error::{BotError, Result};

/// One JSON file per user under `dir`.
///
/// All read-modify-write cycles for a user go through [`UserStore::update`], which
/// holds that user's lock for the whole cycle so concurrent commands from the
/// same user are applied one after the other.
pub struct UserStore {
    dir: String,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl UserStore {
    pub fn new(dir: &str) -> Self {
        Self {
            dir: dir.to_string(),
            locks: DashMap::new(),
        }
    }

    fn path_for(&self, user_id: &str) -> Result<String> {
        if user_id.is_empty() || !user_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(BotError::Internal {
                message: format!("invalid user id '{}'", user_id),
            });
        }
        Ok(format!("{}/{}.json", self.dir, user_id))
    }

    fn lock_for(&self, user_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Load a user's data, or a fresh record if they have never played
    pub async fn load(&self, user_id: &str) -> Result<UserData> {
        let path = self.path_for(user_id)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str(&content).map_err(|e| BotError::StateParse {
                path: path.clone(),
                source: e,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No data file for user {}, starting fresh", user_id);
                Ok(UserData::new())
            }
            Err(e) => Err(BotError::StateLoad { path, source: e }),
        }
    }

    /// Save to a JSON file atomically
    async fn save(&self, user_id: &str, data: &UserData) -> Result<()> {
        let path = self.path_for(user_id)?;
        let content = serde_json::to_string_pretty(data)?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| BotError::StateSave {
                path: self.dir.clone(),
                source: e,
            })?;

        // Write to temp file first, then rename for atomicity
        let temp_path = format!("{}.tmp", path);
        tokio::fs::write(&temp_path, &content)
            .await
            .map_err(|e| BotError::StateSave {
                path: path.clone(),
                source: e,
            })?;

        tokio::fs::rename(&temp_path, &path)
            .await
            .map_err(|e| BotError::StateSave { path, source: e })?;

        Ok(())
    }

    /// Run `f` against the user's data under their lock and persist the result.
    /// If `f` fails nothing is written.
    pub async fn update<T, F>(&self, user_id: &str, f: F) -> Result<T>
    where
        F: FnOnce(&mut UserData) -> Result<T>,
    {
        let lock = self.lock_for(user_id);
        let _guard = lock.lock().await;

        let mut data = self.load(user_id).await?;
        let value = f(&mut data)?;
        self.save(user_id, &data).await?;
        Ok(value)
    }
}

/// Shared user store type
pub type SharedUserStore = Arc<UserStore>;

pub fn create_shared_user_store(dir: &str) -> SharedUserStore {
    Arc::new(UserStore::new(dir))
}

#[cfg(test)]
pub(crate) fn temp_dir(label: &str) -> String {
    let dir = std::env::temp_dir().join(format!("pitchside-{}-{}", label, uuid::Uuid::new_v4()));
    dir.to_string_lossy().to_string()
}

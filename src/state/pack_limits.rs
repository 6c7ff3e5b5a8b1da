use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::config::PacksConfig;

/// Remaining stock for one limited pack
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PackStock {
    pub remaining: u32,
    pub total: u32,
}

/// Stock of every limited pack, persisted to data/pack_limits.json
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackLimits {
    stock: BTreeMap<String, PackStock>,
}

impl PackLimits {
    /// Load stock and reconcile it with the configured limits.
    ///
    /// Missing or unreadable files fall back to full stock. `total` always follows
    /// the configured limit; `remaining` is kept unless it is absent.
    pub async fn load(path: &str, packs: &PacksConfig) -> Self {
        let stored: BTreeMap<String, serde_json::Value> = match tokio::fs::read_to_string(path).await {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(map) => map,
                Err(e) => {
                    warn!("Pack limits file '{}' is corrupt ({}), resetting stock", path, e);
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!("Could not read pack limits '{}': {}, resetting stock", path, e);
                BTreeMap::new()
            }
        };

        let mut limits = PackLimits::default();
        for pack in &packs.packs {
            let Some(limit) = pack.limit else {
                continue;
            };
            let remaining = stored
                .get(&pack.key)
                .and_then(|v| v.get("remaining"))
                .and_then(|v| v.as_u64())
                .map(|r| r.min(u64::from(limit)) as u32)
                .unwrap_or(limit);

            limits.stock.insert(
                pack.key.clone(),
                PackStock {
                    remaining,
                    total: limit,
                },
            );
        }

        if !limits.stock.is_empty() {
            info!("Loaded stock for {} limited pack(s)", limits.stock.len());
        }
        limits
    }

    /// Save to a JSON file atomically
    pub async fn save(&self, path: &str) -> crate::error::Result<()> {
        let content = serde_json::to_string_pretty(self)?;

        let temp_path = format!("{}.tmp", path);
        tokio::fs::write(&temp_path, &content).await.map_err(|e| {
            crate::error::BotError::StateSave {
                path: path.to_string(),
                source: e,
            }
        })?;

        tokio::fs::rename(&temp_path, path).await.map_err(|e| {
            crate::error::BotError::StateSave {
                path: path.to_string(),
                source: e,
            }
        })?;

        Ok(())
    }

    pub fn get(&self, pack_key: &str) -> Option<PackStock> {
        self.stock.get(pack_key).copied()
    }

    /// True if the pack is unlimited or still has stock
    pub fn available(&self, pack_key: &str) -> bool {
        self.stock
            .get(pack_key)
            .map_or(true, |s| s.remaining > 0)
    }

    /// Take one unit of stock. Unlimited packs always succeed.
    pub fn take_one(&mut self, pack_key: &str) -> bool {
        match self.stock.get_mut(pack_key) {
            Some(stock) if stock.remaining == 0 => false,
            Some(stock) => {
                stock.remaining -= 1;
                true
            }
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::user_store::temp_dir;

    fn limited_packs() -> PacksConfig {
        let mut packs = PacksConfig::default();
        packs.packs[0].limit = Some(3);
        packs
    }

    #[tokio::test]
    async fn test_missing_file_defaults_to_full_stock() {
        let dir = temp_dir("limits-missing");
        let limits = PackLimits::load(&format!("{}/pack_limits.json", dir), &limited_packs()).await;
        assert_eq!(limits.get("iconic"), Some(PackStock { remaining: 3, total: 3 }));
        assert!(limits.get("standard").is_none());
        assert!(limits.available("standard"));
    }

    #[tokio::test]
    async fn test_reconcile_with_config() {
        let dir = temp_dir("limits-reconcile");
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = format!("{}/pack_limits.json", dir);
        tokio::fs::write(&path, r#"{"iconic": {"remaining": 1, "total": 150}}"#)
            .await
            .unwrap();

        let limits = PackLimits::load(&path, &limited_packs()).await;
        assert_eq!(limits.get("iconic"), Some(PackStock { remaining: 1, total: 3 }));
    }

    #[tokio::test]
    async fn test_corrupt_file_resets() {
        let dir = temp_dir("limits-corrupt");
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = format!("{}/pack_limits.json", dir);
        tokio::fs::write(&path, "not json").await.unwrap();

        let limits = PackLimits::load(&path, &limited_packs()).await;
        assert_eq!(limits.get("iconic").unwrap().remaining, 3);
    }

    #[tokio::test]
    async fn test_take_and_save() {
        let dir = temp_dir("limits-take");
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = format!("{}/pack_limits.json", dir);
        let packs = limited_packs();

        let mut limits = PackLimits::load(&path, &packs).await;
        assert!(limits.take_one("iconic"));
        assert!(limits.take_one("iconic"));
        assert!(limits.take_one("iconic"));
        assert!(!limits.take_one("iconic"));
        assert!(!limits.available("iconic"));
        assert!(limits.take_one("standard"));

        limits.save(&path).await.unwrap();

        let reloaded = PackLimits::load(&path, &packs).await;
        assert_eq!(reloaded.get("iconic").unwrap().remaining, 0);
    }
}

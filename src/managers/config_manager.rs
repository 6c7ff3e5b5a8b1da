use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{Pack, PacksConfig, Player, PlayerCatalog, Settings};
use crate::error::Result;

/// Holds the pack table and player catalog shared by the bot and the web API
pub struct ConfigManager {
    packs: PacksConfig,
    catalog: PlayerCatalog,
    settings: Settings,
}

impl ConfigManager {
    /// Create a config manager with built-in packs and an empty catalog
    pub fn new(settings: Settings) -> Self {
        Self {
            packs: PacksConfig::default(),
            catalog: PlayerCatalog::default(),
            settings,
        }
    }

    /// Build directly from loaded parts (used by tests and tooling)
    pub fn from_parts(settings: Settings, packs: PacksConfig, catalog: PlayerCatalog) -> Self {
        Self {
            packs,
            catalog,
            settings,
        }
    }

    /// Load all configuration from the data directory
    ///
    /// Structure:
    /// data/
    /// ├── packs.json        # Optional pack table (built-in packs when absent)
    /// ├── players.json      # Player catalog
    /// ├── pack_limits.json  # Stock for limited packs
    /// ├── news.json         # News articles
    /// └── users/
    ///     └── {discord_id}.json
    pub async fn load_all(&mut self) -> Result<()> {
        let packs_path = self.settings.packs_path();
        if std::path::Path::new(&packs_path).exists() {
            self.packs = PacksConfig::load_from_file(&packs_path)?;
            info!("Loaded {} packs from {}", self.packs.packs.len(), packs_path);
        } else {
            info!("No packs.json found, using built-in packs");
            self.packs = PacksConfig::default();
        }

        let players_path = self.settings.players_path();
        if std::path::Path::new(&players_path).exists() {
            self.catalog = PlayerCatalog::load_from_file(&players_path)?;
        } else {
            warn!(
                "No player catalog at {}, contract pulls will fail until one is added",
                players_path
            );
            self.catalog = PlayerCatalog::default();
        }

        self.check_coverage();

        info!(
            "Config loaded: {} packs, {} players",
            self.packs.packs.len(),
            self.catalog.len()
        );

        Ok(())
    }

    /// Warn about rarities a pack can roll but the catalog cannot supply
    fn check_coverage(&self) {
        for pack in &self.packs.packs {
            for rarity in pack.allowed_rarities() {
                if self
                    .catalog
                    .by_rarity(rarity, pack.player_pool.as_deref())
                    .is_empty()
                {
                    warn!(
                        "Pack '{}' can roll {} but no catalog player matches",
                        pack.key, rarity
                    );
                }
            }
        }
    }

    // ========== Query Operations ==========

    pub fn packs(&self) -> &PacksConfig {
        &self.packs
    }

    pub fn get_pack(&self, key: &str) -> Option<&Pack> {
        self.packs.get(key)
    }

    pub fn catalog(&self) -> &PlayerCatalog {
        &self.catalog
    }

    pub fn all_players(&self) -> &[Player] {
        self.catalog.all()
    }
}

/// Shared config manager type
pub type SharedConfigManager = Arc<tokio::sync::RwLock<ConfigManager>>;

pub fn create_shared_config_manager(settings: Settings) -> SharedConfigManager {
    Arc::new(tokio::sync::RwLock::new(ConfigManager::new(settings)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::user_store::temp_dir;

    #[tokio::test]
    async fn test_load_all_defaults_without_files() {
        let settings = Settings {
            data_path: temp_dir("config-empty"),
            ..Default::default()
        };
        let mut manager = ConfigManager::new(settings);
        manager.load_all().await.unwrap();

        assert_eq!(manager.packs().packs.len(), 3);
        assert!(manager.catalog().is_empty());
    }

    #[tokio::test]
    async fn test_load_all_reads_files() {
        let dir = temp_dir("config-files");
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(
            format!("{}/players.json", dir),
            r#"[{"id": "p1", "name": "A", "rarity": "Gold", "position": "CB", "overall": 80}]"#,
        )
        .await
        .unwrap();
        tokio::fs::write(
            format!("{}/packs.json", dir),
            r#"{"packs": [{"key": "gold", "name": "Gold Pack", "cost": 100, "currency": "GP",
                "description": "Only gold", "rarity_chances": {"Gold": 1.0}}]}"#,
        )
        .await
        .unwrap();

        let mut manager = ConfigManager::new(Settings {
            data_path: dir,
            ..Default::default()
        });
        manager.load_all().await.unwrap();

        assert_eq!(manager.all_players().len(), 1);
        assert!(manager.get_pack("gold").is_some());
        assert!(manager.get_pack("iconic").is_none());
    }

    #[tokio::test]
    async fn test_load_all_rejects_bad_packs() {
        let dir = temp_dir("config-bad");
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(format!("{}/packs.json", dir), r#"{"packs": [{"key": 1}]}"#)
            .await
            .unwrap();

        let mut manager = ConfigManager::new(Settings {
            data_path: dir,
            ..Default::default()
        });
        assert!(manager.load_all().await.is_err());
    }
}

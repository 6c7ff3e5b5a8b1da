use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::{Pack, Player, PlayerCatalog, Rarity};
use crate::error::{BotError, Result};
use crate::game::RarityDrawer;
use crate::managers::SharedConfigManager;
use crate::state::{Balances, PackLimits, PackStock, SharedUserStore, UserData};

/// Result of a successful contract pull
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PullOutcome {
    pub pack_key: String,
    pub pack_name: String,
    pub player: Player,
    pub rarity: Rarity,
    /// The user already owned this player; they got GP instead
    pub duplicate: bool,
    pub duplicate_gp: u64,
    pub balances: Balances,
}

/// Pack listing entry with remaining stock for limited packs
#[derive(Debug, Clone, Serialize)]
pub struct PackInfo {
    #[serde(flatten)]
    pub pack: Pack,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<PackStock>,
}

/// Apply one pull to a user's data.
///
/// The draw happens before the charge, so a catalog gap for the rolled rarity
/// fails the pull without taking the user's currency.
pub fn apply_pull<R: Rng + ?Sized>(
    data: &mut UserData,
    pack: &Pack,
    catalog: &PlayerCatalog,
    rng: &mut R,
) -> Result<PullOutcome> {
    let available = data.balance(pack.currency);
    if available < pack.cost {
        return Err(BotError::InsufficientFunds {
            currency: pack.currency,
            needed: pack.cost,
            available,
        });
    }

    let draw = RarityDrawer::new(catalog).draw(pack, rng)?;

    data.charge(pack.currency, pack.cost)?;

    let duplicate = data.owns_player(&draw.player.id);
    let duplicate_gp = if duplicate {
        let value = draw.player.rarity.sell_value();
        data.gp += value;
        value
    } else {
        data.players.push(draw.player.clone());
        0
    };

    Ok(PullOutcome {
        pack_key: pack.key.clone(),
        pack_name: pack.name.clone(),
        rarity: draw.rarity,
        player: draw.player,
        duplicate,
        duplicate_gp,
        balances: data.balances(),
    })
}

/// Runs contract pulls against the shared config and user store
pub struct ContractManager {
    config_manager: SharedConfigManager,
    users: SharedUserStore,
    limits: Mutex<PackLimits>,
    limits_path: String,
}

impl ContractManager {
    pub fn new(
        config_manager: SharedConfigManager,
        users: SharedUserStore,
        limits: PackLimits,
        limits_path: &str,
    ) -> Self {
        Self {
            config_manager,
            users,
            limits: Mutex::new(limits),
            limits_path: limits_path.to_string(),
        }
    }

    /// Pull one player from a pack for a user
    pub async fn pull(&self, user_id: &str, pack_key: &str) -> Result<PullOutcome> {
        let config = self.config_manager.read().await;
        let pack = config
            .get_pack(pack_key)
            .ok_or_else(|| BotError::InvalidPack {
                key: pack_key.to_string(),
            })?;

        // Held across the user update so stock and charge change together
        let mut limits = self.limits.lock().await;
        if !limits.available(&pack.key) {
            return Err(BotError::PackSoldOut {
                pack: pack.name.clone(),
            });
        }

        let catalog = config.catalog();
        let outcome = self
            .users
            .update(user_id, |data| {
                let mut rng = rand::thread_rng();
                apply_pull(data, pack, catalog, &mut rng)
            })
            .await?;

        if limits.get(&pack.key).is_some() {
            limits.take_one(&pack.key);
            if let Err(e) = limits.save(&self.limits_path).await {
                warn!("Failed to save pack limits: {}", e);
            }
        }

        info!(
            "User {} pulled {} ({}) from {}{}",
            user_id,
            outcome.player.name,
            outcome.rarity,
            pack.key,
            if outcome.duplicate { " [duplicate]" } else { "" }
        );

        Ok(outcome)
    }

    /// All packs in display order with their stock
    pub async fn list_packs(&self) -> Vec<PackInfo> {
        let config = self.config_manager.read().await;
        let limits = self.limits.lock().await;
        config
            .packs()
            .packs
            .iter()
            .map(|pack| PackInfo {
                pack: pack.clone(),
                stock: limits.get(&pack.key),
            })
            .collect()
    }

    /// Best players a pack can produce
    pub async fn top_players(&self, pack_key: &str, count: usize) -> Result<(Pack, Vec<Player>)> {
        let config = self.config_manager.read().await;
        let pack = config
            .get_pack(pack_key)
            .ok_or_else(|| BotError::InvalidPack {
                key: pack_key.to_string(),
            })?;
        let players = config
            .catalog()
            .top_for_pack(pack, count)
            .into_iter()
            .cloned()
            .collect();
        Ok((pack.clone(), players))
    }
}

/// Shared contract manager type
pub type SharedContractManager = Arc<ContractManager>;

pub fn create_shared_contract_manager(
    config_manager: SharedConfigManager,
    users: SharedUserStore,
    limits: PackLimits,
    limits_path: &str,
) -> SharedContractManager {
    Arc::new(ContractManager::new(config_manager, users, limits, limits_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Currency, PacksConfig, RarityChances, Settings};
    use crate::managers::ConfigManager;
    use crate::state::user_store::temp_dir;
    use crate::state::create_shared_user_store;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn gold_player(id: &str) -> Player {
        Player {
            id: id.to_string(),
            name: format!("Gold {}", id),
            rarity: Rarity::Gold,
            position: "AMF".to_string(),
            overall: 84,
            max_overall: None,
        }
    }

    fn gold_pack(limit: Option<u32>) -> Pack {
        Pack {
            key: "gold".to_string(),
            name: "Gold Pack".to_string(),
            cost: 1000,
            currency: Currency::Gp,
            description: "Gold only".to_string(),
            rarity_chances: RarityChances::new(vec![(Rarity::Gold, 1.0)]),
            limit,
            player_pool: None,
        }
    }

    #[test]
    fn test_apply_pull_new_player() {
        let catalog = PlayerCatalog::new(vec![gold_player("g1")]);
        let mut data = UserData::new();
        data.gp = 1500;

        let outcome =
            apply_pull(&mut data, &gold_pack(None), &catalog, &mut StdRng::seed_from_u64(1))
                .unwrap();
        assert!(!outcome.duplicate);
        assert_eq!(outcome.balances.gp, 500);
        assert_eq!(data.players.len(), 1);
    }

    #[test]
    fn test_apply_pull_duplicate_pays_sell_value() {
        let catalog = PlayerCatalog::new(vec![gold_player("g1")]);
        let mut data = UserData::new();
        data.gp = 1000;
        data.players.push(gold_player("g1"));

        let outcome =
            apply_pull(&mut data, &gold_pack(None), &catalog, &mut StdRng::seed_from_u64(1))
                .unwrap();
        assert!(outcome.duplicate);
        assert_eq!(outcome.duplicate_gp, 5000);
        assert_eq!(data.gp, 5000);
        assert_eq!(data.players.len(), 1);
    }

    #[test]
    fn test_apply_pull_insufficient_funds() {
        let catalog = PlayerCatalog::new(vec![gold_player("g1")]);
        let mut data = UserData::new();
        data.gp = 999;

        let err = apply_pull(&mut data, &gold_pack(None), &catalog, &mut StdRng::seed_from_u64(1))
            .unwrap_err();
        assert!(matches!(err, BotError::InsufficientFunds { needed: 1000, available: 999, .. }));
        assert_eq!(data.gp, 999);
    }

    #[test]
    fn test_apply_pull_catalog_gap_does_not_charge() {
        let catalog = PlayerCatalog::new(vec![]);
        let mut data = UserData::new();
        data.gp = 5000;

        let err = apply_pull(&mut data, &gold_pack(None), &catalog, &mut StdRng::seed_from_u64(1))
            .unwrap_err();
        assert!(matches!(err, BotError::NoPlayersForRarity { rarity: Rarity::Gold }));
        assert_eq!(data.gp, 5000);
        assert!(data.players.is_empty());
    }

    async fn manager(label: &str, limit: Option<u32>) -> (ContractManager, SharedUserStore) {
        let dir = temp_dir(label);
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let settings = Settings {
            data_path: dir.clone(),
            ..Default::default()
        };
        let packs = PacksConfig {
            packs: vec![gold_pack(limit)],
        };
        let limits_path = settings.pack_limits_path();
        let limits = PackLimits::load(&limits_path, &packs).await;
        let config = Arc::new(tokio::sync::RwLock::new(ConfigManager::from_parts(
            settings.clone(),
            packs,
            PlayerCatalog::new(vec![gold_player("g1"), gold_player("g2")]),
        )));
        let users = create_shared_user_store(&settings.users_dir());
        (
            ContractManager::new(config, users.clone(), limits, &limits_path),
            users,
        )
    }

    #[tokio::test]
    async fn test_pull_persists_result() {
        let (manager, users) = manager("contract-pull", None).await;
        users
            .update("1", |data| {
                data.gp = 2000;
                Ok(())
            })
            .await
            .unwrap();

        let outcome = manager.pull("1", "gold").await.unwrap();
        assert_eq!(outcome.pack_key, "gold");
        let saved = users.load("1").await.unwrap();
        assert_eq!(saved.gp, 1000);
        assert_eq!(saved.players.len(), 1);
    }

    #[tokio::test]
    async fn test_pull_unknown_pack() {
        let (manager, _) = manager("contract-unknown", None).await;
        assert!(matches!(
            manager.pull("1", "mystery").await,
            Err(BotError::InvalidPack { .. })
        ));
    }

    #[tokio::test]
    async fn test_limited_pack_sells_out() {
        let (manager, users) = manager("contract-limit", Some(1)).await;
        users
            .update("1", |data| {
                data.gp = 10_000;
                Ok(())
            })
            .await
            .unwrap();

        manager.pull("1", "gold").await.unwrap();
        assert!(matches!(
            manager.pull("1", "gold").await,
            Err(BotError::PackSoldOut { .. })
        ));
        assert_eq!(users.load("1").await.unwrap().gp, 9000);

        let packs = manager.list_packs().await;
        assert_eq!(packs[0].stock.unwrap().remaining, 0);
    }

    #[tokio::test]
    async fn test_failed_pull_keeps_stock() {
        let (manager, _) = manager("contract-broke", Some(1)).await;
        assert!(matches!(
            manager.pull("1", "gold").await,
            Err(BotError::InsufficientFunds { .. })
        ));
        let packs = manager.list_packs().await;
        assert_eq!(packs[0].stock.unwrap().remaining, 1);
    }

    #[tokio::test]
    async fn test_top_players() {
        let (manager, _) = manager("contract-top", None).await;
        let (pack, players) = manager.top_players("gold", 10).await.unwrap();
        assert_eq!(pack.key, "gold");
        assert_eq!(players.len(), 2);
    }
}

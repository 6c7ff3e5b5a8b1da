use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::config::Player;
use crate::error::{BotError, Result};
use crate::state::{SharedUserStore, Squad, UserData};

/// Discord allows at most 25 autocomplete choices
pub const MAX_SUGGESTIONS: usize = 25;

const MAX_STARTERS: usize = 11;

#[derive(Debug, Clone, Serialize)]
pub struct SquadView {
    pub squad: Squad,
    pub formation: String,
}

/// Player collection and squad management
pub struct CollectionManager {
    users: SharedUserStore,
}

impl CollectionManager {
    pub fn new(users: SharedUserStore) -> Self {
        Self { users }
    }

    pub async fn user(&self, user_id: &str) -> Result<UserData> {
        self.users.load(user_id).await
    }

    pub async fn players(&self, user_id: &str) -> Result<Vec<Player>> {
        Ok(self.users.load(user_id).await?.players)
    }

    /// Remove the first owned copy of a player
    pub async fn remove_player(&self, user_id: &str, player_id: &str) -> Result<Player> {
        let removed = self
            .users
            .update(user_id, |data| {
                let removed = data.remove_player(player_id)?;
                if !data.owns_player(player_id) {
                    for slot in data.squad.main.iter_mut().chain(data.squad.bench.iter_mut()) {
                        if slot.as_deref() == Some(player_id) {
                            *slot = None;
                        }
                    }
                }
                Ok(removed)
            })
            .await?;

        info!("User {} removed player {}", user_id, removed.name);
        Ok(removed)
    }

    /// Owned players matching `query`, for autocomplete
    pub async fn suggest(&self, user_id: &str, query: &str) -> Vec<Player> {
        match self.users.load(user_id).await {
            Ok(data) => data
                .search_players(query, MAX_SUGGESTIONS)
                .into_iter()
                .cloned()
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    pub async fn squad(&self, user_id: &str) -> Result<SquadView> {
        let data = self.users.load(user_id).await?;
        Ok(SquadView {
            squad: data.squad,
            formation: data.formation,
        })
    }

    /// Replace the squad and/or formation. Fields left as `None` are kept.
    pub async fn update_squad(
        &self,
        user_id: &str,
        squad: Option<Squad>,
        formation: Option<String>,
    ) -> Result<SquadView> {
        if let Some(formation) = &formation {
            validate_formation(formation)?;
        }

        self.users
            .update(user_id, |data| {
                if let Some(squad) = squad {
                    if squad.main.len() > MAX_STARTERS {
                        return Err(BotError::ConfigValidation {
                            message: format!("a squad has at most {} starters", MAX_STARTERS),
                        });
                    }
                    for id in squad.main.iter().chain(squad.bench.iter()).flatten() {
                        if !data.owns_player(id) {
                            return Err(BotError::PlayerNotOwned {
                                player_id: id.clone(),
                            });
                        }
                    }
                    data.squad = squad;
                }
                if let Some(formation) = formation {
                    data.formation = formation;
                }
                Ok(SquadView {
                    squad: data.squad.clone(),
                    formation: data.formation.clone(),
                })
            })
            .await
    }
}

/// Formations look like "4-3-3": outfield line sizes summing to ten
fn validate_formation(formation: &str) -> Result<()> {
    let lines: Option<Vec<u32>> = formation
        .split('-')
        .map(|part| part.parse::<u32>().ok().filter(|n| *n > 0))
        .collect();

    match lines {
        Some(lines) if lines.len() >= 2 && lines.iter().sum::<u32>() == 10 => Ok(()),
        _ => Err(BotError::ConfigValidation {
            message: format!("invalid formation '{}'", formation),
        }),
    }
}

/// Shared collection manager type
pub type SharedCollectionManager = Arc<CollectionManager>;

pub fn create_shared_collection_manager(users: SharedUserStore) -> SharedCollectionManager {
    Arc::new(CollectionManager::new(users))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Rarity;
    use crate::state::create_shared_user_store;
    use crate::state::user_store::temp_dir;

    fn player(id: &str, name: &str) -> Player {
        Player {
            id: id.to_string(),
            name: name.to_string(),
            rarity: Rarity::Silver,
            position: "DMF".to_string(),
            overall: 75,
            max_overall: None,
        }
    }

    async fn seeded(label: &str) -> CollectionManager {
        let users = create_shared_user_store(&temp_dir(label));
        users
            .update("3", |data| {
                data.players.push(player("p1", "Andrea Anchor"));
                data.players.push(player("p2", "Bruno Box"));
                data.squad.main = vec![Some("p1".to_string()), None];
                Ok(())
            })
            .await
            .unwrap();
        CollectionManager::new(users)
    }

    #[tokio::test]
    async fn test_remove_player_clears_squad_slot() {
        let manager = seeded("collection-remove").await;

        let removed = manager.remove_player("3", "p1").await.unwrap();
        assert_eq!(removed.id, "p1");

        let view = manager.squad("3").await.unwrap();
        assert_eq!(view.squad.main, vec![None, None]);
        assert!(matches!(
            manager.remove_player("3", "p1").await,
            Err(BotError::PlayerNotOwned { .. })
        ));
    }

    #[tokio::test]
    async fn test_remove_from_empty_collection() {
        let users = create_shared_user_store(&temp_dir("collection-empty"));
        let manager = CollectionManager::new(users);
        assert!(matches!(
            manager.remove_player("8", "p1").await,
            Err(BotError::PlayerNotOwned { .. })
        ));
    }

    #[tokio::test]
    async fn test_suggest() {
        let manager = seeded("collection-suggest").await;
        assert_eq!(manager.suggest("3", "box").await.len(), 1);
        assert_eq!(manager.suggest("3", "").await.len(), 2);
        assert!(manager.suggest("3", "zzz").await.is_empty());
    }

    #[tokio::test]
    async fn test_update_squad() {
        let manager = seeded("collection-squad").await;

        let squad = Squad {
            main: vec![Some("p2".to_string())],
            bench: vec![Some("p1".to_string())],
        };
        let view = manager
            .update_squad("3", Some(squad.clone()), Some("4-4-2".to_string()))
            .await
            .unwrap();
        assert_eq!(view.squad, squad);
        assert_eq!(view.formation, "4-4-2");

        // formation only keeps the squad
        let view = manager
            .update_squad("3", None, Some("3-5-2".to_string()))
            .await
            .unwrap();
        assert_eq!(view.squad, squad);
    }

    #[tokio::test]
    async fn test_update_squad_rejects_unowned_and_bad_formation() {
        let manager = seeded("collection-squad-bad").await;

        let squad = Squad {
            main: vec![Some("p99".to_string())],
            bench: vec![],
        };
        assert!(matches!(
            manager.update_squad("3", Some(squad), None).await,
            Err(BotError::PlayerNotOwned { .. })
        ));
        assert!(manager
            .update_squad("3", None, Some("4-4".to_string()))
            .await
            .is_err());
        assert_eq!(manager.squad("3").await.unwrap().formation, "4-3-3");
    }
}

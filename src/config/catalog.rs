use serde::{Deserialize, Serialize};

use super::packs::Pack;
use super::rarity::Rarity;

/// A collectible player card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: String,
    pub name: String,
    pub rarity: Rarity,
    pub position: String,
    /// Level 1 overall rating
    pub overall: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_overall: Option<u32>,
}

impl Player {
    pub fn max_overall_or_base(&self) -> u32 {
        self.max_overall.unwrap_or(self.overall)
    }

    /// Label used in autocomplete lists
    pub fn summary(&self) -> String {
        format!(
            "{} ({} - {} - {} OVR)",
            self.name, self.rarity, self.position, self.overall
        )
    }
}

/// Read-only list of every player that can be drawn, loaded from data/players.json
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerCatalog {
    players: Vec<Player>,
}

impl PlayerCatalog {
    pub fn new(players: Vec<Player>) -> Self {
        Self { players }
    }

    /// Load from a JSON file containing an array of players
    pub fn load_from_file(path: &str) -> crate::error::Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| crate::error::BotError::ConfigLoad {
                path: path.to_string(),
                source: e,
            })?;

        serde_json::from_str(&content).map_err(|e| crate::error::BotError::ConfigParse {
            path: path.to_string(),
            source: e,
        })
    }

    pub fn all(&self) -> &[Player] {
        &self.players
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    /// Players of one rarity, optionally restricted to a pack's player pool
    pub fn by_rarity(&self, rarity: Rarity, pool: Option<&[String]>) -> Vec<&Player> {
        self.players
            .iter()
            .filter(|p| p.rarity == rarity)
            .filter(|p| pool.map_or(true, |ids| ids.iter().any(|id| *id == p.id)))
            .collect()
    }

    /// Highest-rated players a pack can produce, best first
    pub fn top_for_pack(&self, pack: &Pack, count: usize) -> Vec<&Player> {
        let allowed = pack.allowed_rarities();
        let pool = pack.player_pool.as_deref();

        let mut candidates: Vec<&Player> = self
            .players
            .iter()
            .filter(|p| allowed.contains(&p.rarity))
            .filter(|p| pool.map_or(true, |ids| ids.iter().any(|id| *id == p.id)))
            .collect();

        candidates.sort_by(|a, b| b.overall.cmp(&a.overall));
        candidates.truncate(count);
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PacksConfig;

    fn player(id: &str, rarity: Rarity, overall: u32) -> Player {
        Player {
            id: id.to_string(),
            name: format!("Player {}", id),
            rarity,
            position: "CF".to_string(),
            overall,
            max_overall: None,
        }
    }

    #[test]
    fn test_parse_catalog() {
        let json = r#"[
            {"id": "p1", "name": "Striker", "rarity": "Gold", "position": "CF", "overall": 88, "maxOverall": 95},
            {"id": "p2", "name": "Keeper", "rarity": "White", "position": "GK", "overall": 70}
        ]"#;

        let catalog: PlayerCatalog = serde_json::from_str(json).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("p1").unwrap().max_overall_or_base(), 95);
        assert_eq!(catalog.get("p2").unwrap().max_overall_or_base(), 70);
    }

    #[test]
    fn test_by_rarity_respects_pool() {
        let catalog = PlayerCatalog::new(vec![
            player("a", Rarity::Gold, 80),
            player("b", Rarity::Gold, 81),
            player("c", Rarity::Silver, 75),
        ]);

        assert_eq!(catalog.by_rarity(Rarity::Gold, None).len(), 2);
        let pool = vec!["b".to_string()];
        let pooled = catalog.by_rarity(Rarity::Gold, Some(&pool));
        assert_eq!(pooled.len(), 1);
        assert_eq!(pooled[0].id, "b");
        assert!(catalog.by_rarity(Rarity::Iconic, None).is_empty());
    }

    #[test]
    fn test_top_for_pack_skips_zero_chance_rarities() {
        let catalog = PlayerCatalog::new(vec![
            player("w", Rarity::White, 99),
            player("g", Rarity::Gold, 85),
            player("l", Rarity::Legend, 90),
        ]);
        let packs = PacksConfig::default();
        let legend = packs.get("legend").unwrap();

        let top = catalog.top_for_pack(legend, 10);
        let ids: Vec<&str> = top.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["l", "g"]);
    }
}

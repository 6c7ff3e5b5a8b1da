use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;

use super::rarity::Rarity;
use crate::error::BotError;
use tracing::warn;

/// Currency a pack is paid with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    #[serde(rename = "GP")]
    Gp,
    #[serde(rename = "eCoins")]
    ECoins,
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Currency::Gp => f.write_str("GP"),
            Currency::ECoins => f.write_str("eCoins"),
        }
    }
}

/// Rarity -> probability table that keeps the order entries were written in.
///
/// Order is significant: the draw walks the entries front to back and the last
/// entry absorbs whatever probability mass the others leave unassigned.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RarityChances(Vec<(Rarity, f64)>);

impl RarityChances {
    pub fn new(entries: Vec<(Rarity, f64)>) -> Self {
        Self(entries)
    }

    pub fn entries(&self) -> &[(Rarity, f64)] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.0.iter().map(|(_, chance)| chance).sum()
    }

    pub fn get(&self, rarity: Rarity) -> Option<f64> {
        self.0.iter().find(|(r, _)| *r == rarity).map(|(_, c)| *c)
    }
}

impl Serialize for RarityChances {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (rarity, chance) in &self.0 {
            map.serialize_entry(rarity, chance)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RarityChances {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ChancesVisitor;

        impl<'de> Visitor<'de> for ChancesVisitor {
            type Value = RarityChances;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of rarity to probability")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((rarity, chance)) = map.next_entry::<Rarity, f64>()? {
                    entries.push((rarity, chance));
                }
                Ok(RarityChances(entries))
            }
        }

        deserializer.deserialize_map(ChancesVisitor)
    }
}

/// A purchasable contract pack
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Pack {
    /// Stable key used in commands and API calls (e.g. "iconic")
    pub key: String,

    /// Display name
    pub name: String,

    pub cost: u64,

    pub currency: Currency,

    pub description: String,

    pub rarity_chances: RarityChances,

    /// Total stock across all users; unlimited when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,

    /// Player ids this pack may draw from; the whole catalog when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_pool: Option<Vec<String>>,
}

impl Pack {
    /// Rarities with a non-zero chance of being drawn
    pub fn allowed_rarities(&self) -> Vec<Rarity> {
        self.rarity_chances
            .entries()
            .iter()
            .filter(|(_, chance)| *chance > 0.0)
            .map(|(rarity, _)| *rarity)
            .collect()
    }

    pub fn emoji(&self) -> &'static str {
        match self.key.as_str() {
            "iconic" => "💎",
            "legend" => "🏆",
            "standard" => "📦",
            _ => "🎴",
        }
    }

    /// One-line price label, e.g. "500 eCoins"
    pub fn price_label(&self) -> String {
        format!("{} {}", self.cost, self.currency)
    }
}

/// Pack table, loaded from data/packs.json or the built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PacksConfig {
    pub packs: Vec<Pack>,
}

impl PacksConfig {
    /// Load from a JSON file
    pub fn load_from_file(path: &str) -> crate::error::Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| crate::error::BotError::ConfigLoad {
                path: path.to_string(),
                source: e,
            })?;

        let config: Self =
            serde_json::from_str(&content).map_err(|e| crate::error::BotError::ConfigParse {
                path: path.to_string(),
                source: e,
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Reject tables the draw cannot work with. Chances are not required to sum to 1.
    pub fn validate(&self) -> crate::error::Result<()> {
        let mut keys = HashSet::new();
        for pack in &self.packs {
            if !keys.insert(pack.key.as_str()) {
                return Err(BotError::ConfigValidation {
                    message: format!("duplicate pack key '{}'", pack.key),
                });
            }
            if pack.rarity_chances.is_empty() {
                return Err(BotError::ConfigValidation {
                    message: format!("pack '{}' has no rarity chances", pack.key),
                });
            }
            if let Some((rarity, chance)) = pack
                .rarity_chances
                .entries()
                .iter()
                .find(|(_, c)| !c.is_finite() || *c < 0.0)
            {
                return Err(BotError::ConfigValidation {
                    message: format!(
                        "pack '{}' has invalid chance {} for {}",
                        pack.key, chance, rarity
                    ),
                });
            }
            let total = pack.rarity_chances.total();
            if (total - 1.0).abs() > 1e-6 {
                warn!("Pack '{}' chances sum to {:.3}", pack.key, total);
            }
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Pack> {
        self.packs.iter().find(|p| p.key == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.packs.iter().map(|p| p.key.as_str())
    }
}

impl Default for PacksConfig {
    fn default() -> Self {
        use Rarity::*;

        Self {
            packs: vec![
                Pack {
                    key: "iconic".to_string(),
                    name: "Iconic Moment Pack".to_string(),
                    cost: 500,
                    currency: Currency::ECoins,
                    description: "A special pack containing players of all rarities, with a chance to get an Iconic Moment player!".to_string(),
                    rarity_chances: RarityChances::new(vec![
                        (Iconic, 0.01),
                        (Legend, 0.03),
                        (Black, 0.10),
                        (Gold, 0.20),
                        (Silver, 0.30),
                        (Bronze, 0.26),
                        (White, 0.10),
                    ]),
                    limit: None,
                    player_pool: None,
                },
                Pack {
                    key: "legend".to_string(),
                    name: "Legend Box Draw".to_string(),
                    cost: 25_000,
                    currency: Currency::Gp,
                    description: "A box draw with a chance to get a Legend player!".to_string(),
                    rarity_chances: RarityChances::new(vec![
                        (Legend, 0.05),
                        (Black, 0.15),
                        (Gold, 0.25),
                        (Silver, 0.35),
                        (Bronze, 0.20),
                        (White, 0.0),
                    ]),
                    limit: None,
                    player_pool: None,
                },
                Pack {
                    key: "standard".to_string(),
                    name: "Standard Pack".to_string(),
                    cost: 10_000,
                    currency: Currency::Gp,
                    description: "A standard pack containing players from Black to White rarity.".to_string(),
                    rarity_chances: RarityChances::new(vec![
                        (Black, 0.05),
                        (Gold, 0.20),
                        (Silver, 0.40),
                        (Bronze, 0.25),
                        (White, 0.10),
                    ]),
                    limit: None,
                    player_pool: None,
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_packs_keeps_chance_order() {
        let json = r#"{
            "packs": [
                {
                    "key": "promo",
                    "name": "Promo Pack",
                    "cost": 300,
                    "currency": "eCoins",
                    "description": "Limited promo",
                    "rarity_chances": { "White": 0.5, "Iconic": 0.1, "Gold": 0.2 },
                    "limit": 150,
                    "player_pool": ["p1", "p2"]
                }
            ]
        }"#;

        let config: PacksConfig = serde_json::from_str(json).unwrap();
        let pack = config.get("promo").unwrap();
        let order: Vec<Rarity> = pack.rarity_chances.entries().iter().map(|(r, _)| *r).collect();
        assert_eq!(order, vec![Rarity::White, Rarity::Iconic, Rarity::Gold]);
        assert_eq!(pack.currency, Currency::ECoins);
        assert_eq!(pack.limit, Some(150));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_chances_serialize_in_order() {
        let chances = RarityChances::new(vec![(Rarity::Silver, 0.7), (Rarity::Legend, 0.3)]);
        let json = serde_json::to_string(&chances).unwrap();
        assert_eq!(json, r#"{"Silver":0.7,"Legend":0.3}"#);
    }

    #[test]
    fn test_default_packs() {
        let config = PacksConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.keys().collect::<Vec<_>>(), vec!["iconic", "legend", "standard"]);

        let legend = config.get("legend").unwrap();
        assert!(!legend.allowed_rarities().contains(&Rarity::White));
        assert_eq!(legend.rarity_chances.get(Rarity::White), Some(0.0));
        assert_eq!(legend.price_label(), "25000 GP");
    }

    #[test]
    fn test_validate_rejects_negative_chance() {
        let mut config = PacksConfig::default();
        config.packs[0].rarity_chances = RarityChances::new(vec![(Rarity::Gold, -0.1)]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_keys() {
        let mut config = PacksConfig::default();
        let copy = config.packs[0].clone();
        config.packs.push(copy);
        assert!(config.validate().is_err());
    }
}

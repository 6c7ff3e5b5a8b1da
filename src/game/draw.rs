//! Weighted rarity draw for contract packs.

use rand::Rng;

use crate::config::{Pack, Player, PlayerCatalog, Rarity, RarityChances};
use crate::error::{BotError, Result};

/// Pick a rarity from an ordered chance table using a uniform sample in [0, 1).
///
/// Entries are accumulated in order and the first one whose running total exceeds
/// `sample` wins. When no entry qualifies (chances summing below 1, or rounding) the
/// last entry is returned, so a pack can leave its final rarity under-specified and
/// have it absorb the remainder. Returns `None` only for an empty table.
pub fn draw_rarity(chances: &RarityChances, sample: f64) -> Option<Rarity> {
    let mut cumulative = 0.0;
    for (rarity, chance) in chances.entries() {
        cumulative += chance;
        if sample < cumulative {
            return Some(*rarity);
        }
    }

    chances.entries().last().map(|(rarity, _)| *rarity)
}

/// Pick a player uniformly among the catalog players of `rarity`
pub fn draw_player<'a, R: Rng + ?Sized>(
    catalog: &'a PlayerCatalog,
    rarity: Rarity,
    pool: Option<&[String]>,
    rng: &mut R,
) -> Result<&'a Player> {
    let candidates = catalog.by_rarity(rarity, pool);
    if candidates.is_empty() {
        return Err(BotError::NoPlayersForRarity { rarity });
    }

    Ok(candidates[rng.gen_range(0..candidates.len())])
}

/// Result of a single pack draw
#[derive(Debug, Clone)]
pub struct Draw {
    pub rarity: Rarity,
    pub player: Player,
}

/// Draws players from packs against a catalog. Holds no state of its own.
pub struct RarityDrawer<'a> {
    catalog: &'a PlayerCatalog,
}

impl<'a> RarityDrawer<'a> {
    pub fn new(catalog: &'a PlayerCatalog) -> Self {
        Self { catalog }
    }

    pub fn draw<R: Rng + ?Sized>(&self, pack: &Pack, rng: &mut R) -> Result<Draw> {
        let sample: f64 = rng.gen();
        let rarity = draw_rarity(&pack.rarity_chances, sample).ok_or_else(|| {
            BotError::InvalidPack {
                key: pack.key.clone(),
            }
        })?;

        let player = draw_player(self.catalog, rarity, pack.player_pool.as_deref(), rng)?;

        Ok(Draw {
            rarity,
            player: player.clone(),
        })
    }
}

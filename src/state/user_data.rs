use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::config::{Currency, Player, Rarity};
use crate::error::{BotError, Result};
use crate::game::{PenaltyState, RewardEvent};

/// Everything stored for one Discord user (data/users/<id>.json)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    #[serde(default)]
    pub gp: u64,

    #[serde(default)]
    pub e_coins: u64,

    /// Owned players in pull order
    #[serde(default)]
    pub players: Vec<Player>,

    #[serde(default)]
    pub mail: Vec<Mail>,

    #[serde(default)]
    pub minigames: Minigames,

    #[serde(default)]
    pub squad: Squad,

    #[serde(default = "default_formation")]
    pub formation: String,

    #[serde(default)]
    pub inventory: Inventory,
}

fn default_formation() -> String {
    "4-3-3".to_string()
}

impl Default for UserData {
    fn default() -> Self {
        Self {
            gp: 0,
            e_coins: 0,
            players: Vec::new(),
            mail: Vec::new(),
            minigames: Minigames::default(),
            squad: Squad::default(),
            formation: default_formation(),
            inventory: Inventory::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Minigames {
    #[serde(default)]
    pub penalty: PenaltyState,
}

/// Starting eleven and bench, as player ids. Empty pitch slots are null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Squad {
    #[serde(default)]
    pub main: Vec<Option<String>>,
    #[serde(default)]
    pub bench: Vec<Option<String>>,
}

/// Items received from mail that are not currencies or players
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    /// Unopened packs by rarity
    #[serde(default)]
    pub packs: BTreeMap<Rarity, u32>,
    #[serde(default)]
    pub trainers: Vec<String>,
}

/// A claimable reward
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredMail")]
pub struct Mail {
    pub id: String,

    #[serde(flatten)]
    pub payload: MailPayload,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Day the mail was sent (YYYY-MM-DD)
    pub date: String,

    #[serde(default)]
    pub claimed: bool,
}

/// Mail as found on disk. Admin reward mail may carry a numeric id and a bare
/// `rewards` object without a `type` tag.
#[derive(Deserialize)]
struct StoredMail {
    #[serde(deserialize_with = "string_or_number")]
    id: String,

    #[serde(flatten)]
    payload: StoredPayload,

    #[serde(default)]
    title: Option<String>,

    #[serde(default)]
    message: Option<String>,

    #[serde(default)]
    date: String,

    #[serde(default)]
    claimed: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredPayload {
    Tagged(MailPayload),
    Untagged { rewards: RewardBundle },
}

impl From<StoredMail> for Mail {
    fn from(stored: StoredMail) -> Self {
        let payload = match stored.payload {
            StoredPayload::Tagged(payload) => payload,
            StoredPayload::Untagged { rewards } => MailPayload::Bundle { rewards },
        };
        Self {
            id: stored.id,
            payload,
            title: stored.title,
            message: stored.message,
            date: stored.date,
            claimed: stored.claimed,
        }
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(id) => id,
        RawId::Number(n) => n.to_string(),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MailPayload {
    #[serde(rename = "gp")]
    Gp { amount: u64 },

    #[serde(rename = "eCoins")]
    ECoins { amount: u64 },

    #[serde(rename = "pack")]
    Pack {
        rarity: Rarity,
        #[serde(default = "default_qty")]
        qty: u32,
    },

    #[serde(rename = "trainer")]
    Trainer {
        #[serde(rename = "trainerName")]
        trainer_name: String,
        #[serde(default)]
        exp: u64,
    },

    #[serde(rename = "rewards")]
    Bundle { rewards: RewardBundle },
}

fn default_qty() -> u32 {
    1
}

/// Several rewards delivered in a single mail
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardBundle {
    #[serde(default)]
    pub gp: u64,
    #[serde(default)]
    pub e_coins: u64,
    #[serde(default)]
    pub players: Vec<Player>,
    #[serde(default)]
    pub packs: Vec<Rarity>,
}

impl From<&RewardEvent> for MailPayload {
    fn from(event: &RewardEvent) -> Self {
        match event {
            RewardEvent::ECoinMilestone { amount } | RewardEvent::ECoins { amount } => {
                MailPayload::ECoins { amount: *amount }
            }
            RewardEvent::GpMilestone { amount, .. } | RewardEvent::Gp { amount } => {
                MailPayload::Gp { amount: *amount }
            }
            RewardEvent::Trainer { name, exp } => MailPayload::Trainer {
                trainer_name: name.clone(),
                exp: *exp,
            },
            RewardEvent::FreePack { rarity } => MailPayload::Pack {
                rarity: *rarity,
                qty: 1,
            },
        }
    }
}

impl Mail {
    pub fn new(payload: MailPayload, date: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().simple().to_string(),
            payload,
            title: None,
            message: None,
            date: date.to_string(),
            claimed: false,
        }
    }
}

/// Balances after a mutation, returned to the web dashboard
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Balances {
    pub gp: u64,
    pub e_coins: u64,
}

/// Totals credited by one or more claims
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimTotals {
    pub gp: u64,
    pub e_coins: u64,
    pub players: usize,
    pub packs: u32,
    pub trainers: usize,
}

impl ClaimTotals {
    fn add(&mut self, other: &ClaimTotals) {
        self.gp += other.gp;
        self.e_coins += other.e_coins;
        self.players += other.players;
        self.packs += other.packs;
        self.trainers += other.trainers;
    }
}

impl UserData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balances(&self) -> Balances {
        Balances {
            gp: self.gp,
            e_coins: self.e_coins,
        }
    }

    pub fn balance(&self, currency: Currency) -> u64 {
        match currency {
            Currency::Gp => self.gp,
            Currency::ECoins => self.e_coins,
        }
    }

    /// Deduct `amount`, failing without change if the balance is too low
    pub fn charge(&mut self, currency: Currency, amount: u64) -> Result<()> {
        let available = self.balance(currency);
        if available < amount {
            return Err(BotError::InsufficientFunds {
                currency,
                needed: amount,
                available,
            });
        }
        match currency {
            Currency::Gp => self.gp -= amount,
            Currency::ECoins => self.e_coins -= amount,
        }
        Ok(())
    }

    pub fn owns_player(&self, player_id: &str) -> bool {
        self.players.iter().any(|p| p.id == player_id)
    }

    /// Remove the first owned copy of a player
    pub fn remove_player(&mut self, player_id: &str) -> Result<Player> {
        let index = self
            .players
            .iter()
            .position(|p| p.id == player_id)
            .ok_or_else(|| BotError::PlayerNotOwned {
                player_id: player_id.to_string(),
            })?;
        Ok(self.players.remove(index))
    }

    /// Owned players whose name contains `query` (case-insensitive)
    pub fn search_players(&self, query: &str, limit: usize) -> Vec<&Player> {
        let query = query.to_lowercase();
        self.players
            .iter()
            .filter(|p| p.name.to_lowercase().contains(&query))
            .take(limit)
            .collect()
    }

    pub fn push_mail(&mut self, payload: MailPayload, date: &str) -> &Mail {
        self.mail.push(Mail::new(payload, date));
        &self.mail[self.mail.len() - 1]
    }

    pub fn unclaimed_mail_count(&self) -> usize {
        self.mail.iter().filter(|m| !m.claimed).count()
    }

    /// Mail sorted newest first
    pub fn mail_newest_first(&self) -> Vec<&Mail> {
        let mut mail: Vec<&Mail> = self.mail.iter().collect();
        mail.sort_by(|a, b| b.date.cmp(&a.date));
        mail
    }

    /// Claim one mail and credit its contents
    pub fn claim_mail(&mut self, mail_id: &str) -> Result<ClaimTotals> {
        let index = self
            .mail
            .iter()
            .position(|m| m.id == mail_id)
            .ok_or_else(|| BotError::MailNotFound {
                mail_id: mail_id.to_string(),
            })?;

        if self.mail[index].claimed {
            return Err(BotError::MailAlreadyClaimed {
                mail_id: mail_id.to_string(),
            });
        }

        self.mail[index].claimed = true;
        let payload = self.mail[index].payload.clone();
        Ok(self.apply_payload(payload))
    }

    /// Claim every unclaimed mail. Returns how many were claimed and what they held.
    pub fn claim_all_mail(&mut self) -> (usize, ClaimTotals) {
        let mut totals = ClaimTotals::default();
        let mut payloads = Vec::new();

        for mail in self.mail.iter_mut().filter(|m| !m.claimed) {
            mail.claimed = true;
            payloads.push(mail.payload.clone());
        }

        let count = payloads.len();
        for payload in payloads {
            let credited = self.apply_payload(payload);
            totals.add(&credited);
        }
        (count, totals)
    }

    fn apply_payload(&mut self, payload: MailPayload) -> ClaimTotals {
        let mut totals = ClaimTotals::default();
        match payload {
            MailPayload::Gp { amount } => {
                self.gp += amount;
                totals.gp = amount;
            }
            MailPayload::ECoins { amount } => {
                self.e_coins += amount;
                totals.e_coins = amount;
            }
            MailPayload::Pack { rarity, qty } => {
                *self.inventory.packs.entry(rarity).or_insert(0) += qty;
                totals.packs = qty;
            }
            MailPayload::Trainer { trainer_name, .. } => {
                self.inventory.trainers.push(trainer_name);
                totals.trainers = 1;
            }
            MailPayload::Bundle { rewards } => {
                self.gp += rewards.gp;
                self.e_coins += rewards.e_coins;
                totals.gp = rewards.gp;
                totals.e_coins = rewards.e_coins;
                totals.players = rewards.players.len();
                totals.packs = rewards.packs.len() as u32;
                self.players.extend(rewards.players);
                for rarity in rewards.packs {
                    *self.inventory.packs.entry(rarity).or_insert(0) += 1;
                }
            }
        }
        totals
    }
}

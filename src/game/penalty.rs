//! Daily penalty minigame.
//!
//! Each user has a path of 35 steps. One shot per calendar day moves them down the
//! path (8 steps on a goal, 4 on a miss). Landing on certain values pays milestone
//! rewards once per cycle, and reaching 0 rolls a bigger reward and restarts the path.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::config::Rarity;
use crate::error::{BotError, Result};

pub const START_STEPS: u32 = 35;
pub const ON_SCORE: u32 = 8;
pub const ON_MISS: u32 = 4;

const ECOIN_MILESTONE: u32 = 19;
const ECOIN_MILESTONE_AMOUNT: u64 = 50;
const GP_MILESTONE_AMOUNT: u64 = 500;

/// Where the shooter aims, and where the keeper dives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    Center,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 3] = [Direction::Left, Direction::Center, Direction::Right];

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Left => "left",
            Direction::Center => "center",
            Direction::Right => "right",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Direction {
    type Err = BotError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Direction::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| BotError::Internal {
                message: format!("unknown shot direction '{}'", s),
            })
    }
}

/// Milestones already paid out in the current cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Milestones {
    #[serde(default)]
    pub ecoin19: bool,

    /// Remaining values that already paid the GP milestone
    #[serde(default)]
    pub gp: BTreeMap<u32, bool>,
}

/// Where a user is in today's penalty flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PenaltyPhase {
    /// No shot taken today
    Idle,
    /// Aim buttons shown, direction not chosen yet
    Armed,
    /// Today's shot is used
    Resolved,
}

/// Per-user penalty progress, stored under `minigames.penalty`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PenaltyState {
    /// Day the milestone flags belong to (YYYY-MM-DD)
    #[serde(default)]
    pub date: String,

    /// Day of the last shot (YYYY-MM-DD)
    #[serde(default)]
    pub last_play: String,

    #[serde(default = "default_remaining")]
    pub remaining: u32,

    #[serde(default)]
    pub milestones: Milestones,
}

fn default_remaining() -> u32 {
    START_STEPS
}

impl Default for PenaltyState {
    fn default() -> Self {
        Self {
            date: String::new(),
            last_play: String::new(),
            remaining: START_STEPS,
            milestones: Milestones::default(),
        }
    }
}

/// Snapshot shown by `/penalty status`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PenaltyStatus {
    pub remaining: u32,
    pub can_play_today: bool,
}

/// Reward produced by a shot, delivered to the user's mail
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RewardEvent {
    ECoinMilestone { amount: u64 },
    GpMilestone { amount: u64, landed_on: u32 },
    Trainer { name: String, exp: u64 },
    FreePack { rarity: Rarity },
    ECoins { amount: u64 },
    Gp { amount: u64 },
}

impl RewardEvent {
    pub fn describe(&self) -> String {
        match self {
            RewardEvent::ECoinMilestone { amount } => {
                format!("⭐ Milestone: **+{} eCoins** (reached {}).", amount, ECOIN_MILESTONE)
            }
            RewardEvent::GpMilestone { amount, landed_on } => {
                format!("💵 Milestone: **+{} GP** (landed on {}).", amount, landed_on)
            }
            RewardEvent::Trainer { name, exp } => format!(
                "🧑‍🏫 Ultra Rare Reward: **{}** (+{} EXP) added to your mail!",
                name, exp
            ),
            RewardEvent::FreePack { rarity } => {
                format!("🎁 Free **{} Pack** added to your mail.", rarity)
            }
            RewardEvent::ECoins { amount } => {
                format!("💰 **+{} eCoins** added to your mail.", amount)
            }
            RewardEvent::Gp { amount } => format!("💵 **+{} GP** added to your mail.", amount),
        }
    }
}

/// Outcome of one resolved shot
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShotResult {
    pub direction: Direction,
    pub keeper: Direction,
    pub scored: bool,
    pub delta: u32,
    /// Remaining steps after the shot (already reset to 35 if the path was completed)
    pub remaining: u32,
    pub cycle_completed: bool,
    pub rewards: Vec<RewardEvent>,
}

impl PenaltyState {
    /// Start a new milestone day if `today` differs from the stored date.
    /// Only the milestone flags are cleared; `remaining` carries over.
    pub fn refresh_day(&mut self, today: &str) -> bool {
        self.remaining = self.remaining.min(START_STEPS);
        if self.date == today {
            return false;
        }
        self.date = today.to_string();
        self.milestones = Milestones::default();
        true
    }

    pub fn has_played(&self, today: &str) -> bool {
        self.last_play == today
    }

    pub fn status(&self, today: &str) -> PenaltyStatus {
        PenaltyStatus {
            remaining: self.remaining,
            can_play_today: !self.has_played(today),
        }
    }

    pub fn phase(&self, today: &str) -> PenaltyPhase {
        if self.has_played(today) {
            PenaltyPhase::Resolved
        } else {
            PenaltyPhase::Idle
        }
    }

    /// Move into the aiming step. Fails if today's shot is already used.
    pub fn arm(&self, today: &str) -> Result<PenaltyPhase> {
        match self.phase(today) {
            PenaltyPhase::Resolved => Err(BotError::AlreadyPlayedToday),
            PenaltyPhase::Idle | PenaltyPhase::Armed => Ok(PenaltyPhase::Armed),
        }
    }

    /// Take today's shot with a random keeper dive
    pub fn shoot<R: Rng + ?Sized>(
        &mut self,
        direction: Direction,
        today: &str,
        rng: &mut R,
    ) -> Result<ShotResult> {
        if self.has_played(today) {
            return Err(BotError::AlreadyPlayedToday);
        }
        let keeper = Direction::ALL[rng.gen_range(0..Direction::ALL.len())];
        self.resolve_shot(direction, keeper, today, rng)
    }

    /// Apply a shot against a known keeper dive. `rng` is only used for the
    /// end-of-path reward roll.
    pub fn resolve_shot<R: Rng + ?Sized>(
        &mut self,
        direction: Direction,
        keeper: Direction,
        today: &str,
        rng: &mut R,
    ) -> Result<ShotResult> {
        if self.has_played(today) {
            return Err(BotError::AlreadyPlayedToday);
        }
        self.refresh_day(today);

        let scored = direction != keeper;
        let delta = if scored { ON_SCORE } else { ON_MISS };

        self.remaining = self.remaining.saturating_sub(delta);
        self.last_play = today.to_string();

        let mut rewards = Vec::new();

        if self.remaining == ECOIN_MILESTONE && !self.milestones.ecoin19 {
            self.milestones.ecoin19 = true;
            rewards.push(RewardEvent::ECoinMilestone {
                amount: ECOIN_MILESTONE_AMOUNT,
            });
        }

        if pays_gp_milestone(self.remaining) && !self.milestones.gp.contains_key(&self.remaining) {
            self.milestones.gp.insert(self.remaining, true);
            rewards.push(RewardEvent::GpMilestone {
                amount: GP_MILESTONE_AMOUNT,
                landed_on: self.remaining,
            });
        }

        // Flags stay set after the reset so the same day cannot earn them twice.
        let cycle_completed = self.remaining == 0;
        if cycle_completed {
            rewards.push(roll_cycle_reward(rng.gen(), rng));
            self.remaining = START_STEPS;
        }

        Ok(ShotResult {
            direction,
            keeper,
            scored,
            delta,
            remaining: self.remaining,
            cycle_completed,
            rewards,
        })
    }
}

fn pays_gp_milestone(remaining: u32) -> bool {
    (20..=35).contains(&remaining) || (1..=18).contains(&remaining)
}

/// Reward for completing the path.
/// 0.6% trainer, 33.4% free top-rarity pack, 33% eCoins, 33% GP.
pub fn roll_cycle_reward<R: Rng + ?Sized>(roll: f64, rng: &mut R) -> RewardEvent {
    if roll < 0.006 {
        RewardEvent::Trainer {
            name: "S+ Trainer".to_string(),
            exp: 1_000_000,
        }
    } else if roll < 0.34 {
        RewardEvent::FreePack {
            rarity: Rarity::TOP[rng.gen_range(0..Rarity::TOP.len())],
        }
    } else if roll < 0.67 {
        RewardEvent::ECoins { amount: 100 }
    } else {
        RewardEvent::Gp { amount: 5000 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const DAY1: &str = "2025-03-01";
    const DAY2: &str = "2025-03-02";

    fn rng() -> StdRng {
        StdRng::seed_from_u64(11)
    }

    fn state_with(remaining: u32) -> PenaltyState {
        PenaltyState {
            remaining,
            ..Default::default()
        }
    }

    #[test]
    fn test_scored_shot_from_start() {
        let mut state = PenaltyState::default();
        let result = state
            .resolve_shot(Direction::Left, Direction::Right, DAY1, &mut rng())
            .unwrap();

        assert!(result.scored);
        assert_eq!(result.delta, 8);
        assert_eq!(state.remaining, 27);
        assert_eq!(state.last_play, DAY1);
        assert_eq!(state.date, DAY1);
        assert_eq!(
            result.rewards,
            vec![RewardEvent::GpMilestone {
                amount: 500,
                landed_on: 27
            }]
        );
    }

    #[test]
    fn test_missed_shot() {
        let mut state = state_with(27);
        let result = state
            .resolve_shot(Direction::Center, Direction::Center, DAY1, &mut rng())
            .unwrap();

        assert!(!result.scored);
        assert_eq!(state.remaining, 23);
    }

    #[test]
    fn test_second_shot_same_day_rejected_without_change() {
        let mut state = PenaltyState::default();
        let mut rng = rng();
        state.shoot(Direction::Right, DAY1, &mut rng).unwrap();
        let before = state.clone();

        let err = state.shoot(Direction::Left, DAY1, &mut rng).unwrap_err();
        assert!(matches!(err, BotError::AlreadyPlayedToday));
        assert_eq!(state, before);
        assert!(state.arm(DAY1).is_err());
        assert_eq!(state.phase(DAY1), PenaltyPhase::Resolved);
    }

    #[test]
    fn test_next_day_allows_shot_and_keeps_remaining() {
        let mut state = PenaltyState::default();
        let mut rng = rng();
        state.shoot(Direction::Right, DAY1, &mut rng).unwrap();
        let after_day1 = state.remaining;

        assert_eq!(state.phase(DAY2), PenaltyPhase::Idle);
        assert_eq!(state.arm(DAY2).unwrap(), PenaltyPhase::Armed);
        assert!(state.refresh_day(DAY2));
        assert_eq!(state.remaining, after_day1);
        assert!(state.milestones.gp.is_empty());
        assert!(state.status(DAY2).can_play_today);
    }

    #[test]
    fn test_ecoin_milestone_fires_once_per_day() {
        let mut state = state_with(23);
        let result = state
            .resolve_shot(Direction::Left, Direction::Left, DAY1, &mut rng())
            .unwrap();
        assert_eq!(state.remaining, 19);
        assert_eq!(result.rewards, vec![RewardEvent::ECoinMilestone { amount: 50 }]);

        // Revisit 19 within the same day
        state.last_play.clear();
        state.remaining = 23;
        let result = state
            .resolve_shot(Direction::Left, Direction::Left, DAY1, &mut rng())
            .unwrap();
        assert_eq!(state.remaining, 19);
        assert!(result.rewards.is_empty());

        // A new day clears the flag
        state.remaining = 23;
        let result = state
            .resolve_shot(Direction::Left, Direction::Left, DAY2, &mut rng())
            .unwrap();
        assert_eq!(result.rewards, vec![RewardEvent::ECoinMilestone { amount: 50 }]);
    }

    #[test]
    fn test_gp_milestone_per_distinct_value() {
        let mut state = state_with(35);
        let mut rng = rng();

        let first = state
            .resolve_shot(Direction::Left, Direction::Right, DAY1, &mut rng)
            .unwrap();
        assert_eq!(first.rewards.len(), 1);

        state.last_play.clear();
        let second = state
            .resolve_shot(Direction::Left, Direction::Right, DAY1, &mut rng)
            .unwrap();
        assert_eq!(state.remaining, 19);
        // 19 pays eCoins only; it sits outside both GP ranges
        assert_eq!(second.rewards, vec![RewardEvent::ECoinMilestone { amount: 50 }]);

        state.last_play.clear();
        let third = state
            .resolve_shot(Direction::Left, Direction::Right, DAY1, &mut rng)
            .unwrap();
        assert_eq!(state.remaining, 11);
        assert_eq!(
            third.rewards,
            vec![RewardEvent::GpMilestone {
                amount: 500,
                landed_on: 11
            }]
        );
        assert_eq!(state.milestones.gp.len(), 2);
    }

    #[test]
    fn test_reaching_zero_grants_one_reward_and_resets() {
        let mut state = state_with(3);
        let result = state
            .resolve_shot(Direction::Left, Direction::Right, DAY1, &mut rng())
            .unwrap();

        assert!(result.cycle_completed);
        assert_eq!(result.remaining, START_STEPS);
        assert_eq!(state.remaining, START_STEPS);
        assert_eq!(result.rewards.len(), 1);
        assert!(!matches!(
            result.rewards[0],
            RewardEvent::GpMilestone { .. } | RewardEvent::ECoinMilestone { .. }
        ));
    }

    #[test]
    fn test_remaining_stays_in_bounds() {
        let mut rng = rng();
        let mut state = PenaltyState::default();
        for day in 0..500 {
            let today = format!("day-{}", day);
            let direction = Direction::ALL[day % 3];
            state.shoot(direction, &today, &mut rng).unwrap();
            assert!(state.remaining <= START_STEPS);
            assert!(state.remaining > 0);
        }
    }

    #[test]
    fn test_oversized_remaining_is_clamped() {
        let mut state = state_with(90);
        state.refresh_day(DAY1);
        assert_eq!(state.remaining, START_STEPS);
    }

    #[test]
    fn test_cycle_reward_tiers() {
        let mut rng = rng();
        assert!(matches!(
            roll_cycle_reward(0.0, &mut rng),
            RewardEvent::Trainer { exp: 1_000_000, .. }
        ));
        assert!(matches!(
            roll_cycle_reward(0.006, &mut rng),
            RewardEvent::FreePack { .. }
        ));
        assert!(matches!(
            roll_cycle_reward(0.3399, &mut rng),
            RewardEvent::FreePack { .. }
        ));
        assert_eq!(roll_cycle_reward(0.34, &mut rng), RewardEvent::ECoins { amount: 100 });
        assert_eq!(roll_cycle_reward(0.67, &mut rng), RewardEvent::Gp { amount: 5000 });
        assert_eq!(roll_cycle_reward(0.9999, &mut rng), RewardEvent::Gp { amount: 5000 });
    }

    #[test]
    fn test_free_pack_is_top_rarity() {
        let mut rng = rng();
        for _ in 0..100 {
            if let RewardEvent::FreePack { rarity } = roll_cycle_reward(0.2, &mut rng) {
                assert!(Rarity::TOP.contains(&rarity));
            } else {
                panic!("expected a free pack");
            }
        }
    }

    #[test]
    fn test_state_round_trips_legacy_layout() {
        let json = r#"{"date":"2025-03-01","lastPlay":"2025-03-01","remaining":27,"milestones":{"gp":{"27":true}}}"#;
        let state: PenaltyState = serde_json::from_str(json).unwrap();
        assert_eq!(state.remaining, 27);
        assert!(state.milestones.gp.contains_key(&27));
        assert!(!state.milestones.ecoin19);
    }

    #[test]
    fn test_parse_direction() {
        assert_eq!("Left".parse::<Direction>().unwrap(), Direction::Left);
        assert!("up".parse::<Direction>().is_err());
    }
}

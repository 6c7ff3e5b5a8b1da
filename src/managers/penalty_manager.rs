use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::error::Result;
use crate::game::{Direction, PenaltyPhase, PenaltyStatus, SharedClock, ShotResult};
use crate::state::{MailPayload, SharedUserStore};

/// A resolved shot together with the ids of the reward mail it produced
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PenaltyOutcome {
    #[serde(flatten)]
    pub shot: ShotResult,
    pub mail_ids: Vec<String>,
}

/// Daily penalty minigame on top of the user store
pub struct PenaltyManager {
    users: SharedUserStore,
    clock: SharedClock,
}

impl PenaltyManager {
    pub fn new(users: SharedUserStore, clock: SharedClock) -> Self {
        Self { users, clock }
    }

    /// Current progress. Rolls the milestone day over if needed and saves it.
    pub async fn status(&self, user_id: &str) -> Result<PenaltyStatus> {
        let today = self.clock.today();
        self.users
            .update(user_id, |data| {
                let penalty = &mut data.minigames.penalty;
                penalty.refresh_day(&today);
                Ok(penalty.status(&today))
            })
            .await
    }

    /// Check that the user can still shoot today before showing the aim buttons
    pub async fn arm(&self, user_id: &str) -> Result<PenaltyPhase> {
        let today = self.clock.today();
        let data = self.users.load(user_id).await?;
        data.minigames.penalty.arm(&today)
    }

    /// Take today's shot and mail any rewards it earns
    pub async fn shoot(&self, user_id: &str, direction: Direction) -> Result<PenaltyOutcome> {
        let today = self.clock.today();
        let outcome = self
            .users
            .update(user_id, |data| {
                let mut rng = rand::thread_rng();
                let shot = data.minigames.penalty.shoot(direction, &today, &mut rng)?;

                let mail_ids = shot
                    .rewards
                    .iter()
                    .map(|event| data.push_mail(MailPayload::from(event), &today).id.clone())
                    .collect();

                Ok(PenaltyOutcome { shot, mail_ids })
            })
            .await?;

        info!(
            "User {} shot {} vs keeper {}: {} (remaining {}, {} reward(s))",
            user_id,
            outcome.shot.direction,
            outcome.shot.keeper,
            if outcome.shot.scored { "goal" } else { "saved" },
            outcome.shot.remaining,
            outcome.shot.rewards.len()
        );

        Ok(outcome)
    }
}

/// Shared penalty manager type
pub type SharedPenaltyManager = Arc<PenaltyManager>;

pub fn create_shared_penalty_manager(
    users: SharedUserStore,
    clock: SharedClock,
) -> SharedPenaltyManager {
    Arc::new(PenaltyManager::new(users, clock))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BotError;
    use crate::game::{FixedClock, START_STEPS};
    use crate::state::create_shared_user_store;
    use crate::state::user_store::temp_dir;

    fn manager(label: &str) -> (PenaltyManager, SharedUserStore, Arc<FixedClock>) {
        let users = create_shared_user_store(&temp_dir(label));
        let clock = Arc::new(FixedClock::new("2025-06-01"));
        (
            PenaltyManager::new(users.clone(), clock.clone()),
            users,
            clock,
        )
    }

    #[tokio::test]
    async fn test_fresh_user_status() {
        let (manager, _, _) = manager("penalty-fresh");
        let status = manager.status("42").await.unwrap();
        assert_eq!(status.remaining, START_STEPS);
        assert!(status.can_play_today);
        assert_eq!(manager.arm("42").await.unwrap(), PenaltyPhase::Armed);
    }

    #[tokio::test]
    async fn test_one_shot_per_day() {
        let (manager, users, clock) = manager("penalty-daily");

        let first = manager.shoot("42", Direction::Left).await.unwrap();
        assert!(first.shot.remaining == 27 || first.shot.remaining == 31);
        assert!(matches!(
            manager.shoot("42", Direction::Right).await,
            Err(BotError::AlreadyPlayedToday)
        ));
        assert!(matches!(
            manager.arm("42").await,
            Err(BotError::AlreadyPlayedToday)
        ));
        assert!(!manager.status("42").await.unwrap().can_play_today);

        let saved = users.load("42").await.unwrap();
        assert_eq!(saved.minigames.penalty.last_play, "2025-06-01");

        clock.set("2025-06-02");
        assert!(manager.status("42").await.unwrap().can_play_today);
        manager.shoot("42", Direction::Center).await.unwrap();
    }

    #[tokio::test]
    async fn test_rewards_land_in_mail() {
        let (manager, users, _) = manager("penalty-mail");

        let outcome = manager.shoot("7", Direction::Right).await.unwrap();
        // Landing on 27 or 31 pays the GP milestone
        assert_eq!(outcome.shot.rewards.len(), 1);
        assert_eq!(outcome.mail_ids.len(), 1);

        let saved = users.load("7").await.unwrap();
        assert_eq!(saved.mail.len(), 1);
        assert_eq!(saved.mail[0].id, outcome.mail_ids[0]);
        assert_eq!(saved.mail[0].payload, MailPayload::Gp { amount: 500 });
        assert_eq!(saved.gp, 0);
    }

    #[tokio::test]
    async fn test_cycle_completion_resets_path() {
        let (manager, users, _) = manager("penalty-cycle");
        users
            .update("9", |data| {
                data.minigames.penalty.remaining = 3;
                Ok(())
            })
            .await
            .unwrap();

        let outcome = manager.shoot("9", Direction::Left).await.unwrap();
        assert!(outcome.shot.cycle_completed);
        assert_eq!(outcome.shot.remaining, START_STEPS);
        assert_eq!(outcome.mail_ids.len(), 1);
        assert_eq!(users.load("9").await.unwrap().minigames.penalty.remaining, START_STEPS);
    }
}

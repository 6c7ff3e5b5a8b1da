use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::error::Result;
use crate::state::{Balances, ClaimTotals, Mail, SharedUserStore};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MailList {
    pub mail: Vec<Mail>,
    pub unclaimed: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimOutcome {
    pub claimed: usize,
    pub totals: ClaimTotals,
    pub balances: Balances,
}

/// Reward mailbox operations
pub struct MailManager {
    users: SharedUserStore,
}

impl MailManager {
    pub fn new(users: SharedUserStore) -> Self {
        Self { users }
    }

    /// Mail newest first with the unclaimed count
    pub async fn list(&self, user_id: &str) -> Result<MailList> {
        let data = self.users.load(user_id).await?;
        Ok(MailList {
            unclaimed: data.unclaimed_mail_count(),
            mail: data.mail_newest_first().into_iter().cloned().collect(),
        })
    }

    pub async fn claim(&self, user_id: &str, mail_id: &str) -> Result<ClaimOutcome> {
        let outcome = self
            .users
            .update(user_id, |data| {
                let totals = data.claim_mail(mail_id)?;
                Ok(ClaimOutcome {
                    claimed: 1,
                    totals,
                    balances: data.balances(),
                })
            })
            .await?;

        info!("User {} claimed mail {}", user_id, mail_id);
        Ok(outcome)
    }

    /// Claim every unclaimed mail. Claiming nothing is not an error.
    pub async fn claim_all(&self, user_id: &str) -> Result<ClaimOutcome> {
        let outcome = self
            .users
            .update(user_id, |data| {
                let (claimed, totals) = data.claim_all_mail();
                Ok(ClaimOutcome {
                    claimed,
                    totals,
                    balances: data.balances(),
                })
            })
            .await?;

        if outcome.claimed > 0 {
            info!("User {} claimed {} mail(s)", user_id, outcome.claimed);
        }
        Ok(outcome)
    }
}

/// Shared mail manager type
pub type SharedMailManager = Arc<MailManager>;

pub fn create_shared_mail_manager(users: SharedUserStore) -> SharedMailManager {
    Arc::new(MailManager::new(users))
}

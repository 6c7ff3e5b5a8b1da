use thiserror::Error;

use crate::config::{Currency, Rarity};

#[derive(Error, Debug)]
pub enum BotError {
    // Configuration errors
    #[error("Failed to load config file '{path}': {source}")]
    ConfigLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid config: {message}")]
    ConfigValidation { message: String },

    // State errors
    #[error("Failed to save state to '{path}': {source}")]
    StateSave {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load state from '{path}': {source}")]
    StateLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt state file '{path}': {source}")]
    StateParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    // Contract errors
    #[error("That pack does not exist: '{key}'")]
    InvalidPack { key: String },

    #[error("You don't have enough {currency}! You need {needed} {currency} (you have {available}).")]
    InsufficientFunds {
        currency: Currency,
        needed: u64,
        available: u64,
    },

    #[error("Could not find a player for rarity {rarity}. Please contact an admin.")]
    NoPlayersForRarity { rarity: Rarity },

    #[error("The {pack} is sold out.")]
    PackSoldOut { pack: String },

    // Minigame errors
    #[error("You already used your penalty shot today. Come back tomorrow!")]
    AlreadyPlayedToday,

    #[error("This button isn't for you.")]
    NotYourInteraction,

    // Collection and mail errors
    #[error("You don't own this player.")]
    PlayerNotOwned { player_id: String },

    #[error("Mail not found")]
    MailNotFound { mail_id: String },

    #[error("Already claimed")]
    MailAlreadyClaimed { mail_id: String },

    // News errors
    #[error("No news article found with ID #{id}.")]
    NewsNotFound { id: u32 },

    #[error("Invalid page number. There are only {total_pages} page(s) of news.")]
    InvalidPage { total_pages: usize },

    // Discord errors
    #[error("Discord API error: {message}")]
    Discord { message: String },

    // Permission errors
    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    // Generic errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl BotError {
    /// Whether the error is an expected game outcome that should be shown to the user
    /// rather than logged as a failure.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            BotError::InvalidPack { .. }
                | BotError::InsufficientFunds { .. }
                | BotError::NoPlayersForRarity { .. }
                | BotError::PackSoldOut { .. }
                | BotError::AlreadyPlayedToday
                | BotError::NotYourInteraction
                | BotError::PlayerNotOwned { .. }
                | BotError::MailNotFound { .. }
                | BotError::MailAlreadyClaimed { .. }
                | BotError::NewsNotFound { .. }
                | BotError::InvalidPage { .. }
                | BotError::PermissionDenied { .. }
        )
    }
}

impl From<serenity::Error> for BotError {
    fn from(err: serenity::Error) -> Self {
        BotError::Discord {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for BotError {
    fn from(err: std::io::Error) -> Self {
        BotError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for BotError {
    fn from(err: serde_json::Error) -> Self {
        BotError::Internal {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BotError>;

use poise::serenity_prelude as serenity;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_funds_message() {
        let err = BotError::InsufficientFunds {
            currency: Currency::Gp,
            needed: 10000,
            available: 250,
        };
        assert_eq!(
            err.to_string(),
            "You don't have enough GP! You need 10000 GP (you have 250)."
        );
        assert!(err.is_user_facing());
    }

    #[test]
    fn test_infrastructure_errors_are_not_user_facing() {
        let err = BotError::Internal {
            message: "disk on fire".to_string(),
        };
        assert!(!err.is_user_facing());
    }
}

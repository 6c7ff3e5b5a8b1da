//! Web dashboard API
//!
//! Runs alongside the Discord bot and shares its managers, so a pull or a
//! penalty shot made on the website is the same operation as the slash command.

mod admin;
mod api;
mod auth;
mod error;
mod oauth;
mod server;

pub use auth::create_session_store;
pub use oauth::OAuthState;
pub use server::{create_bot_status, start_web_server, SharedBotStatus, WebServerConfig, WebState};

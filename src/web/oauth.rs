//! Discord OAuth2 settings and API calls used by the dashboard login

use serde::{Deserialize, Serialize};

use crate::error::{BotError, Result};

const DISCORD_API: &str = "https://discord.com/api";

/// OAuth configuration
#[derive(Clone)]
pub struct OAuthState {
    pub client_id: String,
    pub client_secret: String,
    pub base_url: String,
    pub http_client: reqwest::Client,
}

impl OAuthState {
    /// Present only when DISCORD_CLIENT_ID and DISCORD_CLIENT_SECRET are set
    pub fn from_env() -> Option<Self> {
        let client_id = std::env::var("DISCORD_CLIENT_ID").ok()?;
        let client_secret = std::env::var("DISCORD_CLIENT_SECRET").ok()?;
        let base_url = std::env::var("WEB_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        Some(Self {
            client_id,
            client_secret,
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client: reqwest::Client::new(),
        })
    }

    pub fn redirect_uri(&self) -> String {
        format!("{}/auth/discord/callback", self.base_url)
    }

    /// Discord consent screen URL carrying a one-time `state`
    pub fn authorize_url(&self, state: &str) -> String {
        format!(
            "https://discord.com/oauth2/authorize?client_id={}&redirect_uri={}&response_type=code&scope=identify%20guilds&state={}",
            self.client_id,
            urlencoding::encode(&self.redirect_uri()),
            urlencoding::encode(state)
        )
    }

    /// Exchange an authorization code for an access token
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse> {
        let redirect_uri = self.redirect_uri();
        let response = self
            .http_client
            .post(format!("{}/oauth2/token", DISCORD_API))
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", redirect_uri.as_str()),
            ])
            .send()
            .await
            .map_err(oauth_error)?;

        if !response.status().is_success() {
            return Err(BotError::Discord {
                message: format!("token exchange failed with status {}", response.status()),
            });
        }

        response.json().await.map_err(oauth_error)
    }

    /// Fetch the user behind an access token
    pub async fn fetch_user(&self, token: &TokenResponse) -> Result<DiscordUser> {
        self.http_client
            .get(format!("{}/users/@me", DISCORD_API))
            .header(
                "Authorization",
                format!("{} {}", token.token_type, token.access_token),
            )
            .send()
            .await
            .map_err(oauth_error)?
            .error_for_status()
            .map_err(oauth_error)?
            .json()
            .await
            .map_err(oauth_error)
    }
}

fn oauth_error(err: reqwest::Error) -> BotError {
    BotError::Discord {
        message: format!("OAuth request failed: {}", err),
    }
}

/// Discord OAuth token response
#[derive(Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

/// Discord user info from /users/@me
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordUser {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub global_name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

impl DiscordUser {
    pub fn avatar_url(&self) -> Option<String> {
        self.avatar.as_ref().map(|hash| {
            format!("https://cdn.discordapp.com/avatars/{}/{}.png", self.id, hash)
        })
    }

    pub fn display_name(&self) -> &str {
        self.global_name.as_deref().unwrap_or(&self.username)
    }
}

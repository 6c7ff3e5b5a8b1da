//! Discord login for the dashboard.
//!
//! A successful OAuth callback creates an in-memory session and sets the
//! `pitchside_session` cookie. API handlers call [`require_session`] to turn
//! that cookie back into a [`UserSession`].

use axum::{
    extract::{Query, State},
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use poise::serenity_prelude::{self as serenity, GuildId, Permissions};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use super::error::ApiError;
use super::oauth::DiscordUser;
use super::server::WebState;

pub const SESSION_COOKIE: &str = "pitchside_session";
const SESSION_TTL_SECS: u64 = 7 * 24 * 60 * 60;
const LOGIN_STATE_TTL_SECS: u64 = 10 * 60;

fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// A logged-in dashboard user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSession {
    pub discord: DiscordUser,
    pub is_admin: bool,
    pub created_at: u64,
    pub expires_at: u64,
}

impl UserSession {
    /// Create a new session with 7-day expiry
    pub fn new(discord: DiscordUser, is_admin: bool) -> Self {
        let now = now_secs();
        Self {
            discord,
            is_admin,
            created_at: now,
            expires_at: now + SESSION_TTL_SECS,
        }
    }

    pub fn is_expired(&self) -> bool {
        now_secs() >= self.expires_at
    }

    pub fn user_id(&self) -> &str {
        &self.discord.id
    }
}

/// Session tokens and pending OAuth `state` values
pub struct SessionStore {
    sessions: RwLock<HashMap<String, UserSession>>,
    pending_logins: RwLock<HashMap<String, u64>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            pending_logins: RwLock::new(HashMap::new()),
        }
    }

    /// Create a new session and return the token
    pub async fn create_session(&self, session: UserSession) -> String {
        let token = uuid::Uuid::new_v4().simple().to_string();
        self.sessions.write().await.insert(token.clone(), session);
        token
    }

    /// Get session by token (returns None if expired or not found)
    pub async fn get_session(&self, token: &str) -> Option<UserSession> {
        let sessions = self.sessions.read().await;
        sessions.get(token).filter(|s| !s.is_expired()).cloned()
    }

    pub async fn remove_session(&self, token: &str) {
        self.sessions.write().await.remove(token);
    }

    /// Remember a fresh OAuth `state` for the callback to check
    pub async fn begin_login(&self) -> String {
        let state = uuid::Uuid::new_v4().simple().to_string();
        self.pending_logins
            .write()
            .await
            .insert(state.clone(), now_secs() + LOGIN_STATE_TTL_SECS);
        state
    }

    /// Consume a login `state`. Each value is accepted once.
    pub async fn finish_login(&self, state: &str) -> bool {
        match self.pending_logins.write().await.remove(state) {
            Some(expires_at) => now_secs() < expires_at,
            None => false,
        }
    }

    /// Drop expired sessions and abandoned logins
    pub async fn cleanup_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired());
        let removed = before - sessions.len();

        let now = now_secs();
        self.pending_logins
            .write()
            .await
            .retain(|_, expires_at| now < *expires_at);
        removed
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

pub type SharedSessionStore = Arc<SessionStore>;

pub fn create_session_store() -> SharedSessionStore {
    Arc::new(SessionStore::new())
}

/// Extract session token from cookies
pub fn get_session_token(headers: &HeaderMap) -> Option<String> {
    let prefix = format!("{}=", SESSION_COOKIE);
    headers
        .get(axum::http::header::COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .find_map(|cookie| cookie.trim().strip_prefix(prefix.as_str()).map(str::to_string))
        .filter(|token| !token.is_empty())
}

pub fn create_session_cookie(token: &str) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, SESSION_TTL_SECS
    )
}

pub fn create_logout_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

/// Resolve the caller's session or answer 401
pub async fn require_session(
    headers: &HeaderMap,
    state: &WebState,
) -> Result<UserSession, ApiError> {
    let token = get_session_token(headers).ok_or(ApiError::Unauthorized)?;
    state
        .sessions
        .get_session(&token)
        .await
        .ok_or(ApiError::Unauthorized)
}

/// Like [`require_session`], and the session must belong to an admin
pub async fn require_admin(
    headers: &HeaderMap,
    state: &WebState,
) -> Result<UserSession, ApiError> {
    let session = require_session(headers, state).await?;
    if !session.is_admin {
        warn!("{} requested an admin route", session.discord.id);
        return Err(ApiError::Forbidden);
    }
    Ok(session)
}

/// Whether a Discord user administers the configured guild
pub async fn check_guild_admin(
    http: &serenity::Http,
    guild_id: GuildId,
    user_id: serenity::UserId,
) -> bool {
    let member = match http.get_member(guild_id, user_id).await {
        Ok(member) => member,
        Err(e) => {
            warn!("User {} is not a member of guild {}: {}", user_id, guild_id, e);
            return false;
        }
    };

    match http.get_guild(guild_id).await {
        Ok(guild) => {
            guild.owner_id == user_id
                || member.roles.iter().any(|role_id| {
                    guild
                        .roles
                        .get(role_id)
                        .map_or(false, |role| role.permissions.contains(Permissions::ADMINISTRATOR))
                })
        }
        Err(e) => {
            error!("Failed to get guild {}: {}", guild_id, e);
            false
        }
    }
}

pub fn routes() -> Router<WebState> {
    Router::new()
        .route("/auth/discord", get(login))
        .route("/auth/discord/callback", get(oauth_callback))
        .route("/logout", get(logout))
}

/// GET /auth/discord - Redirect to the Discord consent screen
async fn login(State(state): State<WebState>) -> Response {
    let Some(oauth) = &state.oauth else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "error": "Discord login is not configured" })),
        )
            .into_response();
    };

    let login_state = state.sessions.begin_login().await;
    Redirect::to(&oauth.authorize_url(&login_state)).into_response()
}

#[derive(Deserialize)]
pub struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// GET /auth/discord/callback - Finish login and set the session cookie
async fn oauth_callback(
    Query(params): Query<CallbackParams>,
    State(state): State<WebState>,
) -> Response {
    let Some(oauth) = &state.oauth else {
        return Redirect::to("/login").into_response();
    };

    if let Some(error) = params.error {
        warn!("Discord login was declined: {}", error);
        return Redirect::to("/login").into_response();
    }

    let (Some(code), Some(login_state)) = (params.code, params.state) else {
        return (StatusCode::BAD_REQUEST, "Missing OAuth parameters").into_response();
    };

    if !state.sessions.finish_login(&login_state).await {
        warn!("Rejected OAuth callback with unknown state");
        return (StatusCode::BAD_REQUEST, "Invalid OAuth state").into_response();
    }

    let discord = match oauth.exchange_code(&code).await {
        Ok(token) => match oauth.fetch_user(&token).await {
            Ok(user) => user,
            Err(e) => {
                error!("Failed to get user info: {}", e);
                return (StatusCode::BAD_GATEWAY, "Authentication failed").into_response();
            }
        },
        Err(e) => {
            error!("Failed to exchange OAuth code: {}", e);
            return (StatusCode::BAD_GATEWAY, "Authentication failed").into_response();
        }
    };

    let mut is_admin = state.settings.is_admin(&discord.id);
    if !is_admin {
        if let (Some(http), Some(guild_id), Ok(user_id)) = (
            &state.serenity_http,
            state.admin_guild,
            discord.id.parse::<u64>(),
        ) {
            if user_id != 0 {
                is_admin = check_guild_admin(http, guild_id, serenity::UserId::new(user_id)).await;
            }
        }
    }

    info!(
        "{} ({}) logged in to the dashboard{}",
        discord.display_name(),
        discord.id,
        if is_admin { " as admin" } else { "" }
    );

    let token = state
        .sessions
        .create_session(UserSession::new(discord, is_admin))
        .await;

    (
        [(SET_COOKIE, create_session_cookie(&token))],
        Redirect::to("/dashboard"),
    )
        .into_response()
}

/// GET /logout - Clear session and go home
async fn logout(headers: HeaderMap, State(state): State<WebState>) -> impl IntoResponse {
    if let Some(token) = get_session_token(&headers) {
        state.sessions.remove_session(&token).await;
    }

    ([(SET_COOKIE, create_logout_cookie())], Redirect::to("/"))
}

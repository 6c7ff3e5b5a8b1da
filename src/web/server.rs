//! Web server for the dashboard API

use axum::{
    extract::{Host, State},
    handler::HandlerWithoutStateExt,
    http::{header, HeaderValue, Method, StatusCode, Uri},
    response::Redirect,
    routing::get,
    BoxError, Json, Router,
};
use axum_server::tls_rustls::RustlsConfig;
use chrono::Utc;
use parking_lot::RwLock;
use poise::serenity_prelude::{self as serenity, GuildId};
use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use super::auth::SharedSessionStore;
use super::oauth::OAuthState;
use super::{admin, api, auth};
use crate::config::Settings;
use crate::logging::SharedLogBuffer;
use crate::managers::{
    SharedCollectionManager, SharedConfigManager, SharedContractManager, SharedMailManager,
    SharedPenaltyManager,
};
use crate::state::SharedNewsStore;

const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Certificate and key for serving HTTPS
#[derive(Debug, Clone)]
pub struct TlsPaths {
    /// Certificate PEM file (cert + CA bundle)
    pub cert_path: PathBuf,
    /// Private key PEM file
    pub key_path: PathBuf,
}

/// Web server configuration
#[derive(Debug, Clone)]
pub struct WebServerConfig {
    pub port: u16,
    /// Allowed CORS origin
    pub base_url: String,
    pub tls: Option<TlsPaths>,
    /// Plain HTTP port that redirects to HTTPS (only with TLS)
    pub redirect_port: Option<u16>,
}

impl Default for WebServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            tls: None,
            redirect_port: None,
        }
    }
}

impl WebServerConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let tls = match (std::env::var("TLS_CERT_PATH"), std::env::var("TLS_KEY_PATH")) {
            (Ok(cert), Ok(key)) => Some(TlsPaths {
                cert_path: PathBuf::from(cert),
                key_path: PathBuf::from(key),
            }),
            _ => None,
        };

        Self {
            port: env_port("WEB_PORT").unwrap_or(3000),
            base_url: std::env::var("WEB_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            tls,
            redirect_port: env_port("HTTP_REDIRECT_PORT"),
        }
    }
}

fn env_port(name: &str) -> Option<u16> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

/// Bot liveness as reported by `/api/status` and `/health`
pub struct BotStatus {
    started: Instant,
    connected: AtomicBool,
    last_error: RwLock<Option<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub is_running: bool,
    pub uptime: String,
    pub last_error: Option<String>,
    pub server_time: String,
}

impl BotStatus {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            connected: AtomicBool::new(false),
            last_error: RwLock::new(None),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Relaxed);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    pub fn record_error(&self, message: impl Into<String>) {
        *self.last_error.write() = Some(message.into());
    }

    pub fn report(&self) -> StatusReport {
        StatusReport {
            is_running: self.is_connected(),
            uptime: format_uptime(self.started.elapsed()),
            last_error: self.last_error.read().clone(),
            server_time: Utc::now().to_rfc3339(),
        }
    }
}

impl Default for BotStatus {
    fn default() -> Self {
        Self::new()
    }
}

pub type SharedBotStatus = Arc<BotStatus>;

pub fn create_bot_status() -> SharedBotStatus {
    Arc::new(BotStatus::new())
}

/// Two most significant units, e.g. `3d 4h` or `12m 5s`
pub fn format_uptime(elapsed: Duration) -> String {
    let seconds = elapsed.as_secs();
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    if days > 0 {
        format!("{}d {}h", days, hours % 24)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes % 60)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds % 60)
    } else {
        format!("{}s", seconds)
    }
}

/// Shared state for web handlers
#[derive(Clone)]
pub struct WebState {
    pub oauth: Option<OAuthState>,
    pub sessions: SharedSessionStore,
    pub settings: Settings,
    pub config_manager: SharedConfigManager,
    pub contracts: SharedContractManager,
    pub penalty: SharedPenaltyManager,
    pub mail: SharedMailManager,
    pub collection: SharedCollectionManager,
    pub news: SharedNewsStore,
    pub log_buffer: SharedLogBuffer,
    pub status: SharedBotStatus,
    /// Used at login to grant admin to guild administrators
    pub serenity_http: Option<Arc<serenity::Http>>,
    pub admin_guild: Option<GuildId>,
}

fn cors_layer(base_url: &str) -> Option<CorsLayer> {
    let origin = match base_url.parse::<HeaderValue>() {
        Ok(origin) => origin,
        Err(e) => {
            warn!("Invalid WEB_BASE_URL '{}' for CORS: {}", base_url, e);
            return None;
        }
    };

    Some(
        CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE])
            .allow_credentials(true),
    )
}

/// All routes with state attached
pub fn build_router(state: WebState, base_url: &str) -> Router {
    let router = Router::new()
        .route("/health", get(health))
        .route("/ping", get(ping))
        .route("/api/status", get(status))
        .merge(auth::routes())
        .merge(api::routes())
        .merge(admin::routes());

    let router = match cors_layer(base_url) {
        Some(cors) => router.layer(cors),
        None => router,
    };
    router.with_state(state)
}

/// Serve the dashboard API until the listener fails
pub async fn start_web_server(config: WebServerConfig, state: WebState) -> anyhow::Result<()> {
    if state.oauth.is_none() {
        warn!("DISCORD_CLIENT_ID/DISCORD_CLIENT_SECRET not set, dashboard login is disabled");
    } else {
        info!(
            "Discord OAuth redirect URI: {}/auth/discord/callback",
            config.base_url
        );
    }

    let sessions = state.sessions.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            let removed = sessions.cleanup_expired().await;
            if removed > 0 {
                info!("Removed {} expired dashboard session(s)", removed);
            }
        }
    });

    let app = build_router(state, &config.base_url);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    match &config.tls {
        Some(tls) => {
            info!("Loading TLS certificate {}", tls.cert_path.display());
            let tls_config = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
                .await
                .map_err(|e| {
                    anyhow::anyhow!(
                        "Failed to load TLS certificates ({}, {}): {}. The key must be PKCS#8 PEM.",
                        tls.cert_path.display(),
                        tls.key_path.display(),
                        e
                    )
                })?;

            if let Some(http_port) = config.redirect_port {
                tokio::spawn(redirect_http_to_https(http_port, config.port));
            }

            info!("Web server listening on https://{}", addr);
            axum_server::bind_rustls(addr, tls_config)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            info!("Web server listening on http://{}", addr);
            axum_server::bind(addr).serve(app.into_make_service()).await?;
        }
    }

    Ok(())
}

/// Same request on the HTTPS port
fn https_uri(host: &str, uri: Uri, https_port: u16) -> Result<Uri, BoxError> {
    let authority: axum::http::uri::Authority = host.parse()?;
    let bare_host = authority.host();

    let mut parts = uri.into_parts();
    parts.scheme = Some(axum::http::uri::Scheme::HTTPS);
    if parts.path_and_query.is_none() {
        parts.path_and_query = Some("/".parse()?);
    }
    parts.authority = Some(if https_port == 443 {
        bare_host.parse()?
    } else {
        format!("{}:{}", bare_host, https_port).parse()?
    });

    Ok(Uri::from_parts(parts)?)
}

async fn redirect_http_to_https(http_port: u16, https_port: u16) {
    let redirect = move |Host(host): Host, uri: Uri| async move {
        match https_uri(&host, uri, https_port) {
            Ok(uri) => Ok(Redirect::permanent(&uri.to_string())),
            Err(error) => {
                warn!(%error, "Failed to convert URI to HTTPS");
                Err(StatusCode::BAD_REQUEST)
            }
        }
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], http_port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind HTTP redirect server on port {}: {}", http_port, e);
            return;
        }
    };

    info!("HTTP redirect server listening on {}", addr);
    if let Err(e) = axum::serve(listener, redirect.into_make_service()).await {
        error!("HTTP redirect server error: {}", e);
    }
}

async fn health(State(state): State<WebState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok", "bot": state.status.is_connected() }))
}

async fn ping() -> &'static str {
    "pong"
}

async fn status(State(state): State<WebState>) -> Json<StatusReport> {
    Json(state.status.report())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::config::{Currency, Pack, PacksConfig, Player, PlayerCatalog, Rarity, RarityChances};
    use crate::game::FixedClock;
    use crate::logging::create_log_buffer;
    use crate::managers::{
        create_shared_collection_manager, create_shared_contract_manager,
        create_shared_mail_manager, create_shared_penalty_manager, ConfigManager,
    };
    use crate::state::user_store::temp_dir;
    use crate::state::{create_shared_user_store, NewsStore, PackLimits, SharedUserStore};
    use crate::web::auth::{create_session_store, UserSession, SESSION_COOKIE};
    use crate::web::oauth::DiscordUser;

    pub fn silver_player(id: &str) -> Player {
        Player {
            id: id.to_string(),
            name: format!("Silver {}", id),
            rarity: Rarity::Silver,
            position: "CB".to_string(),
            overall: 75,
            max_overall: None,
        }
    }

    /// Web state over a temp directory with one 100 GP silver pack
    pub async fn web_state(label: &str) -> (WebState, SharedUserStore) {
        let dir = temp_dir(label);
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let settings = Settings {
            data_path: dir,
            ..Default::default()
        };
        let packs = PacksConfig {
            packs: vec![Pack {
                key: "silver".to_string(),
                name: "Silver Pack".to_string(),
                cost: 100,
                currency: Currency::Gp,
                description: "Silver only".to_string(),
                rarity_chances: RarityChances::new(vec![(Rarity::Silver, 1.0)]),
                limit: None,
                player_pool: None,
            }],
        };
        let limits_path = settings.pack_limits_path();
        let limits = PackLimits::load(&limits_path, &packs).await;
        let config = Arc::new(tokio::sync::RwLock::new(ConfigManager::from_parts(
            settings.clone(),
            packs,
            PlayerCatalog::new(vec![silver_player("s1"), silver_player("s2")]),
        )));
        let users = create_shared_user_store(&settings.users_dir());

        let state = WebState {
            oauth: None,
            sessions: create_session_store(),
            contracts: create_shared_contract_manager(
                config.clone(),
                users.clone(),
                limits,
                &limits_path,
            ),
            penalty: create_shared_penalty_manager(
                users.clone(),
                Arc::new(FixedClock::new("2024-03-01")),
            ),
            mail: create_shared_mail_manager(users.clone()),
            collection: create_shared_collection_manager(users.clone()),
            news: Arc::new(NewsStore::empty(&settings.news_path())),
            config_manager: config,
            settings,
            log_buffer: create_log_buffer(16),
            status: create_bot_status(),
            serenity_http: None,
            admin_guild: None,
        };
        (state, users)
    }

    /// Headers carrying a fresh session cookie for `user_id`
    pub async fn login(state: &WebState, user_id: &str, is_admin: bool) -> axum::http::HeaderMap {
        let discord = DiscordUser {
            id: user_id.to_string(),
            username: format!("user{}", user_id),
            global_name: None,
            avatar: None,
        };
        let token = state
            .sessions
            .create_session(UserSession::new(discord, is_admin))
            .await;

        let mut headers = axum::http::HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("{}={}", SESSION_COOKIE, token)).unwrap(),
        );
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(Duration::from_secs(42)), "42s");
        assert_eq!(format_uptime(Duration::from_secs(125)), "2m 5s");
        assert_eq!(format_uptime(Duration::from_secs(3 * 3600 + 60)), "3h 1m");
        assert_eq!(format_uptime(Duration::from_secs(2 * 86400 + 5 * 3600)), "2d 5h");
    }

    #[test]
    fn test_https_uri() {
        let uri: Uri = "/api/status?x=1".parse().unwrap();
        assert_eq!(
            https_uri("pitch.example:80", uri, 443).unwrap().to_string(),
            "https://pitch.example/api/status?x=1"
        );
        let uri: Uri = "/".parse().unwrap();
        assert_eq!(
            https_uri("pitch.example", uri, 8443).unwrap().to_string(),
            "https://pitch.example:8443/"
        );
    }

    #[test]
    fn test_bot_status_report() {
        let status = BotStatus::new();
        assert!(!status.report().is_running);

        status.set_connected(true);
        status.record_error("gateway hiccup");
        let report = status.report();
        assert!(report.is_running);
        assert_eq!(report.last_error.as_deref(), Some("gateway hiccup"));
    }

    #[tokio::test]
    async fn test_health_reports_bot_connection() {
        let (state, _) = test_support::web_state("web-health").await;
        state.status.set_connected(true);
        let Json(body) = health(State(state)).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["bot"], true);
    }
}

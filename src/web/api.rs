//! JSON API backing the dashboard. Every game action goes through the same
//! managers as the Discord commands, so both surfaces see one state.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::auth::require_session;
use super::error::ApiError;
use super::server::WebState;
use crate::game::Direction;
use crate::state::Squad;

type ApiResult = Result<Json<Value>, ApiError>;

pub fn routes() -> Router<WebState> {
    Router::new()
        .route("/api/user", get(get_user))
        .route("/api/players", get(get_players))
        .route("/api/squad", get(get_squad))
        .route("/api/squad/update", post(update_squad))
        .route("/api/all-players", get(get_all_players))
        .route("/api/packs", get(get_packs))
        .route("/api/mail", get(get_mail))
        .route("/api/mail/claim", post(claim_mail))
        .route("/api/mail/claim-all", post(claim_all_mail))
        .route("/api/contract", post(open_contract))
        .route("/api/penalty", get(get_penalty))
        .route("/api/penalty/shoot", post(shoot_penalty))
        .route("/api/news", get(get_news))
}

/// GET /api/user
async fn get_user(headers: HeaderMap, State(state): State<WebState>) -> ApiResult {
    let session = require_session(&headers, &state).await?;
    let game_data = state.collection.user(session.user_id()).await?;
    Ok(Json(json!({
        "discord": session.discord,
        "gameData": game_data,
    })))
}

/// GET /api/players
async fn get_players(headers: HeaderMap, State(state): State<WebState>) -> ApiResult {
    let session = require_session(&headers, &state).await?;
    let players = state.collection.players(session.user_id()).await?;
    Ok(Json(json!({ "players": players })))
}

/// GET /api/squad
async fn get_squad(headers: HeaderMap, State(state): State<WebState>) -> ApiResult {
    let session = require_session(&headers, &state).await?;
    let view = state.collection.squad(session.user_id()).await?;
    Ok(Json(json!(view)))
}

#[derive(Deserialize)]
struct SquadUpdate {
    squad: Option<Squad>,
    formation: Option<String>,
}

/// POST /api/squad/update
async fn update_squad(
    headers: HeaderMap,
    State(state): State<WebState>,
    Json(body): Json<SquadUpdate>,
) -> ApiResult {
    let session = require_session(&headers, &state).await?;
    let view = state
        .collection
        .update_squad(session.user_id(), body.squad, body.formation)
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Squad updated successfully!",
        "squad": view.squad,
        "formation": view.formation,
    })))
}

/// GET /api/all-players
async fn get_all_players(headers: HeaderMap, State(state): State<WebState>) -> ApiResult {
    require_session(&headers, &state).await?;
    let config = state.config_manager.read().await;
    Ok(Json(json!({ "players": config.all_players() })))
}

/// GET /api/packs
async fn get_packs(headers: HeaderMap, State(state): State<WebState>) -> ApiResult {
    require_session(&headers, &state).await?;
    Ok(Json(json!({ "packs": state.contracts.list_packs().await })))
}

/// GET /api/mail
async fn get_mail(headers: HeaderMap, State(state): State<WebState>) -> ApiResult {
    let session = require_session(&headers, &state).await?;
    let list = state.mail.list(session.user_id()).await?;
    Ok(Json(json!(list)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClaimRequest {
    mail_id: Value,
}

/// Mail ids are strings, but older clients send numbers
fn mail_id_from(value: &Value) -> Option<String> {
    match value {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// POST /api/mail/claim
async fn claim_mail(
    headers: HeaderMap,
    State(state): State<WebState>,
    Json(body): Json<ClaimRequest>,
) -> ApiResult {
    let session = require_session(&headers, &state).await?;
    let mail_id = mail_id_from(&body.mail_id)
        .ok_or_else(|| ApiError::BadRequest("mailId is required".to_string()))?;

    let outcome = state.mail.claim(session.user_id(), &mail_id).await?;
    Ok(Json(json!({
        "success": true,
        "rewards": outcome.totals,
        "newBalance": outcome.balances,
    })))
}

/// POST /api/mail/claim-all
async fn claim_all_mail(headers: HeaderMap, State(state): State<WebState>) -> ApiResult {
    let session = require_session(&headers, &state).await?;
    let outcome = state.mail.claim_all(session.user_id()).await?;
    Ok(Json(json!({
        "success": true,
        "claimedCount": outcome.claimed,
        "totalRewards": outcome.totals,
        "newBalance": outcome.balances,
    })))
}

#[derive(Deserialize)]
struct ContractRequest {
    pack: String,
}

/// POST /api/contract
async fn open_contract(
    headers: HeaderMap,
    State(state): State<WebState>,
    Json(body): Json<ContractRequest>,
) -> ApiResult {
    let session = require_session(&headers, &state).await?;
    let outcome = state.contracts.pull(session.user_id(), &body.pack).await?;
    info!(
        "{} opened a {} from the dashboard",
        session.discord.display_name(),
        outcome.pack_name
    );
    Ok(Json(json!({ "success": true, "result": outcome })))
}

/// GET /api/penalty
async fn get_penalty(headers: HeaderMap, State(state): State<WebState>) -> ApiResult {
    let session = require_session(&headers, &state).await?;
    let status = state.penalty.status(session.user_id()).await?;
    Ok(Json(json!({ "success": true, "status": status })))
}

#[derive(Deserialize)]
struct ShotRequest {
    direction: String,
}

/// POST /api/penalty/shoot
async fn shoot_penalty(
    headers: HeaderMap,
    State(state): State<WebState>,
    Json(body): Json<ShotRequest>,
) -> ApiResult {
    let session = require_session(&headers, &state).await?;
    let direction: Direction = body.direction.parse().map_err(|_| {
        ApiError::BadRequest("direction must be left, center or right".to_string())
    })?;

    let outcome = state.penalty.shoot(session.user_id(), direction).await?;
    Ok(Json(json!({ "success": true, "result": outcome })))
}

#[derive(Deserialize)]
struct NewsQuery {
    page: Option<usize>,
}

/// GET /api/news - public. Without `page` every article is returned.
async fn get_news(State(state): State<WebState>, Query(query): Query<NewsQuery>) -> ApiResult {
    match query.page {
        Some(page) => {
            let page = state.news.page(page).await?;
            Ok(Json(json!({
                "news": page.items,
                "page": page.page,
                "totalPages": page.total_pages,
                "total": page.total,
            })))
        }
        None => Ok(Json(json!({ "news": state.news.list_all().await }))),
    }
}

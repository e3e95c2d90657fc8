use axum::extract::{Json, OriginalUri, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use serde_json::{json, Value};

use crate::auth::{
    create_token, create_token_pair, decode_token, extract_bearer, hash_password,
    verify_password, TokenKind,
};
use crate::db;
use crate::error::AppError;
use crate::models::{
    AccessResponse, AuthResponse, FoodSearchQuery, LoginRequest, RefreshRequest,
    RegisterRequest, UserSummary,
};
use crate::pagination::{LimitOffset, Page};
use crate::password::validate_password;
use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "title": state.settings.api.title,
            "description": state.settings.api.description,
            "version": state.settings.api.version,
            "debug": state.settings.debug,
            "language_code": state.settings.i18n.language_code,
            "time_zone": state.settings.i18n.time_zone,
        })),
    )
}

pub async fn not_found() -> AppError {
    AppError::NotFound
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::BadRequest("a valid email is required".to_string()));
    }
    validate_password(&payload.password, &email, &state.settings.password_policy)?;

    let hash = hash_password(&payload.password)?;
    let user = db::create_user(&state.pool, &email, &hash).await?;
    let tokens = create_token_pair(&user.id, &state.settings)?;
    tracing::info!(user_id = %user.id, "registered user");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            access: tokens.access,
            refresh: tokens.refresh,
            user,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || payload.password.is_empty() {
        return Err(AppError::BadRequest(
            "invalid email or password".to_string(),
        ));
    }

    let found = db::find_user_by_email(&state.pool, &email).await?;
    let (user, password_hash) = found.ok_or(AppError::Unauthorized)?;
    if !verify_password(&payload.password, &password_hash)? {
        return Err(AppError::Unauthorized);
    }

    let tokens = create_token_pair(&user.id, &state.settings)?;
    Ok(Json(AuthResponse {
        access: tokens.access,
        refresh: tokens.refresh,
        user,
    }))
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AccessResponse>, AppError> {
    let claims = decode_token(&payload.refresh, TokenKind::Refresh, &state.settings)?;
    let access = create_token(&claims.sub, TokenKind::Access, &state.settings)?;
    Ok(Json(AccessResponse { access }))
}

pub async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UserSummary>, AppError> {
    let user = require_user(&state, &headers).await?;
    Ok(Json(user))
}

pub async fn list_users(
    State(state): State<AppState>,
    headers: HeaderMap,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<LimitOffset>,
) -> Result<Json<Page<UserSummary>>, AppError> {
    require_user(&state, &headers).await?;
    let window = query.resolve(state.settings.page_size(), state.settings.rest.max_limit);
    let count = db::count_users(&state.pool).await?;
    let results = db::list_users(&state.pool, window.limit, window.offset).await?;
    Ok(Json(Page::new(uri.path(), window, count, results)))
}

pub async fn search_foods(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<FoodSearchQuery>,
) -> Result<Json<Value>, AppError> {
    require_user(&state, &headers).await?;
    let text = query.query.trim();
    if text.is_empty() {
        return Err(AppError::BadRequest("query is required".to_string()));
    }
    let foods = state.nutritionix.natural_nutrients(text).await?;
    Ok(Json(foods))
}

async fn require_user(state: &AppState, headers: &HeaderMap) -> Result<UserSummary, AppError> {
    let token = extract_bearer(headers).ok_or(AppError::Unauthorized)?;
    let claims = decode_token(&token, TokenKind::Access, &state.settings)?;
    db::get_user_by_id(&state.pool, &claims.sub)
        .await?
        .ok_or(AppError::Unauthorized)
}

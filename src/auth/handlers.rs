use axum::{
    extract::{rejection::JsonRejection, FromRef, State},
    http::{header::SET_COOKIE, HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{error, info, instrument, warn};

use crate::{
    app::not_found,
    auth::{
        cookies::{clear_refresh_cookie, refresh_cookie, RefreshCookie},
        dto::{AuthResponse, LoginRequest, MeResponse, PublicUser, RegisterRequest, UserList},
        jwt::{Claims, TokenIssuer, TokenPayload},
        middleware::require_access_token,
        password::{hash_password_async, verify_password_async},
        repo_types::{NewUser, User, UserUpdate},
    },
    error::AppError,
    response::{success, success_empty},
    state::AppState,
};

const MIN_PASSWORD_LEN: usize = 6;
const ENTITY_TYPE_USER: &str = "user";

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register).fallback(not_found))
        .route("/auth/login", post(login).fallback(not_found))
        .route("/auth/logout", post(logout).fallback(not_found))
        .route("/auth/refresh-token", get(refresh_token).fallback(not_found))
        // TODO: decide whether listing users should sit behind the access-token gate.
        .route("/auth/users", get(get_all_users).fallback(not_found))
}

pub fn me_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/auth/me", get(me).fallback(not_found))
        .route_layer(middleware::from_fn_with_state(state, require_access_token))
}

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Trimmed value, or `None` when absent or blank.
fn present(field: Option<String>) -> Option<String> {
    field
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Issues a fresh token pair, stores the refresh token on the user and builds
/// the matching cookie.
///
/// With `rotate_from` the new token is stored only if `rotate_from` is still
/// the user's current one, so a refresh token can be redeemed at most once.
/// Without it any previous token is overwritten.
async fn start_session(
    state: &AppState,
    user: &User,
    entity_type: Option<&str>,
    rotate_from: Option<&str>,
) -> Result<(String, HeaderValue), AppError> {
    let keys = TokenIssuer::from_ref(state);
    let payload = TokenPayload::for_user(user);
    let access_payload = match entity_type {
        Some(tag) => payload.clone().with_entity_type(tag),
        None => payload.clone(),
    };

    let access_token = keys.issue_access(&access_payload).map_err(|e| {
        error!(error = ?e, "jwt sign access failed");
        AppError::Internal(e.into())
    })?;
    let refresh_token = keys.issue_refresh(&payload).map_err(|e| {
        error!(error = ?e, "jwt sign refresh failed");
        AppError::Internal(e.into())
    })?;

    let stored = match rotate_from {
        Some(current) => {
            state
                .users
                .swap_refresh_token(user.id, current, &refresh_token)
                .await?
        }
        None => {
            state
                .users
                .update(user.id, UserUpdate::set_refresh_token(&refresh_token))
                .await?
        }
    };
    if stored.is_none() {
        warn!(user_id = user.id, "refresh token no longer current");
        return Err(AppError::not_found("User not found"));
    }

    let cookie = refresh_cookie(&refresh_token, keys.refresh_ttl())
        .map_err(|e| AppError::Internal(e.into()))?;
    Ok((access_token, cookie))
}

#[instrument(skip(state, body))]
pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(payload) = body?;

    let (Some(email), Some(username), Some(password)) = (
        present(payload.email),
        present(payload.username),
        payload.password.filter(|p| !p.is_empty()),
    ) else {
        warn!("register with missing fields");
        return Err(AppError::validation(
            "Email, username and password are required",
        ));
    };

    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::validation("Invalid email"));
    }

    // Length in UTF-16 code units, as browser clients count it.
    if password.encode_utf16().count() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(AppError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    if state.users.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::Conflict("Email is already in use".into()));
    }
    if state.users.find_by_username(&username).await?.is_some() {
        warn!(username = %username, "username already registered");
        return Err(AppError::Conflict("Username is already in use".into()));
    }

    let password_hash = hash_password_async(password).await?;
    // The store re-checks uniqueness atomically; a lost race still ends up as 409.
    let user = state
        .users
        .create(NewUser {
            email,
            username,
            password_hash,
        })
        .await?;

    let (access_token, cookie) = start_session(&state, &user, Some(ENTITY_TYPE_USER), None).await?;

    info!(user_id = user.id, email = %user.email, "user registered");
    Ok((
        [(SET_COOKIE, cookie)],
        success(
            StatusCode::CREATED,
            "Registered successfully",
            AuthResponse {
                access_token,
                user: PublicUser::from(&user),
            },
        ),
    )
        .into_response())
}

#[instrument(skip(state, body))]
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(payload) = body?;

    let (Some(identifier), Some(password)) = (
        present(payload.username),
        payload.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::validation("Username and password are required"));
    };

    let Some(user) = state.users.find_by_email_or_username(&identifier).await? else {
        warn!(identifier = %identifier, "login unknown account");
        return Err(AppError::not_found(
            "Account does not exist. Please check your login details.",
        ));
    };

    let Some(hash) = user.password_hash.clone() else {
        warn!(user_id = user.id, "login on account without password");
        return Err(AppError::validation("Account has no password set"));
    };

    if !verify_password_async(password, hash).await? {
        warn!(user_id = user.id, "login invalid password");
        return Err(AppError::validation("Incorrect password"));
    }

    let (access_token, cookie) = start_session(&state, &user, Some(ENTITY_TYPE_USER), None).await?;

    info!(user_id = user.id, "user logged in");
    Ok((
        [(SET_COOKIE, cookie)],
        success(
            StatusCode::OK,
            "Logged in successfully",
            AuthResponse {
                access_token,
                user: PublicUser::from(&user),
            },
        ),
    )
        .into_response())
}

#[instrument(skip_all)]
pub async fn refresh_token(
    State(state): State<AppState>,
    RefreshCookie(cookie): RefreshCookie,
) -> Result<Response, AppError> {
    let Some(token) = cookie else {
        return Err(AppError::validation("Refresh token is missing"));
    };

    let keys = TokenIssuer::from_ref(&state);
    if let Err(e) = keys.verify_refresh(&token) {
        warn!(error = ?e, "refresh token rejected");
        return Err(AppError::validation("Invalid token"));
    }

    // A verified token that is no longer stored was rotated out or logged out.
    let Some(user) = state.users.find_by_refresh_token(&token).await? else {
        warn!("refresh token not held by any user");
        return Err(AppError::not_found("User not found"));
    };

    let (access_token, cookie) = start_session(&state, &user, None, Some(&token)).await?;

    info!(user_id = user.id, "tokens refreshed");
    Ok((
        [(SET_COOKIE, cookie)],
        success(
            StatusCode::OK,
            "Token refreshed successfully",
            AuthResponse {
                access_token,
                user: PublicUser::from(&user),
            },
        ),
    )
        .into_response())
}

#[instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    RefreshCookie(cookie): RefreshCookie,
) -> Result<Response, AppError> {
    let Some(token) = cookie else {
        return Err(AppError::validation("Refresh token is missing"));
    };

    let claims = TokenIssuer::from_ref(&state)
        .verify_refresh(&token)
        .map_err(|e| {
            warn!(error = ?e, "refresh token rejected on logout");
            AppError::validation("Invalid token")
        })?;

    state
        .users
        .update(claims.user.id, UserUpdate::clear_refresh_token())
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    info!(user_id = claims.user.id, "user logged out");
    Ok((
        [(SET_COOKIE, clear_refresh_cookie())],
        success_empty(StatusCode::OK, "Logged out successfully"),
    )
        .into_response())
}

#[instrument(skip_all)]
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Response, AppError> {
    let user = state
        .users
        .find_by_id(claims.user.id)
        .await?
        .ok_or_else(|| AppError::not_found("User account does not exist"))?;

    Ok(success(
        StatusCode::OK,
        "Current user",
        MeResponse {
            user: PublicUser::from(&user),
        },
    )
    .into_response())
}

#[instrument(skip(state))]
pub async fn get_all_users(State(state): State<AppState>) -> Result<Response, AppError> {
    let users: Vec<PublicUser> = state.users.list().await?.iter().map(PublicUser::from).collect();
    let total = users.len();
    Ok(success(StatusCode::OK, "Users fetched successfully", UserList { users, total }).into_response())
}

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::CookieJar;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

use crate::auth::jwt::{encode_token, Claims};
use crate::auth::password::{self, MIN_PASSWORD_LEN};
use crate::db;
use crate::error::{conflict_on_unique, AppError};
use crate::models::{User, UserSummary};
use crate::state::SharedState;
use crate::validate;

const AVATAR_COLORS: [&str; 8] = [
    "#f97316", "#eab308", "#22c55e", "#14b8a6", "#3b82f6", "#6366f1", "#a855f7", "#ec4899",
];

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub user: UserSummary,
}

fn access_cookie(token: &str) -> CookieJar {
    let cookie = Cookie::build(("access_token", token.to_string()))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .build();
    CookieJar::new().add(cookie)
}

fn issue(state: &SharedState, user: &User) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    let access_token =
        encode_token(&Claims::new(user.id), &state.config.jwt_secret).map_err(AppError::Internal)?;
    let jar = access_cookie(&access_token);
    Ok((
        jar,
        Json(AuthResponse {
            access_token,
            user: UserSummary::from(user),
        }),
    ))
}

pub async fn register(
    State(state): State<SharedState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>), AppError> {
    let username = validate::required(req.username.as_deref(), "Username")?;
    let email = validate::required(req.email.as_deref(), "Email")?;
    let password = req.password.as_deref().unwrap_or_default();
    validate::email(email)?;

    if password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let pw_hash = password::hash(password).map_err(AppError::Internal)?;
    let avatar_color = AVATAR_COLORS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(AVATAR_COLORS[0]);

    let user = db::users::create(&state.pool, username, email, &pw_hash, avatar_color)
        .await
        .map_err(conflict_on_unique("A user with this email or username already exists"))?;

    tracing::info!(user_id = %user.id, "user registered");

    let (jar, body) = issue(&state, &user)?;
    Ok((StatusCode::CREATED, jar, body))
}

pub async fn login(
    State(state): State<SharedState>,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    let email = validate::required(req.email.as_deref(), "Email")?;
    let password = req.password.as_deref().unwrap_or_default();
    if password.is_empty() {
        return Err(AppError::BadRequest("Password is required".to_string()));
    }

    let user = db::users::find_by_email(&state.pool, email)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid credentials".to_string()))?;

    let valid = password::verify(password, &user.password_hash).map_err(AppError::Internal)?;
    if !valid {
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    }

    issue(&state, &user)
}

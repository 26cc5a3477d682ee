use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::json;
use time::Duration as TimeDuration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::auth::dto::{
    AuthResponse, ChangePasswordRequest, LoginRequest, RefreshRequest, RegisterRequest,
};
use crate::auth::extractors::AuthUser;
use crate::auth::jwt::JwtKeys;
use crate::auth::password::{hash_password, verify_password};
use crate::error::{is_unique_violation, ApiError, ApiResult};
use crate::state::AppState;
use crate::users::dto::PublicUser;
use crate::users::repo as users_repo;

pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/users/register", post(register))
        .route("/users/login", post(login))
        .route("/users/logout", post(logout))
        .route("/users/refresh-token", post(refresh))
        .route("/users/change-password", post(change_password))
        .route("/users/current-user", get(current_user))
}

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex");
    static ref USERNAME_RE: Regex = Regex::new(r"^[a-z0-9._]{3,30}$").expect("username regex");
}

pub fn is_valid_email(s: &str) -> bool {
    EMAIL_RE.is_match(s)
}

pub fn is_valid_username(s: &str) -> bool {
    USERNAME_RE.is_match(s)
}

const ACCESS_COOKIE: &str = "accessToken";
const REFRESH_COOKIE: &str = "refreshToken";

fn session_cookie(
    name: &'static str,
    value: String,
    ttl: std::time::Duration,
    secure: bool,
) -> Cookie<'static> {
    let mut cookie = Cookie::new(name, value);
    cookie.set_http_only(true);
    cookie.set_secure(secure);
    cookie.set_path("/");
    cookie.set_same_site(SameSite::Lax);
    cookie.set_max_age(TimeDuration::seconds(ttl.as_secs() as i64));
    cookie
}

fn removal_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build(name).path("/").build()
}

/// Signs a new access/refresh pair, persists the refresh token on the user
/// row (rotation) and returns the pair plus the cookie jar to set.
async fn issue_session(
    state: &AppState,
    jar: CookieJar,
    user_id: Uuid,
) -> ApiResult<(CookieJar, String, String)> {
    let keys = JwtKeys::from_ref(state);
    let access_token = keys.sign_access(user_id)?;
    let refresh_token = keys.sign_refresh(user_id)?;

    users_repo::set_refresh_token(&state.db, user_id, Some(&refresh_token)).await?;

    let secure = state.config.cookie_secure;
    let jar = jar
        .add(session_cookie(
            ACCESS_COOKIE,
            access_token.clone(),
            keys.access_ttl,
            secure,
        ))
        .add(session_cookie(
            REFRESH_COOKIE,
            refresh_token.clone(),
            keys.refresh_ttl,
            secure,
        ));
    Ok((jar, access_token, refresh_token))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<PublicUser>)> {
    payload.username = payload.username.trim().to_lowercase();
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_username(&payload.username) {
        warn!(username = %payload.username, "invalid username");
        return Err(ApiError::Validation("Invalid username".into()));
    }
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::Validation("Invalid email".into()));
    }
    if payload.password.len() < 8 {
        warn!("password too short");
        return Err(ApiError::Validation("Password too short".into()));
    }

    if users_repo::find_by_username(&state.db, &payload.username)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict("Username already taken".into()));
    }
    if users_repo::find_by_email(&state.db, &payload.email)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict("Email already registered".into()));
    }

    let hash = hash_password(&payload.password)?;
    let user = users_repo::create(&state.db, &payload.username, &payload.email, &hash)
        .await
        .map_err(|e| {
            // The pre-checks can race; the unique indexes are authoritative.
            if is_unique_violation(&e) {
                ApiError::Conflict("Username or email already taken".into())
            } else {
                e.into()
            }
        })?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok((StatusCode::CREATED, Json(PublicUser::from(user))))
}

#[instrument(skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<(CookieJar, Json<AuthResponse>)> {
    let user = match (&payload.username, &payload.email) {
        (Some(username), _) => {
            users_repo::find_by_username(&state.db, &username.trim().to_lowercase()).await?
        }
        (None, Some(email)) => {
            users_repo::find_by_email(&state.db, &email.trim().to_lowercase()).await?
        }
        (None, None) => {
            return Err(ApiError::Validation("Username or email is required".into()));
        }
    };

    // One message for unknown user and wrong password.
    let user = user.ok_or_else(|| ApiError::Auth("Invalid credentials".into()))?;
    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::Auth("Invalid credentials".into()));
    }

    let (jar, access_token, refresh_token) = issue_session(&state, jar, user.id).await?;

    info!(user_id = %user.id, username = %user.username, "user logged in");
    Ok((
        jar,
        Json(AuthResponse {
            access_token,
            refresh_token,
            user: PublicUser::from(user),
        }),
    ))
}

#[instrument(skip(state, jar))]
pub async fn logout(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Json<serde_json::Value>)> {
    users_repo::set_refresh_token(&state.db, user_id, None).await?;

    let jar = jar
        .remove(removal_cookie(ACCESS_COOKIE))
        .remove(removal_cookie(REFRESH_COOKIE));

    info!(user_id = %user_id, "user logged out");
    Ok((jar, Json(json!({ "message": "Logged out" }))))
}

#[instrument(skip(state, jar, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Option<Json<RefreshRequest>>,
) -> ApiResult<(CookieJar, Json<AuthResponse>)> {
    let presented = jar
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .or_else(|| payload.and_then(|Json(p)| p.refresh_token))
        .ok_or_else(|| ApiError::Auth("Missing refresh token".into()))?;

    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&presented)
        .map_err(|_| ApiError::Auth("Invalid or expired refresh token".into()))?;

    let user = users_repo::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::Auth("Unknown user".into()))?;

    // Rotation: only the most recently issued refresh token is honored.
    if user.refresh_token.as_deref() != Some(presented.as_str()) {
        warn!(user_id = %user.id, "stale refresh token presented");
        return Err(ApiError::Auth("Refresh token revoked".into()));
    }

    let (jar, access_token, refresh_token) = issue_session(&state, jar, user.id).await?;

    Ok((
        jar,
        Json(AuthResponse {
            access_token,
            refresh_token,
            user: PublicUser::from(user),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    if payload.new_password.len() < 8 {
        return Err(ApiError::Validation("Password too short".into()));
    }

    let user = users_repo::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    if !verify_password(&payload.current_password, &user.password_hash)? {
        return Err(ApiError::Validation("Current password is incorrect".into()));
    }

    let hash = hash_password(&payload.new_password)?;
    users_repo::update_password(&state.db, user_id, &hash).await?;

    info!(user_id = %user_id, "password changed");
    Ok(Json(json!({ "message": "Password changed" })))
}

#[instrument(skip(state))]
pub async fn current_user(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<PublicUser>> {
    let user = users_repo::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    Ok(Json(PublicUser::from(user)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("ada@example.com"));
        assert!(is_valid_email("a.b+c@sub.domain.io"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("spaces in@mail.com"));
    }

    #[test]
    fn username_validation() {
        assert!(is_valid_username("ada.lovelace"));
        assert!(is_valid_username("user_42"));
        assert!(!is_valid_username("ab"));
        assert!(!is_valid_username("Has Spaces"));
        assert!(!is_valid_username("UPPER"));
    }

    #[test]
    fn session_cookie_is_http_only_and_scoped() {
        let cookie = session_cookie(
            ACCESS_COOKIE,
            "tok".into(),
            std::time::Duration::from_secs(300),
            true,
        );
        assert!(cookie.http_only().unwrap_or(false));
        assert!(cookie.secure().unwrap_or(false));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(TimeDuration::seconds(300)));
    }
}

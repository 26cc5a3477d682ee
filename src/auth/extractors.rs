use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::CookieJar;
use tracing::warn;
use uuid::Uuid;

use crate::auth::claims::TokenKind;
use crate::auth::jwt::JwtKeys;
use crate::error::ApiError;

/// Extracts and validates the session token, yielding the caller's user ID.
/// The `accessToken` cookie is checked first, then `Authorization: Bearer`.
#[derive(Debug)]
pub struct AuthUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);

        let cookie_token = CookieJar::from_headers(&parts.headers)
            .get("accessToken")
            .map(|c| c.value().to_string());

        let token = match cookie_token {
            Some(t) => t,
            None => parts
                .headers
                .get(axum::http::header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(str::to_string)
                .ok_or_else(|| ApiError::Auth("Missing access token".to_string()))?,
        };

        let claims = keys.verify(&token).map_err(|_| {
            warn!("invalid or expired token");
            ApiError::Auth("Invalid or expired token".to_string())
        })?;

        if claims.kind != TokenKind::Access {
            return Err(ApiError::Auth("Access token required".to_string()));
        }

        Ok(AuthUser(claims.sub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;
    use axum::http::{header, Request, StatusCode};
    use axum::response::IntoResponse;

    fn parts_with_headers(headers: Vec<(header::HeaderName, String)>) -> Parts {
        let mut builder = Request::builder().uri("/");
        for (name, value) in headers {
            builder = builder.header(name, value);
        }
        builder.body(()).expect("request").into_parts().0
    }

    #[tokio::test]
    async fn accepts_access_token_from_cookie() {
        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        let user_id = Uuid::new_v4();
        let token = keys.sign_access(user_id).expect("sign");

        let mut parts = parts_with_headers(vec![(
            header::COOKIE,
            format!("accessToken={}; theme=dark", token),
        )]);
        let AuthUser(got) = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .expect("extract");
        assert_eq!(got, user_id);
    }

    #[tokio::test]
    async fn accepts_bearer_header_when_no_cookie() {
        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        let user_id = Uuid::new_v4();
        let token = keys.sign_access(user_id).expect("sign");

        let mut parts = parts_with_headers(vec![(
            header::AUTHORIZATION,
            format!("Bearer {}", token),
        )]);
        let AuthUser(got) = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .expect("extract");
        assert_eq!(got, user_id);
    }

    #[tokio::test]
    async fn rejects_missing_token_with_401() {
        let state = AppState::fake();
        let mut parts = parts_with_headers(vec![]);
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn rejects_refresh_token_where_access_required() {
        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        let token = keys.sign_refresh(Uuid::new_v4()).expect("sign");

        let mut parts =
            parts_with_headers(vec![(header::COOKIE, format!("accessToken={}", token))]);
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn rejects_garbage_bearer_token() {
        let state = AppState::fake();
        let mut parts = parts_with_headers(vec![(
            header::AUTHORIZATION,
            "Bearer not-a-jwt".to_string(),
        )]);
        assert!(AuthUser::from_request_parts(&mut parts, &state)
            .await
            .is_err());
    }
}

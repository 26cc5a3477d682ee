use crate::state::AppState;
use axum::Router;

pub(crate) mod claims;
pub(crate) mod dto;
pub(crate) mod extractors;
pub mod handlers;
pub(crate) mod jwt;
pub(crate) mod password;

pub fn router() -> Router<AppState> {
    handlers::session_routes()
}

pub(crate) mod dto;
pub mod handlers;
pub(crate) mod repo;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::routes()
}

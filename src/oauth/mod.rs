use crate::state::AppState;
use axum::Router;

pub mod handlers;
pub mod pending;
pub mod providers;

pub fn router() -> Router<AppState> {
    handlers::oauth_routes()
}

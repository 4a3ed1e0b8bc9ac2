use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod hashing;
pub mod reset;
pub mod session;

pub fn router() -> Router<AppState> {
    handlers::router()
}

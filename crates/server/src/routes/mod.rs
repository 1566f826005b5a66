use axum::Router;

use crate::AppState;

pub mod board;
pub mod categories;
pub mod health;
pub mod procedures;
pub mod users;

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(health::router(state))
        .merge(users::router(state))
        .merge(categories::router(state))
        .merge(procedures::router(state))
        .merge(board::router(state))
}

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::user::{CreateUser, User};
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError};

/// GET /user
pub async fn get_users(State(state): State<AppState>) -> Result<ResponseJson<Vec<User>>, ApiError> {
    Ok(ResponseJson(state.procedures().list_users().await?))
}

/// POST /user
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUser>, JsonRejection>,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    let Json(payload) = payload?;
    let user = state.procedures().create_user(&payload).await?;
    Ok(ResponseJson(ApiResponse::success("User is created", user)))
}

pub fn router(_state: &AppState) -> Router<AppState> {
    Router::new().route("/user", get(get_users).post(create_user))
}

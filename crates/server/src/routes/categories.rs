use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::category::{Category, CreateCategory};
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError};

/// GET /category
pub async fn get_categories(
    State(state): State<AppState>,
) -> Result<ResponseJson<Vec<Category>>, ApiError> {
    Ok(ResponseJson(state.procedures().list_categories().await?))
}

/// POST /category
pub async fn create_category(
    State(state): State<AppState>,
    payload: Result<Json<CreateCategory>, JsonRejection>,
) -> Result<ResponseJson<ApiResponse<Category>>, ApiError> {
    let Json(payload) = payload?;
    let category = state.procedures().create_category(&payload).await?;
    Ok(ResponseJson(ApiResponse::success("Category is created", category)))
}

pub fn router(_state: &AppState) -> Router<AppState> {
    Router::new().route("/category", get(get_categories).post(create_category))
}

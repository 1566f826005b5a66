use axum::{
    Router,
    extract::{Query, State, rejection::QueryRejection},
    response::Json as ResponseJson,
    routing::get,
};
use db::filter::FilterCriteria;
use services::services::board::Board;

use crate::{AppState, error::ApiError};

/// GET /board
/// The four status columns, built from the same criteria as `GET /procedure`.
pub async fn get_board(
    State(state): State<AppState>,
    criteria: Result<Query<FilterCriteria>, QueryRejection>,
) -> Result<ResponseJson<Board>, ApiError> {
    let Query(criteria) = criteria?;
    let board = state.procedures().board(&criteria).await?;
    tracing::debug!(tasks = board.task_count(), "board built");
    Ok(ResponseJson(board))
}

pub fn router(_state: &AppState) -> Router<AppState> {
    Router::new().route("/board", get(get_board))
}

use axum::{
    Json, Router,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    response::Json as ResponseJson,
    routing::get,
};
use db::{
    filter::FilterCriteria,
    models::procedure::{
        CreateProcedure, PatchProcedure, Procedure, ProcedureWithRelations, UpdateProcedureColumn,
    },
};
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError};

/// GET /procedure
/// Procedures matching every supplied criterion, with user and categories joined.
pub async fn get_procedures(
    State(state): State<AppState>,
    criteria: Result<Query<FilterCriteria>, QueryRejection>,
) -> Result<ResponseJson<Vec<ProcedureWithRelations>>, ApiError> {
    let Query(criteria) = criteria?;
    Ok(ResponseJson(state.procedures().list_procedures(&criteria).await?))
}

/// POST /procedure
pub async fn create_procedure(
    State(state): State<AppState>,
    payload: Result<Json<CreateProcedure>, JsonRejection>,
) -> Result<ResponseJson<ApiResponse<Procedure>>, ApiError> {
    let Json(payload) = payload?;
    let procedure = state.procedures().create_procedure(&payload).await?;
    Ok(ResponseJson(ApiResponse::success("Procedure is created", procedure)))
}

/// PUT /procedure
/// Column-only move.
pub async fn update_procedure_column(
    State(state): State<AppState>,
    payload: Result<Json<UpdateProcedureColumn>, JsonRejection>,
) -> Result<ResponseJson<ApiResponse<Procedure>>, ApiError> {
    let Json(payload) = payload?;
    let procedure = state.procedures().update_column(&payload).await?;
    Ok(ResponseJson(ApiResponse::success("Procedure status updated", procedure)))
}

/// PATCH /procedure
pub async fn patch_procedure(
    State(state): State<AppState>,
    payload: Result<Json<PatchProcedure>, JsonRejection>,
) -> Result<ResponseJson<ApiResponse<Procedure>>, ApiError> {
    let Json(payload) = payload?;
    let procedure = state.procedures().patch_procedure(&payload).await?;
    Ok(ResponseJson(ApiResponse::success("Procedure is updated", procedure)))
}

pub fn router(_state: &AppState) -> Router<AppState> {
    Router::new().route(
        "/procedure",
        get(get_procedures)
            .post(create_procedure)
            .put(update_procedure_column)
            .patch(patch_procedure),
    )
}

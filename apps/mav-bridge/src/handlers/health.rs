use crate::AppState;
use api_contract::{ApiResponse, HealthDto};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

pub async fn health(State(state): State<AppState>) -> Response {
    let source_state = *state.source_state.borrow();
    (
        StatusCode::OK,
        Json(ApiResponse::success(HealthDto {
            ok: true,
            source_state: source_state.to_string(),
            subscribers: state.registry.len(),
        })),
    )
        .into_response()
}

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use uuid::Uuid;

use crate::models::aml::{AmlCheckPayload, AmlCheckView};
use crate::state::AppState;
use crate::workflow::Actor;

use super::HttpError;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/aml/check", post(run_check))
        .route("/aml/checks/{check_id}", get(get_check))
}

async fn run_check(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<AmlCheckPayload>,
) -> Result<Json<AmlCheckView>, HttpError> {
    let check = state
        .aml
        .run_check(actor, &payload.address, &payload.network)
        .await?;
    Ok(Json(AmlCheckView::from(check.as_ref())))
}

async fn get_check(
    State(state): State<AppState>,
    actor: Actor,
    Path(check_id): Path<Uuid>,
) -> Result<Json<AmlCheckView>, HttpError> {
    let check = state.aml.get_check(actor, check_id).await?;
    Ok(Json(AmlCheckView::from(check.as_ref())))
}

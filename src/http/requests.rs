use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use uuid::Uuid;

use crate::models::requests::{
    CreateRequestPayload, DecisionPayload, DEFAULT_PAGE_SIZE, HistoryItemView, ListRequestsQuery,
    MarkPaidPayload, RequestView,
};
use crate::state::AppState;
use crate::workflow::{Actor, RequestStatus};

use super::HttpError;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/requests", post(create_request).get(list_requests))
        .route("/requests/{request_id}", get(get_request))
        .route("/requests/{request_id}/submit", post(submit_request))
        .route("/requests/{request_id}/approve", post(approve_request))
        .route("/requests/{request_id}/reject", post(reject_request))
        .route("/requests/{request_id}/mark-paid", post(mark_paid))
        .route("/requests/{request_id}/history", get(request_history))
}

async fn create_request(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<CreateRequestPayload>,
) -> Result<(StatusCode, Json<RequestView>), HttpError> {
    let created = state.lifecycle.create(actor, payload.into()).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

async fn list_requests(
    State(state): State<AppState>,
    actor: Actor,
    Query(query): Query<ListRequestsQuery>,
) -> Result<Json<Vec<RequestView>>, HttpError> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<RequestStatus>)
        .transpose()?;
    let rows = state
        .lifecycle
        .list(
            actor,
            status,
            query.limit.unwrap_or(DEFAULT_PAGE_SIZE),
            query.offset.unwrap_or(0),
        )
        .await?;
    Ok(Json(rows.into_iter().map(RequestView::from).collect()))
}

async fn get_request(
    State(state): State<AppState>,
    actor: Actor,
    Path(request_id): Path<Uuid>,
) -> Result<Json<RequestView>, HttpError> {
    let request = state.lifecycle.get(actor, request_id).await?;
    Ok(Json(request.into()))
}

async fn submit_request(
    State(state): State<AppState>,
    actor: Actor,
    Path(request_id): Path<Uuid>,
) -> Result<Json<RequestView>, HttpError> {
    let request = state.lifecycle.submit(actor, request_id).await?;
    Ok(Json(request.into()))
}

async fn approve_request(
    State(state): State<AppState>,
    actor: Actor,
    Path(request_id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<RequestView>, HttpError> {
    let reason = decision(&body)?.reason;
    let request = state.lifecycle.approve(actor, request_id, reason).await?;
    Ok(Json(request.into()))
}

async fn reject_request(
    State(state): State<AppState>,
    actor: Actor,
    Path(request_id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<RequestView>, HttpError> {
    let reason = decision(&body)?.reason.unwrap_or_default();
    let request = state.lifecycle.reject(actor, request_id, reason).await?;
    Ok(Json(request.into()))
}

async fn mark_paid(
    State(state): State<AppState>,
    actor: Actor,
    Path(request_id): Path<Uuid>,
    Json(payload): Json<MarkPaidPayload>,
) -> Result<Json<RequestView>, HttpError> {
    let request = state
        .lifecycle
        .mark_paid(actor, request_id, payload.tx_hash)
        .await?;
    Ok(Json(request.into()))
}

async fn request_history(
    State(state): State<AppState>,
    actor: Actor,
    Path(request_id): Path<Uuid>,
) -> Result<Json<Vec<HistoryItemView>>, HttpError> {
    let rows = state.lifecycle.history(actor, request_id).await?;
    Ok(Json(rows.into_iter().map(HistoryItemView::from).collect()))
}

/// Decision bodies are optional; an empty body means no reason.
fn decision(body: &[u8]) -> Result<DecisionPayload, HttpError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(DecisionPayload::default());
    }
    serde_json::from_slice(body).map_err(|err| {
        HttpError::new(
            StatusCode::BAD_REQUEST,
            format!("Invalid decision payload: {err}"),
        )
    })
}

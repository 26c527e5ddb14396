use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::identity;
use crate::models::admin::{AuditLogView, AuditQuery, RoleUpdatePayload, UserView};
use crate::state::AppState;
use crate::workflow::Actor;
use crate::workflow::audit::{self, MAX_TRAIL_LIMIT};

use super::HttpError;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/users/{user_id}/role", post(update_role))
        .route("/audit", get(audit_trail))
}

async fn update_role(
    State(state): State<AppState>,
    actor: Actor,
    Path(user_id): Path<i64>,
    Json(payload): Json<RoleUpdatePayload>,
) -> Result<Json<UserView>, HttpError> {
    let user = identity::change_user_role(&state.database, actor, user_id, payload.role).await?;
    Ok(Json(user.into()))
}

async fn audit_trail(
    State(state): State<AppState>,
    actor: Actor,
    Query(query): Query<AuditQuery>,
) -> Result<Json<Vec<AuditLogView>>, HttpError> {
    let rows = audit::read_trail(
        &state.database,
        actor,
        &query.entity_type,
        &query.entity_id,
        query.limit.unwrap_or(MAX_TRAIL_LIMIT),
    )
    .await?;
    Ok(Json(rows.into_iter().map(AuditLogView::from).collect()))
}

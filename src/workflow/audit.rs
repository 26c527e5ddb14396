//! Append-only status history and audit log.
//!
//! Writers take the caller's connection handle so the rows land in the same
//! transaction as the change they describe.

use sea_orm::prelude::*;
use sea_orm::{ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, QuerySelect};
use serde_json::{Value, json};

use crate::entities::{audit_log, status_history};
use crate::error::{WorkflowError, WorkflowResult};
use crate::workflow::{Actor, Operation, RequestStatus, authorize};

pub const REQUEST_STATUS_CHANGED: &str = "request_status_changed";
pub const AML_CHECK_PERFORMED: &str = "aml_check_performed";
pub const USER_ROLE_CHANGED: &str = "user_role_changed";

pub const PAYMENT_REQUEST_ENTITY: &str = "payment_request";
pub const WALLET_CHECK_ENTITY: &str = "wallet_check";
pub const USER_ENTITY: &str = "user";

pub const MAX_TRAIL_LIMIT: u64 = 500;

#[derive(Debug, Clone, Copy)]
pub struct StatusChange<'a> {
    pub request_id: Uuid,
    pub old_status: Option<RequestStatus>,
    pub new_status: RequestStatus,
    pub actor_id: i64,
    pub reason: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub actor_id: Option<i64>,
    pub action: &'static str,
    pub entity_type: &'static str,
    pub entity_id: String,
    pub payload: Value,
}

/// Writes one history row and one `request_status_changed` audit row.
pub async fn record_status_change<C: ConnectionTrait>(
    conn: &C,
    change: &StatusChange<'_>,
    at: DateTimeWithTimeZone,
) -> WorkflowResult<()> {
    let history = status_history::ActiveModel {
        id: ActiveValue::NotSet,
        request_id: ActiveValue::Set(change.request_id),
        old_status: ActiveValue::Set(change.old_status),
        new_status: ActiveValue::Set(change.new_status),
        actor_id: ActiveValue::Set(Some(change.actor_id)),
        reason: ActiveValue::Set(change.reason.map(str::to_string)),
        created_at: ActiveValue::Set(at),
    };
    status_history::Entity::insert(history).exec(conn).await?;

    let entry = AuditEntry {
        actor_id: Some(change.actor_id),
        action: REQUEST_STATUS_CHANGED,
        entity_type: PAYMENT_REQUEST_ENTITY,
        entity_id: change.request_id.to_string(),
        payload: json!({
            "old_status": change.old_status.map(RequestStatus::as_str),
            "new_status": change.new_status.as_str(),
            "reason": change.reason,
        }),
    };
    record_action(conn, entry, at).await
}

pub async fn record_action<C: ConnectionTrait>(
    conn: &C,
    entry: AuditEntry,
    at: DateTimeWithTimeZone,
) -> WorkflowResult<()> {
    if entry.action.is_empty() || entry.entity_id.is_empty() {
        return Err(WorkflowError::Validation(
            "Audit entries need an action and an entity id".to_string(),
        ));
    }

    let row = audit_log::ActiveModel {
        id: ActiveValue::NotSet,
        actor_id: ActiveValue::Set(entry.actor_id),
        action: ActiveValue::Set(entry.action.to_string()),
        entity_type: ActiveValue::Set(entry.entity_type.to_string()),
        entity_id: ActiveValue::Set(entry.entity_id),
        payload_json: ActiveValue::Set(entry.payload),
        created_at: ActiveValue::Set(at),
    };
    audit_log::Entity::insert(row).exec(conn).await?;
    Ok(())
}

/// History of one request, oldest first.
pub async fn history<C: ConnectionTrait>(
    conn: &C,
    request_id: Uuid,
) -> WorkflowResult<Vec<status_history::Model>> {
    let rows = status_history::Entity::find()
        .filter(status_history::Column::RequestId.eq(request_id))
        .order_by_asc(status_history::Column::CreatedAt)
        .order_by_asc(status_history::Column::Id)
        .all(conn)
        .await?;
    Ok(rows)
}

/// Audit trail as seen by `actor`. Only auditors may read it.
pub async fn read_trail<C: ConnectionTrait>(
    conn: &C,
    actor: Actor,
    entity_type: &str,
    entity_id: &str,
    limit: u64,
) -> WorkflowResult<Vec<audit_log::Model>> {
    authorize(Operation::ReadAuditLog, actor.role)?;
    let entity_type = entity_type.trim();
    let entity_id = entity_id.trim();
    if entity_type.is_empty() || entity_id.is_empty() {
        return Err(WorkflowError::Validation(
            "entity_type and entity_id are required".to_string(),
        ));
    }
    trail(conn, entity_type, entity_id, limit).await
}

/// Audit rows for one entity, oldest first.
pub async fn trail<C: ConnectionTrait>(
    conn: &C,
    entity_type: &str,
    entity_id: &str,
    limit: u64,
) -> WorkflowResult<Vec<audit_log::Model>> {
    let limit = limit.clamp(1, MAX_TRAIL_LIMIT);
    let rows = audit_log::Entity::find()
        .filter(audit_log::Column::EntityType.eq(entity_type))
        .filter(audit_log::Column::EntityId.eq(entity_id))
        .order_by_asc(audit_log::Column::CreatedAt)
        .order_by_asc(audit_log::Column::Id)
        .limit(limit)
        .all(conn)
        .await?;
    Ok(rows)
}

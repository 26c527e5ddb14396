use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entities::{audit_log, user};
use crate::workflow::Role;

#[derive(Debug, Clone, Deserialize)]
pub struct RoleUpdatePayload {
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserView {
    pub id: i64,
    pub telegram_id: i64,
    pub full_name: String,
    pub role: Role,
    pub is_active: bool,
}

impl From<user::Model> for UserView {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            telegram_id: model.telegram_id,
            full_name: model.full_name,
            role: model.role,
            is_active: model.is_active,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuditQuery {
    pub entity_type: String,
    pub entity_id: String,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditLogView {
    pub id: i64,
    pub actor_id: Option<i64>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub payload: Value,
    pub created_at: DateTimeWithTimeZone,
}

impl From<audit_log::Model> for AuditLogView {
    fn from(model: audit_log::Model) -> Self {
        Self {
            id: model.id,
            actor_id: model.actor_id,
            action: model.action,
            entity_type: model.entity_type,
            entity_id: model.entity_id,
            payload: model.payload_json,
            created_at: model.created_at,
        }
    }
}

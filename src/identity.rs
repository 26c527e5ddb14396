//! Caller identity: Telegram-registered operators and the legacy header actor.

use chrono::Utc;
use sea_orm::prelude::*;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ConnectionTrait, DatabaseConnection, DbBackend,
    IntoActiveModel, QueryFilter, QuerySelect, TransactionTrait,
};
use serde_json::json;
use thiserror::Error;
use tracing::info;

use crate::entities::user;
use crate::error::{WorkflowError, WorkflowResult};
use crate::workflow::audit::{self, AuditEntry};
use crate::workflow::{Actor, Operation, Role, authorize};

pub const TELEGRAM_ID_HEADER: &str = "x-telegram-id";
pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Missing X-Telegram-Id header")]
    Missing,
    #[error("Invalid {header} header: {reason}")]
    InvalidHeader { header: &'static str, reason: String },
    #[error("Telegram user is not registered or inactive")]
    Unregistered,
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Raw identity headers as received.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityHeaders<'a> {
    pub telegram_id: Option<&'a str>,
    pub actor_id: Option<&'a str>,
    pub actor_role: Option<&'a str>,
}

/// A Telegram id wins over the legacy headers; those are honoured only when
/// `allow_header_actor` is set.
pub async fn resolve_actor<C: ConnectionTrait>(
    conn: &C,
    headers: IdentityHeaders<'_>,
    allow_header_actor: bool,
) -> Result<Actor, IdentityError> {
    if let Some(raw) = headers.telegram_id {
        let telegram_id = parse_id(raw, TELEGRAM_ID_HEADER)?;
        return resolve_telegram_actor(conn, telegram_id).await;
    }
    if !allow_header_actor {
        return Err(IdentityError::Missing);
    }
    match (headers.actor_id, headers.actor_role) {
        (Some(id), Some(role)) if !role.trim().is_empty() => parse_header_actor(id, role),
        _ => Err(IdentityError::Missing),
    }
}

pub async fn resolve_telegram_actor<C: ConnectionTrait>(
    conn: &C,
    telegram_id: i64,
) -> Result<Actor, IdentityError> {
    let user = user::Entity::find()
        .filter(user::Column::TelegramId.eq(telegram_id))
        .one(conn)
        .await?;
    match user {
        Some(user) if user.is_active => Ok(Actor::new(user.id, user.role)),
        _ => Err(IdentityError::Unregistered),
    }
}

pub fn parse_header_actor(id: &str, role: &str) -> Result<Actor, IdentityError> {
    let id = parse_id(id, ACTOR_ID_HEADER)?;
    let role = role
        .parse::<Role>()
        .map_err(|err| IdentityError::InvalidHeader {
            header: ACTOR_ROLE_HEADER,
            reason: err.to_string(),
        })?;
    Ok(Actor::new(id, role))
}

fn parse_id(value: &str, header: &'static str) -> Result<i64, IdentityError> {
    let id = value
        .trim()
        .parse::<i64>()
        .map_err(|err| IdentityError::InvalidHeader {
            header,
            reason: err.to_string(),
        })?;
    if id <= 0 {
        return Err(IdentityError::InvalidHeader {
            header,
            reason: "must be positive".to_string(),
        });
    }
    Ok(id)
}

/// Changes a user's role in its own transaction.
pub async fn change_user_role(
    database: &DatabaseConnection,
    actor: Actor,
    user_id: i64,
    role: Role,
) -> WorkflowResult<user::Model> {
    authorize(Operation::ChangeUserRole, actor.role)?;
    let txn = database.begin().await?;
    let updated = change_role(&txn, actor, user_id, role, Utc::now().fixed_offset()).await?;
    txn.commit().await?;
    info!(
        user = user_id,
        actor = actor.id,
        role = %updated.role,
        "User role changed"
    );
    Ok(updated)
}

/// Updates the role and appends a `user_role_changed` audit row on `conn`.
pub async fn change_role<C: ConnectionTrait>(
    conn: &C,
    actor: Actor,
    user_id: i64,
    role: Role,
    now: DateTimeWithTimeZone,
) -> WorkflowResult<user::Model> {
    authorize(Operation::ChangeUserRole, actor.role)?;

    let mut select = user::Entity::find_by_id(user_id);
    if conn.get_database_backend() != DbBackend::Sqlite {
        select = select.lock_exclusive();
    }
    let current = select
        .one(conn)
        .await?
        .ok_or_else(|| WorkflowError::not_found("User", user_id))?;
    let previous = current.role;

    let mut active = current.into_active_model();
    active.role = ActiveValue::Set(role);
    active.updated_at = ActiveValue::Set(now);
    let updated = active.update(conn).await?;

    let entry = AuditEntry {
        actor_id: Some(actor.id),
        action: audit::USER_ROLE_CHANGED,
        entity_type: audit::USER_ENTITY,
        entity_id: user_id.to_string(),
        payload: json!({
            "old_role": previous.as_str(),
            "new_role": role.as_str(),
        }),
    };
    audit::record_action(conn, entry, now).await?;
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, ADMIN, REVIEWER};

    fn headers<'a>(
        telegram_id: Option<&'a str>,
        actor_id: Option<&'a str>,
        actor_role: Option<&'a str>,
    ) -> IdentityHeaders<'a> {
        IdentityHeaders {
            telegram_id,
            actor_id,
            actor_role,
        }
    }

    #[test]
    fn header_actor_accepts_aliases() {
        let actor = parse_header_actor("7", "head").unwrap();
        assert_eq!(actor, Actor::new(7, Role::Reviewer));
        let actor = parse_header_actor(" 1 ", "admin").unwrap();
        assert_eq!(actor.role, Role::Administrator);
    }

    #[test]
    fn header_actor_rejects_bad_values() {
        assert!(matches!(
            parse_header_actor("7", "owner"),
            Err(IdentityError::InvalidHeader {
                header: ACTOR_ROLE_HEADER,
                ..
            })
        ));
        assert!(matches!(
            parse_header_actor("seven", "analyst"),
            Err(IdentityError::InvalidHeader {
                header: ACTOR_ID_HEADER,
                ..
            })
        ));
        assert!(parse_header_actor("0", "analyst").is_err());
    }

    #[tokio::test]
    async fn telegram_id_resolves_registered_user() {
        let database = testing::memory_database().await;
        let user = testing::seed_user(&database, 424_242, Role::Reviewer, true).await;

        let actor = resolve_actor(&database, headers(Some("424242"), None, None), false)
            .await
            .unwrap();
        assert_eq!(actor, Actor::new(user.id, Role::Reviewer));
    }

    #[tokio::test]
    async fn telegram_id_beats_header_actor() {
        let database = testing::memory_database().await;
        let user = testing::seed_user(&database, 55, Role::Analyst, true).await;

        let actor = resolve_actor(
            &database,
            headers(Some("55"), Some("1"), Some("administrator")),
            true,
        )
        .await
        .unwrap();
        assert_eq!(actor.id, user.id);
        assert_eq!(actor.role, Role::Analyst);
    }

    #[tokio::test]
    async fn inactive_or_unknown_users_are_unregistered() {
        let database = testing::memory_database().await;
        testing::seed_user(&database, 99, Role::Submitter, false).await;

        for telegram_id in ["99", "100"] {
            let err = resolve_actor(&database, headers(Some(telegram_id), None, None), true)
                .await
                .unwrap_err();
            assert!(matches!(err, IdentityError::Unregistered), "{telegram_id}");
        }
    }

    #[tokio::test]
    async fn header_actor_needs_both_headers_and_permission() {
        let database = testing::memory_database().await;

        let actor = resolve_actor(&database, headers(None, Some("12"), Some("manager")), true)
            .await
            .unwrap();
        assert_eq!(actor, Actor::new(12, Role::Submitter));

        let err = resolve_actor(&database, headers(None, Some("12"), None), true)
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::Missing));

        let err = resolve_actor(&database, headers(None, Some("12"), Some("manager")), false)
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::Missing));
    }

    #[tokio::test]
    async fn role_change_is_audited() {
        let database = testing::memory_database().await;
        let user = testing::seed_user(&database, 8, Role::Submitter, true).await;

        let updated = change_user_role(&database, ADMIN, user.id, Role::Reviewer)
            .await
            .unwrap();
        assert_eq!(updated.role, Role::Reviewer);

        let trail = audit::trail(&database, audit::USER_ENTITY, &user.id.to_string(), 10)
            .await
            .unwrap();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].action, audit::USER_ROLE_CHANGED);
        assert_eq!(trail[0].payload_json["old_role"], "submitter");
        assert_eq!(trail[0].payload_json["new_role"], "reviewer");
    }

    #[tokio::test]
    async fn role_change_requires_administrator() {
        let database = testing::memory_database().await;
        let user = testing::seed_user(&database, 9, Role::Submitter, true).await;

        let err = change_user_role(&database, REVIEWER, user.id, Role::Administrator)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Forbidden { .. }));

        let err = change_user_role(&database, ADMIN, user.id + 1_000, Role::Analyst)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound { .. }));
    }
}

//! Fixtures shared by the database-backed tests.

use std::sync::Arc;

use chrono::Utc;
use migration::MigratorTrait;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ActiveValue, ConnectOptions, Database, DatabaseConnection};
use serde_json::json;
use uuid::Uuid;

use crate::aml::RiskLevel;
use crate::config::WorkflowConfig;
use crate::entities::{user, wallet_check};
use crate::workflow::input::InputPolicy;
use crate::workflow::{Actor, Role};

pub const SUBMITTER: Actor = Actor::new(101, Role::Submitter);
pub const REVIEWER: Actor = Actor::new(500, Role::Reviewer);
pub const ANALYST: Actor = Actor::new(700, Role::Analyst);
pub const ADMIN: Actor = Actor::new(1, Role::Administrator);

/// Fresh migrated in-memory database. One pooled connection keeps every
/// handle on the same SQLite memory instance.
pub async fn memory_database() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let database = Database::connect(options).await.unwrap();
    migration::Migrator::up(&database, None).await.unwrap();
    database
}

pub fn policy() -> Arc<InputPolicy> {
    Arc::new(InputPolicy::from_config(&WorkflowConfig::default()))
}

pub async fn seed_wallet_check(database: &DatabaseConnection) -> Uuid {
    let check = wallet_check::ActiveModel {
        id: ActiveValue::Set(Uuid::new_v4()),
        address: ActiveValue::Set("TVjsExampleAddress".to_string()),
        network: ActiveValue::Set("TRON".to_string()),
        provider: ActiveValue::Set("mock".to_string()),
        risk_score: ActiveValue::Set(Decimal::new(1250, 2)),
        risk_level: ActiveValue::Set(RiskLevel::Low),
        categories_json: ActiveValue::Set(json!([{"name": "General", "score": 12.5}])),
        raw_report_json: ActiveValue::Set(json!({"risk_score": 12.5})),
        checked_by: ActiveValue::Set(Some(SUBMITTER.id)),
        checked_at: ActiveValue::Set(Utc::now().fixed_offset()),
    }
    .insert(database)
    .await
    .unwrap();
    check.id
}

pub async fn seed_user(
    database: &DatabaseConnection,
    telegram_id: i64,
    role: Role,
    is_active: bool,
) -> user::Model {
    let now = Utc::now().fixed_offset();
    user::ActiveModel {
        id: ActiveValue::NotSet,
        telegram_id: ActiveValue::Set(telegram_id),
        full_name: ActiveValue::Set(format!("Operator {telegram_id}")),
        role: ActiveValue::Set(role),
        is_active: ActiveValue::Set(is_active),
        created_at: ActiveValue::Set(now),
        updated_at: ActiveValue::Set(now),
    }
    .insert(database)
    .await
    .unwrap()
}

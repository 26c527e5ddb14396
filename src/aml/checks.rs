use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use moka::future::Cache;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use sea_orm::prelude::*;
use sea_orm::{ActiveModelTrait, ActiveValue, DatabaseConnection, TransactionTrait};
use serde_json::json;
use tracing::{debug, info, warn};

use super::{AmlProvider, AmlReport};
use crate::entities::wallet_check;
use crate::error::{WorkflowError, WorkflowResult};
use crate::workflow::audit::{self, AuditEntry};
use crate::workflow::input::{self, InputPolicy};
use crate::workflow::{Actor, Operation, authorize};

/// Runs provider checks and stores their results.
#[derive(Clone)]
pub struct AmlCheckService {
    database: DatabaseConnection,
    provider: Arc<dyn AmlProvider>,
    cache: Cache<Uuid, Arc<wallet_check::Model>>,
    policy: Arc<InputPolicy>,
}

impl AmlCheckService {
    pub fn new(
        database: DatabaseConnection,
        provider: Arc<dyn AmlProvider>,
        cache: Cache<Uuid, Arc<wallet_check::Model>>,
        policy: Arc<InputPolicy>,
    ) -> Self {
        Self {
            database,
            provider,
            cache,
            policy,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub async fn run_check(
        &self,
        actor: Actor,
        address: &str,
        network: &str,
    ) -> WorkflowResult<Arc<wallet_check::Model>> {
        authorize(Operation::RunAmlCheck, actor.role)?;
        let address = input::sanitize_address(address)?;
        let network = self.policy.normalize_network(network)?;

        // The provider call stays outside the transaction.
        let started = Instant::now();
        let report = self
            .provider
            .check(&address, &network)
            .await
            .inspect_err(|err| warn!(provider = self.provider.name(), "AML check failed: {err}"))?;
        debug!(
            provider = self.provider.name(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "AML provider responded"
        );

        let row = build_row(self.provider.name(), actor, address, network, report)?;
        let txn = self.database.begin().await?;
        let stored = row.insert(&txn).await?;
        let entry = AuditEntry {
            actor_id: Some(actor.id),
            action: audit::AML_CHECK_PERFORMED,
            entity_type: audit::WALLET_CHECK_ENTITY,
            entity_id: stored.id.to_string(),
            payload: json!({
                "address": stored.address,
                "network": stored.network,
                "provider": stored.provider,
                "risk_score": stored.risk_score,
                "risk_level": stored.risk_level.as_str(),
            }),
        };
        audit::record_action(&txn, entry, stored.checked_at).await?;
        txn.commit().await?;

        info!(
            check = %stored.id,
            actor = actor.id,
            risk_level = %stored.risk_level,
            "AML check stored"
        );
        let stored = Arc::new(stored);
        self.cache.insert(stored.id, Arc::clone(&stored)).await;
        Ok(stored)
    }

    pub async fn get_check(
        &self,
        actor: Actor,
        check_id: Uuid,
    ) -> WorkflowResult<Arc<wallet_check::Model>> {
        authorize(Operation::ReadRequests, actor.role)?;
        if let Some(cached) = self.cache.get(&check_id).await {
            return Ok(cached);
        }

        let model = wallet_check::Entity::find_by_id(check_id)
            .one(&self.database)
            .await?
            .ok_or_else(|| WorkflowError::not_found("AML check", check_id))?;
        let model = Arc::new(model);
        self.cache.insert(check_id, Arc::clone(&model)).await;
        Ok(model)
    }
}

fn build_row(
    provider: &str,
    actor: Actor,
    address: String,
    network: String,
    report: AmlReport,
) -> WorkflowResult<wallet_check::ActiveModel> {
    let risk_score = Decimal::from_f64(report.risk_score)
        .map(|score| score.round_dp(2))
        .filter(|score| (Decimal::ZERO..=Decimal::ONE_HUNDRED).contains(score))
        .ok_or_else(|| {
            WorkflowError::Provider(super::AmlError::InvalidReport(format!(
                "risk_score {} is outside [0, 100]",
                report.risk_score
            )))
        })?;

    Ok(wallet_check::ActiveModel {
        id: ActiveValue::Set(Uuid::new_v4()),
        address: ActiveValue::Set(address),
        network: ActiveValue::Set(network),
        provider: ActiveValue::Set(provider.to_string()),
        risk_score: ActiveValue::Set(risk_score),
        risk_level: ActiveValue::Set(report.risk_level),
        categories_json: ActiveValue::Set(json!(report.categories)),
        raw_report_json: ActiveValue::Set(report.raw_report),
        checked_by: ActiveValue::Set(Some(actor.id)),
        checked_at: ActiveValue::Set(Utc::now().fixed_offset()),
    })
}

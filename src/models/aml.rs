use rust_decimal::prelude::ToPrimitive;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::aml::{RiskCategory, RiskLevel};
use crate::entities::wallet_check;

#[derive(Debug, Clone, Deserialize)]
pub struct AmlCheckPayload {
    pub address: String,
    pub network: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AmlCheckView {
    pub check_id: Uuid,
    pub address: String,
    pub network: String,
    pub provider: String,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub categories: Vec<RiskCategory>,
    pub raw_report: Value,
    pub checked_by: Option<i64>,
    pub checked_at: DateTimeWithTimeZone,
}

impl From<&wallet_check::Model> for AmlCheckView {
    fn from(model: &wallet_check::Model) -> Self {
        // Stored categories are written by this service; anything unreadable is dropped.
        let categories = serde_json::from_value(model.categories_json.clone()).unwrap_or_default();
        Self {
            check_id: model.id,
            address: model.address.clone(),
            network: model.network.clone(),
            provider: model.provider.clone(),
            risk_score: model.risk_score.to_f64().unwrap_or_default(),
            risk_level: model.risk_level,
            categories,
            raw_report: model.raw_report_json.clone(),
            checked_by: model.checked_by,
            checked_at: model.checked_at,
        }
    }
}

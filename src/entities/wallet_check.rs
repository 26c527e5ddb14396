//! AML risk assessment of one address. Rows are never updated.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::aml::RiskLevel;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "wallet_checks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(column_type = "Text")]
    pub address: String,
    #[sea_orm(column_type = "String(StringLen::N(32))")]
    pub network: String,
    /// Name of the provider that produced the score
    #[sea_orm(column_type = "String(StringLen::N(64))")]
    pub provider: String,
    /// Score in [0, 100] with two fractional digits
    #[sea_orm(column_type = "Decimal(Some((5, 2)))")]
    pub risk_score: Decimal,
    pub risk_level: RiskLevel,
    /// `[{"name": .., "score": ..}]`
    pub categories_json: Json,
    /// Provider response as received
    pub raw_report_json: Json,
    pub checked_by: Option<i64>,
    pub checked_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

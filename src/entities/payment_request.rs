//! Payment request entity. Status changes go through `workflow::lifecycle` only.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::workflow::RequestStatus;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payment_requests")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Human readable number, e.g. `PAY-202602-3FA9C1`
    #[sea_orm(unique, column_type = "String(StringLen::N(32))")]
    pub request_no: String,
    pub creator_id: i64,
    #[sea_orm(column_type = "Text")]
    pub address: String,
    #[sea_orm(column_type = "String(StringLen::N(32))")]
    pub network: String,
    #[sea_orm(column_type = "String(StringLen::N(32))")]
    pub asset: String,
    #[sea_orm(column_type = "Decimal(Some((36, 18)))")]
    pub amount: Decimal,
    #[sea_orm(column_type = "Text", nullable)]
    pub comment: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub attachment_url: Option<String>,
    pub aml_check_id: Uuid,
    pub status: RequestStatus,
    pub approved_by: Option<i64>,
    pub approved_at: Option<DateTimeWithTimeZone>,
    #[sea_orm(column_type = "Text", nullable)]
    pub rejection_reason: Option<String>,
    /// Set exactly when the request is paid
    #[sea_orm(unique, column_type = "String(StringLen::N(128))", nullable)]
    pub tx_hash: Option<String>,
    pub paid_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

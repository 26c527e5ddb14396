use rust_decimal::Decimal;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{payment_request, status_history};
use crate::workflow::{NewPaymentRequest, RequestStatus};

pub const DEFAULT_PAGE_SIZE: u64 = 50;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRequestPayload {
    pub address: String,
    pub network: String,
    pub asset: String,
    /// Accepts a JSON string or number; strings keep full precision.
    pub amount: Decimal,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub attachment_url: Option<String>,
    pub aml_check_id: Uuid,
}

impl From<CreateRequestPayload> for NewPaymentRequest {
    fn from(payload: CreateRequestPayload) -> Self {
        NewPaymentRequest {
            address: payload.address,
            network: payload.network,
            asset: payload.asset,
            amount: payload.amount,
            comment: payload.comment,
            attachment_url: payload.attachment_url,
            aml_check_id: payload.aml_check_id,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DecisionPayload {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarkPaidPayload {
    pub tx_hash: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListRequestsQuery {
    pub status: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestView {
    pub id: Uuid,
    pub request_no: String,
    pub creator_id: i64,
    pub address: String,
    pub network: String,
    pub asset: String,
    pub amount: Decimal,
    pub comment: Option<String>,
    pub attachment_url: Option<String>,
    pub aml_check_id: Uuid,
    pub status: RequestStatus,
    pub approved_by: Option<i64>,
    pub approved_at: Option<DateTimeWithTimeZone>,
    pub rejection_reason: Option<String>,
    pub tx_hash: Option<String>,
    pub paid_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl From<payment_request::Model> for RequestView {
    fn from(model: payment_request::Model) -> Self {
        Self {
            id: model.id,
            request_no: model.request_no,
            creator_id: model.creator_id,
            address: model.address,
            network: model.network,
            asset: model.asset,
            amount: model.amount,
            comment: model.comment,
            attachment_url: model.attachment_url,
            aml_check_id: model.aml_check_id,
            status: model.status,
            approved_by: model.approved_by,
            approved_at: model.approved_at,
            rejection_reason: model.rejection_reason,
            tx_hash: model.tx_hash,
            paid_at: model.paid_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryItemView {
    pub id: i64,
    pub request_id: Uuid,
    pub old_status: Option<RequestStatus>,
    pub new_status: RequestStatus,
    pub actor_id: Option<i64>,
    pub reason: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

impl From<status_history::Model> for HistoryItemView {
    fn from(model: status_history::Model) -> Self {
        Self {
            id: model.id,
            request_id: model.request_id,
            old_status: model.old_status,
            new_status: model.new_status,
            actor_id: model.actor_id,
            reason: model.reason,
            created_at: model.created_at,
        }
    }
}

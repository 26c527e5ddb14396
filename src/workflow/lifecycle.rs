//! Payment request lifecycle.
//!
//! Every status change runs the same sequence inside one database transaction:
//! authorize the actor, load the request under a row lock, consult the
//! transition table, apply the transition-specific fields, persist with a guard
//! on the observed status and append the history and audit rows. Dropping the
//! transaction on any error rolls all of it back.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::prelude::*;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ConnectionTrait, DatabaseConnection, DbBackend,
    IntoActiveModel, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use tracing::{info, warn};

use crate::entities::{payment_request, status_history, wallet_check};
use crate::error::{WorkflowError, WorkflowResult};
use crate::workflow::audit::{self, StatusChange};
use crate::workflow::input::{self, InputPolicy};
use crate::workflow::{Actor, Operation, RequestStatus, authorize, ensure_transition};

pub const MAX_LIST_LIMIT: u64 = 200;
/// Offsets are bound as signed 64-bit integers.
pub const MAX_LIST_OFFSET: u64 = i64::MAX as u64;

const CREATED_REASON: &str = "created";
const SUBMITTED_REASON: &str = "submitted";
const PAID_REASON: &str = "marked paid";

#[derive(Debug, Clone)]
pub struct NewPaymentRequest {
    pub address: String,
    pub network: String,
    pub asset: String,
    pub amount: Decimal,
    pub comment: Option<String>,
    pub attachment_url: Option<String>,
    pub aml_check_id: Uuid,
}

/// A requested status change together with the data it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Submit,
    Approve { reason: Option<String> },
    Reject { reason: String },
    MarkPaid { tx_hash: String },
}

impl Transition {
    pub const fn operation(&self) -> Operation {
        match self {
            Transition::Submit => Operation::Submit,
            Transition::Approve { .. } => Operation::Approve,
            Transition::Reject { .. } => Operation::Reject,
            Transition::MarkPaid { .. } => Operation::MarkPaid,
        }
    }

    pub const fn target(&self) -> RequestStatus {
        match self {
            Transition::Submit => RequestStatus::Pending,
            Transition::Approve { .. } => RequestStatus::Approved,
            Transition::Reject { .. } => RequestStatus::Rejected,
            Transition::MarkPaid { .. } => RequestStatus::Paid,
        }
    }
}

/// Entry point for every payment request operation.
#[derive(Clone)]
pub struct RequestLifecycle {
    database: DatabaseConnection,
    policy: Arc<InputPolicy>,
}

impl RequestLifecycle {
    pub fn new(database: DatabaseConnection, policy: Arc<InputPolicy>) -> Self {
        Self { database, policy }
    }

    pub async fn create(
        &self,
        actor: Actor,
        input: NewPaymentRequest,
    ) -> WorkflowResult<payment_request::Model> {
        authorize(Operation::CreateRequest, actor.role)?;
        let input = self.policy.validate_new_request(input)?;
        let request_no = build_request_no(self.policy.request_no_prefix(), Utc::now());

        let txn = self.database.begin().await?;
        let created = create_request(&txn, actor, input, request_no, Utc::now().fixed_offset())
            .await
            .inspect_err(|err| warn!(actor = actor.id, "Request creation rejected: {err}"))?;
        txn.commit().await?;

        info!(
            request_no = %created.request_no,
            actor = actor.id,
            amount = %created.amount,
            "Payment request created"
        );
        Ok(created)
    }

    pub async fn submit(&self, actor: Actor, request_id: Uuid) -> WorkflowResult<payment_request::Model> {
        self.transition(actor, request_id, Transition::Submit).await
    }

    pub async fn approve(
        &self,
        actor: Actor,
        request_id: Uuid,
        reason: Option<String>,
    ) -> WorkflowResult<payment_request::Model> {
        self.transition(actor, request_id, Transition::Approve { reason })
            .await
    }

    pub async fn reject(
        &self,
        actor: Actor,
        request_id: Uuid,
        reason: String,
    ) -> WorkflowResult<payment_request::Model> {
        self.transition(actor, request_id, Transition::Reject { reason })
            .await
    }

    pub async fn mark_paid(
        &self,
        actor: Actor,
        request_id: Uuid,
        tx_hash: String,
    ) -> WorkflowResult<payment_request::Model> {
        self.transition(actor, request_id, Transition::MarkPaid { tx_hash })
            .await
    }

    pub async fn transition(
        &self,
        actor: Actor,
        request_id: Uuid,
        transition: Transition,
    ) -> WorkflowResult<payment_request::Model> {
        let txn = self.database.begin().await?;
        let now = Utc::now().fixed_offset();
        let updated = match apply_transition(&txn, actor, request_id, &transition, now).await {
            Ok(updated) => updated,
            Err(err) => {
                warn!(
                    request = %request_id,
                    actor = actor.id,
                    role = %actor.role,
                    operation = %transition.operation(),
                    "Transition rejected: {err}"
                );
                return Err(err);
            }
        };
        txn.commit().await?;

        info!(
            request_no = %updated.request_no,
            actor = actor.id,
            operation = %transition.operation(),
            status = %updated.status,
            "Payment request transition committed"
        );
        Ok(updated)
    }

    pub async fn get(&self, actor: Actor, request_id: Uuid) -> WorkflowResult<payment_request::Model> {
        authorize(Operation::ReadRequests, actor.role)?;
        load(&self.database, request_id).await
    }

    /// Newest first.
    pub async fn list(
        &self,
        actor: Actor,
        status: Option<RequestStatus>,
        limit: u64,
        offset: u64,
    ) -> WorkflowResult<Vec<payment_request::Model>> {
        authorize(Operation::ReadRequests, actor.role)?;
        if offset > MAX_LIST_OFFSET {
            return Err(WorkflowError::Validation(format!(
                "Offset must not exceed {MAX_LIST_OFFSET}"
            )));
        }
        let mut select = payment_request::Entity::find();
        if let Some(status) = status {
            select = select.filter(payment_request::Column::Status.eq(status));
        }
        let rows = select
            .order_by_desc(payment_request::Column::CreatedAt)
            .order_by_desc(payment_request::Column::RequestNo)
            .limit(limit.clamp(1, MAX_LIST_LIMIT))
            .offset(offset)
            .all(&self.database)
            .await?;
        Ok(rows)
    }

    /// Oldest first.
    pub async fn history(
        &self,
        actor: Actor,
        request_id: Uuid,
    ) -> WorkflowResult<Vec<status_history::Model>> {
        authorize(Operation::ReadRequests, actor.role)?;
        load(&self.database, request_id).await?;
        audit::history(&self.database, request_id).await
    }
}

/// Inserts a draft request and its creation history row on `conn`.
pub async fn create_request<C: ConnectionTrait>(
    conn: &C,
    actor: Actor,
    input: NewPaymentRequest,
    request_no: String,
    now: DateTimeWithTimeZone,
) -> WorkflowResult<payment_request::Model> {
    authorize(Operation::CreateRequest, actor.role)?;

    wallet_check::Entity::find_by_id(input.aml_check_id)
        .one(conn)
        .await?
        .ok_or_else(|| WorkflowError::not_found("AML check", input.aml_check_id))?;

    let request = payment_request::ActiveModel {
        id: ActiveValue::Set(Uuid::new_v4()),
        request_no: ActiveValue::Set(request_no),
        creator_id: ActiveValue::Set(actor.id),
        address: ActiveValue::Set(input.address),
        network: ActiveValue::Set(input.network),
        asset: ActiveValue::Set(input.asset),
        amount: ActiveValue::Set(input.amount),
        comment: ActiveValue::Set(input.comment),
        attachment_url: ActiveValue::Set(input.attachment_url),
        aml_check_id: ActiveValue::Set(input.aml_check_id),
        status: ActiveValue::Set(RequestStatus::Draft),
        approved_by: ActiveValue::Set(None),
        approved_at: ActiveValue::Set(None),
        rejection_reason: ActiveValue::Set(None),
        tx_hash: ActiveValue::Set(None),
        paid_at: ActiveValue::Set(None),
        created_at: ActiveValue::Set(now),
        updated_at: ActiveValue::Set(now),
    }
    .insert(conn)
    .await?;

    let change = StatusChange {
        request_id: request.id,
        old_status: None,
        new_status: RequestStatus::Draft,
        actor_id: actor.id,
        reason: Some(CREATED_REASON),
    };
    audit::record_status_change(conn, &change, now).await?;
    Ok(request)
}

/// Runs one transition on `conn`. The caller owns commit and rollback.
pub async fn apply_transition<C: ConnectionTrait>(
    conn: &C,
    actor: Actor,
    request_id: Uuid,
    transition: &Transition,
    now: DateTimeWithTimeZone,
) -> WorkflowResult<payment_request::Model> {
    authorize(transition.operation(), actor.role)?;
    let current = load_for_update(conn, request_id).await?;
    write_transition(conn, actor, current, transition, now).await
}

/// Persists `transition` over `current`, guarded on the status read with it.
async fn write_transition<C: ConnectionTrait>(
    conn: &C,
    actor: Actor,
    current: payment_request::Model,
    transition: &Transition,
    now: DateTimeWithTimeZone,
) -> WorkflowResult<payment_request::Model> {
    let request_id = current.id;
    let observed = current.status;
    let target = transition.target();
    ensure_transition(observed, target)?;

    let mut request = current.into_active_model();
    request.status = ActiveValue::Set(target);
    request.updated_at = ActiveValue::Set(now);

    let reason = match transition {
        Transition::Submit => Some(SUBMITTED_REASON.to_string()),
        Transition::Approve { reason } => {
            request.approved_by = ActiveValue::Set(Some(actor.id));
            request.approved_at = ActiveValue::Set(Some(now));
            input::sanitize_optional_text(reason.clone(), "Reason", input::MAX_REASON_LEN)?
        }
        Transition::Reject { reason } => {
            let reason = input::sanitize_reason(reason)?;
            request.rejection_reason = ActiveValue::Set(Some(reason.clone()));
            Some(reason)
        }
        Transition::MarkPaid { tx_hash } => {
            let tx_hash = input::sanitize_tx_hash(tx_hash)?;
            ensure_tx_hash_unused(conn, &tx_hash).await?;
            request.tx_hash = ActiveValue::Set(Some(tx_hash));
            request.paid_at = ActiveValue::Set(Some(now));
            Some(PAID_REASON.to_string())
        }
    };

    // A concurrent writer that committed first leaves zero matching rows,
    // which surfaces as a conflict.
    let updated = payment_request::Entity::update(request)
        .filter(payment_request::Column::Status.eq(observed))
        .exec(conn)
        .await?;

    let change = StatusChange {
        request_id,
        old_status: Some(observed),
        new_status: target,
        actor_id: actor.id,
        reason: reason.as_deref(),
    };
    audit::record_status_change(conn, &change, now).await?;
    Ok(updated)
}

/// `PAY-YYYYMM-XXXXXX`. Uniqueness is enforced by the `request_no` constraint.
pub fn build_request_no(prefix: &str, now: DateTime<Utc>) -> String {
    let suffix: [u8; 3] = rand::random();
    format!(
        "{prefix}-{}-{}",
        now.format("%Y%m"),
        hex::encode_upper(suffix)
    )
}

async fn load<C: ConnectionTrait>(conn: &C, request_id: Uuid) -> WorkflowResult<payment_request::Model> {
    payment_request::Entity::find_by_id(request_id)
        .one(conn)
        .await?
        .ok_or_else(|| WorkflowError::not_found("Payment request", request_id))
}

async fn load_for_update<C: ConnectionTrait>(
    conn: &C,
    request_id: Uuid,
) -> WorkflowResult<payment_request::Model> {
    let mut select = payment_request::Entity::find_by_id(request_id);
    // SQLite has no row locks; its single writer plus the status guard serialize updates.
    if conn.get_database_backend() != DbBackend::Sqlite {
        select = select.lock_exclusive();
    }
    select
        .one(conn)
        .await?
        .ok_or_else(|| WorkflowError::not_found("Payment request", request_id))
}

async fn ensure_tx_hash_unused<C: ConnectionTrait>(conn: &C, tx_hash: &str) -> WorkflowResult<()> {
    let existing = payment_request::Entity::find()
        .filter(payment_request::Column::TxHash.eq(tx_hash))
        .one(conn)
        .await?;
    match existing {
        Some(other) => Err(WorkflowError::Conflict(format!(
            "Transaction hash {tx_hash} is already recorded on {}",
            other.request_no
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::audit_log;
    use crate::testing::{self, ADMIN, ANALYST, REVIEWER, SUBMITTER};
    use std::str::FromStr;

    fn new_request(aml_check_id: Uuid) -> NewPaymentRequest {
        NewPaymentRequest {
            address: "TVjsExampleAddress".to_string(),
            network: "TRON".to_string(),
            asset: "USDT".to_string(),
            amount: Decimal::from_str("125.5").unwrap(),
            comment: Some("invoice 42".to_string()),
            attachment_url: None,
            aml_check_id,
        }
    }

    async fn setup() -> (RequestLifecycle, Uuid) {
        let database = testing::memory_database().await;
        let check_id = testing::seed_wallet_check(&database).await;
        let lifecycle = RequestLifecycle::new(database, testing::policy());
        (lifecycle, check_id)
    }

    async fn audit_rows(lifecycle: &RequestLifecycle, request_id: Uuid) -> Vec<audit_log::Model> {
        audit::trail(
            &lifecycle.database,
            audit::PAYMENT_REQUEST_ENTITY,
            &request_id.to_string(),
            audit::MAX_TRAIL_LIMIT,
        )
        .await
        .unwrap()
    }

    #[test]
    fn request_numbers_are_period_scoped() {
        let now = DateTime::parse_from_rfc3339("2026-02-20T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let number = build_request_no("PAY", now);
        assert!(number.starts_with("PAY-202602-"), "{number}");
        let suffix = number.rsplit('-').next().unwrap();
        assert_eq!(suffix.len(), 6);
        assert!(suffix.chars().all(|ch| ch.is_ascii_hexdigit() && !ch.is_ascii_lowercase()));
    }

    #[test]
    fn transitions_map_to_operations_and_targets() {
        let cases = [
            (Transition::Submit, Operation::Submit),
            (Transition::Approve { reason: None }, Operation::Approve),
            (
                Transition::Reject {
                    reason: "no".to_string(),
                },
                Operation::Reject,
            ),
            (
                Transition::MarkPaid {
                    tx_hash: "abc".to_string(),
                },
                Operation::MarkPaid,
            ),
        ];
        for (transition, operation) in cases {
            assert_eq!(transition.operation(), operation);
            assert_eq!(Some(transition.target()), operation.target_status());
        }
    }

    #[tokio::test]
    async fn create_starts_in_draft_with_one_history_row() {
        let (lifecycle, check_id) = setup().await;
        let created = lifecycle.create(SUBMITTER, new_request(check_id)).await.unwrap();

        assert_eq!(created.status, RequestStatus::Draft);
        assert_eq!(created.creator_id, SUBMITTER.id);
        assert_eq!(created.tx_hash, None);
        assert!(created.request_no.starts_with("PAY-"));

        let history = lifecycle.history(ANALYST, created.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].old_status, None);
        assert_eq!(history[0].new_status, RequestStatus::Draft);
        assert_eq!(history[0].reason.as_deref(), Some("created"));
    }

    #[tokio::test]
    async fn create_requires_existing_aml_check() {
        let (lifecycle, _) = setup().await;
        let err = lifecycle
            .create(SUBMITTER, new_request(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound { entity: "AML check", .. }));
    }

    #[tokio::test]
    async fn create_is_forbidden_for_reviewers() {
        let (lifecycle, check_id) = setup().await;
        let err = lifecycle.create(REVIEWER, new_request(check_id)).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Forbidden { .. }));
    }

    #[tokio::test]
    async fn create_rejects_non_positive_amount() {
        let (lifecycle, check_id) = setup().await;
        let mut input = new_request(check_id);
        input.amount = Decimal::ZERO;
        let err = lifecycle.create(SUBMITTER, input).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
    }

    #[tokio::test]
    async fn submit_twice_is_an_invalid_transition() {
        let (lifecycle, check_id) = setup().await;
        let created = lifecycle.create(SUBMITTER, new_request(check_id)).await.unwrap();

        let submitted = lifecycle.submit(SUBMITTER, created.id).await.unwrap();
        assert_eq!(submitted.status, RequestStatus::Pending);

        let err = lifecycle.submit(SUBMITTER, created.id).await.unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::InvalidTransition {
                from: RequestStatus::Pending,
                to: RequestStatus::Pending
            }
        ));
    }

    #[tokio::test]
    async fn forbidden_approval_leaves_no_trace() {
        let (lifecycle, check_id) = setup().await;
        let created = lifecycle.create(SUBMITTER, new_request(check_id)).await.unwrap();
        lifecycle.submit(SUBMITTER, created.id).await.unwrap();

        let err = lifecycle.approve(ANALYST, created.id, None).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Forbidden { .. }));

        let current = lifecycle.get(ANALYST, created.id).await.unwrap();
        assert_eq!(current.status, RequestStatus::Pending);
        assert_eq!(current.approved_by, None);
        assert_eq!(lifecycle.history(ANALYST, created.id).await.unwrap().len(), 2);
        assert_eq!(audit_rows(&lifecycle, created.id).await.len(), 2);
    }

    #[tokio::test]
    async fn forbidden_takes_precedence_over_invalid_transition() {
        let (lifecycle, check_id) = setup().await;
        let created = lifecycle.create(SUBMITTER, new_request(check_id)).await.unwrap();
        // draft -> paid is illegal and submitters may not mark paid
        let err = lifecycle
            .mark_paid(SUBMITTER, created.id, "abc".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Forbidden { .. }));
    }

    #[tokio::test]
    async fn approving_a_draft_is_invalid() {
        let (lifecycle, check_id) = setup().await;
        let created = lifecycle.create(SUBMITTER, new_request(check_id)).await.unwrap();
        let err = lifecycle.approve(REVIEWER, created.id, None).await.unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::InvalidTransition {
                from: RequestStatus::Draft,
                to: RequestStatus::Approved
            }
        ));
    }

    #[tokio::test]
    async fn unknown_request_is_not_found() {
        let (lifecycle, _) = setup().await;
        let err = lifecycle.submit(SUBMITTER, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound { .. }));
        let err = lifecycle.history(ANALYST, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound { .. }));
    }

    #[tokio::test]
    async fn duplicate_tx_hash_is_a_conflict() {
        let (lifecycle, check_id) = setup().await;
        let mut ids = Vec::new();
        for _ in 0..2 {
            let created = lifecycle.create(SUBMITTER, new_request(check_id)).await.unwrap();
            lifecycle.submit(SUBMITTER, created.id).await.unwrap();
            lifecycle.approve(REVIEWER, created.id, None).await.unwrap();
            ids.push(created.id);
        }

        lifecycle
            .mark_paid(REVIEWER, ids[0], "deadbeef01".to_string())
            .await
            .unwrap();
        let err = lifecycle
            .mark_paid(REVIEWER, ids[1], "deadbeef01".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Conflict(_)));

        let second = lifecycle.get(REVIEWER, ids[1]).await.unwrap();
        assert_eq!(second.status, RequestStatus::Approved);
        assert_eq!(second.tx_hash, None);
    }

    #[tokio::test]
    async fn happy_path_records_four_transitions_in_order() {
        let (lifecycle, check_id) = setup().await;
        let created = lifecycle.create(SUBMITTER, new_request(check_id)).await.unwrap();
        lifecycle.submit(SUBMITTER, created.id).await.unwrap();
        let approved = lifecycle
            .approve(REVIEWER, created.id, Some("looks fine".to_string()))
            .await
            .unwrap();
        assert_eq!(approved.approved_by, Some(REVIEWER.id));
        assert!(approved.approved_at.is_some());

        let paid = lifecycle
            .mark_paid(ADMIN, created.id, " 7c1f00aa ".to_string())
            .await
            .unwrap();
        assert_eq!(paid.status, RequestStatus::Paid);
        assert_eq!(paid.tx_hash.as_deref(), Some("7c1f00aa"));
        assert!(paid.paid_at.is_some());

        let history = lifecycle.history(ANALYST, created.id).await.unwrap();
        let steps: Vec<_> = history
            .iter()
            .map(|row| (row.old_status, row.new_status))
            .collect();
        assert_eq!(
            steps,
            vec![
                (None, RequestStatus::Draft),
                (Some(RequestStatus::Draft), RequestStatus::Pending),
                (Some(RequestStatus::Pending), RequestStatus::Approved),
                (Some(RequestStatus::Approved), RequestStatus::Paid),
            ]
        );
        assert_eq!(history[2].reason.as_deref(), Some("looks fine"));
        assert_eq!(history[3].actor_id, Some(ADMIN.id));

        // Reads are repeatable.
        assert_eq!(lifecycle.history(ANALYST, created.id).await.unwrap(), history);

        let audit = audit_rows(&lifecycle, created.id).await;
        assert_eq!(audit.len(), 4);
        for (row, entry) in audit.iter().zip(&history) {
            assert_eq!(row.action, audit::REQUEST_STATUS_CHANGED);
            assert_eq!(
                row.payload_json["new_status"],
                serde_json::json!(entry.new_status.as_str())
            );
            assert_eq!(
                row.payload_json["old_status"],
                serde_json::json!(entry.old_status.map(RequestStatus::as_str))
            );
        }
    }

    #[tokio::test]
    async fn paid_requests_are_final() {
        let (lifecycle, check_id) = setup().await;
        let created = lifecycle.create(SUBMITTER, new_request(check_id)).await.unwrap();
        lifecycle.submit(SUBMITTER, created.id).await.unwrap();
        lifecycle.approve(REVIEWER, created.id, None).await.unwrap();
        lifecycle
            .mark_paid(REVIEWER, created.id, "ff00".to_string())
            .await
            .unwrap();

        let err = lifecycle
            .reject(REVIEWER, created.id, "too late".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn submitter_can_reject_own_draft() {
        let (lifecycle, check_id) = setup().await;
        let created = lifecycle.create(SUBMITTER, new_request(check_id)).await.unwrap();
        let rejected = lifecycle
            .reject(SUBMITTER, created.id, "wrong address".to_string())
            .await
            .unwrap();
        assert_eq!(rejected.status, RequestStatus::Rejected);
        assert_eq!(rejected.rejection_reason.as_deref(), Some("wrong address"));

        let err = lifecycle.submit(SUBMITTER, created.id).await.unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn reject_requires_a_reason() {
        let (lifecycle, check_id) = setup().await;
        let created = lifecycle.create(SUBMITTER, new_request(check_id)).await.unwrap();
        let err = lifecycle
            .reject(REVIEWER, created.id, "   ".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
        let current = lifecycle.get(REVIEWER, created.id).await.unwrap();
        assert_eq!(current.status, RequestStatus::Draft);
    }

    #[tokio::test]
    async fn concurrent_approvals_have_one_winner() {
        let (lifecycle, check_id) = setup().await;
        let created = lifecycle.create(SUBMITTER, new_request(check_id)).await.unwrap();
        lifecycle.submit(SUBMITTER, created.id).await.unwrap();

        let (first, second) = tokio::join!(
            lifecycle.approve(REVIEWER, created.id, None),
            lifecycle.approve(ADMIN, created.id, None),
        );
        let outcomes = [first, second];
        assert_eq!(outcomes.iter().filter(|outcome| outcome.is_ok()).count(), 1);
        assert!(outcomes.iter().any(|outcome| matches!(
            outcome,
            Err(WorkflowError::InvalidTransition { .. } | WorkflowError::Conflict(_))
        )));
        assert_eq!(lifecycle.history(ANALYST, created.id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn stale_status_loses_to_committed_writer() {
        let (lifecycle, check_id) = setup().await;
        let created = lifecycle.create(SUBMITTER, new_request(check_id)).await.unwrap();
        lifecycle.submit(SUBMITTER, created.id).await.unwrap();
        let stale = lifecycle.get(ADMIN, created.id).await.unwrap();
        assert_eq!(stale.status, RequestStatus::Pending);

        lifecycle.approve(REVIEWER, created.id, None).await.unwrap();

        let txn = lifecycle.database.begin().await.unwrap();
        let err = write_transition(
            &txn,
            ADMIN,
            stale,
            &Transition::Approve { reason: None },
            Utc::now().fixed_offset(),
        )
        .await
        .unwrap_err();
        txn.rollback().await.unwrap();
        assert!(matches!(err, WorkflowError::Conflict(_)), "{err:?}");

        let current = lifecycle.get(ANALYST, created.id).await.unwrap();
        assert_eq!(current.status, RequestStatus::Approved);
        assert_eq!(current.approved_by, Some(REVIEWER.id));
        assert_eq!(lifecycle.history(ANALYST, created.id).await.unwrap().len(), 3);
        assert_eq!(audit_rows(&lifecycle, created.id).await.len(), 3);
    }

    #[tokio::test]
    async fn duplicate_request_number_is_a_conflict() {
        let (lifecycle, check_id) = setup().await;
        let now = Utc::now().fixed_offset();
        let first = create_request(
            &lifecycle.database,
            SUBMITTER,
            new_request(check_id),
            "PAY-202610-AAAAAA".to_string(),
            now,
        )
        .await
        .unwrap();

        let err = create_request(
            &lifecycle.database,
            SUBMITTER,
            new_request(check_id),
            "PAY-202610-AAAAAA".to_string(),
            now,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, WorkflowError::Conflict(_)), "{err:?}");

        let requests = lifecycle.list(ANALYST, None, 50, 0).await.unwrap();
        assert_eq!(requests.len(), 1);
        let history = status_history::Entity::find()
            .all(&lifecycle.database)
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].request_id, first.id);
    }

    #[tokio::test]
    async fn oversized_list_offset_is_rejected() {
        let (lifecycle, check_id) = setup().await;
        lifecycle.create(SUBMITTER, new_request(check_id)).await.unwrap();

        let err = lifecycle
            .list(ANALYST, None, 50, u64::MAX)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));

        let far = lifecycle
            .list(ANALYST, None, u64::MAX, MAX_LIST_OFFSET)
            .await
            .unwrap();
        assert!(far.is_empty());
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let (lifecycle, check_id) = setup().await;
        let first = lifecycle.create(SUBMITTER, new_request(check_id)).await.unwrap();
        lifecycle.create(SUBMITTER, new_request(check_id)).await.unwrap();
        lifecycle.submit(SUBMITTER, first.id).await.unwrap();

        let all = lifecycle.list(ANALYST, None, 50, 0).await.unwrap();
        assert_eq!(all.len(), 2);
        let pending = lifecycle
            .list(ANALYST, Some(RequestStatus::Pending), 50, 0)
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, first.id);
    }
}

use std::fmt;
use std::str::FromStr;

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{WorkflowError, WorkflowResult};
use crate::workflow::RequestStatus;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[sea_orm(string_value = "submitter")]
    #[serde(alias = "manager")]
    Submitter,
    #[sea_orm(string_value = "reviewer")]
    #[serde(alias = "head")]
    Reviewer,
    #[sea_orm(string_value = "analyst")]
    Analyst,
    #[sea_orm(string_value = "administrator")]
    #[serde(alias = "admin")]
    Administrator,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Submitter => "submitter",
            Role::Reviewer => "reviewer",
            Role::Analyst => "analyst",
            Role::Administrator => "administrator",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = WorkflowError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "submitter" | "manager" => Ok(Role::Submitter),
            "reviewer" | "head" => Ok(Role::Reviewer),
            "analyst" => Ok(Role::Analyst),
            "administrator" | "admin" => Ok(Role::Administrator),
            other => Err(WorkflowError::Validation(format!("Unknown role: {other}"))),
        }
    }
}

/// Every action that is gated by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    CreateRequest,
    Submit,
    Approve,
    Reject,
    MarkPaid,
    ReadRequests,
    RunAmlCheck,
    ReadAuditLog,
    ChangeUserRole,
}

impl Operation {
    /// Role table. Each arm matches roles exhaustively so a new role cannot
    /// slip through without a decision here.
    pub const fn permits(self, role: Role) -> bool {
        use Role::*;
        match self {
            Operation::CreateRequest | Operation::Submit => match role {
                Submitter | Administrator => true,
                Reviewer | Analyst => false,
            },
            Operation::Approve | Operation::MarkPaid => match role {
                Reviewer | Administrator => true,
                Submitter | Analyst => false,
            },
            // Submitters may withdraw their own requests.
            Operation::Reject => match role {
                Reviewer | Administrator | Submitter => true,
                Analyst => false,
            },
            Operation::ReadRequests | Operation::RunAmlCheck => match role {
                Submitter | Reviewer | Analyst | Administrator => true,
            },
            Operation::ReadAuditLog => match role {
                Analyst | Administrator => true,
                Submitter | Reviewer => false,
            },
            Operation::ChangeUserRole => match role {
                Administrator => true,
                Submitter | Reviewer | Analyst => false,
            },
        }
    }

    /// Status a lifecycle operation moves a request into.
    pub const fn target_status(self) -> Option<RequestStatus> {
        match self {
            Operation::CreateRequest => Some(RequestStatus::Draft),
            Operation::Submit => Some(RequestStatus::Pending),
            Operation::Approve => Some(RequestStatus::Approved),
            Operation::Reject => Some(RequestStatus::Rejected),
            Operation::MarkPaid => Some(RequestStatus::Paid),
            Operation::ReadRequests
            | Operation::RunAmlCheck
            | Operation::ReadAuditLog
            | Operation::ChangeUserRole => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Operation::CreateRequest => "create request",
            Operation::Submit => "submit request",
            Operation::Approve => "approve request",
            Operation::Reject => "reject request",
            Operation::MarkPaid => "mark request paid",
            Operation::ReadRequests => "read requests",
            Operation::RunAmlCheck => "run AML check",
            Operation::ReadAuditLog => "read audit log",
            Operation::ChangeUserRole => "change user role",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fails with `Forbidden` unless `role` may perform `operation`.
pub fn authorize(operation: Operation, role: Role) -> WorkflowResult<()> {
    if operation.permits(role) {
        Ok(())
    } else {
        Err(WorkflowError::Forbidden { role, operation })
    }
}

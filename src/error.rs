use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

use crate::aml::AmlError;
use crate::workflow::{Operation, RequestStatus, Role};

pub type WorkflowResult<T> = Result<T, WorkflowError>;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("Role {role} is not permitted to {operation}")]
    Forbidden { role: Role, operation: Operation },
    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition {
        from: RequestStatus,
        to: RequestStatus,
    },
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error(transparent)]
    Provider(#[from] AmlError),
    #[error("Database error: {0}")]
    Database(DbErr),
}

impl WorkflowError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        WorkflowError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Stable machine-readable name of the failure class.
    pub const fn kind(&self) -> &'static str {
        match self {
            WorkflowError::NotFound { .. } => "not_found",
            WorkflowError::Forbidden { .. } => "forbidden",
            WorkflowError::InvalidTransition { .. } => "invalid_transition",
            WorkflowError::Conflict(_) => "conflict",
            WorkflowError::Validation(_) => "validation_error",
            WorkflowError::Provider(_) => "aml_provider_error",
            WorkflowError::Database(_) => "database_error",
        }
    }
}

impl From<DbErr> for WorkflowError {
    fn from(err: DbErr) -> Self {
        if matches!(err, DbErr::RecordNotUpdated) {
            return WorkflowError::Conflict("Record was modified concurrently".to_string());
        }
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => WorkflowError::Conflict(detail),
            _ => WorkflowError::Database(err),
        }
    }
}

//! Payment request workflow: status table, role table, audit trail and the
//! lifecycle that ties them together.

pub mod audit;
pub mod input;
pub mod lifecycle;
mod roles;
mod status;

use serde::Serialize;

pub use lifecycle::{NewPaymentRequest, RequestLifecycle, Transition};
pub use roles::{Operation, Role, authorize};
pub use status::{RequestStatus, ensure_transition};

/// Caller identity as resolved by the transport layer. Trusted as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Actor {
    pub id: i64,
    pub role: Role,
}

impl Actor {
    pub const fn new(id: i64, role: Role) -> Self {
        Self { id, role }
    }
}

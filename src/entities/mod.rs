pub mod audit_log;
pub mod payment_request;
pub mod status_history;
pub mod user;
pub mod wallet_check;

pub mod admin;
pub mod aml;
pub mod requests;

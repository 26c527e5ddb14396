//! Wallet risk screening.

mod checks;
mod http;
mod mock;

use std::fmt;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config::{AmlConfig, AmlProviderKind};

pub use checks::AmlCheckService;
pub use http::HttpAmlProvider;
pub use mock::MockAmlProvider;

pub const LOW_RISK_CEILING: f64 = 35.0;
pub const MEDIUM_RISK_CEILING: f64 = 70.0;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    #[sea_orm(string_value = "low")]
    Low,
    #[sea_orm(string_value = "medium")]
    Medium,
    #[sea_orm(string_value = "high")]
    High,
}

impl RiskLevel {
    pub fn from_score(score: f64) -> Self {
        if score < LOW_RISK_CEILING {
            RiskLevel::Low
        } else if score < MEDIUM_RISK_CEILING {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }

    /// Case-insensitive; `None` for anything that is not a known level.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(RiskLevel::Low),
            "medium" => Some(RiskLevel::Medium),
            "high" => Some(RiskLevel::High),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskCategory {
    pub name: String,
    pub score: f64,
}

/// Provider verdict before it is persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct AmlReport {
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub categories: Vec<RiskCategory>,
    pub raw_report: Value,
}

#[derive(Debug, Error)]
pub enum AmlError {
    #[error("AML provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("AML provider returned an invalid report: {0}")]
    InvalidReport(String),
}

#[async_trait]
pub trait AmlProvider: Send + Sync {
    /// Stored alongside every check this provider produces.
    fn name(&self) -> &'static str;

    async fn check(&self, address: &str, network: &str) -> Result<AmlReport, AmlError>;
}

pub fn build_provider(config: &AmlConfig) -> Result<Arc<dyn AmlProvider>> {
    match config.provider {
        AmlProviderKind::Mock => Ok(Arc::new(MockAmlProvider)),
        AmlProviderKind::Http => {
            let http = config
                .http
                .as_ref()
                .context("aml.http must be configured for the http provider")?;
            let provider =
                HttpAmlProvider::new(http).context("Failed to initialize AML HTTP client")?;
            Ok(Arc::new(provider))
        }
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

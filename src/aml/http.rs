use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::{Value, json};

use super::{AmlError, AmlProvider, AmlReport, RiskCategory, RiskLevel};
use crate::config::AmlHttpConfig;

const FALLBACK_CATEGORY: &str = "General";

/// Screens addresses through an external HTTP service.
#[derive(Clone)]
pub struct HttpAmlProvider {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct CheckRequest<'a> {
    address: &'a str,
    network: &'a str,
}

impl HttpAmlProvider {
    pub fn new(config: &AmlHttpConfig) -> Result<Self, AmlError> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint(),
            api_key: config
                .api_key
                .clone()
                .filter(|key| !key.trim().is_empty()),
        })
    }
}

#[async_trait]
impl AmlProvider for HttpAmlProvider {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn check(&self, address: &str, network: &str) -> Result<AmlReport, AmlError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&CheckRequest { address, network });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let body: Value = request.send().await?.error_for_status()?.json().await?;
        parse_report(body)
    }
}

/// Reads a provider response. Unknown levels fall back to the score thresholds
/// and malformed category entries are skipped.
pub fn parse_report(body: Value) -> Result<AmlReport, AmlError> {
    let risk_score = match body.get("risk_score") {
        None | Some(Value::Null) => 0.0,
        Some(value) => number(value).ok_or_else(|| {
            AmlError::InvalidReport(format!("risk_score is not a number: {value}"))
        })?,
    };
    if !risk_score.is_finite() || !(0.0..=100.0).contains(&risk_score) {
        return Err(AmlError::InvalidReport(format!(
            "risk_score {risk_score} is outside [0, 100]"
        )));
    }

    let risk_level = body
        .get("risk_level")
        .and_then(Value::as_str)
        .and_then(RiskLevel::parse)
        .unwrap_or_else(|| RiskLevel::from_score(risk_score));

    let mut categories: Vec<RiskCategory> = body
        .get("categories")
        .and_then(Value::as_array)
        .map(|entries| entries.iter().filter_map(category).collect())
        .unwrap_or_default();
    if categories.is_empty() {
        categories.push(RiskCategory {
            name: FALLBACK_CATEGORY.to_string(),
            score: risk_score,
        });
    }

    let raw_report = if body.is_object() {
        body
    } else {
        json!({ "raw": body })
    };

    Ok(AmlReport {
        risk_score,
        risk_level,
        categories,
        raw_report,
    })
}

fn category(entry: &Value) -> Option<RiskCategory> {
    let name = match entry.get("name")? {
        Value::String(name) => name.clone(),
        other => other.to_string(),
    };
    let score = number(entry.get("score")?)?;
    score.is_finite().then_some(RiskCategory { name, score })
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

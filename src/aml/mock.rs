use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;

use super::{AmlError, AmlProvider, AmlReport, RiskCategory, RiskLevel, round2};

/// Deterministic provider for development: the same address and network always
/// produce the same report.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockAmlProvider;

impl MockAmlProvider {
    pub fn report(address: &str, network: &str) -> AmlReport {
        let seed: u64 = address
            .chars()
            .chain(network.chars())
            .map(u64::from)
            .sum();
        let mut rng = StdRng::seed_from_u64(seed);

        let risk_score = round2(rng.gen_range(5.0..95.0));
        let risk_level = RiskLevel::from_score(risk_score);
        let categories = vec![
            RiskCategory {
                name: "Sanctions".to_string(),
                score: jitter(&mut rng, risk_score, 10.0),
            },
            RiskCategory {
                name: "Scam".to_string(),
                score: jitter(&mut rng, risk_score, 15.0),
            },
        ];
        let raw_report = json!({
            "address": address,
            "network": network,
            "risk_score": risk_score,
            "risk_level": risk_level.as_str(),
            "categories": categories,
        });

        AmlReport {
            risk_score,
            risk_level,
            categories,
            raw_report,
        }
    }
}

fn jitter(rng: &mut StdRng, base: f64, spread: f64) -> f64 {
    round2((base + rng.gen_range(-spread..spread)).clamp(0.0, 100.0))
}

#[async_trait]
impl AmlProvider for MockAmlProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn check(&self, address: &str, network: &str) -> Result<AmlReport, AmlError> {
        Ok(Self::report(address, network))
    }
}

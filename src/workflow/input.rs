use rust_decimal::Decimal;

use crate::config::WorkflowConfig;
use crate::error::{WorkflowError, WorkflowResult};
use crate::workflow::lifecycle::NewPaymentRequest;

pub const MAX_ADDRESS_LEN: usize = 128;
pub const MAX_COMMENT_LEN: usize = 2_000;
pub const MAX_ATTACHMENT_URL_LEN: usize = 2_048;
pub const MAX_REASON_LEN: usize = 1_000;
pub const MAX_TX_HASH_LEN: usize = 128;
/// Largest integer part representable in a NUMERIC(36, 18) column.
pub const MAX_AMOUNT_INTEGER_DIGITS: u32 = 18;
pub const MAX_AMOUNT_SCALE: u32 = 18;

/// Which networks and assets requests may target, and how they are numbered.
#[derive(Debug, Clone)]
pub struct InputPolicy {
    request_no_prefix: String,
    allowed_networks: Vec<String>,
    allowed_assets: Vec<String>,
}

impl InputPolicy {
    pub fn from_config(config: &WorkflowConfig) -> Self {
        assert!(
            !config.allowed_networks.is_empty(),
            "At least one network must be allowed"
        );
        assert!(
            !config.allowed_assets.is_empty(),
            "At least one asset must be allowed"
        );
        Self {
            request_no_prefix: config.request_no_prefix.trim().to_ascii_uppercase(),
            allowed_networks: config
                .allowed_networks
                .iter()
                .map(|network| network.trim().to_ascii_uppercase())
                .collect(),
            allowed_assets: config
                .allowed_assets
                .iter()
                .map(|asset| asset.trim().to_ascii_uppercase())
                .collect(),
        }
    }

    pub fn request_no_prefix(&self) -> &str {
        &self.request_no_prefix
    }

    pub fn normalize_network(&self, value: &str) -> WorkflowResult<String> {
        let normalized = value.trim().to_ascii_uppercase();
        if self.allowed_networks.contains(&normalized) {
            Ok(normalized)
        } else {
            Err(WorkflowError::Validation(format!(
                "Unsupported network: {}",
                value.trim()
            )))
        }
    }

    pub fn normalize_asset(&self, value: &str) -> WorkflowResult<String> {
        let normalized = value.trim().to_ascii_uppercase();
        if self.allowed_assets.contains(&normalized) {
            Ok(normalized)
        } else {
            Err(WorkflowError::Validation(format!(
                "Unsupported asset: {}",
                value.trim()
            )))
        }
    }

    /// Returns the request with every field trimmed and checked.
    pub fn validate_new_request(&self, input: NewPaymentRequest) -> WorkflowResult<NewPaymentRequest> {
        Ok(NewPaymentRequest {
            address: sanitize_address(&input.address)?,
            network: self.normalize_network(&input.network)?,
            asset: self.normalize_asset(&input.asset)?,
            amount: validate_amount(input.amount)?,
            comment: sanitize_optional_text(input.comment, "Comment", MAX_COMMENT_LEN)?,
            attachment_url: sanitize_optional_text(
                input.attachment_url,
                "Attachment URL",
                MAX_ATTACHMENT_URL_LEN,
            )?,
            aml_check_id: input.aml_check_id,
        })
    }
}

pub fn sanitize_address(value: &str) -> WorkflowResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(WorkflowError::Validation(
            "Wallet address cannot be empty".to_string(),
        ));
    }
    if trimmed.len() > MAX_ADDRESS_LEN {
        return Err(WorkflowError::Validation(format!(
            "Wallet address exceeds {MAX_ADDRESS_LEN} character limit"
        )));
    }
    if trimmed.chars().any(char::is_whitespace) {
        return Err(WorkflowError::Validation(
            "Wallet address cannot contain whitespace".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

pub fn validate_amount(amount: Decimal) -> WorkflowResult<Decimal> {
    if amount <= Decimal::ZERO {
        return Err(WorkflowError::Validation(
            "Amount must be greater than zero".to_string(),
        ));
    }
    if amount.scale() > MAX_AMOUNT_SCALE {
        return Err(WorkflowError::Validation(format!(
            "Amount supports at most {MAX_AMOUNT_SCALE} fractional digits"
        )));
    }
    let ceiling = Decimal::from(10u64.pow(MAX_AMOUNT_INTEGER_DIGITS));
    if amount >= ceiling {
        return Err(WorkflowError::Validation(format!(
            "Amount must be below {ceiling}"
        )));
    }
    Ok(amount.normalize())
}

/// Trims optional free text; blank values become `None`.
pub fn sanitize_optional_text(
    value: Option<String>,
    label: &str,
    max_len: usize,
) -> WorkflowResult<Option<String>> {
    let Some(value) = value else {
        return Ok(None);
    };
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > max_len {
        return Err(WorkflowError::Validation(format!(
            "{label} exceeds {max_len} character limit"
        )));
    }
    Ok(Some(trimmed.to_string()))
}

pub fn sanitize_reason(value: &str) -> WorkflowResult<String> {
    sanitize_optional_text(Some(value.to_string()), "Reason", MAX_REASON_LEN)?
        .ok_or_else(|| WorkflowError::Validation("Reason cannot be empty".to_string()))
}

pub fn sanitize_tx_hash(value: &str) -> WorkflowResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(WorkflowError::Validation(
            "Transaction hash cannot be empty".to_string(),
        ));
    }
    if trimmed.len() > MAX_TX_HASH_LEN {
        return Err(WorkflowError::Validation(format!(
            "Transaction hash exceeds {MAX_TX_HASH_LEN} character limit"
        )));
    }
    if !trimmed
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
    {
        return Err(WorkflowError::Validation(
            "Transaction hash may only contain letters, digits, '-' and '_'".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use uuid::Uuid;

    fn policy() -> InputPolicy {
        InputPolicy::from_config(&WorkflowConfig::default())
    }

    fn request(amount: &str) -> NewPaymentRequest {
        NewPaymentRequest {
            address: "  TVjsExample  ".to_string(),
            network: "tron".to_string(),
            asset: "usdt".to_string(),
            amount: Decimal::from_str(amount).unwrap(),
            comment: Some("   ".to_string()),
            attachment_url: None,
            aml_check_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn normalizes_valid_request() {
        let validated = policy().validate_new_request(request("10.50")).unwrap();
        assert_eq!(validated.address, "TVjsExample");
        assert_eq!(validated.network, "TRON");
        assert_eq!(validated.asset, "USDT");
        assert_eq!(validated.amount, Decimal::from_str("10.5").unwrap());
        assert_eq!(validated.comment, None);
    }

    #[test]
    fn rejects_non_positive_amounts() {
        for amount in ["0", "-1", "-0.000001"] {
            let err = policy().validate_new_request(request(amount)).unwrap_err();
            assert_eq!(err.kind(), "validation_error", "amount {amount}");
        }
    }

    #[test]
    fn rejects_unsupported_network_and_asset() {
        let mut input = request("1");
        input.network = "ETH".to_string();
        assert!(policy().validate_new_request(input).is_err());

        let mut input = request("1");
        input.asset = "BTC".to_string();
        assert!(policy().validate_new_request(input).is_err());
    }

    #[test]
    fn rejects_oversized_amount() {
        assert!(validate_amount(Decimal::from(10u64.pow(18))).is_err());
        assert!(validate_amount(Decimal::from(999_999u64)).is_ok());
    }

    #[test]
    fn tx_hash_validation() {
        assert_eq!(sanitize_tx_hash("  abc123 ").unwrap(), "abc123");
        assert!(sanitize_tx_hash("").is_err());
        assert!(sanitize_tx_hash("abc 123").is_err());
        assert!(sanitize_tx_hash("0x<script>").is_err());
        assert_eq!(sanitize_tx_hash("smoke-1a2b").unwrap(), "smoke-1a2b");
        assert!(sanitize_tx_hash(&"a".repeat(MAX_TX_HASH_LEN + 1)).is_err());
    }

    #[test]
    fn reason_must_not_be_blank() {
        assert!(sanitize_reason("   ").is_err());
        assert_eq!(sanitize_reason(" duplicate ").unwrap(), "duplicate");
    }
}

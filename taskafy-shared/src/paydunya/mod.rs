/// Payment gateway abstraction
///
/// Card and mobile-money payments go through Paydunya. Routes only see the
/// [`PaymentGateway`] trait so tests can install an in-process gateway.
///
/// - `client`: [`PaydunyaClient`], the HTTP implementation

pub mod client;

pub use client::{PaydunyaClient, PaydunyaConfig, PaydunyaMode};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use uuid::Uuid;

/// Channels offered when the caller doesn't pick any
pub const DEFAULT_CHANNELS: [&str; 5] = [
    "card",
    "orange-money-senegal",
    "wave-senegal",
    "orange-money-ci",
    "wave-ci",
];

/// Error type for gateway calls
#[derive(Debug, thiserror::Error)]
pub enum PaymentGatewayError {
    #[error("Payment gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Gateway answered with a non-success response code
    #[error("Payment gateway rejected the request ({code}): {message}")]
    Rejected { code: String, message: String },

    #[error("Unexpected payment gateway response: {0}")]
    InvalidResponse(String),
}

/// Customer details attached to an invoice
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Checkout invoice to open with the gateway
#[derive(Debug, Clone)]
pub struct InvoiceRequest {
    pub task_id: Uuid,
    /// Whole CFA francs
    pub amount: i64,
    pub description: String,
    pub customer: Customer,
    pub channels: Vec<String>,
    pub return_url: String,
    pub cancel_url: String,
    pub callback_url: String,
}

/// Opened invoice
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceResponse {
    pub token: String,
    pub checkout_url: String,
}

/// Invoice state reported by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceState {
    Pending,
    Completed,
    Cancelled,
}

impl InvoiceState {
    pub fn parse(status: &str) -> Self {
        match status {
            "completed" => InvoiceState::Completed,
            "cancelled" => InvoiceState::Cancelled,
            _ => InvoiceState::Pending,
        }
    }
}

/// Result of confirming an invoice
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceStatus {
    pub status: InvoiceState,
    pub receipt_url: Option<String>,
    pub customer: Option<Customer>,
    pub total_amount: Option<i64>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_invoice(&self, request: InvoiceRequest) -> Result<InvoiceResponse, PaymentGatewayError>;

    async fn confirm_invoice(&self, token: &str) -> Result<InvoiceStatus, PaymentGatewayError>;
}

/// Checks an IPN `data[hash]` against SHA-512 of the master key
pub fn verify_ipn_hash(master_key: &str, received: &str) -> bool {
    if master_key.is_empty() || received.is_empty() {
        return false;
    }

    let expected = hex::encode(Sha512::digest(master_key.as_bytes()));
    expected.eq_ignore_ascii_case(received.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_ipn_hash() {
        let key = "test-master-key";
        let hash = hex::encode(Sha512::digest(key.as_bytes()));

        assert!(verify_ipn_hash(key, &hash));
        assert!(verify_ipn_hash(key, &hash.to_uppercase()));
        assert!(!verify_ipn_hash(key, "deadbeef"));
        assert!(!verify_ipn_hash("", &hash));
        assert!(!verify_ipn_hash(key, ""));
    }

    #[test]
    fn test_invoice_state_parse() {
        assert_eq!(InvoiceState::parse("completed"), InvoiceState::Completed);
        assert_eq!(InvoiceState::parse("cancelled"), InvoiceState::Cancelled);
        assert_eq!(InvoiceState::parse("pending"), InvoiceState::Pending);
        assert_eq!(InvoiceState::parse("anything"), InvoiceState::Pending);
    }
}

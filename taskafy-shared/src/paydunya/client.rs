/// Paydunya checkout-invoice client

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{
    Customer, InvoiceRequest, InvoiceResponse, InvoiceState, InvoiceStatus, PaymentGateway,
    PaymentGatewayError,
};

const SANDBOX_BASE_URL: &str = "https://app.paydunya.com/sandbox-api/v1";
const LIVE_BASE_URL: &str = "https://app.paydunya.com/api/v1";
const SUCCESS_CODE: &str = "00";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaydunyaMode {
    Test,
    Live,
}

impl PaydunyaMode {
    /// Anything other than `live` runs against the sandbox
    pub fn parse(mode: &str) -> Self {
        if mode.eq_ignore_ascii_case("live") {
            PaydunyaMode::Live
        } else {
            PaydunyaMode::Test
        }
    }

    pub fn base_url(&self) -> &'static str {
        match self {
            PaydunyaMode::Test => SANDBOX_BASE_URL,
            PaydunyaMode::Live => LIVE_BASE_URL,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PaydunyaConfig {
    pub master_key: String,
    pub private_key: String,
    pub token: String,
    pub mode: PaydunyaMode,
    pub store_name: String,
    pub timeout: Duration,
}

pub struct PaydunyaClient {
    http: reqwest::Client,
    config: PaydunyaConfig,
}

#[derive(Debug, Deserialize)]
struct CreateInvoiceBody {
    response_code: String,
    #[serde(default)]
    response_text: String,
    #[serde(default)]
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConfirmInvoiceBody {
    response_code: String,
    #[serde(default)]
    response_text: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    receipt_url: Option<String>,
    #[serde(default)]
    customer: Option<Customer>,
    #[serde(default)]
    invoice: Option<ConfirmedInvoice>,
}

#[derive(Debug, Deserialize)]
struct ConfirmedInvoice {
    #[serde(default)]
    total_amount: Option<serde_json::Value>,
}

impl PaydunyaClient {
    pub fn new(config: PaydunyaConfig) -> Result<Self, PaymentGatewayError> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;

        tracing::info!(mode = ?config.mode, "Paydunya client initialized");

        Ok(Self { http, config })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.config.mode.base_url(), path);

        self.http
            .request(method, url)
            .header("PAYDUNYA-MASTER-KEY", &self.config.master_key)
            .header("PAYDUNYA-PRIVATE-KEY", &self.config.private_key)
            .header("PAYDUNYA-TOKEN", &self.config.token)
    }
}

/// Gateway amounts come back as either numbers or numeric strings
fn parse_amount(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        serde_json::Value::String(s) => s.parse::<f64>().ok().map(|f| f as i64),
        _ => None,
    }
}

#[async_trait]
impl PaymentGateway for PaydunyaClient {
    async fn create_invoice(&self, request: InvoiceRequest) -> Result<InvoiceResponse, PaymentGatewayError> {
        let payload = json!({
            "invoice": {
                "total_amount": request.amount,
                "description": request.description,
            },
            "store": { "name": self.config.store_name },
            "channels": request.channels,
            "custom_data": {
                "task_id": request.task_id,
                "customer_name": request.customer.name,
                "customer_email": request.customer.email,
                "customer_phone": request.customer.phone,
            },
            "actions": {
                "return_url": request.return_url,
                "cancel_url": request.cancel_url,
                "callback_url": request.callback_url,
            },
        });

        let body: CreateInvoiceBody = self
            .request(reqwest::Method::POST, "/checkout-invoice/create")
            .json(&payload)
            .send()
            .await?
            .json()
            .await?;

        if body.response_code != SUCCESS_CODE {
            tracing::warn!(
                task_id = %request.task_id,
                code = %body.response_code,
                "Paydunya invoice creation rejected"
            );
            return Err(PaymentGatewayError::Rejected {
                code: body.response_code,
                message: body.response_text,
            });
        }

        let token = body
            .token
            .ok_or_else(|| PaymentGatewayError::InvalidResponse("missing invoice token".into()))?;

        tracing::info!(task_id = %request.task_id, "Paydunya invoice created");

        // On success the response text carries the checkout URL
        Ok(InvoiceResponse {
            token,
            checkout_url: body.response_text,
        })
    }

    async fn confirm_invoice(&self, token: &str) -> Result<InvoiceStatus, PaymentGatewayError> {
        let body: ConfirmInvoiceBody = self
            .request(reqwest::Method::GET, &format!("/checkout-invoice/confirm/{token}"))
            .send()
            .await?
            .json()
            .await?;

        if body.response_code != SUCCESS_CODE {
            return Err(PaymentGatewayError::Rejected {
                code: body.response_code,
                message: body.response_text,
            });
        }

        let status = body
            .status
            .as_deref()
            .map(InvoiceState::parse)
            .unwrap_or(InvoiceState::Pending);

        Ok(InvoiceStatus {
            status,
            receipt_url: body.receipt_url,
            customer: body.customer,
            total_amount: body
                .invoice
                .and_then(|invoice| invoice.total_amount)
                .as_ref()
                .and_then(parse_amount),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_base_url() {
        assert_eq!(PaydunyaMode::parse("test").base_url(), SANDBOX_BASE_URL);
        assert_eq!(PaydunyaMode::parse("LIVE").base_url(), LIVE_BASE_URL);
        assert_eq!(PaydunyaMode::parse("").base_url(), SANDBOX_BASE_URL);
    }

    #[test]
    fn test_confirm_body_deserialize() {
        let raw = r#"{
            "response_code": "00",
            "response_text": "Transaction Found",
            "status": "completed",
            "receipt_url": "https://app.paydunya.com/sandbox-checkout/receipt/pdf/test_abc.pdf",
            "customer": {"name": "Awa Diop", "phone": "771234567", "email": "awa@example.com"},
            "invoice": {"token": "test_abc", "total_amount": "15000"}
        }"#;

        let body: ConfirmInvoiceBody = serde_json::from_str(raw).unwrap();
        assert_eq!(body.status.as_deref(), Some("completed"));
        assert_eq!(body.customer.unwrap().name.as_deref(), Some("Awa Diop"));
        assert_eq!(parse_amount(body.invoice.unwrap().total_amount.as_ref().unwrap()), Some(15000));
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount(&json!(2500)), Some(2500));
        assert_eq!(parse_amount(&json!("2500.00")), Some(2500));
        assert_eq!(parse_amount(&json!(null)), None);
    }
}

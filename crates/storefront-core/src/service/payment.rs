//! Payment gateways
//!
//! PayPal orders are created client-side; the server only captures them
//! through the REST API once the customer approved the payment.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::future::Cache;
use serde::Deserialize;
use storefront_common::{Money, StorefrontError};

pub const STATUS_COMPLETED: &str = "COMPLETED";
pub const PAYPAL_SANDBOX_URL: &str = "https://api-m.sandbox.paypal.com";

/// Outcome of a capture as reported by the gateway
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CaptureResult {
    pub capture_id: String,
    pub status: String,
    pub payer_email: String,
    pub payer_name: String,
    pub gross: Money,
    pub fee: Money,
}

impl CaptureResult {
    pub fn is_completed(&self) -> bool {
        self.status == STATUS_COMPLETED
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn capture(&self, gateway_order_id: &str) -> anyhow::Result<CaptureResult>;
}

#[derive(Clone, Debug)]
pub struct PayPalConfig {
    pub client_id: String,
    pub client_secret: String,
    pub base_url: String,
}

impl Default for PayPalConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            base_url: PAYPAL_SANDBOX_URL.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Clone, Debug)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Amount {
    value: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Breakdown {
    gross_amount: Amount,
    paypal_fee: Amount,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Capture {
    id: String,
    status: String,
    seller_receivable_breakdown: Breakdown,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Payments {
    captures: Vec<Capture>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PurchaseUnit {
    payments: Payments,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PayerName {
    given_name: String,
    surname: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Payer {
    email_address: String,
    name: PayerName,
}

/// The parts of `POST /v2/checkout/orders/{id}/capture` the shop keeps
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CaptureResponse {
    id: String,
    status: String,
    payer: Payer,
    purchase_units: Vec<PurchaseUnit>,
}

impl From<CaptureResponse> for CaptureResult {
    fn from(response: CaptureResponse) -> Self {
        let capture = response
            .purchase_units
            .into_iter()
            .flat_map(|u| u.payments.captures)
            .next();

        let amount = |a: &Amount| a.value.parse::<Money>().unwrap_or_default();

        let (capture_id, gross, fee) = match &capture {
            Some(c) => (
                c.id.clone(),
                amount(&c.seller_receivable_breakdown.gross_amount),
                amount(&c.seller_receivable_breakdown.paypal_fee),
            ),
            None => (response.id.clone(), Money::ZERO, Money::ZERO),
        };

        let status = if response.status.is_empty() {
            capture.map(|c| c.status).unwrap_or_default()
        } else {
            response.status
        };

        let name = &response.payer.name;
        let payer_name = format!("{} {}", name.given_name, name.surname)
            .trim()
            .to_string();

        Self {
            capture_id,
            status,
            payer_email: response.payer.email_address,
            payer_name,
            gross,
            fee,
        }
    }
}

/// PayPal REST client authenticating with client credentials
pub struct PayPalGateway {
    config: PayPalConfig,
    http_client: reqwest::Client,
    token_cache: Cache<String, CachedToken>,
}

impl PayPalGateway {
    pub fn new(config: PayPalConfig) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            config,
            http_client,
            token_cache: Cache::builder()
                .max_capacity(1)
                .time_to_live(Duration::from_secs(8 * 3600))
                .build(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn access_token(&self) -> anyhow::Result<String> {
        if let Some(cached) = self.token_cache.get(&self.config.client_id).await
            && cached.expires_at > Instant::now()
        {
            return Ok(cached.access_token);
        }

        let response = self
            .http_client
            .post(self.url("/v1/oauth2/token"))
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("PayPal token request failed: {}", error_text);
            return Err(
                StorefrontError::PaymentError("PayPal authentication failed".to_string()).into(),
            );
        }

        let token: TokenResponse = response.json().await?;
        let lifetime = token.expires_in.unwrap_or(3600).saturating_sub(60);

        self.token_cache
            .insert(
                self.config.client_id.clone(),
                CachedToken {
                    access_token: token.access_token.clone(),
                    expires_at: Instant::now() + Duration::from_secs(lifetime),
                },
            )
            .await;

        Ok(token.access_token)
    }
}

#[async_trait]
impl PaymentGateway for PayPalGateway {
    async fn capture(&self, gateway_order_id: &str) -> anyhow::Result<CaptureResult> {
        if gateway_order_id.is_empty()
            || !gateway_order_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(StorefrontError::illegal("invalid PayPal order id").into());
        }

        let token = self.access_token().await?;

        let response = self
            .http_client
            .post(self.url(&format!("/v2/checkout/orders/{}/capture", gateway_order_id)))
            .bearer_auth(token)
            .header("Content-Type", "application/json")
            .header("Prefer", "return=representation")
            .body("{}")
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(
                order = gateway_order_id,
                "PayPal capture failed: {}",
                error_text
            );
            return Err(StorefrontError::PaymentError(format!(
                "PayPal capture of order {} failed",
                gateway_order_id
            ))
            .into());
        }

        let body: CaptureResponse = response.json().await?;
        let result = CaptureResult::from(body);

        tracing::info!(
            order = gateway_order_id,
            capture = %result.capture_id,
            status = %result.status,
            gross = %result.gross,
            "PayPal order captured"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_result_from_response() {
        let json = r#"{
            "id": "5O190127TN364715T",
            "status": "COMPLETED",
            "payer": {
                "email_address": "buyer@example.com",
                "name": { "given_name": "John", "surname": "Doe" }
            },
            "purchase_units": [{
                "payments": {
                    "captures": [{
                        "id": "3C679366HH908993F",
                        "status": "COMPLETED",
                        "seller_receivable_breakdown": {
                            "gross_amount": { "currency_code": "USD", "value": "100.00" },
                            "paypal_fee": { "currency_code": "USD", "value": "3.00" }
                        }
                    }]
                }
            }]
        }"#;

        let response: CaptureResponse = serde_json::from_str(json).unwrap();
        let result = CaptureResult::from(response);

        assert_eq!(result.capture_id, "3C679366HH908993F");
        assert!(result.is_completed());
        assert_eq!(result.payer_email, "buyer@example.com");
        assert_eq!(result.payer_name, "John Doe");
        assert_eq!(result.gross, Money::from_cents(10_000));
        assert_eq!(result.fee, Money::from_cents(300));
    }

    #[test]
    fn test_capture_result_without_captures() {
        let json = r#"{"id": "ORDER-1", "status": "PAYER_ACTION_REQUIRED"}"#;
        let response: CaptureResponse = serde_json::from_str(json).unwrap();
        let result = CaptureResult::from(response);

        assert_eq!(result.capture_id, "ORDER-1");
        assert!(!result.is_completed());
        assert_eq!(result.gross, Money::ZERO);
    }

    #[tokio::test]
    async fn test_capture_rejects_malformed_order_id() {
        let gateway = PayPalGateway::new(PayPalConfig::default()).unwrap();
        let err = gateway.capture("../../v1/evil").await.unwrap_err();
        assert_eq!(err.to_string(), "caused: invalid PayPal order id");
    }
}

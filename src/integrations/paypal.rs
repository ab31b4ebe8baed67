//! PayPal webhook authentication and payload extraction.

use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::PaypalConfig;
use crate::error::{Error, Result};

pub const EVENT_CAPTURE_COMPLETED: &str = "PAYMENT.CAPTURE.COMPLETED";
pub const EVENT_ORDER_APPROVED: &str = "CHECKOUT.ORDER.APPROVED";
pub const EVENT_CAPTURE_REFUNDED: &str = "PAYMENT.CAPTURE.REFUNDED";

/// Transmission headers PayPal attaches to every webhook delivery.
#[derive(Debug, Clone)]
pub struct WebhookHeaders {
    pub transmission_id: String,
    pub transmission_time: String,
    pub transmission_sig: String,
    pub cert_url: String,
    pub auth_algo: String,
}

impl WebhookHeaders {
    /// Returns `None` unless all five headers are present and non-empty.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let get = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        Some(Self {
            transmission_id: get("paypal-transmission-id")?,
            transmission_time: get("paypal-transmission-time")?,
            transmission_sig: get("paypal-transmission-sig")?,
            cert_url: get("paypal-cert-url")?,
            auth_algo: get("paypal-auth-algo")?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct AccessToken {
    access_token: String,
}

#[derive(Debug, Serialize)]
struct VerifyRequest<'a> {
    auth_algo: &'a str,
    cert_url: &'a str,
    transmission_id: &'a str,
    transmission_sig: &'a str,
    transmission_time: &'a str,
    webhook_id: &'a str,
    webhook_event: &'a Value,
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    verification_status: String,
}

#[derive(Debug, Clone)]
pub struct PaypalVerifier {
    http: reqwest::Client,
    config: PaypalConfig,
}

impl PaypalVerifier {
    pub fn new(config: &PaypalConfig, http: reqwest::Client) -> Self {
        Self {
            http,
            config: config.clone(),
        }
    }

    #[must_use]
    pub fn webhook_id(&self) -> Option<&str> {
        self.config.webhook_id.as_deref()
    }

    /// Checks a delivery against PayPal's signature verification API.
    pub async fn verify(&self, headers: &WebhookHeaders, event: &Value) -> Result<bool> {
        let webhook_id = self
            .webhook_id()
            .ok_or_else(|| Error::Config("PayPal webhook id not configured".to_string()))?;

        if self.config.skip_verify {
            warn!("PayPal webhook verification skipped by configuration");
            return Ok(true);
        }

        let token = self.access_token().await?;
        let response: VerifyResponse = self
            .http
            .post(format!(
                "{}/v1/notifications/verify-webhook-signature",
                self.config.api_base
            ))
            .bearer_auth(token)
            .json(&VerifyRequest {
                auth_algo: &headers.auth_algo,
                cert_url: &headers.cert_url,
                transmission_id: &headers.transmission_id,
                transmission_sig: &headers.transmission_sig,
                transmission_time: &headers.transmission_time,
                webhook_id,
                webhook_event: event,
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        debug!(status = %response.verification_status, "PayPal verification result");
        Ok(response.verification_status == "SUCCESS")
    }

    async fn access_token(&self) -> Result<String> {
        let (Some(client_id), Some(secret)) = (&self.config.client_id, &self.config.client_secret)
        else {
            return Err(Error::Config(
                "PayPal client credentials not configured".to_string(),
            ));
        };

        let token: AccessToken = self
            .http
            .post(format!("{}/v1/oauth2/token", self.config.api_base))
            .basic_auth(client_id, Some(secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(token.access_token)
    }
}

/// Payment details carried by a capture or order event.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentDetails {
    pub payment_id: String,
    pub amount: Option<String>,
    pub payer_email: Option<String>,
}

impl PaymentDetails {
    pub fn from_event(event: &Value) -> Option<Self> {
        let str_at = |path: &str| {
            event
                .pointer(path)
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        let payment_id = str_at("/resource/id").or_else(|| str_at("/id"))?;
        let amount = str_at("/resource/amount/value")
            .or_else(|| str_at("/resource/purchase_units/0/amount/value"))
            .or_else(|| str_at("/purchase_units/0/amount/value"));
        let payer_email = str_at("/resource/payer/email_address")
            .or_else(|| str_at("/payer/email_address"));

        Some(Self {
            payment_id,
            amount,
            payer_email,
        })
    }
}

/// Whole-number value of a display amount such as "AED 1,199.50".
#[must_use]
pub fn parse_amount(amount: &str) -> Option<i64> {
    let cleaned: String = amount
        .trim()
        .trim_start_matches("AED ")
        .chars()
        .filter(|c| *c != ',')
        .collect();
    let value: f64 = cleaned.trim().parse().ok()?;
    value.is_finite().then(|| value.trunc() as i64)
}

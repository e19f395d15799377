//! Stripe API client
//!
//! Thin form-encoded client for payment-intent creation. The
//! [`PaymentProvider`] trait is the seam the checkout engine depends on, so
//! tests can substitute a fake provider.

use std::collections::HashMap;

use async_trait::async_trait;
use gavel_core::AppError;
use serde::Deserialize;

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// Payment-intent creation parameters. Amounts are minor units.
#[derive(Debug, Clone)]
pub struct CreatePaymentIntentParams {
    pub amount_cents: i64,
    pub currency: String,
    pub receipt_email: Option<String>,
    pub description: Option<String>,
    /// String key-value metadata the webhook uses to reconstruct the order
    /// flow; see `PaymentIntentMetadata`.
    pub metadata: HashMap<String, String>,
}

/// A created payment intent.
#[derive(Debug, Clone)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: Option<String>,
}

/// Payment provider seam.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_payment_intent(
        &self,
        params: CreatePaymentIntentParams,
    ) -> Result<PaymentIntent, AppError>;
}

#[derive(Debug, Deserialize)]
struct StripePaymentIntentResponse {
    id: String,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(rename = "type", default)]
    error_type: Option<String>,
}

/// Stripe HTTP client
#[derive(Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    api_base: String,
}

impl StripeClient {
    /// The key may be empty in development; intent creation then fails with a
    /// configuration error instead of a request to Stripe.
    pub fn new(secret_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret_key,
            api_base: STRIPE_API_BASE.to_string(),
        }
    }

    #[cfg(test)]
    fn with_api_base(mut self, api_base: String) -> Self {
        self.api_base = api_base;
        self
    }
}

#[async_trait]
impl PaymentProvider for StripeClient {
    #[tracing::instrument(skip(self, params), fields(amount_cents = params.amount_cents, currency = %params.currency))]
    async fn create_payment_intent(
        &self,
        params: CreatePaymentIntentParams,
    ) -> Result<PaymentIntent, AppError> {
        if self.secret_key.is_empty() {
            return Err(AppError::Configuration(
                "Stripe secret key is not configured".to_string(),
            ));
        }

        let mut form: Vec<(String, String)> = vec![
            ("amount".to_string(), params.amount_cents.to_string()),
            ("currency".to_string(), params.currency),
            (
                "automatic_payment_methods[enabled]".to_string(),
                "true".to_string(),
            ),
        ];
        if let Some(email) = params.receipt_email {
            form.push(("receipt_email".to_string(), email));
        }
        if let Some(description) = params.description {
            form.push(("description".to_string(), description));
        }
        for (key, value) in params.metadata {
            form.push((format!("metadata[{}]", key), value));
        }

        let response = self
            .http
            .post(format!("{}/payment_intents", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::PaymentProvider(format!("Stripe request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<StripeErrorResponse>().await {
                Ok(body) => format!(
                    "Stripe returned {}: {} ({})",
                    status,
                    body.error.message.unwrap_or_default(),
                    body.error.error_type.unwrap_or_default()
                ),
                Err(_) => format!("Stripe returned {}", status),
            };
            return Err(AppError::PaymentProvider(message));
        }

        let intent: StripePaymentIntentResponse = response
            .json()
            .await
            .map_err(|e| AppError::PaymentProvider(format!("Invalid Stripe response: {}", e)))?;

        Ok(PaymentIntent {
            id: intent.id,
            client_secret: intent.client_secret,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_secret_key_fails_before_any_request() {
        let client = StripeClient::new(String::new());
        let err = client
            .create_payment_intent(CreatePaymentIntentParams {
                amount_cents: 1000,
                currency: "usd".to_string(),
                receipt_email: None,
                description: None,
                metadata: HashMap::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[test]
    fn test_api_base_override_for_tests() {
        let client = StripeClient::new("sk_test_123".to_string())
            .with_api_base("http://localhost:12111".to_string());
        assert_eq!(client.api_base, "http://localhost:12111");
    }
}

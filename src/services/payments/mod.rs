pub mod vnpay;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{error, instrument};

use crate::errors::ServiceError;

/// One entry in a hosted-checkout session, in minor currency units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLineItem {
    pub name: String,
    pub unit_amount: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone)]
pub struct CreateSessionRequest {
    pub currency: String,
    pub line_items: Vec<SessionLineItem>,
    pub success_url: String,
    pub cancel_url: String,
}

/// Hosted page the client is redirected to.
#[derive(Debug, Clone)]
pub struct HostedSession {
    pub id: String,
    pub url: String,
}

/// Seam to the external payment processor. The checkout orchestrator makes a
/// single unretried call through this trait; failures surface to the caller.
#[async_trait]
pub trait CheckoutClient: Send + Sync {
    async fn create_session(
        &self,
        request: CreateSessionRequest,
    ) -> Result<HostedSession, ServiceError>;
}

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// Stripe hosted-checkout client speaking the form-encoded sessions API.
pub struct StripeCheckout {
    http: reqwest::Client,
    secret_key: String,
    api_base: String,
}

impl StripeCheckout {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret_key: secret_key.into(),
            api_base: STRIPE_API_BASE.to_string(),
        }
    }

    fn session_form(request: &CreateSessionRequest) -> Vec<(String, String)> {
        let mut form = vec![
            ("mode".to_string(), "payment".to_string()),
            (
                "payment_method_types[0]".to_string(),
                "card".to_string(),
            ),
            ("success_url".to_string(), request.success_url.clone()),
            ("cancel_url".to_string(), request.cancel_url.clone()),
        ];

        for (i, item) in request.line_items.iter().enumerate() {
            form.push((
                format!("line_items[{i}][price_data][currency]"),
                request.currency.to_ascii_lowercase(),
            ));
            form.push((
                format!("line_items[{i}][price_data][product_data][name]"),
                item.name.clone(),
            ));
            form.push((
                format!("line_items[{i}][price_data][unit_amount]"),
                item.unit_amount.to_string(),
            ));
            form.push((format!("line_items[{i}][quantity]"), item.quantity.to_string()));
        }

        form
    }
}

#[derive(Debug, Deserialize)]
struct StripeSession {
    id: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    message: String,
}

#[async_trait]
impl CheckoutClient for StripeCheckout {
    #[instrument(skip(self, request), fields(line_items = request.line_items.len()))]
    async fn create_session(
        &self,
        request: CreateSessionRequest,
    ) -> Result<HostedSession, ServiceError> {
        let form = Self::session_form(&request);

        let response = self
            .http
            .post(format!("{}/checkout/sessions", self.api_base))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                error!("Checkout session request failed: {e}");
                ServiceError::ExternalServiceError(format!("Checkout session request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let message = response
                .json::<StripeErrorBody>()
                .await
                .map(|body| body.error.message)
                .unwrap_or_else(|_| "unknown processor error".to_string());
            error!(%message, "Processor rejected checkout session");
            return Err(ServiceError::ExternalServiceError(message));
        }

        let session: StripeSession = response.json().await.map_err(|e| {
            ServiceError::ExternalServiceError(format!("Invalid processor response: {e}"))
        })?;

        Ok(HostedSession {
            id: session.id,
            url: session.url,
        })
    }
}

/// Placeholder used when no processor credentials are configured; card
/// checkout fails fast while cash-on-delivery keeps working.
pub struct DisabledCheckout;

#[async_trait]
impl CheckoutClient for DisabledCheckout {
    async fn create_session(
        &self,
        _request: CreateSessionRequest,
    ) -> Result<HostedSession, ServiceError> {
        Err(ServiceError::ExternalServiceError(
            "Hosted checkout is not configured".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_form_carries_every_line_item() {
        let request = CreateSessionRequest {
            currency: "VND".to_string(),
            line_items: vec![
                SessionLineItem {
                    name: "Banh mi".to_string(),
                    unit_amount: 100_000_000,
                    quantity: 2,
                },
                SessionLineItem {
                    name: "Shipping fee".to_string(),
                    unit_amount: 30_000,
                    quantity: 1,
                },
            ],
            success_url: "https://shop.example/verify/success".to_string(),
            cancel_url: "https://shop.example/verify?success=false".to_string(),
        };

        let form = StripeCheckout::session_form(&request);
        let lookup = |key: &str| {
            form.iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };

        assert_eq!(lookup("mode"), Some("payment"));
        assert_eq!(
            lookup("line_items[0][price_data][product_data][name]"),
            Some("Banh mi")
        );
        assert_eq!(
            lookup("line_items[0][price_data][unit_amount]"),
            Some("100000000")
        );
        assert_eq!(lookup("line_items[1][quantity]"), Some("1"));
        assert_eq!(lookup("line_items[0][price_data][currency]"), Some("vnd"));
    }

    #[tokio::test]
    async fn disabled_checkout_rejects_sessions() {
        let client = DisabledCheckout;
        let err = client
            .create_session(CreateSessionRequest {
                currency: "VND".to_string(),
                line_items: vec![],
                success_url: String::new(),
                cancel_url: String::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::ExternalServiceError(_)));
    }
}

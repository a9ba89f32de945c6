use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{CheckoutRequest, CheckoutSession, GatewayError, PaymentGateway};
use crate::config::StripeConfig;

#[derive(Clone)]
pub struct StripeGateway {
    client: reqwest::Client,
    api_base: String,
    secret_key: String,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
}

impl StripeGateway {
    pub fn new(config: &StripeConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
        })
    }
}

/// Form fields for `POST /v1/checkout/sessions`.
pub fn checkout_form(request: &CheckoutRequest) -> Vec<(String, String)> {
    vec![
        ("mode".into(), "payment".into()),
        ("success_url".into(), request.success_url.clone()),
        ("cancel_url".into(), request.cancel_url.clone()),
        (
            "line_items[0][price_data][currency]".into(),
            request.currency.clone(),
        ),
        (
            "line_items[0][price_data][unit_amount]".into(),
            request.amount.to_string(),
        ),
        (
            "line_items[0][price_data][product_data][name]".into(),
            request.description.clone(),
        ),
        ("line_items[0][quantity]".into(), "1".into()),
        ("metadata[order_id]".into(), request.order_id.to_string()),
        ("metadata[user_id]".into(), request.user_id.to_string()),
        ("client_reference_id".into(), request.order_id.to_string()),
    ]
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        let resp = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&checkout_form(&request))
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(GatewayError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let session = serde_json::from_str::<SessionResponse>(&body)
            .map_err(|e| GatewayError::InvalidResponse(format!("{e}; body={body}")))?;
        let url = session
            .url
            .ok_or_else(|| GatewayError::InvalidResponse("session has no url".into()))?;

        Ok(CheckoutSession {
            id: session.id,
            url,
        })
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn checkout_form_carries_single_line_item_and_order_metadata() {
        let order_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let request = CheckoutRequest {
            order_id,
            user_id,
            amount: 999,
            currency: "usd".into(),
            description: format!("Order #{order_id}"),
            success_url: "http://localhost/success".into(),
            cancel_url: "http://localhost/cancel".into(),
        };

        let form = checkout_form(&request);
        let get = |key: &str| {
            form.iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };

        assert_eq!(get("mode"), Some("payment"));
        assert_eq!(get("line_items[0][price_data][unit_amount]"), Some("999"));
        assert_eq!(get("line_items[0][quantity]"), Some("1"));
        assert_eq!(get("metadata[order_id]"), Some(order_id.to_string().as_str()));
        assert_eq!(get("metadata[user_id]"), Some(user_id.to_string().as_str()));
        assert!(get("line_items[1][quantity]").is_none());
    }
}

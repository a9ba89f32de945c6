//! Hosted-checkout payment processor seam.
//!
//! Services talk to the processor only through [`PaymentGateway`], so the
//! Stripe client can be swapped for a fake in tests.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

pub mod stripe;
pub mod webhook;

pub use stripe::StripeGateway;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("payment processor timed out")]
    Timeout,

    #[error("payment processor unreachable: {0}")]
    Transport(String),

    #[error("payment processor rejected request: status={status} body={body}")]
    Api { status: u16, body: String },

    #[error("invalid payment processor response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}

/// One checkout for a whole order: a single line item carrying the order total.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutRequest {
    pub order_id: Uuid,
    pub user_id: Uuid,
    /// Minor currency units.
    pub amount: i64,
    pub currency: String,
    pub description: String,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, GatewayError>;
}

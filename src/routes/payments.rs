use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};

use crate::{
    dto::payments::{CheckoutSessionRequest, CheckoutSessionResponse, PaymentList, WebhookAck},
    error::AppResult,
    gateway::webhook::SIGNATURE_HEADER,
    middleware::auth::AuthUser,
    response::{ApiResponse, Meta},
    routes::params::AdminPaymentQuery,
    services::payment_service::{self, WebhookOutcome},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_payments))
        .route("/admin", get(list_all_payments))
        .route("/checkout-session", post(create_checkout_session))
        .route("/webhook", post(webhook))
}

#[utoipa::path(
    post,
    path = "/api/payments/checkout-session",
    request_body = CheckoutSessionRequest,
    responses(
        (status = 200, description = "Hosted checkout URL", body = ApiResponse<CheckoutSessionResponse>),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Only pending orders can be paid"),
        (status = 502, description = "Payment session creation failed")
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn create_checkout_session(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CheckoutSessionRequest>,
) -> AppResult<Json<ApiResponse<CheckoutSessionResponse>>> {
    let resp = payment_service::create_checkout_session(&state, &user, payload).await?;
    Ok(Json(resp))
}

/// Authenticated by the processor signature over the raw body, never by bearer token.
#[utoipa::path(
    post,
    path = "/api/payments/webhook",
    request_body(content = String, description = "Raw processor event", content_type = "application/json"),
    params(
        ("Stripe-Signature" = String, Header, description = "t=<unix>,v1=<hex hmac>")
    ),
    responses(
        (status = 200, description = "Event accepted", body = ApiResponse<WebhookAck>),
        (status = 400, description = "Missing or invalid signature, or malformed event")
    ),
    security(()),
    tag = "Payments"
)]
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<(StatusCode, Json<ApiResponse<WebhookAck>>)> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let outcome = payment_service::process_payment_notification(&state, &body, signature).await?;

    let (status, message) = match &outcome {
        WebhookOutcome::Rejected(reason) => (StatusCode::BAD_REQUEST, reason.clone()),
        WebhookOutcome::Ignored(reason) => (StatusCode::OK, reason.clone()),
        WebhookOutcome::Processed { .. } => (StatusCode::OK, "Payment recorded".to_string()),
        WebhookOutcome::Duplicate { .. } => (StatusCode::OK, "Already processed".to_string()),
    };
    let ack = WebhookAck {
        received: !matches!(outcome, WebhookOutcome::Rejected(_)),
        outcome: outcome.label().to_string(),
    };

    Ok((
        status,
        Json(ApiResponse::success(message, ack, Some(Meta::empty()))),
    ))
}

#[utoipa::path(
    get,
    path = "/api/payments",
    responses(
        (status = 200, description = "Caller's payments, newest first", body = ApiResponse<PaymentList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn list_payments(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<PaymentList>>> {
    let resp = payment_service::list_my_payments(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/payments/admin",
    params(AdminPaymentQuery),
    responses(
        (status = 200, description = "Filtered payments of all users", body = ApiResponse<PaymentList>),
        (status = 403, description = "Admin role required")
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn list_all_payments(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<AdminPaymentQuery>,
) -> AppResult<Json<ApiResponse<PaymentList>>> {
    let resp = payment_service::list_all_payments(&state, &user, query).await?;
    Ok(Json(resp))
}

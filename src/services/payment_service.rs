use std::collections::HashMap;

use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::payments::{CheckoutSessionRequest, CheckoutSessionResponse, PaymentList},
    entity::{Orders, PaymentItems, Payments, orders, payment_items, payments},
    error::{AppError, AppResult},
    gateway::{
        CheckoutRequest,
        webhook::{CompletedCheckout, WebhookEvent, verify_signature},
    },
    middleware::auth::{AuthUser, authorize},
    models::{OrderStatus, Payment, PaymentStatus, UserRole},
    response::{ApiResponse, Meta},
    routes::params::AdminPaymentQuery,
    services::order_service::{find_user_order, order_items_of, order_total, parse_status},
    state::AppState,
};

/// What a processor notification did; only `Rejected` is reported back as a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    Processed { order_id: Uuid, payment_id: Uuid },
    /// The order was already paid; nothing changed.
    Duplicate { order_id: Uuid },
    Ignored(String),
    Rejected(String),
}

impl WebhookOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            WebhookOutcome::Processed { .. } => "processed",
            WebhookOutcome::Duplicate { .. } => "duplicate",
            WebhookOutcome::Ignored(_) => "ignored",
            WebhookOutcome::Rejected(_) => "rejected",
        }
    }
}

pub async fn create_checkout_session(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutSessionRequest,
) -> AppResult<ApiResponse<CheckoutSessionResponse>> {
    let txn = state.orm.begin().await?;
    let order = find_user_order(&txn, user.user_id, payload.order_id, true).await?;

    if parse_status(&order.status)? != OrderStatus::Pending {
        return Err(AppError::Conflict("Only pending orders can be paid".into()));
    }

    let items = order_items_of(&txn, order.id).await?;
    if items.is_empty() {
        return Err(AppError::Conflict("Order has no items".into()));
    }
    let total = order_total(items.iter().map(|item| item.price_at_order));

    // Committed before the outbound call; the webhook checks against this total.
    let order_id = order.id;
    if total != order.total_amount {
        tracing::warn!(
            order_id = %order_id,
            stored = order.total_amount,
            recomputed = total,
            "order total drifted from its items"
        );
        let mut active: orders::ActiveModel = order.into();
        active.total_amount = Set(total);
        active.updated_at = Set(Utc::now().into());
        active.update(&txn).await?;
    }
    txn.commit().await?;

    let stripe = &state.config.stripe;
    let request = CheckoutRequest {
        order_id,
        user_id: user.user_id,
        amount: total,
        currency: stripe.currency.clone(),
        description: format!("Order #{order_id}"),
        success_url: stripe.success_url.clone(),
        cancel_url: stripe.cancel_url.clone(),
    };

    let session = match state.gateway.create_checkout_session(request).await {
        Ok(session) => session,
        Err(err) => {
            tracing::error!(error = %err, order_id = %order_id, "checkout session creation failed");
            return Err(AppError::ExternalService(
                "Payment session creation failed".into(),
            ));
        }
    };

    tracing::info!(order_id = %order_id, session_id = %session.id, "checkout session created");
    audit::record(
        &state.pool,
        Some(user.user_id),
        "checkout_session_create",
        "payments",
        serde_json::json!({ "order_id": order_id, "session_id": session.id, "amount": total }),
    )
    .await;

    Ok(ApiResponse::success(
        "Checkout session created",
        CheckoutSessionResponse {
            order_id,
            session_id: session.id,
            checkout_url: session.url,
        },
        Some(Meta::empty()),
    ))
}

/// Authenticate and apply a processor notification.
///
/// Safe under redelivery: the order row is locked and its status decides
/// whether a payment is written.
pub async fn process_payment_notification(
    state: &AppState,
    payload: &[u8],
    signature: Option<&str>,
) -> AppResult<WebhookOutcome> {
    let Some(signature) = signature else {
        tracing::warn!("webhook without signature header");
        return Ok(WebhookOutcome::Rejected("Missing signature".into()));
    };

    let stripe = &state.config.stripe;
    if let Err(err) = verify_signature(
        payload,
        signature,
        &stripe.webhook_secret,
        stripe.webhook_tolerance_secs,
        Utc::now().timestamp(),
    ) {
        tracing::warn!(error = %err, "webhook signature rejected");
        return Ok(WebhookOutcome::Rejected("Invalid signature".into()));
    }

    let event = match WebhookEvent::parse(payload) {
        Ok(event) => event,
        Err(err) => {
            tracing::warn!(error = %err, "webhook payload is not a valid event");
            return Ok(WebhookOutcome::Rejected("Invalid payload".into()));
        }
    };

    let Some(completed) = event.completed_checkout() else {
        tracing::debug!(event_id = ?event.id, event_type = %event.event_type, "webhook ignored");
        return Ok(WebhookOutcome::Ignored(event.event_type));
    };

    apply_completed_checkout(state, completed).await
}

async fn apply_completed_checkout(
    state: &AppState,
    completed: CompletedCheckout,
) -> AppResult<WebhookOutcome> {
    let order_id = completed.order_id;
    let txn = state.orm.begin().await?;

    let Some(order) = Orders::find_by_id(order_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
    else {
        tracing::warn!(order_id = %order_id, "webhook for unknown order");
        return Ok(WebhookOutcome::Ignored("Order not found".into()));
    };

    if order.user_id != completed.user_id {
        tracing::warn!(
            order_id = %order_id,
            owner = %order.user_id,
            claimed = %completed.user_id,
            "webhook user does not own the order"
        );
        return Ok(WebhookOutcome::Ignored("Order owner mismatch".into()));
    }

    match parse_status(&order.status)? {
        OrderStatus::Pending => {}
        OrderStatus::Paid => {
            tracing::info!(order_id = %order_id, "duplicate payment notification");
            return Ok(WebhookOutcome::Duplicate { order_id });
        }
        other => {
            tracing::warn!(order_id = %order_id, status = %other, "payment for order that is not pending");
            return Ok(WebhookOutcome::Ignored(format!("Order is {other}")));
        }
    }

    let items = order_items_of(&txn, order.id).await?;
    let amount_mismatch = completed.amount_paid != order.total_amount;

    let payment_id = Uuid::new_v4();
    let inserted = payments::ActiveModel {
        id: Set(payment_id),
        user_id: Set(order.user_id),
        order_id: Set(order.id),
        status: Set(PaymentStatus::Successful.as_str().to_string()),
        amount: Set(completed.amount_paid),
        external_payment_id: Set(completed.external_payment_id.clone()),
        created_at: NotSet,
    }
    .insert(&txn)
    .await;
    if let Err(err) = inserted {
        if let Some(SqlErr::UniqueConstraintViolation(_)) = err.sql_err() {
            return Ok(WebhookOutcome::Duplicate { order_id });
        }
        return Err(err.into());
    }

    for item in &items {
        payment_items::ActiveModel {
            id: Set(Uuid::new_v4()),
            payment_id: Set(payment_id),
            order_item_id: Set(item.id),
            position: Set(item.position),
            price_at_payment: Set(item.price_at_order),
        }
        .insert(&txn)
        .await?;
    }

    let expected = order.total_amount;
    let user_id = order.user_id;
    let mut active: orders::ActiveModel = order.into();
    active.status = Set(OrderStatus::Paid.as_str().to_string());
    active.updated_at = Set(Utc::now().into());
    active.update(&txn).await?;

    txn.commit().await?;

    if amount_mismatch {
        tracing::warn!(
            order_id = %order_id,
            expected,
            paid = completed.amount_paid,
            "payment amount differs from order total"
        );
        audit::record(
            &state.pool,
            Some(user_id),
            "payment_amount_mismatch",
            "payments",
            serde_json::json!({
                "order_id": order_id,
                "expected": expected,
                "paid": completed.amount_paid,
            }),
        )
        .await;
    }

    tracing::info!(order_id = %order_id, payment_id = %payment_id, status = "paid", "payment recorded");
    audit::record(
        &state.pool,
        Some(user_id),
        "payment_recorded",
        "payments",
        serde_json::json!({
            "order_id": order_id,
            "payment_id": payment_id,
            "external_payment_id": completed.external_payment_id,
        }),
    )
    .await;

    Ok(WebhookOutcome::Processed {
        order_id,
        payment_id,
    })
}

pub async fn list_my_payments(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<PaymentList>> {
    let rows = Payments::find()
        .filter(payments::Column::UserId.eq(user.user_id))
        .order_by_desc(payments::Column::CreatedAt)
        .all(&state.orm)
        .await?;

    let items = with_items(&state.orm, rows).await?;
    Ok(ApiResponse::success("OK", PaymentList { items }, Some(Meta::empty())))
}

pub async fn list_all_payments(
    state: &AppState,
    admin: &AuthUser,
    query: AdminPaymentQuery,
) -> AppResult<ApiResponse<PaymentList>> {
    authorize(admin, UserRole::Admin)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(user_id) = query.user_id {
        condition = condition.add(payments::Column::UserId.eq(user_id));
    }
    if let Some(status) = query.status {
        condition = condition.add(payments::Column::Status.eq(status.as_str()));
    }
    if let Some(date_from) = query.date_from {
        condition = condition.add(payments::Column::CreatedAt.gte(date_from));
    }
    if let Some(date_to) = query.date_to {
        condition = condition.add(payments::Column::CreatedAt.lte(date_to));
    }

    let finder = Payments::find()
        .filter(condition)
        .order_by_desc(payments::Column::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;

    let rows = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let items = with_items(&state.orm, rows).await?;
    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("OK", PaymentList { items }, Some(meta)))
}

async fn with_items<C: ConnectionTrait>(
    conn: &C,
    rows: Vec<payments::Model>,
) -> AppResult<Vec<Payment>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = rows.iter().map(|p| p.id).collect();
    let mut grouped: HashMap<Uuid, Vec<payment_items::Model>> = HashMap::new();
    for item in PaymentItems::find()
        .filter(payment_items::Column::PaymentId.is_in(ids))
        .order_by_asc(payment_items::Column::Position)
        .all(conn)
        .await?
    {
        grouped.entry(item.payment_id).or_default().push(item);
    }

    rows.into_iter()
        .map(|payment| {
            let items = grouped.remove(&payment.id).unwrap_or_default();
            Payment::from_entity(payment, items).map_err(|e| AppError::Internal(anyhow::anyhow!(e)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_labels_are_stable() {
        let id = Uuid::new_v4();
        assert_eq!(
            WebhookOutcome::Processed {
                order_id: id,
                payment_id: id
            }
            .label(),
            "processed"
        );
        assert_eq!(WebhookOutcome::Duplicate { order_id: id }.label(), "duplicate");
        assert_eq!(WebhookOutcome::Ignored("x".into()).label(), "ignored");
        assert_eq!(WebhookOutcome::Rejected("x".into()).label(), "rejected");
    }
}

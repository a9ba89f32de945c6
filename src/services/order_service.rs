use std::collections::HashMap;

use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::orders::{OrderList, OrderWithItems},
    entity::{CartItems, Carts, Movies, OrderItems, Orders, cart_items, carts, movies, order_items, orders},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Order, OrderItem, OrderStatus},
    response::{ApiResponse, Meta},
    routes::params::OrderListQuery,
    state::AppState,
};

/// Movie id and the price it is frozen at, in cart order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceSnapshot {
    pub movie_id: i64,
    pub price: i64,
}

/// Pair each cart row with its live catalog price, dropping movies that no longer exist.
pub fn snapshot_prices(cart_movie_ids: &[i64], catalog: &HashMap<i64, i64>) -> Vec<PriceSnapshot> {
    cart_movie_ids
        .iter()
        .filter_map(|movie_id| {
            catalog.get(movie_id).map(|&price| PriceSnapshot {
                movie_id: *movie_id,
                price,
            })
        })
        .collect()
}

pub fn order_total(prices: impl IntoIterator<Item = i64>) -> i64 {
    prices.into_iter().sum()
}

pub async fn create_from_cart(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let txn = state.orm.begin().await?;

    let cart = Carts::find()
        .filter(carts::Column::UserId.eq(user.user_id))
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::Conflict("Cart is empty".into()))?;

    let rows = CartItems::find()
        .filter(cart_items::Column::CartId.eq(cart.id))
        .order_by_asc(cart_items::Column::AddedAt)
        .order_by_asc(cart_items::Column::Id)
        .all(&txn)
        .await?;
    if rows.is_empty() {
        return Err(AppError::Conflict("Cart is empty".into()));
    }

    let movie_ids: Vec<i64> = rows.iter().map(|row| row.movie_id).collect();
    // shared lock keeps the movies in place until the order items reference them
    let catalog: HashMap<i64, i64> = Movies::find()
        .filter(movies::Column::Id.is_in(movie_ids.clone()))
        .lock_shared()
        .all(&txn)
        .await?
        .into_iter()
        .map(|movie| (movie.id, movie.price))
        .collect();

    let snapshot = snapshot_prices(&movie_ids, &catalog);
    if snapshot.is_empty() {
        return Err(AppError::Conflict("No available items".into()));
    }
    let skipped = rows.len() - snapshot.len();
    let total_amount = order_total(snapshot.iter().map(|s| s.price));

    let order = orders::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        status: Set(OrderStatus::Pending.as_str().to_string()),
        total_amount: Set(total_amount),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut items: Vec<OrderItem> = Vec::with_capacity(snapshot.len());
    for (position, line) in snapshot.iter().enumerate() {
        let item = order_items::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            movie_id: Set(line.movie_id),
            position: Set(position as i32),
            price_at_order: Set(line.price),
        }
        .insert(&txn)
        .await?;
        items.push(OrderItem::from(item));
    }

    CartItems::delete_many()
        .filter(cart_items::Column::CartId.eq(cart.id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        user_id = %user.user_id,
        total_amount,
        skipped,
        "order created"
    );
    audit::record(
        &state.pool,
        Some(user.user_id),
        "order_create",
        "orders",
        serde_json::json!({ "order_id": order.id, "total_amount": total_amount }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order created",
        OrderWithItems {
            order: order_from_entity(order)?,
            items,
        },
        Some(Meta::empty()),
    ))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all().add(orders::Column::UserId.eq(user.user_id));
    if let Some(status) = query.status {
        condition = condition.add(orders::Column::Status.eq(status.as_str()));
    }

    let finder = Orders::find()
        .filter(condition)
        .order_by_desc(orders::Column::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Ok", OrderList { items }, Some(meta)))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = find_user_order(&state.orm, user.user_id, id, false).await?;
    let items = order_items_of(&state.orm, order.id).await?;

    Ok(ApiResponse::success(
        "OK",
        OrderWithItems {
            order: order_from_entity(order)?,
            items: items.into_iter().map(OrderItem::from).collect(),
        },
        Some(Meta::empty()),
    ))
}

pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    let txn = state.orm.begin().await?;
    let order = find_user_order(&txn, user.user_id, id, true).await?;

    let status = parse_status(&order.status)?;
    if !status.can_transition_to(OrderStatus::Canceled) {
        return Err(AppError::Conflict(
            "Only pending orders can be canceled".into(),
        ));
    }

    let mut active: orders::ActiveModel = order.into();
    active.status = Set(OrderStatus::Canceled.as_str().to_string());
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;
    txn.commit().await?;

    tracing::info!(order_id = %order.id, user_id = %user.user_id, status = "canceled", "order canceled");
    audit::record(
        &state.pool,
        Some(user.user_id),
        "order_cancel",
        "orders",
        serde_json::json!({ "order_id": order.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order canceled",
        order_from_entity(order)?,
        Some(Meta::empty()),
    ))
}

/// Orders are scoped by owner; someone else's order is reported as missing.
pub(crate) async fn find_user_order<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    id: Uuid,
    for_update: bool,
) -> AppResult<orders::Model> {
    let mut finder = Orders::find().filter(
        Condition::all()
            .add(orders::Column::UserId.eq(user_id))
            .add(orders::Column::Id.eq(id)),
    );
    if for_update {
        finder = finder.lock(LockType::Update);
    }
    finder
        .one(conn)
        .await?
        .ok_or_else(|| AppError::not_found("Order"))
}

pub(crate) async fn order_items_of<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> AppResult<Vec<order_items::Model>> {
    Ok(OrderItems::find()
        .filter(order_items::Column::OrderId.eq(order_id))
        .order_by_asc(order_items::Column::Position)
        .all(conn)
        .await?)
}

pub(crate) fn parse_status(raw: &str) -> AppResult<OrderStatus> {
    raw.parse::<OrderStatus>()
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))
}

pub(crate) fn order_from_entity(model: orders::Model) -> AppResult<Order> {
    Order::try_from(model).map_err(|e| AppError::Internal(anyhow::anyhow!(e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_skips_deleted_movies_and_keeps_cart_order() {
        let catalog = HashMap::from([(10, 999), (30, 1500)]);
        let snapshot = snapshot_prices(&[30, 20, 10], &catalog);
        assert_eq!(
            snapshot,
            vec![
                PriceSnapshot {
                    movie_id: 30,
                    price: 1500
                },
                PriceSnapshot {
                    movie_id: 10,
                    price: 999
                },
            ]
        );
        assert_eq!(order_total(snapshot.iter().map(|s| s.price)), 2499);
    }

    #[test]
    fn snapshot_of_vanished_catalog_is_empty() {
        let snapshot = snapshot_prices(&[1, 2], &HashMap::new());
        assert!(snapshot.is_empty());
        assert_eq!(order_total(snapshot.iter().map(|s| s.price)), 0);
    }
}

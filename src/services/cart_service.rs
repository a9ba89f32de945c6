use std::collections::HashMap;

use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::cart::CartMovieRequest,
    entity::{CartItems, Carts, Movies, Users, cart_items, carts, movies},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, authorize},
    models::{CartItemView, CartView, UserRole},
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn get_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartView>> {
    let view = cart_view(&state.orm, user.user_id).await?;
    Ok(ApiResponse::success("OK", view, Some(Meta::empty())))
}

pub async fn get_cart_for_user(
    state: &AppState,
    admin: &AuthUser,
    user_id: Uuid,
) -> AppResult<ApiResponse<CartView>> {
    authorize(admin, UserRole::Admin)?;
    Users::find_by_id(user_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    let view = cart_view(&state.orm, user_id).await?;
    Ok(ApiResponse::success("OK", view, Some(Meta::empty())))
}

pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    payload: CartMovieRequest,
) -> AppResult<ApiResponse<CartView>> {
    let movie = Movies::find_by_id(payload.movie_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Movie"))?;

    let txn = state.orm.begin().await?;
    let cart = ensure_cart(&txn, user.user_id).await?;

    let existing = CartItems::find()
        .filter(
            Condition::all()
                .add(cart_items::Column::CartId.eq(cart.id))
                .add(cart_items::Column::MovieId.eq(movie.id)),
        )
        .one(&txn)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict("Movie already in cart".into()));
    }

    cart_items::ActiveModel {
        id: Set(Uuid::new_v4()),
        cart_id: Set(cart.id),
        movie_id: Set(movie.id),
        added_at: Set(Utc::now().into()),
    }
    .insert(&txn)
    .await
    .map_err(|err| AppError::conflict_on_unique(err, "Movie already in cart"))?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "cart_add",
        "cart_items",
        serde_json::json!({ "movie_id": movie.id }),
    )
    .await;

    let view = cart_view(&state.orm, user.user_id).await?;
    Ok(ApiResponse::success(
        "Movie added to cart",
        view,
        Some(Meta::empty()),
    ))
}

pub async fn remove_from_cart(
    state: &AppState,
    user: &AuthUser,
    payload: CartMovieRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let cart = find_cart(&state.orm, user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Cart is empty".into()))?;

    let result = CartItems::delete_many()
        .filter(
            Condition::all()
                .add(cart_items::Column::CartId.eq(cart.id))
                .add(cart_items::Column::MovieId.eq(payload.movie_id)),
        )
        .exec(&state.orm)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Movie not in cart".into()));
    }

    audit::record(
        &state.pool,
        Some(user.user_id),
        "cart_remove",
        "cart_items",
        serde_json::json!({ "movie_id": payload.movie_id }),
    )
    .await;

    Ok(ApiResponse::message("Removed from cart"))
}

pub async fn clear_cart(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<serde_json::Value>> {
    if let Some(cart) = find_cart(&state.orm, user.user_id).await? {
        let removed = CartItems::delete_many()
            .filter(cart_items::Column::CartId.eq(cart.id))
            .exec(&state.orm)
            .await?
            .rows_affected;

        audit::record(
            &state.pool,
            Some(user.user_id),
            "cart_clear",
            "cart_items",
            serde_json::json!({ "removed": removed }),
        )
        .await;
    }

    Ok(ApiResponse::message("Cart cleared"))
}

pub fn cart_total(items: &[CartItemView]) -> i64 {
    items.iter().map(|item| item.price).sum()
}

pub(crate) async fn find_cart<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
) -> AppResult<Option<carts::Model>> {
    Ok(Carts::find()
        .filter(carts::Column::UserId.eq(user_id))
        .one(conn)
        .await?)
}

async fn ensure_cart<C: ConnectionTrait>(conn: &C, user_id: Uuid) -> AppResult<carts::Model> {
    Carts::insert(carts::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        created_at: NotSet,
    })
    .on_conflict(
        OnConflict::column(carts::Column::UserId)
            .do_nothing()
            .to_owned(),
    )
    .exec_without_returning(conn)
    .await?;

    find_cart(conn, user_id)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("cart for {user_id} vanished")))
}

/// Resolve stored items against the live catalog; rows for deleted movies are skipped.
async fn cart_view<C: ConnectionTrait>(conn: &C, user_id: Uuid) -> AppResult<CartView> {
    let Some(cart) = find_cart(conn, user_id).await? else {
        return Ok(CartView {
            user_id,
            items: Vec::new(),
            total_amount: 0,
        });
    };

    let rows = CartItems::find()
        .filter(cart_items::Column::CartId.eq(cart.id))
        .order_by_asc(cart_items::Column::AddedAt)
        .order_by_asc(cart_items::Column::Id)
        .all(conn)
        .await?;

    let movie_ids: Vec<i64> = rows.iter().map(|row| row.movie_id).collect();
    let catalog: HashMap<i64, movies::Model> = if movie_ids.is_empty() {
        HashMap::new()
    } else {
        Movies::find()
            .filter(movies::Column::Id.is_in(movie_ids))
            .all(conn)
            .await?
            .into_iter()
            .map(|movie| (movie.id, movie))
            .collect()
    };

    let items: Vec<CartItemView> = rows
        .into_iter()
        .filter_map(|row| {
            catalog.get(&row.movie_id).map(|movie| CartItemView {
                movie_id: movie.id,
                movie_uuid: movie.uuid,
                title: movie.name.clone(),
                year: movie.year,
                price: movie.price,
                added_at: row.added_at.with_timezone(&Utc),
            })
        })
        .collect();

    let total_amount = cart_total(&items);
    Ok(CartView {
        user_id,
        items,
        total_amount,
    })
}

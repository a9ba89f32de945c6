use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::{
    certifications, directors, genres, movies, order_items, orders, payment_items, payments,
    stars, user_profiles,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    User,
    Moderator,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "USER",
            UserRole::Moderator => "MODERATOR",
            UserRole::Admin => "ADMIN",
        }
    }

    /// Roles are ranked; a higher role passes every check for a lower one.
    pub fn satisfies(&self, required: UserRole) -> bool {
        *self >= required
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USER" => Ok(UserRole::User),
            "MODERATOR" => Ok(UserRole::Moderator),
            "ADMIN" => Ok(UserRole::Admin),
            other => Err(format!("unknown role {other}")),
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Paid,
    Canceled,
    Refunded,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Canceled => "canceled",
            OrderStatus::Refunded => "refunded",
        }
    }

    /// Legal moves of the order lifecycle.
    ///
    /// `pending` is the only state a user can leave (by paying or canceling);
    /// `paid -> refunded` belongs to payment reconciliation.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Paid)
                | (OrderStatus::Pending, OrderStatus::Canceled)
                | (OrderStatus::Paid, OrderStatus::Refunded)
        )
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "paid" => Ok(OrderStatus::Paid),
            "canceled" => Ok(OrderStatus::Canceled),
            "refunded" => Ok(OrderStatus::Refunded),
            other => Err(format!("unknown order status {other}")),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Successful,
    Canceled,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Successful => "successful",
            PaymentStatus::Canceled => "canceled",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "successful" => Ok(PaymentStatus::Successful),
            "canceled" => Ok(PaymentStatus::Canceled),
            "refunded" => Ok(PaymentStatus::Refunded),
            other => Err(format!("unknown payment status {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Gender {
    Man,
    Woman,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Man => "MAN",
            Gender::Woman => "WOMAN",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub is_active: bool,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct UserProfile {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar: Option<String>,
    pub gender: Option<Gender>,
    pub date_of_birth: Option<NaiveDate>,
    pub info: Option<String>,
}

impl From<user_profiles::Model> for UserProfile {
    fn from(model: user_profiles::Model) -> Self {
        Self {
            first_name: model.first_name,
            last_name: model.last_name,
            avatar: model.avatar,
            gender: model.gender.as_deref().and_then(|g| match g {
                "MAN" => Some(Gender::Man),
                "WOMAN" => Some(Gender::Woman),
                _ => None,
            }),
            date_of_birth: model.date_of_birth,
            info: model.info,
        }
    }
}

/// Id and name of a certification, genre, director or star.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct CatalogRef {
    pub id: i32,
    pub name: String,
}

impl From<certifications::Model> for CatalogRef {
    fn from(model: certifications::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
        }
    }
}

impl From<genres::Model> for CatalogRef {
    fn from(model: genres::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
        }
    }
}

impl From<directors::Model> for CatalogRef {
    fn from(model: directors::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
        }
    }
}

impl From<stars::Model> for CatalogRef {
    fn from(model: stars::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct MovieShort {
    pub id: i64,
    pub uuid: Uuid,
    pub name: String,
    pub year: i32,
    pub time: i32,
    pub imdb: f64,
    pub price: i64,
    pub certification: Option<CatalogRef>,
}

impl MovieShort {
    pub fn from_entity(model: movies::Model, certification: Option<CatalogRef>) -> Self {
        Self {
            id: model.id,
            uuid: model.uuid,
            name: model.name,
            year: model.year,
            time: model.time,
            imdb: model.imdb,
            price: model.price,
            certification,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct MovieDetail {
    pub id: i64,
    pub uuid: Uuid,
    pub name: String,
    pub year: i32,
    pub time: i32,
    pub imdb: f64,
    pub votes: i32,
    pub meta_score: Option<f64>,
    pub gross: Option<f64>,
    pub description: String,
    pub price: i64,
    pub certification: Option<CatalogRef>,
    pub genres: Vec<CatalogRef>,
    pub directors: Vec<CatalogRef>,
    pub stars: Vec<CatalogRef>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct CartItemView {
    pub movie_id: i64,
    pub movie_uuid: Uuid,
    pub title: String,
    pub year: i32,
    pub price: i64,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct CartView {
    pub user_id: Uuid,
    pub items: Vec<CartItemView>,
    /// Sum of current catalog prices; recomputed on every read.
    pub total_amount: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: OrderStatus,
    pub total_amount: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<orders::Model> for Order {
    type Error = String;

    fn try_from(model: orders::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            status: model.status.parse()?,
            total_amount: model.total_amount,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        })
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub movie_id: i64,
    pub price_at_order: i64,
}

impl From<order_items::Model> for OrderItem {
    fn from(model: order_items::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            movie_id: model.movie_id,
            price_at_order: model.price_at_order,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct PaymentItem {
    pub id: Uuid,
    pub order_item_id: Uuid,
    pub price_at_payment: i64,
}

impl From<payment_items::Model> for PaymentItem {
    fn from(model: payment_items::Model) -> Self {
        Self {
            id: model.id,
            order_item_id: model.order_item_id,
            price_at_payment: model.price_at_payment,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct Payment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub order_id: Uuid,
    pub status: PaymentStatus,
    pub amount: i64,
    pub external_payment_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub items: Vec<PaymentItem>,
}

impl Payment {
    pub fn from_entity(
        model: payments::Model,
        items: Vec<payment_items::Model>,
    ) -> Result<Self, String> {
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            order_id: model.order_id,
            status: model.status.parse()?,
            amount: model.amount,
            external_payment_id: model.external_payment_id,
            created_at: model.created_at.with_timezone(&Utc),
            items: items.into_iter().map(PaymentItem::from).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_orders_can_be_paid_or_canceled() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Paid));
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Canceled));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Refunded));
    }

    #[test]
    fn settled_orders_only_move_to_refunded() {
        assert!(OrderStatus::Paid.can_transition_to(OrderStatus::Refunded));
        assert!(!OrderStatus::Paid.can_transition_to(OrderStatus::Canceled));
        assert!(!OrderStatus::Paid.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Canceled.can_transition_to(OrderStatus::Paid));
        assert!(!OrderStatus::Canceled.can_transition_to(OrderStatus::Canceled));
        assert!(!OrderStatus::Refunded.can_transition_to(OrderStatus::Paid));
    }

    #[test]
    fn order_status_round_trips_through_storage_text() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Paid,
            OrderStatus::Canceled,
            OrderStatus::Refunded,
        ] {
            assert_eq!(status.as_str().parse::<OrderStatus>(), Ok(status));
        }
        assert!("shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn admin_satisfies_every_role_and_user_only_itself() {
        assert!(UserRole::Admin.satisfies(UserRole::Moderator));
        assert!(UserRole::Admin.satisfies(UserRole::User));
        assert!(UserRole::Moderator.satisfies(UserRole::User));
        assert!(!UserRole::Moderator.satisfies(UserRole::Admin));
        assert!(!UserRole::User.satisfies(UserRole::Moderator));
    }

    #[test]
    fn role_parses_group_names() {
        assert_eq!("MODERATOR".parse::<UserRole>(), Ok(UserRole::Moderator));
        assert!("root".parse::<UserRole>().is_err());
    }
}

use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{Order, OrderItem};

/// An order and its line items, each priced as it was when the order was placed.
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

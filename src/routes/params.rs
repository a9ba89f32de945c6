use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::models::{OrderStatus, PaymentStatus};

pub const DEFAULT_PER_PAGE: i64 = 20;
pub const MOVIES_PER_PAGE: i64 = 12;
pub const MAX_PER_PAGE: i64 = 100;
/// Highest page whose offset still fits in an `i64`.
pub const MAX_PAGE: i64 = i64::MAX / MAX_PER_PAGE;

#[derive(Debug, Default, Clone, Copy, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Pagination {
    pub fn normalize(&self) -> (i64, i64, i64) {
        self.normalize_with(DEFAULT_PER_PAGE)
    }

    /// `(page, per_page, offset)` with page in 1..=MAX_PAGE and per_page in 1..=100.
    pub fn normalize_with(&self, default_per_page: i64) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).clamp(1, MAX_PAGE);
        let per_page = self
            .per_page
            .unwrap_or(default_per_page)
            .clamp(1, MAX_PER_PAGE);
        let offset = (page - 1) * per_page;
        (page, per_page, offset)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MovieSortBy {
    Price,
    Year,
    Imdb,
    Votes,
}

// Query structs carry page/per_page directly: `serde(flatten)` breaks numeric
// fields under `serde_urlencoded`.
#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MovieQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    /// Case-insensitive substring of the movie name.
    pub q: Option<String>,
    pub year: Option<i32>,
    pub imdb_min: Option<f64>,
    pub imdb_max: Option<f64>,
    pub certification_id: Option<i32>,
    pub genre_id: Option<i32>,
    pub director_id: Option<i32>,
    pub star_id: Option<i32>,
    pub sort_by: Option<MovieSortBy>,
    pub order: Option<SortOrder>,
}

impl MovieQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrderListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<OrderStatus>,
}

impl OrderListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AdminPaymentQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub user_id: Option<Uuid>,
    pub status: Option<PaymentStatus>,
    /// RFC 3339, inclusive.
    pub date_from: Option<DateTime<Utc>>,
    /// RFC 3339, inclusive.
    pub date_to: Option<DateTime<Utc>>,
}

impl AdminPaymentQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_clamps_page_and_size() {
        let p = Pagination {
            page: Some(0),
            per_page: Some(500),
        };
        assert_eq!(p.normalize(), (1, 100, 0));

        let p = Pagination {
            page: Some(3),
            per_page: Some(0),
        };
        assert_eq!(p.normalize(), (3, 1, 2));
    }

    #[test]
    fn huge_page_does_not_overflow_offset() {
        let p = Pagination {
            page: Some(i64::MAX),
            per_page: Some(12),
        };
        let (page, per_page, offset) = p.normalize();
        assert_eq!(page, MAX_PAGE);
        assert_eq!(per_page, 12);
        assert_eq!(offset, (MAX_PAGE - 1) * 12);
        assert!(offset >= 0);

        let p = Pagination {
            page: Some(i64::MAX),
            per_page: Some(MAX_PER_PAGE),
        };
        assert!(p.normalize().2 >= 0);
    }

    #[test]
    fn movie_listing_defaults_to_twelve_per_page() {
        let q = MovieQuery::default();
        assert_eq!(q.pagination().normalize_with(MOVIES_PER_PAGE), (1, 12, 0));

        let q = MovieQuery {
            page: Some(2),
            ..Default::default()
        };
        assert_eq!(q.pagination().normalize_with(MOVIES_PER_PAGE), (2, 12, 12));
    }
}

use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        accounts::{
            ActivateRequest, ChangePasswordRequest, EmailRequest, LoginRequest, MeResponse,
            RefreshRequest, RegisterRequest, ResetPasswordRequest, TokenPair,
            UpdateProfileRequest,
        },
        cart::CartMovieRequest,
        movies::{CreateMovieRequest, MovieList, NamedRequest, UpdateMovieRequest},
        orders::{OrderList, OrderWithItems},
        payments::{CheckoutSessionRequest, CheckoutSessionResponse, PaymentList, WebhookAck},
    },
    models::{
        CartItemView, CartView, CatalogRef, Gender, MovieDetail, MovieShort, Order, OrderItem,
        OrderStatus, Payment, PaymentItem, PaymentStatus, User, UserProfile, UserRole,
    },
    response::{ApiResponse, Meta},
    routes::{accounts, cart, health, movies, orders, params, payments},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        accounts::register,
        accounts::activate,
        accounts::resend_activation,
        accounts::login,
        accounts::refresh,
        accounts::logout,
        accounts::change_password,
        accounts::forgot_password,
        accounts::reset_password,
        accounts::me,
        accounts::update_profile,
        movies::list_movies,
        movies::get_movie,
        movies::create_movie,
        movies::update_movie,
        movies::delete_movie,
        movies::list_genres,
        movies::create_genre,
        movies::list_stars,
        movies::create_star,
        movies::list_directors,
        movies::create_director,
        movies::list_certifications,
        movies::create_certification,
        cart::get_cart,
        cart::add_to_cart,
        cart::remove_from_cart,
        cart::clear_cart,
        cart::get_user_cart,
        orders::create_order,
        orders::list_orders,
        orders::get_order,
        orders::cancel_order,
        payments::create_checkout_session,
        payments::webhook,
        payments::list_payments,
        payments::list_all_payments
    ),
    components(
        schemas(
            User,
            UserRole,
            UserProfile,
            Gender,
            CatalogRef,
            MovieShort,
            MovieDetail,
            CartItemView,
            CartView,
            Order,
            OrderItem,
            OrderStatus,
            Payment,
            PaymentItem,
            PaymentStatus,
            RegisterRequest,
            ActivateRequest,
            EmailRequest,
            LoginRequest,
            TokenPair,
            RefreshRequest,
            ChangePasswordRequest,
            ResetPasswordRequest,
            MeResponse,
            UpdateProfileRequest,
            NamedRequest,
            CreateMovieRequest,
            UpdateMovieRequest,
            MovieList,
            CartMovieRequest,
            OrderList,
            OrderWithItems,
            CheckoutSessionRequest,
            CheckoutSessionResponse,
            PaymentList,
            WebhookAck,
            params::Pagination,
            params::SortOrder,
            params::MovieSortBy,
            Meta,
            ApiResponse<User>,
            ApiResponse<TokenPair>,
            ApiResponse<MovieList>,
            ApiResponse<MovieDetail>,
            ApiResponse<CartView>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<PaymentList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Accounts", description = "Registration, activation, sessions and passwords"),
        (name = "Movies", description = "Catalog browsing and moderation"),
        (name = "Cart", description = "Per-user shopping cart"),
        (name = "Orders", description = "Orders frozen from the cart"),
        (name = "Payments", description = "Hosted checkout and processor webhook"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_group_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/accounts/login",
            "/api/movies/{uuid}",
            "/api/cart/add",
            "/api/orders/{id}/cancel",
            "/api/payments/webhook",
        ] {
            assert!(doc.paths.paths.contains_key(path), "{path} missing");
        }
    }
}
